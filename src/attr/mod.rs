mod dispatch;
mod store;
mod value;

pub use dispatch::{CompareFn, DecodeFn, EncodeFn, FormatFn, TypeDispatch};
pub use store::{AttributeStore, ID_COLUMN};
pub use value::{AttrKind, AttrValue, AttributeType};

// ============================================================================
// RustModelDB Library
// ============================================================================

pub mod attr;
pub mod core;
pub mod driver;
pub mod facade;
pub mod model;
pub mod schema;
pub mod sql;

// Re-export main types for convenience
pub use attr::{AttrKind, AttrValue, AttributeStore, AttributeType, ID_COLUMN, TypeDispatch};
pub use core::{DbError, Result, Value};
pub use facade::Database;
pub use model::{Model, ModelExt, ModelRegistry, load_from_row};
pub use schema::{FieldDef, TableDef};
pub use sql::{Filter, FilterOp};

// Re-export driver API
pub use driver::{Cursor, DatabaseConfig, Driver, MemoryDriver};

// used by the model! macro expansion
#[doc(hidden)]
pub use paste;

/// Recommended API entrypoints for model-first applications.
///
/// ```ignore
/// use rustmodeldb::prelude::*;
///
/// model! {
///     pub struct User("users") {
///         name: String = String::new(),
///         age: i64 = 0,
///     }
/// }
///
/// # fn main() -> rustmodeldb::Result<()> {
/// ModelRegistry::shared().register::<User>()?;
///
/// let db = Database::with_defaults(MemoryDriver::new());
/// db.create_table(
///     &TableDef::new("users")
///         .field(FieldDef::id())
///         .field(FieldDef::new("name", "varchar(255)"))
///         .field(FieldDef::new("age", "bigint")),
///     false,
/// )?;
///
/// let mut user = User::default();
/// user.set_name("Alice".to_string());
/// user.set_age(30);
/// db.save(&mut user)?;
///
/// let found: User = db.find(user.id())?;
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::attr::{AttributeStore, TypeDispatch};
    pub use crate::core::{DbError, Result, Value};
    pub use crate::driver::{DatabaseConfig, Driver, MemoryDriver};
    pub use crate::facade::Database;
    pub use crate::model;
    pub use crate::model::{Model, ModelExt, ModelRegistry};
    pub use crate::schema::{FieldDef, TableDef};
    pub use crate::sql::{Filter, FilterOp};
}

mod registry;

pub use registry::{ModelFactory, ModelRegistry};

use crate::attr::{AttributeStore, ID_COLUMN, TypeDispatch};
use crate::core::Result;
use crate::driver::Cursor;
use std::any::Any;

/// A record from a database table.
///
/// Concrete model types own an [`AttributeStore`] and expose it through
/// this trait; everything else (identity, change tracking, display,
/// equality, persistence) is derived from the store. Most models are
/// declared with the [`model!`](crate::model!) macro rather than by hand.
pub trait Model: Any {
    /// Name of the table backing this model.
    fn table_name(&self) -> &str;

    /// Name of the concrete model type, used in diagnostics.
    fn type_name(&self) -> &str;

    fn store(&self) -> &AttributeStore;

    fn store_mut(&mut self) -> &mut AttributeStore;

    /// Subtype-supplied validation predicate; `save` aborts with a
    /// validation error before touching the database when this fails.
    fn validate(&self) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// Operations available on every model, derived from its attribute store.
pub trait ModelExt: Model {
    /// Primary key; 0 marks a record not yet present in the database.
    fn id(&self) -> u64 {
        self.store().get::<u64>(ID_COLUMN).copied().unwrap_or(0)
    }

    fn set_id(&mut self, id: u64) -> Result<()> {
        self.store_mut().set(ID_COLUMN, id)
    }

    /// True for a new unsaved record not present in the database.
    fn is_new_record(&self) -> bool {
        self.id() == 0
    }

    /// True when the model changed since it was loaded or saved.
    fn has_changes(&self) -> bool {
        self.store().has_changes()
    }

    /// Renders `TypeName(id-or-"new") { attr = value, ... }` using the
    /// formatter dispatch table. An attribute whose kind has no registered
    /// formatter renders as `{unsupported}` instead of failing.
    fn to_display_string(&self, dispatch: &TypeDispatch) -> String {
        let header = if self.is_new_record() {
            "new".to_string()
        } else {
            self.id().to_string()
        };

        let mut formatted = Vec::new();
        for name in self.store().columns() {
            if name == ID_COLUMN {
                continue;
            }
            match self.store().value(name).and_then(|value| dispatch.format(value)) {
                Some(text) => formatted.push(format!("{name} = {text}")),
                None => formatted.push(format!("{name} = {{unsupported}}")),
            }
        }

        format!(
            "{}({}) {{\n    {},\n}}",
            self.type_name(),
            header,
            formatted.join(",\n    ")
        )
    }

    /// Attribute-wise equality through the comparator dispatch table.
    ///
    /// Models of different concrete types may compare equal as long as
    /// their stores agree. A kind without a registered comparator makes
    /// the models unequal rather than failing.
    fn equals(&self, other: &dyn Model, dispatch: &TypeDispatch) -> bool {
        let mine = self.store();
        let theirs = other.store();

        if mine.len() != theirs.len() {
            return false;
        }

        for name in mine.columns() {
            let Some(left) = mine.value(name) else {
                return false;
            };
            // names missing on the other side are not compared
            let Some(right) = theirs.value(name) else {
                continue;
            };
            if dispatch.compare(left, right) != Some(true) {
                return false;
            }
        }
        true
    }
}

impl<M: Model + ?Sized> ModelExt for M {}

/// Populates a store from the cursor's current row by decoding every
/// declared attribute in place, then marks the store wholly unchanged.
///
/// This is the default load path used by [`ModelRegistry::register`];
/// custom factories can call it before applying their own fixups.
pub fn load_from_row(store: &mut AttributeStore, row: &dyn Cursor, dispatch: &TypeDispatch) {
    let columns: Vec<String> = store.columns().map(str::to_string).collect();
    for name in columns {
        let driver_value = row.value(&name);
        if let Some(cell) = store.value_mut(&name)
            && !dispatch.decode_into(cell, &driver_value)
        {
            log::warn!("no decoder registered for attribute '{name}', keeping default");
        }
    }
    store.reset_modified();
}

/// Declares a model struct together with its attribute store plumbing.
///
/// ```ignore
/// model! {
///     pub struct User("users") {
///         name: String = String::new(),
///         age: i64 = 0,
///     }
/// }
/// ```
///
/// Generates the struct, a `Default` implementation declaring every
/// attribute in order, the [`Model`](crate::Model) implementation and a
/// typed getter/setter pair per attribute. Implement `Model` by hand
/// instead when a custom `validate` is needed.
#[macro_export]
macro_rules! model {
    (
        $vis:vis struct $name:ident($table:literal) {
            $( $attr:ident : $ty:ty = $default:expr ),+ $(,)?
        }
    ) => {
        #[derive(Debug, Clone)]
        $vis struct $name {
            store: $crate::AttributeStore,
        }

        impl Default for $name {
            fn default() -> Self {
                let mut store = $crate::AttributeStore::new();
                $(
                    store
                        .declare::<$ty>(stringify!($attr), $default)
                        .expect("model! attribute names are unique");
                )+
                Self { store }
            }
        }

        impl $crate::Model for $name {
            fn table_name(&self) -> &str {
                $table
            }

            fn type_name(&self) -> &str {
                stringify!($name)
            }

            fn store(&self) -> &$crate::AttributeStore {
                &self.store
            }

            fn store_mut(&mut self) -> &mut $crate::AttributeStore {
                &mut self.store
            }
        }

        impl $name {
            $(
                $crate::paste::paste! {
                    pub fn $attr(&self) -> &$ty {
                        self.store
                            .get::<$ty>(stringify!($attr))
                            .expect("attribute declared by model!")
                    }

                    pub fn [<set_ $attr>](&mut self, value: $ty) {
                        self.store
                            .set::<$ty>(stringify!($attr), value)
                            .expect("attribute declared by model!");
                    }
                }
            )+
        }
    };
}

use crate::attr::TypeDispatch;
use crate::core::Result;
use crate::driver::Cursor;
use crate::model::{Model, load_from_row};
use lazy_static::lazy_static;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Factory reconstructing one concrete model type from a result row.
pub type ModelFactory<M> = Arc<dyn Fn(&dyn Cursor, &TypeDispatch) -> Result<M> + Send + Sync>;

/// Type-indexed factory table for polymorphic model reconstruction.
///
/// The engine's generic find operations look up the requested model type's
/// runtime tag here instead of carrying a compile-time list of model types;
/// an unregistered type is a lookup miss, never a construction of the wrong
/// variant. Registration normally happens once at startup, but the table is
/// lock-guarded so late registration may race with lookups.
pub struct ModelRegistry {
    factories: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

lazy_static! {
    static ref SHARED_REGISTRY: Arc<ModelRegistry> = Arc::new(ModelRegistry::new());
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide instance used by engines built with defaults.
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SHARED_REGISTRY)
    }

    /// Registers the default factory for a model type: construct empty,
    /// decode every declared attribute from the row, mark unchanged.
    pub fn register<M: Model + Default>(&self) -> Result<()> {
        self.register_with::<M, _>(|row, dispatch| {
            let mut model = M::default();
            load_from_row(model.store_mut(), row, dispatch);
            Ok(model)
        })
    }

    /// Registers a custom factory for models needing more than the default
    /// column-by-column decode.
    pub fn register_with<M, F>(&self, factory: F) -> Result<()>
    where
        M: Model,
        F: Fn(&dyn Cursor, &TypeDispatch) -> Result<M> + Send + Sync + 'static,
    {
        let factory: ModelFactory<M> = Arc::new(factory);
        self.factories
            .write()?
            .insert(TypeId::of::<M>(), Arc::new(factory));
        Ok(())
    }

    /// Looks up the factory registered for `M`; `None` when the type was
    /// never registered.
    pub fn factory_for<M: Model>(&self) -> Option<ModelFactory<M>> {
        self.factories.read().ok().and_then(|table| {
            table
                .get(&TypeId::of::<M>())
                .and_then(|entry| entry.downcast_ref::<ModelFactory<M>>())
                .cloned()
        })
    }

    pub fn is_registered<M: Model>(&self) -> bool {
        self.factory_for::<M>().is_some()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;
    use crate::model::ModelExt;
    use std::collections::BTreeMap;

    crate::model! {
        struct Gadget("gadgets") {
            label: String = String::new(),
        }
    }

    crate::model! {
        struct Widget("widgets") {
            label: String = String::new(),
        }
    }

    struct StubRow(BTreeMap<String, Value>);

    impl Cursor for StubRow {
        fn advance(&mut self) -> bool {
            false
        }

        fn value(&self, column: &str) -> Value {
            self.0.get(column).cloned().unwrap_or(Value::Null)
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = ModelRegistry::new();
        registry.register::<Gadget>().unwrap();

        assert!(registry.is_registered::<Gadget>());
        assert!(!registry.is_registered::<Widget>());
        assert!(registry.factory_for::<Widget>().is_none());
    }

    #[test]
    fn test_default_factory_decodes_row() {
        let registry = ModelRegistry::new();
        registry.register::<Gadget>().unwrap();
        let dispatch = TypeDispatch::with_defaults();

        let row = StubRow(
            [
                ("id".to_string(), Value::Unsigned(5)),
                ("label".to_string(), Value::Text("wrench".to_string())),
            ]
            .into_iter()
            .collect(),
        );

        let factory = registry.factory_for::<Gadget>().unwrap();
        let gadget = factory(&row, &dispatch).unwrap();

        assert_eq!(gadget.id(), 5);
        assert_eq!(gadget.label(), "wrench");
        assert!(!gadget.has_changes());
    }

    #[test]
    fn test_custom_factory() {
        let registry = ModelRegistry::new();
        registry
            .register_with::<Gadget, _>(|row, dispatch| {
                let mut gadget = Gadget::default();
                crate::model::load_from_row(gadget.store_mut(), row, dispatch);
                gadget.set_label(format!("custom:{}", gadget.label()));
                Ok(gadget)
            })
            .unwrap();

        let dispatch = TypeDispatch::with_defaults();
        let row = StubRow(
            [
                ("id".to_string(), Value::Unsigned(1)),
                ("label".to_string(), Value::Text("bolt".to_string())),
            ]
            .into_iter()
            .collect(),
        );

        let factory = registry.factory_for::<Gadget>().unwrap();
        let gadget = factory(&row, &dispatch).unwrap();
        assert_eq!(gadget.label(), "custom:bolt");
    }

    #[test]
    fn test_reregistration_replaces_factory() {
        let registry = ModelRegistry::new();
        registry.register::<Gadget>().unwrap();
        registry
            .register_with::<Gadget, _>(|_, _| Ok(Gadget::default()))
            .unwrap();

        let dispatch = TypeDispatch::with_defaults();
        let row = StubRow(BTreeMap::new());
        let factory = registry.factory_for::<Gadget>().unwrap();
        let gadget = factory(&row, &dispatch).unwrap();
        assert!(gadget.is_new_record());
    }
}

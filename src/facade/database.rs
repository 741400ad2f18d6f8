use crate::attr::{AttributeStore, ID_COLUMN, TypeDispatch};
use crate::core::{DbError, Result, Value};
use crate::driver::Driver;
use crate::model::{Model, ModelExt, ModelRegistry};
use crate::schema::TableDef;
use crate::sql::{self, Filter};
use log::{debug, warn};
use std::sync::{Arc, Mutex};

/// Database engine: one driver connection, serialized access, generic CRUD.
///
/// Every public operation locks the driver, opens the connection if needed,
/// does its work and closes the connection before returning. The internal
/// row-fetching helpers instead take the already-open driver handle as a
/// parameter, because one logical find spans "open, query, reconstruct
/// rows" and must not close in between.
///
/// The registrar and dispatch tables are injected at construction so tests
/// can run against isolated registries; [`Database::with_defaults`] wires
/// the process-wide shared instances.
pub struct Database<D: Driver> {
    driver: Mutex<D>,
    registry: Arc<ModelRegistry>,
    dispatch: Arc<TypeDispatch>,
    last_error: Mutex<Option<String>>,
}

impl<D: Driver> Database<D> {
    pub fn new(driver: D, registry: Arc<ModelRegistry>, dispatch: Arc<TypeDispatch>) -> Self {
        Self {
            driver: Mutex::new(driver),
            registry,
            dispatch,
            last_error: Mutex::new(None),
        }
    }

    /// Engine wired to the process-wide registry and dispatch tables.
    pub fn with_defaults(driver: D) -> Self {
        Self::new(driver, ModelRegistry::shared(), TypeDispatch::shared())
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn dispatch(&self) -> &Arc<TypeDispatch> {
        &self.dispatch
    }

    /// Text of the most recent error, kept for convenience retrieval;
    /// cleared when the next operation starts.
    pub fn last_error_message(&self) -> Option<String> {
        self.last_error.lock().ok().and_then(|slot| slot.clone())
    }

    /// Executes raw statement text. Fetching of data isn't possible.
    pub fn execute(&self, statement: &str) -> Result<()> {
        self.run(|driver| {
            debug!("running statement: {statement}");
            driver.execute(statement)?;
            Ok(())
        })
    }

    /// Names of all tables in the database.
    pub fn tables(&self) -> Result<Vec<String>> {
        self.run(|driver| driver.table_names())
    }

    /// Creates a table from its definition. With `error_if_exists` false the
    /// statement carries IF NOT EXISTS, so a pre-existing table succeeds.
    pub fn create_table(&self, table: &TableDef, error_if_exists: bool) -> Result<()> {
        self.run(|driver| {
            if table.is_empty() {
                return Err(DbError::Schema(format!(
                    "{}: no fields specified",
                    table.name()
                )));
            }
            let statement = table.create_statement(!error_if_exists);
            debug!("running statement: {statement}");
            driver.execute(&statement)?;
            Ok(())
        })
    }

    pub fn drop_table(&self, name: &str) -> Result<()> {
        self.execute(&sql::drop_statement(name))
    }

    /// Removes all records and resets the auto-increment counter.
    pub fn truncate_table(&self, name: &str) -> Result<()> {
        self.execute(&sql::truncate_statement(name))
    }

    /// Checks whether a connection can be established, without leaving it
    /// open.
    pub fn can_connect(&self) -> bool {
        let Ok(mut driver) = self.driver.lock() else {
            return false;
        };
        self.clear_error();
        match driver.open() {
            Ok(()) => {
                driver.close();
                true
            }
            Err(err) => {
                self.record_error(&err);
                false
            }
        }
    }

    /// Finds the record of the given model type by primary key.
    pub fn find<M: Model + Default>(&self, id: u64) -> Result<M> {
        self.run(|driver| {
            let statement = sql::select_by_id(M::default().table_name(), id);
            self.fetch_one::<M>(driver, &statement, &[])
        })
    }

    /// Finds the first record matching the filter.
    pub fn find_where<M: Model + Default>(&self, filter: &Filter) -> Result<M> {
        self.run(|driver| {
            let (statement, params) =
                sql::select_filtered(M::default().table_name(), filter, true)?;
            self.fetch_one::<M>(driver, &statement, &params)
        })
    }

    /// Finds the entire table of the given model type.
    pub fn find_all<M: Model + Default>(&self) -> Result<Vec<M>> {
        self.find_all_where(&Filter::new())
    }

    /// Finds every record matching the filter.
    pub fn find_all_where<M: Model + Default>(&self, filter: &Filter) -> Result<Vec<M>> {
        self.run(|driver| {
            let (statement, params) =
                sql::select_filtered(M::default().table_name(), filter, false)?;
            self.fetch_all::<M>(driver, &statement, &params)
        })
    }

    /// Writes the model to the database: INSERT for a new record (assigning
    /// its primary key), UPDATE of the modified attributes otherwise. An
    /// unchanged persisted model is a successful no-op.
    pub fn save(&self, model: &mut dyn Model) -> Result<()> {
        self.run(|driver| Self::save_record(&self.dispatch, driver, model))
    }

    /// Deletes the model's record and resets its primary key to 0. A record
    /// never saved is a successful no-op.
    pub fn delete(&self, model: &mut dyn Model) -> Result<()> {
        if model.is_new_record() {
            return Ok(());
        }
        self.run(|driver| {
            let statement = sql::delete_statement(model.table_name(), model.id());
            debug!("running statement: {statement}");
            driver.execute(&statement)?;
            model.set_id(0)?;
            Ok(())
        })
    }

    // -- internal helpers, driver already locked and open --------------------

    fn run<T>(&self, work: impl FnOnce(&mut D) -> Result<T>) -> Result<T> {
        let mut driver = self.driver.lock()?;
        self.clear_error();

        if let Err(err) = driver.open() {
            self.record_error(&err);
            return Err(err);
        }

        let result = work(&mut driver);
        driver.close();

        if let Err(err) = &result {
            self.record_error(err);
        }
        result
    }

    fn fetch_one<M: Model + Default>(
        &self,
        driver: &mut D,
        statement: &str,
        params: &[(String, Value)],
    ) -> Result<M> {
        debug!("running query: {statement}");
        let mut cursor = if params.is_empty() {
            driver.execute(statement)?
        } else {
            driver.execute_bound(statement, params)?
        };

        if !cursor.advance() {
            return Err(DbError::NotFound(format!(
                "empty result set for {}",
                M::default().table_name()
            )));
        }

        let factory = self
            .registry
            .factory_for::<M>()
            .ok_or_else(|| DbError::UnregisteredType(M::default().type_name().to_string()))?;

        factory(cursor.as_ref(), &self.dispatch)
    }

    fn fetch_all<M: Model + Default>(
        &self,
        driver: &mut D,
        statement: &str,
        params: &[(String, Value)],
    ) -> Result<Vec<M>> {
        debug!("running query: {statement}");
        let mut cursor = if params.is_empty() {
            driver.execute(statement)?
        } else {
            driver.execute_bound(statement, params)?
        };

        let mut results = Vec::new();
        while cursor.advance() {
            // an unregistered row type aborts the whole call, no partial list
            let factory = self
                .registry
                .factory_for::<M>()
                .ok_or_else(|| DbError::UnregisteredType(M::default().type_name().to_string()))?;
            results.push(factory(cursor.as_ref(), &self.dispatch)?);
        }
        Ok(results)
    }

    fn save_record(dispatch: &TypeDispatch, driver: &mut D, model: &mut dyn Model) -> Result<()> {
        model.validate().map_err(DbError::Validation)?;

        if model.is_new_record() {
            if !model.store().has_persistable_attributes() {
                return Err(DbError::EmptyModel);
            }

            let statement = sql::insert_statement(model.table_name(), model.store());
            let params = encode_insert_params(dispatch, model.store())?;
            debug!("running prepared statement: {statement}");
            driver.execute_bound(&statement, &params)?;

            // adopt the driver-assigned identifier; 0 means the driver gave
            // none and the id cell stays untouched
            let new_id = driver.last_insert_id();
            if new_id != 0 {
                model.set_id(new_id)?;
            }
            model.store_mut().reset_modified();
        } else {
            let Some(statement) =
                sql::update_statement(model.table_name(), model.store(), model.id())
            else {
                // nothing to update, simulate success
                return Ok(());
            };

            let params = encode_update_params(dispatch, model.store())?;
            debug!("running prepared statement: {statement}");
            driver.execute_bound(&statement, &params)?;
            model.store_mut().reset_modified();
        }
        Ok(())
    }

    fn clear_error(&self) {
        if let Ok(mut slot) = self.last_error.lock() {
            *slot = None;
        }
    }

    fn record_error(&self, err: &DbError) {
        warn!("database operation failed: {err}");
        if let Ok(mut slot) = self.last_error.lock() {
            *slot = Some(err.to_string());
        }
    }
}

fn encode_insert_params(
    dispatch: &TypeDispatch,
    store: &AttributeStore,
) -> Result<Vec<(String, Value)>> {
    encode_params(dispatch, store, store.columns().filter(|name| *name != ID_COLUMN))
}

fn encode_update_params(
    dispatch: &TypeDispatch,
    store: &AttributeStore,
) -> Result<Vec<(String, Value)>> {
    encode_params(
        dispatch,
        store,
        store.changed_names().filter(|name| *name != ID_COLUMN),
    )
}

fn encode_params<'a>(
    dispatch: &TypeDispatch,
    store: &AttributeStore,
    names: impl Iterator<Item = &'a str>,
) -> Result<Vec<(String, Value)>> {
    let mut params = Vec::new();
    for name in names {
        let Some(value) = store.value(name) else {
            continue;
        };
        params.push((name.to_string(), dispatch.encode(value)?));
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::MemoryDriver;

    crate::model! {
        struct Note("notes") {
            body: String = String::new(),
        }
    }

    fn fresh_db() -> Database<MemoryDriver> {
        let registry = Arc::new(ModelRegistry::new());
        registry.register::<Note>().unwrap();
        Database::new(
            MemoryDriver::new(),
            registry,
            Arc::new(TypeDispatch::with_defaults()),
        )
    }

    #[test]
    fn test_execute_and_last_error() {
        let db = fresh_db();
        assert!(db.execute("NONSENSE").is_err());
        assert!(db.last_error_message().is_some());

        db.execute("CREATE TABLE `notes` (`id` bigint NOT NULL );").unwrap();
        // success clears the slot
        assert!(db.last_error_message().is_none());
    }

    #[test]
    fn test_create_table_empty_schema() {
        let db = fresh_db();
        let empty = TableDef::new("notes");
        assert!(matches!(
            db.create_table(&empty, false),
            Err(DbError::Schema(_))
        ));
    }

    #[test]
    fn test_can_connect() {
        let db = fresh_db();
        assert!(db.can_connect());
        assert!(db.registry().is_registered::<Note>());
        assert!(db.dispatch().formatter(crate::AttrKind::Text).is_some());

        let mut refused = MemoryDriver::new();
        refused.set_connectable(false);
        let db = Database::new(
            refused,
            Arc::new(ModelRegistry::new()),
            Arc::new(TypeDispatch::with_defaults()),
        );
        assert!(!db.can_connect());
        assert!(db.last_error_message().is_some());
    }

    #[test]
    fn test_connection_closed_between_operations() {
        let registry = Arc::new(ModelRegistry::new());
        registry.register::<Note>().unwrap();
        let driver = MemoryDriver::new();
        let db = Database::new(driver, registry, Arc::new(TypeDispatch::with_defaults()));

        db.execute("CREATE TABLE `notes` (`id` bigint NOT NULL );").unwrap();

        let guard = db.driver.lock().unwrap();
        assert!(!guard.is_open());
    }

    #[test]
    fn test_validation_aborts_before_database() {
        struct Strict {
            store: AttributeStore,
        }

        impl Default for Strict {
            fn default() -> Self {
                let mut store = AttributeStore::new();
                store.declare("body", String::new()).unwrap();
                Self { store }
            }
        }

        impl Model for Strict {
            fn table_name(&self) -> &str {
                "notes"
            }

            fn type_name(&self) -> &str {
                "Strict"
            }

            fn store(&self) -> &AttributeStore {
                &self.store
            }

            fn store_mut(&mut self) -> &mut AttributeStore {
                &mut self.store
            }

            fn validate(&self) -> std::result::Result<(), String> {
                Err("body must not be empty".to_string())
            }
        }

        let db = fresh_db();
        let mut strict = Strict::default();
        let err = db.save(&mut strict).unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
        assert_eq!(
            db.last_error_message().unwrap(),
            "Validation failed: body must not be empty"
        );
    }

    #[test]
    fn test_empty_model_rejected() {
        struct Bare {
            store: AttributeStore,
        }

        impl Default for Bare {
            fn default() -> Self {
                Self {
                    store: AttributeStore::new(),
                }
            }
        }

        impl Model for Bare {
            fn table_name(&self) -> &str {
                "bare"
            }

            fn type_name(&self) -> &str {
                "Bare"
            }

            fn store(&self) -> &AttributeStore {
                &self.store
            }

            fn store_mut(&mut self) -> &mut AttributeStore {
                &mut self.store
            }
        }

        let db = fresh_db();
        let mut bare = Bare::default();
        assert!(matches!(db.save(&mut bare), Err(DbError::EmptyModel)));
    }
}

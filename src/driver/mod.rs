mod config;
mod memory;

pub use config::DatabaseConfig;
pub use memory::MemoryDriver;

use crate::core::{Result, Value};

/// Forward-only view over a statement's result set.
///
/// A fresh cursor is positioned before the first row; `advance` must be
/// called once before reading values.
pub trait Cursor {
    /// Moves to the next row, returning false when the set is exhausted.
    fn advance(&mut self) -> bool;

    /// Value of the named column in the current row; `Value::Null` when the
    /// column is absent.
    fn value(&self, column: &str) -> Value;
}

/// Boundary to the underlying SQL connection.
///
/// The engine owns exactly one driver instance, opens it before each
/// logical operation and closes it afterwards; drivers may keep state
/// (credentials, caches, in-memory tables) across open/close cycles.
pub trait Driver: Send {
    fn open(&mut self) -> Result<()>;

    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Executes raw statement text.
    fn execute(&mut self, statement: &str) -> Result<Box<dyn Cursor>>;

    /// Prepares the statement, binds the named parameters and executes.
    fn execute_bound(
        &mut self,
        statement: &str,
        params: &[(String, Value)],
    ) -> Result<Box<dyn Cursor>>;

    /// Identifier assigned by the most recent INSERT; 0 when the driver has
    /// not assigned one.
    fn last_insert_id(&self) -> u64;

    /// Names of all tables visible on the connection.
    fn table_names(&mut self) -> Result<Vec<String>>;
}

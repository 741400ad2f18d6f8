mod filter;

pub use filter::{Filter, FilterOp};

use crate::attr::{AttributeStore, ID_COLUMN};
use crate::core::{Result, Value};

/// INSERT over every declared attribute except the primary key, with one
/// named placeholder per column.
pub fn insert_statement(table: &str, store: &AttributeStore) -> String {
    let columns: Vec<&str> = store.columns().filter(|name| *name != ID_COLUMN).collect();

    let placeholders: Vec<String> = columns.iter().map(|name| format!(":{name}")).collect();

    format!(
        "INSERT INTO `{table}` ({}) VALUES ({});",
        columns.join(","),
        placeholders.join(",")
    )
}

/// UPDATE restricted to modified attributes; `None` when nothing changed
/// (the caller treats that as a successful no-op).
pub fn update_statement(table: &str, store: &AttributeStore, id: u64) -> Option<String> {
    let pairs: Vec<String> = store
        .changed_names()
        .filter(|name| *name != ID_COLUMN)
        .map(|name| format!("{name}=:{name}"))
        .collect();

    if pairs.is_empty() {
        return None;
    }

    Some(format!(
        "UPDATE `{table}` SET {} WHERE id={id};",
        pairs.join(",")
    ))
}

pub fn delete_statement(table: &str, id: u64) -> String {
    format!("DELETE FROM `{table}` WHERE id={id};")
}

pub fn select_by_id(table: &str, id: u64) -> String {
    format!("SELECT * FROM `{table}` WHERE id={id};")
}

/// SELECT with an optional structured filter; `limit_one` constrains the
/// result to the first matching row.
pub fn select_filtered(
    table: &str,
    filter: &Filter,
    limit_one: bool,
) -> Result<(String, Vec<(String, Value)>)> {
    let (clause, params) = filter.render()?;

    let statement = match (clause.is_empty(), limit_one) {
        (true, false) => format!("SELECT * FROM `{table}`;"),
        (true, true) => format!("SELECT * FROM `{table}` LIMIT 1;"),
        (false, false) => format!("SELECT * FROM `{table}` WHERE {clause};"),
        (false, true) => format!("SELECT * FROM `{table}` WHERE {clause} LIMIT 1;"),
    };

    Ok((statement, params))
}

pub fn drop_statement(table: &str) -> String {
    format!("DROP TABLE `{table}`;")
}

pub fn truncate_statement(table: &str) -> String {
    format!("TRUNCATE TABLE `{table}`;")
}

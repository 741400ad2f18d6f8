use crate::core::{DbError, Result, Value};
use crate::driver::{Cursor, DatabaseConfig, Driver};
use crate::sql::FilterOp;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

/// In-memory reference driver.
///
/// Interprets exactly the statement shapes this crate generates, keeping
/// rows in plain maps. Intended for tests and embedded fixtures; table
/// contents survive open/close cycles, like a server connection would.
pub struct MemoryDriver {
    config: DatabaseConfig,
    open: bool,
    connectable: bool,
    last_insert_id: u64,
    tables: HashMap<String, MemTable>,
    log: Arc<Mutex<Vec<String>>>,
}

struct MemTable {
    rows: Vec<BTreeMap<String, Value>>,
    next_id: u64,
}

impl MemTable {
    fn new() -> Self {
        Self {
            rows: Vec::new(),
            next_id: 1,
        }
    }
}

struct MemoryCursor {
    rows: Vec<BTreeMap<String, Value>>,
    position: Option<usize>,
}

impl MemoryCursor {
    fn over(rows: Vec<BTreeMap<String, Value>>) -> Box<dyn Cursor> {
        Box::new(Self {
            rows,
            position: None,
        })
    }

    fn empty() -> Box<dyn Cursor> {
        Self::over(Vec::new())
    }
}

impl Cursor for MemoryCursor {
    fn advance(&mut self) -> bool {
        let next = match self.position {
            None => 0,
            Some(index) => index + 1,
        };
        if next < self.rows.len() {
            self.position = Some(next);
            true
        } else {
            self.position = Some(self.rows.len());
            false
        }
    }

    fn value(&self, column: &str) -> Value {
        self.position
            .and_then(|index| self.rows.get(index))
            .and_then(|row| row.get(column))
            .cloned()
            .unwrap_or(Value::Null)
    }
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::with_config(DatabaseConfig::default())
    }

    pub fn with_config(config: DatabaseConfig) -> Self {
        Self {
            config,
            open: false,
            connectable: true,
            last_insert_id: 0,
            tables: HashMap::new(),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Makes every subsequent `open` fail, for connection-error testing.
    pub fn set_connectable(&mut self, connectable: bool) {
        self.connectable = connectable;
    }

    /// Handle onto the executed-statement log; survives moving the driver
    /// into an engine.
    pub fn log_handle(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.log)
    }

    fn run(&mut self, statement: &str, params: &[(String, Value)]) -> Result<Box<dyn Cursor>> {
        if !self.open {
            return Err(DbError::Connection("connection is not open".to_string()));
        }

        if let Ok(mut log) = self.log.lock() {
            log.push(statement.to_string());
        }

        let text = statement.trim().trim_end_matches(';').trim();

        if let Some(rest) = text.strip_prefix("CREATE TABLE ") {
            self.create_table(rest)
        } else if let Some(rest) = text.strip_prefix("DROP TABLE ") {
            self.drop_table(rest)
        } else if let Some(rest) = text.strip_prefix("TRUNCATE TABLE ") {
            self.truncate_table(rest)
        } else if let Some(rest) = text.strip_prefix("INSERT INTO ") {
            self.insert(rest, params)
        } else if let Some(rest) = text.strip_prefix("UPDATE ") {
            self.update(rest, params)
        } else if let Some(rest) = text.strip_prefix("DELETE FROM ") {
            self.delete(rest)
        } else if let Some(rest) = text.strip_prefix("SELECT * FROM ") {
            self.select(rest, params)
        } else {
            Err(DbError::Statement(format!("unsupported statement: {text}")))
        }
    }

    fn create_table(&mut self, rest: &str) -> Result<Box<dyn Cursor>> {
        let (if_not_exists, rest) = match rest.strip_prefix("IF NOT EXISTS ") {
            Some(stripped) => (true, stripped),
            None => (false, rest),
        };
        let (name, _) = backtick_name(rest)?;

        if self.tables.contains_key(&name) {
            if if_not_exists {
                return Ok(MemoryCursor::empty());
            }
            return Err(DbError::Statement(format!("Table '{name}' already exists")));
        }

        self.tables.insert(name, MemTable::new());
        Ok(MemoryCursor::empty())
    }

    fn drop_table(&mut self, rest: &str) -> Result<Box<dyn Cursor>> {
        let (name, _) = backtick_name(rest)?;
        if self.tables.remove(&name).is_none() {
            return Err(DbError::Statement(format!("Unknown table '{name}'")));
        }
        Ok(MemoryCursor::empty())
    }

    fn truncate_table(&mut self, rest: &str) -> Result<Box<dyn Cursor>> {
        let (name, _) = backtick_name(rest)?;
        let table = self
            .tables
            .get_mut(&name)
            .ok_or_else(|| DbError::Statement(format!("Unknown table '{name}'")))?;

        table.rows.clear();
        table.next_id = 1;
        Ok(MemoryCursor::empty())
    }

    fn insert(&mut self, rest: &str, params: &[(String, Value)]) -> Result<Box<dyn Cursor>> {
        let (name, after) = backtick_name(rest)?;

        let open_paren = after
            .find('(')
            .ok_or_else(|| DbError::Statement("malformed INSERT".to_string()))?;
        let close_paren = after[open_paren..]
            .find(')')
            .map(|offset| open_paren + offset)
            .ok_or_else(|| DbError::Statement("malformed INSERT".to_string()))?;

        let columns: Vec<&str> = after[open_paren + 1..close_paren]
            .split(',')
            .map(str::trim)
            .filter(|column| !column.is_empty())
            .collect();

        let table = self
            .tables
            .get_mut(&name)
            .ok_or_else(|| DbError::Statement(format!("Unknown table '{name}'")))?;

        let id = table.next_id;
        let mut row = BTreeMap::new();
        row.insert("id".to_string(), Value::Unsigned(id));
        for column in columns {
            row.insert(column.to_string(), bound_value(params, column));
        }

        table.rows.push(row);
        table.next_id += 1;
        self.last_insert_id = id;
        Ok(MemoryCursor::empty())
    }

    fn update(&mut self, rest: &str, params: &[(String, Value)]) -> Result<Box<dyn Cursor>> {
        let (name, after) = backtick_name(rest)?;

        let body = after
            .trim()
            .strip_prefix("SET ")
            .ok_or_else(|| DbError::Statement("malformed UPDATE".to_string()))?;
        let (set_part, where_part) = body
            .split_once(" WHERE ")
            .ok_or_else(|| DbError::Statement("UPDATE without WHERE".to_string()))?;
        let id = parse_id_condition(where_part)
            .ok_or_else(|| DbError::Statement("malformed UPDATE condition".to_string()))?;

        let mut assignments = Vec::new();
        for pair in set_part.split(',') {
            let (column, param) = pair
                .trim()
                .split_once("=:")
                .ok_or_else(|| DbError::Statement("malformed SET clause".to_string()))?;
            assignments.push((column.to_string(), bound_value(params, param)));
        }

        let table = self
            .tables
            .get_mut(&name)
            .ok_or_else(|| DbError::Statement(format!("Unknown table '{name}'")))?;

        for row in &mut table.rows {
            if row_id(row) == Some(id) {
                for (column, value) in &assignments {
                    row.insert(column.clone(), value.clone());
                }
            }
        }
        Ok(MemoryCursor::empty())
    }

    fn delete(&mut self, rest: &str) -> Result<Box<dyn Cursor>> {
        let (name, after) = backtick_name(rest)?;

        let condition = after
            .trim()
            .strip_prefix("WHERE ")
            .ok_or_else(|| DbError::Statement("DELETE without WHERE".to_string()))?;
        let id = parse_id_condition(condition)
            .ok_or_else(|| DbError::Statement("malformed DELETE condition".to_string()))?;

        let table = self
            .tables
            .get_mut(&name)
            .ok_or_else(|| DbError::Statement(format!("Unknown table '{name}'")))?;

        table.rows.retain(|row| row_id(row) != Some(id));
        Ok(MemoryCursor::empty())
    }

    fn select(&mut self, rest: &str, params: &[(String, Value)]) -> Result<Box<dyn Cursor>> {
        let (name, after) = backtick_name(rest)?;

        let (condition, limit_one) = match after.trim() {
            "" => (None, false),
            "LIMIT 1" => (None, true),
            other => {
                let body = other.strip_prefix("WHERE ").ok_or_else(|| {
                    DbError::Statement(format!("unsupported SELECT clause: {other}"))
                })?;
                match body.strip_suffix(" LIMIT 1") {
                    Some(stripped) => (Some(stripped), true),
                    None => (Some(body), false),
                }
            }
        };

        let table = self
            .tables
            .get(&name)
            .ok_or_else(|| DbError::Statement(format!("Unknown table '{name}'")))?;

        let mut rows = Vec::new();
        for row in &table.rows {
            if row_matches(row, condition, params)? {
                rows.push(row.clone());
                if limit_one {
                    break;
                }
            }
        }
        Ok(MemoryCursor::over(rows))
    }
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for MemoryDriver {
    fn open(&mut self) -> Result<()> {
        if !self.connectable {
            return Err(DbError::Connection("connection refused".to_string()));
        }
        self.config.validate().map_err(DbError::Connection)?;
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn execute(&mut self, statement: &str) -> Result<Box<dyn Cursor>> {
        self.run(statement, &[])
    }

    fn execute_bound(
        &mut self,
        statement: &str,
        params: &[(String, Value)],
    ) -> Result<Box<dyn Cursor>> {
        self.run(statement, params)
    }

    fn last_insert_id(&self) -> u64 {
        self.last_insert_id
    }

    fn table_names(&mut self) -> Result<Vec<String>> {
        if !self.open {
            return Err(DbError::Connection("connection is not open".to_string()));
        }
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

/// Extracts the first backtick-quoted name, returning the remainder after
/// the closing backtick.
fn backtick_name(text: &str) -> Result<(String, &str)> {
    let start = text
        .find('`')
        .ok_or_else(|| DbError::Statement(format!("expected quoted name in: {text}")))?;
    let rest = &text[start + 1..];
    let end = rest
        .find('`')
        .ok_or_else(|| DbError::Statement(format!("unterminated quoted name in: {text}")))?;
    Ok((rest[..end].to_string(), &rest[end + 1..]))
}

fn bound_value(params: &[(String, Value)], name: &str) -> Value {
    params
        .iter()
        .find(|(param, _)| param == name)
        .map(|(_, value)| value.clone())
        .unwrap_or(Value::Null)
}

fn row_id(row: &BTreeMap<String, Value>) -> Option<u64> {
    row.get("id").and_then(Value::as_u64)
}

fn parse_id_condition(condition: &str) -> Option<u64> {
    condition.trim().strip_prefix("id=")?.trim().parse().ok()
}

fn row_matches(
    row: &BTreeMap<String, Value>,
    condition: Option<&str>,
    params: &[(String, Value)],
) -> Result<bool> {
    let Some(condition) = condition else {
        return Ok(true);
    };

    if let Some(id) = parse_id_condition(condition) {
        return Ok(row_id(row) == Some(id));
    }

    for clause in condition.split(" AND ") {
        let (column, rest) = backtick_name(clause.trim())?;
        let mut tokens = rest.trim().splitn(2, ' ');
        let op = tokens
            .next()
            .and_then(parse_op)
            .ok_or_else(|| DbError::Statement(format!("malformed clause: {clause}")))?;
        let param = tokens
            .next()
            .map(str::trim)
            .and_then(|token| token.strip_prefix(':'))
            .ok_or_else(|| DbError::Statement(format!("malformed clause: {clause}")))?;

        let bound = bound_value(params, param);
        let cell = row.get(&column).cloned().unwrap_or(Value::Null);
        if !clause_matches(&cell, op, &bound)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn parse_op(token: &str) -> Option<FilterOp> {
    match token {
        "=" => Some(FilterOp::Eq),
        "<>" => Some(FilterOp::Ne),
        "<" => Some(FilterOp::Lt),
        "<=" => Some(FilterOp::Le),
        ">" => Some(FilterOp::Gt),
        ">=" => Some(FilterOp::Ge),
        "LIKE" => Some(FilterOp::Like),
        _ => None,
    }
}

fn clause_matches(cell: &Value, op: FilterOp, bound: &Value) -> Result<bool> {
    match op {
        FilterOp::Eq => Ok(cell == bound),
        FilterOp::Ne => Ok(cell != bound),
        FilterOp::Lt => Ok(cell.compare(bound)? == Ordering::Less),
        FilterOp::Le => Ok(cell.compare(bound)? != Ordering::Greater),
        FilterOp::Gt => Ok(cell.compare(bound)? == Ordering::Greater),
        FilterOp::Ge => Ok(cell.compare(bound)? != Ordering::Less),
        FilterOp::Like => Ok(match (cell.as_str(), bound.as_str()) {
            (Some(text), Some(pattern)) => like_match(pattern, text),
            _ => false,
        }),
    }
}

/// SQL LIKE with `%` and `_` wildcards, case-insensitive.
fn like_match(pattern: &str, text: &str) -> bool {
    let mut source = String::from("(?i)^");
    for ch in pattern.chars() {
        match ch {
            '%' => source.push_str(".*"),
            '_' => source.push('.'),
            other => source.push_str(&regex::escape(&other.to_string())),
        }
    }
    source.push('$');
    Regex::new(&source).map(|re| re.is_match(text)).unwrap_or(false)
}

use crate::core::{DbError, Result, Value};
use std::fmt;

/// Comparison operator of a single filter clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

impl FilterOp {
    pub fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Like => "LIKE",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql())
    }
}

/// Structured row predicate: a conjunction of `column OP value` clauses.
///
/// Values are always bound as named statement parameters and column names
/// must be bare identifiers, so no caller-supplied text ever reaches the
/// statement verbatim.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<(String, FilterOp, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-clause shorthand: `Filter::by("age", FilterOp::Gt, 18)`.
    pub fn by(column: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self::new().and(column, op, value)
    }

    /// Appends another clause; all clauses are ANDed together.
    pub fn and(mut self, column: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.clauses.push((column.into(), op, value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Renders the WHERE clause body plus its bound parameters.
    pub fn render(&self) -> Result<(String, Vec<(String, Value)>)> {
        let mut parts = Vec::with_capacity(self.clauses.len());
        let mut params = Vec::with_capacity(self.clauses.len());

        for (index, (column, op, value)) in self.clauses.iter().enumerate() {
            if !is_identifier(column) {
                return Err(DbError::Statement(format!(
                    "invalid filter column '{column}'"
                )));
            }

            let param = format!("f{index}");
            parts.push(format!("`{column}` {} :{param}", op.sql()));
            params.push((param, value.clone()));
        }

        Ok((parts.join(" AND "), params))
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

use serde::{Deserialize, Serialize};

/// A single column of a table definition.
///
/// Pure data; carries everything the DDL generator needs and nothing the
/// runtime model layer cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    /// Native SQL type spelling, e.g. "bigint" or "varchar(255)".
    pub sql_type: String,
    pub primary_key: bool,
    pub foreign_key: bool,
    pub unique_key: bool,
    pub nullable: bool,
    pub auto_increment: bool,
    /// Foreign key target, `(table, field)`.
    pub references: Option<(String, String)>,
    /// Literal default value spelled the way the server expects it.
    pub default_value: Option<String>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            primary_key: false,
            foreign_key: false,
            unique_key: false,
            nullable: false,
            auto_increment: false,
            references: None,
            default_value: None,
        }
    }

    /// The conventional primary-key field used by the model layer.
    pub fn id() -> Self {
        Self::new("id", "bigint").primary_key().auto_increment()
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique_key = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn references(mut self, table: impl Into<String>, field: impl Into<String>) -> Self {
        self.foreign_key = true;
        self.references = Some((table.into(), field.into()));
        self
    }

    pub fn default_value(mut self, literal: impl Into<String>) -> Self {
        self.default_value = Some(literal.into());
        self
    }
}

/// Immutable table definition used for DDL generation only; it has no
/// runtime relationship to the model layer beyond naming convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    name: String,
    fields: Vec<FieldDef>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_fields(name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Generates the CREATE TABLE statement.
    ///
    /// Key clauses (PRIMARY KEY / FOREIGN KEY / UNIQUE KEY) are emitted after
    /// the column list, and no trailing comma is left before the closing
    /// parenthesis; MariaDB rejects it.
    pub fn create_statement(&self, include_if_not_exists: bool) -> String {
        let mut columns = Vec::new();
        let mut keys = Vec::new();

        for field in &self.fields {
            let mut column = format!("`{}` {}", field.name, field.sql_type);
            if !field.nullable {
                column.push_str(" NOT NULL");
            }
            if field.auto_increment {
                column.push_str(" AUTO_INCREMENT");
            }
            if let Some(default) = &field.default_value {
                column.push_str(" DEFAULT ");
                column.push_str(default);
            }
            columns.push(column);

            if field.primary_key {
                keys.push(format!("PRIMARY KEY (`{}`)", field.name));
            }
            if field.foreign_key
                && let Some((table, target)) = &field.references
            {
                keys.push(format!(
                    "FOREIGN KEY (`{}`) REFERENCES {table}(`{target}`)",
                    field.name
                ));
            }
            if field.unique_key {
                keys.push(format!("UNIQUE KEY (`{}`)", field.name));
            }
        }

        let if_not_exists = if include_if_not_exists {
            "IF NOT EXISTS "
        } else {
            ""
        };

        if keys.is_empty() {
            format!(
                "CREATE TABLE {if_not_exists}`{}` ({} );",
                self.name,
                columns.join(",")
            )
        } else {
            format!(
                "CREATE TABLE {if_not_exists}`{}` ({},{});",
                self.name,
                columns.join(","),
                keys.join(",")
            )
        }
    }
}

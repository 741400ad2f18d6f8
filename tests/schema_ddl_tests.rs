use rustmodeldb::prelude::*;
use rustmodeldb::{FieldDef, MemoryDriver, TableDef};
use std::sync::Arc;

fn fresh_db() -> Database<MemoryDriver> {
    Database::new(
        MemoryDriver::new(),
        Arc::new(ModelRegistry::new()),
        Arc::new(TypeDispatch::with_defaults()),
    )
}

fn users_table() -> TableDef {
    TableDef::new("users")
        .field(FieldDef::id())
        .field(FieldDef::new("name", "varchar(255)"))
}

#[test]
fn test_create_table_and_list() {
    let db = fresh_db();

    db.create_table(&users_table(), false).unwrap();
    assert_eq!(db.tables().unwrap(), vec!["users".to_string()]);
}

#[test]
fn test_create_existing_table() {
    let db = fresh_db();
    db.create_table(&users_table(), false).unwrap();

    // errorless mode tolerates a pre-existing table
    db.create_table(&users_table(), false).unwrap();

    // strict mode does not
    let err = db.create_table(&users_table(), true).unwrap_err();
    assert!(matches!(err, DbError::Statement(_)));
    assert!(db.last_error_message().unwrap().contains("already exists"));
}

#[test]
fn test_empty_table_definition() {
    let db = fresh_db();

    let err = db.create_table(&TableDef::new("empty"), false).unwrap_err();
    assert!(matches!(err, DbError::Schema(_)));
    assert!(db.last_error_message().unwrap().contains("no fields specified"));
}

#[test]
fn test_drop_table() {
    let db = fresh_db();
    db.create_table(&users_table(), false).unwrap();

    db.drop_table("users").unwrap();
    assert!(db.tables().unwrap().is_empty());

    assert!(db.drop_table("users").is_err());
}

rustmodeldb::model! {
    pub struct Entry("users") {
        name: String = String::new(),
    }
}

#[test]
fn test_truncate_resets_ids() {
    let registry = Arc::new(ModelRegistry::new());
    registry.register::<Entry>().unwrap();
    let db = Database::new(
        MemoryDriver::new(),
        registry,
        Arc::new(TypeDispatch::with_defaults()),
    );
    db.create_table(&users_table(), false).unwrap();

    let mut entry = Entry::default();
    entry.set_name("first".to_string());
    db.save(&mut entry).unwrap();
    assert_eq!(entry.id(), 1);

    db.truncate_table("users").unwrap();
    assert!(db.find_all::<Entry>().unwrap().is_empty());

    // auto-increment starts over after a truncate
    let mut entry = Entry::default();
    entry.set_name("second".to_string());
    db.save(&mut entry).unwrap();
    assert_eq!(entry.id(), 1);
}

#[test]
fn test_generated_ddl_shape() {
    let table = TableDef::new("posts")
        .field(FieldDef::id())
        .field(FieldDef::new("title", "varchar(255)"))
        .field(FieldDef::new("author_id", "bigint").references("users", "id"))
        .field(FieldDef::new("slug", "varchar(64)").unique())
        .field(FieldDef::new("draft", "tinyint").default_value("1"));

    let sql = table.create_statement(false);

    assert_eq!(sql.matches("PRIMARY KEY").count(), 1);
    assert!(sql.contains("`id` bigint NOT NULL AUTO_INCREMENT"));
    assert!(sql.contains("FOREIGN KEY (`author_id`) REFERENCES users(`id`)"));
    assert!(sql.contains("UNIQUE KEY (`slug`)"));
    assert!(sql.contains("`draft` tinyint NOT NULL DEFAULT 1"));
    assert!(!sql.contains(",)"));
    assert!(sql.ends_with(");"));
}

use rustmodeldb::prelude::*;
use rustmodeldb::{FieldDef, MemoryDriver, TableDef, model};
use std::sync::Arc;

model! {
    pub struct User("users") {
        name: String = String::new(),
        age: i64 = 0,
        nickname: Option<String> = None,
    }
}

model! {
    pub struct Ghost("ghosts") {
        name: String = String::new(),
    }
}

fn users_table() -> TableDef {
    TableDef::new("users")
        .field(FieldDef::id())
        .field(FieldDef::new("name", "varchar(255)"))
        .field(FieldDef::new("age", "bigint"))
        .field(FieldDef::new("nickname", "varchar(255)").nullable())
}

fn fresh_db() -> (Database<MemoryDriver>, std::sync::Arc<std::sync::Mutex<Vec<String>>>) {
    let driver = MemoryDriver::new();
    let log = driver.log_handle();

    let registry = Arc::new(ModelRegistry::new());
    registry.register::<User>().unwrap();

    let db = Database::new(driver, registry, Arc::new(TypeDispatch::with_defaults()));
    db.create_table(&users_table(), false).unwrap();
    (db, log)
}

#[test]
fn test_new_record_transition() {
    let (db, _) = fresh_db();

    let mut user = User::default();
    user.set_name("Alice".to_string());
    user.set_age(30);
    assert!(user.is_new_record());

    db.save(&mut user).unwrap();

    assert!(!user.is_new_record());
    assert_ne!(user.id(), 0);
    assert!(!user.has_changes());
}

#[test]
fn test_save_find_roundtrip() {
    let (db, _) = fresh_db();

    let mut user = User::default();
    user.set_name("Alice".to_string());
    user.set_age(30);
    user.set_nickname(Some("Al".to_string()));
    db.save(&mut user).unwrap();

    let found: User = db.find(user.id()).unwrap();
    assert_eq!(found.name(), "Alice");
    assert_eq!(*found.age(), 30);
    assert_eq!(found.nickname(), &Some("Al".to_string()));
    assert!(!found.has_changes());

    // equality per the comparator dispatch table
    assert!(found.equals(&user, &TypeDispatch::with_defaults()));
}

#[test]
fn test_null_roundtrip() {
    let (db, _) = fresh_db();

    let mut user = User::default();
    user.set_name("Bob".to_string());
    user.set_age(17);
    db.save(&mut user).unwrap();

    let found: User = db.find(user.id()).unwrap();
    assert_eq!(found.nickname(), &None);
}

#[test]
fn test_update_only_changed_attributes() {
    let (db, log) = fresh_db();

    let mut user = User::default();
    user.set_name("Alice".to_string());
    user.set_age(30);
    db.save(&mut user).unwrap();

    user.set_age(31);
    db.save(&mut user).unwrap();

    let statements = log.lock().unwrap();
    let update = statements
        .iter()
        .find(|s| s.starts_with("UPDATE"))
        .expect("an UPDATE was issued");
    assert!(update.contains("age=:age"));
    assert!(!update.contains("name=:name"));
}

#[test]
fn test_save_idempotence() {
    let (db, log) = fresh_db();

    let mut user = User::default();
    user.set_name("Alice".to_string());
    user.set_age(30);
    db.save(&mut user).unwrap();

    let statements_after_insert = log.lock().unwrap().len();

    // unchanged persisted model: no statement at all, still a success
    db.save(&mut user).unwrap();
    db.save(&mut user).unwrap();

    assert_eq!(log.lock().unwrap().len(), statements_after_insert);
}

#[test]
fn test_delete_then_save_inserts() {
    let (db, log) = fresh_db();

    let mut user = User::default();
    user.set_name("Alice".to_string());
    user.set_age(30);
    db.save(&mut user).unwrap();
    let first_id = user.id();

    db.delete(&mut user).unwrap();
    assert_eq!(user.id(), 0);
    assert!(user.is_new_record());
    assert!(db.find::<User>(first_id).is_err());

    db.save(&mut user).unwrap();
    assert_ne!(user.id(), 0);

    let inserts = log
        .lock()
        .unwrap()
        .iter()
        .filter(|s| s.starts_with("INSERT"))
        .count();
    assert_eq!(inserts, 2);
}

#[test]
fn test_delete_new_record_is_noop() {
    let (db, log) = fresh_db();

    let mut user = User::default();
    let statements_before = log.lock().unwrap().len();
    db.delete(&mut user).unwrap();
    assert_eq!(log.lock().unwrap().len(), statements_before);
}

#[test]
fn test_find_missing_record() {
    let (db, _) = fresh_db();

    let err = db.find::<User>(4711).unwrap_err();
    assert!(matches!(err, DbError::NotFound(_)));
    assert!(db.last_error_message().unwrap().contains("users"));
}

#[test]
fn test_unregistered_type_runs_single_query() {
    let (db, log) = fresh_db();

    // seed one row the registry knows nothing about
    db.execute("CREATE TABLE `ghosts` (`id` bigint NOT NULL );").unwrap();
    db.execute("INSERT INTO `ghosts` (name) VALUES (:name);").unwrap();

    let before = log.lock().unwrap().len();
    let err = db.find::<Ghost>(1).unwrap_err();
    assert!(matches!(err, DbError::UnregisteredType(_)));

    let statements = log.lock().unwrap();
    assert_eq!(statements.len(), before + 1);
    assert!(statements.last().unwrap().starts_with("SELECT"));
}

#[test]
fn test_find_all_unregistered_aborts() {
    let (db, _) = fresh_db();

    db.execute("CREATE TABLE `ghosts` (`id` bigint NOT NULL );").unwrap();

    // an empty table never consults the registry
    assert!(db.find_all::<Ghost>().unwrap().is_empty());

    db.execute("INSERT INTO `ghosts` (name) VALUES (:name);").unwrap();
    assert!(matches!(
        db.find_all::<Ghost>(),
        Err(DbError::UnregisteredType(_))
    ));
}

#[test]
fn test_failed_statement_leaves_model_unchanged() {
    let (db, _) = fresh_db();

    db.drop_table("users").unwrap();

    let mut user = User::default();
    user.set_name("Alice".to_string());
    user.set_age(30);

    let err = db.save(&mut user).unwrap_err();
    assert!(matches!(err, DbError::Statement(_)));
    assert!(user.is_new_record());
    assert!(user.has_changes());
    assert!(db.last_error_message().is_some());
}

#[test]
fn test_find_all() {
    let (db, _) = fresh_db();

    for (name, age) in [("Alice", 30), ("Bob", 17)] {
        let mut user = User::default();
        user.set_name(name.to_string());
        user.set_age(age);
        db.save(&mut user).unwrap();
    }

    let users = db.find_all::<User>().unwrap();
    assert_eq!(users.len(), 2);
    let names: Vec<_> = users.iter().map(|u| u.name().clone()).collect();
    assert_eq!(names, vec!["Alice", "Bob"]);
}

#[test]
fn test_shared_defaults_wiring() {
    // the process-wide registry works the same way as an injected one
    ModelRegistry::shared().register::<User>().unwrap();

    let db = Database::with_defaults(MemoryDriver::new());
    db.create_table(&users_table(), false).unwrap();

    let mut user = User::default();
    user.set_name("Carol".to_string());
    user.set_age(42);
    db.save(&mut user).unwrap();

    let found: User = db.find(user.id()).unwrap();
    assert_eq!(found.name(), "Carol");
}

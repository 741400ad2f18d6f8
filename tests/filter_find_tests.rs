use rustmodeldb::prelude::*;
use rustmodeldb::{FieldDef, MemoryDriver, TableDef, model};
use std::sync::Arc;

model! {
    pub struct Person("people") {
        name: String = String::new(),
        age: i64 = 0,
    }
}

fn seeded_db() -> Database<MemoryDriver> {
    let registry = Arc::new(ModelRegistry::new());
    registry.register::<Person>().unwrap();

    let db = Database::new(
        MemoryDriver::new(),
        registry,
        Arc::new(TypeDispatch::with_defaults()),
    );

    db.create_table(
        &TableDef::new("people")
            .field(FieldDef::id())
            .field(FieldDef::new("name", "varchar(255)"))
            .field(FieldDef::new("age", "bigint")),
        false,
    )
    .unwrap();

    for (name, age) in [("Alice", 30), ("Bob", 17), ("Carol", 42), ("Dave", 25)] {
        let mut person = Person::default();
        person.set_name(name.to_string());
        person.set_age(age);
        db.save(&mut person).unwrap();
    }
    db
}

#[test]
fn test_find_all_with_filter() {
    let db = seeded_db();

    let adults = db
        .find_all_where::<Person>(&Filter::by("age", FilterOp::Gt, 18))
        .unwrap();

    assert_eq!(adults.len(), 3);
    for person in &adults {
        assert!(*person.age() > 18);
    }
}

#[test]
fn test_compound_filter() {
    let db = seeded_db();

    let filter = Filter::by("age", FilterOp::Gt, 18).and("age", FilterOp::Lt, 40);
    let people = db.find_all_where::<Person>(&filter).unwrap();

    let names: Vec<_> = people.iter().map(|p| p.name().clone()).collect();
    assert_eq!(names, vec!["Alice", "Dave"]);
}

#[test]
fn test_like_filter() {
    let db = seeded_db();

    let people = db
        .find_all_where::<Person>(&Filter::by("name", FilterOp::Like, "%a%"))
        .unwrap();

    // case-insensitive, so Alice matches too
    let names: Vec<_> = people.iter().map(|p| p.name().clone()).collect();
    assert_eq!(names, vec!["Alice", "Carol", "Dave"]);
}

#[test]
fn test_find_where_returns_first_match() {
    let db = seeded_db();

    let person = db
        .find_where::<Person>(&Filter::by("age", FilterOp::Ge, 18))
        .unwrap();
    assert_eq!(person.name(), "Alice");
}

#[test]
fn test_find_where_no_match() {
    let db = seeded_db();

    let err = db
        .find_where::<Person>(&Filter::by("age", FilterOp::Gt, 100))
        .unwrap_err();
    assert!(matches!(err, DbError::NotFound(_)));
}

#[test]
fn test_filter_by_name_equality() {
    let db = seeded_db();

    let person = db
        .find_where::<Person>(&Filter::by("name", FilterOp::Eq, "Carol"))
        .unwrap();
    assert_eq!(*person.age(), 42);
}

#[test]
fn test_malicious_filter_column_rejected() {
    let db = seeded_db();

    let err = db
        .find_all_where::<Person>(&Filter::by("age; DROP TABLE people", FilterOp::Eq, 1))
        .unwrap_err();
    assert!(matches!(err, DbError::Statement(_)));

    // the table is still there
    assert_eq!(db.find_all::<Person>().unwrap().len(), 4);
}

#[test]
fn test_filter_values_are_bound_not_spliced() {
    let db = seeded_db();

    // a value full of SQL metacharacters is just data
    let mut person = Person::default();
    person.set_name("Robert'); DROP TABLE people;--".to_string());
    person.set_age(99);
    db.save(&mut person).unwrap();

    let found = db
        .find_where::<Person>(&Filter::by(
            "name",
            FilterOp::Eq,
            "Robert'); DROP TABLE people;--",
        ))
        .unwrap();
    assert_eq!(*found.age(), 99);
    assert_eq!(db.find_all::<Person>().unwrap().len(), 5);
}

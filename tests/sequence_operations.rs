// Value functions, lifecycle and listings against the in-memory server
mod common;

use common::server;
use postgrust_admin::{
    status_code, AdminError, CreateSequence, SequenceAdmin, ServerVersion,
};

const V14: ServerVersion = ServerVersion::new(14, 0);

#[test]
fn test_nextval_and_setval() {
    let mut conn = server(V14);
    let mut admin = SequenceAdmin::for_version(&mut conn, V14, "public").unwrap();
    assert_eq!(admin.nextval("s1").unwrap(), 8);
    assert_eq!(admin.setval("s1", 42).unwrap(), 42);
    assert_eq!(admin.nextval("s1").unwrap(), 43);
}

#[test]
fn test_setval_out_of_bounds_is_engine_error() {
    let mut conn = server(V14);
    let mut admin = SequenceAdmin::for_version(&mut conn, V14, "public").unwrap();
    let result = admin.setval("s1", 501);
    assert_eq!(status_code(&result), -9);
    assert_eq!(admin.get_sequence("s1").unwrap().last_value, 7);
}

#[test]
fn test_value_functions_on_missing_sequence() {
    let mut conn = server(V14);
    let mut admin = SequenceAdmin::for_version(&mut conn, V14, "public").unwrap();
    assert!(matches!(admin.nextval("ghost"), Err(AdminError::NotFound(_))));
    assert!(matches!(admin.setval("ghost", 1), Err(AdminError::NotFound(_))));
    assert!(matches!(admin.reset("ghost"), Err(AdminError::NotFound(_))));
    assert!(matches!(admin.restart("ghost"), Err(AdminError::NotFound(_))));
}

#[test]
fn test_restart_returns_to_start_value() {
    let mut conn = server(V14);
    conn.add_sequence("public", "s1", "alice").start_value = 3;
    let mut admin = SequenceAdmin::for_version(&mut conn, V14, "public").unwrap();
    admin.restart("s1").unwrap();
    assert_eq!(admin.nextval("s1").unwrap(), 3);
    assert_eq!(admin.nextval("s1").unwrap(), 4);
}

#[test]
fn test_reset_returns_to_min_value() {
    let mut conn = server(V14);
    let mut admin = SequenceAdmin::for_version(&mut conn, V14, "public").unwrap();
    assert_eq!(admin.reset("s1").unwrap(), 1);
    assert_eq!(admin.nextval("s1").unwrap(), 2);
}

#[test]
fn test_create_then_read() {
    let mut conn = server(V14);
    let mut admin = SequenceAdmin::for_version(&mut conn, V14, "public").unwrap();
    let request = CreateSequence {
        increment: Some(10),
        max_value: Some(10_000),
        start: Some(100),
        cache: Some(5),
        cycle: true,
        ..CreateSequence::new("invoice_no")
    };
    admin.create(&request).unwrap();

    let seq = admin.get_sequence("invoice_no").unwrap();
    assert_eq!(seq.owner, "postgres");
    assert_eq!(seq.increment_by, 10);
    assert_eq!((seq.min_value, seq.max_value), (1, 10_000));
    assert_eq!(seq.start_value, 100);
    assert_eq!(seq.cache_value, 5);
    assert!(seq.is_cycled);
    assert_eq!(admin.nextval("invoice_no").unwrap(), 100);
    assert_eq!(admin.nextval("invoice_no").unwrap(), 110);
}

#[test]
fn test_create_existing_name_fails() {
    let mut conn = server(V14);
    let mut admin = SequenceAdmin::for_version(&mut conn, V14, "public").unwrap();
    let result = admin.create(&CreateSequence::new("s1"));
    match result.unwrap_err() {
        AdminError::Engine(e) => assert_eq!(e.sqlstate.as_deref(), Some("42P07")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_drop() {
    let mut conn = server(V14);
    let mut admin = SequenceAdmin::for_version(&mut conn, V14, "public").unwrap();
    admin.drop("s1", true).unwrap();
    assert!(matches!(admin.get_sequence("s1"), Err(AdminError::NotFound(_))));

    let result = admin.drop("s1", false);
    assert_eq!(status_code(&result), -2);
    assert_eq!(
        conn.statement_log().last().map(String::as_str),
        Some("DROP SEQUENCE \"public\".\"s1\"")
    );
}

#[test]
fn test_listing_current_schema() {
    let mut conn = server(V14);
    conn.add_sequence("public", "a_first", "bob");
    conn.add_sequence("archive", "old", "alice");

    let mut admin = SequenceAdmin::for_version(&mut conn, V14, "public").unwrap();
    let list = admin.get_sequences(false).unwrap();
    let names: Vec<&str> = list.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["a_first", "s1"]);
    assert_eq!(list[1].comment.as_deref(), Some("order ids"));
    assert_eq!(list[1].tablespace, None);
}

#[test]
fn test_listing_all_schemas_skips_system_schemas() {
    let mut conn = server(V14);
    conn.add_sequence("archive", "old", "alice");
    conn.add_sequence("pg_catalog", "internal", "postgres");
    conn.add_sequence("information_schema", "internal", "postgres");

    let mut admin = SequenceAdmin::for_version(&mut conn, V14, "public").unwrap();
    let list = admin.get_sequences(true).unwrap();
    let names: Vec<(&str, &str)> = list
        .iter()
        .map(|s| (s.schema.as_str(), s.name.as_str()))
        .collect();
    assert_eq!(names, vec![("archive", "old"), ("public", "s1")]);
    assert!(list.iter().all(|s| s.comment.is_none()));
}

#[test]
fn test_listing_empty_schema() {
    let mut conn = server(V14);
    let mut admin = SequenceAdmin::for_version(&mut conn, V14, "archive").unwrap();
    assert!(admin.get_sequences(false).unwrap().is_empty());
}

//! End-to-end tests against SQLite through the sqlx backend.

use pretty_assertions::assert_eq;
use sqlmux::prelude::*;

fn bridge() -> Bridge {
    Bridge::new(&BridgeConfig::default()).unwrap()
}

fn call(bridge: &mut Bridge, op: &str, args: &[Value]) -> Outcome {
    let resp = bridge.dispatch(op, args);
    if let Some(e) = &resp.error {
        panic!("{} failed: {}", op, e);
    }
    resp.result
}

fn row(pairs: &[(&str, Value)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn test_end_to_end_memory_database() {
    let mut b = bridge();

    assert_eq!(call(&mut b, "open", &[":memory:".into()]), Outcome::Handle(0));

    assert_eq!(
        call(
            &mut b,
            "exec",
            &[0.into(), "CREATE TABLE t(id INTEGER PRIMARY KEY, v TEXT)".into()]
        ),
        Outcome::Exec(ExecSummary {
            last_insert_id: 0,
            rows_affected: 0,
        })
    );

    assert_eq!(
        call(
            &mut b,
            "exec",
            &[0.into(), "INSERT INTO t(v) VALUES(?)".into(), "hello".into()]
        ),
        Outcome::Exec(ExecSummary {
            last_insert_id: 1,
            rows_affected: 1,
        })
    );

    assert_eq!(
        call(&mut b, "query", &[0.into(), "SELECT * FROM t".into()]),
        Outcome::Rows(vec![row(&[
            ("id", Value::Number(1.0)),
            ("v", "hello".into())
        ])])
    );

    assert_eq!(
        call(&mut b, "queryResult", &[0.into(), "SELECT COUNT(*) FROM t".into()]),
        Outcome::Scalar(Value::Number(1.0))
    );

    assert_eq!(call(&mut b, "close", &[0.into()]), Outcome::None);

    let again = b.dispatch("close", &[0.into()]);
    assert_eq!(again.error.unwrap().kind(), "InvalidHandle");
}

#[test]
fn test_handle_equals_prior_registry_length() {
    let mut b = bridge();
    for _ in 0..3 {
        let before = b.registry().len() as i64;
        assert_eq!(call(&mut b, "open", &[":memory:".into()]), Outcome::Handle(before));
    }
}

#[test]
fn test_unreachable_database() {
    let mut b = bridge();
    let dir = tempfile::tempdir().unwrap();
    let name = dir.path().join("missing").join("app.db");

    let resp = b.dispatch("open", &[Value::from(name.to_string_lossy().to_string())]);
    assert_eq!(resp.result, Outcome::Handle(-1));
    let err = resp.error.unwrap();
    assert_eq!(err.kind(), "DriverError");
    assert!(err.to_string().starts_with("open("), "{}", err);
    assert_eq!(b.registry().len(), 0);
}

#[test]
fn test_zero_matches_are_not_errors() {
    let mut b = bridge();
    call(&mut b, "open", &[":memory:".into()]);
    call(&mut b, "exec", &[0.into(), "CREATE TABLE t(id INTEGER)".into()]);

    assert_eq!(
        call(&mut b, "query", &[0.into(), "SELECT * FROM t".into()]),
        Outcome::Rows(vec![])
    );
    assert_eq!(
        call(&mut b, "queryRow", &[0.into(), "SELECT * FROM t WHERE id = ?".into(), 4.into()]),
        Outcome::Row(Row::new())
    );

    // queryResult keeps the driver's own no-rows error.
    let resp = b.dispatch("queryResult", &[0.into(), "SELECT id FROM t".into()]);
    assert_eq!(resp.error.unwrap().kind(), "DriverError");
}

#[test]
fn test_guard_blocks_mutation() {
    let mut b = bridge();
    call(&mut b, "open", &[":memory:".into()]);
    call(&mut b, "exec", &[0.into(), "CREATE TABLE t(id INTEGER)".into()]);

    for op in ["query", "queryRow", "queryResult"] {
        let resp = b.dispatch(op, &[0.into(), "INSERT INTO t VALUES(1)".into()]);
        assert_eq!(resp.error.unwrap().kind(), "StatementGuardViolation");
    }
    assert_eq!(
        call(&mut b, "queryResult", &[0.into(), "select count(*) from t".into()]),
        Outcome::Scalar(Value::Number(0.0))
    );
}

#[test]
fn test_value_kinds_marshal() {
    let mut b = bridge();
    call(&mut b, "open", &[":memory:".into()]);
    call(
        &mut b,
        "exec",
        &[0.into(), "CREATE TABLE k(i INTEGER, r REAL, s TEXT, b BLOB, n TEXT)".into()],
    );
    call(
        &mut b,
        "exec",
        &[
            0.into(),
            "INSERT INTO k VALUES(?, ?, ?, ?, ?)".into(),
            Value::Number(-7.0),
            Value::Number(2.5),
            "txt".into(),
            Value::Bytes(vec![0, 159, 255]),
            Value::Null,
        ],
    );

    assert_eq!(
        call(&mut b, "queryRow", &[0.into(), "SELECT * FROM k".into()]),
        Outcome::Row(row(&[
            ("i", Value::Number(-7.0)),
            ("r", Value::Number(2.5)),
            ("s", "txt".into()),
            ("b", Value::Bytes(vec![0, 159, 255])),
            ("n", Value::Null),
        ]))
    );
}

#[test]
fn test_duplicate_column_names_keep_later_value() {
    let mut b = bridge();
    call(&mut b, "open", &[":memory:".into()]);
    assert_eq!(
        call(&mut b, "queryRow", &[0.into(), "SELECT 1 AS a, 2 AS a".into()]),
        Outcome::Row(row(&[("a", Value::Number(2.0))]))
    );
}

#[test]
fn test_driver_errors_pass_through() {
    let mut b = bridge();
    call(&mut b, "open", &[":memory:".into()]);
    let resp = b.dispatch("exec", &[0.into(), "INSERT INTO nope VALUES(1)".into()]);
    let err = resp.error.unwrap();
    assert_eq!(err.kind(), "DriverError");
    assert!(err.to_string().contains("no such table"), "{}", err);
    assert_eq!(resp.result, Outcome::None);
}

#[test]
fn test_file_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.db");
    let name = path.to_string_lossy().to_string();

    let client = Client::new(&BridgeConfig::default()).unwrap();
    let db = client.open(&name).unwrap();
    db.exec("CREATE TABLE notes(body TEXT)", &[]).unwrap();
    db.exec("INSERT INTO notes VALUES(?)", &["kept".into()]).unwrap();
    db.close().unwrap();
    assert!(path.exists());

    let db = client.open(&name).unwrap();
    assert_eq!(db.handle(), 1);
    assert_eq!(
        db.query_result("SELECT body FROM notes", &[]).unwrap(),
        Value::from("kept")
    );
    client.shutdown();
}

#[test]
fn test_no_create_refuses_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let name = dir.path().join("absent.db").to_string_lossy().to_string();

    let config = BridgeConfig::builder().create_if_missing(false).build();
    let client = Client::new(&config).unwrap();
    assert_eq!(client.open(&name).unwrap_err().kind(), "DriverError");
}

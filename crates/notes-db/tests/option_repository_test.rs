use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use notes_core::error::StoreError;
use notes_core::option_store::OptionStore;
use notes_db::{Config, Db, DbError, OptionRepository};

fn temp_db_path(prefix: &str) -> PathBuf {
    static UNIQUE_SUFFIX: AtomicU64 = AtomicU64::new(0);
    let nanos = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(value) => value.as_nanos(),
        Err(_) => 0,
    };
    let suffix = UNIQUE_SUFFIX.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "notes-db-option-{prefix}-{nanos}-{}-{suffix}.sqlite",
        std::process::id(),
    ))
}

fn setup_db(prefix: &str) -> (Db, PathBuf) {
    let path = temp_db_path(prefix);
    let mut db = match Db::open(Config::new(&path)) {
        Ok(value) => value,
        Err(err) => panic!("open db failed: {err}"),
    };
    if let Err(err) = db.migrate_up() {
        panic!("migrate_up failed: {err}");
    }
    (db, path)
}

#[test]
fn add_get_and_duplicate_add() {
    let (db, path) = setup_db("add");
    let repo = OptionRepository::new(&db);

    assert_eq!(repo.get("akismet").ok(), Some(None));
    if let Err(err) = repo.add("akismet", "{}") {
        panic!("add failed: {err}");
    }
    assert_eq!(repo.get("akismet").ok(), Some(Some("{}".to_string())));

    match repo.add("akismet", "other") {
        Err(DbError::OptionAlreadyExists(name)) => assert_eq!(name, "akismet"),
        other => panic!("expected OptionAlreadyExists, got {other:?}"),
    }
    assert_eq!(repo.get("akismet").ok(), Some(Some("{}".to_string())));

    let _ = std::fs::remove_file(path);
}

#[test]
fn empty_string_is_distinct_from_absent() {
    let (db, path) = setup_db("empty");
    let repo = OptionRepository::new(&db);

    if let Err(err) = repo.add("marker", "") {
        panic!("add failed: {err}");
    }
    assert_eq!(repo.get("marker").ok(), Some(Some(String::new())));
    assert_eq!(repo.get("missing").ok(), Some(None));

    let _ = std::fs::remove_file(path);
}

#[test]
fn update_upserts_and_keeps_created_at() {
    let (db, path) = setup_db("update");
    let repo = OptionRepository::new(&db);

    if let Err(err) = repo.update("k", "v1") {
        panic!("update (insert) failed: {err}");
    }
    let first = match repo.get_row("k") {
        Ok(Some(row)) => row,
        other => panic!("expected row, got {other:?}"),
    };
    if let Err(err) = repo.update("k", "v2") {
        panic!("update failed: {err}");
    }
    let second = match repo.get_row("k") {
        Ok(Some(row)) => row,
        other => panic!("expected row, got {other:?}"),
    };
    assert_eq!(second.value, "v2");
    assert_eq!(second.created_at, first.created_at);
    assert_eq!(repo.count().ok(), Some(1));

    let _ = std::fs::remove_file(path);
}

#[test]
fn delete_reports_whether_a_row_was_removed() {
    let (db, path) = setup_db("delete");
    let repo = OptionRepository::new(&db);

    if let Err(err) = repo.add("k", "v") {
        panic!("add failed: {err}");
    }
    assert_eq!(repo.delete("k").ok(), Some(true));
    assert_eq!(repo.delete("k").ok(), Some(false));
    assert_eq!(repo.get("k").ok(), Some(None));

    let _ = std::fs::remove_file(path);
}

#[test]
fn list_names_filters_by_prefix() {
    let (db, path) = setup_db("list");
    let repo = OptionRepository::new(&db);

    for name in ["hello-dolly/hello.php", "akismet/akismet.php", "akismet-extra"] {
        if let Err(err) = repo.add(name, "") {
            panic!("add {name} failed: {err}");
        }
    }
    assert_eq!(
        repo.list_names("akismet").ok(),
        Some(vec![
            "akismet-extra".to_string(),
            "akismet/akismet.php".to_string()
        ])
    );
    assert_eq!(repo.list_names("").ok().map(|names| names.len()), Some(3));
    assert_eq!(repo.list_names("%").ok(), Some(Vec::new()));

    let _ = std::fs::remove_file(path);
}

#[test]
fn blank_names_are_rejected() {
    let (db, path) = setup_db("blank");
    let repo = OptionRepository::new(&db);

    assert!(matches!(repo.add("  ", "v"), Err(DbError::Validation(_))));
    assert!(matches!(repo.update("", "v"), Err(DbError::Validation(_))));

    let _ = std::fs::remove_file(path);
}

#[test]
fn option_store_contract_maps_errors() {
    let (db, path) = setup_db("contract");
    let repo = OptionRepository::new(&db);
    let store: &dyn OptionStore = &repo;

    assert_eq!(store.add("k", "v"), Ok(()));
    assert_eq!(
        store.add("k", "w"),
        Err(StoreError::AlreadyExists { key: "k".into() })
    );
    assert_eq!(store.update("k", "w"), Ok(()));
    assert_eq!(store.get("k"), Ok(Some("w".to_string())));
    assert_eq!(store.delete("k"), Ok(()));
    assert_eq!(store.delete("k"), Ok(()));
    assert_eq!(store.get("k"), Ok(None));

    let _ = std::fs::remove_file(path);
}

#[test]
fn missing_table_surfaces_as_backend_error() {
    let db = match Db::open_in_memory() {
        Ok(value) => value,
        Err(err) => panic!("open in-memory db failed: {err}"),
    };
    let repo = OptionRepository::new(&db);
    let store: &dyn OptionStore = &repo;
    assert!(matches!(store.get("k"), Err(StoreError::Backend { .. })));
}

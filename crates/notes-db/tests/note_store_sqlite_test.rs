use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use notes_core::clock::{FixedClock, ScriptedSuffix};
use notes_core::{NoteError, NoteStore};
use notes_db::{Config, Db, OptionRepository};

const PLUGIN: &str = "akismet/akismet.php";
const T0: i64 = 1_700_000_000;

fn temp_db_path(prefix: &str) -> PathBuf {
    static UNIQUE_SUFFIX: AtomicU64 = AtomicU64::new(0);
    let nanos = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(value) => value.as_nanos(),
        Err(_) => 0,
    };
    let suffix = UNIQUE_SUFFIX.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "notes-db-store-{prefix}-{nanos}-{}-{suffix}.sqlite",
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
fn notes_round_trip_through_sqlite() {
    let (db, path) = setup_db("round-trip");
    let repo = OptionRepository::new(&db);
    let clock = FixedClock::new(T0);
    let suffixes = ScriptedSuffix::new(&[42, 42, 17]);
    let store = match NoteStore::new(PLUGIN, &repo) {
        Ok(store) => store.with_clock(&clock).with_suffix_source(&suffixes),
        Err(err) => panic!("new store failed: {err}"),
    };

    assert_eq!(store.has_notes(), Ok(false));
    let first = match store.initialize("Check https://example.com", "info", "admin") {
        Ok(index) => index,
        Err(err) => panic!("initialize failed: {err}"),
    };
    assert_eq!(first.as_str(), "1700000000_42");

    // Same second, same scripted suffix: the store must retry.
    let second = match store.append("<b>second</b><script>x</script>", "", "editor") {
        Ok(index) => index,
        Err(err) => panic!("append failed: {err}"),
    };
    assert_eq!(second.as_str(), "1700000000_17");

    let all = match store.get_all_notes() {
        Ok(all) => all,
        Err(err) => panic!("get_all_notes failed: {err}"),
    };
    assert_eq!(all.len(), 2);
    assert_eq!(
        all[&first].text,
        "Check <a href=\"https://example.com\">https://example.com</a>"
    );
    assert_eq!(all[&second].text, "<b>second</b>x");

    assert_eq!(
        store.initialize("again", "", "admin"),
        Err(NoteError::CollectionAlreadyExists {
            plugin_id: PLUGIN.to_string()
        })
    );

    assert_eq!(store.delete(first.as_str()), Ok(true));
    assert_eq!(store.has_notes(), Ok(true));
    assert_eq!(store.delete(second.as_str()), Ok(true));
    assert_eq!(store.has_notes(), Ok(false));
    assert_eq!(repo.get(PLUGIN).ok(), Some(None));

    drop(store);
    drop(db);
    let _ = std::fs::remove_file(path);
}

#[test]
fn notes_survive_reopening_the_database() {
    let (db, path) = setup_db("reopen");
    {
        let repo = OptionRepository::new(&db);
        let store = match NoteStore::new(PLUGIN, &repo) {
            Ok(store) => store,
            Err(err) => panic!("new store failed: {err}"),
        };
        if let Err(err) = store.initialize("persisted", "warning", "admin") {
            panic!("initialize failed: {err}");
        }
    }
    drop(db);

    let db = match Db::open(Config::new(&path)) {
        Ok(value) => value,
        Err(err) => panic!("reopen db failed: {err}"),
    };
    let repo = OptionRepository::new(&db);
    let store = match NoteStore::new(PLUGIN, &repo) {
        Ok(store) => store,
        Err(err) => panic!("new store failed: {err}"),
    };
    let notes = match store.notes() {
        Ok(notes) => notes,
        Err(err) => panic!("notes failed: {err}"),
    };
    assert_eq!(notes.len(), 1);
    let note = notes.values().next();
    assert_eq!(note.map(|n| n.text.as_str()), Some("persisted"));
    assert_eq!(note.map(|n| n.user.as_str()), Some("admin"));

    drop(store);
    drop(db);
    let _ = std::fs::remove_file(path);
}

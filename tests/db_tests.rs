//! Integration tests for database operations
//!
//! Each test runs against a fresh temporary SQLite file.

use rusqlite::Connection;
use tempfile::NamedTempFile;

use city_expert::db::{
    add_favorite, get_or_create_user, get_user_by_telegram_id, init_database_schema, is_favorite,
    list_favorites, recent_searches, record_search, remove_favorite,
};

fn create_test_db() -> (NamedTempFile, Connection) {
    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let conn = Connection::open(temp_file.path()).expect("Failed to open database");
    init_database_schema(&conn).expect("Failed to initialize schema");
    (temp_file, conn)
}

#[test]
fn test_user_upsert_is_idempotent() {
    let (_temp, conn) = create_test_db();

    let first = get_or_create_user(&conn, 42, "Alice", Some("alice")).unwrap();
    let second = get_or_create_user(&conn, 42, "Alice Updated", None).unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.full_name, "Alice Updated");
    assert_eq!(second.username, None);
}

#[test]
fn test_unknown_user_lookup_returns_none() {
    let (_temp, conn) = create_test_db();
    assert!(get_user_by_telegram_id(&conn, 999).unwrap().is_none());
}

#[test]
fn test_favorite_toggle_cycle() {
    let (_temp, conn) = create_test_db();
    let user = get_or_create_user(&conn, 1, "Bob", None).unwrap();

    assert!(!is_favorite(&conn, user.id, "55.750000,37.610000").unwrap());
    assert!(add_favorite(&conn, user.id, "55.750000,37.610000", "Red Square").unwrap());
    assert!(is_favorite(&conn, user.id, "55.750000,37.610000").unwrap());
    assert!(remove_favorite(&conn, user.id, "55.750000,37.610000").unwrap());
    assert!(!is_favorite(&conn, user.id, "55.750000,37.610000").unwrap());
}

#[test]
fn test_duplicate_favorite_is_ignored() {
    let (_temp, conn) = create_test_db();
    let user = get_or_create_user(&conn, 1, "Bob", None).unwrap();

    assert!(add_favorite(&conn, user.id, "1.000000,2.000000", "Spot").unwrap());
    assert!(!add_favorite(&conn, user.id, "1.000000,2.000000", "Spot").unwrap());
    assert_eq!(list_favorites(&conn, user.id).unwrap().len(), 1);
}

#[test]
fn test_favorites_are_per_user() {
    let (_temp, conn) = create_test_db();
    let alice = get_or_create_user(&conn, 1, "Alice", None).unwrap();
    let bob = get_or_create_user(&conn, 2, "Bob", None).unwrap();

    add_favorite(&conn, alice.id, "1.000000,2.000000", "Spot").unwrap();

    assert!(is_favorite(&conn, alice.id, "1.000000,2.000000").unwrap());
    assert!(!is_favorite(&conn, bob.id, "1.000000,2.000000").unwrap());
    assert!(list_favorites(&conn, bob.id).unwrap().is_empty());
}

#[test]
fn test_remove_missing_favorite_reports_false() {
    let (_temp, conn) = create_test_db();
    let user = get_or_create_user(&conn, 1, "Bob", None).unwrap();

    assert!(!remove_favorite(&conn, user.id, "9.000000,9.000000").unwrap());
}

#[test]
fn test_search_history_ordering_and_limit() {
    let (_temp, conn) = create_test_db();
    let user = get_or_create_user(&conn, 1, "Carol", None).unwrap();

    for i in 0..5 {
        record_search(&conn, user.id, &format!("query {i}"), None, None, i).unwrap();
    }

    let recent = recent_searches(&conn, user.id, 3).unwrap();
    assert_eq!(recent.len(), 3);
    // Newest first; timestamps share a second, so id breaks the tie.
    assert_eq!(recent[0].query, "query 4");
    assert_eq!(recent[2].query, "query 2");
}

#[test]
fn test_search_history_records_location_and_count() {
    let (_temp, conn) = create_test_db();
    let user = get_or_create_user(&conn, 1, "Carol", None).unwrap();

    record_search(&conn, user.id, "attractions", Some(55.75), Some(37.61), 12).unwrap();

    let recent = recent_searches(&conn, user.id, 10).unwrap();
    assert_eq!(recent.len(), 1);
    let record = &recent[0];
    assert_eq!(record.query, "attractions");
    assert_eq!(record.results_count, 12);
    assert!((record.latitude.unwrap() - 55.75).abs() < 1e-9);
    assert!((record.longitude.unwrap() - 37.61).abs() < 1e-9);
}

#[test]
fn test_deleting_user_cascades_to_favorites_and_history() {
    let (_temp, conn) = create_test_db();
    let user = get_or_create_user(&conn, 7, "Dave", None).unwrap();
    add_favorite(&conn, user.id, "1.000000,2.000000", "Spot").unwrap();
    record_search(&conn, user.id, "coffee", None, None, 3).unwrap();

    conn.execute("DELETE FROM users WHERE id = ?1", [user.id])
        .unwrap();

    let favorites: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM favorite_places WHERE user_id = ?1",
            [user.id],
            |row| row.get(0),
        )
        .unwrap();
    let history: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM search_history WHERE user_id = ?1",
            [user.id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(favorites, 0);
    assert_eq!(history, 0);
}

//! SQLite persistence: users, favorite places, and search history
//!
//! All operations are plain synchronous CRUD against a single connection;
//! callers share the connection behind an async mutex. The schema is created
//! idempotently at startup.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

/// A Telegram user known to the bot. Created on first interaction,
/// never deleted by the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub full_name: String,
    pub username: Option<String>,
    pub created_at: String,
}

/// A user's bookmarked place, keyed by the coordinate-derived place id.
#[derive(Debug, Clone, PartialEq)]
pub struct FavoritePlace {
    pub id: i64,
    pub user_id: i64,
    pub place_id: String,
    pub name: String,
    pub added_at: String,
}

/// One recorded search. Rows are append-only.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRecord {
    pub id: i64,
    pub user_id: i64,
    pub query: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub results_count: i64,
    pub is_favorite: bool,
    pub created_at: String,
}

/// Initialize the database schema
pub fn init_database_schema(conn: &Connection) -> Result<()> {
    info!("Initializing database schema...");

    // Cascading deletes from users require foreign keys on this connection.
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("Failed to enable foreign keys")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            telegram_id INTEGER NOT NULL UNIQUE,
            full_name TEXT NOT NULL,
            username TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create users table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS favorite_places (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            place_id TEXT NOT NULL,
            name TEXT NOT NULL,
            added_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(user_id, place_id)
        )",
        [],
    )
    .context("Failed to create favorite_places table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS search_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            query TEXT NOT NULL,
            latitude REAL,
            longitude REAL,
            results_count INTEGER NOT NULL DEFAULT 0,
            is_favorite INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create search_history table")?;

    info!("Database schema initialized successfully");
    Ok(())
}

/// Get the user for a Telegram id, creating or refreshing it in a single
/// upsert. Display name and handle follow what Telegram currently reports.
pub fn get_or_create_user(
    conn: &Connection,
    telegram_id: i64,
    full_name: &str,
    username: Option<&str>,
) -> Result<User> {
    conn.execute(
        "INSERT INTO users (telegram_id, full_name, username) VALUES (?1, ?2, ?3)
         ON CONFLICT(telegram_id) DO UPDATE SET full_name = ?2, username = ?3",
        params![telegram_id, full_name, username],
    )
    .context("Failed to upsert user")?;

    let user = conn
        .query_row(
            "SELECT id, telegram_id, full_name, username, created_at
             FROM users WHERE telegram_id = ?1",
            params![telegram_id],
            row_to_user,
        )
        .context("Failed to read back upserted user")?;

    debug!(telegram_id, user_id = user.id, "User resolved");
    Ok(user)
}

/// Look up a user by Telegram id without creating one.
pub fn get_user_by_telegram_id(conn: &Connection, telegram_id: i64) -> Result<Option<User>> {
    conn.query_row(
        "SELECT id, telegram_id, full_name, username, created_at
         FROM users WHERE telegram_id = ?1",
        params![telegram_id],
        row_to_user,
    )
    .optional()
    .context("Failed to query user")
}

/// Add a place to a user's favorites. Returns `false` when the place was
/// already favorited (the unique index makes the insert a no-op).
pub fn add_favorite(conn: &Connection, user_id: i64, place_id: &str, name: &str) -> Result<bool> {
    let rows = conn
        .execute(
            "INSERT OR IGNORE INTO favorite_places (user_id, place_id, name)
             VALUES (?1, ?2, ?3)",
            params![user_id, place_id, name],
        )
        .context("Failed to insert favorite")?;

    debug!(user_id, place_id, added = rows > 0, "Favorite add");
    Ok(rows > 0)
}

/// Remove a place from a user's favorites. Returns `false` when no row matched.
pub fn remove_favorite(conn: &Connection, user_id: i64, place_id: &str) -> Result<bool> {
    let rows = conn
        .execute(
            "DELETE FROM favorite_places WHERE user_id = ?1 AND place_id = ?2",
            params![user_id, place_id],
        )
        .context("Failed to delete favorite")?;

    debug!(user_id, place_id, removed = rows > 0, "Favorite remove");
    Ok(rows > 0)
}

/// Whether a place is currently in a user's favorites.
pub fn is_favorite(conn: &Connection, user_id: i64, place_id: &str) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM favorite_places WHERE user_id = ?1 AND place_id = ?2",
            params![user_id, place_id],
            |row| row.get(0),
        )
        .context("Failed to query favorite")?;
    Ok(count > 0)
}

/// All favorites for a user, most recently added first.
pub fn list_favorites(conn: &Connection, user_id: i64) -> Result<Vec<FavoritePlace>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, user_id, place_id, name, added_at
             FROM favorite_places WHERE user_id = ?1
             ORDER BY added_at DESC, id DESC",
        )
        .context("Failed to prepare favorites query")?;

    let favorites = stmt
        .query_map(params![user_id], |row| {
            Ok(FavoritePlace {
                id: row.get(0)?,
                user_id: row.get(1)?,
                place_id: row.get(2)?,
                name: row.get(3)?,
                added_at: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to read favorites")?;

    Ok(favorites)
}

/// Record one executed search. History rows are never mutated afterwards.
pub fn record_search(
    conn: &Connection,
    user_id: i64,
    query: &str,
    latitude: Option<f64>,
    longitude: Option<f64>,
    results_count: usize,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO search_history (user_id, query, latitude, longitude, results_count)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user_id, query, latitude, longitude, results_count as i64],
    )
    .context("Failed to insert search record")?;

    Ok(conn.last_insert_rowid())
}

/// The user's most recent searches, newest first.
pub fn recent_searches(conn: &Connection, user_id: i64, limit: usize) -> Result<Vec<SearchRecord>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, user_id, query, latitude, longitude, results_count, is_favorite, created_at
             FROM search_history WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC LIMIT ?2",
        )
        .context("Failed to prepare history query")?;

    let history = stmt
        .query_map(params![user_id, limit as i64], |row| {
            Ok(SearchRecord {
                id: row.get(0)?,
                user_id: row.get(1)?,
                query: row.get(2)?,
                latitude: row.get(3)?,
                longitude: row.get(4)?,
                results_count: row.get(5)?,
                is_favorite: row.get::<_, i64>(6)? != 0,
                created_at: row.get(7)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to read search history")?;

    Ok(history)
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        telegram_id: row.get(1)?,
        full_name: row.get(2)?,
        username: row.get(3)?,
        created_at: row.get(4)?,
    })
}

//! Database Connection and Setup
//!
//! Opens the SQLite file (or `:memory:`) and runs migrations.

use std::path::Path;

use rusqlite::Connection;

use crate::domain::GatewayResult;
use super::storage_err;

/// Open a connection and bring the schema up to date
pub fn open_connection(db_path: &Path) -> GatewayResult<Connection> {
    let conn = Connection::open(db_path).map_err(storage_err)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Check if a column exists in a table
fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
    let query = format!("PRAGMA table_info({})", table);
    let Ok(mut stmt) = conn.prepare(&query) else {
        return false;
    };
    let Ok(names) = stmt.query_map([], |row| row.get::<_, String>(1)) else {
        return false;
    };
    let found = names.flatten().any(|name| name == column);
    found
}

/// Run database migrations
fn run_migrations(conn: &Connection) -> GatewayResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS categories (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            color TEXT NOT NULL,
            icon TEXT NOT NULL,
            user_id TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_categories_owner_name
            ON categories(user_id, name COLLATE NOCASE);

        CREATE TABLE IF NOT EXISTS tasks (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            completed INTEGER NOT NULL DEFAULT 0,
            priority TEXT NOT NULL DEFAULT 'medium',
            due_date TEXT,
            category_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            image_url TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_tasks_owner ON tasks(user_id);
        CREATE INDEX IF NOT EXISTS idx_tasks_category ON tasks(category_id);",
    )
    .map_err(storage_err)?;

    // Geolocation columns arrived after the first schema
    for (column, ty) in [
        ("location_lat", "REAL"),
        ("location_lng", "REAL"),
        ("location_address", "TEXT"),
    ] {
        if !column_exists(conn, "tasks", column) {
            conn.execute(&format!("ALTER TABLE tasks ADD COLUMN {} {}", column, ty), [])
                .map_err(storage_err)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = open_connection(Path::new(":memory:")).unwrap();
        run_migrations(&conn).unwrap();
        assert!(column_exists(&conn, "tasks", "location_lat"));
        assert!(column_exists(&conn, "categories", "icon"));
        assert!(!column_exists(&conn, "tasks", "nope"));
    }

    #[test]
    fn test_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.db");
        drop(open_connection(&path).unwrap());
        // Reopening an existing file runs migrations again without error
        let conn = open_connection(&path).unwrap();
        assert!(column_exists(&conn, "tasks", "location_address"));
    }
}

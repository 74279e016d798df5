//! Category rows in SQLite

use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::{GatewayError, GatewayResult};
use crate::gateway::rows::{CategoryRow, NewCategoryRow};
use super::{now_rfc3339, storage_err, task_repo};

fn row_to_category(row: &rusqlite::Row) -> rusqlite::Result<CategoryRow> {
    Ok(CategoryRow {
        id: row.get(0)?,
        name: row.get(1)?,
        color: row.get(2)?,
        icon: row.get(3)?,
        user_id: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub(super) fn list_by_owner(conn: &Connection, owner_id: &str) -> GatewayResult<Vec<CategoryRow>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, color, icon, user_id, created_at FROM categories \
             WHERE user_id = ? ORDER BY name",
        )
        .map_err(storage_err)?;
    let rows = stmt
        .query_map(params![owner_id], row_to_category)
        .map_err(storage_err)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(storage_err)
}

pub(super) fn insert(conn: &Connection, row: &NewCategoryRow) -> GatewayResult<CategoryRow> {
    let id = uuid::Uuid::new_v4().to_string();
    let created_at = now_rfc3339();

    conn.execute(
        "INSERT INTO categories (id, name, color, icon, user_id, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        params![id, row.name, row.color, row.icon, row.user_id, created_at],
    )
    .map_err(storage_err)?;

    Ok(CategoryRow {
        id,
        name: row.name.clone(),
        color: row.color.clone(),
        icon: row.icon.clone(),
        user_id: Some(row.user_id.clone()),
        created_at: Some(created_at),
    })
}

/// Delete a category that no task references; returns the owner if it existed
pub(super) fn delete(conn: &Connection, id: &str) -> GatewayResult<Option<String>> {
    let owner: Option<String> = conn
        .query_row("SELECT user_id FROM categories WHERE id = ?", params![id], |r| r.get(0))
        .optional()
        .map_err(storage_err)?;

    if owner.is_none() {
        return Ok(None);
    }

    let in_use = task_repo::count_by_category(conn, id)?;
    if in_use > 0 {
        return Err(GatewayError::Storage(format!(
            "category {} is referenced by {} task(s)",
            id, in_use
        )));
    }

    conn.execute("DELETE FROM categories WHERE id = ?", params![id])
        .map_err(storage_err)?;
    Ok(owner)
}

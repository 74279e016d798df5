//! Task rows in SQLite
//!
//! Plain functions over a borrowed connection; the gateway holds the lock.

use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::{GatewayError, GatewayResult};
use crate::gateway::rows::{TaskRow, TaskRowPatch};
use super::{now_rfc3339, storage_err};

const TASK_COLUMNS: &str = "id, title, description, completed, priority, due_date, category_id, \
     user_id, image_url, location_lat, location_lng, location_address, created_at, updated_at";

/// Convert a database row to TaskRow
fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<TaskRow> {
    Ok(TaskRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        completed: Some(row.get::<_, i64>(3)? != 0),
        priority: row.get(4)?,
        due_date: row.get(5)?,
        category_id: row.get(6)?,
        category: None,
        user_id: row.get(7)?,
        image_url: row.get(8)?,
        location_lat: row.get(9)?,
        location_lng: row.get(10)?,
        location_address: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

pub(super) fn list_by_owner(conn: &Connection, owner_id: &str) -> GatewayResult<Vec<TaskRow>> {
    let sql = format!(
        "SELECT {} FROM tasks WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
        TASK_COLUMNS
    );
    let mut stmt = conn.prepare(&sql).map_err(storage_err)?;
    let rows = stmt
        .query_map(params![owner_id], row_to_task)
        .map_err(storage_err)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(storage_err)
}

pub(super) fn find_by_id(conn: &Connection, id: &str) -> GatewayResult<Option<TaskRow>> {
    let sql = format!("SELECT {} FROM tasks WHERE id = ?", TASK_COLUMNS);
    conn.query_row(&sql, params![id], row_to_task)
        .optional()
        .map_err(storage_err)
}

pub(super) fn insert(conn: &Connection, row: &TaskRowPatch) -> GatewayResult<TaskRow> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = now_rfc3339();

    conn.execute(
        "INSERT INTO tasks (id, title, description, completed, priority, due_date, category_id, \
         user_id, image_url, location_lat, location_lng, location_address, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            id,
            row.title,
            row.description,
            row.completed.unwrap_or(false),
            row.priority.as_deref().unwrap_or("medium"),
            row.due_date,
            row.category_id,
            row.user_id,
            row.image_url,
            row.location_lat,
            row.location_lng,
            row.location_address,
            now,
            now,
        ],
    )
    .map_err(storage_err)?;

    find_by_id(conn, &id)?.ok_or(GatewayError::NotFound(id))
}

/// Column/value pairs for the fields present in `patch`
fn patch_columns(patch: &TaskRowPatch) -> Vec<(&'static str, Value)> {
    fn text(v: &Option<String>) -> Option<Value> {
        v.clone().map(Value::Text)
    }
    fn real(v: Option<f64>) -> Option<Value> {
        v.map(Value::Real)
    }

    [
        ("title", text(&patch.title)),
        ("description", text(&patch.description)),
        ("completed", patch.completed.map(|c| Value::Integer(c as i64))),
        ("priority", text(&patch.priority)),
        ("due_date", text(&patch.due_date)),
        ("category_id", text(&patch.category_id)),
        ("user_id", text(&patch.user_id)),
        ("image_url", text(&patch.image_url)),
        ("location_lat", real(patch.location_lat)),
        ("location_lng", real(patch.location_lng)),
        ("location_address", text(&patch.location_address)),
    ]
    .into_iter()
    .filter_map(|(col, v)| v.map(|v| (col, v)))
    .collect()
}

pub(super) fn update(conn: &Connection, id: &str, patch: &TaskRowPatch) -> GatewayResult<TaskRow> {
    let mut columns = patch_columns(patch);
    let stamp = patch.updated_at.clone().unwrap_or_else(now_rfc3339);
    columns.push(("updated_at", Value::Text(stamp)));

    let assignments = columns
        .iter()
        .map(|(col, _)| format!("{} = ?", col))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("UPDATE tasks SET {} WHERE id = ?", assignments);

    let mut values: Vec<Value> = columns.into_iter().map(|(_, v)| v).collect();
    values.push(Value::Text(id.to_string()));

    let changed = conn
        .execute(&sql, rusqlite::params_from_iter(values))
        .map_err(storage_err)?;
    if changed == 0 {
        return Err(GatewayError::NotFound(id.to_string()));
    }

    find_by_id(conn, id)?.ok_or_else(|| GatewayError::NotFound(id.to_string()))
}

/// Delete a task; returns the owner of the removed row, if it existed
pub(super) fn delete(conn: &Connection, id: &str) -> GatewayResult<Option<String>> {
    let owner: Option<String> = conn
        .query_row("SELECT user_id FROM tasks WHERE id = ?", params![id], |r| r.get(0))
        .optional()
        .map_err(storage_err)?;

    if owner.is_some() {
        conn.execute("DELETE FROM tasks WHERE id = ?", params![id])
            .map_err(storage_err)?;
    }
    Ok(owner)
}

/// Number of tasks referencing `category_id`
pub(super) fn count_by_category(conn: &Connection, category_id: &str) -> GatewayResult<usize> {
    conn.query_row(
        "SELECT COUNT(*) FROM tasks WHERE category_id = ?",
        params![category_id],
        |r| r.get::<_, i64>(0),
    )
    .map(|n| n as usize)
    .map_err(storage_err)
}

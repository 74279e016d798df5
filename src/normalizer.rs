//! Entity Normalizer
//!
//! Maps backend rows to application entities and back. Nothing here fails:
//! missing or unparseable optional values become `None`.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::domain::{Category, Location, NewCategory, NewTask, Priority, Task, TaskPatch};
use crate::gateway::{CategoryRow, NewCategoryRow, TaskRow, TaskRowPatch};

/// Parse an ISO-8601 / RFC 3339 timestamp
pub fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?.trim();
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            // Postgres emits "2024-01-01 00:00:00+00" style values too
            DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%#z")
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
        })
}

pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn location_from_row(row: &TaskRow) -> Option<Location> {
    match (row.location_lat, row.location_lng) {
        (Some(latitude), Some(longitude)) => Some(Location {
            latitude,
            longitude,
            address: row.location_address.clone(),
        }),
        _ => None,
    }
}

pub fn to_task(row: &TaskRow) -> Task {
    Task {
        id: row.id.clone(),
        title: row.title.clone(),
        description: row.description.clone(),
        completed: row.completed.unwrap_or(false),
        priority: row
            .priority
            .as_deref()
            .map(Priority::parse_or_default)
            .unwrap_or_default(),
        due_date: parse_timestamp(row.due_date.as_deref()),
        category: row
            .category_id
            .clone()
            .or_else(|| row.category.clone())
            .unwrap_or_default(),
        owner: row.user_id.clone().unwrap_or_default(),
        image: row.image_url.clone(),
        location: location_from_row(row),
        created_at: parse_timestamp(row.created_at.as_deref()),
        updated_at: parse_timestamp(row.updated_at.as_deref()),
    }
}

pub fn to_category(row: &CategoryRow) -> Category {
    Category {
        id: row.id.clone(),
        name: row.name.clone(),
        color: row.color.clone(),
        icon: row.icon.clone(),
        owner: row.user_id.clone().unwrap_or_default(),
    }
}

/// Row patch for an update, stamped with the current time
pub fn from_task_patch(patch: &TaskPatch) -> TaskRowPatch {
    from_task_patch_at(patch, Utc::now())
}

/// Row patch for an update, stamped with `now`
pub fn from_task_patch_at(patch: &TaskPatch, now: DateTime<Utc>) -> TaskRowPatch {
    let location = patch.location.as_ref();
    TaskRowPatch {
        title: patch.title.clone(),
        description: patch.description.clone(),
        completed: patch.completed,
        priority: patch.priority.map(|p| p.as_str().to_string()),
        due_date: patch.due_date.map(format_timestamp),
        category_id: patch.category.clone(),
        user_id: None,
        image_url: patch.image.clone(),
        location_lat: location.map(|l| l.latitude),
        location_lng: location.map(|l| l.longitude),
        location_address: location.and_then(|l| l.address.clone()),
        updated_at: Some(format_timestamp(now)),
    }
}

/// Row for inserting a new task owned by `owner`. Timestamps are left to the backend.
pub fn to_task_insert(task: &NewTask, owner: &str) -> TaskRowPatch {
    let location = task.location.as_ref();
    TaskRowPatch {
        title: Some(task.title.clone()),
        description: task.description.clone(),
        completed: Some(task.completed),
        priority: Some(task.priority.as_str().to_string()),
        due_date: task.due_date.map(format_timestamp),
        category_id: Some(task.category.clone()),
        user_id: Some(owner.to_string()),
        image_url: task.image.clone(),
        location_lat: location.map(|l| l.latitude),
        location_lng: location.map(|l| l.longitude),
        location_address: location.and_then(|l| l.address.clone()),
        updated_at: None,
    }
}

pub fn to_category_insert(category: &NewCategory, owner: &str) -> NewCategoryRow {
    NewCategoryRow {
        name: category.name.trim().to_string(),
        color: category.color.clone(),
        icon: category.icon.clone(),
        user_id: owner.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn full_row() -> TaskRow {
        TaskRow {
            id: "1".into(),
            title: "Buy milk".into(),
            description: Some("2 liters".into()),
            completed: Some(true),
            priority: Some("high".into()),
            due_date: Some("2024-03-10T15:30:00Z".into()),
            category_id: Some("c1".into()),
            category: None,
            user_id: Some("u1".into()),
            image_url: Some("https://cdn.example.com/u1/milk.jpg".into()),
            location_lat: Some(-23.5505),
            location_lng: Some(-46.6333),
            location_address: Some("Av. Paulista".into()),
            created_at: Some("2024-01-01T00:00:00Z".into()),
            updated_at: Some("2024-01-02T00:00:00Z".into()),
        }
    }

    #[test]
    fn test_to_task_maps_every_field() {
        let task = to_task(&full_row());
        assert_eq!(task.id, "1");
        assert_eq!(task.category, "c1");
        assert_eq!(task.owner, "u1");
        assert!(task.completed);
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.due_date, Some(Utc.with_ymd_and_hms(2024, 3, 10, 15, 30, 0).unwrap()));
        assert_eq!(task.image.as_deref(), Some("https://cdn.example.com/u1/milk.jpg"));
        let location = task.location.unwrap();
        assert_eq!(location.latitude, -23.5505);
        assert_eq!(location.address.as_deref(), Some("Av. Paulista"));
        assert!(task.updated_at >= task.created_at);
    }

    #[test]
    fn test_missing_and_malformed_fields_become_none() {
        let row = TaskRow {
            id: "2".into(),
            title: "Call mom".into(),
            due_date: Some("next tuesday".into()),
            priority: Some("urgent".into()),
            location_lat: Some(1.0),
            location_address: Some("Somewhere".into()),
            created_at: Some("garbage".into()),
            ..Default::default()
        };
        let task = to_task(&row);
        assert!(task.due_date.is_none());
        assert!(task.created_at.is_none());
        assert!(!task.completed);
        assert_eq!(task.priority, Priority::Medium);
        // Latitude without longitude is not a location
        assert!(task.location.is_none());
        assert_eq!(task.category, "");
    }

    #[test]
    fn test_legacy_category_column() {
        let row = TaskRow {
            category: Some("legacy".into()),
            ..Default::default()
        };
        assert_eq!(to_task(&row).category, "legacy");
    }

    #[test]
    fn test_postgres_timestamp_format() {
        let parsed = parse_timestamp(Some("2024-01-01 10:00:00.123+00"));
        assert!(parsed.is_some());
    }

    #[test]
    fn test_to_category_renames_owner() {
        let row = CategoryRow {
            id: "c1".into(),
            name: "Work".into(),
            color: "#FF9500".into(),
            icon: "briefcase".into(),
            user_id: Some("u1".into()),
            created_at: None,
        };
        let cat = to_category(&row);
        assert_eq!(cat.owner, "u1");
        assert_eq!(cat.name, "Work");
    }

    #[test]
    fn test_patch_emits_only_present_fields_and_stamps() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        let row = from_task_patch_at(&TaskPatch::completed(true), now);
        assert_eq!(row.completed, Some(true));
        assert!(row.title.is_none());
        assert!(row.location_lat.is_none());
        assert_eq!(row.updated_at.as_deref(), Some("2024-06-01T08:00:00.000Z"));
    }

    #[test]
    fn test_round_trip_preserves_shared_fields() {
        let original = full_row();
        let task = to_task(&original);
        let back = to_task(&TaskRow::from(from_task_patch(&TaskPatch::from(&task))));

        assert_eq!(back.title, task.title);
        assert_eq!(back.description, task.description);
        assert_eq!(back.completed, task.completed);
        assert_eq!(back.priority, task.priority);
        assert_eq!(back.due_date, task.due_date);
        assert_eq!(back.category, task.category);
        assert_eq!(back.image, task.image);
        assert_eq!(back.location, task.location);
    }

    #[test]
    fn test_insert_row_carries_owner() {
        let new_task = NewTask::new("Buy milk", "c1").with_priority(Priority::Low);
        let row = to_task_insert(&new_task, "u1");
        assert_eq!(row.user_id.as_deref(), Some("u1"));
        assert_eq!(row.priority.as_deref(), Some("low"));
        assert_eq!(row.completed, Some(false));
        assert!(row.updated_at.is_none());

        let cat = to_category_insert(&NewCategory::new("  Work ", "#FF9500", "briefcase"), "u1");
        assert_eq!(cat.name, "Work");
    }
}

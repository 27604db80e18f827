//! Maintenance task model, comments and related requests

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::enums::TaskStatus;
use super::identity::Identity;
use super::validate_not_blank;

/// Comment left on a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Comment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub author_id: String,
    pub author_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Maintenance task
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub unit: String,
    /// Maintenance day reference; the day-of-month recurs
    pub date: NaiveDate,
    pub status: TaskStatus,
    /// Equipment gated by this task, if any
    pub equipment_id: Option<Uuid>,
    pub assigner_id: String,
    pub assignees: Vec<String>,
    /// Comments in creation order
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(data: &CreateTask, assigner_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: data.title.trim().to_string(),
            description: data.description.trim().to_string(),
            unit: data.unit.trim().to_string(),
            date: data.date,
            status: TaskStatus::Todo,
            equipment_id: data.equipment_id,
            assigner_id: assigner_id.to_string(),
            assignees: normalize_assignees(&data.assignee_ids),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_assignee(&self, user_id: &str) -> bool {
        self.assignees.iter().any(|a| a == user_id)
    }

    /// Apply an edit. Equipment binding and status are not editable here.
    pub fn apply_update(&mut self, data: &UpdateTask, now: DateTime<Utc>) {
        if let Some(ref title) = data.title {
            self.title = title.trim().to_string();
        }
        if let Some(ref description) = data.description {
            self.description = description.trim().to_string();
        }
        if let Some(ref unit) = data.unit {
            self.unit = unit.trim().to_string();
        }
        if let Some(date) = data.date {
            self.date = date;
        }
        self.assignees = normalize_assignees(&data.assignee_ids);
        self.updated_at = now;
    }
}

/// Trim ids, drop empties and duplicates, keep first-seen order
pub fn normalize_assignees(ids: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if !out.iter().any(|existing| existing == id) {
            out.push(id.to_string());
        }
    }
    out
}

fn validate_assignees(ids: &[String]) -> Result<(), ValidationError> {
    if normalize_assignees(ids).is_empty() {
        let mut err = ValidationError::new("assignees");
        err.message = Some("At least one assignee is required".into());
        return Err(err);
    }
    Ok(())
}

/// Create task request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateTask {
    #[validate(custom(function = "validate_not_blank"))]
    pub title: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub description: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub unit: String,
    pub date: NaiveDate,
    #[validate(custom(function = "validate_assignees"))]
    pub assignee_ids: Vec<String>,
    pub equipment_id: Option<Uuid>,
}

/// Edit task request; the assignee set is replaced wholesale
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateTask {
    #[validate(custom(function = "validate_not_blank"))]
    pub title: Option<String>,
    #[validate(custom(function = "validate_not_blank"))]
    pub description: Option<String>,
    #[validate(custom(function = "validate_not_blank"))]
    pub unit: Option<String>,
    pub date: Option<NaiveDate>,
    #[validate(custom(function = "validate_assignees"))]
    pub assignee_ids: Vec<String>,
}

/// Task status transition request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateTaskStatus {
    pub status: TaskStatus,
}

/// New comment request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateComment {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 2000, message = "Comment must be at most 2000 characters")
    )]
    pub text: String,
}

/// Task listing scope: admins see what they assigned, everyone else what
/// they are assigned to, always within their own unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFilter {
    pub unit: String,
    pub assigner_id: Option<String>,
    pub assignee_id: Option<String>,
}

impl TaskFilter {
    pub fn for_identity(identity: &Identity) -> Self {
        if identity.is_admin() {
            Self {
                unit: identity.unit.clone(),
                assigner_id: Some(identity.user_id.clone()),
                assignee_id: None,
            }
        } else {
            Self {
                unit: identity.unit.clone(),
                assigner_id: None,
                assignee_id: Some(identity.user_id.clone()),
            }
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        task.unit == self.unit
            && self.assigner_id.as_ref().map_or(true, |a| &task.assigner_id == a)
            && self.assignee_id.as_ref().map_or(true, |u| task.is_assignee(u))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::Role;

    fn create_request() -> CreateTask {
        CreateTask {
            title: "Quarterly service".into(),
            description: "Replace filters".into(),
            unit: "Alpha".into(),
            date: NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(),
            assignee_ids: vec!["U1".into(), " U2 ".into(), "U1".into(), "".into()],
            equipment_id: None,
        }
    }

    #[test]
    fn test_assignees_are_deduplicated() {
        let task = Task::new(&create_request(), "A1", Utc::now());
        assert_eq!(task.assignees, vec!["U1".to_string(), "U2".to_string()]);
        assert_eq!(task.status, TaskStatus::Todo);
    }

    #[test]
    fn test_empty_assignees_rejected() {
        let mut req = create_request();
        req.assignee_ids = vec![" ".into()];
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("assignee_ids"));
    }

    #[test]
    fn test_visibility() {
        let task = Task::new(&create_request(), "A1", Utc::now());
        let assigner = Identity::new("A1", "Capt. Ray", "Alpha", Role::Admin);
        let other_admin = Identity::new("A2", "Capt. Lee", "Alpha", Role::Admin);
        let assignee = Identity::new("U2", "Bob", "Alpha", Role::User);
        let outsider = Identity::new("U2", "Bob", "Bravo", Role::User);
        let stranger = Identity::new("U9", "Eve", "Alpha", Role::User);

        let visible = |who: &Identity| TaskFilter::for_identity(who).matches(&task);
        assert!(visible(&assigner));
        assert!(!visible(&other_admin));
        assert!(visible(&assignee));
        assert!(!visible(&outsider));
        assert!(!visible(&stranger));
    }

    #[test]
    fn test_edit_replaces_assignees() {
        let mut task = Task::new(&create_request(), "A1", Utc::now());
        let patch = UpdateTask {
            title: Some("Annual service".into()),
            description: None,
            unit: None,
            date: None,
            assignee_ids: vec!["U3".into()],
        };
        task.apply_update(&patch, Utc::now());
        assert_eq!(task.title, "Annual service");
        assert_eq!(task.assignees, vec!["U3".to_string()]);
    }
}

//! Data models for MEMS

pub mod enums;
pub mod equipment;
pub mod identity;
pub mod task;

use validator::ValidationError;

// Re-export commonly used types
pub use enums::{EquipmentStatus, Role, TaskStatus};
pub use equipment::{CreateEquipment, CustodyEntry, Equipment, EquipmentQuery, UpdateEquipment};
pub use identity::{Identity, IdentityClaims};
pub use task::{Comment, CreateComment, CreateTask, Task, TaskFilter, UpdateTask, UpdateTaskStatus};

/// Rejects empty and whitespace-only strings
pub(crate) fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Must not be empty".into());
        return Err(err);
    }
    Ok(())
}

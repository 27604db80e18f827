//! Rules binding task transitions to equipment status.
//!
//! | Trigger                               | Equipment effect                         |
//! |---------------------------------------|------------------------------------------|
//! | task created, equipment bound         | status -> MAINTENANCE                    |
//! | task set to COMPLETED, equipment bound| status -> AVAILABLE, last_maintenance=now|
//! | task set to TODO / IN_PROGRESS        | none                                     |
//! | task deleted                          | none (equipment stays where it is)       |
//!
//! Deleting a maintenance task leaves its equipment in MAINTENANCE. That is
//! long-standing behavior and is pinned by tests; changing it needs a
//! product decision.

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::{EquipmentStatus, TaskStatus},
        equipment::Equipment,
        task::Task,
    },
};

/// What a task status change does to the bound equipment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquipmentEffect {
    Unchanged,
    Release,
}

/// Put equipment under maintenance for a newly created task
pub fn gate_for_maintenance(equipment: &mut Equipment, now: DateTime<Utc>) {
    equipment.status = EquipmentStatus::Maintenance;
    equipment.updated_at = now;
}

/// Return equipment to service after its task completes
pub fn release_from_maintenance(equipment: &mut Equipment, now: DateTime<Utc>) {
    equipment.status = EquipmentStatus::Available;
    equipment.last_maintenance = Some(now);
    equipment.updated_at = now;
}

/// Decide the equipment effect of moving `task` to `next`.
///
/// Completing an already completed task is rejected so the maintenance
/// timestamp is stamped once per completion.
pub fn plan_status_change(task: &Task, next: TaskStatus) -> AppResult<EquipmentEffect> {
    match next {
        TaskStatus::Completed if task.status == TaskStatus::Completed => Err(AppError::Conflict(
            format!("Task {} is already completed", task.id),
        )),
        TaskStatus::Completed if task.equipment_id.is_some() => Ok(EquipmentEffect::Release),
        _ => Ok(EquipmentEffect::Unchanged),
    }
}

//! Maintenance task service.
//!
//! Task writes that move equipment status (creation, completion) run in the
//! same transaction as the equipment write, so either both land or neither.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use super::lifecycle::{self, EquipmentEffect};
use crate::{
    error::{AppError, AppResult},
    models::{
        identity::Identity,
        task::{Comment, CreateComment, CreateTask, Task, TaskFilter, UpdateTask, UpdateTaskStatus},
    },
    repository::Store,
};

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn Store>,
}

impl TaskService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Tasks visible to the caller, newest first
    pub async fn list_for(&self, identity: &Identity) -> AppResult<Vec<Task>> {
        self.store.task_list(&TaskFilter::for_identity(identity)).await
    }

    pub async fn get_by_id(&self, identity: &Identity, id: Uuid) -> AppResult<Task> {
        let task = self.store.task_get(id).await?;
        identity.require_unit(&task.unit)?;
        Ok(task)
    }

    /// Create a task; bound equipment goes into maintenance in the same
    /// transaction.
    pub async fn create(&self, identity: &Identity, data: &CreateTask) -> AppResult<Task> {
        identity.require_admin()?;
        data.validate()?;
        identity.require_unit(data.unit.trim())?;

        let now = Utc::now();
        let task = Task::new(data, &identity.user_id, now);

        let mut tx = self.store.begin().await?;
        let gated = match task.equipment_id {
            Some(equipment_id) => {
                let mut equipment = tx.equipment_for_update(equipment_id).await?;
                // Task unit is the caller's, so this also keeps both on one unit
                identity.require_unit(&equipment.unit)?;
                lifecycle::gate_for_maintenance(&mut equipment, now);
                Some(equipment)
            }
            None => None,
        };
        tx.task_insert(&task).await?;
        if let Some(ref equipment) = gated {
            tx.equipment_update(equipment).await?;
        }
        tx.commit().await?;

        match gated {
            Some(equipment) => tracing::info!(
                "Task {} created by {}; equipment {} under maintenance",
                task.id,
                identity.user_id,
                equipment.id
            ),
            None => tracing::info!("Task {} created by {}", task.id, identity.user_id),
        }
        Ok(task)
    }

    /// Move a task to a new status. Assigner only. Completing a bound task
    /// releases its equipment and stamps the maintenance date.
    pub async fn update_status(
        &self,
        identity: &Identity,
        id: Uuid,
        data: &UpdateTaskStatus,
    ) -> AppResult<Task> {
        identity.require_admin()?;

        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let mut task = tx.task_for_update(id).await?;
        identity.require_unit(&task.unit)?;
        require_assigner(identity, &task)?;

        let effect = lifecycle::plan_status_change(&task, data.status)?;
        let previous = task.status;
        task.status = data.status;
        task.updated_at = now;
        tx.task_update(&task).await?;

        if let (EquipmentEffect::Release, Some(equipment_id)) = (effect, task.equipment_id) {
            let mut equipment = tx.equipment_for_update(equipment_id).await?;
            lifecycle::release_from_maintenance(&mut equipment, now);
            tx.equipment_update(&equipment).await?;
            tracing::info!("Equipment {} released from maintenance by task {}", equipment_id, id);
        }
        tx.commit().await?;

        tracing::info!("Task {} status {} -> {} by {}", id, previous, task.status, identity.user_id);
        Ok(task)
    }

    /// Edit task details and replace its assignees. Assigner only.
    pub async fn update(&self, identity: &Identity, id: Uuid, data: &UpdateTask) -> AppResult<Task> {
        identity.require_admin()?;
        data.validate()?;

        let mut tx = self.store.begin().await?;
        let mut task = tx.task_for_update(id).await?;
        require_assigner(identity, &task)?;
        if let Some(ref unit) = data.unit {
            identity.require_unit(unit.trim())?;
        }
        task.apply_update(data, Utc::now());
        tx.task_update(&task).await?;
        tx.commit().await?;

        Ok(task)
    }

    /// Delete a task. Assigner only; bound equipment keeps its status.
    pub async fn delete(&self, identity: &Identity, id: Uuid) -> AppResult<()> {
        identity.require_admin()?;

        let mut tx = self.store.begin().await?;
        let task = tx.task_for_update(id).await?;
        require_assigner(identity, &task)?;
        tx.task_delete(id).await?;
        tx.commit().await?;

        if let Some(equipment_id) = task.equipment_id {
            tracing::warn!(
                "Task {} deleted by {}; equipment {} keeps its current status",
                id,
                identity.user_id,
                equipment_id
            );
        } else {
            tracing::info!("Task {} deleted by {}", id, identity.user_id);
        }
        Ok(())
    }

    pub async fn add_comment(
        &self,
        identity: &Identity,
        task_id: Uuid,
        data: &CreateComment,
    ) -> AppResult<Comment> {
        data.validate()?;

        let mut tx = self.store.begin().await?;
        let task = tx.task_for_update(task_id).await?;
        identity.require_unit(&task.unit)?;

        let comment = Comment {
            id: Uuid::new_v4(),
            task_id,
            author_id: identity.user_id.clone(),
            author_name: identity.user_name.clone(),
            text: data.text.trim().to_string(),
            created_at: Utc::now(),
        };
        tx.comment_insert(&comment).await?;
        tx.commit().await?;

        Ok(comment)
    }

    /// Delete a comment. Only its author may do so.
    pub async fn delete_comment(&self, identity: &Identity, comment_id: Uuid) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        let comment = tx.comment_for_update(comment_id).await?;
        if comment.author_id != identity.user_id {
            return Err(AppError::Forbidden(
                "Only the author can delete a comment".to_string(),
            ));
        }
        tx.comment_delete(comment_id).await?;
        tx.commit().await?;
        Ok(())
    }
}

fn require_assigner(identity: &Identity, task: &Task) -> AppResult<()> {
    if task.assigner_id == identity.user_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Only the assigner of task {} may change it",
            task.id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{enums::Role, equipment::CreateEquipment, equipment::Equipment};
    use crate::repository::{MockStore, MockStoreTx, StoreTx};
    use chrono::NaiveDate;

    fn admin() -> Identity {
        Identity::new("A1", "Capt. Ray", "Alpha", Role::Admin)
    }

    fn generator() -> Equipment {
        let data = CreateEquipment {
            name: "Generator".into(),
            description: "5kW diesel".into(),
            unit: "Alpha".into(),
            quantity: 1,
        };
        Equipment::new(&data, "A1", Utc::now())
    }

    fn create_request(equipment_id: Option<Uuid>) -> CreateTask {
        CreateTask {
            title: "Service generator".into(),
            description: "Replace fuel filter".into(),
            unit: "Alpha".into(),
            date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            assignee_ids: vec!["U1".into()],
            equipment_id,
        }
    }

    fn store_with(tx: MockStoreTx) -> Arc<dyn Store> {
        let mut store = MockStore::new();
        store
            .expect_begin()
            .times(1)
            .return_once(move || Ok(Box::new(tx) as Box<dyn StoreTx>));
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_failed_equipment_write_is_never_committed() {
        let equipment = generator();
        let equipment_id = equipment.id;

        let mut tx = MockStoreTx::new();
        tx.expect_equipment_for_update()
            .return_once(move |_| Ok(equipment));
        tx.expect_task_insert().times(1).returning(|_| Ok(()));
        tx.expect_equipment_update()
            .times(1)
            .returning(|_| Err(AppError::Storage("disk full".into())));
        tx.expect_commit().times(0);

        let service = TaskService::new(store_with(tx));
        let err = service
            .create(&admin(), &create_request(Some(equipment_id)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }

    #[tokio::test]
    async fn test_missing_equipment_aborts_before_task_insert() {
        let mut tx = MockStoreTx::new();
        tx.expect_equipment_for_update()
            .returning(|id| Err(AppError::NotFound(format!("Equipment {} not found", id))));
        tx.expect_task_insert().times(0);
        tx.expect_commit().times(0);

        let service = TaskService::new(store_with(tx));
        let err = service
            .create(&admin(), &create_request(Some(Uuid::new_v4())))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_validation_runs_before_storage() {
        let mut store = MockStore::new();
        store.expect_begin().times(0);
        let service = TaskService::new(Arc::new(store));

        let mut request = create_request(None);
        request.title = String::new();
        let err = service.create(&admin(), &request).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_storage_failure_on_begin_surfaces() {
        let mut store = MockStore::new();
        store
            .expect_begin()
            .returning(|| Err(AppError::Storage("connection refused".into())));
        let service = TaskService::new(Arc::new(store));

        let err = service
            .create(&admin(), &create_request(None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }
}

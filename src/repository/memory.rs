//! In-process store used by tests and by `database.url = "memory"`.
//!
//! A transaction holds the store-wide lock for its whole lifetime and works
//! on a private copy of the state; `commit` swaps the copy in, dropping the
//! transaction throws it away.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{Store, StoreTx};
use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::{CustodyEntry, Equipment, EquipmentQuery},
        task::{Comment, Task, TaskFilter},
    },
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    equipment: HashMap<Uuid, Equipment>,
    tasks: HashMap<Uuid, Task>,
}

impl MemoryState {
    fn equipment(&self, id: Uuid) -> AppResult<&Equipment> {
        self.equipment
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    fn equipment_mut(&mut self, id: Uuid) -> AppResult<&mut Equipment> {
        self.equipment
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    fn task(&self, id: Uuid) -> AppResult<&Task> {
        self.tasks
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Task {} not found", id)))
    }

    fn task_mut(&mut self, id: Uuid) -> AppResult<&mut Task> {
        self.tasks
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Task {} not found", id)))
    }
}

#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    lock_timeout: Duration,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

impl MemoryStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            lock_timeout,
        }
    }

    async fn lock(&self) -> AppResult<OwnedMutexGuard<MemoryState>> {
        tokio::time::timeout(self.lock_timeout, self.state.clone().lock_owned())
            .await
            .map_err(|_| AppError::Conflict("Store is busy, try again".to_string()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        let guard = self.lock().await?;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }

    async fn equipment_get(&self, id: Uuid) -> AppResult<Equipment> {
        let state = self.lock().await?;
        state.equipment(id).cloned()
    }

    async fn equipment_list(&self, query: &EquipmentQuery) -> AppResult<Vec<Equipment>> {
        let state = self.lock().await?;
        let mut rows: Vec<Equipment> = state
            .equipment
            .values()
            .filter(|e| query.matches(e))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.created_at.cmp(&b.created_at)));
        Ok(rows)
    }

    async fn task_get(&self, id: Uuid) -> AppResult<Task> {
        let state = self.lock().await?;
        state.task(id).cloned()
    }

    async fn task_list(&self, filter: &TaskFilter) -> AppResult<Vec<Task>> {
        let state = self.lock().await?;
        let mut rows: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn ping(&self) -> AppResult<()> {
        self.lock().await.map(|_| ())
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn equipment_for_update(&mut self, id: Uuid) -> AppResult<Equipment> {
        self.working.equipment(id).cloned()
    }

    async fn equipment_insert(&mut self, equipment: &Equipment) -> AppResult<()> {
        if self.working.equipment.contains_key(&equipment.id) {
            return Err(AppError::Conflict(format!(
                "Equipment {} already exists",
                equipment.id
            )));
        }
        self.working.equipment.insert(equipment.id, equipment.clone());
        Ok(())
    }

    async fn equipment_update(&mut self, equipment: &Equipment) -> AppResult<()> {
        let stored = self.working.equipment_mut(equipment.id)?;
        // Ledger vectors are owned by the custody calls
        let sign_ins = std::mem::take(&mut stored.sign_ins);
        let sign_outs = std::mem::take(&mut stored.sign_outs);
        *stored = Equipment {
            sign_ins,
            sign_outs,
            ..equipment.clone()
        };
        Ok(())
    }

    async fn equipment_delete(&mut self, id: Uuid) -> AppResult<()> {
        self.working
            .equipment
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))?;
        for task in self.working.tasks.values_mut() {
            if task.equipment_id == Some(id) {
                task.equipment_id = None;
            }
        }
        Ok(())
    }

    async fn custody_sign_in(&mut self, equipment_id: Uuid, entry: &CustodyEntry) -> AppResult<()> {
        let stored = self.working.equipment_mut(equipment_id)?;
        if stored.is_signed_in(&entry.user_id) {
            return Err(AppError::AlreadySignedIn(entry.user_id.clone()));
        }
        stored.sign_ins.push(entry.clone());
        Ok(())
    }

    async fn custody_sign_out(&mut self, equipment_id: Uuid, entry: &CustodyEntry) -> AppResult<()> {
        let stored = self.working.equipment_mut(equipment_id)?;
        let pos = stored
            .sign_ins
            .iter()
            .position(|e| e.user_id == entry.user_id)
            .ok_or_else(|| AppError::NotSignedIn(entry.user_id.clone()))?;
        stored.sign_ins.remove(pos);
        stored.sign_outs.push(entry.clone());
        Ok(())
    }

    async fn task_for_update(&mut self, id: Uuid) -> AppResult<Task> {
        self.working.task(id).cloned()
    }

    async fn task_insert(&mut self, task: &Task) -> AppResult<()> {
        if let Some(equipment_id) = task.equipment_id {
            self.working.equipment(equipment_id)?;
        }
        if self.working.tasks.contains_key(&task.id) {
            return Err(AppError::Conflict(format!("Task {} already exists", task.id)));
        }
        self.working.tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn task_update(&mut self, task: &Task) -> AppResult<()> {
        let stored = self.working.task_mut(task.id)?;
        let comments = std::mem::take(&mut stored.comments);
        *stored = Task {
            comments,
            ..task.clone()
        };
        Ok(())
    }

    async fn task_delete(&mut self, id: Uuid) -> AppResult<()> {
        self.working
            .tasks
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Task {} not found", id)))
    }

    async fn comment_for_update(&mut self, id: Uuid) -> AppResult<Comment> {
        self.working
            .tasks
            .values()
            .flat_map(|t| t.comments.iter())
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", id)))
    }

    async fn comment_insert(&mut self, comment: &Comment) -> AppResult<()> {
        let task = self.working.task_mut(comment.task_id)?;
        task.comments.push(comment.clone());
        Ok(())
    }

    async fn comment_delete(&mut self, id: Uuid) -> AppResult<()> {
        for task in self.working.tasks.values_mut() {
            if let Some(pos) = task.comments.iter().position(|c| c.id == id) {
                task.comments.remove(pos);
                return Ok(());
            }
        }
        Err(AppError::NotFound(format!("Comment {} not found", id)))
    }

    async fn commit(&mut self) -> AppResult<()> {
        *self.guard = std::mem::take(&mut self.working);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::equipment::CreateEquipment;
    use chrono::Utc;

    fn radio() -> Equipment {
        let data = CreateEquipment {
            name: "Field radio".into(),
            description: "PRC-152".into(),
            unit: "Alpha".into(),
            quantity: 4,
        };
        Equipment::new(&data, "A1", Utc::now())
    }

    #[test]
    fn test_uncommitted_writes_are_discarded() {
        tokio_test::block_on(async {
            let store = MemoryStore::default();
            let eq = radio();
            {
                let mut tx = store.begin().await.unwrap();
                tx.equipment_insert(&eq).await.unwrap();
            }
            assert!(matches!(
                store.equipment_get(eq.id).await,
                Err(AppError::NotFound(_))
            ));

            let mut tx = store.begin().await.unwrap();
            tx.equipment_insert(&eq).await.unwrap();
            tx.commit().await.unwrap();
            drop(tx);
            assert_eq!(store.equipment_get(eq.id).await.unwrap().name, "Field radio");
        });
    }

    #[test]
    fn test_update_does_not_touch_ledger() {
        tokio_test::block_on(async {
            let store = MemoryStore::default();
            let eq = radio();
            let entry = CustodyEntry {
                user_id: "U1".into(),
                user_name: "Alice".into(),
                at: Utc::now(),
            };

            let mut tx = store.begin().await.unwrap();
            tx.equipment_insert(&eq).await.unwrap();
            tx.custody_sign_in(eq.id, &entry).await.unwrap();
            // Stale copy without the sign-in
            tx.equipment_update(&eq).await.unwrap();
            tx.commit().await.unwrap();
            drop(tx);

            let stored = store.equipment_get(eq.id).await.unwrap();
            assert_eq!(stored.sign_ins, vec![entry]);
        });
    }

    #[test]
    fn test_busy_store_fails_fast() {
        tokio_test::block_on(async {
            let store = MemoryStore::new(Duration::from_millis(20));
            let _tx = store.begin().await.unwrap();
            let err = store.begin().await.err().unwrap();
            assert!(matches!(err, AppError::Conflict(_)));
        });
    }
}

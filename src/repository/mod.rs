//! Storage layer: the `Store` seam and its Postgres and in-memory backends

pub mod equipment;
pub mod memory;
pub mod postgres;
pub mod tasks;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        equipment::{CustodyEntry, Equipment, EquipmentQuery},
        task::{Comment, Task, TaskFilter},
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Shared persistent store.
///
/// Reads run outside transactions and only observe committed state.
/// Every mutation goes through a [`StoreTx`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    /// Open a unit of work. Nothing it writes is visible until `commit`;
    /// dropping it uncommitted discards every write.
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>>;

    async fn equipment_get(&self, id: Uuid) -> AppResult<Equipment>;

    /// Equipment matching the query, ordered by name
    async fn equipment_list(&self, query: &EquipmentQuery) -> AppResult<Vec<Equipment>>;

    async fn task_get(&self, id: Uuid) -> AppResult<Task>;

    /// Tasks matching the filter, newest first
    async fn task_list(&self, filter: &TaskFilter) -> AppResult<Vec<Task>>;

    /// Connectivity probe for readiness checks
    async fn ping(&self) -> AppResult<()>;
}

/// One open transaction.
///
/// `*_for_update` reads lock the row until commit or rollback, so two
/// transactions touching the same equipment or task run one after the other.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoreTx: Send {
    async fn equipment_for_update(&mut self, id: Uuid) -> AppResult<Equipment>;

    async fn equipment_insert(&mut self, equipment: &Equipment) -> AppResult<()>;

    /// Persist scalar columns (attributes, status, display denormalizations).
    /// The ledger is written only through the `custody_*` calls.
    async fn equipment_update(&mut self, equipment: &Equipment) -> AppResult<()>;

    /// Delete equipment with its ledger; tasks bound to it become unbound
    async fn equipment_delete(&mut self, id: Uuid) -> AppResult<()>;

    /// Add an active custody entry
    async fn custody_sign_in(&mut self, equipment_id: Uuid, entry: &CustodyEntry) -> AppResult<()>;

    /// Remove the user's active entry and append `entry` to the history
    async fn custody_sign_out(&mut self, equipment_id: Uuid, entry: &CustodyEntry) -> AppResult<()>;

    async fn task_for_update(&mut self, id: Uuid) -> AppResult<Task>;

    async fn task_insert(&mut self, task: &Task) -> AppResult<()>;

    /// Persist task columns and replace its assignee set
    async fn task_update(&mut self, task: &Task) -> AppResult<()>;

    /// Delete a task with its assignees and comments
    async fn task_delete(&mut self, id: Uuid) -> AppResult<()>;

    async fn comment_for_update(&mut self, id: Uuid) -> AppResult<Comment>;

    async fn comment_insert(&mut self, comment: &Comment) -> AppResult<()>;

    async fn comment_delete(&mut self, id: Uuid) -> AppResult<()>;

    async fn commit(&mut self) -> AppResult<()>;
}

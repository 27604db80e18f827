//! Postgres-backed store

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{equipment, tasks, Store, StoreTx};
use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::{CustodyEntry, Equipment, EquipmentQuery},
        task::{Comment, Task, TaskFilter},
    },
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    lock_timeout_ms: u64,
}

impl PgStore {
    pub fn new(pool: PgPool, lock_timeout_ms: u64) -> Self {
        Self { pool, lock_timeout_ms }
    }

    /// Apply embedded migrations
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        let mut tx = self.pool.begin().await?;
        // Waiting on a row lock longer than this fails with 55P03 -> Conflict
        sqlx::query(&format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout_ms))
            .execute(&mut *tx)
            .await?;
        Ok(Box::new(PgTx { tx: Some(tx) }))
    }

    async fn equipment_get(&self, id: Uuid) -> AppResult<Equipment> {
        let mut conn = self.pool.acquire().await?;
        equipment::get_by_id(&mut conn, id, false).await
    }

    async fn equipment_list(&self, query: &EquipmentQuery) -> AppResult<Vec<Equipment>> {
        let mut conn = self.pool.acquire().await?;
        equipment::list(&mut conn, query).await
    }

    async fn task_get(&self, id: Uuid) -> AppResult<Task> {
        let mut conn = self.pool.acquire().await?;
        tasks::get_by_id(&mut conn, id, false).await
    }

    async fn task_list(&self, filter: &TaskFilter) -> AppResult<Vec<Task>> {
        let mut conn = self.pool.acquire().await?;
        tasks::list(&mut conn, filter).await
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Open Postgres transaction; rolled back on drop unless committed
struct PgTx {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgTx {
    fn conn(&mut self) -> AppResult<&mut PgConnection> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| AppError::Storage("Transaction already committed".to_string()))
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn equipment_for_update(&mut self, id: Uuid) -> AppResult<Equipment> {
        equipment::get_by_id(self.conn()?, id, true).await
    }

    async fn equipment_insert(&mut self, data: &Equipment) -> AppResult<()> {
        equipment::insert(self.conn()?, data).await
    }

    async fn equipment_update(&mut self, data: &Equipment) -> AppResult<()> {
        equipment::update(self.conn()?, data).await
    }

    async fn equipment_delete(&mut self, id: Uuid) -> AppResult<()> {
        equipment::delete(self.conn()?, id).await
    }

    async fn custody_sign_in(&mut self, equipment_id: Uuid, entry: &CustodyEntry) -> AppResult<()> {
        equipment::insert_sign_in(self.conn()?, equipment_id, entry).await
    }

    async fn custody_sign_out(&mut self, equipment_id: Uuid, entry: &CustodyEntry) -> AppResult<()> {
        equipment::sign_out(self.conn()?, equipment_id, entry).await
    }

    async fn task_for_update(&mut self, id: Uuid) -> AppResult<Task> {
        tasks::get_by_id(self.conn()?, id, true).await
    }

    async fn task_insert(&mut self, task: &Task) -> AppResult<()> {
        tasks::insert(self.conn()?, task).await
    }

    async fn task_update(&mut self, task: &Task) -> AppResult<()> {
        tasks::update(self.conn()?, task).await
    }

    async fn task_delete(&mut self, id: Uuid) -> AppResult<()> {
        tasks::delete(self.conn()?, id).await
    }

    async fn comment_for_update(&mut self, id: Uuid) -> AppResult<Comment> {
        tasks::get_comment(self.conn()?, id, true).await
    }

    async fn comment_insert(&mut self, comment: &Comment) -> AppResult<()> {
        tasks::insert_comment(self.conn()?, comment).await
    }

    async fn comment_delete(&mut self, id: Uuid) -> AppResult<()> {
        tasks::delete_comment(self.conn()?, id).await
    }

    async fn commit(&mut self) -> AppResult<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| AppError::Storage("Transaction already committed".to_string()))?;
        tx.commit().await?;
        Ok(())
    }
}

//! Custody ledger: equipment sign-in and sign-out

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{equipment::Equipment, identity::Identity},
    repository::Store,
};

#[derive(Clone)]
pub struct CustodyService {
    store: Arc<dyn Store>,
}

impl CustodyService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Take custody of equipment. Requires the equipment to be AVAILABLE and
    /// the caller not to hold it already.
    pub async fn sign_in(&self, identity: &Identity, equipment_id: Uuid) -> AppResult<Equipment> {
        let mut tx = self.store.begin().await?;
        let mut equipment = tx.equipment_for_update(equipment_id).await?;
        identity.require_unit(&equipment.unit)?;

        let entry = equipment
            .sign_in(&identity.user_id, &identity.user_name, Utc::now())
            .map_err(|e| {
                tracing::debug!("Sign-in on {} by {} refused: {}", equipment_id, identity.user_id, e);
                e
            })?;
        tx.custody_sign_in(equipment_id, &entry).await?;
        tx.equipment_update(&equipment).await?;
        tx.commit().await?;

        tracing::info!("{} signed in to equipment {}", identity.user_id, equipment_id);
        Ok(equipment)
    }

    /// Return custody. The active entry is removed and the closing event
    /// appended to the history in the same transaction.
    pub async fn sign_out(&self, identity: &Identity, equipment_id: Uuid) -> AppResult<Equipment> {
        let mut tx = self.store.begin().await?;
        let mut equipment = tx.equipment_for_update(equipment_id).await?;
        identity.require_unit(&equipment.unit)?;

        let entry = equipment
            .sign_out(&identity.user_id, &identity.user_name, Utc::now())
            .map_err(|e| {
                tracing::debug!("Sign-out on {} by {} refused: {}", equipment_id, identity.user_id, e);
                e
            })?;
        tx.custody_sign_out(equipment_id, &entry).await?;
        tx.equipment_update(&equipment).await?;
        tx.commit().await?;

        tracing::info!("{} signed out of equipment {}", identity.user_id, equipment_id);
        Ok(equipment)
    }
}

//! Equipment service

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        equipment::{CreateEquipment, Equipment, EquipmentQuery, UpdateEquipment},
        identity::Identity,
    },
    repository::Store,
};

#[derive(Clone)]
pub struct EquipmentService {
    store: Arc<dyn Store>,
}

impl EquipmentService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self, query: &EquipmentQuery) -> AppResult<Vec<Equipment>> {
        self.store.equipment_list(query).await
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Equipment> {
        self.store.equipment_get(id).await
    }

    pub async fn create(&self, identity: &Identity, data: &CreateEquipment) -> AppResult<Equipment> {
        identity.require_admin()?;
        data.validate()?;
        identity.require_unit(data.unit.trim())?;

        let equipment = Equipment::new(data, &identity.user_id, Utc::now());
        let mut tx = self.store.begin().await?;
        tx.equipment_insert(&equipment).await?;
        tx.commit().await?;

        tracing::info!(
            "Equipment {} ({}) created by {} in unit {}",
            equipment.id,
            equipment.name,
            identity.user_id,
            equipment.unit
        );
        Ok(equipment)
    }

    /// Administrative edit, including the status override
    pub async fn update(&self, identity: &Identity, id: Uuid, data: &UpdateEquipment) -> AppResult<Equipment> {
        identity.require_admin()?;
        data.validate()?;

        let mut tx = self.store.begin().await?;
        let mut equipment = tx.equipment_for_update(id).await?;
        identity.require_unit(&equipment.unit)?;
        if let Some(ref unit) = data.unit {
            identity.require_unit(unit.trim())?;
        }
        let previous = equipment.status;
        equipment.apply_update(data, Utc::now());
        tx.equipment_update(&equipment).await?;
        tx.commit().await?;

        if previous != equipment.status {
            tracing::info!(
                "Equipment {} status overridden by {}: {} -> {}",
                id,
                identity.user_id,
                previous,
                equipment.status
            );
        }
        Ok(equipment)
    }

    pub async fn delete(&self, identity: &Identity, id: Uuid) -> AppResult<()> {
        identity.require_admin()?;

        let mut tx = self.store.begin().await?;
        let equipment = tx.equipment_for_update(id).await?;
        identity.require_unit(&equipment.unit)?;
        tx.equipment_delete(id).await?;
        tx.commit().await?;

        tracing::info!("Equipment {} deleted by {}", id, identity.user_id);
        Ok(())
    }
}

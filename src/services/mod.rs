//! Business logic services

pub mod custody;
pub mod equipment;
pub mod lifecycle;
pub mod tasks;

use std::sync::Arc;

use crate::{error::AppResult, repository::Store};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub equipment: equipment::EquipmentService,
    pub custody: custody::CustodyService,
    pub tasks: tasks::TaskService,
    store: Arc<dyn Store>,
}

impl Services {
    /// Create all services over the given store
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            equipment: equipment::EquipmentService::new(store.clone()),
            custody: custody::CustodyService::new(store.clone()),
            tasks: tasks::TaskService::new(store.clone()),
            store,
        }
    }

    /// Check that the backing store answers
    pub async fn ping(&self) -> AppResult<()> {
        self.store.ping().await
    }
}

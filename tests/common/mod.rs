//! Shared fixtures for service-level tests over the in-memory store

#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use mems_server::{
    models::{
        enums::Role,
        equipment::{CreateEquipment, Equipment},
        identity::Identity,
        task::{CreateTask, Task},
    },
    repository::MemoryStore,
    services::Services,
};

pub const UNIT: &str = "1st Battalion";

pub fn services() -> Services {
    Services::new(Arc::new(MemoryStore::default()))
}

pub fn admin(id: &str) -> Identity {
    Identity::new(id, format!("Admin {}", id), UNIT, Role::Admin)
}

pub fn admin_of(id: &str, unit: &str) -> Identity {
    Identity::new(id, format!("Admin {}", id), unit, Role::Admin)
}

pub fn soldier(id: &str, name: &str) -> Identity {
    Identity::new(id, name, UNIT, Role::User)
}

pub async fn create_equipment(services: &Services, name: &str) -> Equipment {
    let data = CreateEquipment {
        name: name.to_string(),
        description: format!("{} for field use", name),
        unit: UNIT.to_string(),
        quantity: 1,
    };
    services
        .equipment
        .create(&admin("A1"), &data)
        .await
        .expect("create equipment")
}

pub fn task_request(equipment_id: Option<Uuid>, assignees: &[&str]) -> CreateTask {
    CreateTask {
        title: "Scheduled maintenance".to_string(),
        description: "Inspect and service".to_string(),
        unit: UNIT.to_string(),
        date: NaiveDate::from_ymd_opt(2026, 11, 1).expect("valid date"),
        assignee_ids: assignees.iter().map(|s| s.to_string()).collect(),
        equipment_id,
    }
}

pub async fn create_task(services: &Services, assigner: &Identity, equipment_id: Option<Uuid>) -> Task {
    services
        .tasks
        .create(assigner, &task_request(equipment_id, &["U1"]))
        .await
        .expect("create task")
}

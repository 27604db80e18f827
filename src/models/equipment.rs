//! Equipment model and custody ledger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::enums::EquipmentStatus;
use super::validate_not_blank;
use crate::error::{AppError, AppResult};

/// One custody event: who signed in or out, and when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CustodyEntry {
    pub user_id: String,
    pub user_name: String,
    pub at: DateTime<Utc>,
}

/// Equipment record with its custody ledger
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Equipment {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub unit: String,
    pub quantity: i32,
    pub status: EquipmentStatus,
    pub creator_id: String,
    /// Users currently holding the equipment, in sign-in order
    pub sign_ins: Vec<CustodyEntry>,
    /// Closed custody events, oldest first
    pub sign_outs: Vec<CustodyEntry>,
    pub last_user_sign_in: Option<String>,
    pub last_user_sign_out: Option<String>,
    pub last_sign_in_date: Option<DateTime<Utc>>,
    pub last_sign_out_date: Option<DateTime<Utc>>,
    pub last_maintenance: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Equipment {
    pub fn new(data: &CreateEquipment, creator_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: data.name.trim().to_string(),
            description: data.description.trim().to_string(),
            unit: data.unit.trim().to_string(),
            quantity: data.quantity,
            status: EquipmentStatus::Available,
            creator_id: creator_id.to_string(),
            sign_ins: Vec::new(),
            sign_outs: Vec::new(),
            last_user_sign_in: None,
            last_user_sign_out: None,
            last_sign_in_date: None,
            last_sign_out_date: None,
            last_maintenance: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_signed_in(&self, user_id: &str) -> bool {
        self.sign_ins.iter().any(|e| e.user_id == user_id)
    }

    /// Record a sign-in. Status is left untouched.
    pub fn sign_in(
        &mut self,
        user_id: &str,
        user_name: &str,
        now: DateTime<Utc>,
    ) -> AppResult<CustodyEntry> {
        if !self.status.accepts_sign_in() {
            return Err(AppError::Conflict(format!(
                "Equipment {} is {} and cannot be signed in",
                self.id, self.status
            )));
        }
        if self.is_signed_in(user_id) {
            return Err(AppError::AlreadySignedIn(user_id.to_string()));
        }

        let entry = CustodyEntry {
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            at: now,
        };
        self.sign_ins.push(entry.clone());
        self.last_user_sign_in = Some(user_name.to_string());
        self.last_sign_in_date = Some(now);
        self.updated_at = now;
        Ok(entry)
    }

    /// Close the caller's active custody entry and append it to the history.
    ///
    /// Allowed whatever the status, so holders can still return equipment
    /// that went into maintenance while they had it.
    pub fn sign_out(
        &mut self,
        user_id: &str,
        user_name: &str,
        now: DateTime<Utc>,
    ) -> AppResult<CustodyEntry> {
        let pos = self
            .sign_ins
            .iter()
            .position(|e| e.user_id == user_id)
            .ok_or_else(|| AppError::NotSignedIn(user_id.to_string()))?;
        self.sign_ins.remove(pos);

        let entry = CustodyEntry {
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            at: now,
        };
        self.sign_outs.push(entry.clone());
        self.last_user_sign_out = Some(user_name.to_string());
        self.last_sign_out_date = Some(now);
        self.updated_at = now;
        Ok(entry)
    }

    /// Apply an administrative edit. The custody ledger is never touched.
    pub fn apply_update(&mut self, data: &UpdateEquipment, now: DateTime<Utc>) {
        if let Some(ref name) = data.name {
            self.name = name.trim().to_string();
        }
        if let Some(ref description) = data.description {
            self.description = description.trim().to_string();
        }
        if let Some(ref unit) = data.unit {
            self.unit = unit.trim().to_string();
        }
        if let Some(quantity) = data.quantity {
            self.quantity = quantity;
        }
        if let Some(status) = data.status {
            self.status = status;
        }
        self.updated_at = now;
    }
}

/// Create equipment request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateEquipment {
    #[validate(custom(function = "validate_not_blank"))]
    pub name: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub description: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub unit: String,
    #[validate(range(min = 0, message = "Quantity must not be negative"))]
    pub quantity: i32,
}

/// Update equipment request.
///
/// `status` is the administrative override; it is the only way to reach `IN_USE`.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateEquipment {
    #[validate(custom(function = "validate_not_blank"))]
    pub name: Option<String>,
    #[validate(custom(function = "validate_not_blank"))]
    pub description: Option<String>,
    #[validate(custom(function = "validate_not_blank"))]
    pub unit: Option<String>,
    #[validate(range(min = 0, message = "Quantity must not be negative"))]
    pub quantity: Option<i32>,
    pub status: Option<EquipmentStatus>,
}

/// Equipment list filter
#[derive(Debug, Clone, Default, PartialEq, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct EquipmentQuery {
    pub unit: Option<String>,
    pub status: Option<EquipmentStatus>,
}

impl EquipmentQuery {
    pub fn matches(&self, equipment: &Equipment) -> bool {
        self.unit.as_ref().map_or(true, |u| &equipment.unit == u)
            && self.status.map_or(true, |s| equipment.status == s)
    }
}

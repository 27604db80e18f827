//! MEMS: military equipment custody and maintenance server
//!
//! Tracks who holds which piece of equipment, schedules maintenance tasks
//! against it, and keeps equipment status consistent with task lifecycle.
//! Exposed as a REST JSON API.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

//! Business logic services for quota-service.

pub mod billing;
pub mod database;
pub mod generation;
pub mod memory;
pub mod metrics;
pub mod providers;
pub mod quota;
pub mod reconciler;
pub mod repository;

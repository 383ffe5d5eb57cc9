//! quota-service: quota enforcement and billing-state reconciliation for
//! multi-tenant content generation.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;

//! Tenant model.

use crate::models::Plan;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Tenant row. The plan column mirrors the current subscription plan so
/// entitlement checks never need a provider round trip; the mirror is
/// maintained by the billing reconciler.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tenant {
    pub tenant_id: Uuid,
    pub name: String,
    pub plan: String,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Tenant {
    pub fn plan(&self) -> Plan {
        Plan::from_string(&self.plan)
    }
}

/// Input for onboarding a tenant.
#[derive(Debug, Clone)]
pub struct CreateTenant {
    pub tenant_id: Uuid,
    pub name: String,
}

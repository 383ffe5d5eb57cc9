//! HTTP handlers for quota-service.

pub mod content;
pub mod export;
pub mod subscription;
pub mod tenants;
pub mod webhooks;

pub use content::*;
pub use export::*;
pub use subscription::*;
pub use tenants::*;
pub use webhooks::*;

//! API middleware and extractors

pub mod admin_auth;
pub mod identity;
pub mod metrics;

pub use admin_auth::{RequireAdmin, ADMIN_KEY_HEADER};
pub use identity::{Caller, FINGERPRINT_HEADER};
pub use metrics::metrics_middleware;

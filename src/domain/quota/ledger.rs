//! Usage ledger contract
//!
//! The ledger is a dumb store: it never compares counts against limits.
//! Expiry is lazy; a record whose window is no longer current is reported
//! as absent and replaced on the next increment.

use std::fmt::Debug;

use async_trait::async_trait;

use super::identity::Identity;
use super::record::UsageRecord;
use super::tier::Tier;
use super::window::WindowFrame;
use crate::domain::DomainError;

/// Durable per-identity consumption store
#[async_trait]
pub trait UsageLedger: Send + Sync + Debug {
    /// Current-window record for `identity`, `None` if absent or expired
    async fn get_record(
        &self,
        identity: &Identity,
        frame: &WindowFrame,
    ) -> Result<Option<UsageRecord>, DomainError>;

    /// Atomically read-or-create the current-window record and add `amount`.
    ///
    /// Concurrent calls for the same identity must each be applied exactly
    /// once.
    async fn increment(
        &self,
        identity: &Identity,
        tier: Tier,
        frame: &WindowFrame,
        amount: u32,
    ) -> Result<UsageRecord, DomainError>;

    /// Drop whatever is stored for `identity`; true if something was removed
    async fn reset(&self, identity: &Identity) -> Result<bool, DomainError>;

    /// Short backend name for logs and readiness output
    fn backend_name(&self) -> &'static str;
}

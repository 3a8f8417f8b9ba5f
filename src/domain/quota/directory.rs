//! Tier directory contract
//!
//! Maps authenticated users to their subscription tier. Anonymous
//! identities are always guests and never consult the directory.

use async_trait::async_trait;

use super::identity::UserId;
use super::tier::Tier;
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Lookup and assignment of subscription tiers
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TierDirectory: Send + Sync {
    /// Tier assigned to `user_id`, `None` when the user has none on record
    async fn tier_for(&self, user_id: &UserId) -> Result<Option<Tier>, DomainError>;

    /// Assign `tier` to `user_id`
    async fn set_tier(&self, user_id: &UserId, tier: Tier) -> Result<(), DomainError>;
}

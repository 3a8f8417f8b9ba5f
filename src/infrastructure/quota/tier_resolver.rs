use std::sync::Arc;

use tracing::warn;

use crate::domain::quota::{Identity, Tier, TierDirectory};
use crate::domain::DomainError;

/// Tier an identity is evaluated under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub tier: Tier,
    /// The directory was unreachable and `tier` is only the default
    pub degraded: bool,
}

impl Resolution {
    fn confirmed(tier: Tier) -> Self {
        Self {
            tier,
            degraded: false,
        }
    }
}

/// Maps an identity to the tier its quota is evaluated under
#[derive(Clone)]
pub struct TierResolver {
    directory: Arc<dyn TierDirectory>,
}

impl std::fmt::Debug for TierResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TierResolver").finish_non_exhaustive()
    }
}

impl TierResolver {
    pub fn new(directory: Arc<dyn TierDirectory>) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &Arc<dyn TierDirectory> {
        &self.directory
    }

    /// Anonymous identities are guests. Authenticated users get their
    /// directory tier, or the free tier when none is on record. An
    /// unreachable directory yields the free tier marked as degraded, which
    /// callers must not turn into a denial. A stored tier that does not
    /// parse is an error.
    pub async fn resolve(&self, identity: &Identity) -> Result<Resolution, DomainError> {
        let user_id = match identity {
            Identity::Anonymous(_) => return Ok(Resolution::confirmed(Tier::Guest)),
            Identity::Authenticated(user_id) => user_id,
        };

        match self.directory.tier_for(user_id).await {
            Ok(Some(Tier::Guest)) | Ok(None) => {
                Ok(Resolution::confirmed(Tier::authenticated_default()))
            }
            Ok(Some(tier)) => Ok(Resolution::confirmed(tier)),
            Err(e) if e.is_storage() => {
                warn!(
                    identity = %identity.redacted(),
                    error = %e,
                    "Tier directory unavailable, tier unknown"
                );
                Ok(Resolution {
                    tier: Tier::authenticated_default(),
                    degraded: true,
                })
            }
            Err(e) => Err(e),
        }
    }
}

//! Tier policy table
//!
//! Static mapping from tier to quota parameters. Lookups are total over
//! [`Tier`]; the table itself is validated once, when it is built.

use serde::{Deserialize, Serialize};

use super::tier::{Allowance, Tier};
use super::window::WindowKind;
use crate::domain::DomainError;

/// Default lifetime message cap for guests
pub const DEFAULT_GUEST_CAP: u32 = 2;
/// Default daily messages on the free tier
pub const DEFAULT_FREE_LIMIT: u32 = 5;
/// Default daily messages on the premium tier
pub const DEFAULT_PREMIUM_LIMIT: u32 = 10;

/// Quota parameters of a single tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPolicy {
    /// Units available per window (lifetime for guests)
    pub daily_limit: Allowance,
    pub window_kind: WindowKind,
    /// Units one chat message consumes
    pub cost_per_message: u32,
}

impl TierPolicy {
    /// Messages still available after `consumed` units were spent
    pub fn remaining_after(&self, consumed: u32) -> Allowance {
        match self.daily_limit {
            Allowance::Unlimited => Allowance::Unlimited,
            Allowance::Limited(limit) => {
                Allowance::Limited(limit.saturating_sub(consumed) / self.cost_per_message.max(1))
            }
        }
    }

    /// The limit expressed in messages rather than units
    pub fn message_limit(&self) -> Allowance {
        self.remaining_after(0)
    }
}

/// Configurable parameters of a ledger-backed tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeteredTier {
    pub daily_limit: u32,
    pub window_kind: WindowKind,
    #[serde(default = "default_cost")]
    pub cost_per_message: u32,
}

fn default_cost() -> u32 {
    1
}

impl MeteredTier {
    pub fn new(daily_limit: u32, window_kind: WindowKind) -> Self {
        Self {
            daily_limit,
            window_kind,
            cost_per_message: 1,
        }
    }

    pub fn with_cost_per_message(mut self, cost: u32) -> Self {
        self.cost_per_message = cost;
        self
    }

    fn validate(&self, tier: Tier) -> Result<(), DomainError> {
        if self.window_kind == WindowKind::None {
            return Err(DomainError::configuration(format!(
                "Tier '{}' must reset on a window, 'none' is reserved for guests",
                tier
            )));
        }

        if self.cost_per_message == 0 {
            return Err(DomainError::configuration(format!(
                "Tier '{}' must charge at least one unit per message",
                tier
            )));
        }

        Ok(())
    }

    fn policy(&self) -> TierPolicy {
        TierPolicy {
            daily_limit: Allowance::Limited(self.daily_limit),
            window_kind: self.window_kind,
            cost_per_message: self.cost_per_message,
        }
    }
}

/// The tier-to-policy table, single authority for every limit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierPolicyTable {
    guest_cap: u32,
    free: MeteredTier,
    premium: MeteredTier,
}

impl TierPolicyTable {
    /// Build and validate a table
    pub fn new(guest_cap: u32, free: MeteredTier, premium: MeteredTier) -> Result<Self, DomainError> {
        free.validate(Tier::Free)?;
        premium.validate(Tier::Premium)?;

        Ok(Self {
            guest_cap,
            free,
            premium,
        })
    }

    /// Quota parameters for `tier`
    pub fn limit_for(&self, tier: Tier) -> TierPolicy {
        match tier {
            Tier::Guest => TierPolicy {
                daily_limit: Allowance::Limited(self.guest_cap),
                window_kind: WindowKind::None,
                cost_per_message: 1,
            },
            Tier::Free => self.free.policy(),
            Tier::Premium => self.premium.policy(),
            Tier::Transformation => TierPolicy {
                daily_limit: Allowance::Unlimited,
                window_kind: WindowKind::None,
                cost_per_message: 0,
            },
        }
    }

    /// Lifetime cap of the client-side guest counter
    pub fn guest_cap(&self) -> u32 {
        self.guest_cap
    }

    /// Every tier with its policy, in ascending order
    pub fn entries(&self) -> Vec<(Tier, TierPolicy)> {
        Tier::ALL
            .iter()
            .map(|tier| (*tier, self.limit_for(*tier)))
            .collect()
    }
}

impl Default for TierPolicyTable {
    fn default() -> Self {
        Self {
            guest_cap: DEFAULT_GUEST_CAP,
            free: MeteredTier::new(DEFAULT_FREE_LIMIT, WindowKind::CalendarDay),
            premium: MeteredTier::new(DEFAULT_PREMIUM_LIMIT, WindowKind::Rolling24h),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let table = TierPolicyTable::default();

        let guest = table.limit_for(Tier::Guest);
        assert_eq!(guest.daily_limit, Allowance::Limited(2));
        assert_eq!(guest.window_kind, WindowKind::None);

        let free = table.limit_for(Tier::Free);
        assert_eq!(free.daily_limit, Allowance::Limited(5));
        assert_eq!(free.window_kind, WindowKind::CalendarDay);

        let premium = table.limit_for(Tier::Premium);
        assert_eq!(premium.daily_limit, Allowance::Limited(10));

        let transformation = table.limit_for(Tier::Transformation);
        assert!(transformation.daily_limit.is_unlimited());
    }

    #[test]
    fn test_guest_cap_comes_from_table() {
        let table = TierPolicyTable::new(
            3,
            MeteredTier::new(5, WindowKind::CalendarDay),
            MeteredTier::new(10, WindowKind::CalendarDay),
        )
        .unwrap();

        assert_eq!(table.guest_cap(), 3);
        assert_eq!(
            table.limit_for(Tier::Guest).daily_limit,
            Allowance::Limited(3)
        );
    }

    #[test]
    fn test_metered_tier_without_window_is_rejected() {
        let result = TierPolicyTable::new(
            2,
            MeteredTier::new(5, WindowKind::None),
            MeteredTier::new(10, WindowKind::Rolling24h),
        );

        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }

    #[test]
    fn test_zero_cost_is_rejected() {
        let result = TierPolicyTable::new(
            2,
            MeteredTier::new(5, WindowKind::CalendarDay),
            MeteredTier::new(10, WindowKind::Rolling24h).with_cost_per_message(0),
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_remaining_after_respects_cost() {
        let policy = MeteredTier::new(10, WindowKind::CalendarDay)
            .with_cost_per_message(2)
            .policy();

        assert_eq!(policy.message_limit(), Allowance::Limited(5));
        assert_eq!(policy.remaining_after(3), Allowance::Limited(3));
        assert_eq!(policy.remaining_after(9), Allowance::Limited(0));
        assert_eq!(policy.remaining_after(40), Allowance::Limited(0));
    }

    #[test]
    fn test_entries_cover_every_tier() {
        let entries = TierPolicyTable::default().entries();
        let tiers: Vec<Tier> = entries.iter().map(|(t, _)| *t).collect();

        assert_eq!(tiers, Tier::ALL.to_vec());
    }
}

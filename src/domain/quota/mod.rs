//! Usage-tier quota domain: tiers, policies, windows, records and decisions

mod decision;
mod directory;
mod guest;
mod identity;
mod ledger;
mod policy;
mod record;
mod tier;
mod window;

pub use decision::LimitDecision;
pub use directory::TierDirectory;
pub use guest::GuestCounterState;
pub use identity::{Fingerprint, Identity, UserId};
pub use ledger::UsageLedger;
pub use policy::{
    MeteredTier, TierPolicy, TierPolicyTable, DEFAULT_FREE_LIMIT, DEFAULT_GUEST_CAP,
    DEFAULT_PREMIUM_LIMIT,
};
pub use record::UsageRecord;
pub use tier::{Allowance, Tier};
pub use window::{ReferenceZone, WindowFrame, WindowKind};

#[cfg(test)]
pub use directory::MockTierDirectory;
#[cfg(test)]
pub use ledger::mock::MockUsageLedger;

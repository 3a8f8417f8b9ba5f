//! Limit decisions
//!
//! A decision is always derived by the functions in this module, whether it
//! answers a fresh evaluation or reflects the state right after a ledger
//! increment, so both paths report identical numbers for identical state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::guest::GuestCounterState;
use super::policy::TierPolicy;
use super::record::UsageRecord;
use super::tier::{Allowance, Tier};
use super::window::WindowFrame;

/// Allow/deny verdict plus the metadata a client needs to explain it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitDecision {
    pub tier: Tier,
    pub allowed: bool,
    pub remaining: Allowance,
    pub daily_limit: Allowance,
    #[serde(rename = "reset_time")]
    pub reset_at: Option<DateTime<Utc>>,
}

impl LimitDecision {
    /// Decision for tiers without any limit
    pub fn unlimited(tier: Tier) -> Self {
        Self {
            tier,
            allowed: true,
            remaining: Allowance::Unlimited,
            daily_limit: Allowance::Unlimited,
            reset_at: None,
        }
    }

    /// Decision for a guest from the client-side counter; guests never reset
    pub fn for_guest(policy: &TierPolicy, counter: &GuestCounterState) -> Self {
        let cap = policy.daily_limit.limited().unwrap_or(0);
        let remaining = counter.remaining(cap);

        Self {
            tier: Tier::Guest,
            allowed: remaining > 0,
            remaining: Allowance::Limited(remaining),
            daily_limit: Allowance::Limited(cap),
            reset_at: None,
        }
    }

    /// Decision for a ledger-backed tier.
    ///
    /// A missing record, or one whose window is no longer current, counts
    /// as zero consumption in a window opening at `frame.fresh_start`.
    pub fn for_ledger(
        tier: Tier,
        policy: &TierPolicy,
        record: Option<&UsageRecord>,
        frame: &WindowFrame,
    ) -> Self {
        let (consumed, window_start) = match record {
            Some(r) if frame.is_current(r.window_start) => (r.count, r.window_start),
            _ => (0, frame.fresh_start),
        };

        let remaining = policy.remaining_after(consumed);

        Self {
            tier,
            allowed: !remaining.is_exhausted(),
            remaining,
            daily_limit: policy.message_limit(),
            reset_at: Some(frame.resets_at(window_start)),
        }
    }

    /// Best-effort projection of this decision after one more message, used
    /// when the ledger could not confirm the post-increment state.
    pub fn projected_after_message(&self) -> Self {
        match self.remaining {
            Allowance::Unlimited => self.clone(),
            Allowance::Limited(n) => {
                let remaining = n.saturating_sub(1);
                Self {
                    allowed: remaining > 0,
                    remaining: Allowance::Limited(remaining),
                    ..self.clone()
                }
            }
        }
    }
}

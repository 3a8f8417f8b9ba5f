//! Ledger record entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tier::Tier;
use super::window::WindowFrame;

/// Consumption of one identity within one accounting window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Ledger key of the identity (see `Identity::ledger_key`)
    pub identity_key: String,
    /// Units consumed in the window
    pub count: u32,
    /// Instant the current window opened
    pub window_start: DateTime<Utc>,
    /// Tier at the time of the last write, kept for audit
    pub tier: Tier,
}

impl UsageRecord {
    /// A record for a window that has just opened
    pub fn opened(identity_key: impl Into<String>, tier: Tier, window_start: DateTime<Utc>) -> Self {
        Self {
            identity_key: identity_key.into(),
            count: 0,
            window_start,
            tier,
        }
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// The record after spending `amount` units at the instant described by
    /// `frame`; an expired window is replaced by a fresh one first.
    pub fn advanced(&self, tier: Tier, frame: &WindowFrame, amount: u32) -> Self {
        if frame.is_current(self.window_start) {
            Self {
                identity_key: self.identity_key.clone(),
                count: self.count.saturating_add(amount),
                window_start: self.window_start,
                tier,
            }
        } else {
            Self::opened(self.identity_key.clone(), tier, frame.fresh_start).with_count(amount)
        }
    }
}

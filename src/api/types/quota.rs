//! Quota and tier payloads

use serde::{Deserialize, Serialize};

use crate::domain::{Allowance, Tier, TierPolicyTable, WindowKind};

/// One row of the published policy table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierEntry {
    pub tier: Tier,
    /// Messages per window, or lifetime messages for guests
    pub daily_limit: Allowance,
    pub window_kind: WindowKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade_to: Option<Tier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TiersResponse {
    pub tiers: Vec<TierEntry>,
    /// Offset of the calendar-day reset from UTC, in minutes
    pub utc_offset_minutes: i32,
}

impl TiersResponse {
    pub fn from_table(table: &TierPolicyTable, utc_offset_minutes: i32) -> Self {
        let tiers = table
            .entries()
            .into_iter()
            .map(|(tier, policy)| TierEntry {
                tier,
                daily_limit: policy.message_limit(),
                window_kind: policy.window_kind,
                upgrade_to: tier.upgrade_target(),
            })
            .collect();

        Self {
            tiers,
            utc_offset_minutes,
        }
    }
}

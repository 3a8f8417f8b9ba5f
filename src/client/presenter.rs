//! Maps a quota state to what the client shows
//!
//! Pure functions; the caller recomputes the view on every decision update.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{Allowance, Tier};

/// Above this many remaining messages the meter is calm
pub const WARNING_THRESHOLD: u32 = 3;
/// At or below this many remaining messages the meter is critical
pub const CRITICAL_THRESHOLD: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitLevel {
    Normal,
    Warning,
    Critical,
}

/// Rendered quota state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LimitView {
    pub level: LimitLevel,
    pub headline: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Tier to suggest, when an upgrade prompt should be shown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade_to: Option<Tier>,
}

pub fn level_for(remaining: Allowance) -> LimitLevel {
    match remaining {
        Allowance::Unlimited => LimitLevel::Normal,
        Allowance::Limited(n) if n > WARNING_THRESHOLD => LimitLevel::Normal,
        Allowance::Limited(n) if n > CRITICAL_THRESHOLD => LimitLevel::Warning,
        Allowance::Limited(_) => LimitLevel::Critical,
    }
}

/// View for `(remaining, tier, reset_at)`
pub fn present(remaining: Allowance, tier: Tier, reset_at: Option<DateTime<Utc>>) -> LimitView {
    match tier {
        Tier::Guest => present_guest(remaining.limited().unwrap_or(0)),
        Tier::Free | Tier::Premium => present_metered(remaining, tier, reset_at),
        Tier::Transformation => LimitView {
            level: LimitLevel::Normal,
            headline: "Unlimited guidance".to_string(),
            detail: None,
            upgrade_to: None,
        },
    }
}

fn present_guest(remaining: u32) -> LimitView {
    let (level, headline) = match remaining {
        0 => (
            LimitLevel::Critical,
            "You've used your free guest messages".to_string(),
        ),
        1 => (LimitLevel::Warning, "1 guest message left".to_string()),
        n => (LimitLevel::Normal, format!("{} guest messages left", n)),
    };

    LimitView {
        level,
        headline,
        detail: (remaining == 0)
            .then(|| "Sign in to keep the conversation going with daily messages.".to_string()),
        upgrade_to: (remaining <= CRITICAL_THRESHOLD).then_some(Tier::Free),
    }
}

fn present_metered(
    remaining: Allowance,
    tier: Tier,
    reset_at: Option<DateTime<Utc>>,
) -> LimitView {
    let level = level_for(remaining);
    let left = remaining.limited().unwrap_or(0);

    let headline = match left {
        0 => "You've reached today's message limit".to_string(),
        1 => "1 message left".to_string(),
        n => format!("{} messages left", n),
    };
    let detail = reset_at.map(|at| format!("Resets at {}", at.format("%Y-%m-%d %H:%M UTC")));
    let upgrade_to = match level {
        LimitLevel::Normal => None,
        LimitLevel::Warning | LimitLevel::Critical => tier.upgrade_target(),
    };

    LimitView {
        level,
        headline,
        detail,
        upgrade_to,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn premium_after(consumed: u32) -> LimitView {
        present(Allowance::Limited(10 - consumed), Tier::Premium, None)
    }

    #[test]
    fn test_thresholds() {
        assert_eq!(level_for(Allowance::Limited(5)), LimitLevel::Normal);
        assert_eq!(level_for(Allowance::Limited(4)), LimitLevel::Normal);
        assert_eq!(level_for(Allowance::Limited(3)), LimitLevel::Warning);
        assert_eq!(level_for(Allowance::Limited(2)), LimitLevel::Warning);
        assert_eq!(level_for(Allowance::Limited(1)), LimitLevel::Critical);
        assert_eq!(level_for(Allowance::Limited(0)), LimitLevel::Critical);
        assert_eq!(level_for(Allowance::Unlimited), LimitLevel::Normal);
    }

    #[test]
    fn test_premium_countdown() {
        assert_eq!(premium_after(7).level, LimitLevel::Warning);
        assert_eq!(premium_after(8).level, LimitLevel::Warning);
        assert_eq!(premium_after(9).level, LimitLevel::Critical);

        let spent = premium_after(10);
        assert_eq!(spent.level, LimitLevel::Critical);
        assert_eq!(spent.headline, "You've reached today's message limit");
        assert_eq!(spent.upgrade_to, Some(Tier::Transformation));
    }

    #[test]
    fn test_normal_free_has_no_upgrade_prompt() {
        let view = present(
            Allowance::Limited(5),
            Tier::Free,
            Some(DateTime::parse_from_rfc3339("2026-03-11T00:00:00Z").unwrap().with_timezone(&Utc)),
        );

        assert_eq!(view.level, LimitLevel::Normal);
        assert!(view.upgrade_to.is_none());
        assert_eq!(view.detail.as_deref(), Some("Resets at 2026-03-11 00:00 UTC"));
    }

    #[test]
    fn test_guest_copy() {
        let fresh = present(Allowance::Limited(2), Tier::Guest, None);
        assert_eq!(fresh.level, LimitLevel::Normal);
        assert_eq!(fresh.headline, "2 guest messages left");
        assert!(fresh.upgrade_to.is_none());

        let last = present(Allowance::Limited(1), Tier::Guest, None);
        assert_eq!(last.level, LimitLevel::Warning);
        assert_eq!(last.headline, "1 guest message left");
        assert_eq!(last.upgrade_to, Some(Tier::Free));

        let spent = present(Allowance::Limited(0), Tier::Guest, None);
        assert_eq!(spent.level, LimitLevel::Critical);
        assert!(spent.detail.unwrap().contains("Sign in"));
    }

    #[test]
    fn test_transformation_is_always_normal() {
        let view = present(Allowance::Unlimited, Tier::Transformation, None);
        assert_eq!(view.level, LimitLevel::Normal);
        assert!(view.upgrade_to.is_none());
    }
}

//! Accounting windows
//!
//! Every limited tier accounts in windows of exactly 24 hours. A rolling
//! window opens on the first message after the previous window expired; a
//! calendar window opens at midnight of the reference timezone. The
//! reference timezone is a fixed UTC offset so that "day" means the same
//! thing for every identity and never shifts with daylight saving.

use std::fmt;

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// How a tier's quota resets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowKind {
    /// Lifetime cap, never resets
    #[serde(rename = "none")]
    None,
    /// Resets 24h after the first message of the window
    #[serde(rename = "rolling-24h")]
    Rolling24h,
    /// Resets at midnight of the reference timezone
    #[serde(rename = "calendar-day")]
    CalendarDay,
}

impl WindowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Rolling24h => "rolling-24h",
            Self::CalendarDay => "calendar-day",
        }
    }

    /// Length of one window, `None` for lifetime caps
    pub fn length(&self) -> Option<Duration> {
        match self {
            Self::None => None,
            Self::Rolling24h | Self::CalendarDay => Some(Duration::hours(24)),
        }
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reference timezone for calendar-day windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceZone {
    offset: FixedOffset,
}

impl ReferenceZone {
    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    /// Build from an offset east of UTC in minutes (e.g. `-300` for UTC-05:00)
    pub fn from_offset_minutes(minutes: i32) -> Result<Self, DomainError> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(|offset| Self { offset })
            .ok_or_else(|| {
                DomainError::configuration(format!(
                    "UTC offset of {} minutes is out of range",
                    minutes
                ))
            })
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Start of the local day containing `now`, expressed in UTC
    pub fn day_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local_midnight = now
            .with_timezone(&self.offset)
            .date_naive()
            .and_time(NaiveTime::MIN);
        let shift = Duration::seconds(i64::from(self.offset.local_minus_utc()));
        Utc.from_utc_datetime(&(local_midnight - shift))
    }
}

impl Default for ReferenceZone {
    fn default() -> Self {
        Self::utc()
    }
}

/// The accounting window that is current at a given instant.
///
/// A stored window start is current iff `start > stale_cutoff`. For rolling
/// windows the cutoff is `now - 24h`, so a window lives until
/// `start + 24h`. For calendar days the cutoff sits just before local
/// midnight, so only windows opened today count, whenever they opened.
/// The boundary instant itself belongs to the new window in both cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowFrame {
    kind: WindowKind,
    /// Where a brand new window would start if one opened now
    pub fresh_start: DateTime<Utc>,
    /// Window starts at or before this instant are expired
    pub stale_cutoff: DateTime<Utc>,
    length: Duration,
}

impl WindowFrame {
    /// Frame for `kind` at `now`; `None` for lifetime caps, which have no window
    pub fn at(kind: WindowKind, now: DateTime<Utc>, zone: &ReferenceZone) -> Option<Self> {
        let length = kind.length()?;

        let (fresh_start, stale_cutoff) = match kind {
            WindowKind::Rolling24h => (now, now - length),
            WindowKind::CalendarDay => {
                let midnight = zone.day_start(now);
                (midnight, midnight - Duration::nanoseconds(1))
            }
            WindowKind::None => return None,
        };

        Some(Self {
            kind,
            fresh_start,
            stale_cutoff,
            length,
        })
    }

    pub fn kind(&self) -> WindowKind {
        self.kind
    }

    /// Whether a record opened at `window_start` still accounts for this frame
    pub fn is_current(&self, window_start: DateTime<Utc>) -> bool {
        window_start > self.stale_cutoff
    }

    /// Instant at which a window opened at `window_start` resets.
    ///
    /// Calendar windows always reset at the next local midnight.
    pub fn resets_at(&self, window_start: DateTime<Utc>) -> DateTime<Utc> {
        match self.kind {
            WindowKind::CalendarDay => self.fresh_start + self.length,
            _ => window_start + self.length,
        }
    }
}

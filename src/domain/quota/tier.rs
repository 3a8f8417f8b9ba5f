//! Subscription tiers and the quantities they are measured in

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::domain::DomainError;

/// Subscription class governing quota policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Unauthenticated visitor, counted client-side only
    Guest,
    /// Signed-in account without a subscription
    Free,
    Premium,
    /// Top subscription, never limited
    Transformation,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Guest, Tier::Free, Tier::Premium, Tier::Transformation];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Free => "free",
            Self::Premium => "premium",
            Self::Transformation => "transformation",
        }
    }

    /// Tier an authenticated identity falls back to when nothing else is known
    pub fn authenticated_default() -> Self {
        Self::Free
    }

    /// The next tier up, used for upgrade prompts
    pub fn upgrade_target(&self) -> Option<Tier> {
        match self {
            Self::Guest => Some(Self::Free),
            Self::Free => Some(Self::Premium),
            Self::Premium => Some(Self::Transformation),
            Self::Transformation => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Tier {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "guest" => Ok(Self::Guest),
            "free" => Ok(Self::Free),
            "premium" => Ok(Self::Premium),
            "transformation" => Ok(Self::Transformation),
            other => Err(DomainError::policy(format!("Unknown tier '{}'", other))),
        }
    }
}

/// A message count that may be unbounded.
///
/// Serialized as a JSON integer, or as the string `"unlimited"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Allowance {
    Limited(u32),
    Unlimited,
}

impl Allowance {
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Self::Unlimited)
    }

    pub fn limited(&self) -> Option<u32> {
        match self {
            Self::Limited(n) => Some(*n),
            Self::Unlimited => None,
        }
    }

    /// True when there is nothing left to spend
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Limited(0))
    }
}

impl fmt::Display for Allowance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limited(n) => write!(f, "{}", n),
            Self::Unlimited => write!(f, "unlimited"),
        }
    }
}

impl Serialize for Allowance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Limited(n) => serializer.serialize_u32(*n),
            Self::Unlimited => serializer.serialize_str("unlimited"),
        }
    }
}

impl<'de> Deserialize<'de> for Allowance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AllowanceVisitor;

        impl Visitor<'_> for AllowanceVisitor {
            type Value = Allowance;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative integer or \"unlimited\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Allowance, E> {
                u32::try_from(v)
                    .map(Allowance::Limited)
                    .map_err(|_| E::custom(format!("allowance {} out of range", v)))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Allowance, E> {
                u32::try_from(v)
                    .map(Allowance::Limited)
                    .map_err(|_| E::custom(format!("allowance {} out of range", v)))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Allowance, E> {
                if v.eq_ignore_ascii_case("unlimited") {
                    Ok(Allowance::Unlimited)
                } else {
                    Err(E::invalid_value(de::Unexpected::Str(v), &self))
                }
            }
        }

        deserializer.deserialize_any(AllowanceVisitor)
    }
}

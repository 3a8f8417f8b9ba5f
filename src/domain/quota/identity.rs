//! Who is consuming quota

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::DomainError;

const MAX_ID_LENGTH: usize = 128;

fn validate_token(kind: &str, value: &str) -> Result<(), DomainError> {
    if value.is_empty() {
        return Err(DomainError::validation(format!("{} cannot be empty", kind)));
    }

    if value.len() > MAX_ID_LENGTH {
        return Err(DomainError::validation(format!(
            "{} cannot exceed {} characters",
            kind, MAX_ID_LENGTH
        )));
    }

    let valid = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '|' | '@'));

    if !valid {
        return Err(DomainError::validation(format!(
            "{} contains unsupported characters",
            kind
        )));
    }

    Ok(())
}

/// Stable, server-known account identifier (the OAuth subject)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        validate_token("User ID", &id)?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Client-generated anonymous identifier, not guaranteed unique
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        validate_token("Fingerprint", &value)?;
        Ok(Self(value))
    }

    /// Mint a fresh fingerprint for a client that did not send one
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The party a chat turn is accounted to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    Authenticated(UserId),
    Anonymous(Fingerprint),
}

impl Identity {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::Authenticated(id) => Some(id),
            Self::Anonymous(_) => None,
        }
    }

    /// Key under which ledger records for this identity are stored
    pub fn ledger_key(&self) -> String {
        match self {
            Self::Authenticated(id) => format!("user:{}", id.as_str()),
            Self::Anonymous(fp) => format!("anon:{}", fp.as_str()),
        }
    }

    /// Short, non-reversible label safe to put in logs
    pub fn redacted(&self) -> String {
        let digest = Sha256::digest(self.ledger_key().as_bytes());
        let prefix = match self {
            Self::Authenticated(_) => "user",
            Self::Anonymous(_) => "anon",
        };
        format!("{}#{}", prefix, &hex::encode(digest)[..12])
    }
}

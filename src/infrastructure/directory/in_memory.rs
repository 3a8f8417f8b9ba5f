use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::quota::{Tier, TierDirectory, UserId};
use crate::domain::DomainError;

/// Tier assignments held in process memory
#[derive(Debug, Default)]
pub struct InMemoryTierDirectory {
    tiers: RwLock<HashMap<String, Tier>>,
}

impl InMemoryTierDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory pre-filled from `user id -> tier name` pairs
    pub fn with_seed<'a>(
        seed: impl IntoIterator<Item = (&'a String, &'a String)>,
    ) -> Result<Self, DomainError> {
        let mut tiers = HashMap::new();
        for (user_id, tier) in seed {
            let user_id = UserId::new(user_id.as_str())?;
            tiers.insert(user_id.as_str().to_string(), tier.parse::<Tier>()?);
        }

        Ok(Self {
            tiers: RwLock::new(tiers),
        })
    }
}

#[async_trait]
impl TierDirectory for InMemoryTierDirectory {
    async fn tier_for(&self, user_id: &UserId) -> Result<Option<Tier>, DomainError> {
        let tiers = self.tiers.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(tiers.get(user_id.as_str()).copied())
    }

    async fn set_tier(&self, user_id: &UserId, tier: Tier) -> Result<(), DomainError> {
        let mut tiers = self.tiers.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        tiers.insert(user_id.as_str().to_string(), tier);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_user_has_no_tier() {
        let directory = InMemoryTierDirectory::new();
        assert_eq!(directory.tier_for(&user("nobody")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let directory = InMemoryTierDirectory::new();

        directory.set_tier(&user("u1"), Tier::Premium).await.unwrap();
        assert_eq!(directory.tier_for(&user("u1")).await.unwrap(), Some(Tier::Premium));

        directory.set_tier(&user("u1"), Tier::Free).await.unwrap();
        assert_eq!(directory.tier_for(&user("u1")).await.unwrap(), Some(Tier::Free));
    }

    #[tokio::test]
    async fn test_seed() {
        let seed: HashMap<String, String> = [
            ("u1".to_string(), "premium".to_string()),
            ("u2".to_string(), "Transformation".to_string()),
        ]
        .into_iter()
        .collect();

        let directory = InMemoryTierDirectory::with_seed(&seed).unwrap();

        assert_eq!(directory.tier_for(&user("u1")).await.unwrap(), Some(Tier::Premium));
        assert_eq!(
            directory.tier_for(&user("u2")).await.unwrap(),
            Some(Tier::Transformation)
        );
    }

    #[test]
    fn test_seed_with_unknown_tier_fails() {
        let seed: HashMap<String, String> =
            [("u1".to_string(), "platinum".to_string())].into_iter().collect();

        let err = InMemoryTierDirectory::with_seed(&seed).unwrap_err();
        assert!(matches!(err, DomainError::Policy { .. }));
    }
}

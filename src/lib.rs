//! Guidance Gateway
//!
//! Chat gateway in front of a spiritual-guidance model with tiered usage
//! quotas:
//! - Guest, free, premium and transformation tiers with daily allowances
//! - Usage ledgers in memory, PostgreSQL or Redis
//! - Quota checks before generation, charging only for delivered replies
//! - CRM tagging and speech synthesis as best-effort side effects

pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use api::state::AppState;
use domain::{DomainError, ReplyGenerator};
use infrastructure::{
    auth::JwtValidator,
    chat::{ChatTurnService, ChatTurnSettings, SideEffects, SpeechCache, TurnLocks},
    crm::HttpContactSync,
    directory::create_tier_directory,
    http_client::HttpClient,
    ledger::{create_usage_ledger, PostgresConfig},
    llm::{OpenAiReplyGenerator, OpenAiSettings},
    quota::{QuotaEvaluator, TierResolver},
    tts::OpenAiSpeechSynthesizer,
};

/// Build the application state from environment configuration
pub async fn create_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::load()?;
    create_app_state_with_config(&config).await
}

/// Build the application state from the given configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let policies = config.quota.policy_table()?;
    let zone = config.quota.reference_zone()?;

    let pool = if config.storage.needs_postgres() {
        let url = config.storage.postgres_url.as_deref().ok_or_else(|| {
            DomainError::configuration("storage.postgres_url is required for postgres backends")
        })?;
        let pool = PostgresConfig::new(url)
            .with_max_connections(config.storage.postgres_max_connections)
            .connect()
            .await?;
        info!("Connected to PostgreSQL");
        Some(pool)
    } else {
        None
    };

    let ledger = create_usage_ledger(&config.storage, pool.as_ref()).await?;
    let directory = create_tier_directory(&config.storage, pool.as_ref()).await?;

    let evaluator = Arc::new(QuotaEvaluator::new(policies, ledger).with_zone(zone));
    let tiers = TierResolver::new(directory);

    let speech = SpeechCache::new(
        config.tts.cache_capacity,
        Duration::from_secs(config.tts.cache_ttl_secs),
    );
    let side_effects = create_side_effects(config, speech.clone())?;

    let locks = if config.quota.serialize_turns {
        TurnLocks::for_turns(
            TurnLocks::DEFAULT_CAPACITY,
            Duration::from_secs(config.llm.timeout_secs),
        )
    } else {
        TurnLocks::disabled()
    };

    let chat = ChatTurnService::new(evaluator.clone(), tiers.clone(), create_reply_generator(config)?)
        .with_locks(locks)
        .with_side_effects(side_effects)
        .with_settings(ChatTurnSettings {
            system_prompt: config.llm.system_prompt.clone(),
            max_history: config.llm.max_history,
            generation_timeout: Duration::from_secs(config.llm.timeout_secs),
        });

    let mut state = AppState::new(Arc::new(chat), evaluator, tiers, speech)
        .with_utc_offset(config.quota.utc_offset_minutes);

    match &config.auth.jwt_secret {
        Some(secret) => {
            let mut jwt = JwtValidator::new(secret);
            if let Some(issuer) = &config.auth.issuer {
                jwt = jwt.with_issuer(issuer);
            }
            state = state.with_jwt(jwt);
        }
        None => info!("No JWT secret configured; every caller is treated as a guest"),
    }

    match &config.admin.api_key {
        Some(key) => state = state.with_admin_key(key.as_str()),
        None => info!("No admin key configured; admin API disabled"),
    }

    Ok(state)
}

fn create_reply_generator(config: &AppConfig) -> anyhow::Result<Arc<dyn ReplyGenerator>> {
    let api_key = config
        .llm
        .api_key
        .as_deref()
        .ok_or_else(|| DomainError::configuration("llm.api_key is required"))?;
    // The orchestrator enforces the turn timeout; the client gets some headroom
    let client = HttpClient::with_timeout(
        "openai",
        Duration::from_secs(config.llm.timeout_secs.saturating_add(5)),
    )?;

    let generator = OpenAiReplyGenerator::with_base_url(client, api_key, &config.llm.base_url)
        .with_settings(OpenAiSettings {
            model: config.llm.model.clone(),
            max_tokens: config.llm.max_tokens,
            temperature: config.llm.temperature,
        });

    info!(model = %config.llm.model, "Reply generator ready");
    Ok(Arc::new(generator))
}

fn create_side_effects(config: &AppConfig, speech: SpeechCache) -> anyhow::Result<SideEffects> {
    let mut side_effects = SideEffects::new(speech);

    if config.crm.enabled {
        let api_key = config
            .crm
            .api_key
            .as_deref()
            .ok_or_else(|| DomainError::configuration("crm.api_key is required when CRM is enabled"))?;
        let client =
            HttpClient::with_timeout("crm", Duration::from_secs(config.crm.timeout_secs))?;
        side_effects =
            side_effects.with_crm(Arc::new(HttpContactSync::new(client, api_key, &config.crm.base_url)));
        info!("CRM contact sync enabled");
    }

    if config.tts.enabled {
        let api_key = config
            .tts
            .api_key
            .as_deref()
            .ok_or_else(|| DomainError::configuration("tts.api_key is required when TTS is enabled"))?;
        let client =
            HttpClient::with_timeout("tts", Duration::from_secs(config.tts.timeout_secs))?;
        let tts = OpenAiSpeechSynthesizer::new(client, api_key, &config.tts.base_url)
            .with_voice(&config.tts.model, &config.tts.voice);
        side_effects = side_effects.with_tts(Arc::new(tts));
        info!(voice = %config.tts.voice, "Speech synthesis enabled");
    }

    Ok(side_effects)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_llm_key() -> AppConfig {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("sk-test".to_string());
        config
    }

    #[tokio::test]
    async fn test_default_config_builds_in_memory_state() {
        let state = create_app_state_with_config(&config_with_llm_key())
            .await
            .unwrap();

        assert_eq!(state.evaluator.ledger().backend_name(), "memory");
        assert!(state.jwt.is_none());
        assert!(state.admin_key.is_none());
    }

    #[tokio::test]
    async fn test_missing_llm_key_is_a_configuration_error() {
        let Err(err) = create_app_state_with_config(&AppConfig::default()).await else {
            panic!("state built without an LLM key");
        };

        assert!(err.to_string().contains("llm.api_key"));
    }

    #[tokio::test]
    async fn test_enabled_tts_requires_key() {
        let mut config = config_with_llm_key();
        config.tts.enabled = true;

        assert!(create_app_state_with_config(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_auth_and_admin_are_wired() {
        let mut config = config_with_llm_key();
        config.auth.jwt_secret = Some("s3cret".to_string());
        config.admin.api_key = Some("root".to_string());

        let state = create_app_state_with_config(&config).await.unwrap();
        assert!(state.jwt.is_some());
        assert!(state.admin_key.is_some());
    }
}

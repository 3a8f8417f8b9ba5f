use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::quota::{
    MeteredTier, ReferenceZone, TierPolicyTable, DEFAULT_FREE_LIMIT, DEFAULT_GUEST_CAP,
    DEFAULT_PREMIUM_LIMIT,
};
use crate::domain::{DomainError, WindowKind};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
    pub quota: QuotaConfig,
    pub storage: StorageConfig,
    pub llm: LlmConfig,
    pub auth: AuthConfig,
    pub crm: CrmConfig,
    pub tts: TtsConfig,
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; empty allows any
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}

/// Tier limits and window settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Lifetime messages for guests
    pub guest_cap: u32,
    pub free: MeteredTier,
    pub premium: MeteredTier,
    /// Offset east of UTC, in minutes, that defines "midnight" for calendar windows
    pub utc_offset_minutes: i32,
    /// Serialize chat turns of one identity inside this process
    pub serialize_turns: bool,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    #[default]
    Memory,
    Postgres,
    Redis,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub ledger: LedgerBackend,
    pub directory: DirectoryBackend,
    pub postgres_url: Option<String>,
    pub postgres_max_connections: u32,
    /// Create tables on startup
    pub auto_migrate: bool,
    pub redis_url: Option<String>,
    pub redis_key_prefix: String,
    /// Capacity of the in-memory ledger
    pub memory_max_records: usize,
    /// Tier assignments loaded into the in-memory directory at startup
    pub seed_tiers: HashMap<String, String>,
}

/// OpenAI-compatible chat completion provider
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Upper bound on one generation, in seconds
    pub timeout_secs: u64,
    pub system_prompt: String,
    /// History messages forwarded to the provider
    pub max_history: usize,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 secret for bearer tokens; without it every caller is anonymous
    pub jwt_secret: Option<String>,
    pub issuer: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrmConfig {
    pub enabled: bool,
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub enabled: bool,
    pub base_url: String,
    pub api_key: Option<String>,
    pub voice: String,
    pub model: String,
    pub timeout_secs: u64,
    /// How long synthesized audio stays fetchable
    pub cache_ttl_secs: u64,
    pub cache_capacity: u64,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AdminConfig {
    /// Value expected in `X-Admin-Key`; admin routes are disabled without it
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            guest_cap: DEFAULT_GUEST_CAP,
            free: MeteredTier::new(DEFAULT_FREE_LIMIT, WindowKind::CalendarDay),
            premium: MeteredTier::new(DEFAULT_PREMIUM_LIMIT, WindowKind::Rolling24h),
            utc_offset_minutes: 0,
            serialize_turns: true,
        }
    }
}

impl QuotaConfig {
    /// Validated policy table
    pub fn policy_table(&self) -> Result<TierPolicyTable, DomainError> {
        TierPolicyTable::new(self.guest_cap, self.free, self.premium)
    }

    pub fn reference_zone(&self) -> Result<ReferenceZone, DomainError> {
        ReferenceZone::from_offset_minutes(self.utc_offset_minutes)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerBackend::default(),
            directory: DirectoryBackend::default(),
            postgres_url: None,
            postgres_max_connections: 10,
            auto_migrate: true,
            redis_url: None,
            redis_key_prefix: "guidance:ledger".to_string(),
            memory_max_records: 100_000,
            seed_tiers: HashMap::new(),
        }
    }
}

impl StorageConfig {
    pub fn needs_postgres(&self) -> bool {
        self.ledger == LedgerBackend::Postgres || self.directory == DirectoryBackend::Postgres
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            max_tokens: 600,
            temperature: 0.7,
            timeout_secs: 30,
            system_prompt: "You are a warm, patient spiritual guide. Answer with compassion, \
                            draw on contemplative traditions and keep replies grounded and brief."
                .to_string(),
            max_history: 20,
        }
    }
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://localhost:8081".to_string(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "https://api.openai.com".to_string(),
            api_key: None,
            voice: "alloy".to_string(),
            model: "tts-1".to_string(),
            timeout_secs: 30,
            cache_ttl_secs: 600,
            cache_capacity: 1_000,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Allowance, Tier};

    #[test]
    fn test_defaults_build_a_valid_policy_table() {
        let config = AppConfig::default();
        let table = config.quota.policy_table().unwrap();

        assert_eq!(table.guest_cap(), 2);
        assert_eq!(table.limit_for(Tier::Free).daily_limit, Allowance::Limited(5));
        assert_eq!(table.limit_for(Tier::Premium).window_kind, WindowKind::Rolling24h);
        assert_eq!(config.quota.reference_zone().unwrap(), ReferenceZone::utc());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let raw = r#"
            [quota]
            utc_offset_minutes = -300

            [quota.premium]
            daily_limit = 20
            window_kind = "calendar-day"

            [storage]
            ledger = "redis"
            redis_url = "redis://cache:6379"
        "#;

        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.quota.premium.daily_limit, 20);
        assert_eq!(config.quota.premium.cost_per_message, 1);
        assert_eq!(config.quota.free.daily_limit, 5);
        assert_eq!(config.storage.ledger, LedgerBackend::Redis);
        assert!(!config.storage.needs_postgres());
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_invalid_premium_window_is_rejected() {
        let mut config = QuotaConfig::default();
        config.premium = MeteredTier::new(10, WindowKind::None);

        assert!(config.policy_table().is_err());
    }

    #[test]
    fn test_out_of_range_offset_is_rejected() {
        let config = QuotaConfig {
            utc_offset_minutes: 24 * 60,
            ..QuotaConfig::default()
        };

        assert!(config.reference_zone().is_err());
    }
}

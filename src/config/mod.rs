mod app_config;

pub use app_config::{
    AdminConfig, AppConfig, AuthConfig, CrmConfig, DirectoryBackend, LedgerBackend, LlmConfig,
    LogFormat, LoggingConfig, MetricsConfig, QuotaConfig, ServerConfig, StorageConfig, TtsConfig,
};

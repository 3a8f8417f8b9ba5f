//! Application state shared by all handlers

use std::sync::Arc;

use crate::domain::TierDirectory;
use crate::infrastructure::auth::JwtValidator;
use crate::infrastructure::chat::{ChatTurnService, SpeechCache};
use crate::infrastructure::quota::{QuotaEvaluator, TierResolver};

#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatTurnService>,
    pub evaluator: Arc<QuotaEvaluator>,
    pub tiers: TierResolver,
    pub directory: Arc<dyn TierDirectory>,
    pub speech: SpeechCache,
    /// Bearer token validation; without it every caller is anonymous
    pub jwt: Option<JwtValidator>,
    /// Shared secret for `/admin`; admin routes reject everything without it
    pub admin_key: Option<Arc<str>>,
    /// Published with the policy table
    pub utc_offset_minutes: i32,
}

impl AppState {
    pub fn new(
        chat: Arc<ChatTurnService>,
        evaluator: Arc<QuotaEvaluator>,
        tiers: TierResolver,
        speech: SpeechCache,
    ) -> Self {
        let directory = tiers.directory().clone();
        Self {
            chat,
            evaluator,
            tiers,
            directory,
            speech,
            jwt: None,
            admin_key: None,
            utc_offset_minutes: 0,
        }
    }

    pub fn with_jwt(mut self, jwt: JwtValidator) -> Self {
        self.jwt = Some(jwt);
        self
    }

    pub fn with_admin_key(mut self, key: impl Into<String>) -> Self {
        self.admin_key = Some(Arc::from(key.into()));
        self
    }

    pub fn with_utc_offset(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }
}

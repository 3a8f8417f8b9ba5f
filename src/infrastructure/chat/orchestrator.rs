//! Chat turn orchestration
//!
//! One turn runs: resolve tier, evaluate, and then either stop with a
//! limit-reached outcome or generate the reply, charge the quota and start
//! the side effects. The quota is charged only after a reply exists.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::side_effects::{SideEffects, TurnReport};
use super::turn_lock::TurnLocks;
use crate::domain::quota::{GuestCounterState, Identity, LimitDecision, Tier};
use crate::domain::{ConversationContext, DomainError, GeneratedReply, Message, ReplyGenerator};
use crate::infrastructure::observability::record_chat_turn;
use crate::infrastructure::quota::{Commit, QuotaEvaluator, TierResolver};

/// One chat turn as submitted by a client
#[derive(Debug, Clone)]
pub struct ChatTurnRequest {
    pub identity: Identity,
    pub message: String,
    pub history: Vec<Message>,
    /// Guest counter attached by the client; ignored for signed-in users
    pub guest: Option<GuestCounterState>,
    pub speak: bool,
}

impl ChatTurnRequest {
    pub fn new(identity: Identity, message: impl Into<String>) -> Self {
        Self {
            identity,
            message: message.into(),
            history: Vec::new(),
            guest: None,
            speak: false,
        }
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn with_guest(mut self, guest: GuestCounterState) -> Self {
        self.guest = Some(guest);
        self
    }

    pub fn with_speech(mut self, speak: bool) -> Self {
        self.speak = speak;
        self
    }
}

/// A turn that produced a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTurn {
    pub turn_id: Uuid,
    pub reply: String,
    pub model: String,
    /// Quota state after this turn was charged
    pub decision: LimitDecision,
    /// Advanced guest counter, for guest turns
    pub guest: Option<GuestCounterState>,
    /// Audio for this turn will be served under its turn id
    pub speech_pending: bool,
    /// Quota enforcement failed open for this turn
    pub degraded: bool,
}

/// Business outcome of a turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatTurnOutcome {
    Completed(CompletedTurn),
    /// Denied before generation; nothing was charged
    LimitReached(LimitDecision),
}

#[derive(Debug, Error)]
pub enum ChatTurnError {
    /// The reply could not be produced; the turn was not charged and may be retried
    #[error("Reply generation failed: {0}")]
    GenerationFailed(#[source] DomainError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Tunables of the orchestrator
#[derive(Debug, Clone)]
pub struct ChatTurnSettings {
    pub system_prompt: String,
    pub max_history: usize,
    pub generation_timeout: Duration,
}

impl Default for ChatTurnSettings {
    fn default() -> Self {
        Self {
            system_prompt: String::new(),
            max_history: 20,
            generation_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
pub struct ChatTurnService {
    evaluator: Arc<QuotaEvaluator>,
    tiers: TierResolver,
    generator: Arc<dyn ReplyGenerator>,
    locks: TurnLocks,
    side_effects: SideEffects,
    settings: ChatTurnSettings,
}

impl ChatTurnService {
    pub fn new(
        evaluator: Arc<QuotaEvaluator>,
        tiers: TierResolver,
        generator: Arc<dyn ReplyGenerator>,
    ) -> Self {
        Self {
            evaluator,
            tiers,
            generator,
            locks: TurnLocks::default(),
            side_effects: SideEffects::default(),
            settings: ChatTurnSettings::default(),
        }
    }

    pub fn with_locks(mut self, locks: TurnLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn with_side_effects(mut self, side_effects: SideEffects) -> Self {
        self.side_effects = side_effects;
        self
    }

    pub fn with_settings(mut self, settings: ChatTurnSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn side_effects(&self) -> &SideEffects {
        &self.side_effects
    }

    /// Run one chat turn
    pub async fn handle(&self, request: ChatTurnRequest) -> Result<ChatTurnOutcome, ChatTurnError> {
        let ChatTurnRequest {
            identity,
            message,
            history,
            guest,
            speak,
        } = request;

        let resolution = self.tiers.resolve(&identity).await?;
        let tier = resolution.tier;
        let guest = match tier {
            Tier::Guest => guest,
            _ => None,
        };

        let _turn = self.locks.acquire(&identity).await;

        let evaluation = if resolution.degraded {
            self.evaluator.fail_open(&identity, tier)?
        } else {
            self.evaluator.evaluate(&identity, tier, guest.as_ref()).await?
        };
        if !evaluation.decision.allowed {
            info!(
                identity = %identity.redacted(),
                tier = %tier,
                reset_time = ?evaluation.decision.reset_at,
                "Chat turn denied, limit reached"
            );
            record_chat_turn("limit_reached", tier);
            return Ok(ChatTurnOutcome::LimitReached(evaluation.decision));
        }

        let context = ConversationContext::new(message)
            .with_system_prompt(self.settings.system_prompt.clone())
            .with_history(history)
            .truncate_history(self.settings.max_history);

        let reply = match self.generate(&context).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(
                    identity = %identity.redacted(),
                    tier = %tier,
                    provider = self.generator.provider_name(),
                    error = %e,
                    "Reply generation failed, turn not charged"
                );
                record_chat_turn("generation_failed", tier);
                return Err(ChatTurnError::GenerationFailed(e));
            }
        };

        let commit = if resolution.degraded {
            Commit {
                decision: evaluation.decision.projected_after_message(),
                guest: None,
                degraded: true,
            }
        } else {
            self.evaluator
                .commit(&identity, tier, guest.as_ref(), &evaluation.decision)
                .await?
        };
        let degraded = evaluation.degraded || commit.degraded;

        let turn_id = Uuid::new_v4();
        let dispatched = self
            .side_effects
            .dispatch(TurnReport {
                turn_id,
                identity: identity.clone(),
                decision: commit.decision.clone(),
                reply: reply.content.clone(),
                speak,
            })
            .await;

        info!(
            identity = %identity.redacted(),
            tier = %tier,
            %turn_id,
            remaining = %commit.decision.remaining,
            degraded,
            "Chat turn completed"
        );
        record_chat_turn("completed", tier);

        Ok(ChatTurnOutcome::Completed(CompletedTurn {
            turn_id,
            reply: reply.content,
            model: reply.model,
            decision: commit.decision,
            guest: commit.guest,
            speech_pending: dispatched.speech,
            degraded,
        }))
    }

    async fn generate(
        &self,
        context: &ConversationContext,
    ) -> Result<GeneratedReply, DomainError> {
        let limit = self.settings.generation_timeout;

        match tokio::time::timeout(limit, self.generator.generate(context)).await {
            Ok(result) => result,
            Err(_) => Err(DomainError::timeout(
                "reply generation",
                u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
            )),
        }
    }
}

//! Post-turn collaborators (CRM sync, speech synthesis)
//!
//! Dispatched as detached tasks once a turn's decision is final. Their
//! failures are logged and counted, never reported back to the turn.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use super::speech_cache::SpeechCache;
use crate::domain::integrations::{tier_tag, EXHAUSTED_TAG};
use crate::domain::{Contact, ContactSync, Identity, LimitDecision, SpeechSynthesizer};
use crate::infrastructure::observability::record_side_effect_failure;

/// What a completed turn hands to the side effects
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub turn_id: Uuid,
    pub identity: Identity,
    pub decision: LimitDecision,
    pub reply: String,
    pub speak: bool,
}

/// Tasks started for one turn
#[derive(Debug, Default)]
pub struct Dispatched {
    pub handles: Vec<JoinHandle<()>>,
    /// Audio will be available under the turn id
    pub speech: bool,
}

#[derive(Clone, Default)]
pub struct SideEffects {
    crm: Option<Arc<dyn ContactSync>>,
    tts: Option<Arc<dyn SpeechSynthesizer>>,
    speech: SpeechCache,
}

impl std::fmt::Debug for SideEffects {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SideEffects")
            .field("crm", &self.crm.is_some())
            .field("tts", &self.tts.is_some())
            .finish()
    }
}

impl SideEffects {
    pub fn new(speech: SpeechCache) -> Self {
        Self {
            crm: None,
            tts: None,
            speech,
        }
    }

    pub fn with_crm(mut self, crm: Arc<dyn ContactSync>) -> Self {
        self.crm = Some(crm);
        self
    }

    pub fn with_tts(mut self, tts: Arc<dyn SpeechSynthesizer>) -> Self {
        self.tts = Some(tts);
        self
    }

    pub fn speech_cache(&self) -> &SpeechCache {
        &self.speech
    }

    /// Start the side effects of a completed turn
    pub async fn dispatch(&self, report: TurnReport) -> Dispatched {
        let mut dispatched = Dispatched::default();

        if let (Some(crm), Identity::Authenticated(user_id)) = (&self.crm, &report.identity) {
            let crm = crm.clone();
            let contact = Contact::new(user_id, report.decision.tier);
            let exhausted = report.decision.remaining.is_exhausted();

            dispatched.handles.push(tokio::spawn(async move {
                if let Err(e) = sync_contact(crm.as_ref(), &contact, exhausted).await {
                    warn!(error = %e, "CRM sync failed");
                    record_side_effect_failure("crm");
                }
            }));
        }

        if report.speak {
            if let Some(tts) = &self.tts {
                self.speech.mark_pending(report.turn_id).await;
                dispatched.speech = true;

                let tts = tts.clone();
                let speech = self.speech.clone();
                let turn_id = report.turn_id;
                let text = report.reply;

                dispatched.handles.push(tokio::spawn(async move {
                    match tts.synthesize(&text).await {
                        Ok(audio) => {
                            debug!(%turn_id, bytes = audio.bytes.len(), "Speech ready");
                            speech.complete(turn_id, audio).await;
                        }
                        Err(e) => {
                            warn!(%turn_id, error = %e, "Speech synthesis failed");
                            record_side_effect_failure("tts");
                            speech.fail(turn_id).await;
                        }
                    }
                }));
            }
        }

        dispatched
    }
}

async fn sync_contact(
    crm: &dyn ContactSync,
    contact: &Contact,
    exhausted: bool,
) -> Result<(), crate::domain::DomainError> {
    let contact_id = crm.upsert_contact(contact).await?;
    crm.add_tag(&contact_id, &tier_tag(contact.tier)).await?;

    if exhausted {
        crm.add_tag(&contact_id, EXHAUSTED_TAG).await?;
    }

    Ok(())
}

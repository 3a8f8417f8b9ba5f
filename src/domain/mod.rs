//! Domain layer - entities, value objects and the contracts of every
//! collaborator the quota subsystem talks to

pub mod clock;
pub mod conversation;
pub mod error;
pub mod integrations;
pub mod quota;

pub use clock::{Clock, SystemClock};
pub use conversation::{ConversationContext, GeneratedReply, Message, MessageRole, ReplyGenerator};
pub use error::DomainError;
pub use integrations::{Contact, ContactSync, SpeechAudio, SpeechSynthesizer};
pub use quota::{
    Allowance, Fingerprint, GuestCounterState, Identity, LimitDecision, Tier, TierDirectory,
    TierPolicy, TierPolicyTable, UsageLedger, UsageRecord, UserId, WindowFrame, WindowKind,
};

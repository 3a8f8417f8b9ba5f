//! Chat turn handling

mod orchestrator;
mod side_effects;
mod speech_cache;
mod turn_lock;

pub use orchestrator::{
    ChatTurnError, ChatTurnOutcome, ChatTurnRequest, ChatTurnService, ChatTurnSettings,
    CompletedTurn,
};
pub use side_effects::{Dispatched, SideEffects, TurnReport};
pub use speech_cache::{SpeechCache, SpeechEntry};
pub use turn_lock::TurnLocks;

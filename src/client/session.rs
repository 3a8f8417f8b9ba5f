//! Which quota source a client session displays
//!
//! A session shows either the local guest counter or the server's
//! ledger-backed decisions. The two are separate states and their counts
//! are never combined; signing in replaces the guest view wholesale.

use crate::domain::{Allowance, GuestCounterState, LimitDecision, Tier};

use super::presenter::{present, LimitLevel, LimitView};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaSource {
    /// Anonymous visitor counted on this client
    Guest { counter: GuestCounterState, cap: u32 },
    /// Signed-in user; `None` until the first decision arrives
    Member(Option<LimitDecision>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSession {
    source: QuotaSource,
}

impl ClientSession {
    pub fn guest(counter: GuestCounterState, cap: u32) -> Self {
        Self {
            source: QuotaSource::Guest { counter, cap },
        }
    }

    pub fn member() -> Self {
        Self {
            source: QuotaSource::Member(None),
        }
    }

    pub fn source(&self) -> &QuotaSource {
        &self.source
    }

    pub fn is_guest(&self) -> bool {
        matches!(self.source, QuotaSource::Guest { .. })
    }

    /// Switch to the ledger-backed source; the guest view is dropped
    pub fn sign_in(&mut self) {
        self.source = QuotaSource::Member(None);
    }

    /// Counter value to send with the next request, for guests only
    pub fn guest_count(&self) -> Option<u32> {
        match &self.source {
            QuotaSource::Guest { counter, .. } => Some(counter.get()),
            QuotaSource::Member(_) => None,
        }
    }

    /// Local guest counter, for persisting
    pub fn guest_counter(&self) -> Option<GuestCounterState> {
        match &self.source {
            QuotaSource::Guest { counter, .. } => Some(*counter),
            QuotaSource::Member(_) => None,
        }
    }

    /// Apply the outcome of a turn that produced a reply.
    ///
    /// A guest counts the message locally and keeps the larger of its own
    /// count and the one the server echoed, so the counter never moves
    /// backwards.
    pub fn record_turn(&mut self, decision: &LimitDecision, echoed_guest_count: Option<u32>) {
        if let QuotaSource::Guest { counter, cap } = &mut self.source {
            if decision.tier == Tier::Guest {
                counter.increment();
                if let Some(echoed) = echoed_guest_count.filter(|n| *n > counter.get()) {
                    *counter = GuestCounterState::with_count(echoed);
                }
                if let Allowance::Limited(server_cap) = decision.daily_limit {
                    *cap = server_cap;
                }
                return;
            }
        }

        self.record_decision(decision);
    }

    /// Apply a decision that did not consume anything (a query or a denial)
    pub fn record_decision(&mut self, decision: &LimitDecision) {
        if decision.tier != Tier::Guest {
            // A ledger decision means the server knows who we are
            self.source = QuotaSource::Member(Some(decision.clone()));
            return;
        }

        // Guest numbers never leak into a signed-in view
        if let QuotaSource::Guest { counter, cap } = &mut self.source {
            if let Allowance::Limited(server_cap) = decision.daily_limit {
                *cap = server_cap;
            }
            if !decision.allowed && !counter.is_exhausted(*cap) {
                *counter = GuestCounterState::with_count(*cap);
            }
        }
    }

    /// Whether the client should offer to send another message
    pub fn can_send(&self) -> bool {
        match &self.source {
            QuotaSource::Guest { counter, cap } => !counter.is_exhausted(*cap),
            QuotaSource::Member(Some(decision)) => decision.allowed,
            QuotaSource::Member(None) => true,
        }
    }

    pub fn view(&self) -> LimitView {
        match &self.source {
            QuotaSource::Guest { counter, cap } => {
                present(Allowance::Limited(counter.remaining(*cap)), Tier::Guest, None)
            }
            QuotaSource::Member(Some(decision)) => {
                present(decision.remaining, decision.tier, decision.reset_at)
            }
            QuotaSource::Member(None) => LimitView {
                level: LimitLevel::Normal,
                headline: "Signed in".to_string(),
                detail: None,
                upgrade_to: None,
            },
        }
    }
}

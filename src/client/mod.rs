//! Client side of the quota contract: the guest counter store, the limit
//! presenter, the session source state machine and an HTTP client

pub mod guest_store;
pub mod http;
pub mod presenter;
pub mod session;

pub use guest_store::{FileGuestStore, GuestCounterStore, GuestProfile, InMemoryGuestStore};
pub use http::{ChatReply, QuotaApiClient};
pub use presenter::{level_for, present, LimitLevel, LimitView};
pub use session::{ClientSession, QuotaSource};

//! Quota evaluation and tier resolution

mod evaluator;
mod tier_resolver;

pub use evaluator::{Commit, Evaluation, QuotaEvaluator};
pub use tier_resolver::{Resolution, TierResolver};

//! Quota evaluator
//!
//! Turns `(identity, tier, guest counter, now)` into a [`LimitDecision`]
//! and commits consumption after a successful turn. Every number it
//! reports comes from the pure functions on `LimitDecision`.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::domain::quota::{
    Fingerprint, GuestCounterState, Identity, LimitDecision, ReferenceZone, Tier, TierPolicyTable,
    UsageLedger, WindowFrame,
};
use crate::domain::{Clock, DomainError, SystemClock};
use crate::infrastructure::observability::{record_fail_open, record_quota_decision};

/// Result of evaluating one identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub decision: LimitDecision,
    /// The ledger could not be read and the decision was made without it
    pub degraded: bool,
}

impl Evaluation {
    fn confirmed(decision: LimitDecision) -> Self {
        Self {
            decision,
            degraded: false,
        }
    }
}

/// State after a turn was charged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub decision: LimitDecision,
    /// Advanced guest counter, for guest turns only
    pub guest: Option<GuestCounterState>,
    /// The increment was not confirmed by the ledger
    pub degraded: bool,
}

pub struct QuotaEvaluator {
    policies: TierPolicyTable,
    ledger: Arc<dyn UsageLedger>,
    zone: ReferenceZone,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for QuotaEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuotaEvaluator")
            .field("policies", &self.policies)
            .field("ledger", &self.ledger.backend_name())
            .field("zone", &self.zone)
            .finish()
    }
}

impl QuotaEvaluator {
    pub fn new(policies: TierPolicyTable, ledger: Arc<dyn UsageLedger>) -> Self {
        Self {
            policies,
            ledger,
            zone: ReferenceZone::utc(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_zone(mut self, zone: ReferenceZone) -> Self {
        self.zone = zone;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policies(&self) -> &TierPolicyTable {
        &self.policies
    }

    pub fn ledger(&self) -> &Arc<dyn UsageLedger> {
        &self.ledger
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn frame_for(&self, tier: Tier) -> Result<WindowFrame, DomainError> {
        let policy = self.policies.limit_for(tier);
        WindowFrame::at(policy.window_kind, self.clock.now(), &self.zone).ok_or_else(|| {
            DomainError::policy(format!("Tier '{}' has no accounting window", tier))
        })
    }

    /// Decide whether `identity` may send another message.
    ///
    /// Guests are judged on `guest` alone (an absent counter is a fresh
    /// one). A ledger read failure fails open and marks the evaluation as
    /// degraded; any other error is returned.
    pub async fn evaluate(
        &self,
        identity: &Identity,
        tier: Tier,
        guest: Option<&GuestCounterState>,
    ) -> Result<Evaluation, DomainError> {
        let policy = self.policies.limit_for(tier);

        let evaluation = match tier {
            Tier::Transformation => Evaluation::confirmed(LimitDecision::unlimited(tier)),
            Tier::Guest => {
                let counter = guest.copied().unwrap_or_default();
                Evaluation::confirmed(LimitDecision::for_guest(&policy, &counter))
            }
            Tier::Free | Tier::Premium => {
                let frame = self.frame_for(tier)?;

                match self.ledger.get_record(identity, &frame).await {
                    Ok(record) => Evaluation::confirmed(LimitDecision::for_ledger(
                        tier,
                        &policy,
                        record.as_ref(),
                        &frame,
                    )),
                    Err(e) if e.is_storage() => {
                        warn!(
                            identity = %identity.redacted(),
                            tier = %tier,
                            backend = self.ledger.backend_name(),
                            error = %e,
                            "Usage ledger unavailable, allowing turn"
                        );
                        record_fail_open(tier, "evaluate");

                        Evaluation {
                            decision: LimitDecision::for_ledger(tier, &policy, None, &frame),
                            degraded: true,
                        }
                    }
                    Err(e) => return Err(e),
                }
            }
        };

        debug!(
            identity = %identity.redacted(),
            tier = %tier,
            allowed = evaluation.decision.allowed,
            remaining = %evaluation.decision.remaining,
            degraded = evaluation.degraded,
            "Quota evaluated"
        );
        record_quota_decision(&evaluation.decision);

        Ok(evaluation)
    }

    /// Decision for a caller whose tier could not be confirmed.
    ///
    /// The turn is allowed and the ledger is left alone, since a record
    /// read or written under the fallback tier would be judged against the
    /// wrong limit and window.
    pub fn fail_open(&self, identity: &Identity, tier: Tier) -> Result<Evaluation, DomainError> {
        let policy = self.policies.limit_for(tier);
        let decision = match tier {
            Tier::Transformation => LimitDecision::unlimited(tier),
            Tier::Guest => LimitDecision::for_guest(&policy, &GuestCounterState::new()),
            Tier::Free | Tier::Premium => {
                LimitDecision::for_ledger(tier, &policy, None, &self.frame_for(tier)?)
            }
        };

        warn!(
            identity = %identity.redacted(),
            tier = %tier,
            "Tier unknown, allowing turn without quota check"
        );
        record_fail_open(tier, "resolve");
        record_quota_decision(&decision);

        Ok(Evaluation {
            decision,
            degraded: true,
        })
    }

    /// Charge one message to `identity` and report the resulting decision.
    ///
    /// Free and premium tiers issue exactly one ledger increment; a failed
    /// increment keeps the turn and projects the decision from `before`.
    pub async fn commit(
        &self,
        identity: &Identity,
        tier: Tier,
        guest: Option<&GuestCounterState>,
        before: &LimitDecision,
    ) -> Result<Commit, DomainError> {
        let policy = self.policies.limit_for(tier);

        match tier {
            Tier::Transformation => Ok(Commit {
                decision: LimitDecision::unlimited(tier),
                guest: None,
                degraded: false,
            }),
            Tier::Guest => {
                let mut counter = guest.copied().unwrap_or_default();
                counter.increment();

                Ok(Commit {
                    decision: LimitDecision::for_guest(&policy, &counter),
                    guest: Some(counter),
                    degraded: false,
                })
            }
            Tier::Free | Tier::Premium => {
                let frame = self.frame_for(tier)?;

                match self
                    .ledger
                    .increment(identity, tier, &frame, policy.cost_per_message)
                    .await
                {
                    Ok(record) => Ok(Commit {
                        decision: LimitDecision::for_ledger(tier, &policy, Some(&record), &frame),
                        guest: None,
                        degraded: false,
                    }),
                    Err(e) if e.is_storage() => {
                        warn!(
                            identity = %identity.redacted(),
                            tier = %tier,
                            backend = self.ledger.backend_name(),
                            error = %e,
                            "Failed to record usage, turn not charged"
                        );
                        record_fail_open(tier, "commit");

                        Ok(Commit {
                            decision: before.projected_after_message(),
                            guest: None,
                            degraded: true,
                        })
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// Probe the ledger with a read of a sentinel identity
    pub async fn probe_ledger(&self) -> Result<(), DomainError> {
        let sentinel = Identity::Anonymous(Fingerprint::new("readiness-probe")?);
        let frame = self.frame_for(Tier::Free)?;
        self.ledger.get_record(&sentinel, &frame).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::mock::ManualClock;
    use crate::domain::quota::{
        Allowance, MeteredTier, MockUsageLedger, UsageRecord, UserId, WindowKind,
    };
    use chrono::Duration;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn user(id: &str) -> Identity {
        Identity::Authenticated(UserId::new(id).unwrap())
    }

    fn evaluator(ledger: Arc<MockUsageLedger>, clock: Arc<ManualClock>) -> QuotaEvaluator {
        QuotaEvaluator::new(TierPolicyTable::default(), ledger).with_clock(clock)
    }

    #[tokio::test]
    async fn test_transformation_is_unlimited_without_ledger_read() {
        let ledger = Arc::new(MockUsageLedger::new());
        let clock = Arc::new(ManualClock::at("2026-03-10T10:00:00Z"));
        let evaluator = evaluator(ledger.clone(), clock);

        let evaluation = evaluator
            .evaluate(&user("t1"), Tier::Transformation, None)
            .await
            .unwrap();

        assert!(evaluation.decision.allowed);
        assert_eq!(evaluation.decision.remaining, Allowance::Unlimited);
        assert_eq!(evaluation.decision.reset_at, None);
        assert_eq!(ledger.reads(), 0);

        let commit = evaluator
            .commit(&user("t1"), Tier::Transformation, None, &evaluation.decision)
            .await
            .unwrap();
        assert_eq!(commit.decision.remaining, Allowance::Unlimited);
        assert_eq!(ledger.writes(), 0);
    }

    #[tokio::test]
    async fn test_below_limit_reports_remaining() {
        let clock = Arc::new(ManualClock::at("2026-03-10T10:00:00Z"));
        let ledger = Arc::new(MockUsageLedger::new().with_record(
            UsageRecord::opened("user:u1", Tier::Premium, at("2026-03-10T08:00:00Z")).with_count(4),
        ));
        let evaluator = evaluator(ledger, clock);

        let decision = evaluator
            .evaluate(&user("u1"), Tier::Premium, None)
            .await
            .unwrap()
            .decision;

        assert!(decision.allowed);
        assert_eq!(decision.remaining, Allowance::Limited(6));
        assert_eq!(decision.daily_limit, Allowance::Limited(10));
        assert_eq!(decision.reset_at, Some(at("2026-03-11T08:00:00Z")));
    }

    #[tokio::test]
    async fn test_at_limit_is_denied_and_idempotent() {
        let clock = Arc::new(ManualClock::at("2026-03-10T10:00:00Z"));
        let ledger = Arc::new(MockUsageLedger::new().with_record(
            UsageRecord::opened("user:u1", Tier::Free, at("2026-03-10T00:00:00Z")).with_count(5),
        ));
        let evaluator = evaluator(ledger.clone(), clock);

        let first = evaluator.evaluate(&user("u1"), Tier::Free, None).await.unwrap();
        let second = evaluator.evaluate(&user("u1"), Tier::Free, None).await.unwrap();

        assert!(!first.decision.allowed);
        assert_eq!(first.decision.remaining, Allowance::Limited(0));
        assert_eq!(first, second);
        assert_eq!(ledger.writes(), 0);
    }

    #[tokio::test]
    async fn test_window_rolls_over_at_exact_boundary() {
        let clock = Arc::new(ManualClock::at("2026-03-11T07:59:59Z"));
        let ledger = Arc::new(MockUsageLedger::new().with_record(
            UsageRecord::opened("user:u1", Tier::Premium, at("2026-03-10T08:00:00Z"))
                .with_count(10),
        ));
        let evaluator = evaluator(ledger, clock.clone());

        let before = evaluator.evaluate(&user("u1"), Tier::Premium, None).await.unwrap();
        assert!(!before.decision.allowed);

        clock.set("2026-03-11T08:00:00Z");
        let after = evaluator.evaluate(&user("u1"), Tier::Premium, None).await.unwrap();

        assert!(after.decision.allowed);
        assert_eq!(after.decision.remaining, Allowance::Limited(10));
        assert_eq!(after.decision.reset_at, Some(at("2026-03-12T08:00:00Z")));
    }

    #[tokio::test]
    async fn test_downgrade_to_calendar_day_starts_fresh_at_midnight() {
        let clock = Arc::new(ManualClock::at("2026-03-10T23:00:00Z"));
        let ledger = Arc::new(MockUsageLedger::new().with_record(
            UsageRecord::opened("user:u1", Tier::Premium, at("2026-03-10T15:00:00Z")).with_count(7),
        ));
        let evaluator = evaluator(ledger, clock.clone());

        let same_day = evaluator.evaluate(&user("u1"), Tier::Free, None).await.unwrap();
        assert!(!same_day.decision.allowed);
        assert_eq!(same_day.decision.reset_at, Some(at("2026-03-11T00:00:00Z")));

        clock.set("2026-03-11T00:00:00Z");
        let next_day = evaluator.evaluate(&user("u1"), Tier::Free, None).await.unwrap();

        assert!(next_day.decision.allowed);
        assert_eq!(next_day.decision.remaining, Allowance::Limited(5));
        assert_eq!(next_day.decision.reset_at, Some(at("2026-03-12T00:00:00Z")));
    }

    #[tokio::test]
    async fn test_guest_decisions_come_from_counter() {
        let clock = Arc::new(ManualClock::at("2026-03-10T10:00:00Z"));
        let ledger = Arc::new(MockUsageLedger::new());
        let evaluator = evaluator(ledger.clone(), clock);
        let guest = Identity::Anonymous(Fingerprint::new("fp-1").unwrap());

        let fresh = evaluator.evaluate(&guest, Tier::Guest, None).await.unwrap();
        assert_eq!(fresh.decision.remaining, Allowance::Limited(2));
        assert_eq!(fresh.decision.reset_at, None);

        let commit = evaluator
            .commit(&guest, Tier::Guest, Some(&GuestCounterState::with_count(1)), &fresh.decision)
            .await
            .unwrap();
        assert_eq!(commit.guest, Some(GuestCounterState::with_count(2)));
        assert!(!commit.decision.allowed);

        let exhausted = evaluator
            .evaluate(&guest, Tier::Guest, Some(&GuestCounterState::with_count(3)))
            .await
            .unwrap();
        assert!(!exhausted.decision.allowed);
        assert_eq!(exhausted.decision.remaining, Allowance::Limited(0));

        assert_eq!(ledger.reads(), 0);
        assert_eq!(ledger.writes(), 0);
    }

    #[tokio::test]
    async fn test_commit_reports_post_increment_state() {
        let clock = Arc::new(ManualClock::at("2026-03-10T10:00:00Z"));
        let ledger = Arc::new(MockUsageLedger::new());
        let evaluator = evaluator(ledger.clone(), clock);

        let evaluation = evaluator.evaluate(&user("u1"), Tier::Free, None).await.unwrap();
        let commit = evaluator
            .commit(&user("u1"), Tier::Free, None, &evaluation.decision)
            .await
            .unwrap();

        assert_eq!(commit.decision.remaining, Allowance::Limited(4));
        assert_eq!(commit.decision.reset_at, Some(at("2026-03-11T00:00:00Z")));
        assert_eq!(ledger.writes(), 1);

        let again = evaluator.evaluate(&user("u1"), Tier::Free, None).await.unwrap();
        assert_eq!(again.decision, commit.decision);
    }

    #[tokio::test]
    async fn test_read_failure_fails_open() {
        let clock = Arc::new(ManualClock::at("2026-03-10T10:00:00Z"));
        let ledger = Arc::new(MockUsageLedger::new().failing_reads());
        let evaluator = evaluator(ledger, clock);

        let evaluation = evaluator.evaluate(&user("u1"), Tier::Free, None).await.unwrap();

        assert!(evaluation.degraded);
        assert!(evaluation.decision.allowed);
        assert_eq!(evaluation.decision.remaining, Allowance::Limited(5));
    }

    #[tokio::test]
    async fn test_write_failure_projects_decision() {
        let clock = Arc::new(ManualClock::at("2026-03-10T10:00:00Z"));
        let ledger = Arc::new(MockUsageLedger::new().failing_writes());
        let evaluator = evaluator(ledger, clock);

        let evaluation = evaluator.evaluate(&user("u1"), Tier::Premium, None).await.unwrap();
        let commit = evaluator
            .commit(&user("u1"), Tier::Premium, None, &evaluation.decision)
            .await
            .unwrap();

        assert!(commit.degraded);
        assert_eq!(commit.decision.remaining, Allowance::Limited(9));
    }

    #[tokio::test]
    async fn test_cost_per_message_counts_units() {
        let clock = Arc::new(ManualClock::at("2026-03-10T10:00:00Z"));
        let ledger = Arc::new(MockUsageLedger::new());
        let table = TierPolicyTable::new(
            2,
            MeteredTier::new(10, WindowKind::CalendarDay).with_cost_per_message(2),
            MeteredTier::new(10, WindowKind::Rolling24h),
        )
        .unwrap();
        let evaluator = QuotaEvaluator::new(table, ledger.clone()).with_clock(clock);

        let evaluation = evaluator.evaluate(&user("u1"), Tier::Free, None).await.unwrap();
        assert_eq!(evaluation.decision.remaining, Allowance::Limited(5));

        let commit = evaluator
            .commit(&user("u1"), Tier::Free, None, &evaluation.decision)
            .await
            .unwrap();
        assert_eq!(commit.decision.remaining, Allowance::Limited(4));
        assert_eq!(ledger.stored(&user("u1")).unwrap().count, 2);
    }

    #[tokio::test]
    async fn test_reference_zone_moves_midnight() {
        let clock = Arc::new(ManualClock::at("2026-03-10T03:00:00Z"));
        let ledger = Arc::new(MockUsageLedger::new());
        let evaluator = evaluator(ledger, clock.clone())
            .with_zone(ReferenceZone::from_offset_minutes(-300).unwrap());

        let decision = evaluator
            .evaluate(&user("u1"), Tier::Free, None)
            .await
            .unwrap()
            .decision;

        // 03:00Z is 22:00 the previous evening at UTC-05:00
        assert_eq!(decision.reset_at, Some(at("2026-03-10T05:00:00Z")));

        clock.advance(Duration::hours(3));
        let decision = evaluator
            .evaluate(&user("u1"), Tier::Free, None)
            .await
            .unwrap()
            .decision;
        assert_eq!(decision.reset_at, Some(at("2026-03-11T05:00:00Z")));
    }

    #[tokio::test]
    async fn test_unknown_tier_fails_open_without_ledger_access() {
        let clock = Arc::new(ManualClock::at("2026-03-10T10:00:00Z"));
        let ledger = Arc::new(MockUsageLedger::new().with_record(
            UsageRecord::opened("user:u1", Tier::Premium, at("2026-03-10T08:00:00Z")).with_count(9),
        ));
        let evaluator = evaluator(ledger.clone(), clock);

        let evaluation = evaluator.fail_open(&user("u1"), Tier::Free).unwrap();

        assert!(evaluation.degraded);
        assert!(evaluation.decision.allowed);
        assert_eq!(evaluation.decision.remaining, Allowance::Limited(5));
        assert_eq!(ledger.reads(), 0);
        assert_eq!(ledger.writes(), 0);
    }

    #[tokio::test]
    async fn test_probe_ledger() {
        let clock = Arc::new(ManualClock::at("2026-03-10T10:00:00Z"));
        let ledger = Arc::new(MockUsageLedger::new());
        let evaluator = evaluator(ledger.clone(), clock);

        assert!(evaluator.probe_ledger().await.is_ok());

        ledger.set_failing(true);
        assert!(evaluator.probe_ledger().await.is_err());
    }
}

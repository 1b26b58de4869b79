//! Roll use cases.
//!
//! The flow is:
//! 1. A player declares a check (and optionally a mode) and submits a context
//! 2. PerformRoll reserves the mode's upfront cost, resolves the check
//!    through the session's ruleset and journals the result
//! 3. If an escalation gate was offered, the roll waits in the pending store
//! 4. ResolveEscalation confirms (stake reserved, bonus roll, stake handed
//!    back on success) or declines (nothing staked)
//!
//! Stakes are taken from the resource store in one atomic step before any
//! die is drawn, so a roll that drew dice is never thrown away over a
//! balance raced away by another action.

mod journal;

use std::sync::Arc;

use serde::Serialize;
use vttdice_domain::{
    CharacterId, DeclaredMode, EscalationError, EscalationFlow, EscalationGate,
    ResourceAdjustment, RollContext, RollError, RollHistoryRecord, RollId, RollPhase, RollReport,
    RulesetRegistry,
};

pub use journal::RollJournal;

use crate::infrastructure::ports::{ClockPort, RandomPort, RepoError, ResourceRepo, RollEvent};
use crate::stores::{PendingEscalation, PendingEscalationStore};

/// Resource name reported when a stake cannot be covered.
const RESOURCE_NAME: &str = "saga points";

/// Container for roll use cases.
pub struct RollUseCases {
    pub perform: Arc<PerformRoll>,
    pub escalation: Arc<ResolveEscalation>,
}

impl RollUseCases {
    pub fn new(perform: Arc<PerformRoll>, escalation: Arc<ResolveEscalation>) -> Self {
        Self {
            perform,
            escalation,
        }
    }
}

/// Where a roll action stands after a use case ran.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollOutcome {
    pub roll_id: RollId,
    pub phase: RollPhase,
    pub report: RollReport,
    /// Gate waiting on a decision, if any
    pub escalation: Option<EscalationGate>,
    /// Resource balance after an adjustment was applied
    pub balance: Option<u32>,
}

/// Shared collaborators of the roll use cases.
#[derive(Clone)]
pub struct RollDeps {
    pub registry: Arc<RulesetRegistry>,
    pub resources: Arc<dyn ResourceRepo>,
    pub pending: Arc<PendingEscalationStore>,
    pub clock: Arc<dyn ClockPort>,
    pub random: Arc<dyn RandomPort>,
    /// Ordered background persistence and broadcast
    pub journal: RollJournal,
}

/// Resource taken from the store ahead of a draw.
#[derive(Debug, Clone, Copy)]
struct Stake {
    amount: u32,
    /// Balance right after the stake was taken
    balance: u32,
}

impl RollDeps {
    /// Take `amount` in one atomic step. An uncovered stake becomes an
    /// insufficient-resource rejection.
    async fn reserve(
        &self,
        character_id: CharacterId,
        amount: u32,
        mode: DeclaredMode,
    ) -> Result<Stake, RollUseCaseError> {
        match self.resources.adjust(character_id, -i64::from(amount)).await {
            Ok(balance) => Ok(Stake { amount, balance }),
            Err(RepoError::Insufficient {
                requested,
                available,
            }) => Err(RollError::insufficient_resource(
                RESOURCE_NAME,
                mode.as_str(),
                requested,
                available,
            )
            .into()),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply what is left of an adjustment once `stake` is accounted for.
    ///
    /// Runs after dice were drawn, so a failure is logged and the drawn roll
    /// stands.
    async fn settle_stake(
        &self,
        character_id: CharacterId,
        adjustment: ResourceAdjustment,
        stake: Option<Stake>,
    ) -> Option<u32> {
        let staked = stake.map(|s| i64::from(s.amount)).unwrap_or(0);
        match adjustment.delta() + staked {
            0 => stake.map(|s| s.balance),
            delta => match self.resources.adjust(character_id, delta).await {
                Ok(balance) => Some(balance),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        character_id = %character_id,
                        delta,
                        "Failed to settle resource stake"
                    );
                    stake.map(|s| s.balance)
                }
            },
        }
    }

    /// Hand a stake back after a rejected roll.
    async fn refund(&self, character_id: CharacterId, stake: Option<Stake>) {
        let Some(stake) = stake else {
            return;
        };
        if let Err(e) = self
            .resources
            .adjust(character_id, i64::from(stake.amount))
            .await
        {
            tracing::warn!(
                error = %e,
                character_id = %character_id,
                amount = stake.amount,
                "Failed to refund resource stake"
            );
        }
    }
}

/// Resolve one declared check.
pub struct PerformRoll {
    deps: RollDeps,
}

impl PerformRoll {
    pub fn new(deps: RollDeps) -> Self {
        Self { deps }
    }

    pub async fn execute(&self, mut ctx: RollContext) -> Result<RollOutcome, RollUseCaseError> {
        let ruleset = self
            .deps
            .registry
            .get(&ctx.system_slug)
            .ok_or_else(|| RollUseCaseError::UnknownRuleset(ctx.system_slug.clone()))?;

        let character_id = ctx.character_id;
        let mode = ctx.declared_mode;
        let mut flow = EscalationFlow::new(mode);
        flow.start()?;

        // The resource store owns the balance; never trust the client's copy
        let stake = match ruleset.upfront_cost(mode) {
            0 => {
                ctx.character.saga_points = self.deps.resources.get(character_id).await?;
                None
            }
            cost => {
                let stake = self.deps.reserve(character_id, cost, mode).await?;
                ctx.character.saga_points = stake.balance.saturating_add(stake.amount);
                Some(stake)
            }
        };

        let rolled = {
            let random = &self.deps.random;
            let mut roll_die = |min: u32, max: u32| random.gen_range(min, max);
            ruleset.roll_for_mode(ctx, &mut roll_die)
        };
        let report = match rolled {
            Ok(report) => report,
            Err(e) => {
                self.deps.refund(character_id, stake).await;
                return Err(e.into());
            }
        };

        let adjustment = flow.resolve(&report.result)?;
        let balance = self
            .deps
            .settle_stake(character_id, adjustment, stake)
            .await;

        let roll_id = RollId::from_uuid(self.deps.random.gen_uuid());
        let now = self.deps.clock.now();
        let record = RollHistoryRecord::new(
            roll_id,
            &report.context,
            &report.params,
            report.notation.clone(),
            report.result.clone(),
            now,
        );

        tracing::info!(
            roll_id = %roll_id,
            character = %report.context.character_name,
            ruleset = %report.context.system_slug,
            mode = %report.context.declared_mode,
            notation = %report.notation,
            successes = report.result.successes,
            phase = ?flow.phase(),
            "Roll resolved"
        );

        let mut events = vec![RollEvent::Resolved {
            roll_id,
            character_name: report.context.character_name.clone(),
            label: report.context.label.clone(),
            notation: report.notation.clone(),
            result: report.result.clone(),
            animation: report.animation.clone(),
        }];

        if let (RollPhase::AwaitingDecision, Some(gate)) = (flow.phase(), flow.gate()) {
            events.push(RollEvent::EscalationOffered { roll_id, gate });
            self.deps
                .pending
                .insert(PendingEscalation {
                    roll_id,
                    report: report.clone(),
                    flow: flow.clone(),
                    record: record.clone(),
                    created_at: now,
                })
                .await;
        }

        self.deps
            .journal
            .submit(report.context.session_id, Some(record), events);

        Ok(RollOutcome {
            roll_id,
            phase: flow.phase(),
            report,
            escalation: flow.gate(),
            balance,
        })
    }
}

/// Settle a pending escalation.
pub struct ResolveEscalation {
    deps: RollDeps,
}

impl ResolveEscalation {
    pub fn new(deps: RollDeps) -> Self {
        Self { deps }
    }

    /// Accept the stake and roll the bonus pool.
    ///
    /// Precondition failures leave the escalation pending.
    pub async fn confirm(&self, roll_id: RollId) -> Result<RollOutcome, RollUseCaseError> {
        let pending = self
            .deps
            .pending
            .remove(roll_id)
            .await
            .ok_or(RollUseCaseError::NoPendingEscalation(roll_id))?;

        match self.roll_bonus(&pending).await {
            Ok((flow, report, stake)) => self.settle(pending, flow, report, stake).await,
            Err(e) => {
                self.deps.pending.insert(pending).await;
                Err(e)
            }
        }
    }

    async fn roll_bonus(
        &self,
        pending: &PendingEscalation,
    ) -> Result<(EscalationFlow, RollReport, Stake), RollUseCaseError> {
        let base = &pending.report;
        let character_id = base.context.character_id;
        let ruleset = self
            .deps
            .registry
            .get(&base.context.system_slug)
            .ok_or_else(|| RollUseCaseError::UnknownRuleset(base.context.system_slug.clone()))?;

        let mut flow = pending.flow.clone();
        let gate = flow.confirm()?;
        let stake = self
            .deps
            .reserve(character_id, gate.resource_cost, flow.mode())
            .await?;

        let rolled = {
            let random = &self.deps.random;
            let mut roll_die = |min: u32, max: u32| random.gen_range(min, max);
            ruleset.roll_saga_bonus(
                &base.result,
                &base.context,
                gate.final_target,
                &mut roll_die,
            )
        };

        match rolled {
            Ok(report) => Ok((flow, report, stake)),
            Err(e) => {
                self.deps.refund(character_id, Some(stake)).await;
                Err(e.into())
            }
        }
    }

    async fn settle(
        &self,
        pending: PendingEscalation,
        mut flow: EscalationFlow,
        mut report: RollReport,
        stake: Stake,
    ) -> Result<RollOutcome, RollUseCaseError> {
        let roll_id = pending.roll_id;
        let adjustment = flow.finish_bonus(&report.result)?;
        if let ResourceAdjustment::Spend(n) = adjustment {
            report.result.meta.resource_spent += n;
        }
        // A successful bonus hands the stake back
        let balance = self
            .deps
            .settle_stake(report.context.character_id, adjustment, Some(stake))
            .await;

        tracing::info!(
            roll_id = %roll_id,
            character = %report.context.character_name,
            successes = report.result.successes,
            saga_success = ?report.result.meta.saga_success,
            fail_reason = ?report.result.meta.fail_reason,
            "Escalation settled"
        );

        let record = pending.record.with_result(report.result.clone());
        let event = RollEvent::EscalationSettled {
            roll_id,
            result: report.result.clone(),
            animation: report.animation.clone(),
        };
        self.deps
            .journal
            .submit(report.context.session_id, Some(record), vec![event]);

        Ok(RollOutcome {
            roll_id,
            phase: flow.phase(),
            report,
            escalation: None,
            balance,
        })
    }

    /// Walk away from the gate. Nothing is staked, the base roll stands.
    pub async fn decline(&self, roll_id: RollId) -> Result<RollOutcome, RollUseCaseError> {
        let mut pending = self
            .deps
            .pending
            .remove(roll_id)
            .await
            .ok_or(RollUseCaseError::NoPendingEscalation(roll_id))?;

        let adjustment = pending.flow.decline()?;
        let balance = self
            .deps
            .settle_stake(pending.report.context.character_id, adjustment, None)
            .await;

        tracing::info!(roll_id = %roll_id, "Escalation declined");

        self.deps.journal.submit(
            pending.session_id(),
            None,
            vec![RollEvent::EscalationDeclined { roll_id }],
        );

        Ok(RollOutcome {
            roll_id,
            phase: pending.flow.phase(),
            report: pending.report,
            escalation: None,
            balance,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RollUseCaseError {
    #[error(transparent)]
    Roll(#[from] RollError),
    #[error("Unknown ruleset: {0}")]
    UnknownRuleset(String),
    #[error("No escalation pending for roll {0}")]
    NoPendingEscalation(RollId),
    #[error("Escalation error: {0}")]
    Escalation(#[from] EscalationError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl RollUseCaseError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Roll(e) => e.code(),
            Self::UnknownRuleset(_) => "unknown_ruleset",
            Self::NoPendingEscalation(_) => "no_pending_escalation",
            Self::Escalation(_) => "invalid_transition",
            Self::Repo(_) => "repository",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use chrono::Utc;
    use tokio_util::task::TaskTracker;
    use vttdice_domain::{CharacterSnapshot, Outcome, SessionId};

    use super::*;
    use crate::infrastructure::clock::{FixedClock, ScriptedRandom};
    use crate::infrastructure::ports::{
        MockResourceRepo, MockRollBroadcastPort, MockRollHistoryRepo, RollHistoryRepo,
    };
    use crate::infrastructure::resources::InMemoryResourceRepo;

    struct Harness {
        roll: RollUseCases,
        pending: Arc<PendingEscalationStore>,
        random: Arc<ScriptedRandom>,
        journal: RollJournal,
        tasks: TaskTracker,
        saved: Arc<Mutex<Vec<RollHistoryRecord>>>,
        events: Arc<Mutex<Vec<RollEvent>>>,
    }

    fn recording_history() -> (MockRollHistoryRepo, Arc<Mutex<Vec<RollHistoryRecord>>>) {
        let saved = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&saved);
        let mut history = MockRollHistoryRepo::new();
        history.expect_save().returning(move |record| {
            sink.lock().unwrap().push(record.clone());
            Ok(())
        });
        (history, saved)
    }

    fn harness(
        history: impl RollHistoryRepo + 'static,
        saved: Arc<Mutex<Vec<RollHistoryRecord>>>,
        resources: impl ResourceRepo + 'static,
        faces: Vec<u32>,
    ) -> Harness {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let mut broadcast = MockRollBroadcastPort::new();
        broadcast.expect_publish().returning(move |_, event| {
            sink.lock().unwrap().push(event);
            Ok(())
        });

        let pending = Arc::new(PendingEscalationStore::new());
        let random = Arc::new(ScriptedRandom::new(faces));
        let tasks = TaskTracker::new();
        let journal = RollJournal::spawn(Arc::new(history), Arc::new(broadcast), &tasks);
        let deps = RollDeps {
            registry: Arc::new(RulesetRegistry::new()),
            resources: Arc::new(resources),
            pending: Arc::clone(&pending),
            clock: Arc::new(FixedClock(Utc::now())),
            random: random.clone(),
            journal: journal.clone(),
        };

        Harness {
            roll: RollUseCases::new(
                Arc::new(PerformRoll::new(deps.clone())),
                Arc::new(ResolveEscalation::new(deps)),
            ),
            pending,
            random,
            journal,
            tasks,
            saved,
            events,
        }
    }

    impl Harness {
        /// Drain the journal. Call once, after the last action.
        async fn settle(&self) {
            self.journal.close();
            self.tasks.close();
            self.tasks.wait().await;
        }
    }

    fn resources(balance: u32) -> MockResourceRepo {
        let mut resources = MockResourceRepo::new();
        resources.expect_get().returning(move |_| Ok(balance));
        resources
    }

    fn insufficient(requested: u32, available: u32) -> RepoError {
        RepoError::Insufficient {
            requested,
            available,
        }
    }

    /// Pool of 3, explodes on 10, succeeds on 7+.
    fn saga_ctx(mode: DeclaredMode) -> RollContext {
        RollContext::new(CharacterId::new(), "Ragna", SessionId::new(), "saga")
            .with_label("Wits + Craft")
            .with_mode(mode)
            .with_character(CharacterSnapshot {
                ability: 2,
                skill: 1,
                ability_tier: 1,
                ..CharacterSnapshot::default()
            })
    }

    #[tokio::test]
    async fn plain_roll_persists_and_broadcasts() {
        let (history, saved) = recording_history();
        let mut resources = resources(2);
        resources.expect_adjust().never();
        let h = harness(history, saved, resources, vec![8, 7, 3]);

        let outcome = h
            .roll
            .perform
            .execute(saga_ctx(DeclaredMode::None).with_target(2))
            .await
            .unwrap();
        h.settle().await;

        assert_eq!(outcome.phase, RollPhase::Resolved);
        assert_eq!(outcome.report.result.successes, 2);
        assert_eq!(outcome.report.result.outcome, Some(Outcome::Success));
        assert_eq!(outcome.balance, None);

        let saved = h.saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].roll_id, outcome.roll_id);
        assert_eq!(saved[0].notation, "3d10!>=10>=7");
        assert_eq!(saved[0].legacy.results, vec![8, 7, 3]);

        let events = h.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], RollEvent::Resolved { .. }));
    }

    #[tokio::test]
    async fn insurance_reserves_stake_once() {
        let (history, saved) = recording_history();
        let mut resources = MockResourceRepo::new();
        resources.expect_get().never();
        resources
            .expect_adjust()
            .withf(|_, delta| *delta == -1)
            .times(1)
            .returning(|_, _| Ok(1));
        let h = harness(history, saved, resources, vec![2, 3, 4, 8, 8, 1]);

        let outcome = h
            .roll
            .perform
            .execute(saga_ctx(DeclaredMode::Insurance))
            .await
            .unwrap();

        assert_eq!(outcome.report.result.successes, 2);
        assert_eq!(outcome.report.result.meta.kept_roll, Some(2));
        assert_eq!(outcome.report.result.meta.resource_spent, 1);
        assert_eq!(outcome.report.context.character.saga_points, 2);
        assert_eq!(outcome.balance, Some(1));
        assert_eq!(outcome.report.animation.mode(), "insurance");
    }

    #[tokio::test]
    async fn insufficient_points_draw_no_dice() {
        let mut history = MockRollHistoryRepo::new();
        history.expect_save().never();
        let mut resources = MockResourceRepo::new();
        resources
            .expect_adjust()
            .times(1)
            .returning(|_, _| Err(insufficient(1, 0)));
        let h = harness(history, Arc::default(), resources, vec![8, 8, 8]);

        let err = h
            .roll
            .perform
            .execute(saga_ctx(DeclaredMode::Insurance))
            .await
            .unwrap_err();
        h.settle().await;

        assert!(matches!(
            err,
            RollUseCaseError::Roll(RollError::InsufficientResource {
                needed: 1,
                available: 0,
                ..
            })
        ));
        assert_eq!(err.code(), "insufficient_resource");
        assert_eq!(h.random.remaining(), 3);
        assert!(h.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_roll_refunds_the_stake() {
        let mut history = MockRollHistoryRepo::new();
        history.expect_save().never();
        let mut resources = MockResourceRepo::new();
        resources
            .expect_adjust()
            .withf(|_, delta| *delta == -1)
            .times(1)
            .returning(|_, _| Ok(0));
        resources
            .expect_adjust()
            .withf(|_, delta| *delta == 1)
            .times(1)
            .returning(|_, _| Ok(1));
        let h = harness(history, Arc::default(), resources, vec![8, 8, 8]);

        let mut ctx = saga_ctx(DeclaredMode::Insurance);
        ctx.character.incapacitated = true;
        let err = h.roll.perform.execute(ctx).await.unwrap_err();

        assert_eq!(err.code(), "incapacitated");
        assert_eq!(h.random.remaining(), 3);
    }

    #[tokio::test]
    async fn client_balance_is_overridden_by_store() {
        let (history, saved) = recording_history();
        let mut resources = resources(0);
        resources.expect_adjust().never();
        let h = harness(history, saved, resources, vec![8, 8, 8]);

        let mut ctx = saga_ctx(DeclaredMode::EscalatingTierA);
        ctx.character.saga_points = 5;
        let err = h.roll.perform.execute(ctx).await.unwrap_err();

        assert!(matches!(
            err,
            RollUseCaseError::Roll(RollError::InsufficientResource { available: 0, .. })
        ));
        assert_eq!(h.random.remaining(), 3);
    }

    #[tokio::test]
    async fn unknown_ruleset_is_rejected() {
        let (history, saved) = recording_history();
        let h = harness(history, saved, resources(1), vec![]);

        let mut ctx = saga_ctx(DeclaredMode::None);
        ctx.system_slug = "nope".to_string();
        let err = h.roll.perform.execute(ctx).await.unwrap_err();

        assert!(matches!(err, RollUseCaseError::UnknownRuleset(slug) if slug == "nope"));
    }

    #[tokio::test]
    async fn persistence_failure_does_not_fail_roll() {
        let mut history = MockRollHistoryRepo::new();
        history
            .expect_save()
            .returning(|_| Err(RepoError::database("roll_history_save", "disk full")));
        let h = harness(history, Arc::default(), resources(0), vec![8, 2, 2]);

        let outcome = h
            .roll
            .perform
            .execute(saga_ctx(DeclaredMode::None))
            .await
            .unwrap();
        h.settle().await;

        assert_eq!(outcome.report.result.successes, 1);
        assert_eq!(h.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn escalation_success_hands_the_stake_back() {
        let (history, saved) = recording_history();
        let mut resources = resources(1);
        resources
            .expect_adjust()
            .withf(|_, delta| *delta == -1)
            .times(1)
            .returning(|_, _| Ok(0));
        resources
            .expect_adjust()
            .withf(|_, delta| *delta == 1)
            .times(1)
            .returning(|_, _| Ok(1));
        // base 8,8,8 -> 3 successes, bonus 7,2 -> combined 4
        let h = harness(history, saved, resources, vec![8, 8, 8, 7, 2]);

        let offered = h
            .roll
            .perform
            .execute(saga_ctx(DeclaredMode::EscalatingTierA))
            .await
            .unwrap();
        assert_eq!(offered.phase, RollPhase::AwaitingDecision);
        assert_eq!(
            offered.escalation,
            Some(EscalationGate {
                final_target: 4,
                resource_cost: 1,
            })
        );
        assert_eq!(h.pending.len().await, 1);

        let settled = h.roll.escalation.confirm(offered.roll_id).await.unwrap();
        h.settle().await;

        assert_eq!(settled.phase, RollPhase::Final);
        assert_eq!(settled.report.result.meta.saga_success, Some(true));
        assert_eq!(settled.report.result.meta.resource_spent, 0);
        assert_eq!(settled.report.result.all_dice, vec![8, 8, 8, 7, 2]);
        assert_eq!(settled.balance, Some(1));
        assert!(h.pending.is_empty().await);

        let saved = h.saved.lock().unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[1].roll_id, offered.roll_id);
        assert_eq!(saved[1].legacy.results, vec![8, 8, 8, 7, 2]);

        let events = h.events.lock().unwrap();
        assert!(matches!(events[1], RollEvent::EscalationOffered { .. }));
        assert!(matches!(events[2], RollEvent::EscalationSettled { .. }));
    }

    #[tokio::test]
    async fn escalation_failure_loses_the_stake() {
        let (history, saved) = recording_history();
        let mut resources = resources(1);
        resources
            .expect_adjust()
            .withf(|_, delta| *delta == -1)
            .times(1)
            .returning(|_, _| Ok(0));
        resources
            .expect_adjust()
            .withf(|_, delta| *delta == 1)
            .never();
        let h = harness(history, saved, resources, vec![8, 8, 8, 2, 3]);

        let offered = h
            .roll
            .perform
            .execute(saga_ctx(DeclaredMode::EscalatingTierA))
            .await
            .unwrap();
        let settled = h.roll.escalation.confirm(offered.roll_id).await.unwrap();

        assert_eq!(settled.report.result.meta.saga_success, Some(false));
        assert_eq!(
            settled.report.result.meta.fail_reason.as_deref(),
            Some("no bonus-roll success")
        );
        assert_eq!(settled.report.result.meta.resource_spent, 1);
        assert_eq!(settled.balance, Some(0));
    }

    #[tokio::test]
    async fn confirm_without_points_stays_pending() {
        let (history, saved) = recording_history();
        let mut resources = resources(1);
        resources
            .expect_adjust()
            .times(1)
            .returning(|_, _| Err(insufficient(1, 0)));
        let h = harness(history, saved, resources, vec![8, 8, 8, 7, 7]);

        let offered = h
            .roll
            .perform
            .execute(saga_ctx(DeclaredMode::EscalatingTierB))
            .await
            .unwrap();
        let err = h.roll.escalation.confirm(offered.roll_id).await.unwrap_err();

        assert_eq!(err.code(), "insufficient_resource");
        assert_eq!(h.random.remaining(), 2);
        assert!(h.pending.get(offered.roll_id).await.is_some());
    }

    #[tokio::test]
    async fn decline_costs_nothing_and_consumes_entry() {
        let (history, saved) = recording_history();
        let mut resources = resources(1);
        resources.expect_adjust().never();
        let h = harness(history, saved, resources, vec![9, 8, 7]);

        let offered = h
            .roll
            .perform
            .execute(saga_ctx(DeclaredMode::EscalatingTierA))
            .await
            .unwrap();
        let declined = h.roll.escalation.decline(offered.roll_id).await.unwrap();
        let err = h.roll.escalation.decline(offered.roll_id).await.unwrap_err();
        h.settle().await;

        assert_eq!(declined.phase, RollPhase::Declined);
        assert_eq!(declined.report.result.successes, 3);
        assert_eq!(declined.balance, None);
        assert!(matches!(
            h.events.lock().unwrap().last(),
            Some(RollEvent::EscalationDeclined { .. })
        ));
        assert!(matches!(err, RollUseCaseError::NoPendingEscalation(id) if id == offered.roll_id));
    }

    #[tokio::test]
    async fn below_gate_resolves_without_offer() {
        let (history, saved) = recording_history();
        let h = harness(history, saved, resources(1), vec![8, 8, 2]);

        let outcome = h
            .roll
            .perform
            .execute(saga_ctx(DeclaredMode::EscalatingTierA))
            .await
            .unwrap();

        assert_eq!(outcome.phase, RollPhase::Resolved);
        assert_eq!(outcome.escalation, None);
        assert!(h.pending.is_empty().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn settled_record_lands_after_slow_base_write() {
        let saved = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&saved);
        let mut history = MockRollHistoryRepo::new();
        history.expect_save().returning(move |record: &RollHistoryRecord| {
            if record.result.meta.bonus_roll.is_none() {
                std::thread::sleep(Duration::from_millis(30));
            }
            sink.lock().unwrap().push(record.clone());
            Ok(())
        });
        let mut resources = resources(1);
        resources.expect_adjust().returning(|_, delta| Ok((1 + delta) as u32));
        let h = harness(history, saved, resources, vec![8, 8, 8, 7, 2]);

        let offered = h
            .roll
            .perform
            .execute(saga_ctx(DeclaredMode::EscalatingTierA))
            .await
            .unwrap();
        let settled = h.roll.escalation.confirm(offered.roll_id).await.unwrap();
        h.settle().await;

        let saved = h.saved.lock().unwrap();
        let stored = saved
            .iter()
            .rev()
            .find(|r| r.roll_id == offered.roll_id)
            .unwrap();
        assert_eq!(stored.result.all_dice, settled.report.result.all_dice);
        assert_eq!(stored.result.meta.bonus_roll, Some(vec![7, 2]));
        assert_eq!(stored.result.meta.saga_success, Some(true));

        let events = h.events.lock().unwrap();
        assert!(matches!(events[0], RollEvent::Resolved { .. }));
        assert!(matches!(events[1], RollEvent::EscalationOffered { .. }));
        assert!(matches!(events[2], RollEvent::EscalationSettled { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_insurance_never_discards_drawn_dice() {
        for _ in 0..20 {
            let (history, saved) = recording_history();
            let character = CharacterId::new();
            let resources = InMemoryResourceRepo::with_balances([(character, 1)]);
            let h = harness(history, saved, resources, vec![8; 12]);

            let mut ctx = saga_ctx(DeclaredMode::Insurance);
            ctx.character_id = character;
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let perform = Arc::clone(&h.roll.perform);
                    let ctx = ctx.clone();
                    tokio::spawn(async move { perform.execute(ctx).await })
                })
                .collect();

            let mut rolled = 0;
            for handle in handles {
                match handle.await.unwrap() {
                    Ok(outcome) => {
                        assert_eq!(outcome.balance, Some(0));
                        rolled += 1;
                    }
                    Err(e) => assert_eq!(e.code(), "insufficient_resource"),
                }
            }
            h.settle().await;

            assert_eq!(rolled, 1);
            assert_eq!(h.random.remaining(), 6);
            assert_eq!(h.saved.lock().unwrap().len(), 1);
        }
    }
}

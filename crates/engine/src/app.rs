//! Application state and composition.

use std::sync::Arc;

use tokio_util::task::TaskTracker;
use vttdice_domain::RulesetRegistry;

use crate::config::EngineConfig;
use crate::infrastructure::{
    broadcast::ChannelBroadcaster,
    clock::{SystemClock, SystemRandom},
    ports::{ClockPort, RandomPort, RepoError, ResourceRepo, RollBroadcastPort, RollHistoryRepo},
    resources::InMemoryResourceRepo,
    roll_history::SqliteRollHistoryRepo,
};
use crate::stores::PendingEscalationStore;
use crate::use_cases;
use crate::use_cases::playback::AnimationPlayer;
use crate::use_cases::roll::{RollDeps, RollJournal};

/// Main application state.
///
/// Holds the ruleset registry, port implementations, stores and use cases.
pub struct App {
    pub config: EngineConfig,
    pub registry: Arc<RulesetRegistry>,
    pub repositories: Repositories,
    /// Per-session roll event channels
    pub sessions: Arc<ChannelBroadcaster>,
    pub pending: Arc<PendingEscalationStore>,
    pub player: AnimationPlayer,
    pub use_cases: UseCases,
    journal: RollJournal,
    tasks: TaskTracker,
}

/// Container for repository ports.
pub struct Repositories {
    pub history: Arc<dyn RollHistoryRepo>,
    pub resources: Arc<dyn ResourceRepo>,
}

/// Container for all use cases.
pub struct UseCases {
    pub roll: use_cases::RollUseCases,
}

impl App {
    /// Create a new App with all dependencies wired up.
    ///
    /// Starts the roll journal worker, so it must run inside a tokio runtime.
    pub fn new(
        config: EngineConfig,
        history: Arc<dyn RollHistoryRepo>,
        resources: Arc<dyn ResourceRepo>,
    ) -> Self {
        let clock_port: Arc<dyn ClockPort> = Arc::new(SystemClock::new());
        let random_port: Arc<dyn RandomPort> = Arc::new(SystemRandom::new());

        let registry = Arc::new(RulesetRegistry::new());
        let sessions = Arc::new(ChannelBroadcaster::new());
        let broadcast_port: Arc<dyn RollBroadcastPort> = sessions.clone();
        let pending = Arc::new(PendingEscalationStore::new());
        let tasks = TaskTracker::new();
        let journal = RollJournal::spawn(history.clone(), broadcast_port, &tasks);

        let deps = RollDeps {
            registry: registry.clone(),
            resources: resources.clone(),
            pending: pending.clone(),
            clock: clock_port,
            random: random_port,
            journal: journal.clone(),
        };

        let roll = use_cases::RollUseCases::new(
            Arc::new(use_cases::roll::PerformRoll::new(deps.clone())),
            Arc::new(use_cases::roll::ResolveEscalation::new(deps)),
        );

        tracing::debug!(
            rulesets = ?registry.list_rulesets(),
            default_ruleset = %config.default_ruleset,
            "Ruleset registry ready"
        );

        Self {
            player: AnimationPlayer::new(config.wave_delay),
            config,
            registry,
            repositories: Repositories { history, resources },
            sessions,
            pending,
            use_cases: UseCases { roll },
            journal,
            tasks,
        }
    }

    /// Drain queued persistence and broadcasts, then stop the journal.
    pub async fn shutdown(&self) {
        self.journal.close();
        self.tasks.close();
        if !self.tasks.is_empty() {
            tracing::debug!(pending = self.tasks.len(), "Waiting for background tasks");
        }
        self.tasks.wait().await;
    }

    /// Wire the default adapters: SQLite history, in-process resources.
    pub async fn from_config(config: EngineConfig) -> Result<Self, RepoError> {
        tracing::info!(path = %config.history_db, "Opening roll history");
        let history = Arc::new(SqliteRollHistoryRepo::new(&config.history_db).await?);
        let resources = Arc::new(InMemoryResourceRepo::new());
        Ok(Self::new(config, history, resources))
    }
}

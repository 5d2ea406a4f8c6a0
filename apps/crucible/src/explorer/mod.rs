//! # Explorer
//!
//! The solve loop. Reads the known elements, ranks them into candidate
//! pairs, and dispatches oracle calls at a throttled cadence.
//!
//! ## Run States
//!
//! ```text
//! Idle ──solve()──▶ Running ──cancel──▶ Stopping ──▶ Idle
//!                      │
//!                      └──fatal error──▶ Faulted ──▶ Idle
//! ```
//!
//! ## Dispatch
//!
//! - A pair already in the store is a cache hit: the oracle is not called
//!   and a missing result element is restored.
//! - Otherwise the call is spawned into the run's `JoinSet` and the loop
//!   waits the inter-request delay before the next dispatch. Calls and
//!   their writes overlap with that wait.
//! - Finished dispatches are collected after every wait. A rate limit
//!   widens the delay, suspends dispatch for `retry_after + grace` and
//!   starts a fresh round. Timeouts and transport failures skip the pair.
//!   The first other failure faults the run; later ones are swallowed.
//! - Cancellation stops future dispatch only. In-flight calls are drained
//!   before the run returns.
//!
//! A run starts and ends with a cache sync unless `skip_sync` is set.

pub mod backoff;
pub mod ranking;

use crate::oracle::{Oracle, OracleError, OracleReply};
use backoff::{Backoff, BackoffPolicy};
use crucible_core::{
    Combination, Element, FlatCache, Store, StoreError, ignore_duplicate, import_elements,
    is_nothing, is_valid_element_text,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

// =============================================================================
// TYPES
// =============================================================================

/// Lifecycle of the explorer's single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Idle,
    Running,
    Stopping,
    Faulted,
}

/// Errors that end a run or a single pair step.
#[derive(Debug, Error)]
pub enum ExploreError {
    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// `solve_for` was given an element the store does not hold.
    #[error("Unknown seed element: {0}")]
    UnknownSeed(String),

    #[error("A run is already in progress")]
    AlreadyRunning,

    /// The run task panicked or was aborted.
    #[error("Run aborted: {0}")]
    Aborted(String),
}

impl From<JoinError> for ExploreError {
    fn from(e: JoinError) -> Self {
        Self::Aborted(e.to_string())
    }
}

/// Explorer tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplorerConfig {
    pub backoff: BackoffPolicy,
    /// Floor of the per-round batch size.
    pub min_batch_size: usize,
    /// Skip the cache sync at run start and end.
    pub skip_sync: bool,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffPolicy::default(),
            min_batch_size: 100,
            skip_sync: false,
        }
    }
}

/// Result of one pair step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairOutcome {
    /// The pair was already stored; the oracle was not called.
    Cached(Combination),
    /// The oracle was called and the combination stored.
    Crafted {
        combination: Combination,
        /// Whether the result element was new to the store.
        new_element: bool,
    },
}

impl PairOutcome {
    pub fn combination(&self) -> &Combination {
        match self {
            Self::Cached(combination) | Self::Crafted { combination, .. } => combination,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cached(_))
    }
}

/// Counters of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub rounds: u64,
    /// Oracle calls issued.
    pub dispatched: u64,
    /// Pairs answered from the store.
    pub cached: u64,
    /// Combinations stored from oracle answers.
    pub crafted: u64,
    /// Result elements new to the store.
    pub new_elements: u64,
    /// Pairs abandoned after a swallowed failure.
    pub skipped: u64,
    pub rate_limits: u32,
    /// Inter-request delay in force when the run ended.
    pub final_delay_ms: u64,
}

#[derive(Debug, Clone)]
enum Target {
    Everything,
    Seed(String),
}

// =============================================================================
// RUN HANDLE
// =============================================================================

/// Control surface of a started run.
#[derive(Debug)]
pub struct RunHandle {
    cancel: CancellationToken,
    state: watch::Receiver<RunState>,
    task: JoinHandle<Result<RunSummary, ExploreError>>,
}

impl RunHandle {
    /// Stop dispatching. In-flight calls still complete.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the run to end.
    pub async fn wait(self) -> Result<RunSummary, ExploreError> {
        self.task.await?
    }
}

// =============================================================================
// EXPLORER
// =============================================================================

struct Shared<O> {
    store: Arc<dyn Store>,
    cache: Option<Arc<FlatCache>>,
    oracle: O,
    config: ExplorerConfig,
    state: watch::Sender<RunState>,
}

/// Drives oracle calls against one store.
///
/// Cloning is cheap and every clone shares the same run state.
pub struct Explorer<O> {
    shared: Arc<Shared<O>>,
}

impl<O> Clone for Explorer<O> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<O: Oracle> Explorer<O> {
    pub fn new(
        store: Arc<dyn Store>,
        cache: Option<Arc<FlatCache>>,
        oracle: O,
        config: ExplorerConfig,
    ) -> Self {
        let (state, _) = watch::channel(RunState::Idle);
        Self {
            shared: Arc::new(Shared {
                store,
                cache,
                oracle,
                config,
                state,
            }),
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.shared.store
    }

    pub fn state(&self) -> RunState {
        *self.shared.state.borrow()
    }

    /// Receiver for run state transitions.
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.shared.state.subscribe()
    }

    /// Explore the whole element space until cancelled or faulted.
    pub fn solve(&self) -> Result<RunHandle, ExploreError> {
        self.start(Target::Everything)
    }

    /// Explore pairs whose first operand is `seed`.
    ///
    /// A seed missing from the store rejects the run with `UnknownSeed`.
    pub fn solve_for(&self, seed: &str) -> Result<RunHandle, ExploreError> {
        self.start(Target::Seed(seed.to_string()))
    }

    /// One pair step: answer from the store, or ask the oracle and store it.
    pub async fn solve_single(&self, a: &str, b: &str) -> Result<PairOutcome, ExploreError> {
        if let Some(hit) = self.lookup(a, b)? {
            return Ok(PairOutcome::Cached(hit));
        }
        self.craft(a, b).await
    }

    /// Stage cached elements into the store, then rewrite the cache.
    pub fn sync_storage(&self) -> Result<(), StoreError> {
        let Some(cache) = &self.shared.cache else {
            return Ok(());
        };
        tracing::info!("Syncing storage...");
        let store = self.shared.store.as_ref();
        let counts = import_elements(store, cache.as_ref())?;
        cache.overwrite_from(store)?;
        tracing::info!(imported = counts.copied, "Syncing storage complete");
        Ok(())
    }

    fn start(&self, target: Target) -> Result<RunHandle, ExploreError> {
        let mut claimed = false;
        self.shared.state.send_if_modified(|state| {
            if *state == RunState::Idle {
                *state = RunState::Running;
                claimed = true;
            }
            claimed
        });
        if !claimed {
            return Err(ExploreError::AlreadyRunning);
        }

        let cancel = CancellationToken::new();
        let explorer = self.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            let outcome = explorer.run(target, token).await;
            explorer.shared.state.send_replace(RunState::Idle);
            outcome
        });

        Ok(RunHandle {
            cancel,
            state: self.shared.state.subscribe(),
            task,
        })
    }

    // =========================================================================
    // PAIR STEP
    // =========================================================================

    /// Stored combination for a pair, restoring its result element if lost.
    fn lookup(&self, a: &str, b: &str) -> Result<Option<Combination>, StoreError> {
        let store = self.shared.store.as_ref();
        let Some(combination) = store.get_combination(a, b)? else {
            return Ok(None);
        };
        let result = &combination.result;
        if !result.is_nothing()
            && store.get_element(&result.text)?.is_none()
            && ignore_duplicate(store.save_element(result))?.is_some()
        {
            tracing::info!(
                pair = %combination.key(),
                result = %result.text,
                "Restored missing result element"
            );
        }
        Ok(Some(combination))
    }

    async fn craft(&self, a: &str, b: &str) -> Result<PairOutcome, ExploreError> {
        tracing::debug!("New combination: {}, {}...", a, b);
        let reply = self.shared.oracle.combine(a, b).await?;
        Ok(self.persist(a, b, reply)?)
    }

    fn persist(&self, a: &str, b: &str, reply: OracleReply) -> Result<PairOutcome, StoreError> {
        let store = self.shared.store.as_ref();
        let result = if reply.result.is_empty() || is_nothing(&reply.result) {
            Element::nothing()
        } else {
            Element::new(reply.result, reply.emoji, reply.is_new)
        };
        tracing::info!("Crafted {} {}...", result.emoji, result.text);

        let new_element = !result.is_nothing() && store.get_element(&result.text)?.is_none();
        match ignore_duplicate(store.save_combination(&Combination::new(a, b, result)))? {
            Some(combination) => Ok(PairOutcome::Crafted {
                combination,
                new_element,
            }),
            // An overlapping dispatch stored the pair first.
            None => match store.get_combination(a, b)? {
                Some(existing) => Ok(PairOutcome::Cached(existing)),
                None => Err(StoreError::StorageUnavailable(format!(
                    "combination [{a}, {b}] conflicted but cannot be read back"
                ))),
            },
        }
    }

    // =========================================================================
    // RUN LOOP
    // =========================================================================

    async fn run(&self, target: Target, cancel: CancellationToken) -> Result<RunSummary, ExploreError> {
        let seed = match &target {
            Target::Everything => None,
            Target::Seed(text) => match self.shared.store.get_element(text)? {
                Some(element) if is_valid_element_text(&element.text) => Some(element.text),
                _ => return Err(ExploreError::UnknownSeed(text.clone())),
            },
        };
        let config = self.shared.config;
        let mut run = RunLoop::new(config.backoff);
        if !config.skip_sync
            && let Err(e) = self.sync_storage()
        {
            run.fault(self, e.into());
        }
        let mut rng = StdRng::from_rng(&mut rand::rng());

        'run: while run.faulted.is_none() && !cancel.is_cancelled() {
            let elements = match self.shared.store.get_all_elements() {
                Ok(elements) => elements,
                Err(e) => {
                    run.fault(self, e.into());
                    break;
                }
            };
            let pairs = match &seed {
                None => ranking::round_pairs(&elements, config.min_batch_size, &mut rng),
                Some(seed) => ranking::seeded_pairs(seed, &elements, &mut rng),
            };
            run.summary.rounds += 1;
            tracing::debug!(round = run.summary.rounds, pairs = pairs.len(), "Starting round");

            let mut dispatched = 0usize;
            for (first, second) in pairs {
                if cancel.is_cancelled() || run.faulted.is_some() {
                    break 'run;
                }
                match self.lookup(&first, &second) {
                    Ok(Some(_)) => {
                        run.summary.cached += 1;
                        continue;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        run.fault(self, e.into());
                        break 'run;
                    }
                }

                let explorer = self.clone();
                let seq = run.next_seq();
                run.tasks
                    .spawn(async move { (seq, explorer.craft(&first, &second).await) });
                run.summary.dispatched += 1;
                dispatched += 1;

                match self.settle(&mut run, &cancel).await {
                    Flow::Continue => {}
                    Flow::NextRound => continue 'run,
                    Flow::Stop => break 'run,
                }
            }

            // A round of pure cache hits still yields to the clock.
            if dispatched == 0 {
                match self.settle(&mut run, &cancel).await {
                    Flow::Continue | Flow::NextRound => {}
                    Flow::Stop => break 'run,
                }
            }
        }

        if run.faulted.is_none() && cancel.is_cancelled() {
            self.shared.state.send_replace(RunState::Stopping);
            tracing::info!(in_flight = run.tasks.len(), "Stopping run");
        }
        while let Some(joined) = run.tasks.join_next().await {
            run.absorb(self, joined);
        }
        // Rate limits reported while draining have no one left to wait for.
        run.pending_cooldown = None;

        if !config.skip_sync
            && let Err(e) = self.sync_storage()
        {
            tracing::error!("Final storage sync failed: {}", e);
        }

        run.summary.rate_limits = run.backoff.episodes();
        run.summary.final_delay_ms = run.backoff.delay().as_millis() as u64;
        match run.faulted {
            Some(e) => Err(e),
            None => {
                tracing::info!(
                    rounds = run.summary.rounds,
                    dispatched = run.summary.dispatched,
                    crafted = run.summary.crafted,
                    new_elements = run.summary.new_elements,
                    "Run finished"
                );
                Ok(run.summary)
            }
        }
    }

    /// Wait out the throttle delay, then react to finished dispatches.
    async fn settle(&self, run: &mut RunLoop, cancel: &CancellationToken) -> Flow {
        if !pause(run.backoff.delay(), cancel).await {
            return Flow::Stop;
        }
        while let Some(joined) = run.tasks.try_join_next() {
            run.absorb(self, joined);
        }
        if run.faulted.is_some() {
            return Flow::Stop;
        }
        let Some(cooldown) = run.pending_cooldown.take() else {
            return Flow::Continue;
        };

        tracing::warn!(
            cooldown_secs = cooldown.as_secs(),
            delay_ms = run.backoff.delay().as_millis() as u64,
            "Rate limited; suspending dispatch"
        );
        if !pause(cooldown, cancel).await {
            return Flow::Stop;
        }
        run.resume_seq = run.seq;
        tracing::info!("Resuming after cooldown");
        Flow::NextRound
    }
}

enum Flow {
    Continue,
    NextRound,
    Stop,
}

/// Sleep unless cancelled first. Returns `false` on cancellation.
async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        () = tokio::time::sleep(duration) => true,
        () = cancel.cancelled() => false,
    }
}

type Dispatch = (u64, Result<PairOutcome, ExploreError>);

/// Mutable state of one run.
struct RunLoop {
    backoff: Backoff,
    tasks: JoinSet<Dispatch>,
    summary: RunSummary,
    faulted: Option<ExploreError>,
    pending_cooldown: Option<Duration>,
    /// Sequence number of the last dispatch.
    seq: u64,
    /// Rate limits from dispatches at or before this number were already
    /// waited out.
    resume_seq: u64,
}

impl RunLoop {
    fn new(policy: BackoffPolicy) -> Self {
        Self {
            backoff: Backoff::new(policy),
            tasks: JoinSet::new(),
            summary: RunSummary::default(),
            faulted: None,
            pending_cooldown: None,
            seq: 0,
            resume_seq: 0,
        }
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn absorb<O>(&mut self, explorer: &Explorer<O>, joined: Result<Dispatch, JoinError>) {
        let (seq, outcome) = match joined {
            Ok(dispatch) => dispatch,
            Err(e) => {
                self.fault(explorer, e.into());
                return;
            }
        };

        match outcome {
            Ok(PairOutcome::Cached(_)) => self.summary.cached += 1,
            Ok(PairOutcome::Crafted { new_element, .. }) => {
                self.summary.crafted += 1;
                if new_element {
                    self.summary.new_elements += 1;
                }
            }
            Err(ExploreError::Oracle(OracleError::RateLimited { retry_after })) => {
                self.summary.skipped += 1;
                if seq <= self.resume_seq {
                    tracing::debug!(seq, "Rate limit from before the last cooldown");
                } else if self.pending_cooldown.is_none() {
                    self.pending_cooldown = Some(self.backoff.on_rate_limit(retry_after));
                }
            }
            Err(ExploreError::Oracle(e)) if e.is_transient() => {
                self.summary.skipped += 1;
                tracing::warn!("Pair skipped: {}", e);
            }
            Err(e) => {
                self.summary.skipped += 1;
                self.fault(explorer, e);
            }
        }
    }

    fn fault<O>(&mut self, explorer: &Explorer<O>, error: ExploreError) {
        if self.faulted.is_some() {
            tracing::debug!("Swallowed failure after fault: {}", error);
            return;
        }
        tracing::error!("Run faulted: {}", error);
        explorer.shared.state.send_replace(RunState::Faulted);
        self.faulted = Some(error);
    }
}

// =============================================================================
// TESTS
// =============================================================================

//! Recurring contract polls
//!
//! The scheduler owns one task per purpose. `stop` bumps the store's poll
//! epoch before aborting the tasks, and every poll write is checked against
//! that epoch under the store lock, so nothing lands after `stop` returns.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::sync::reader::StateReader;
use crate::sync::resolver::NetworkResolver;
use crate::sync::state::{ApplyGuard, StateStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollTask {
    PresaleLifecycle,
    MintCount,
}

impl PollTask {
    pub fn as_str(self) -> &'static str {
        match self {
            PollTask::PresaleLifecycle => "presale-lifecycle",
            PollTask::MintCount => "mint-count",
        }
    }
}

/// What the polling tasks need from the client
#[derive(Clone)]
pub struct PollContext {
    pub resolver: Arc<NetworkResolver>,
    pub reader: Arc<StateReader>,
    pub store: Arc<StateStore>,
    pub interval: Duration,
}

pub struct PollScheduler {
    store: Arc<StateStore>,
    tasks: HashMap<PollTask, JoinHandle<()>>,
}

impl PollScheduler {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self {
            store,
            tasks: HashMap::new(),
        }
    }

    /// Whether any poll is still scheduled
    pub fn is_running(&self) -> bool {
        self.tasks.values().any(|task| !task.is_finished())
    }

    pub fn is_task_running(&self, task: PollTask) -> bool {
        self.tasks.get(&task).is_some_and(|handle| !handle.is_finished())
    }

    /// Spawn both polls; a no-op while they are already running
    pub fn start(&mut self, ctx: PollContext) -> bool {
        if self.is_running() {
            debug!("poll scheduler already running");
            return false;
        }
        self.tasks.clear();
        let epoch = self.store.poll_epoch();
        info!(interval = ?ctx.interval, epoch, "starting contract polls");

        self.tasks.insert(
            PollTask::PresaleLifecycle,
            tokio::spawn(run_lifecycle_poll(ctx.clone(), epoch)),
        );
        self.tasks
            .insert(PollTask::MintCount, tokio::spawn(run_mint_count_poll(ctx, epoch)));
        true
    }

    /// Cancel every poll; no poll write is applied after this returns
    pub fn stop(&mut self) {
        self.store.bump_poll_epoch();
        for (task, handle) in self.tasks.drain() {
            handle.abort();
            debug!(task = task.as_str(), "poll cancelled");
        }
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        for handle in self.tasks.values() {
            handle.abort();
        }
    }
}

fn ticker(period: Duration) -> time::Interval {
    // The connect path does the initial read, so the first tick waits a period
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// Re-check `presaleStarted`, and `presaleEnded` once started; finishes
/// when the presale is observed to have ended
async fn run_lifecycle_poll(ctx: PollContext, epoch: u64) {
    let task = PollTask::PresaleLifecycle.as_str();
    let mut ticker = ticker(ctx.interval);
    loop {
        ticker.tick().await;
        let handle = match ctx.resolver.resolve_existing().await {
            Ok(handle) => handle,
            Err(err) => {
                warn!(task, error = %err, "poll skipped");
                continue;
            }
        };
        let ticket = ctx.store.issue_read();
        match ctx.reader.read_lifecycle(&handle).await {
            Ok(reading) => {
                ctx.store.apply_lifecycle(
                    ApplyGuard::poll(handle.generation(), epoch),
                    ticket,
                    &reading,
                );
                if reading.presale_ended {
                    info!(task, "presale ended; lifecycle poll finished");
                    return;
                }
            }
            Err(err) => warn!(task, error = %err, "poll skipped"),
        }
    }
}

/// Re-read the minted counter every period, indefinitely
async fn run_mint_count_poll(ctx: PollContext, epoch: u64) {
    let task = PollTask::MintCount.as_str();
    let mut ticker = ticker(ctx.interval);
    loop {
        ticker.tick().await;
        let handle = match ctx.resolver.resolve_existing().await {
            Ok(handle) => handle,
            Err(err) => {
                warn!(task, error = %err, "poll skipped");
                continue;
            }
        };
        let ticket = ctx.store.issue_read();
        match ctx.reader.read_token_ids(&handle).await {
            Ok(token_ids) => {
                ctx.store.apply_token_ids(
                    ApplyGuard::poll(handle.generation(), epoch),
                    ticket,
                    token_ids,
                );
            }
            Err(err) => warn!(task, error = %err, "poll skipped"),
        }
    }
}

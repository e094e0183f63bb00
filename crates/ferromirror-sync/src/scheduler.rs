//! Periodic cycle scheduling

use crate::engine::{CycleReport, SyncEngine};
use ferromirror_types::{Error, Result};
use std::fmt;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Capacity of the scheduler's message queue
const MESSAGE_QUEUE_SIZE: usize = 16;

/// Lifecycle state of the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Spawned, first cycle not started yet
    Idle,
    /// A cycle is in progress
    Running,
    /// Waiting for the next cycle
    Sleeping,
    /// Cancelled; no further cycles will run
    Stopped,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Sleeping => "sleeping",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Live reconfiguration requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerMessage {
    /// Replace the interval; the current sleep is re-measured from the end of the last cycle
    SetInterval(Duration),
    /// Cut the current sleep short and run a cycle now
    RunNow,
}

/// Runs a [`SyncEngine`] every interval until cancelled
#[derive(Debug)]
pub struct Scheduler {
    engine: SyncEngine,
    interval: Duration,
    token: CancellationToken,
}

impl Scheduler {
    /// Create a scheduler using the engine's configured interval
    pub fn new(engine: SyncEngine, token: CancellationToken) -> Self {
        let interval = engine.config().interval();
        Self {
            engine,
            interval,
            token,
        }
    }

    /// Override the starting interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Start the cycle loop on the current runtime
    pub fn spawn(self) -> SchedulerHandle {
        let (messages_tx, messages_rx) = mpsc::channel(MESSAGE_QUEUE_SIZE);
        let (state_tx, state_rx) = watch::channel(SchedulerState::Idle);
        let (report_tx, report_rx) = watch::channel(None);
        let token = self.token.clone();

        let task = tokio::spawn(self.run(messages_rx, state_tx, report_tx));

        SchedulerHandle {
            messages: messages_tx,
            token,
            state: state_rx,
            report: report_rx,
            task,
        }
    }

    async fn run(
        mut self,
        mut messages: mpsc::Receiver<SchedulerMessage>,
        state: watch::Sender<SchedulerState>,
        report: watch::Sender<Option<CycleReport>>,
    ) {
        info!("Scheduler started with interval {:?}", self.interval);
        let mut messages_open = true;

        'cycles: while !self.token.is_cancelled() {
            state.send_replace(SchedulerState::Running);
            match self.engine.run_cycle().await {
                Ok(cycle) => {
                    report.send_replace(Some(cycle));
                }
                Err(e) => error!("Sync cycle failed: {}", e),
            }
            let finished = Instant::now();

            if self.token.is_cancelled() {
                break;
            }
            state.send_replace(SchedulerState::Sleeping);

            let mut deadline = deadline_after(finished, self.interval);
            loop {
                tokio::select! {
                    biased;

                    () = self.token.cancelled() => break 'cycles,
                    () = sleep_until(deadline) => break,
                    message = messages.recv(), if messages_open => match message {
                        Some(SchedulerMessage::SetInterval(interval)) => {
                            info!("Interval changed to {:?}", interval);
                            self.interval = interval;
                            deadline = deadline_after(finished, interval);
                        }
                        Some(SchedulerMessage::RunNow) => {
                            debug!("Immediate cycle requested");
                            break;
                        }
                        None => messages_open = false,
                    },
                }
            }
        }

        state.send_replace(SchedulerState::Stopped);
        info!("Scheduler stopped after {} cycles", self.engine.cycles_run());
    }
}

/// Longest sleep the scheduler will schedule in one go
const MAX_SLEEP: Duration = Duration::from_secs(60 * 60 * 24 * 365);

fn deadline_after(start: Instant, interval: Duration) -> Instant {
    start + interval.min(MAX_SLEEP)
}

/// Control side of a running [`Scheduler`]
#[derive(Debug)]
pub struct SchedulerHandle {
    messages: mpsc::Sender<SchedulerMessage>,
    token: CancellationToken,
    state: watch::Receiver<SchedulerState>,
    report: watch::Receiver<Option<CycleReport>>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Change the interval between cycles
    pub async fn set_interval(&self, interval: Duration) -> Result<()> {
        self.send(SchedulerMessage::SetInterval(interval)).await
    }

    /// Request a cycle without waiting for the interval to elapse
    pub async fn run_now(&self) -> Result<()> {
        self.send(SchedulerMessage::RunNow).await
    }

    async fn send(&self, message: SchedulerMessage) -> Result<()> {
        self.messages
            .send(message)
            .await
            .map_err(|_| Error::sync("Scheduler is no longer running"))
    }

    /// Request a stop; an in-progress cycle still completes
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// Current lifecycle state
    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Receiver that is notified on every state change
    pub fn subscribe_state(&self) -> watch::Receiver<SchedulerState> {
        self.state.clone()
    }

    /// Report of the most recently completed cycle
    pub fn last_report(&self) -> Option<CycleReport> {
        self.report.borrow().clone()
    }

    /// Receiver that is notified after every completed cycle
    pub fn subscribe_reports(&self) -> watch::Receiver<Option<CycleReport>> {
        self.report.clone()
    }

    /// Wait for the scheduler task to finish
    pub async fn join(self) -> Result<()> {
        self.task
            .await
            .map_err(|e| Error::sync(format!("Scheduler task failed: {}", e)))
    }

    /// Stop the scheduler and wait for it to finish
    pub async fn shutdown(self) -> Result<()> {
        self.stop();
        self.join().await
    }
}

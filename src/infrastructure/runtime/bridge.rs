//! Runtime bridge - connects sync TUI thread with async Tokio runtime
//!
//! The sync client runs on a dedicated thread inside a current-thread Tokio
//! runtime: all contract I/O is cooperative on that one thread. The TUI
//! sends [`RuntimeCommand`]s and drains [`RuntimeEvent`]s without blocking.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use tokio::runtime::Builder;

use crate::config::Settings;
use crate::core::Notice;
use crate::domain::ActionKind;
use crate::infrastructure::ethereum::ProviderConfig;
use crate::infrastructure::runtime::worker::run_async_worker;
use crate::sync::SyncView;

/// Commands sent from the TUI to the async worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeCommand {
    /// Request wallet access, read the contract, start polling
    Connect,
    /// Drop the session and cancel polling
    Disconnect,
    /// Re-read the full snapshot now
    Refresh,
    /// Submit a contract action and wait for it to settle
    Submit(ActionKind),
    /// Shutdown the worker
    Shutdown,
}

/// Events sent from the async worker to the TUI
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// Wallet provider created for this endpoint
    Ready { endpoint: String },
    /// Shared state changed
    State(SyncView),
    /// User-visible notice (wrong network, mint result)
    Notice(Notice),
    /// Error occurred
    Error { message: String },
}

/// Everything the worker needs to build its client
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub endpoint: ProviderConfig,
    pub private_key: Option<String>,
    pub settings: Settings,
    /// Connect as soon as the worker starts
    pub auto_connect: bool,
}

/// Bridge between sync TUI thread and async Tokio runtime
pub struct RuntimeBridge {
    cmd_tx: Sender<RuntimeCommand>,
    evt_rx: Receiver<RuntimeEvent>,
}

impl RuntimeBridge {
    /// Create a new runtime bridge and spawn its worker thread
    pub fn new(config: WorkerConfig) -> anyhow::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<RuntimeCommand>();
        let (evt_tx, evt_rx) = mpsc::channel::<RuntimeEvent>();

        let rt = Builder::new_current_thread().enable_all().build()?;
        thread::Builder::new()
            .name("presale-sync-worker".into())
            .spawn(move || {
                rt.block_on(async {
                    if let Err(err) = run_async_worker(config, cmd_rx, evt_tx.clone()).await {
                        let _ = evt_tx.send(RuntimeEvent::Error {
                            message: format!("Worker exited: {:#}", err),
                        });
                    }
                });
            })?;

        Ok(Self { cmd_tx, evt_rx })
    }

    /// Send a command to the async worker
    pub fn send(&self, cmd: RuntimeCommand) -> anyhow::Result<()> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| anyhow::anyhow!("Worker channel closed"))
    }

    /// Poll for events (non-blocking)
    pub fn poll_events(&self) -> Vec<RuntimeEvent> {
        let mut events = Vec::new();
        while let Ok(evt) = self.evt_rx.try_recv() {
            events.push(evt);
        }
        events
    }
}

impl Drop for RuntimeBridge {
    fn drop(&mut self) {
        // Try to send shutdown command
        let _ = self.cmd_tx.send(RuntimeCommand::Shutdown);
    }
}

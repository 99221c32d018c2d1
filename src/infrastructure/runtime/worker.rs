//! Async worker - hosts the sync client inside the Tokio runtime

use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::core::Notifier;
use crate::infrastructure::ethereum::create_wallet;
use crate::infrastructure::runtime::bridge::{RuntimeCommand, RuntimeEvent, WorkerConfig};
use crate::sync::SyncClient;

/// Run the async worker loop
pub async fn run_async_worker(
    config: WorkerConfig,
    cmd_rx: Receiver<RuntimeCommand>,
    evt_tx: Sender<RuntimeEvent>,
) -> Result<()> {
    let endpoint = config.endpoint.display();
    let wallet = create_wallet(config.endpoint, config.private_key.as_deref()).await?;
    let (notifier, mut notices) = Notifier::channel();
    let client = Arc::new(SyncClient::new(wallet, config.settings, notifier));
    let mut updates = client.subscribe();

    info!(%endpoint, "sync worker ready");
    let _ = evt_tx.send(RuntimeEvent::Ready { endpoint });

    if config.auto_connect {
        dispatch(&client, RuntimeCommand::Connect, &evt_tx);
    }

    loop {
        // Process commands (non-blocking)
        while let Ok(cmd) = cmd_rx.try_recv() {
            if cmd == RuntimeCommand::Shutdown {
                client.disconnect();
                return Ok(());
            }
            dispatch(&client, cmd, &evt_tx);
        }

        if updates.has_changed().unwrap_or(false) {
            let view = updates.borrow_and_update().clone();
            let _ = evt_tx.send(RuntimeEvent::State(view));
        }

        while let Ok(notice) = notices.try_recv() {
            let _ = evt_tx.send(RuntimeEvent::Notice(notice));
        }

        // Small yield to prevent busy loop
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Run one command on its own task so a long settlement never stalls polling
fn dispatch(client: &Arc<SyncClient>, cmd: RuntimeCommand, evt_tx: &Sender<RuntimeEvent>) {
    debug!(?cmd, "dispatching command");
    match cmd {
        RuntimeCommand::Disconnect => client.disconnect(),
        RuntimeCommand::Shutdown => {}
        RuntimeCommand::Connect => {
            let client = Arc::clone(client);
            let evt_tx = evt_tx.clone();
            tokio::spawn(async move {
                if let Err(err) = client.connect().await {
                    warn!(error = %err, "connect failed");
                    let _ = evt_tx.send(RuntimeEvent::Error {
                        message: format!("Connect failed: {err}"),
                    });
                }
            });
        }
        RuntimeCommand::Refresh => {
            let client = Arc::clone(client);
            let evt_tx = evt_tx.clone();
            tokio::spawn(async move {
                if let Err(err) = client.refresh().await {
                    warn!(error = %err, "refresh failed");
                    let _ = evt_tx.send(RuntimeEvent::Error {
                        message: format!("Refresh failed: {err}"),
                    });
                }
            });
        }
        RuntimeCommand::Submit(kind) => {
            let client = Arc::clone(client);
            let evt_tx = evt_tx.clone();
            tokio::spawn(async move {
                // Outcome notices come from the client; only log here
                match client.run_action(kind).await {
                    Ok(tx_hash) => info!(%kind, tx = %tx_hash, "action settled"),
                    Err(err) => {
                        warn!(%kind, error = %err, "action failed");
                        let _ = evt_tx.send(RuntimeEvent::Error {
                            message: format!("{kind} failed: {err}"),
                        });
                    }
                }
            });
        }
    }
}

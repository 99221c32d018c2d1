//! End-to-end sync flows against an in-memory wallet
//!
//! Time is paused: polls and receipt waits advance the tokio clock only
//! when every task is idle.

mod common;

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;
use tokio::time::sleep;

use common::{MockWallet, ReceiptMode, ACCOUNT, NOW, OTHER};
use presale_sync::core::NotifyLevel;
use presale_sync::domain::{ActionKind, SyncError, UiState};
use presale_sync::infrastructure::ethereum::ContractRead;
use presale_sync::sync::PollTask;

#[tokio::test(start_paused = true)]
async fn test_connect_reads_snapshot_and_starts_polls() {
    let wallet = Arc::new(MockWallet::new().with_token_ids(3));
    let (client, _notices) = common::client(&wallet);

    let view = client.connect().await.unwrap();

    assert!(view.session.wallet_connected);
    assert_eq!(view.session.address, Some(ACCOUNT));
    assert!(!view.session.is_owner);
    assert!(view.has_snapshot);
    assert_eq!(view.snapshot.owner, Some(OTHER));
    assert_eq!(view.snapshot.token_ids_minted, 3);
    assert_eq!(view.ui_state(), UiState::PresaleNotStarted);
    assert!(client.is_task_running(PollTask::PresaleLifecycle));
    assert!(client.is_task_running(PollTask::MintCount));
}

#[tokio::test(start_paused = true)]
async fn test_wrong_network_blocks_everything() {
    let wallet = Arc::new(MockWallet::new().with_chain_id(1));
    let (client, mut notices) = common::client(&wallet);

    let err = client.connect().await.unwrap_err();
    assert_eq!(
        err,
        SyncError::NetworkMismatch {
            expected: 5,
            actual: 1
        }
    );
    let err = client.run_action(ActionKind::PublicMint).await.unwrap_err();
    assert!(matches!(err, SyncError::NetworkMismatch { .. }));

    assert_eq!(wallet.total_calls(), 0);
    assert!(wallet.sent().is_empty());
    assert!(!client.view().session.wallet_connected);
    assert!(!client.is_polling());

    // One warning per entry into the mismatch, not per attempt
    let notices = common::drain(&mut notices);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NotifyLevel::Warn);
}

#[tokio::test(start_paused = true)]
async fn test_network_switch_back_recovers() {
    let wallet = Arc::new(MockWallet::new().with_chain_id(1));
    let (client, _notices) = common::client(&wallet);

    assert!(client.refresh().await.is_err());
    wallet.set_chain_id(5);
    let snapshot = client.refresh().await.unwrap();

    assert!(!snapshot.presale_started);
    assert!(client.view().session.wallet_connected);
}

#[tokio::test(start_paused = true)]
async fn test_partial_read_failure_keeps_previous_snapshot() {
    let wallet = Arc::new(MockWallet::new().with_token_ids(4));
    let (client, _notices) = common::client(&wallet);
    client.refresh().await.unwrap();
    let before = client.view().snapshot;

    wallet.set_presale_started(true);
    wallet.set_token_ids(7);
    wallet.fail(ContractRead::TokenIds);

    let err = client.refresh().await.unwrap_err();
    assert!(matches!(err, SyncError::ReadFailed(ref msg) if msg.starts_with("tokenIds")));
    assert_eq!(client.view().snapshot, before);

    wallet.heal(ContractRead::TokenIds);
    let after = client.refresh().await.unwrap();
    assert!(after.presale_started);
    assert_eq!(client.view().snapshot.token_ids_minted, 7);
}

#[tokio::test(start_paused = true)]
async fn test_owner_starts_presale() {
    let wallet = Arc::new(MockWallet::new().with_owner(ACCOUNT));
    let (client, mut notices) = common::client(&wallet);

    let view = client.connect().await.unwrap();
    assert!(view.session.is_owner);
    assert_eq!(view.ui_state(), UiState::OwnerCanStartPresale);

    client.run_action(ActionKind::StartPresale).await.unwrap();

    let sent = wallet.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, Some(ActionKind::StartPresale));
    assert_eq!(sent[0].from, Some(ACCOUNT));
    assert_eq!(sent[0].value, None);

    let view = client.view();
    assert!(view.snapshot.presale_started);
    assert!(!view.snapshot.presale_ended);
    assert_eq!(view.snapshot.presale_ends_at, NOW + 300);
    assert!(view.pending.is_none());
    assert_eq!(view.ui_state(), UiState::PresaleOpenForMint);

    let texts: Vec<_> = common::drain(&mut notices)
        .into_iter()
        .map(|notice| notice.text)
        .collect();
    assert_eq!(texts, vec!["Presale started".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_presale_mint_pays_and_increments_supply() {
    let wallet = Arc::new(MockWallet::new().with_presale(NOW + 3600).with_token_ids(2));
    let (client, mut notices) = common::client(&wallet);

    let view = client.connect().await.unwrap();
    assert_eq!(view.ui_state(), UiState::PresaleOpenForMint);
    // Ownership is not read once the presale runs
    assert_eq!(wallet.calls(ContractRead::Owner), 0);

    client.run_action(ActionKind::PresaleMint).await.unwrap();

    let sent = wallet.sent();
    assert_eq!(sent[0].kind, Some(ActionKind::PresaleMint));
    assert_eq!(sent[0].value, Some(client.settings().mint_price));
    assert_eq!(client.settings().mint_price, U256::from(10_000_000_000_000_000u64));
    assert_eq!(client.view().snapshot.token_ids_minted, 3);

    let notices = common::drain(&mut notices);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].text, "You successfully minted a Crypto Dev!");
}

#[tokio::test(start_paused = true)]
async fn test_public_mint_after_presale_ended() {
    let wallet = Arc::new(MockWallet::new().with_presale(NOW - 10));
    let (client, _notices) = common::client(&wallet);

    let view = client.connect().await.unwrap();
    assert!(view.snapshot.presale_ended);
    assert_eq!(view.ui_state(), UiState::PublicMintOpen);

    client.run_action(ActionKind::PublicMint).await.unwrap();
    assert_eq!(wallet.sent()[0].kind, Some(ActionKind::PublicMint));
    assert_eq!(client.view().snapshot.token_ids_minted, 1);
}

#[tokio::test(start_paused = true)]
async fn test_second_action_rejected_while_pending() {
    let wallet = Arc::new(
        MockWallet::new()
            .with_presale(NOW + 3600)
            .with_receipts(ReceiptMode::Pending),
    );
    let (client, mut notices) = common::client(&wallet);
    client.connect().await.unwrap();

    let first = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.run_action(ActionKind::PresaleMint).await })
    };
    while client.view().pending.map_or(true, |p| p.tx_hash.is_none()) {
        tokio::task::yield_now().await;
    }
    assert_eq!(client.view().ui_state(), UiState::Busy);

    let connects = wallet.connects();
    let calls = wallet.total_calls();
    let err = client.run_action(ActionKind::PresaleMint).await.unwrap_err();
    assert!(matches!(err, SyncError::CallerMisuse(_)));
    assert_eq!(wallet.sent().len(), 1);
    assert_eq!(wallet.connects(), connects);
    assert_eq!(wallet.total_calls(), calls);

    // The receipt never arrives; the first action settles by timeout
    let err = first.await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        SyncError::TimedOut {
            kind: ActionKind::PresaleMint,
            ..
        }
    ));
    assert!(client.view().pending.is_none());
    assert_eq!(client.view().ui_state(), UiState::PresaleOpenForMint);

    let notices = common::drain(&mut notices);
    assert!(notices
        .iter()
        .any(|notice| notice.level == NotifyLevel::Warn && notice.text.contains("mint")));
}

#[tokio::test(start_paused = true)]
async fn test_wallet_rejection_frees_the_slot() {
    let wallet = Arc::new(MockWallet::new().with_presale(NOW + 3600));
    let (client, _notices) = common::client(&wallet);
    client.connect().await.unwrap();

    wallet.reject_next_send("User denied transaction signature");
    let err = client.run_action(ActionKind::PresaleMint).await.unwrap_err();
    assert_eq!(
        err,
        SyncError::WalletRejected("User denied transaction signature".into())
    );
    assert!(client.view().pending.is_none());

    client.run_action(ActionKind::PresaleMint).await.unwrap();
    assert_eq!(wallet.sent().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_reverted_receipt_reports_revert() {
    let wallet = Arc::new(
        MockWallet::new()
            .with_presale(NOW + 3600)
            .with_receipts(ReceiptMode::Reverted),
    );
    let (client, _notices) = common::client(&wallet);
    client.connect().await.unwrap();

    let err = client.run_action(ActionKind::PresaleMint).await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::TxReverted {
            kind: ActionKind::PresaleMint,
            ..
        }
    ));
    assert!(client.view().pending.is_none());
    assert_eq!(client.view().snapshot.token_ids_minted, 0);
}

#[tokio::test(start_paused = true)]
async fn test_mint_count_poll_picks_up_external_mints() {
    let wallet = Arc::new(MockWallet::new());
    let (client, _notices) = common::client(&wallet);
    client.connect().await.unwrap();

    wallet.set_token_ids(5);
    sleep(Duration::from_millis(1_500)).await;

    assert_eq!(client.view().snapshot.token_ids_minted, 5);
}

#[tokio::test(start_paused = true)]
async fn test_lifecycle_poll_stops_after_presale_ended() {
    let wallet = Arc::new(MockWallet::new().with_presale(NOW - 10));
    let (client, _notices) = common::client(&wallet);
    client.connect().await.unwrap();
    assert_eq!(wallet.calls(ContractRead::PresaleEnded), 1);

    sleep(Duration::from_millis(1_500)).await;
    assert_eq!(wallet.calls(ContractRead::PresaleEnded), 2);
    assert!(!client.is_task_running(PollTask::PresaleLifecycle));

    let token_reads = wallet.calls(ContractRead::TokenIds);
    sleep(Duration::from_secs(5)).await;
    assert_eq!(wallet.calls(ContractRead::PresaleEnded), 2);
    assert!(wallet.calls(ContractRead::TokenIds) >= token_reads + 4);
    assert!(client.is_task_running(PollTask::MintCount));
}

#[tokio::test(start_paused = true)]
async fn test_lifecycle_poll_sees_presale_start() {
    let wallet = Arc::new(MockWallet::new());
    let (client, _notices) = common::client(&wallet);
    client.connect().await.unwrap();
    assert_eq!(client.view().ui_state(), UiState::PresaleNotStarted);

    wallet.start_presale(NOW + 3600);
    sleep(Duration::from_millis(1_500)).await;

    assert!(client.view().snapshot.presale_started);
    assert_eq!(client.view().ui_state(), UiState::PresaleOpenForMint);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_stops_polling() {
    let wallet = Arc::new(MockWallet::new());
    let (client, _notices) = common::client(&wallet);
    client.connect().await.unwrap();

    client.disconnect();
    assert!(!client.is_polling());
    let calls = wallet.total_calls();

    wallet.set_token_ids(9);
    sleep(Duration::from_secs(5)).await;

    assert_eq!(wallet.total_calls(), calls);
    let view = client.view();
    assert!(!view.session.wallet_connected);
    assert!(!view.has_snapshot);
    assert_eq!(view.ui_state(), UiState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_restarts_polling() {
    let wallet = Arc::new(MockWallet::new());
    let (client, _notices) = common::client(&wallet);
    client.connect().await.unwrap();
    client.disconnect();

    client.connect().await.unwrap();
    assert!(client.is_polling());

    wallet.set_token_ids(2);
    sleep(Duration::from_millis(1_500)).await;
    assert_eq!(client.view().snapshot.token_ids_minted, 2);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_during_connect_wins() {
    let wallet = Arc::new(MockWallet::new().with_connect_delay(Duration::from_secs(1)));
    let (client, _notices) = common::client(&wallet);

    let connecting = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.connect().await })
    };
    sleep(Duration::from_millis(10)).await;
    assert_eq!(wallet.connects(), 1);
    client.disconnect();

    let err = connecting.await.unwrap().unwrap_err();
    assert_eq!(err, SyncError::StaleHandle);

    let calls = wallet.total_calls();
    wallet.set_token_ids(4);
    sleep(Duration::from_secs(3)).await;

    assert!(!client.is_polling());
    assert_eq!(wallet.total_calls(), calls);
    assert_eq!(wallet.connects(), 1);
    let view = client.view();
    assert!(!view.session.wallet_connected);
    assert!(!view.has_snapshot);
    assert_eq!(view.ui_state(), UiState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_broadcast_tx_settles_after_disconnect() {
    let wallet = Arc::new(
        MockWallet::new()
            .with_presale(NOW + 3600)
            .with_receipts(ReceiptMode::Pending),
    );
    let (client, mut notices) = common::client(&wallet);
    client.connect().await.unwrap();

    let minting = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.run_action(ActionKind::PresaleMint).await })
    };
    while client.view().pending.map_or(true, |p| p.tx_hash.is_none()) {
        tokio::task::yield_now().await;
    }

    client.disconnect();
    wallet.set_receipts(ReceiptMode::Success);

    let tx_hash = minting.await.unwrap().unwrap();
    assert_eq!(wallet.sent().len(), 1);
    assert_ne!(tx_hash, alloy::primitives::TxHash::default());
    assert!(client.view().pending.is_none());

    let notices = common::drain(&mut notices);
    assert!(notices.iter().all(|notice| notice.level != NotifyLevel::Warn));
    assert!(notices
        .iter()
        .any(|notice| notice.text == "You successfully minted a Crypto Dev!"));
}

#[tokio::test(start_paused = true)]
async fn test_polls_survive_transient_read_failures() {
    let wallet = Arc::new(MockWallet::new().with_token_ids(1));
    let (client, _notices) = common::client(&wallet);
    client.connect().await.unwrap();

    wallet.fail(ContractRead::TokenIds);
    wallet.fail(ContractRead::PresaleStarted);
    wallet.set_token_ids(4);
    sleep(Duration::from_millis(2_500)).await;

    assert!(wallet.calls(ContractRead::TokenIds) >= 3);
    assert_eq!(client.view().snapshot.token_ids_minted, 1);
    assert!(client.is_task_running(PollTask::MintCount));
    assert!(client.is_task_running(PollTask::PresaleLifecycle));

    wallet.heal(ContractRead::TokenIds);
    wallet.heal(ContractRead::PresaleStarted);
    wallet.start_presale(NOW + 3600);
    sleep(Duration::from_secs(1)).await;

    let view = client.view();
    assert_eq!(view.snapshot.token_ids_minted, 4);
    assert!(view.snapshot.presale_started);
}

#[tokio::test(start_paused = true)]
async fn test_polls_skip_while_on_wrong_network() {
    let wallet = Arc::new(MockWallet::new().with_token_ids(1));
    let (client, mut notices) = common::client(&wallet);
    client.connect().await.unwrap();
    let reads = wallet.calls(ContractRead::TokenIds);

    wallet.set_chain_id(1);
    wallet.set_token_ids(2);
    sleep(Duration::from_millis(2_500)).await;

    assert_eq!(wallet.calls(ContractRead::TokenIds), reads);
    assert_eq!(client.view().snapshot.token_ids_minted, 1);
    assert!(client.view().session.wallet_connected);
    assert!(client.is_task_running(PollTask::MintCount));
    assert!(client.is_task_running(PollTask::PresaleLifecycle));
    let warnings = common::drain(&mut notices);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].level, NotifyLevel::Warn);

    wallet.set_chain_id(5);
    wallet.set_token_ids(3);
    sleep(Duration::from_millis(1_500)).await;

    assert_eq!(client.view().snapshot.token_ids_minted, 3);
}

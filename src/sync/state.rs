//! Shared session/snapshot/pending state
//!
//! One store per client. Every write happens under a single lock and
//! publishes a fresh [`SyncView`], so observers never see half-applied
//! readings.
//!
//! Reads are tagged with a sequence number taken when the read is issued.
//! The snapshot is split into two field groups (lifecycle and supply) that
//! are polled independently; a completion is applied to a group only if it
//! is newer than what that group currently holds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use alloy::primitives::{Address, B256};
use tokio::sync::watch;
use tracing::debug;

use crate::domain::{
    render, ActionKind, ContractSnapshot, LifecycleReading, PendingAction, Session, SyncError,
    UiState,
};

/// Everything the UI state machine needs, captured at one instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncView {
    pub session: Session,
    pub snapshot: ContractSnapshot,
    /// False until the first successful read of the connection
    pub has_snapshot: bool,
    pub pending: Option<PendingAction>,
}

impl SyncView {
    pub fn ui_state(&self) -> UiState {
        render(&self.session, &self.snapshot, self.pending.as_ref())
    }
}

impl Default for SyncView {
    fn default() -> Self {
        Self {
            session: Session::default(),
            snapshot: ContractSnapshot::default(),
            has_snapshot: false,
            pending: None,
        }
    }
}

/// Sequence number of an issued read
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReadTicket(u64);

/// Conditions a write must still satisfy when it lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyGuard {
    pub connection: u64,
    /// Set for writes issued by polling tasks
    pub poll_epoch: Option<u64>,
}

impl ApplyGuard {
    pub fn connection(connection: u64) -> Self {
        Self {
            connection,
            poll_epoch: None,
        }
    }

    pub fn poll(connection: u64, poll_epoch: u64) -> Self {
        Self {
            connection,
            poll_epoch: Some(poll_epoch),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    view: SyncView,
    lifecycle_seq: u64,
    supply_seq: u64,
    connection: u64,
    poll_epoch: u64,
}

impl Inner {
    fn admits(&self, guard: ApplyGuard) -> bool {
        guard.connection == self.connection
            && guard.poll_epoch.map_or(true, |epoch| epoch == self.poll_epoch)
    }
}

#[derive(Debug)]
pub struct StateStore {
    inner: RwLock<Inner>,
    next_seq: AtomicU64,
    next_action_id: AtomicU64,
    updates: watch::Sender<SyncView>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        let (updates, _) = watch::channel(SyncView::default());
        Self {
            inner: RwLock::new(Inner::default()),
            next_seq: AtomicU64::new(1),
            next_action_id: AtomicU64::new(1),
            updates,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, inner: &Inner) {
        self.updates.send_replace(inner.view.clone());
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncView> {
        self.updates.subscribe()
    }

    pub fn view(&self) -> SyncView {
        self.read().view.clone()
    }

    pub fn session(&self) -> Session {
        self.read().view.session
    }

    pub fn snapshot(&self) -> ContractSnapshot {
        self.read().view.snapshot
    }

    pub fn pending(&self) -> Option<PendingAction> {
        self.read().view.pending
    }

    // === Sequencing ===

    pub fn issue_read(&self) -> ReadTicket {
        ReadTicket(self.next_seq.fetch_add(1, Ordering::SeqCst))
    }

    pub fn connection_generation(&self) -> u64 {
        self.read().connection
    }

    pub fn poll_epoch(&self) -> u64 {
        self.read().poll_epoch
    }

    /// Reject writes from every task started under the current epoch
    pub fn bump_poll_epoch(&self) -> u64 {
        let mut inner = self.write();
        inner.poll_epoch += 1;
        inner.poll_epoch
    }

    // === Session (resolver) ===

    /// Mark the wallet connected, unless the connection was torn down
    /// while `generation` was being resolved
    ///
    /// Returns whether this created a new session.
    pub fn connect_session(
        &self,
        generation: u64,
        address: Option<Address>,
    ) -> Result<bool, SyncError> {
        let mut inner = self.write();
        if inner.connection != generation {
            return Err(SyncError::StaleHandle);
        }
        let session = inner.view.session;
        if session.wallet_connected && session.address == address {
            return Ok(false);
        }
        let newly = !session.wallet_connected;
        let owner = inner.view.snapshot.owner;
        inner.view.session = Session::connected(address).with_owner(owner);
        self.publish(&inner);
        Ok(newly)
    }

    /// Succeeds only while a session is open and `generation` is current
    pub fn require_session(&self, generation: u64) -> Result<(), SyncError> {
        let inner = self.read();
        if inner.connection != generation || !inner.view.session.wallet_connected {
            return Err(SyncError::StaleHandle);
        }
        Ok(())
    }

    /// Invalidate every handle issued so far without touching the session
    pub fn invalidate_handles(&self) {
        self.write().connection += 1;
    }

    /// Tear down the session; outstanding handles become stale
    pub fn disconnect(&self) {
        let mut inner = self.write();
        inner.connection += 1;
        inner.poll_epoch += 1;
        inner.view = SyncView::default();
        self.publish(&inner);
    }

    // === Snapshot (reader) ===

    /// Apply a complete snapshot; each field group only if newer
    pub fn apply_snapshot(
        &self,
        guard: ApplyGuard,
        ticket: ReadTicket,
        snapshot: &ContractSnapshot,
    ) -> bool {
        let mut inner = self.write();
        if !inner.admits(guard) {
            debug!(seq = ticket.0, "dropping snapshot from a torn-down connection");
            return false;
        }
        let mut next = inner.view.snapshot;
        let mut applied = false;
        if ticket.0 > inner.lifecycle_seq {
            next = next.with_lifecycle(&snapshot.lifecycle());
            inner.lifecycle_seq = ticket.0;
            applied = true;
        }
        if ticket.0 > inner.supply_seq {
            next = next.with_token_ids(snapshot.token_ids_minted);
            inner.supply_seq = ticket.0;
            applied = true;
        }
        if !applied {
            debug!(seq = ticket.0, "discarding out-of-order snapshot");
            return false;
        }
        self.commit(&mut inner, next);
        true
    }

    pub fn apply_lifecycle(
        &self,
        guard: ApplyGuard,
        ticket: ReadTicket,
        reading: &LifecycleReading,
    ) -> bool {
        let mut inner = self.write();
        if !inner.admits(guard) {
            return false;
        }
        if ticket.0 <= inner.lifecycle_seq {
            debug!(seq = ticket.0, "discarding out-of-order lifecycle reading");
            return false;
        }
        inner.lifecycle_seq = ticket.0;
        let next = inner.view.snapshot.with_lifecycle(reading);
        self.commit(&mut inner, next);
        true
    }

    pub fn apply_token_ids(&self, guard: ApplyGuard, ticket: ReadTicket, token_ids: u64) -> bool {
        let mut inner = self.write();
        if !inner.admits(guard) {
            return false;
        }
        if ticket.0 <= inner.supply_seq {
            debug!(seq = ticket.0, "discarding out-of-order token count");
            return false;
        }
        inner.supply_seq = ticket.0;
        let next = inner.view.snapshot.with_token_ids(token_ids);
        self.commit(&mut inner, next);
        true
    }

    fn commit(&self, inner: &mut Inner, snapshot: ContractSnapshot) {
        inner.view.session = inner.view.session.with_owner(snapshot.owner);
        inner.view.snapshot = snapshot;
        inner.view.has_snapshot = true;
        self.publish(inner);
    }

    // === Pending action (executor) ===

    /// Reserve the single in-flight slot
    pub fn claim_pending(&self, kind: ActionKind) -> Result<PendingAction, SyncError> {
        let mut inner = self.write();
        if let Some(existing) = inner.view.pending {
            return Err(SyncError::CallerMisuse(format!(
                "{kind} requested while {} is still pending",
                existing.kind
            )));
        }
        let pending = PendingAction {
            id: self.next_action_id.fetch_add(1, Ordering::SeqCst),
            kind,
            tx_hash: None,
            started_at: Instant::now(),
        };
        inner.view.pending = Some(pending);
        self.publish(&inner);
        Ok(pending)
    }

    pub fn mark_submitted(&self, id: u64, tx_hash: B256) -> Option<PendingAction> {
        let mut inner = self.write();
        let pending = inner.view.pending.as_mut().filter(|p| p.id == id)?;
        pending.tx_hash = Some(tx_hash);
        let pending = *pending;
        self.publish(&inner);
        Some(pending)
    }

    /// Free the slot if it still belongs to action `id`
    pub fn release_pending(&self, id: u64) {
        let mut inner = self.write();
        if inner.view.pending.is_some_and(|p| p.id == id) {
            inner.view.pending = None;
            self.publish(&inner);
        }
    }
}

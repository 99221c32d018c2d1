//! Contract state reads
//!
//! Readers only fetch and normalize; the caller decides where a result is
//! applied. Combined reads are all-or-nothing: a single failed call fails
//! the whole reading and nothing partial escapes.

use alloy::primitives::{Address, Bytes};
use futures::try_join;

use crate::domain::snapshot::{counter_to_u64, is_same_address};
use crate::domain::{has_ended, unix_now, ContractSnapshot, LifecycleReading, SyncError};
use crate::infrastructure::ethereum::contract::{
    decode_owner, decode_presale_ended, decode_presale_started, decode_token_ids,
};
use crate::infrastructure::ethereum::{ContractRead, PresaleContract};
use crate::sync::resolver::ConnectionHandle;

pub struct StateReader {
    contract: PresaleContract,
    clock: fn() -> u64,
}

impl StateReader {
    pub fn new(contract: PresaleContract) -> Self {
        Self::with_clock(contract, unix_now)
    }

    /// Reader with an injected wall clock (unix seconds)
    pub fn with_clock(contract: PresaleContract, clock: fn() -> u64) -> Self {
        Self { contract, clock }
    }

    async fn call(&self, handle: &ConnectionHandle, read: ContractRead) -> Result<Bytes, SyncError> {
        let wallet = handle.wallet()?;
        wallet
            .call(self.contract.read_request(read))
            .await
            .map_err(|err| SyncError::ReadFailed(format!("{}: {err:#}", read.name())))
    }

    fn malformed(read: ContractRead, err: alloy::sol_types::Error) -> SyncError {
        SyncError::ReadFailed(format!("{}: malformed reply: {err}", read.name()))
    }

    pub async fn read_presale_started(&self, handle: &ConnectionHandle) -> Result<bool, SyncError> {
        let data = self.call(handle, ContractRead::PresaleStarted).await?;
        decode_presale_started(&data).map_err(|err| Self::malformed(ContractRead::PresaleStarted, err))
    }

    /// Raw presale end timestamp (unix seconds)
    pub async fn read_presale_ends_at(&self, handle: &ConnectionHandle) -> Result<u64, SyncError> {
        let data = self.call(handle, ContractRead::PresaleEnded).await?;
        decode_presale_ended(&data)
            .map(counter_to_u64)
            .map_err(|err| Self::malformed(ContractRead::PresaleEnded, err))
    }

    pub async fn read_owner_address(&self, handle: &ConnectionHandle) -> Result<Address, SyncError> {
        let data = self.call(handle, ContractRead::Owner).await?;
        decode_owner(&data).map_err(|err| Self::malformed(ContractRead::Owner, err))
    }

    /// Whether `current` owns the contract
    pub async fn read_owner(
        &self,
        handle: &ConnectionHandle,
        current: Option<Address>,
    ) -> Result<bool, SyncError> {
        let owner = self.read_owner_address(handle).await?;
        Ok(is_same_address(current, owner))
    }

    pub async fn read_token_ids(&self, handle: &ConnectionHandle) -> Result<u64, SyncError> {
        let data = self.call(handle, ContractRead::TokenIds).await?;
        decode_token_ids(&data)
            .map(counter_to_u64)
            .map_err(|err| Self::malformed(ContractRead::TokenIds, err))
    }

    /// Presale-lifecycle poll: `presaleStarted`, then `owner` while it has
    /// not started or `presaleEnded` once it has
    pub async fn read_lifecycle(&self, handle: &ConnectionHandle) -> Result<LifecycleReading, SyncError> {
        let presale_started = self.read_presale_started(handle).await?;
        if !presale_started {
            let owner = self.read_owner_address(handle).await?;
            return Ok(LifecycleReading {
                presale_started,
                presale_ended: false,
                presale_ends_at: None,
                owner: Some(owner),
            });
        }
        let ends_at = self.read_presale_ends_at(handle).await?;
        Ok(LifecycleReading {
            presale_started,
            presale_ended: has_ended(ends_at, (self.clock)()),
            presale_ends_at: Some(ends_at),
            owner: None,
        })
    }

    /// Full snapshot; ownership is only resolved before the presale starts
    pub async fn read_snapshot(&self, handle: &ConnectionHandle) -> Result<ContractSnapshot, SyncError> {
        let presale_started = self.read_presale_started(handle).await?;
        let owner = async {
            if presale_started {
                Ok(None)
            } else {
                self.read_owner_address(handle).await.map(Some)
            }
        };
        let (owner, presale_ends_at, token_ids_minted) = try_join!(
            owner,
            self.read_presale_ends_at(handle),
            self.read_token_ids(handle)
        )?;

        Ok(ContractSnapshot {
            presale_started,
            presale_ended: presale_started && has_ended(presale_ends_at, (self.clock)()),
            presale_ends_at,
            owner,
            token_ids_minted,
        })
    }
}

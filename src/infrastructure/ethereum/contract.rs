//! Typed bindings for the presale NFT contract
//!
//! Calls are ABI-encoded here and sent through a [`WalletProvider`], so the
//! contract never sees an untyped reply shape.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::domain::ActionKind;

sol! {
    #[allow(missing_docs)]
    interface ICryptoDevs {
        function owner() external view returns (address);
        function presaleStarted() external view returns (bool);
        function presaleEnded() external view returns (uint256);
        function tokenIds() external view returns (uint256);

        function startPresale() external;
        function presaleMint() external payable;
        function mint() external payable;
    }
}

/// Remote reads exposed by the contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractRead {
    Owner,
    PresaleStarted,
    PresaleEnded,
    TokenIds,
}

impl ContractRead {
    pub fn name(self) -> &'static str {
        match self {
            ContractRead::Owner => "owner",
            ContractRead::PresaleStarted => "presaleStarted",
            ContractRead::PresaleEnded => "presaleEnded",
            ContractRead::TokenIds => "tokenIds",
        }
    }

    pub fn selector(self) -> [u8; 4] {
        match self {
            ContractRead::Owner => ICryptoDevs::ownerCall::SELECTOR,
            ContractRead::PresaleStarted => ICryptoDevs::presaleStartedCall::SELECTOR,
            ContractRead::PresaleEnded => ICryptoDevs::presaleEndedCall::SELECTOR,
            ContractRead::TokenIds => ICryptoDevs::tokenIdsCall::SELECTOR,
        }
    }

    /// Match calldata back to a read, by its 4-byte selector
    pub fn from_calldata(input: &[u8]) -> Option<Self> {
        let selector: [u8; 4] = input.get(..4)?.try_into().ok()?;
        [
            ContractRead::Owner,
            ContractRead::PresaleStarted,
            ContractRead::PresaleEnded,
            ContractRead::TokenIds,
        ]
        .into_iter()
        .find(|read| read.selector() == selector)
    }
}

/// Handle on the deployed contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresaleContract {
    address: Address,
}

impl PresaleContract {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// `eth_call` request for a read
    pub fn read_request(&self, read: ContractRead) -> TransactionRequest {
        let input: Vec<u8> = match read {
            ContractRead::Owner => ICryptoDevs::ownerCall {}.abi_encode(),
            ContractRead::PresaleStarted => ICryptoDevs::presaleStartedCall {}.abi_encode(),
            ContractRead::PresaleEnded => ICryptoDevs::presaleEndedCall {}.abi_encode(),
            ContractRead::TokenIds => ICryptoDevs::tokenIdsCall {}.abi_encode(),
        };
        TransactionRequest::default()
            .with_to(self.address)
            .with_input(Bytes::from(input))
    }

    /// Transaction request for a mutating action sent from `from`
    pub fn action_request(&self, kind: ActionKind, from: Address, value: U256) -> TransactionRequest {
        let input: Vec<u8> = match kind {
            ActionKind::StartPresale => ICryptoDevs::startPresaleCall {}.abi_encode(),
            ActionKind::PresaleMint => ICryptoDevs::presaleMintCall {}.abi_encode(),
            ActionKind::PublicMint => ICryptoDevs::mintCall {}.abi_encode(),
        };
        let request = TransactionRequest::default()
            .with_from(from)
            .with_to(self.address)
            .with_input(Bytes::from(input));
        if kind.is_payable() {
            request.with_value(value)
        } else {
            request
        }
    }
}

pub fn decode_owner(data: &[u8]) -> Result<Address, alloy::sol_types::Error> {
    ICryptoDevs::ownerCall::abi_decode_returns(data)
}

pub fn decode_presale_started(data: &[u8]) -> Result<bool, alloy::sol_types::Error> {
    ICryptoDevs::presaleStartedCall::abi_decode_returns(data)
}

pub fn decode_presale_ended(data: &[u8]) -> Result<U256, alloy::sol_types::Error> {
    ICryptoDevs::presaleEndedCall::abi_decode_returns(data)
}

pub fn decode_token_ids(data: &[u8]) -> Result<U256, alloy::sol_types::Error> {
    ICryptoDevs::tokenIdsCall::abi_decode_returns(data)
}

/// ABI-encode return values, as a node would reply to `eth_call`
pub mod reply {
    use alloy::primitives::{Address, Bytes, U256};
    use alloy::sol_types::SolValue;

    pub fn address(value: Address) -> Bytes {
        value.abi_encode().into()
    }

    pub fn boolean(value: bool) -> Bytes {
        value.abi_encode().into()
    }

    pub fn uint(value: U256) -> Bytes {
        value.abi_encode().into()
    }
}

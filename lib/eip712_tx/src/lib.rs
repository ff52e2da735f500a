//! Serialization of the zkSync EIP-712 transaction envelope.
//!
//! The crate turns a structured transaction description into the canonical
//! `0x71`-prefixed byte sequence that doubles as the signing preimage (when
//! no signature material is supplied) and as the broadcastable payload (once
//! it is). Signing, hashing and transport live elsewhere; this layer only
//! maps records to bytes and back.

pub use zksync_basic_types::{web3, Address, Bytes, H160, H256, L2ChainId, U256, U64};

pub mod transaction_request;

pub use crate::transaction_request::{
    Eip712Meta, EncodingError, MetaError, PaymasterParams, TransactionRequest,
};

/// Denotes the first byte of the special zkSync's EIP-712-signed transaction.
pub const EIP_712_TX_TYPE: u8 = 0x71;

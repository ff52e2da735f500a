//! The EIP-712 (`0x71`) transaction envelope and its RLP assembly.
//!
//! The envelope is a fixed 11-slot RLP list prefixed with the raw type byte.
//! Scalar slots use minimal big-endian encoding (zero is the empty string);
//! the two 20-byte slots (`to` and the reserved slot) never collapse. Absent
//! optional metadata always occupies its slot as an empty string or an empty
//! list, so every encoding has the same top-level shape.

use std::convert::TryFrom;

use rlp::{DecoderError, Rlp, RlpStream};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Address, Bytes, L2ChainId, U256, EIP_712_TX_TYPE};

/// Number of top-level slots in the envelope's RLP list.
const ENVELOPE_FIELDS: usize = 11;

/// Violation of the co-presence rules between optional metadata fields.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetaError {
    /// Paymaster params must carry a non-zero address together with a
    /// non-empty input; anything else is partial presence.
    #[error("malformed paymaster params")]
    PartialPaymasterParams,
    /// A paymaster claims the reserved slot, so a non-zero `reserved` value
    /// would be silently dropped from the wire.
    #[error("reserved value conflicts with paymaster params")]
    ReservedSlotConflict,
    #[error("factory dependency #{0} is empty")]
    EmptyFactoryDep(usize),
}

/// Structural failure while assembling or parsing the envelope. No output
/// bytes are ever produced for an invalid transaction.
#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("transaction type is not supported")]
    UnknownTransactionFormat,
    #[error("invalid `to` address: expected 20 bytes, got {0}")]
    MalformedToAddress(usize),
    #[error("reserved value does not fit into the 20-byte slot")]
    ReservedTooWide,
    #[error("wrong chain id {0}")]
    WrongChainId(u64),
    #[error("decodeRlpError {0}")]
    DecodeRlp(#[from] DecoderError),
    #[error(transparent)]
    Meta(#[from] MetaError),
}

/// Fee-abstraction parameters: the sponsoring account and the opaque input
/// passed to it. Always travel together.
#[derive(Default, Serialize, Deserialize, Clone, PartialEq, Debug, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymasterParams {
    pub paymaster: Address,
    pub paymaster_input: Vec<u8>,
}

/// Rollup-specific extension fields of the envelope.
#[derive(Default, Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Meta {
    /// Caps gas chargeable per byte of published data.
    pub gas_per_pubdata: U256,
    /// Protocol-evolution slot, encoded as a fixed-width 20-byte value. The
    /// paymaster address overlays this slot when fee abstraction is used,
    /// which is why the two cannot be combined.
    #[serde(default)]
    pub reserved: U256,
    /// Bytecodes the transaction may deploy, placed verbatim in a nested
    /// list. Entries are never empty.
    #[serde(default)]
    pub factory_deps: Vec<Vec<u8>>,
    /// Overrides the externally supplied signature bytes when present and
    /// non-empty (custom-account signature schemes).
    pub custom_signature: Option<Vec<u8>>,
    pub paymaster_params: Option<PaymasterParams>,
}

impl Eip712Meta {
    /// Checks the invariants that cannot be expressed in the types.
    pub fn validate(&self) -> Result<(), MetaError> {
        for (i, dep) in self.factory_deps.iter().enumerate() {
            if dep.is_empty() {
                return Err(MetaError::EmptyFactoryDep(i));
            }
        }
        if let Some(params) = &self.paymaster_params {
            if params.paymaster.is_zero() || params.paymaster_input.is_empty() {
                return Err(MetaError::PartialPaymasterParams);
            }
            if !self.reserved.is_zero() {
                return Err(MetaError::ReservedSlotConflict);
            }
        }
        Ok(())
    }
}

/// Sender-independent description of an EIP-712 transaction.
///
/// All fields are plain data; the struct is immutable for the purposes of
/// encoding and can be shared freely between threads.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct TransactionRequest {
    pub nonce: U256,
    /// Fee per unit of gas.
    pub gas_price: U256,
    /// Gas limit.
    pub gas: U256,
    /// Explicit 20-byte target; contract deployments go through the deployer
    /// system contract rather than a null `to`.
    pub to: Address,
    pub value: U256,
    /// Opaque call data or deployment payload.
    pub input: Bytes,
    pub chain_id: L2ChainId,
    pub eip712_meta: Eip712Meta,
}

impl TransactionRequest {
    /// Serializes the transaction into the full envelope: the RLP list
    /// prefixed with the raw `0x71` byte.
    ///
    /// With no signature material supplied (neither `signature` here nor
    /// `custom_signature` in the meta) the result is the signing preimage.
    /// Encoding is deterministic and performs no I/O.
    pub fn encode(&self, signature: Option<&[u8]>) -> Result<Vec<u8>, EncodingError> {
        let mut stream = RlpStream::new();
        self.rlp(&mut stream, signature)?;
        let mut data = stream.out().to_vec();
        data.insert(0, EIP_712_TX_TYPE);
        Ok(data)
    }

    /// Appends the 11-slot envelope list to `rlp`.
    pub fn rlp(
        &self,
        rlp: &mut RlpStream,
        signature: Option<&[u8]>,
    ) -> Result<(), EncodingError> {
        let meta = &self.eip712_meta;
        meta.validate()?;
        let reserved_slot = self.reserved_slot()?;

        rlp.begin_list(ENVELOPE_FIELDS);
        rlp.append(&self.nonce);
        rlp.append(&self.gas_price);
        rlp.append(&self.gas);
        rlp.append(&self.to.as_bytes());
        rlp.append(&self.value);
        rlp.append(&self.input.0);
        rlp.append(&self.chain_id.as_u64());
        rlp.append(&reserved_slot.as_bytes());
        rlp.append(&meta.gas_per_pubdata);
        rlp.begin_list(meta.factory_deps.len());
        for dep in &meta.factory_deps {
            rlp.append(&dep.as_slice());
        }
        self.extension_rlp(rlp, signature);
        Ok(())
    }

    /// Effective signature bytes: a non-empty `custom_signature` always wins
    /// over the externally supplied blob. This is the single place where the
    /// override is applied.
    pub fn get_signature(&self, external: Option<&[u8]>) -> Option<Vec<u8>> {
        if let Some(custom_sig) = &self.eip712_meta.custom_signature {
            if !custom_sig.is_empty() {
                return Some(custom_sig.clone());
            }
        }
        external.filter(|sig| !sig.is_empty()).map(<[u8]>::to_vec)
    }

    /// Parses an envelope produced by [`Self::encode`]. A non-empty recovered
    /// signature lands in `custom_signature`, so re-encoding the result
    /// reproduces the input byte-for-byte.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EncodingError> {
        match bytes.first() {
            Some(&EIP_712_TX_TYPE) => {}
            _ => return Err(EncodingError::UnknownTransactionFormat),
        }
        let rlp = Rlp::new(&bytes[1..]);
        if rlp.item_count()? != ENVELOPE_FIELDS {
            return Err(DecoderError::RlpIncorrectListLen.into());
        }

        let to: Vec<u8> = rlp.val_at(3)?;
        if to.len() != 20 {
            return Err(EncodingError::MalformedToAddress(to.len()));
        }
        let raw_chain_id: u64 = rlp.val_at(6)?;
        let chain_id = L2ChainId::try_from(raw_chain_id)
            .map_err(|_| EncodingError::WrongChainId(raw_chain_id))?;
        let reserved_slot: Address = rlp.val_at(7)?;

        let extension = rlp.at(10)?;
        let (custom_signature, paymaster_input) = match extension.item_count()? {
            0 => (None, None),
            2 => {
                let signature: Vec<u8> = extension.val_at(0)?;
                let input: Vec<u8> = extension.val_at(1)?;
                (
                    (!signature.is_empty()).then_some(signature),
                    (!input.is_empty()).then_some(input),
                )
            }
            _ => return Err(MetaError::PartialPaymasterParams.into()),
        };

        // The reserved slot carries the paymaster address exactly when a
        // paymaster input is present; otherwise it is the `reserved` value.
        let (reserved, paymaster_params) = match paymaster_input {
            Some(paymaster_input) => (
                U256::zero(),
                Some(PaymasterParams {
                    paymaster: reserved_slot,
                    paymaster_input,
                }),
            ),
            None => (U256::from_big_endian(reserved_slot.as_bytes()), None),
        };

        let eip712_meta = Eip712Meta {
            gas_per_pubdata: rlp.val_at(8)?,
            reserved,
            factory_deps: rlp.list_at(9)?,
            custom_signature,
            paymaster_params,
        };
        eip712_meta.validate()?;

        Ok(Self {
            nonce: rlp.val_at(0)?,
            gas_price: rlp.val_at(1)?,
            gas: rlp.val_at(2)?,
            to: Address::from_slice(&to),
            value: rlp.val_at(4)?,
            input: Bytes(rlp.val_at(5)?),
            chain_id,
            eip712_meta,
        })
    }

    /// The 20-byte slot shared between `reserved` and the paymaster address.
    fn reserved_slot(&self) -> Result<Address, EncodingError> {
        let meta = &self.eip712_meta;
        if let Some(params) = &meta.paymaster_params {
            return Ok(params.paymaster);
        }
        if meta.reserved.bits() > 160 {
            return Err(EncodingError::ReservedTooWide);
        }
        let mut word = [0u8; 32];
        meta.reserved.to_big_endian(&mut word);
        Ok(Address::from_slice(&word[12..]))
    }

    /// Final slot: empty list without signature material and paymaster,
    /// otherwise the `[signature, paymaster_input]` pair with empty strings
    /// for the absent halves.
    fn extension_rlp(&self, rlp: &mut RlpStream, signature: Option<&[u8]>) {
        let signature = self.get_signature(signature);
        let paymaster_input = self
            .eip712_meta
            .paymaster_params
            .as_ref()
            .map(|params| params.paymaster_input.as_slice());

        if signature.is_none() && paymaster_input.is_none() {
            rlp.begin_list(0);
            return;
        }
        rlp.begin_list(2);
        match &signature {
            Some(sig) => rlp.append(&sig.as_slice()),
            None => rlp.append(&""),
        };
        match paymaster_input {
            Some(input) => rlp.append(&input),
            None => rlp.append(&""),
        };
    }
}

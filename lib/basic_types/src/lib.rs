//! The declaration of the most primitive types used in the zkSync network.
//!
//! Most of them are just re-exported from the `web3` crate.

use std::{convert::TryFrom, fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize};

pub use web3;
pub use web3::{
    ethabi,
    types::{Address, Bytes, H160, H256, U256, U64},
};

/// ChainId of an L2 zkSync network.
///
/// The value is kept under 2^53 - 1 so that it survives JSON tooling which
/// represents integers as IEEE-754 doubles, and zero is rejected since the
/// transaction envelope relies on a real network id.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct L2ChainId(u64);

impl L2ChainId {
    /// The maximum value of the L2 chain ID.
    // `2^53 - 1` is the maximum safe integer in JS.
    pub const fn max() -> u64 {
        (1 << 53) - 1
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for L2ChainId {
    fn default() -> Self {
        Self(270)
    }
}

impl fmt::Display for L2ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u64> for L2ChainId {
    type Error = String;

    fn try_from(val: u64) -> Result<Self, Self::Error> {
        if val == 0 {
            return Err("L2ChainId must be positive".into());
        }
        if val > L2ChainId::max() {
            return Err(format!(
                "Cannot convert given value {} into L2ChainId. It's greater than MAX: {}",
                val,
                L2ChainId::max()
            ));
        }
        Ok(L2ChainId(val))
    }
}

impl FromStr for L2ChainId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .parse::<u64>()
            .map_err(|err| format!("Failed to parse L2ChainId: {err}"))?;
        Self::try_from(value)
    }
}

impl From<u32> for L2ChainId {
    // Infallible: `u32::MAX` is below `L2ChainId::max()`.
    fn from(value: u32) -> Self {
        Self(u64::from(value))
    }
}

impl<'de> Deserialize<'de> for L2ChainId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u64::deserialize(deserializer)?;
        Self::try_from(value).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_chain_id_from_str() {
        assert_eq!(L2ChainId::from_str("270").unwrap().as_u64(), 270);
        assert!(L2ChainId::from_str("0").is_err());
        assert!(L2ChainId::from_str("chain").is_err());
        assert!(L2ChainId::from_str(&u64::MAX.to_string()).is_err());
    }

    #[test]
    fn l2_chain_id_deserialization_bounds() {
        let chain_id: L2ChainId = serde_json::from_str("324").unwrap();
        assert_eq!(chain_id.as_u64(), 324);

        let too_big = serde_json::from_str::<L2ChainId>("9007199254740992");
        assert!(too_big.is_err());
        let zero = serde_json::from_str::<L2ChainId>("0");
        assert!(zero.is_err());
    }

    #[test]
    fn l2_chain_id_default_is_era_testnet() {
        assert_eq!(L2ChainId::default().as_u64(), 270);
    }
}

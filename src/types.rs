/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines the call context handed to contract entry points.
//!
//! These are value objects: the VM serializes them to JSON into guest memory once per entry-point
//! call and never interprets their content.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Env describes the chain environment a contract call runs in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Env {
    pub block: BlockInfo,
    /// Information about the transaction, absent when the contract is executed outside of a transaction (e.g. queries).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<TransactionInfo>,
    pub contract: ContractInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub height: u64,
    pub time: Timestamp,
    pub chain_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInfo {
    /// Position of the transaction in the block.
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInfo {
    pub address: String,
}

/// MessageInfo is the additional information sent along with execute and instantiate messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageInfo {
    pub sender: String,
    pub funds: Vec<Coin>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    /// Decimal string, so that amounts beyond what JSON numbers can carry survive the round trip.
    pub amount: String,
}

impl Coin {
    pub fn new(amount: u128, denom: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.to_string(),
        }
    }
}

/// Nanoseconds since the UNIX epoch. Serialized as a decimal string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn from_nanos(nanos: u64) -> Self {
        Timestamp(nanos)
    }

    pub fn from_seconds(seconds: u64) -> Self {
        Timestamp(seconds.saturating_mul(1_000_000_000))
    }

    pub fn nanos(&self) -> u64 {
        self.0
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<u64>()
            .map(Timestamp)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_json_shape() {
        let env = Env {
            block: BlockInfo {
                height: 12_345,
                time: Timestamp::from_seconds(1_571_797_419),
                chain_id: "cosmos-testnet-14002".to_string(),
            },
            transaction: None,
            contract: ContractInfo {
                address: "cosmos1contract".to_string(),
            },
        };
        let json = serde_json::to_string(&env).unwrap();
        assert_eq!(
            json,
            r#"{"block":{"height":12345,"time":"1571797419000000000","chain_id":"cosmos-testnet-14002"},"contract":{"address":"cosmos1contract"}}"#
        );
        assert_eq!(serde_json::from_str::<Env>(&json).unwrap(), env);
    }

    #[test]
    fn coin_amount_is_string() {
        let info = MessageInfo {
            sender: "cosmos1sender".to_string(),
            funds: vec![Coin::new(1_000, "uatom")],
        };
        assert_eq!(
            serde_json::to_value(&info).unwrap(),
            serde_json::json!({"sender": "cosmos1sender", "funds": [{"denom": "uatom", "amount": "1000"}]})
        );
    }
}

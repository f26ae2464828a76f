/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines the size bounds enforced at the host/guest boundary and the configuration of a [VmInstance](crate::VmInstance).

/// Maximum length of a storage key.
pub const MAX_LENGTH_DB_KEY: usize = 64 * 1024;
/// Maximum length of a storage value.
pub const MAX_LENGTH_DB_VALUE: usize = 128 * 1024;
/// Maximum length of a canonical (binary) address.
pub const MAX_LENGTH_CANONICAL_ADDRESS: usize = 64;
/// Maximum length of a human readable (bech32) address.
pub const MAX_LENGTH_HUMAN_ADDRESS: usize = 256;

pub const MAX_LENGTH_ED25519_SIGNATURE: usize = 64;
pub const MAX_LENGTH_ED25519_MESSAGE: usize = 128 * 1024;
pub const EDDSA_PUBKEY_LEN: usize = 32;

/// Gas limit handed to the querier on every `query_chain` call.
pub const QUERY_GAS_LIMIT: u64 = 100_000;

/// Metering points given to a freshly built instance unless configured otherwise.
pub const DEFAULT_GAS_LIMIT: u64 = 100_000_000_000;

/// VmConfig carries the knobs an embedder may set when constructing a VM instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmConfig {
    /// Metering points available to the guest module over the lifetime of the instance.
    pub gas_limit: u64,
    /// Gas limit passed to [Querier::query_raw](crate::backend::Querier::query_raw).
    pub query_gas_limit: u64,
    /// Whether guest debug output is also emitted through the `log` facade.
    pub debug_to_log: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            gas_limit: DEFAULT_GAS_LIMIT,
            query_gas_limit: QUERY_GAS_LIMIT,
            debug_to_log: true,
        }
    }
}

impl VmConfig {
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }
}

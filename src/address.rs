/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Address codec behind the `addr_*` host functions.
//!
//! Mapping between canonical and human addresses is delegated to the [BackendApi]. Validation is
//! done here: a human address is valid if decoding it from bech32 and encoding the carried bytes
//! again with the chain's prefix reproduces the input exactly.

use bech32::{FromBase32, ToBase32, Variant};
use log::warn;

use crate::backend::BackendApi;
use crate::config::{MAX_LENGTH_CANONICAL_ADDRESS, MAX_LENGTH_HUMAN_ADDRESS};
use crate::contract::FuncError;

/// Canonical form of a human readable address, as given by the backend.
pub fn canonicalize<A: BackendApi + ?Sized>(api: &A, source: &[u8]) -> Result<Vec<u8>, FuncError> {
    let human = human_str(source)?;
    Ok(api.canonical_address(human)?)
}

/// Human readable form of a canonical address, as given by the backend.
pub fn humanize<A: BackendApi + ?Sized>(api: &A, source: &[u8]) -> Result<String, FuncError> {
    if source.is_empty() {
        return Err(FuncError::Validation("Empty address.".to_string()));
    }
    if source.len() > MAX_LENGTH_CANONICAL_ADDRESS {
        return Err(FuncError::Validation(format!(
            "Canonical address length {} exceeds maximum length {}",
            source.len(),
            MAX_LENGTH_CANONICAL_ADDRESS
        )));
    }
    Ok(api.human_address(source)?)
}

/// Checks that `source` is a normalized bech32 address carrying `prefix`.
pub fn validate(prefix: &str, source: &[u8]) -> Result<(), FuncError> {
    let human = human_str(source)?;

    let invalid = |reason: String| {
        warn!(target: "contract_vm::address", "addr_validate: {human}: {reason}");
        FuncError::Validation(format!("Invalid address: {human}"))
    };

    let (_, words, _) = bech32::decode(human).map_err(|e| invalid(e.to_string()))?;
    let canonical = Vec::<u8>::from_base32(&words).map_err(|e| invalid(e.to_string()))?;
    if canonical.is_empty() {
        return Err(invalid("no data".to_string()));
    }

    let normalized =
        bech32::encode(prefix, canonical.to_base32(), Variant::Bech32).map_err(|e| invalid(e.to_string()))?;
    if normalized != human {
        return Err(invalid(format!("normalizes to {normalized}")));
    }
    Ok(())
}

fn human_str(source: &[u8]) -> Result<&str, FuncError> {
    if source.is_empty() {
        return Err(FuncError::Validation("Empty address.".to_string()));
    }
    if source.len() > MAX_LENGTH_HUMAN_ADDRESS {
        return Err(FuncError::Validation(format!(
            "Address length {} exceeds maximum length {}",
            source.len(),
            MAX_LENGTH_HUMAN_ADDRESS
        )));
    }
    std::str::from_utf8(source).map_err(|_| FuncError::Validation("Address is not valid UTF-8".to_string()))
}

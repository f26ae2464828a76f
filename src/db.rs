/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Storage and iterator adapter: the backend facing half of the `db_*` host functions.
//!
//! Bounds are enforced here, before the storage is touched. Iterator state lives in the
//! [Storage] implementation; this module only translates ids and records into bytes.

use log::debug;

use crate::backend::{Order, Record, Storage};
use crate::config::{MAX_LENGTH_DB_KEY, MAX_LENGTH_DB_VALUE};
use crate::contract::FuncError;
use crate::sections::encode_sections;

/// Returned by [next] once the iterator is exhausted: an empty key and an empty value.
pub const EXHAUSTED_RECORD: [u8; 8] = [0u8; 8];

pub fn read<S: Storage + ?Sized>(storage: &S, key: &[u8]) -> Result<Option<Vec<u8>>, FuncError> {
    check_key(key)?;
    let value = storage.get(key)?;
    if value.is_none() {
        debug!(target: "contract_vm::db", "db_read: key not found: {}", String::from_utf8_lossy(key));
    }
    Ok(value)
}

pub fn write<S: Storage + ?Sized>(storage: &mut S, key: &[u8], value: &[u8]) -> Result<(), FuncError> {
    if value.len() > MAX_LENGTH_DB_VALUE {
        return Err(FuncError::Validation(format!(
            "Value length {} exceeds maximum length {}",
            value.len(),
            MAX_LENGTH_DB_VALUE
        )));
    }
    check_key(key)?;
    storage.set(key, value)?;
    Ok(())
}

pub fn remove<S: Storage + ?Sized>(storage: &mut S, key: &[u8]) -> Result<(), FuncError> {
    storage.remove(key)?;
    Ok(())
}

/// Opens an iterator and returns its id.
pub fn scan<S: Storage + ?Sized>(
    storage: &mut S,
    start: Option<&[u8]>,
    end: Option<&[u8]>,
    order: i32,
) -> Result<Vec<u8>, FuncError> {
    let order = Order::try_from(order).map_err(|e| FuncError::Validation(e.to_string()))?;
    Ok(storage.scan(start, end, order)?)
}

/// Advances the iterator and returns the encoded record, or [EXHAUSTED_RECORD].
pub fn next<S: Storage + ?Sized>(storage: &mut S, iterator_id: &[u8]) -> Result<Vec<u8>, FuncError> {
    match storage.next(iterator_id)? {
        Some(record) => Ok(encode_record(&record)),
        None => {
            debug!(target: "contract_vm::db", "db_next: iterator {:?} exhausted", iterator_id);
            Ok(EXHAUSTED_RECORD.to_vec())
        }
    }
}

/// Encodes a record as `key ‖ len(key) ‖ value ‖ len(value)`, lengths as 4-byte big-endian integers.
pub fn encode_record(record: &Record) -> Vec<u8> {
    encode_sections(&[&record.key, &record.value])
}

fn check_key(key: &[u8]) -> Result<(), FuncError> {
    if key.len() > MAX_LENGTH_DB_KEY {
        return Err(FuncError::Validation(format!(
            "Key length {} exceeds maximum length {}",
            key.len(),
            MAX_LENGTH_DB_KEY
        )));
    }
    Ok(())
}

/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! In-memory implementations of the [Backend](crate::backend::Backend) collaborators, for tests and local tooling.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use bech32::{FromBase32, ToBase32, Variant};

use crate::backend::{Backend, BackendApi, BackendError, BackendResult, Order, Querier, Record, Storage};

/// Bech32 prefix used by [MockApi::default].
pub const MOCK_BECH32_PREFIX: &str = "cosmos";

/// MockStorage keeps data in a [BTreeMap]. Iterators take a snapshot of the requested range when opened
/// and are dropped once exhausted.
#[derive(Default, Debug)]
pub struct MockStorage {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
    iterators: HashMap<u32, MockIterator>,
    next_iterator_id: u32,
}

#[derive(Debug)]
struct MockIterator {
    records: Vec<Record>,
    position: usize,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Storage for MockStorage {
    fn get(&self, key: &[u8]) -> BackendResult<Option<Vec<u8>>> {
        Ok(self.data.get(key).cloned())
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> BackendResult<()> {
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &[u8]) -> BackendResult<()> {
        self.data.remove(key);
        Ok(())
    }

    fn scan(&mut self, start: Option<&[u8]>, end: Option<&[u8]>, order: Order) -> BackendResult<Vec<u8>> {
        let lower = start.map_or(Bound::Unbounded, |s| Bound::Included(s.to_vec()));
        let upper = end.map_or(Bound::Unbounded, |e| Bound::Excluded(e.to_vec()));

        // BTreeMap::range panics on inverted ranges, which simply select nothing here
        let empty_range = matches!((start, end), (Some(s), Some(e)) if s >= e);
        let mut records: Vec<Record> = if empty_range {
            Vec::new()
        } else {
            self.data
                .range((lower, upper))
                .map(|(k, v)| Record::new(k.clone(), v.clone()))
                .collect()
        };
        if order == Order::Descending {
            records.reverse();
        }

        let id = self.next_iterator_id;
        self.next_iterator_id = id
            .checked_add(1)
            .ok_or_else(|| BackendError::unknown("iterator ids exhausted"))?;
        self.iterators.insert(id, MockIterator { records, position: 0 });

        Ok(id.to_be_bytes().to_vec())
    }

    fn next(&mut self, iterator_id: &[u8]) -> BackendResult<Option<Record>> {
        let id = iterator_id
            .try_into()
            .map(u32::from_be_bytes)
            .map_err(|_| BackendError::IteratorDoesNotExist {
                id: format!("{iterator_id:?}"),
            })?;
        let Some(iterator) = self.iterators.get_mut(&id) else {
            // ids below the counter were handed out and have since been exhausted
            return if id < self.next_iterator_id {
                Ok(None)
            } else {
                Err(BackendError::IteratorDoesNotExist { id: id.to_string() })
            };
        };

        let record = iterator.records.get(iterator.position).cloned();
        match record {
            Some(_) => iterator.position += 1,
            None => {
                self.iterators.remove(&id);
            }
        }
        Ok(record)
    }
}

/// MockApi treats the bytes carried by a bech32 string as the canonical address.
#[derive(Debug, Clone)]
pub struct MockApi {
    prefix: String,
}

impl MockApi {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    /// Encodes canonical bytes the way [BackendApi::human_address] does, for building fixtures.
    pub fn addr_make(&self, canonical: &[u8]) -> BackendResult<String> {
        self.human_address(canonical)
    }
}

impl Default for MockApi {
    fn default() -> Self {
        Self::new(MOCK_BECH32_PREFIX)
    }
}

impl BackendApi for MockApi {
    fn canonical_address(&self, human: &str) -> BackendResult<Vec<u8>> {
        let (hrp, words, variant) =
            bech32::decode(human).map_err(|e| BackendError::user_err(format!("Invalid address: {e}")))?;
        if hrp != self.prefix {
            return Err(BackendError::user_err(format!("Wrong address prefix {hrp}")));
        }
        if variant != Variant::Bech32 {
            return Err(BackendError::user_err("Address is not bech32 encoded"));
        }
        let canonical = Vec::<u8>::from_base32(&words)
            .map_err(|e| BackendError::user_err(format!("Invalid address data: {e}")))?;
        if canonical.is_empty() {
            return Err(BackendError::user_err("Empty address data"));
        }
        Ok(canonical)
    }

    fn human_address(&self, canonical: &[u8]) -> BackendResult<String> {
        if canonical.is_empty() {
            return Err(BackendError::user_err("Empty canonical address"));
        }
        bech32::encode(&self.prefix, canonical.to_base32(), Variant::Bech32)
            .map_err(|e| BackendError::unknown(e.to_string()))
    }

    fn bech32_prefix(&self) -> &str {
        &self.prefix
    }
}

type Responder = Box<dyn Fn(&[u8]) -> BackendResult<Vec<u8>> + Send + Sync>;

/// MockQuerier answers every query with a programmable responder. By default it echoes the request.
pub struct MockQuerier {
    responder: Responder,
}

impl MockQuerier {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&[u8]) -> BackendResult<Vec<u8>> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
        }
    }
}

impl Default for MockQuerier {
    fn default() -> Self {
        Self::new(|request| Ok(request.to_vec()))
    }
}

impl Querier for MockQuerier {
    fn query_raw(&self, request: &[u8], _gas_limit: u64) -> BackendResult<Vec<u8>> {
        (self.responder)(request)
    }
}

/// Backend with empty storage, the default bech32 prefix and an echoing querier.
pub fn mock_backend() -> Backend<MockStorage, MockApi, MockQuerier> {
    Backend::new(MockStorage::default(), MockApi::default(), MockQuerier::default())
}

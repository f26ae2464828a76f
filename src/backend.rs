/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines the external collaborators a VM instance is bound to.
//!
//! A [Backend] is the injected triple of capabilities the host functions rely on:
//! - [Storage]: key-value access and iteration scoped to the running contract,
//! - [BackendApi]: mapping between canonical and human readable addresses,
//! - [Querier]: forwarding of opaque queries to the chain.
//!
//! None of them are implemented by this crate (see [testing](crate::testing) for in-memory mocks).

/// A key/value pair produced by an iterator step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Record {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Iteration order of [Storage::scan]. The discriminants are the values passed by the guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ascending = 1,
    Descending = 2,
}

impl TryFrom<i32> for Order {
    type Error = BackendError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Order::Ascending),
            2 => Ok(Order::Descending),
            _ => Err(BackendError::user_err(format!("Invalid order value {value}"))),
        }
    }
}

/// BackendError describes failures raised by the injected collaborators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The caller supplied input the backend refuses, e.g. an address of the wrong chain.
    #[error("User error: {msg}")]
    UserErr { msg: String },

    #[error("Iterator with id {id} does not exist")]
    IteratorDoesNotExist { id: String },

    #[error("Unknown backend error: {msg}")]
    Unknown { msg: String },
}

impl BackendError {
    pub fn user_err(msg: impl Into<String>) -> Self {
        BackendError::UserErr { msg: msg.into() }
    }

    pub fn unknown(msg: impl Into<String>) -> Self {
        BackendError::Unknown { msg: msg.into() }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Storage is the contract scoped key-value store. Iterators are owned by the storage and
/// identified by the opaque id returned from [Storage::scan].
pub trait Storage {
    fn get(&self, key: &[u8]) -> BackendResult<Option<Vec<u8>>>;

    fn set(&mut self, key: &[u8], value: &[u8]) -> BackendResult<()>;

    /// Removes the key. Removing an absent key is a no-op.
    fn remove(&mut self, key: &[u8]) -> BackendResult<()>;

    /// Opens an iterator over the half-open range `[start, end)`. `None` leaves that side unbounded.
    fn scan(&mut self, start: Option<&[u8]>, end: Option<&[u8]>, order: Order) -> BackendResult<Vec<u8>>;

    /// Advances the iterator. Returns `None` once it is exhausted, and keeps doing so afterwards.
    fn next(&mut self, iterator_id: &[u8]) -> BackendResult<Option<Record>>;
}

/// BackendApi translates between the two representations of an address.
pub trait BackendApi {
    fn canonical_address(&self, human: &str) -> BackendResult<Vec<u8>>;

    fn human_address(&self, canonical: &[u8]) -> BackendResult<String>;

    /// Human readable part used when encoding addresses of this chain.
    fn bech32_prefix(&self) -> &str;
}

/// Querier answers queries issued by contracts against the rest of the chain.
pub trait Querier {
    /// Executes the serialized request and returns the serialized response.
    fn query_raw(&self, request: &[u8], gas_limit: u64) -> BackendResult<Vec<u8>>;
}

/// Backend bundles the collaborators handed to a VM instance once, for its whole lifetime.
pub struct Backend<S, A, Q> {
    pub storage: S,
    pub api: A,
    pub querier: Q,
}

impl<S, A, Q> Backend<S, A, Q>
where
    S: Storage,
    A: BackendApi,
    Q: Querier,
{
    pub fn new(storage: S, api: A, querier: Q) -> Self {
        Self {
            storage,
            api,
            querier,
        }
    }
}

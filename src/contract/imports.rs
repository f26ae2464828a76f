/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definition of the host functions that are imported by contract modules.
//!
//! Every argument suffixed with `_ptr` is a pointer to a region descriptor in guest memory
//! (see [Region](crate::contract::wasmer::memory::Region)). Host functions returning data allocate a
//! fresh region through the guest allocator and return its pointer; pointer `0` means "no data".

use wasmer::{imports, Function, ImportObject, Store};

use crate::backend::BackendError;

/// Names of the imports bound in the `env` namespace, in the order of the table below.
pub const IMPORT_NAMES: [&str; 15] = [
    "db_read",
    "db_write",
    "db_remove",
    "db_scan",
    "db_next",
    "addr_humanize",
    "addr_canonicalize",
    "addr_validate",
    "secp256k1_verify",
    "secp256k1_recover_pubkey",
    "ed25519_verify",
    "ed25519_batch_verify",
    "debug",
    "query_chain",
    "abort",
];

/// HostFunctionTable defines the interface of host functions used in [wasmer::WasmerEnv].
/// The Importable resource that is provided to the Wasm module during instantiation exposes exactly these functions.
pub trait HostFunctionTable<T>
where
    T: wasmer::WasmerEnv,
{
    /// Reads the value stored under a key. Returns `0` if the key does not exist.
    fn db_read(env: &T, key_ptr: u32) -> Result<u32, FuncError>;

    /// Inserts or replaces the value stored under a key.
    fn db_write(env: &T, key_ptr: u32, value_ptr: u32) -> Result<(), FuncError>;

    /// Removes a key. Removing an absent key is a no-op.
    fn db_remove(env: &T, key_ptr: u32) -> Result<(), FuncError>;

    /// Opens an iterator over `[start, end)` and returns a region holding its id.
    /// - `start_ptr` / `end_ptr` may be `0` for an unbounded side.
    /// - `order` is 1 for ascending, 2 for descending.
    fn db_scan(env: &T, start_ptr: u32, end_ptr: u32, order: i32) -> Result<u32, FuncError>;

    /// Advances an iterator. Returns a region with the encoded record, or eight zero bytes once exhausted.
    fn db_next(env: &T, iterator_id_ptr: u32) -> Result<u32, FuncError>;

    /// Writes the human readable form of a canonical address into `destination_ptr`.
    /// Returns `0` on success, otherwise a pointer to an error message.
    fn addr_humanize(env: &T, source_ptr: u32, destination_ptr: u32) -> Result<u32, FuncError>;

    /// Writes the canonical form of a human readable address into `destination_ptr`.
    /// Returns `0` on success, otherwise a pointer to an error message.
    fn addr_canonicalize(env: &T, source_ptr: u32, destination_ptr: u32) -> Result<u32, FuncError>;

    /// Checks that an address is valid bech32 of this chain in normalized form. Returns `0`.
    fn addr_validate(env: &T, source_ptr: u32) -> Result<u32, FuncError>;

    /// Returns `0` if the ECDSA (secp256k1) signature over the hash is valid for the public key, `1` otherwise.
    fn secp256k1_verify(env: &T, hash_ptr: u32, signature_ptr: u32, pubkey_ptr: u32) -> Result<u32, FuncError>;

    /// Recovers the uncompressed public key. The region pointer is carried in the low 32 bits.
    fn secp256k1_recover_pubkey(
        env: &T,
        hash_ptr: u32,
        signature_ptr: u32,
        recovery_param: u32,
    ) -> Result<u64, FuncError>;

    /// Returns `0` if the Ed25519 signature over the message is valid for the public key, `1` otherwise.
    fn ed25519_verify(env: &T, message_ptr: u32, signature_ptr: u32, pubkey_ptr: u32) -> Result<u32, FuncError>;

    /// Batch form of [ed25519_verify](HostFunctionTable::ed25519_verify). Each argument packs several
    /// buffers with the section encoding. Returns `0` only if every signature verifies.
    fn ed25519_batch_verify(
        env: &T,
        messages_ptr: u32,
        signatures_ptr: u32,
        pubkeys_ptr: u32,
    ) -> Result<u32, FuncError>;

    /// Appends a UTF-8 message to the debug log of the instance.
    fn debug(env: &T, message_ptr: u32) -> Result<(), FuncError>;

    /// Forwards a serialized query to the chain and returns a region with the serialized response.
    fn query_chain(env: &T, request_ptr: u32) -> Result<u32, FuncError>;

    /// Terminates the current call with the UTF-8 message.
    fn abort(env: &T, message_ptr: u32) -> Result<(), FuncError>;
}

/// Create importable for instantiation of contract module.
pub(crate) fn create_importable<'a, T, K>(store: &'a Store, env: &T) -> Importable<'a>
where
    T: wasmer::WasmerEnv + 'static,
    K: HostFunctionTable<T> + 'static,
{
    Importable(
        imports! {
            "env" => {
                "db_read" => Function::new_native_with_env(store, env.clone(), K::db_read),
                "db_write" => Function::new_native_with_env(store, env.clone(), K::db_write),
                "db_remove" => Function::new_native_with_env(store, env.clone(), K::db_remove),
                "db_scan" => Function::new_native_with_env(store, env.clone(), K::db_scan),
                "db_next" => Function::new_native_with_env(store, env.clone(), K::db_next),

                "addr_humanize" => Function::new_native_with_env(store, env.clone(), K::addr_humanize),
                "addr_canonicalize" => Function::new_native_with_env(store, env.clone(), K::addr_canonicalize),
                "addr_validate" => Function::new_native_with_env(store, env.clone(), K::addr_validate),

                "secp256k1_verify" => Function::new_native_with_env(store, env.clone(), K::secp256k1_verify),
                "secp256k1_recover_pubkey" => Function::new_native_with_env(store, env.clone(), K::secp256k1_recover_pubkey),
                "ed25519_verify" => Function::new_native_with_env(store, env.clone(), K::ed25519_verify),
                "ed25519_batch_verify" => Function::new_native_with_env(store, env.clone(), K::ed25519_batch_verify),

                "debug" => Function::new_native_with_env(store, env.clone(), K::debug),
                "query_chain" => Function::new_native_with_env(store, env.clone(), K::query_chain),
                "abort" => Function::new_native_with_env(store, env.clone(), K::abort),
            }
        },
        store,
    )
}

/// Importable is data object required to instantiate contract module
pub(crate) struct Importable<'a>(pub(crate) ImportObject, #[allow(dead_code)] &'a Store);

/// FuncError defines the error returns from execution of host functions
#[derive(Debug, thiserror::Error)]
pub enum FuncError {
    /// Length, emptiness or format violation of guest supplied data.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The guest requested termination of the call.
    #[error("Aborted: {0}")]
    Aborted(String),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Region could not be read, written or allocated.
    #[error("Memory error: {0}")]
    Memory(String),

    #[error("Runtime")]
    Runtime(anyhow::Error),
}

impl From<wasmer::RuntimeError> for FuncError {
    fn from(e: wasmer::RuntimeError) -> Self {
        Self::Runtime(e.into())
    }
}

impl From<anyhow::Error> for FuncError {
    fn from(e: anyhow::Error) -> Self {
        Self::Runtime(e)
    }
}

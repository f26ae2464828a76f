/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines environment used for constructing the Wasm (specifically Wasmer) instance.
//!
//! The environment (HostEnv) is cloned into every imported host function. All clones share the
//! backend, the debug log and the cryptographic verifier; the guest exports are initialized by
//! Wasmer on each clone when the instance is created.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use wasmer::{LazyInit, Memory, NativeFunc};

use crate::backend::{Backend, BackendApi, Querier, Storage};
use crate::config::VmConfig;
use crate::contract::FuncError;
use crate::crypto::CryptoVerifier;

use super::memory::MemoryContext;

/// HostEnv provides the functions in the import table (which are in turn 'imported' by WASM smart contracts)
/// access to the backend and the instance state that cannot cross the host-WASM barrier.
#[derive(wasmer::WasmerEnv)]
pub(crate) struct HostEnv<S, A, Q>
where
    S: Storage + Send + 'static,
    A: BackendApi + Send + 'static,
    Q: Querier + Send + 'static,
{
    /// Injected storage, address api and querier.
    pub backend: Arc<Mutex<Backend<S, A, Q>>>,

    /// Ordered log of messages the guest emitted through `debug`.
    pub debug_messages: Arc<Mutex<Vec<String>>>,

    /// Signature verification provider, constructed once per VM instance.
    pub verifier: Arc<CryptoVerifier>,

    pub config: VmConfig,

    #[wasmer(export)]
    pub memory: LazyInit<Memory>,

    #[wasmer(export(name = "allocate"))]
    pub allocate: LazyInit<NativeFunc<u32, u32>>,

    #[wasmer(export(name = "deallocate"))]
    pub deallocate: LazyInit<NativeFunc<u32, ()>>,
}

impl<S, A, Q> HostEnv<S, A, Q>
where
    S: Storage + Send + 'static,
    A: BackendApi + Send + 'static,
    Q: Querier + Send + 'static,
{
    pub fn new(backend: Backend<S, A, Q>, config: VmConfig) -> Self {
        HostEnv {
            backend: Arc::new(Mutex::new(backend)),
            debug_messages: Arc::new(Mutex::new(Vec::new())),
            verifier: Arc::new(CryptoVerifier::new()),
            config,
            memory: LazyInit::default(),
            allocate: LazyInit::default(),
            deallocate: LazyInit::default(),
        }
    }

    /// Lock the backend. A poisoned lock is recovered since the backend carries no invariant of ours.
    pub fn backend(&self) -> MutexGuard<'_, Backend<S, A, Q>> {
        self.backend.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push_debug_message(&self, message: String) {
        self.debug_messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }

    pub fn debug_messages(&self) -> Vec<String> {
        self.debug_messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_debug_messages(&self) {
        self.debug_messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

// Clone by hand: a derived impl would demand `Clone` from the backend collaborators, while
// every clone only shares them through the `Arc`.
impl<S, A, Q> Clone for HostEnv<S, A, Q>
where
    S: Storage + Send + 'static,
    A: BackendApi + Send + 'static,
    Q: Querier + Send + 'static,
{
    fn clone(&self) -> Self {
        HostEnv {
            backend: Arc::clone(&self.backend),
            debug_messages: Arc::clone(&self.debug_messages),
            verifier: Arc::clone(&self.verifier),
            config: self.config.clone(),
            memory: self.memory.clone(),
            allocate: self.allocate.clone(),
            deallocate: self.deallocate.clone(),
        }
    }
}

impl<S, A, Q> MemoryContext for HostEnv<S, A, Q>
where
    S: Storage + Send + 'static,
    A: BackendApi + Send + 'static,
    Q: Querier + Send + 'static,
{
    fn get_memory(&self) -> Result<&Memory, FuncError> {
        self.memory_ref()
            .ok_or_else(|| FuncError::Memory("guest memory is not initialized".to_string()))
    }

    fn get_allocate(&self) -> Result<NativeFunc<u32, u32>, FuncError> {
        self.allocate_ref()
            .cloned()
            .ok_or_else(|| FuncError::Memory("guest allocator is not initialized".to_string()))
    }

    fn get_deallocate(&self) -> Result<NativeFunc<u32, ()>, FuncError> {
        self.deallocate_ref()
            .cloned()
            .ok_or_else(|| FuncError::Memory("guest deallocator is not initialized".to_string()))
    }
}

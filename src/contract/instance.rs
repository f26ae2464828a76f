/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines [VmInstance], the host side of one contract module: it builds the module against the import
//! table and drives the entry points `instantiate`, `execute`, `query`, `migrate` and `reply`.
//!
//! A VmInstance moves through three states:
//!
//! ```text
//! Uninitialized --compile--> Built --instantiate--> Ready
//! ```
//!
//! A module is built at most once per VmInstance. Entry points can be called any number of times once
//! the instance is Ready; every call serializes its arguments to JSON and copies each of them into a
//! fresh guest region. The region an entry point returns is only a pointer: its descriptor is read
//! from guest memory when the result is decoded.

use std::sync::MutexGuard;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use log::debug;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    backend::{Backend, BackendApi, Querier, Storage},
    config::VmConfig,
    contract::{create_importable, host_functions::ContractHostFunctions, MethodCallError},
    error::VmError,
    types::{Env, MessageInfo},
};

use super::wasmer::{
    env::HostEnv,
    instance::Instance,
    memory::{MemoryContext, Region},
    module::Module,
    store::instantiate_store,
};

/// Lifecycle state of a [VmInstance].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    /// No module has been built yet.
    Uninitialized,
    /// The module compiled but was rejected afterwards (missing exports or failed instantiation).
    Built,
    /// The module is instantiated and its entry points can be called.
    Ready,
}

/// VmInstance binds one contract module to one [Backend] for its whole lifetime.
pub struct VmInstance<S, A, Q>
where
    S: Storage + Send + 'static,
    A: BackendApi + Send + 'static,
    Q: Querier + Send + 'static,
{
    environment: HostEnv<S, A, Q>,
    store: wasmer::Store,
    state: VmState,
    instance: Option<Instance>,
}

impl<S, A, Q> VmInstance<S, A, Q>
where
    S: Storage + Send + 'static,
    A: BackendApi + Send + 'static,
    Q: Querier + Send + 'static,
{
    pub fn new(backend: Backend<S, A, Q>, config: VmConfig) -> Self {
        let store = instantiate_store(config.gas_limit);
        Self {
            environment: HostEnv::new(backend, config),
            store,
            state: VmState::Uninitialized,
            instance: None,
        }
    }

    pub fn state(&self) -> VmState {
        self.state
    }

    /// Compiles `bytecode`, checks that it exports `memory`, `allocate` and `deallocate`, and
    /// instantiates it against the import table.
    ///
    /// Entry-point exports are looked up on call, so a module exporting only some of them is
    /// accepted.
    pub fn build(&mut self, bytecode: &[u8]) -> Result<(), VmError> {
        if self.state != VmState::Uninitialized {
            return Err(VmError::AlreadyBuilt);
        }

        let module = Module::from_wasm_bytecode(bytecode, &self.store)?;
        self.state = VmState::Built;
        module.validate_exports()?;

        let importable =
            create_importable::<HostEnv<S, A, Q>, ContractHostFunctions>(&self.store, &self.environment);
        let instance = module
            .instantiate(&importable, self.environment.config.gas_limit)
            .map_err(|e| VmError::Instantiation(e.to_string()))?;

        debug!(target: "contract_vm::instance", "module built, {} metering points", instance.remaining_points());
        self.instance = Some(instance);
        self.state = VmState::Ready;
        Ok(())
    }

    /* ↓↓↓ Entry points ↓↓↓ */

    pub fn instantiate<M: Serialize>(&mut self, env: &Env, info: &MessageInfo, msg: &M) -> Result<Region, VmError> {
        let args = [to_json(env)?, to_json(info)?, to_json(msg)?];
        self.call_entrypoint("instantiate", &args)
    }

    pub fn execute<M: Serialize>(&mut self, env: &Env, info: &MessageInfo, msg: &M) -> Result<Region, VmError> {
        let args = [to_json(env)?, to_json(info)?, to_json(msg)?];
        self.call_entrypoint("execute", &args)
    }

    pub fn query<M: Serialize>(&mut self, env: &Env, msg: &M) -> Result<Region, VmError> {
        let args = [to_json(env)?, to_json(msg)?];
        self.call_entrypoint("query", &args)
    }

    pub fn migrate<M: Serialize>(&mut self, env: &Env, msg: &M) -> Result<Region, VmError> {
        let args = [to_json(env)?, to_json(msg)?];
        self.call_entrypoint("migrate", &args)
    }

    pub fn reply<M: Serialize>(&mut self, env: &Env, msg: &M) -> Result<Region, VmError> {
        let args = [to_json(env)?, to_json(msg)?];
        self.call_entrypoint("reply", &args)
    }

    fn call_entrypoint(&mut self, name: &str, args: &[Vec<u8>]) -> Result<Region, VmError> {
        let instance = self.ready_instance()?;

        let mut arg_ptrs = Vec::with_capacity(args.len());
        for arg in args {
            let region = instance.allocate_bytes(arg).map_err(|e| {
                if instance.remaining_points() == 0 {
                    VmError::GasExhausted
                } else {
                    VmError::from(e)
                }
            })?;
            arg_ptrs.push(region.ptr);
        }

        debug!(target: "contract_vm::instance", "calling {name}");
        let result_ptr = instance.call_entrypoint(name, &arg_ptrs).map_err(|e| {
            if let MethodCallError::NoExportedMethod(_) = e {
                VmError::MissingExport(name.to_string())
            } else {
                VmError::from(e)
            }
        })?;

        Ok(Region::at(result_ptr))
    }

    /* ↓↓↓ Guest memory ↓↓↓ */

    /// Allocates a region of `size` bytes through the guest allocator.
    pub fn allocate(&self, size: usize) -> Result<Region, VmError> {
        Ok(self.ready_instance()?.allocate(size)?)
    }

    pub fn deallocate(&self, region: Region) -> Result<(), VmError> {
        Ok(self.ready_instance()?.deallocate(region)?)
    }

    pub fn allocate_bytes(&self, data: &[u8]) -> Result<Region, VmError> {
        Ok(self.ready_instance()?.allocate_bytes(data)?)
    }

    pub fn allocate_str(&self, text: &str) -> Result<Region, VmError> {
        self.allocate_bytes(text.as_bytes())
    }

    pub fn allocate_json<T: Serialize>(&self, value: &T) -> Result<Region, VmError> {
        self.allocate_bytes(&to_json(value)?)
    }

    /// Decodes standard base64 and copies the bytes into a new region.
    pub fn allocate_b64(&self, b64: &str) -> Result<Region, VmError> {
        let bytes = BASE64
            .decode(b64)
            .map_err(|e| VmError::Serialization(format!("invalid base64: {e}")))?;
        self.allocate_bytes(&bytes)
    }

    /// Reads the region descriptor at `ptr`. Pointer `0` yields the sentinel region.
    pub fn region(&self, ptr: u32) -> Result<Region, VmError> {
        let region = self.ready_instance()?.optional_region(ptr)?;
        Ok(region.unwrap_or_else(Region::null))
    }

    /// Copies `data` into an existing region and refreshes `region` from its descriptor. Fails if the
    /// data exceeds the region's capacity.
    pub fn write_bytes(&self, region: &mut Region, data: &[u8]) -> Result<(), VmError> {
        let instance = self.ready_instance()?;
        let mut current = instance.region(region.ptr)?;
        instance.write_region_bytes(&mut current, data)?;
        *region = current;
        Ok(())
    }

    /// Copies the bytes of a region out of guest memory. The descriptor is read and checked at this
    /// point, so a malformed result region fails here rather than in the entry point call.
    pub fn read_bytes(&self, region: &Region) -> Result<Vec<u8>, VmError> {
        let instance = self.ready_instance()?;
        match instance.optional_region(region.ptr)? {
            Some(current) => Ok(instance.read_region_bytes(&current)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn read_str(&self, region: &Region) -> Result<String, VmError> {
        String::from_utf8(self.read_bytes(region)?).map_err(|e| VmError::Serialization(e.to_string()))
    }

    pub fn read_json<T: DeserializeOwned>(&self, region: &Region) -> Result<T, VmError> {
        Ok(serde_json::from_slice(&self.read_bytes(region)?)?)
    }

    /* ↓↓↓ Instance state ↓↓↓ */

    /// Messages emitted by the guest through `debug`, in order.
    pub fn debug_messages(&self) -> Vec<String> {
        self.environment.debug_messages()
    }

    pub fn clear_debug_messages(&self) {
        self.environment.clear_debug_messages()
    }

    /// Metering points left, `None` until the instance is Ready.
    pub fn remaining_gas(&self) -> Option<u64> {
        self.instance.as_ref().map(Instance::remaining_points)
    }

    pub fn set_remaining_gas(&mut self, gas: u64) -> Result<(), VmError> {
        self.ready_instance()?.set_remaining_points(gas);
        Ok(())
    }

    /// Access to the injected backend, e.g. to inspect storage after a call.
    pub fn backend(&self) -> MutexGuard<'_, Backend<S, A, Q>> {
        self.environment.backend()
    }

    fn ready_instance(&self) -> Result<&Instance, VmError> {
        self.instance.as_ref().ok_or(VmError::NotReady)
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, VmError> {
    Ok(serde_json::to_vec(value)?)
}

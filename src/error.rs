/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! error defines the faults that can surface out of a VM instance, from building the module
//! to any of its entry-point calls.

use crate::backend::BackendError;
use crate::contract::{FuncError, MethodCallError, ModuleBuildError};

/// Descriptive error definitions of a VM instance.
///
/// Verification outcomes of the cryptographic host functions are never errors: they are returned to the
/// guest as `0`/`1`. A missing storage key is not an error either.
#[derive(Debug, thiserror::Error)]
pub enum VmError {
    /// Length, emptiness or format violation detected at the host/guest boundary.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The guest called `abort`.
    #[error("Aborted: {0}")]
    GuestAbort(String),

    /// Failure of the injected storage, address api or querier.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Metering points ran out during the call.
    #[error("Gas exhausted")]
    GasExhausted,

    /// Region dereference, allocation or capacity violation in guest memory.
    #[error("Memory error: {0}")]
    Memory(String),

    /// Call context or result could not be converted from/to JSON.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An entry point or memory helper was used before the module was built.
    #[error("Instance is not ready, build a module first")]
    NotReady,

    /// A module was already built on this instance.
    #[error("A module is already built on this instance")]
    AlreadyBuilt,

    /// Bytecode cannot be compiled (it is probably invalid WASM).
    #[error("Cannot compile module: {0}")]
    Compile(String),

    #[error("Cannot instantiate module: {0}")]
    Instantiation(String),

    /// The module does not export a required function or memory.
    #[error("Missing export: {0}")]
    MissingExport(String),

    /// Trap raised by the guest itself (e.g. `unreachable`).
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl From<FuncError> for VmError {
    fn from(func_error: FuncError) -> Self {
        match func_error {
            FuncError::Validation(msg) => VmError::Validation(msg),
            FuncError::Aborted(msg) => VmError::GuestAbort(msg),
            FuncError::Backend(e) => VmError::Backend(e),
            FuncError::Memory(msg) => VmError::Memory(msg),
            FuncError::Runtime(e) => VmError::Runtime(format!("{e:#}")),
        }
    }
}

impl From<MethodCallError> for VmError {
    fn from(call_error: MethodCallError) -> Self {
        match call_error {
            MethodCallError::GasExhaustion => VmError::GasExhausted,
            MethodCallError::NoExportedMethod(e) => VmError::MissingExport(e.to_string()),
            MethodCallError::Runtime(e) => {
                // errors raised by host functions travel through the trap as user errors
                match e.downcast::<FuncError>() {
                    Ok(func_error) => func_error.into(),
                    Err(e) => VmError::Runtime(e.to_string()),
                }
            }
        }
    }
}

impl From<ModuleBuildError> for VmError {
    fn from(build_error: ModuleBuildError) -> Self {
        match build_error {
            ModuleBuildError::Compile(msg) => VmError::Compile(msg),
            ModuleBuildError::MissingExport(name) => VmError::MissingExport(name),
        }
    }
}

impl From<serde_json::Error> for VmError {
    fn from(e: serde_json::Error) -> Self {
        VmError::Serialization(e.to_string())
    }
}

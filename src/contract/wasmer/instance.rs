/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines a struct containing [wasmer::Instance] to call the exported entry points of a contract.

use wasmer::{Memory, NativeFunc, RuntimeError, Val};
use wasmer_middlewares::metering::{get_remaining_points, set_remaining_points, MeteringPoints};

use crate::contract::FuncError;

use super::memory::MemoryContext;

/// Instance represents a stateful instance of a WebAssembly module (quasi-process) ready for entry-point calls.
pub(crate) struct Instance(pub(crate) wasmer::Instance);

impl Instance {
    /// call_entrypoint executes the named export with region pointers as arguments and returns the
    /// result pointer.
    ///
    /// If the call terminated early, it returns a MethodCallError describing the cause. Exhausted
    /// metering points take precedence over whatever trap the guest raised.
    pub(crate) fn call_entrypoint(&self, name: &str, args: &[u32]) -> Result<u32, MethodCallError> {
        let method = self
            .0
            .exports
            .get_function(name)
            .map_err(MethodCallError::NoExportedMethod)?;

        let params: Vec<Val> = args.iter().map(|arg| Val::I32(*arg as i32)).collect();
        let execution_result = method.call(&params);

        match execution_result {
            Ok(results) => match results.first() {
                Some(Val::I32(ptr)) if results.len() == 1 => Ok(*ptr as u32),
                _ => Err(MethodCallError::Runtime(RuntimeError::new(format!(
                    "entry point {name} must return a single region pointer"
                )))),
            },
            Err(_) if self.remaining_points() == 0 => Err(MethodCallError::GasExhaustion),
            Err(e) => Err(MethodCallError::Runtime(e)),
        }
    }

    /// metering points left for this instance
    pub(crate) fn remaining_points(&self) -> u64 {
        match get_remaining_points(&self.0) {
            MeteringPoints::Exhausted => 0,
            MeteringPoints::Remaining(points) => points,
        }
    }

    pub(crate) fn set_remaining_points(&self, points: u64) {
        set_remaining_points(&self.0, points);
    }
}

impl MemoryContext for Instance {
    fn get_memory(&self) -> Result<&Memory, FuncError> {
        self.0
            .exports
            .get_memory("memory")
            .map_err(|e| FuncError::Memory(e.to_string()))
    }

    fn get_allocate(&self) -> Result<NativeFunc<u32, u32>, FuncError> {
        self.0
            .exports
            .get_native_function::<u32, u32>("allocate")
            .map_err(|e| FuncError::Memory(e.to_string()))
    }

    fn get_deallocate(&self) -> Result<NativeFunc<u32, ()>, FuncError> {
        self.0
            .exports
            .get_native_function::<u32, ()>("deallocate")
            .map_err(|e| FuncError::Memory(e.to_string()))
    }
}

/// MethodCallError enumerates through the possible reasons why a call into a contract Instance's exported methods might
/// terminate early.
#[derive(Debug)]
pub enum MethodCallError {
    Runtime(wasmer::RuntimeError),
    GasExhaustion,
    NoExportedMethod(wasmer::ExportError),
}

/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines a struct to use [wasmer::Module] as underlying WASM module to work with compiled contract bytecode.

use wasmer::ExternType;

use crate::contract::Importable;

use super::instance::Instance;

/// Exports every contract module must provide for the host to move data across the boundary.
pub const REQUIRED_EXPORTS: [&str; 3] = ["memory", "allocate", "deallocate"];

/// Module is a structure representing a WebAssembly executable that has been compiled down to architecture-specific
/// machine code in preparation for execution.
pub(crate) struct Module(pub wasmer::Module);

impl Module {
    /// from_wasm_bytecode returns the contract Module produced by compiling the wasm bytecode provided as an argument.
    pub fn from_wasm_bytecode(bytecode: &[u8], wasmer_store: &wasmer::Store) -> Result<Module, ModuleBuildError> {
        wasmer::Module::from_binary(wasmer_store, bytecode)
            .map(Module)
            .map_err(|e| ModuleBuildError::Compile(e.to_string()))
    }

    /// validate_exports checks that the module exports its linear memory and the allocator pair.
    pub fn validate_exports(&self) -> Result<(), ModuleBuildError> {
        for name in REQUIRED_EXPORTS {
            let export = self.0.exports().find(|export| export.name() == name);
            let matches_kind = match (name, export.as_ref().map(|e| e.ty())) {
                ("memory", Some(ExternType::Memory(_))) => true,
                (_, Some(ExternType::Function(_))) => name != "memory",
                _ => false,
            };
            if !matches_kind {
                return Err(ModuleBuildError::MissingExport(name.to_string()));
            }
        }
        Ok(())
    }

    /// instantiate creates a new instance of this contract Module, bound to the import table.
    #[allow(clippy::result_large_err)]
    pub fn instantiate(&self, importable: &Importable, gas_limit: u64) -> Result<Instance, wasmer::InstantiationError> {
        let wasmer_instance = wasmer::Instance::new(&self.0, &importable.0)?;
        // Set the remaining points from metering middleware to wasmer environment
        wasmer_middlewares::metering::set_remaining_points(&wasmer_instance, gas_limit);
        Ok(Instance(wasmer_instance))
    }
}

/// ModuleBuildError enumerates the possible reasons why arbitrary bytecode might fail to become a usable contract module.
#[derive(Debug)]
pub enum ModuleBuildError {
    Compile(String),
    MissingExport(String),
}

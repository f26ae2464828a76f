/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Implementation of Store instantiation with the metering middleware.

use std::sync::Arc;
use wasmer::{CompilerConfig, Store};
use wasmer_compiler_singlepass::Singlepass;
use wasmer_engine_universal::Universal;
use wasmer_middlewares::Metering;

use crate::gas::wasm_opcode_gas_schedule;

/// Instantiate a Store that represents the states that can be manipulated by WASM program.
///
/// Modules compiled against this store carry `gas_limit` metering points; the VM resets them per
/// instance with [set_remaining_points](wasmer_middlewares::metering::set_remaining_points).
pub fn instantiate_store(gas_limit: u64) -> Store {
    let metering = Arc::new(Metering::new(gas_limit, wasm_opcode_gas_schedule));

    // use the Singlepass compiler which is optimised for fast compilation
    let mut compiler_config = Singlepass::new();
    compiler_config.push_middleware(metering);
    let engine = Universal::new(compiler_config).engine();

    Store::new(&engine)
}

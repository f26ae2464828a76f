/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Gas schedule used by the metering middleware compiled into every contract module.
//!
//! The host functions themselves are not charged: their work is bounded by the size limits in
//! [config](crate::config).

use wasmer::wasmparser::Operator;

/// Cost of growing linear memory by any number of pages.
pub const MEMORY_GROW_COST: u64 = 1_000;

/// Cost of calling a function, host or guest.
pub const CALL_COST: u64 = 10;

/// wasm_opcode_gas_schedule maps between a Wasm Operator to the cost of executing it.
pub fn wasm_opcode_gas_schedule(operator: &Operator) -> u64 {
    match operator {
        // Free: constants and pure structure
        Operator::I32Const { .. }
        | Operator::I64Const { .. }
        | Operator::Nop
        | Operator::Block { .. }
        | Operator::End
        | Operator::Else => 0,

        Operator::Call { .. } | Operator::CallIndirect { .. } => CALL_COST,

        Operator::MemoryGrow { .. } => MEMORY_GROW_COST,

        // Memory access
        Operator::I32Load { .. }
        | Operator::I64Load { .. }
        | Operator::I32Load8S { .. }
        | Operator::I32Load8U { .. }
        | Operator::I32Load16S { .. }
        | Operator::I32Load16U { .. }
        | Operator::I64Load8S { .. }
        | Operator::I64Load8U { .. }
        | Operator::I64Load16S { .. }
        | Operator::I64Load16U { .. }
        | Operator::I64Load32S { .. }
        | Operator::I64Load32U { .. }
        | Operator::I32Store { .. }
        | Operator::I64Store { .. }
        | Operator::I32Store8 { .. }
        | Operator::I32Store16 { .. }
        | Operator::I64Store8 { .. }
        | Operator::I64Store16 { .. }
        | Operator::I64Store32 { .. } => 3,

        // Multiplication and division
        Operator::I32Mul
        | Operator::I64Mul
        | Operator::I32DivS
        | Operator::I32DivU
        | Operator::I32RemS
        | Operator::I32RemU
        | Operator::I64DivS
        | Operator::I64DivU
        | Operator::I64RemS
        | Operator::I64RemU => 5,

        _ => 1,
    }
}

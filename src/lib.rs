/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Contract VM is the host side of a WebAssembly smart contract virtual machine. It loads a guest module,
//! binds it to a fixed table of host functions and calls its entry points.
//!
//! ```text
//! embedder --(Env, MessageInfo, msg)--> VmInstance --regions--> guest module
//!                                          |                          |
//!                                          +<----- host functions ----+
//!                                          |
//!                                   Backend { Storage, BackendApi, Querier }
//! ```
//!
//! ### Example
//!
//! ```rust
//! let mut vm = contract_vm::VmInstance::new(contract_vm::testing::mock_backend(), Default::default());
//! vm.build(&wasm_bytecode)?;
//! let result = vm.execute(&env, &info, &msg)?;
//! let response: serde_json::Value = vm.read_json(&result)?;
//! ```
//!
//! Data crosses the host/guest boundary through [Region]s allocated by the guest. Host functions read
//! storage ([db]), convert and validate addresses ([address]), verify signatures ([crypto]), forward
//! queries to the chain and collect guest debug output. Everything the VM needs from the chain is
//! injected as a [Backend]. Execution is metered by the opcode schedule in [gas].

pub mod address;

pub mod backend;
pub use backend::{Backend, BackendApi, BackendError, BackendResult, Order, Querier, Record, Storage};

pub mod config;
pub use config::VmConfig;

pub mod contract;
pub use contract::wasmer::memory::Region;
pub use contract::{VmInstance, VmState};

pub mod crypto;

pub mod db;

pub mod error;
pub use error::VmError;

pub mod gas;

pub mod sections;

pub mod testing;

pub mod types;
pub use types::{BlockInfo, Coin, ContractInfo, Env, MessageInfo, Timestamp, TransactionInfo};

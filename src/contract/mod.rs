/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines types and functions that load a contract module, bind it to the host functions it
//! [imports], and call its entry points through a [VmInstance](instance::VmInstance).
//!
//! The host side of the import table is implemented in [host_functions]. Everything that touches
//! Wasmer directly lives in [wasmer].

pub mod imports;
pub(crate) use imports::*;

pub(crate) mod host_functions;

pub mod instance;
pub use instance::{VmInstance, VmState};

pub mod wasmer;
pub use self::wasmer::instance::MethodCallError;
pub use self::wasmer::module::ModuleBuildError;

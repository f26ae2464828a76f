/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Utilizes [Wasmer](https://wasmer.io/) for contract execution in a Wasm environment.
//!
//! The [instance] is created from a [module] compiled in a gas-metered [store], with host functions
//! sharing one [environment](mod@env). Data crosses the boundary through regions in [memory].

pub mod env;

pub mod memory;

pub mod module;

pub mod store;

pub mod instance;

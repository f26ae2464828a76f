/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Implementation of the host functions in the import table ([HostFunctionTable]).
//!
//! Each function reads its arguments out of guest regions, hands them to the backend facing modules
//! ([db], [address], [crypto]) and copies results back into freshly allocated regions. The backend
//! lock is never held while the guest allocator runs.

use log::{debug, error};

use crate::{
    address,
    backend::{BackendApi, BackendError, Querier, Storage},
    contract::{FuncError, HostFunctionTable},
    crypto::verification_code,
    db,
};

use super::wasmer::{env::HostEnv, memory::MemoryContext};

/// [ContractHostFunctions] implements trait [HostFunctionTable].
pub(crate) struct ContractHostFunctions;

impl<S, A, Q> HostFunctionTable<HostEnv<S, A, Q>> for ContractHostFunctions
where
    S: Storage + Send + 'static,
    A: BackendApi + Send + 'static,
    Q: Querier + Send + 'static,
{
    fn db_read(env: &HostEnv<S, A, Q>, key_ptr: u32) -> Result<u32, FuncError> {
        let key = read_region(env, key_ptr)?;
        let value = db::read(&env.backend().storage, &key)?;
        match value {
            Some(value) => write_to_new_region(env, &value),
            None => Ok(0),
        }
    }

    fn db_write(env: &HostEnv<S, A, Q>, key_ptr: u32, value_ptr: u32) -> Result<(), FuncError> {
        let key = read_region(env, key_ptr)?;
        let value = read_region(env, value_ptr)?;
        db::write(&mut env.backend().storage, &key, &value)
    }

    fn db_remove(env: &HostEnv<S, A, Q>, key_ptr: u32) -> Result<(), FuncError> {
        let key = read_region(env, key_ptr)?;
        db::remove(&mut env.backend().storage, &key)
    }

    fn db_scan(env: &HostEnv<S, A, Q>, start_ptr: u32, end_ptr: u32, order: i32) -> Result<u32, FuncError> {
        let start = read_optional_region(env, start_ptr)?;
        let end = read_optional_region(env, end_ptr)?;
        let iterator_id = db::scan(
            &mut env.backend().storage,
            start.as_deref(),
            end.as_deref(),
            order,
        )?;
        write_to_new_region(env, &iterator_id)
    }

    fn db_next(env: &HostEnv<S, A, Q>, iterator_id_ptr: u32) -> Result<u32, FuncError> {
        let iterator_id = read_region(env, iterator_id_ptr)?;
        let record = db::next(&mut env.backend().storage, &iterator_id)?;
        write_to_new_region(env, &record)
    }

    fn addr_humanize(env: &HostEnv<S, A, Q>, source_ptr: u32, destination_ptr: u32) -> Result<u32, FuncError> {
        let source = read_region(env, source_ptr)?;
        let human = address::humanize(&env.backend().api, &source);
        match human {
            Ok(human) => write_to_destination(env, destination_ptr, human.as_bytes()),
            Err(e) => user_error_to_region(env, e),
        }
    }

    fn addr_canonicalize(env: &HostEnv<S, A, Q>, source_ptr: u32, destination_ptr: u32) -> Result<u32, FuncError> {
        let source = read_region(env, source_ptr)?;
        let canonical = address::canonicalize(&env.backend().api, &source);
        match canonical {
            Ok(canonical) => write_to_destination(env, destination_ptr, &canonical),
            Err(e) => user_error_to_region(env, e),
        }
    }

    fn addr_validate(env: &HostEnv<S, A, Q>, source_ptr: u32) -> Result<u32, FuncError> {
        let source = read_region(env, source_ptr)?;
        let prefix = env.backend().api.bech32_prefix().to_string();
        address::validate(&prefix, &source)?;
        Ok(0)
    }

    fn secp256k1_verify(env: &HostEnv<S, A, Q>, hash_ptr: u32, signature_ptr: u32, pubkey_ptr: u32) -> Result<u32, FuncError> {
        let hash = read_region(env, hash_ptr)?;
        let signature = read_region(env, signature_ptr)?;
        let pubkey = read_region(env, pubkey_ptr)?;
        Ok(verification_code(
            env.verifier.secp256k1_verify(&hash, &signature, &pubkey),
        ))
    }

    fn secp256k1_recover_pubkey(
        env: &HostEnv<S, A, Q>,
        hash_ptr: u32,
        signature_ptr: u32,
        recovery_param: u32,
    ) -> Result<u64, FuncError> {
        let hash = read_region(env, hash_ptr)?;
        let signature = read_region(env, signature_ptr)?;
        let pubkey = env
            .verifier
            .secp256k1_recover_pubkey(&hash, &signature, recovery_param)?;
        Ok(write_to_new_region(env, &pubkey)? as u64)
    }

    fn ed25519_verify(env: &HostEnv<S, A, Q>, message_ptr: u32, signature_ptr: u32, pubkey_ptr: u32) -> Result<u32, FuncError> {
        let message = read_region(env, message_ptr)?;
        let signature = read_region(env, signature_ptr)?;
        let pubkey = read_region(env, pubkey_ptr)?;
        Ok(verification_code(
            env.verifier.ed25519_verify(&message, &signature, &pubkey),
        ))
    }

    fn ed25519_batch_verify(
        env: &HostEnv<S, A, Q>,
        messages_ptr: u32,
        signatures_ptr: u32,
        pubkeys_ptr: u32,
    ) -> Result<u32, FuncError> {
        let messages = read_region(env, messages_ptr)?;
        let signatures = read_region(env, signatures_ptr)?;
        let pubkeys = read_region(env, pubkeys_ptr)?;
        let valid = env
            .verifier
            .ed25519_batch_verify(&messages, &signatures, &pubkeys)?;
        Ok(verification_code(valid))
    }

    fn debug(env: &HostEnv<S, A, Q>, message_ptr: u32) -> Result<(), FuncError> {
        let message = read_text(env, message_ptr)?;
        if env.config.debug_to_log {
            debug!(target: "contract_vm::guest", "{message}");
        }
        env.push_debug_message(message);
        Ok(())
    }

    fn query_chain(env: &HostEnv<S, A, Q>, request_ptr: u32) -> Result<u32, FuncError> {
        let request = read_region(env, request_ptr)?;
        let response = env
            .backend()
            .querier
            .query_raw(&request, env.config.query_gas_limit)?;
        write_to_new_region(env, &response)
    }

    fn abort(env: &HostEnv<S, A, Q>, message_ptr: u32) -> Result<(), FuncError> {
        let message = read_text(env, message_ptr)?;
        error!(target: "contract_vm::guest", "abort: {message}");
        Err(FuncError::Aborted(message))
    }
}

fn read_region<T: MemoryContext>(env: &T, ptr: u32) -> Result<Vec<u8>, FuncError> {
    let region = env.region(ptr)?;
    env.read_region_bytes(&region)
}

fn read_optional_region<T: MemoryContext>(env: &T, ptr: u32) -> Result<Option<Vec<u8>>, FuncError> {
    env.optional_region(ptr)?
        .map(|region| env.read_region_bytes(&region))
        .transpose()
}

// Messages are diagnostic only, invalid UTF-8 is replaced rather than rejected.
fn read_text<T: MemoryContext>(env: &T, ptr: u32) -> Result<String, FuncError> {
    let bytes = read_region(env, ptr)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_to_new_region<T: MemoryContext>(env: &T, data: &[u8]) -> Result<u32, FuncError> {
    Ok(env.allocate_bytes(data)?.ptr)
}

/// Fill the guest supplied destination region. Returns the success marker `0`.
fn write_to_destination<T: MemoryContext>(env: &T, destination_ptr: u32, data: &[u8]) -> Result<u32, FuncError> {
    let mut destination = env.region(destination_ptr)?;
    env.write_region_bytes(&mut destination, data)?;
    Ok(0)
}

/// Input rejected by the backend is reported to the guest as a region holding the message. Any other
/// error terminates the call.
fn user_error_to_region<T: MemoryContext>(env: &T, error: FuncError) -> Result<u32, FuncError> {
    match error {
        FuncError::Backend(BackendError::UserErr { msg }) => write_to_new_region(env, msg.as_bytes()),
        e => Err(e),
    }
}

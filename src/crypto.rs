/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Signature verification behind the `secp256k1_*` and `ed25519_*` host functions.
//!
//! Verification never fails with an error for a bad signature: the host functions return
//! [VERIFICATION_SUCCESS] or [VERIFICATION_FAILURE] to the guest. Malformed keys and signatures
//! verify as failures too.

use ed25519_dalek::{Signature as Ed25519Signature, Verifier, VerifyingKey};
use log::warn;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId, Signature as EcdsaSignature};
use secp256k1::{Message, PublicKey, Secp256k1, VerifyOnly};

use crate::config::{EDDSA_PUBKEY_LEN, MAX_LENGTH_ED25519_MESSAGE, MAX_LENGTH_ED25519_SIGNATURE};
use crate::contract::FuncError;
use crate::sections::decode_sections;

pub const VERIFICATION_SUCCESS: u32 = 0;
pub const VERIFICATION_FAILURE: u32 = 1;

/// Maps a verification outcome to the code returned to the guest.
pub fn verification_code(valid: bool) -> u32 {
    if valid {
        VERIFICATION_SUCCESS
    } else {
        VERIFICATION_FAILURE
    }
}

/// CryptoVerifier owns the signature verification providers of a VM instance.
pub struct CryptoVerifier {
    secp: Secp256k1<VerifyOnly>,
}

impl Default for CryptoVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoVerifier {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::verification_only(),
        }
    }

    /// ECDSA verification of a 32-byte digest with a 64-byte compact signature and a
    /// compressed (33 bytes) or uncompressed (65 bytes) public key.
    pub fn secp256k1_verify(&self, hash: &[u8], signature: &[u8], pubkey: &[u8]) -> bool {
        let message = match Message::from_slice(hash) {
            Ok(message) => message,
            Err(_) => return false,
        };
        let signature = match EcdsaSignature::from_compact(signature) {
            Ok(signature) => signature,
            Err(_) => return false,
        };
        let pubkey = match PublicKey::from_slice(pubkey) {
            Ok(pubkey) => pubkey,
            Err(_) => return false,
        };
        self.secp.verify_ecdsa(&message, &signature, &pubkey).is_ok()
    }

    /// Recovers the 65-byte uncompressed public key that produced `signature` over `hash`.
    pub fn secp256k1_recover_pubkey(
        &self,
        hash: &[u8],
        signature: &[u8],
        recovery_param: u32,
    ) -> Result<Vec<u8>, FuncError> {
        let message =
            Message::from_slice(hash).map_err(|e| FuncError::Validation(format!("Invalid hash: {e}")))?;
        let recovery_id = i32::try_from(recovery_param)
            .ok()
            .and_then(|id| RecoveryId::from_i32(id).ok())
            .ok_or_else(|| FuncError::Validation(format!("Invalid recovery param {recovery_param}")))?;
        let signature = RecoverableSignature::from_compact(signature, recovery_id)
            .map_err(|e| FuncError::Validation(format!("Invalid signature: {e}")))?;
        let pubkey = self
            .secp
            .recover_ecdsa(&message, &signature)
            .map_err(|e| FuncError::Validation(format!("Cannot recover public key: {e}")))?;
        Ok(pubkey.serialize_uncompressed().to_vec())
    }

    /// EdDSA verification. Inputs beyond the size bounds verify as failures.
    pub fn ed25519_verify(&self, message: &[u8], signature: &[u8], pubkey: &[u8]) -> bool {
        if message.len() > MAX_LENGTH_ED25519_MESSAGE
            || signature.len() > MAX_LENGTH_ED25519_SIGNATURE
            || pubkey.len() > EDDSA_PUBKEY_LEN
        {
            return false;
        }
        let signature: [u8; 64] = match signature.try_into() {
            Ok(signature) => signature,
            Err(_) => return false,
        };
        let pubkey: [u8; 32] = match pubkey.try_into() {
            Ok(pubkey) => pubkey,
            Err(_) => return false,
        };
        let pubkey = match VerifyingKey::from_bytes(&pubkey) {
            Ok(pubkey) => pubkey,
            Err(_) => return false,
        };
        pubkey.verify(message, &Ed25519Signature::from_bytes(&signature)).is_ok()
    }

    /// Verifies section encoded batches of messages, signatures and public keys. A single message or
    /// a single public key is broadcast to every signature. Stops at the first invalid triplet.
    pub fn ed25519_batch_verify(
        &self,
        messages: &[u8],
        signatures: &[u8],
        pubkeys: &[u8],
    ) -> Result<bool, FuncError> {
        let messages = decode_sections(messages)?;
        let signatures = decode_sections(signatures)?;
        let pubkeys = decode_sections(pubkeys)?;

        let (messages, signatures, pubkeys) = broadcast(messages, signatures, pubkeys)?;

        Ok(messages
            .iter()
            .zip(signatures.iter())
            .zip(pubkeys.iter())
            .all(|((message, signature), pubkey)| self.ed25519_verify(message, signature, pubkey)))
    }
}

type Batch = Vec<Vec<u8>>;

/// Aligns the three sequences of a batch, repeating a lone message or a lone public key.
pub fn broadcast(messages: Batch, signatures: Batch, pubkeys: Batch) -> Result<(Batch, Batch, Batch), FuncError> {
    let (n_messages, n_signatures, n_pubkeys) = (messages.len(), signatures.len(), pubkeys.len());

    if n_messages == n_signatures && n_messages == n_pubkeys {
        Ok((messages, signatures, pubkeys))
    } else if n_messages == 1 && n_signatures == n_pubkeys {
        let messages = vec![messages[0].clone(); n_signatures];
        Ok((messages, signatures, pubkeys))
    } else if n_pubkeys == 1 && n_messages == n_signatures {
        let pubkeys = vec![pubkeys[0].clone(); n_messages];
        Ok((messages, signatures, pubkeys))
    } else {
        warn!(
            target: "contract_vm::crypto",
            "ed25519_batch_verify: {n_messages} messages, {n_signatures} signatures, {n_pubkeys} public keys"
        );
        Err(FuncError::Validation(
            "Lengths of messages, signatures and public keys do not match.".to_string(),
        ))
    }
}

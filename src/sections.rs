/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Section encoding: packs a variable number of byte buffers into one.
//!
//! Each section is the data followed by its length as a 4-byte big-endian integer:
//!
//! ```text
//! [data 0][len 0][data 1][len 1] ... [data n][len n]
//! ```
//!
//! The length trails the data, so a buffer is decoded from its tail backward. This is the format of
//! the `ed25519_batch_verify` arguments and of the records returned by `db_next`.

use crate::contract::FuncError;

const LENGTH_FIELD_SIZE: usize = 4;

/// Concatenates every section followed by its big-endian length.
pub fn encode_sections<T: AsRef<[u8]>>(sections: &[T]) -> Vec<u8> {
    let total: usize = sections
        .iter()
        .map(|section| section.as_ref().len() + LENGTH_FIELD_SIZE)
        .sum();
    let mut out = Vec::with_capacity(total);
    for section in sections {
        let section = section.as_ref();
        out.extend_from_slice(section);
        out.extend_from_slice(&(section.len() as u32).to_be_bytes());
    }
    out
}

/// Splits a buffer produced by [encode_sections] back into its sections, in original order.
///
/// A length field pointing before the start of the buffer makes the whole buffer invalid. Fewer than
/// 4 leftover bytes at the head of the buffer cannot hold a length field and are ignored.
pub fn decode_sections(data: &[u8]) -> Result<Vec<Vec<u8>>, FuncError> {
    let mut sections = Vec::new();
    let mut remaining = data.len();

    while remaining >= LENGTH_FIELD_SIZE {
        let mut length_field = [0u8; LENGTH_FIELD_SIZE];
        length_field.copy_from_slice(&data[remaining - LENGTH_FIELD_SIZE..remaining]);
        let section_len = u32::from_be_bytes(length_field) as usize;

        let end = remaining - LENGTH_FIELD_SIZE;
        let start = end.checked_sub(section_len).ok_or_else(|| {
            FuncError::Validation(format!(
                "section length {section_len} exceeds the {end} bytes left"
            ))
        })?;
        sections.push(data[start..end].to_vec());
        remaining = start;
    }

    sections.reverse();
    Ok(sections)
}

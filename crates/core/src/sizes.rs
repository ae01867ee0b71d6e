//! Per-function size records.
//!
//! The size file's payload is a tightly packed sequence of 8-byte records,
//! two 4-byte little-endian unsigned integers each, one record per function
//! in declaration order.

use serde::{Deserialize, Serialize};

use crate::error::GraftError;

/// Declared extent of one function: code bytes and total bytes including
/// any trailing embedded data. `data_len >= code_len` for well-formed input;
/// the extractor treats the gap as a trailing data blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeRecord {
    pub code_len: u32,
    pub data_len: u32,
}

/// Parse the packed record sequence out of a size-file payload.
pub fn parse_size_records(payload: &[u8]) -> Result<Vec<SizeRecord>, GraftError> {
    if payload.len() % 8 != 0 {
        return Err(GraftError::SizeTableMisaligned { len: payload.len() });
    }
    let records = payload
        .chunks_exact(8)
        .map(|chunk| SizeRecord {
            code_len: u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
            data_len: u32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]),
        })
        .collect();
    Ok(records)
}

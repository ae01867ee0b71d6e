//! Emission of extracted functions as Go (Plan 9) assembler source.
//!
//! Every function becomes a `TEXT` block with no stack-split check and a
//! zero-byte frame; the transplanted body keeps the stack discipline it was
//! compiled with. Each instruction is restated as a comment and then either
//! re-resolved as a symbolic `CALL` or spelled out as a cascade of
//! `QUAD`/`LONG`/`WORD`/`BYTE` literal directives.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::GraftError;
use crate::extract::Extraction;

/// Fixed encoding length of a near relative call; anything else cannot be
/// safely replaced by a symbolic CALL.
const NEAR_CALL_LEN: usize = 5;

static CALL_TARGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^call\s+([0-9a-z]+)\s<([^\s<>]+)>").unwrap());

/// Reverse a chunk of bytes.
///
/// The listing shows bytes in ascending address order, but a numeric literal
/// directive expects the chunk as one little-endian value, so the displayed
/// order flips. Applied per chunk independently, never across a whole
/// instruction.
pub fn reverse_chunk(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().rev().copied().collect()
}

/// Render an arbitrary byte run as a descending cascade of literal
/// directives: 8-byte `QUAD`s, then at most one `LONG`, `WORD`, and `BYTE`.
/// Covers the exact byte count with no padding.
pub fn bytes_to_directives(bytes: &[u8]) -> String {
    let mut parts = Vec::new();
    let mut rest = bytes;
    while rest.len() >= 8 {
        parts.push(format!("QUAD $0x{}", hex(&reverse_chunk(&rest[..8]))));
        rest = &rest[8..];
    }
    if rest.len() >= 4 {
        parts.push(format!("LONG $0x{}", hex(&reverse_chunk(&rest[..4]))));
        rest = &rest[4..];
    }
    if rest.len() >= 2 {
        parts.push(format!("WORD $0x{}", hex(&reverse_chunk(&rest[..2]))));
        rest = &rest[2..];
    }
    if !rest.is_empty() {
        parts.push(format!("BYTE $0x{}", hex(rest)));
    }
    parts.join("; ")
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Render the complete output file for an extraction.
///
/// Call re-resolution happens here: a mnemonic of the form
/// `call <addr> <sym>` is emitted as `CALL sym(SB)` once the symbol table
/// confirms `sym` was declared at exactly `addr` and the encoding is the
/// fixed near-call width. The original displacement was computed for the
/// source compile site and would be wrong after transplantation; the
/// destination assembler recomputes it from the symbol.
pub fn render(extraction: &Extraction) -> Result<String, GraftError> {
    let mut out = String::from("#include \"textflag.h\"\n\n");
    for function in &extraction.functions {
        out.push_str(&format!("TEXT {}(SB), NOSPLIT, $0\n", function.name));
        for inst in &function.body {
            out.push_str(&format!("\t// {}\n", inst.mnemonic));
            if let Some(caps) = CALL_TARGET.captures(&inst.mnemonic) {
                let encoded = u64::from_str_radix(&caps[1], 16).map_err(|_| {
                    GraftError::BadCallAddress {
                        function: function.name.clone(),
                        mnemonic: inst.mnemonic.clone(),
                    }
                })?;
                let target = caps[2].to_string();
                let declared = *extraction.symbols.get(&target).ok_or_else(|| {
                    GraftError::UnknownCallTarget {
                        function: function.name.clone(),
                        target: target.clone(),
                    }
                })?;
                if declared != encoded {
                    return Err(GraftError::CallTargetMismatch {
                        function: function.name.clone(),
                        target,
                        encoded,
                        declared,
                    });
                }
                if inst.bytes.len() != NEAR_CALL_LEN {
                    return Err(GraftError::CallLength {
                        function: function.name.clone(),
                        target,
                        len: inst.bytes.len(),
                    });
                }
                out.push_str(&format!("\tCALL {target}(SB)\n"));
                continue;
            }
            out.push('\t');
            out.push_str(&bytes_to_directives(&inst.bytes));
            out.push('\n');
        }
        out.push('\n');
    }
    Ok(out)
}

//! Function reconstruction from a disassembly listing.
//!
//! A single forward pass over the listing drives an explicit two-state
//! machine: `Idle` waits for a function marker line, `Collecting`
//! accumulates instruction and continuation lines into the open function.
//! Every byte run reported by the listing is checked against the raw data
//! image at the same offset, binding the two independently captured dumps
//! together; any disagreement is fatal.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::GraftError;
use crate::sizes::SizeRecord;

static FUNC_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9a-z]+)\s<(\w+)>").unwrap());
static CODE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([0-9a-z]+):\t([0-9a-z ]+)\t(.+)$").unwrap());
static CODE_EXT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([0-9a-z]+):\t([0-9a-z ]+)$").unwrap());

/// One instruction as reported by the listing: opaque mnemonic text plus the
/// exact machine bytes. Continuation lines extend `bytes` in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instruction {
    pub mnemonic: String,
    pub bytes: Vec<u8>,
}

/// A fully reconstructed function: entry address and body in address order.
/// When the size record declared trailing data, the body ends with a
/// synthesized `data N` pseudo-instruction covering it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionRecord {
    pub name: String,
    pub address: u64,
    pub body: Vec<Instruction>,
}

/// Result of a complete extraction pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extraction {
    pub functions: Vec<FunctionRecord>,
    /// Symbol name to entry address, for call-target verification.
    pub symbols: HashMap<String, u64>,
}

/// A function currently being collected.
struct OpenFunction {
    name: String,
    address: u64,
    code_end: u64,
    data_end: u64,
    body: Vec<Instruction>,
}

impl OpenFunction {
    /// Finish the function, synthesizing the trailing data pseudo-instruction
    /// when the declared data extent exceeds the code extent. Applies on every
    /// close path (past-the-end instruction, new marker, end of input) so the
    /// tail is never silently dropped.
    fn close(self, image: &[u8]) -> Result<FunctionRecord, GraftError> {
        let mut body = self.body;
        if self.data_end > self.code_end {
            let bytes = image_slice(image, self.code_end, self.data_end).ok_or(
                GraftError::DataOutOfRange {
                    function: self.name.clone(),
                    start: self.code_end,
                    end: self.data_end,
                },
            )?;
            body.push(Instruction {
                mnemonic: format!("data {}", self.data_end - self.code_end),
                bytes: bytes.to_vec(),
            });
        }
        Ok(FunctionRecord { name: self.name, address: self.address, body })
    }
}

/// Reconstruct every function named in the listing.
///
/// Consumes exactly one `SizeRecord` per function marker, in order; a marker
/// with no record left, or records left over at the end, is an accounting
/// violation — the size table and the listing no longer agree on the set of
/// functions.
pub fn extract_functions(
    sizes: &[SizeRecord],
    image: &[u8],
    listing: &str,
) -> Result<Extraction, GraftError> {
    let mut size_iter = sizes.iter();
    let mut symbols: HashMap<String, u64> = HashMap::new();
    let mut functions: Vec<FunctionRecord> = Vec::new();
    let mut open: Option<OpenFunction> = None;

    for (idx, line) in listing.lines().enumerate() {
        if let Some(caps) = FUNC_MARKER.captures(line) {
            if let Some(prev) = open.take() {
                functions.push(prev.close(image)?);
            }
            let address = parse_hex(&caps[1], idx + 1)?;
            let name = caps[2].to_string();
            let record = size_iter
                .next()
                .ok_or_else(|| GraftError::MissingSizeRecord { function: name.clone() })?;
            if let Some(&first) = symbols.get(&name) {
                if first != address {
                    return Err(GraftError::SymbolClash { name, first, second: address });
                }
            }
            symbols.insert(name.clone(), address);
            open = Some(OpenFunction {
                name,
                address,
                code_end: address + u64::from(record.code_len),
                data_end: address + u64::from(record.data_len),
                body: Vec::new(),
            });
            continue;
        }

        let Some(current) = open.as_mut() else {
            continue;
        };

        if let Some(caps) = CODE_LINE.captures(line) {
            let offset = parse_hex(&caps[1], idx + 1)?;
            if offset >= current.code_end {
                // Alignment padding or the next function's bytes; either way
                // this line is not part of the open function.
                let finished = open.take().unwrap().close(image)?;
                functions.push(finished);
                continue;
            }
            let bytes = parse_byte_columns(&caps[2], idx + 1)?;
            check_bytes(image, offset, &bytes, &current.name)?;
            current.body.push(Instruction { mnemonic: caps[3].to_string(), bytes });
            continue;
        }

        if let Some(caps) = CODE_EXT_LINE.captures(line) {
            let offset = parse_hex(&caps[1], idx + 1)?;
            let bytes = parse_byte_columns(&caps[2], idx + 1)?;
            check_bytes(image, offset, &bytes, &current.name)?;
            let last = current
                .body
                .last_mut()
                .ok_or(GraftError::DanglingContinuation { offset })?;
            last.bytes.extend_from_slice(&bytes);
            continue;
        }

        // Disassembler formatting noise (blank lines, section headers).
    }

    if let Some(last) = open.take() {
        functions.push(last.close(image)?);
    }

    let leftover = size_iter.count();
    if leftover != 0 {
        return Err(GraftError::LeftoverSizeRecords { count: leftover });
    }

    Ok(Extraction { functions, symbols })
}

/// Assert that listing bytes equal the raw image at `offset`.
fn check_bytes(
    image: &[u8],
    offset: u64,
    bytes: &[u8],
    function: &str,
) -> Result<(), GraftError> {
    let end = offset + bytes.len() as u64;
    match image_slice(image, offset, end) {
        Some(expected) if expected == bytes => Ok(()),
        _ => Err(GraftError::ByteMismatch { function: function.to_string(), offset }),
    }
}

fn image_slice(image: &[u8], start: u64, end: u64) -> Option<&[u8]> {
    let start = usize::try_from(start).ok()?;
    let end = usize::try_from(end).ok()?;
    image.get(start..end)
}

fn parse_hex(text: &str, line: usize) -> Result<u64, GraftError> {
    u64::from_str_radix(text, 16).map_err(|_| GraftError::MalformedDump {
        line,
        reason: format!("invalid hex number `{text}`"),
    })
}

/// Decode the space-separated byte columns of an instruction line.
fn parse_byte_columns(text: &str, line: usize) -> Result<Vec<u8>, GraftError> {
    let mut bytes = Vec::new();
    for column in text.split_whitespace() {
        if column.len() % 2 != 0 {
            return Err(GraftError::MalformedDump {
                line,
                reason: format!("odd-width byte column `{column}`"),
            });
        }
        for i in (0..column.len()).step_by(2) {
            let byte = u8::from_str_radix(&column[i..i + 2], 16).map_err(|_| {
                GraftError::MalformedDump {
                    line,
                    reason: format!("invalid hex digits `{}`", &column[i..i + 2]),
                }
            })?;
            bytes.push(byte);
        }
    }
    Ok(bytes)
}

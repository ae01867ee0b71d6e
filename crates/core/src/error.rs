use thiserror::Error;

/// Fatal integrity violations detected while annotating or extracting.
///
/// Every variant aborts the run: a violation means the input captures no
/// longer describe the same binary, so partial output would silently emit
/// incorrect machine code.
#[derive(Debug, Error)]
pub enum GraftError {
    /// A `.size` directive names a different symbol than the block's global
    /// declaration; the annotator's line classification has desynchronized.
    #[error("Function block for `{function}` declares a size for `{declared}`")]
    SizeSymbolMismatch { function: String, declared: String },

    #[error("Begin-function marker at line {line} inside an open function block")]
    NestedBegin { line: usize },

    #[error("Function block {index} has no global symbol declaration")]
    MissingGlobal { index: usize },

    #[error("Function block for `{function}` has no size directive")]
    MissingSize { function: String },

    #[error("Malformed dump line {line}: {reason}")]
    MalformedDump { line: usize, reason: String },

    #[error("Size table payload is {len} bytes, not a whole number of 8-byte records")]
    SizeTableMisaligned { len: usize },

    #[error("No size record left for function `{function}`")]
    MissingSizeRecord { function: String },

    #[error("{count} size record(s) left over after the last disassembled function")]
    LeftoverSizeRecords { count: usize },

    #[error("Symbol `{name}` redeclared at {second:#x}, first seen at {first:#x}")]
    SymbolClash { name: String, first: u64, second: u64 },

    /// The core integrity guarantee: listing bytes must equal the raw image.
    #[error("Bytes at offset {offset:#x} in `{function}` disagree with the data image")]
    ByteMismatch { function: String, offset: u64 },

    #[error("Data extent {start:#x}..{end:#x} of `{function}` lies outside the data image")]
    DataOutOfRange { function: String, start: u64, end: u64 },

    #[error("Continuation bytes at offset {offset:#x} with no preceding instruction")]
    DanglingContinuation { offset: u64 },

    #[error(
        "Call to `{target}` in `{function}` encodes target {encoded:#x}, \
         but the symbol was declared at {declared:#x}"
    )]
    CallTargetMismatch { function: String, target: String, encoded: u64, declared: u64 },

    #[error("Unparseable call target address in `{function}`: `{mnemonic}`")]
    BadCallAddress { function: String, mnemonic: String },

    #[error("Call to unknown symbol `{target}` in `{function}`")]
    UnknownCallTarget { function: String, target: String },

    #[error("Call to `{target}` in `{function}` is {len} bytes long, expected 5")]
    CallLength { function: String, target: String, len: usize },
}

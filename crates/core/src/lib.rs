//! graft-core
//!
//! Core library for transplanting compiled function bytes into portable
//! assembler source.
//!
//! The pipeline has two independent passes:
//! - [`annotator`]: rewrites compiler-emitted assembler text so that, once
//!   assembled and disassembled by external tooling, it yields a per-function
//!   size table alongside the disassembly listing.
//! - [`sizes`] + [`hexdump`] + [`extract`] + [`emit`]: reconstruct each
//!   function's exact byte stream from the size table, raw byte image, and
//!   disassembly listing, cross-validate every byte, and emit the functions
//!   as `TEXT` blocks of numeric literal directives with symbolic calls.
//!
//! All substantive logic lives here so it is fully testable and reusable from
//! multiple frontends.

pub mod annotator;
pub mod emit;
pub mod error;
pub mod extract;
pub mod hexdump;
pub mod sizes;

pub use error::GraftError;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

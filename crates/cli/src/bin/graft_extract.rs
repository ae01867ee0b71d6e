use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;

/// Extraction/emission pass for the binary-transplant pipeline.
///
/// Reconstructs each function's exact byte stream from the size table, raw
/// byte image, and disassembly listing, validates every byte against the
/// image, and emits Go assembler source with intra-module calls re-resolved
/// symbolically. Any integrity violation aborts the run without writing the
/// output file.
#[derive(Parser, Debug)]
#[command(
    name = "graft-extract",
    version,
    about = "Re-emit disassembled function bytes as Go assembler source",
    long_about = None
)]
struct Cli {
    /// Hex dump of the packed per-function size table.
    size_file: PathBuf,

    /// Hex dump of the raw function byte image.
    data_file: PathBuf,

    /// Disassembly listing of the annotated object.
    disasm_file: PathBuf,

    /// Destination path for the generated assembler source.
    output: PathBuf,

    /// Emit a JSON summary of the extracted functions instead of text.
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let size_text = asm_graft::read_text(&cli.size_file)?;
    let size_payload = graft_core::hexdump::load_hex_dump(
        &size_text,
        graft_core::hexdump::ANNOTATION_WIDTH,
    )
    .with_context(|| format!("Failed to parse size file {}", cli.size_file.display()))?;
    let sizes = graft_core::sizes::parse_size_records(&size_payload)
        .with_context(|| format!("Bad size table in {}", cli.size_file.display()))?;

    let data_text = asm_graft::read_text(&cli.data_file)?;
    let image = graft_core::hexdump::load_hex_dump(
        &data_text,
        graft_core::hexdump::ANNOTATION_WIDTH,
    )
    .with_context(|| format!("Failed to parse data file {}", cli.data_file.display()))?;

    let listing = asm_graft::read_text(&cli.disasm_file)?;
    let extraction = graft_core::extract::extract_functions(&sizes, &image, &listing)
        .with_context(|| format!("Failed to extract from {}", cli.disasm_file.display()))?;

    let rendered = graft_core::emit::render(&extraction)
        .context("Failed to emit assembler source")?;
    asm_graft::write_text(&cli.output, &rendered)?;

    if cli.json {
        let functions: Vec<_> = extraction
            .functions
            .iter()
            .map(|f| {
                json!({
                    "name": f.name,
                    "address": f.address,
                    "instructions": f.body.len(),
                    "bytes": f.body.iter().map(|i| i.bytes.len()).sum::<usize>(),
                })
            })
            .collect();
        let summary = json!({ "output": cli.output.display().to_string(), "functions": functions });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Transplanted {} function(s) -> {}", extraction.functions.len(), cli.output.display());
        for f in &extraction.functions {
            println!("  - {} @ {:#x} ({} instruction(s))", f.name, f.address, f.body.len());
        }
    }

    Ok(())
}

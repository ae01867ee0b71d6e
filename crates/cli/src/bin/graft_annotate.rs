use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

/// Annotation pre-pass for the binary-transplant pipeline.
///
/// Rewrites compiler-emitted assembler source so that, once it is assembled
/// and disassembled by external tooling, the object carries a per-function
/// size table for `graft-extract` to consume.
#[derive(Parser, Debug)]
#[command(
    name = "graft-annotate",
    version,
    about = "Inject per-function size metadata into assembler source",
    long_about = None
)]
struct Cli {
    /// Compiler-emitted assembler source to annotate.
    input: PathBuf,

    /// Destination path for the annotated source.
    output: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let source = asm_graft::read_text(&cli.input)?;
    let annotated = graft_core::annotator::annotate(&source)
        .with_context(|| format!("Failed to annotate {}", cli.input.display()))?;
    asm_graft::write_text(&cli.output, &annotated)?;

    println!("Annotated {} -> {}", cli.input.display(), cli.output.display());
    Ok(())
}

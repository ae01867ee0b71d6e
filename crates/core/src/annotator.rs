//! Annotation pass over compiler-emitted assembler text.
//!
//! Isolates each function block delimited by the compiler's begin/end
//! comment markers, separates code lines from data/section lines, and
//! re-emits the source with a read-only per-function size table in front,
//! an explicit end label after each function, and trap-byte alignment
//! padding between functions. The size table is what later lets the
//! extractor know exactly where each function's code and trailing data end.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::GraftError;

const BEGIN_MARKER: &str = "# -- Begin function";
const END_MARKER: &str = "# -- End function";

static TEXT_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*\.text").unwrap());
static SECTION_DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\.section\s+").unwrap());
static GLOBAL_SYMBOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\.globl\s+(\w+)").unwrap());
static FUNC_SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\.size\s+(\w+),\s*([\w.]+-\w+)").unwrap());

/// One function's worth of classified source lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionBlock {
    /// Symbol named by the block's `.globl` directive.
    pub name: String,
    /// Lines emitted while the block was in a text section.
    pub code: Vec<String>,
    /// Directive/data lines from non-text sections, plus any lines seen
    /// before the global symbol declaration.
    pub other: Vec<String>,
    /// Size expression captured from the `.size` directive, e.g.
    /// `.Lfunc_end0-pbf_add`.
    pub size_expr: String,
}

/// Rewrite `source` with the injected size table, end labels, and padding.
///
/// The output contains the same functions in the same order; only the
/// `.size` directives are consumed (their expressions move into the size
/// table) and the surrounding scaffolding is added.
pub fn annotate(source: &str) -> Result<String, GraftError> {
    let blocks = split_blocks(source)?;
    let blocks: Vec<FunctionBlock> = blocks
        .into_iter()
        .enumerate()
        .map(|(index, lines)| classify_block(index, &lines))
        .collect::<Result<_, _>>()?;
    Ok(render(&blocks))
}

/// Collect the raw line spans between begin/end markers, in order.
///
/// Lines outside any block are dropped; an unterminated trailing block is
/// dropped as well. A begin marker inside an open block is fatal.
fn split_blocks(source: &str) -> Result<Vec<Vec<String>>, GraftError> {
    let mut blocks = Vec::new();
    let mut open: Option<Vec<String>> = None;
    for (idx, line) in source.lines().enumerate() {
        if line.contains(BEGIN_MARKER) {
            if open.is_some() {
                return Err(GraftError::NestedBegin { line: idx + 1 });
            }
            open = Some(vec![line.to_string()]);
            continue;
        }
        let Some(block) = open.as_mut() else {
            continue;
        };
        block.push(line.to_string());
        if line.contains(END_MARKER) {
            blocks.push(open.take().unwrap());
        }
    }
    Ok(blocks)
}

/// Classify one block's lines into code/other and capture its symbol and
/// size expression.
fn classify_block(index: usize, lines: &[String]) -> Result<FunctionBlock, GraftError> {
    let mut in_text = true;
    let mut name: Option<String> = None;
    let mut code: Vec<String> = Vec::new();
    let mut other: Vec<String> = Vec::new();
    let mut size: Option<(String, String)> = None;

    for line in lines {
        if TEXT_DIRECTIVE.is_match(line) {
            in_text = true;
            continue;
        }
        if SECTION_DIRECTIVE.is_match(line) {
            in_text = false;
            continue;
        }

        if name.is_none() {
            // Everything before the global symbol declaration is scaffolding
            // the assembler still needs, but it is not function code.
            if let Some(caps) = GLOBAL_SYMBOL.captures(line) {
                name = Some(caps[1].to_string());
            } else {
                other.push(line.clone());
            }
            continue;
        }

        if !in_text {
            other.push(line.clone());
            continue;
        }

        if let Some(caps) = FUNC_SIZE.captures(line) {
            size = Some((caps[1].to_string(), caps[2].to_string()));
            continue;
        }
        code.push(line.clone());
    }

    let name = name.ok_or(GraftError::MissingGlobal { index })?;
    let (declared, size_expr) =
        size.ok_or_else(|| GraftError::MissingSize { function: name.clone() })?;
    if declared != name {
        return Err(GraftError::SizeSymbolMismatch { function: name, declared });
    }
    Ok(FunctionBlock { name, code, other, size_expr })
}

/// Emit the annotated source: size table first, then every function body
/// followed by its end label and alignment padding.
fn render(blocks: &[FunctionBlock]) -> String {
    let mut out = String::new();
    out.push_str("\t.section\t.rodata.func_size,\"aM\",@progbits,4\n");
    out.push_str("\t.p2align\t2\n");
    for (i, block) in blocks.iter().enumerate() {
        out.push_str(&format!("\t.long\t{}\n", block.size_expr));
        // Reuse the `-entry` suffix of the size expression so the second
        // word measures up to our end label, past any trailing data lines.
        let dash = block.size_expr.find('-').expect("size expression contains '-'");
        out.push_str(&format!("\t.long\t.L__END__{}{}\n", i, &block.size_expr[dash..]));
    }
    out.push_str("#===================================\n");
    out.push_str("\t.text\n");
    out.push_str("\t.p2align\t5, 0xcc\n");
    for (i, block) in blocks.iter().enumerate() {
        for line in &block.code {
            out.push_str(line);
            out.push('\n');
        }
        for line in &block.other {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&format!(".L__END__{i}:\n"));
        out.push_str("#===================================\n");
        out.push_str("\t.p2align\t5, 0xcc\n");
    }
    out
}

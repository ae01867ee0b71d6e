use std::collections::HashMap;

use graft_core::emit::{bytes_to_directives, render, reverse_chunk};
use graft_core::extract::{extract_functions, Extraction, FunctionRecord, Instruction};
use graft_core::sizes::SizeRecord;
use graft_core::GraftError;

fn one_function(name: &str, address: u64, body: Vec<Instruction>) -> Extraction {
    let mut symbols = HashMap::new();
    symbols.insert(name.to_string(), address);
    Extraction {
        functions: vec![FunctionRecord { name: name.to_string(), address, body }],
        symbols,
    }
}

#[test]
fn reverse_chunk_flips_byte_order() {
    assert_eq!(reverse_chunk(&[0x01]), vec![0x01]);
    assert_eq!(reverse_chunk(&[0x01, 0x02]), vec![0x02, 0x01]);
    assert_eq!(
        reverse_chunk(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]),
        vec![0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]
    );
}

/// Cascade widths and per-chunk byte order, pinned to literal sequences.
#[test]
fn directive_cascade_is_pinned() {
    assert_eq!(bytes_to_directives(&[0xaa]), "BYTE $0xaa");
    assert_eq!(bytes_to_directives(&[0x01, 0x02]), "WORD $0x0201");
    assert_eq!(bytes_to_directives(&[0x01, 0x02, 0x03]), "WORD $0x0201; BYTE $0x03");
    assert_eq!(bytes_to_directives(&[0x01, 0x02, 0x03, 0x04]), "LONG $0x04030201");
    assert_eq!(
        bytes_to_directives(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]),
        "QUAD $0x0807060504030201"
    );
    assert_eq!(
        bytes_to_directives(&[
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
            0x0f
        ]),
        "QUAD $0x0807060504030201; LONG $0x0c0b0a09; WORD $0x0e0d; BYTE $0x0f"
    );
}

/// Reversal is applied within each chunk independently, never across the
/// whole run: two QUADs keep their original chunk order.
#[test]
fn reversal_is_per_chunk_not_global() {
    let bytes: Vec<u8> = (1..=16).collect();
    assert_eq!(
        bytes_to_directives(&bytes),
        "QUAD $0x0807060504030201; QUAD $0x100f0e0d0c0b0a09"
    );
}

/// Round-trip property: decoding the emitted cascade reproduces the input
/// bytes exactly.
#[test]
fn cascade_round_trips_byte_identity() {
    let samples: Vec<Vec<u8>> = vec![
        vec![0xc3],
        vec![0xe8, 0x0b, 0x00, 0x00, 0x00],
        (0..23).map(|i| (i * 37 + 11) as u8).collect(),
        (0..64).map(|i| (255 - i) as u8).collect(),
    ];
    for bytes in samples {
        assert_eq!(decode_cascade(&bytes_to_directives(&bytes)), bytes);
    }
}

/// Inverse of the cascade: parse each directive's hex value back into
/// address-ordered bytes.
fn decode_cascade(cascade: &str) -> Vec<u8> {
    let mut out = Vec::new();
    for part in cascade.split("; ") {
        let hex = part.split("$0x").nth(1).expect("literal directive");
        let mut chunk: Vec<u8> = (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).expect("hex"))
            .collect();
        chunk.reverse();
        out.extend(chunk);
    }
    out
}

/// The two-function scenario end to end, pinned byte-for-byte: one
/// symbolic CALL, literal cascades elsewhere, no data pseudo-instruction.
#[test]
fn renders_scenario_output() {
    let sizes = [SizeRecord { code_len: 10, data_len: 10 }, SizeRecord { code_len: 5, data_len: 5 }];
    let mut image = vec![0xe8, 0x0b, 0x00, 0x00, 0x00, 0x48, 0x89, 0xe5, 0x90, 0xc3];
    image.extend_from_slice(&[0xcc; 6]);
    image.extend_from_slice(&[0x55, 0x48, 0x89, 0xe5, 0xc3]);
    let listing = "0000000000000000 <f1>:\n\
                   \u{20}  0:\te8 0b 00 00 00       \tcall 10 <f2>\n\
                   \u{20}  5:\t48 89 e5 90 c3       \tmov %rsp,%rbp\n\
                   0000000000000010 <f2>:\n\
                   \u{20} 10:\t55                   \tpush %rbp\n\
                   \u{20} 11:\t48 89 e5 c3          \tmov %rsp,%rbp\n";

    let extraction = extract_functions(&sizes, &image, listing).expect("extract");
    let rendered = render(&extraction).expect("render");

    let expected = "#include \"textflag.h\"\n\
                    \n\
                    TEXT f1(SB), NOSPLIT, $0\n\
                    \t// call 10 <f2>\n\
                    \tCALL f2(SB)\n\
                    \t// mov %rsp,%rbp\n\
                    \tLONG $0x90e58948; BYTE $0xc3\n\
                    \n\
                    TEXT f2(SB), NOSPLIT, $0\n\
                    \t// push %rbp\n\
                    \tBYTE $0x55\n\
                    \t// mov %rsp,%rbp\n\
                    \tLONG $0xc3e58948\n\
                    \n";
    assert_eq!(rendered, expected);
}

/// Identical inputs produce identical output text.
#[test]
fn rendering_is_idempotent() {
    let sizes = [SizeRecord { code_len: 5, data_len: 5 }];
    let image = vec![0x55, 0x48, 0x89, 0xe5, 0xc3];
    let listing = "0000000000000000 <stable>:\n\
                   \u{20}  0:\t55 48 89 e5 c3       \tpush %rbp\n";

    let first = render(&extract_functions(&sizes, &image, listing).expect("extract"))
        .expect("render");
    let second = render(&extract_functions(&sizes, &image, listing).expect("extract"))
        .expect("render");
    assert_eq!(first, second);
}

/// A trailing data pseudo-instruction is emitted as a cascade with the
/// mnemonic restated in the comment.
#[test]
fn renders_data_tail_as_cascade() {
    let extraction = one_function(
        "tabled",
        0,
        vec![
            Instruction { mnemonic: "ret".into(), bytes: vec![0xc3] },
            Instruction { mnemonic: "data 4".into(), bytes: vec![0x10, 0x20, 0x30, 0x40] },
        ],
    );
    let rendered = render(&extraction).expect("render");
    assert!(rendered.contains("\t// data 4\n\tLONG $0x40302010\n"));
}

/// A call to a symbol the table never saw cannot be re-resolved.
#[test]
fn call_to_unknown_symbol_is_fatal() {
    let extraction = one_function(
        "caller",
        0,
        vec![Instruction {
            mnemonic: "call 40 <stranger>".into(),
            bytes: vec![0xe8, 0x3b, 0x00, 0x00, 0x00],
        }],
    );
    let err = render(&extraction).expect_err("unknown symbol");
    assert!(matches!(err, GraftError::UnknownCallTarget { .. }));
}

/// The encoded target address must equal the symbol's declared address.
#[test]
fn call_address_disagreement_is_fatal() {
    let mut extraction = one_function(
        "caller",
        0,
        vec![Instruction {
            mnemonic: "call 40 <callee>".into(),
            bytes: vec![0xe8, 0x3b, 0x00, 0x00, 0x00],
        }],
    );
    extraction.symbols.insert("callee".to_string(), 0x80);
    let err = render(&extraction).expect_err("address disagreement");
    match err {
        GraftError::CallTargetMismatch { encoded, declared, .. } => {
            assert_eq!(encoded, 0x40);
            assert_eq!(declared, 0x80);
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// Only the fixed 5-byte near-call encoding can be replaced symbolically.
#[test]
fn call_with_unexpected_length_is_fatal() {
    let mut extraction = one_function(
        "caller",
        0,
        vec![Instruction { mnemonic: "call 40 <callee>".into(), bytes: vec![0xe8, 0x3b] }],
    );
    extraction.symbols.insert("callee".to_string(), 0x40);
    let err = render(&extraction).expect_err("wrong length");
    assert!(matches!(err, GraftError::CallLength { len: 2, .. }));
}

/// Mnemonics that merely mention call-like text are not rewritten; only the
/// exact `call <addr> <sym>` shape is.
#[test]
fn non_call_mnemonics_emit_cascades() {
    let extraction = one_function(
        "plain",
        0,
        vec![Instruction { mnemonic: "callq *%rax".into(), bytes: vec![0xff, 0xd0] }],
    );
    let rendered = render(&extraction).expect("render");
    assert!(rendered.contains("\tWORD $0xd0ff\n"));
    assert!(!rendered.contains("CALL "));
}

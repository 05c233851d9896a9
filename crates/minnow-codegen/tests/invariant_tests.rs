//! Cross-cutting invariants of the two passes.

mod common;

use common::{Fix, assert_contains_seq};
use minnow_ast::{ArithOp, NodeKind};
use minnow_binder::{Arg, ArgFlags, NativeFun};
use minnow_codegen::Opcode;
use minnow_common::codes;
use minnow_solver::{NativeId, Type};

#[test]
fn every_node_has_a_type_after_checking() {
    let mut fix = Fix::new();
    let a = fix.ident("a");
    let one = fix.int(1);
    let two = fix.flt(2.0);
    let sum = fix.bin(ArithOp::Add, one, two);
    let def = fix.def1(a, sum);
    let an = fix.use_(a);
    let ten = fix.flt(10.0);
    let cond = fix.bin(ArithOp::Lt, an, ten);
    let zero = fix.int(0);
    let body = fix.block(vec![zero]);
    let if_node = fix.node(NodeKind::If {
        cond,
        then_branch: body,
        else_branch: None,
    });

    fix.compile(&[def, if_node]);

    for (id, node) in fix.arena.iter() {
        assert_ne!(
            node.exptype,
            Type::Undefined,
            "node {:?} ({:?}) left untyped",
            id,
            node.kind
        );
    }
}

#[test]
fn line_info_never_repeats_coordinates() {
    let mut fix = Fix::new();
    let a = fix.ident("a");
    let one = fix.int(1);
    let def = fix.def1(a, one);
    let an = fix.use_(a);
    let two = fix.int(2);
    let sum = fix.bin(ArithOp::Add, an, two);

    let program = fix.compile(&[def, sum]);

    for pair in program.line_info.windows(2) {
        assert!(
            pair[0].line != pair[1].line || pair[0].file != pair[1].file,
            "repeated line-info coordinates: {pair:?}"
        );
        assert!(pair[0].offset <= pair[1].offset);
    }
    assert!(!program.line_info.is_empty());
}

#[test]
fn emitted_functions_have_nonzero_offsets_after_fixup() {
    // g calls f before f's body exists; the call site is fixed up.
    let mut fix = Fix::new();
    let (f, f_sf) = fix.function_with("f", Vec::new(), Vec::new(), false, false);
    let inner_call = fix.call(f, Vec::new());
    let (g, g_sf) = fix.function_with("g", Vec::new(), vec![inner_call], false, false);
    let outer_call = fix.call(g, Vec::new());

    let program = fix.compile(&[outer_call]);

    let f_start = fix.syms.subfunction(f_sf).subbytecodestart;
    let g_start = fix.syms.subfunction(g_sf).subbytecodestart;
    assert!(f_start > 0 && g_start > 0);
    // Both call sites carry final targets.
    assert_contains_seq(&program.code, &[Opcode::Call.word(), 0, g.0 as i32, g_start as i32]);
    assert_contains_seq(&program.code, &[Opcode::Call.word(), 0, f.0 as i32, f_start as i32]);
}

#[test]
fn overlapping_multimethod_signatures_are_rejected() {
    let mut fix = Fix::new();
    let a = fix.ident("a");
    let body1 = vec![fix.int(1)];
    let (m, _) = fix.function_with(
        "m",
        vec![Arg::new(a, Type::Int, ArgFlags::empty())],
        body1,
        false,
        true,
    );
    let b = fix.ident("b");
    let body2 = vec![fix.int(2)];
    fix.add_overload(m, vec![Arg::new(b, Type::Int, ArgFlags::empty())], body2);
    let arg = fix.int(3);
    let call = fix.call(m, vec![arg]);

    let err = fix.try_compile(&[call]).unwrap_err();
    assert_eq!(err.code, codes::MULTI_DISPATCH_AMBIGUITY);
    assert!(err.message_text.contains("signature overlap"));
}

#[test]
fn coroutine_records_live_variables_up_to_yield() {
    let mut fix = Fix::new();
    let yield_nf = NativeId(0);
    let mut nf = NativeFun::new(yield_nf, "yield");
    nf.is_yield = true;
    fix.syms.add_native(nf);

    // producer() has a local-ish argument and calls yield.
    let v = fix.ident("v");
    let vn = fix.use_(v);
    let yield_call = fix.node(NodeKind::NatCall {
        nf: yield_nf,
        args: vec![vn],
    });
    let (producer, _) = fix.function_with(
        "producer",
        vec![Arg::new(v, Type::Int, ArgFlags::empty())],
        vec![yield_call],
        false,
        false,
    );
    let seed = fix.int(7);
    let start = fix.call(producer, vec![seed]);
    let coro = fix.node(NodeKind::Coroutine(start));

    let program = fix.compile(&[coro]);

    // CORO skip-target, then the live-variable block naming `v`.
    let at = program
        .code
        .iter()
        .position(|&w| w == Opcode::Coro.word())
        .expect("coroutine scaffolding missing");
    assert_eq!(program.code[at + 2], 1, "one live variable expected");
    assert_eq!(program.code[at + 3], v.0 as i32);
    // The skip operand lands just past COEND.
    let end = program.code[at + 1] as usize;
    assert_eq!(program.code[end - 1], Opcode::CoEnd.word());
}

#[test]
fn coroutine_without_reachable_yield_is_rejected() {
    let mut fix = Fix::new();
    let body = vec![fix.int(1)];
    let (plain, _) = fix.function_with("plain", Vec::new(), body, false, false);
    let start = fix.call(plain, Vec::new());
    let coro = fix.node(NodeKind::Coroutine(start));

    let err = fix.try_compile(&[coro]).unwrap_err();
    assert_eq!(err.code, codes::COROUTINE_CONSTRUCTION);
    assert!(err.message_text.contains("cannot find yield"));
}

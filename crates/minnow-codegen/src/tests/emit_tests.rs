use minnow_ast::{NodeArena, NodeKind};
use minnow_binder::{StructField, Symbols};
use minnow_common::SrcLoc;
use minnow_solver::Type;
use rustc_hash::FxHashMap;

use super::*;
use crate::field_dispatch::FieldEncoding;

fn empty_codegen<'a>(arena: &'a NodeArena, syms: &'a mut Symbols) -> CodeGen<'a> {
    CodeGen {
        arena,
        syms,
        code: Vec::new(),
        line_info: Vec::new(),
        loc_stack: vec![SrcLoc::new(0, 1)],
        call_fixups: Vec::new(),
        field_encodings: FxHashMap::default(),
    }
}

fn plain_field(fid: minnow_solver::FieldId, ty: Type) -> StructField {
    StructField {
        field: fid,
        ty,
        generic: false,
    }
}

#[test]
fn line_info_dedupes_consecutive_coordinates() {
    let arena = NodeArena::new();
    let mut syms = Symbols::new();
    let mut cg = empty_codegen(&arena, &mut syms);

    cg.emit(1);
    cg.emit(2);
    cg.loc_stack.push(SrcLoc::new(0, 2));
    cg.emit(3);
    cg.emit(4);

    assert_eq!(cg.line_info.len(), 2);
    assert_eq!(cg.line_info[0].offset, 0);
    assert_eq!(cg.line_info[1].offset, 2);
    assert_eq!(cg.line_info[1].line, 2);
}

#[test]
fn uniform_field_needs_no_table() {
    let arena = NodeArena::new();
    let mut syms = Symbols::new();
    let f = syms.declare_field("x");
    syms.add_struct("A", vec![plain_field(f, Type::Int)], None);
    syms.add_struct("B", vec![plain_field(f, Type::Int)], None);

    let mut cg = empty_codegen(&arena, &mut syms);
    cg.gen_field_tables();

    assert!(cg.field_encodings.is_empty());
    // Only the header was emitted, its operand pointing past itself.
    assert_eq!(cg.code, vec![Opcode::FieldTables.word(), 2]);
}

#[test]
fn two_offset_singleton_uses_the_conditional_form() {
    let arena = NodeArena::new();
    let mut syms = Symbols::new();
    let pad = syms.declare_field("pad");
    let f = syms.declare_field("x");
    // A and B share offset 0, C has the field at offset 1.
    let _a = syms.add_struct("A", vec![plain_field(f, Type::Int)], None);
    let _b = syms.add_struct("B", vec![plain_field(f, Type::Int)], None);
    let c = syms.add_struct(
        "C",
        vec![plain_field(pad, Type::Int), plain_field(f, Type::Int)],
        None,
    );

    let mut cg = empty_codegen(&arena, &mut syms);
    cg.gen_field_tables();

    assert_eq!(
        cg.field_encodings.get(&f),
        Some(&FieldEncoding::Cond {
            struct_idx: c,
            one: 1,
            other: 0
        })
    );
}

#[test]
fn three_offsets_fall_back_to_a_table() {
    let arena = NodeArena::new();
    let mut syms = Symbols::new();
    let p1 = syms.declare_field("p1");
    let p2 = syms.declare_field("p2");
    let f = syms.declare_field("x");
    syms.add_struct("A", vec![plain_field(f, Type::Int)], None);
    let b = syms.add_struct(
        "B",
        vec![plain_field(p1, Type::Int), plain_field(f, Type::Int)],
        None,
    );
    let c = syms.add_struct(
        "C",
        vec![
            plain_field(p1, Type::Int),
            plain_field(p2, Type::Int),
            plain_field(f, Type::Int),
        ],
        None,
    );

    let mut cg = empty_codegen(&arena, &mut syms);
    cg.gen_field_tables();

    let Some(&FieldEncoding::Table(at)) = cg.field_encodings.get(&f) else {
        panic!("expected a table encoding");
    };
    // One slot per record, indexed by record index.
    assert_eq!(cg.code[at], 0);
    assert_eq!(cg.code[at + b.index()], 1);
    assert_eq!(cg.code[at + c.index()], 2);
    // The header operand skips the whole block.
    assert_eq!(cg.code[1], cg.code.len() as i32);
}

#[test]
fn type_checks_elide_when_static_types_agree() {
    let arena = NodeArena::new();
    let mut syms = Symbols::new();
    let mut cg = empty_codegen(&arena, &mut syms);

    cg.gen_type_check(&Type::Int, &Type::Int);
    assert!(cg.code.is_empty());
    cg.gen_type_check(&Type::Any, &Type::Float);
    assert_eq!(cg.code, vec![Opcode::TtFlt.word()]);
}

#[test]
fn def_emits_logread_for_log_variables() {
    let mut arena = NodeArena::new();
    let mut syms = Symbols::new();
    let id = syms.new_ident("counter");
    syms.ident_mut(id).is_logvar = true;
    syms.ident_mut(id).logvar_slot = 0;
    let loc = SrcLoc::new(0, 1);
    let init = arena.add(NodeKind::Int(5), loc);
    let idn = arena.add(NodeKind::Ident(id), loc);
    let def = arena.add(
        NodeKind::Def {
            ids: vec![idn],
            init,
        },
        loc,
    );

    let mut cg = empty_codegen(&arena, &mut syms);
    cg.gen_node(def, 0).unwrap();

    assert_eq!(
        cg.code,
        vec![
            Opcode::PushInt.word(),
            5,
            Opcode::LogRead.word(),
            0,
            Opcode::LvalVar.word(),
            LvalOp::WriteD.word(),
            id.0 as i32,
        ]
    );
}

//! Lowering shapes for lvalues, loops, and short-circuit operators.

mod common;

use common::{Fix, assert_contains_seq};
use minnow_ast::{ArithOp, IncDecOp, NodeKind};
use minnow_codegen::{LvalOp, Opcode};
use minnow_solver::Type;

#[test]
fn compound_assignment_bumps_to_the_result_variant_when_used() {
    let mut fix = Fix::new();
    let x = fix.ident("x");
    let one = fix.int(1);
    let def = fix.def1(x, one);
    let xt = fix.use_(x);
    let two = fix.int(2);
    let add = fix.node(NodeKind::CompoundAssign {
        op: ArithOp::Add,
        target: xt,
        value: two,
    });

    // The compound assignment is the program's last value.
    let program = fix.compile(&[def, add]);

    assert_contains_seq(
        &program.code,
        &[
            Opcode::PushInt.word(),
            2,
            Opcode::LvalVar.word(),
            LvalOp::PlusR.word(),
            x.0 as i32,
        ],
    );
}

#[test]
fn increment_discarded_uses_the_plain_variant() {
    let mut fix = Fix::new();
    let x = fix.ident("x");
    let one = fix.int(1);
    let def = fix.def1(x, one);
    let xt = fix.use_(x);
    let inc = fix.node(NodeKind::IncDec {
        op: IncDecOp::PreIncr,
        target: xt,
    });
    let done = fix.int(0);

    let program = fix.compile(&[def, inc, done]);

    assert_contains_seq(
        &program.code,
        &[Opcode::LvalVar.word(), LvalOp::PP.word(), x.0 as i32],
    );
}

#[test]
fn index_write_lowers_object_then_index() {
    let mut fix = Fix::new();
    let xs = fix.ident("xs");
    fix.syms.ident_mut(xs).ty = Type::Int.wrap_vector();
    let obj = fix.use_(xs);
    let idx = fix.int(0);
    let target = fix.node(NodeKind::Index { obj, index: idx });
    let three = fix.int(3);
    let assign = fix.node(NodeKind::Assign {
        target,
        value: three,
    });
    let done = fix.int(0);

    let program = fix.compile(&[assign, done]);

    assert_contains_seq(
        &program.code,
        &[
            Opcode::PushInt.word(),
            3,
            Opcode::PushVar.word(),
            xs.0 as i32,
            Opcode::PushInt.word(),
            0,
            Opcode::LvalIdx.word(),
            LvalOp::Write.word(),
        ],
    );
}

#[test]
fn field_write_uses_the_lvalue_field_form() {
    let mut fix = Fix::new();
    let (point, fids) = fix.struct_with_fields("Point", &[("x", Type::Int, false)], None);
    let p = fix.ident("p");
    fix.syms.ident_mut(p).ty = Type::Struct(point);
    let obj = fix.use_(p);
    let target = fix.node(NodeKind::Dot {
        obj,
        field: fids[0],
        maybe: false,
    });
    let five = fix.int(5);
    let assign = fix.node(NodeKind::Assign {
        target,
        value: five,
    });
    let done = fix.int(0);

    let program = fix.compile(&[assign, done]);

    assert_contains_seq(
        &program.code,
        &[
            Opcode::PushInt.word(),
            5,
            Opcode::PushVar.word(),
            p.0 as i32,
            Opcode::LvalFldO.word(),
            LvalOp::Write.word(),
            0,
        ],
    );
}

#[test]
fn while_loop_calls_condition_and_body_closures_inline() {
    let mut fix = Fix::new();
    let x = fix.ident("x");
    let one = fix.int(1);
    let def = fix.def1(x, one);

    let xc = fix.use_(x);
    let ten = fix.int(10);
    let cmp = fix.bin(ArithOp::Lt, xc, ten);
    let cond = fix.block(vec![cmp]);

    let xb = fix.use_(x);
    let step = fix.int(1);
    let bump = fix.node(NodeKind::CompoundAssign {
        op: ArithOp::Add,
        target: xb,
        value: step,
    });
    let body = fix.block(vec![bump]);

    let while_node = fix.node(NodeKind::While { cond, body });

    let program = fix.compile(&[def, while_node]);

    // Condition: inline closure call, then the exit branch.
    assert_contains_seq(
        &program.code,
        &[Opcode::CallV.word(), 0, Opcode::JumpFail.word()],
    );
    // Body: inline closure call with the value discarded.
    assert_contains_seq(&program.code, &[Opcode::CallV.word(), 0, Opcode::Pop.word()]);
    // The loop statement itself supplies a placeholder value.
    assert_contains_seq(&program.code, &[Opcode::Jump.word()]);
}

#[test]
fn and_short_circuits_with_a_result_preserving_jump() {
    let mut fix = Fix::new();
    let a = fix.ident("a");
    fix.syms.ident_mut(a).ty = Type::Str.wrap_nilable();
    let b = fix.ident("b");
    fix.syms.ident_mut(b).ty = Type::Str.wrap_nilable();
    let an = fix.use_(a);
    let bn = fix.use_(b);
    let and = fix.node(NodeKind::And {
        left: an,
        right: bn,
    });

    let program = fix.compile(&[and]);

    assert_contains_seq(
        &program.code,
        &[
            Opcode::PushVar.word(),
            a.0 as i32,
            Opcode::JumpFailR.word(),
        ],
    );
}

#[test]
fn statically_known_function_value_call_devirtualizes() {
    let mut fix = Fix::new();
    let body = vec![fix.int(42)];
    let (f, f_sf) = fix.function_with("f", Vec::new(), body, false, false);
    let d = fix.ident("d");
    let fv = fix.funval(f_sf);
    let def = fix.def1(d, fv);
    let dn = fix.use_(d);
    let dyncall = fix.node(NodeKind::DynCall {
        fval: dn,
        args: Vec::new(),
        resolved: None,
    });

    let program = fix.compile(&[def, dyncall]);

    // The call went static: a plain CALL with a patched target, and no
    // CALLV anywhere.
    let start = fix.syms.subfunction(f_sf).subbytecodestart;
    assert!(start > 0);
    assert_contains_seq(
        &program.code,
        &[Opcode::Call.word(), 0, f.0 as i32, start as i32],
    );
}

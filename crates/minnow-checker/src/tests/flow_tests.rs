use minnow_ast::NodeKind;
use minnow_solver::Type;

use crate::test_support::Fix;

#[test]
fn is_narrows_in_the_true_branch() {
    let mut fix = Fix::new();
    let (foo, fids) = fix.struct_with_fields("Foo", &[("field", Type::Int, false)], None);
    let x = fix.ident("x");
    fix.syms.ident_mut(x).ty = Type::Struct(foo).wrap_nilable();

    let x_cond = fix.use_(x);
    let cond = fix.node(NodeKind::Is {
        value: x_cond,
        ty: Type::Struct(foo),
    });
    let x_then = fix.use_(x);
    let dot = fix.node(NodeKind::Dot {
        obj: x_then,
        field: fids[0],
        maybe: false,
    });
    let then_branch = fix.block(vec![dot]);
    let zero = fix.int(0);
    let else_branch = fix.block(vec![zero]);
    let if_node = fix.node(NodeKind::If {
        cond,
        then_branch,
        else_branch: Some(else_branch),
    });

    fix.check(&[if_node]).unwrap();

    assert_eq!(fix.arena[x_then].exptype, Type::Struct(foo));
    assert_eq!(fix.arena[dot].exptype, Type::Int);
    assert_eq!(fix.arena[if_node].exptype, Type::Int);
}

#[test]
fn nilable_condition_narrows_to_element() {
    let mut fix = Fix::new();
    let x = fix.ident("x");
    fix.syms.ident_mut(x).ty = Type::Str.wrap_nilable();

    let cond = fix.use_(x);
    let x_then = fix.use_(x);
    let then_branch = fix.block(vec![x_then]);
    let dflt = fix.str_("default");
    let else_branch = fix.block(vec![dflt]);
    let if_node = fix.node(NodeKind::If {
        cond,
        then_branch,
        else_branch: Some(else_branch),
    });

    fix.check(&[if_node]).unwrap();

    assert_eq!(fix.arena[x_then].exptype, Type::Str);
    assert_eq!(fix.arena[if_node].exptype, Type::Str);
}

#[test]
fn assignment_invalidates_a_narrowing() {
    let mut fix = Fix::new();
    let x = fix.ident("x");
    fix.syms.ident_mut(x).ty = Type::Str.wrap_nilable();

    let cond = fix.use_(x);
    let assign_target = fix.use_(x);
    let value = fix.str_("fresh");
    let assign = fix.node(NodeKind::Assign {
        target: assign_target,
        value,
    });
    let x_after = fix.use_(x);
    let then_branch = fix.block(vec![assign, x_after]);
    let nil = fix.node(NodeKind::Nil);
    let else_branch = fix.block(vec![nil]);
    let if_node = fix.node(NodeKind::If {
        cond,
        then_branch,
        else_branch: Some(else_branch),
    });

    fix.check(&[if_node]).unwrap();

    // The write undoes the refinement for later reads.
    assert_eq!(fix.arena[x_after].exptype, Type::Str.wrap_nilable());
    assert_eq!(fix.arena[if_node].exptype, Type::Str.wrap_nilable());
}

#[test]
fn and_narrows_only_the_true_branch() {
    let mut fix = Fix::new();
    let (foo, _) = fix.struct_with_fields("Foo", &[("field", Type::Int, false)], None);
    let x = fix.ident("x");
    fix.syms.ident_mut(x).ty = Type::Struct(foo).wrap_nilable();
    let y = fix.ident("y");
    fix.syms.ident_mut(y).ty = Type::Str.wrap_nilable();

    let xc = fix.use_(x);
    let yc = fix.use_(y);
    let cond = fix.node(NodeKind::And {
        left: xc,
        right: yc,
    });
    let x_then = fix.use_(x);
    let y_then = fix.use_(y);
    let seq = fix.node(NodeKind::Seq {
        first: x_then,
        second: y_then,
    });
    let then_branch = fix.block(vec![seq]);
    let if_node = fix.node(NodeKind::If {
        cond,
        then_branch,
        else_branch: None,
    });

    fix.check(&[if_node]).unwrap();

    // Both conjuncts hold inside the branch.
    assert_eq!(fix.arena[x_then].exptype, Type::Struct(foo));
    assert_eq!(fix.arena[y_then].exptype, Type::Str);
    // If without else is statement-like.
    assert_eq!(fix.arena[if_node].exptype, Type::Any);
}

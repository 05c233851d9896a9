use super::*;
use minnow_solver::TypeVars;

fn table_with_hierarchy() -> (Symbols, StructId, StructId, FieldId, FieldId) {
    let mut syms = Symbols::new();
    let fx = syms.declare_field("x");
    let fy = syms.declare_field("y");
    let base = syms.add_struct(
        "Base",
        vec![StructField {
            field: fx,
            ty: Type::Int,
            generic: false,
        }],
        None,
    );
    let derived = syms.add_struct(
        "Derived",
        vec![
            StructField {
                field: fx,
                ty: Type::Int,
                generic: false,
            },
            StructField {
                field: fy,
                ty: Type::Float,
                generic: false,
            },
        ],
        Some(base),
    );
    (syms, base, derived, fx, fy)
}

#[test]
fn super_type_walks_the_inheritance_chain() {
    let (syms, base, derived, _, _) = table_with_hierarchy();
    assert!(syms.is_super_type_or_same(base, derived));
    assert!(syms.is_super_type_or_same(base, base));
    assert!(!syms.is_super_type_or_same(derived, base));
}

#[test]
fn field_offsets_register_per_record() {
    let (syms, base, derived, fx, fy) = table_with_hierarchy();
    assert_eq!(syms.field(fx).offsets, vec![(base, 0), (derived, 0)]);
    assert_eq!(syms.field(fy).offsets, vec![(derived, 1)]);
    assert_eq!(syms.field(fx).num_unique(), 1);
}

#[test]
fn clone_struct_preserves_layout_and_registers_offsets() {
    let (mut syms, _, derived, fx, fy) = table_with_hierarchy();
    let clone = syms.clone_struct(derived);

    assert_ne!(clone, derived);
    assert_eq!(syms.struct_def(clone).fields.len(), 2);
    assert_eq!(
        syms.struct_def(clone).superclass,
        syms.struct_def(derived).superclass
    );
    assert!(!syms.struct_def(clone).typechecked);
    assert!(syms.field(fx).offsets.contains(&(clone, 0)));
    assert!(syms.field(fy).offsets.contains(&(clone, 1)));
}

#[test]
fn type_name_renders_wrappers_and_records() {
    let (syms, _, derived, _, _) = table_with_hierarchy();
    let vars = TypeVars::new();
    let t = Type::Struct(derived).wrap_nilable();
    assert_eq!(syms.type_name(&t, &vars), "Derived?");
    assert_eq!(
        syms.type_name(&Type::Int.wrap_vector(), &vars),
        "[int]"
    );
}

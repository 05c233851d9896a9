//! Type conversion, union, and subtype enforcement.
//!
//! `converts_to` may bind type variables as a side effect (unification
//! happens through conversion checks). `sub_type_node` additionally
//! splices coercion nodes into the AST when a conversion needs one.

use minnow_ast::{ArithOp, NodeId, NodeKind};
use minnow_common::CompileResult;
use minnow_solver::{FuncId, Type};

use crate::checker::TypeChecker;

impl TypeChecker<'_> {
    /// Can `from` be converted to `to`? With `coercions`, int widens to
    /// float and anything converts to string.
    pub(crate) fn converts_to(&mut self, from: &Type, to: &Type, coercions: bool) -> bool {
        if to == from {
            return true;
        }
        if let Type::Var(v) = from {
            let bound = self.vars.unify(to, *v);
            return self.converts_to(&bound, to, coercions);
        }
        match to {
            Type::Any => true,
            Type::Var(v) => {
                let bound = self.vars.unify(from, *v);
                self.converts_to(from, &bound, coercions)
            }
            Type::Float => *from == Type::Int && coercions,
            Type::Str => coercions,
            Type::Function(idx) => matches!(from, Type::Function(_)) && idx.is_none(),
            Type::Nilable(elem) => {
                *from == Type::Nil
                    || match from {
                        Type::Nilable(from_elem) => {
                            let (fe, te) = ((**from_elem).clone(), (**elem).clone());
                            self.converts_to(&fe, &te, false)
                        }
                        _ => {
                            let te = (**elem).clone();
                            self.converts_to(from, &te, false)
                        }
                    }
            }
            Type::Vector(elem) => match from {
                Type::Vector(from_elem) => {
                    let (fe, te) = ((**from_elem).clone(), (**elem).clone());
                    self.converts_to(&fe, &te, false)
                }
                Type::Struct(s) => {
                    let vt = self.syms.struct_def(*s).vectortype.clone();
                    self.converts_to(&vt, to, false)
                }
                _ => false,
            },
            Type::Struct(s) => match from {
                Type::Struct(fs) => self.syms.is_super_type_or_same(*s, *fs),
                _ => false,
            },
            _ => false,
        }
    }

    /// The common type of `a` and `b`: whichever subsumes the other,
    /// `[any]` for two vectors, `any` otherwise.
    pub(crate) fn union_t(&mut self, a: &Type, b: &Type, coercions: bool) -> Type {
        if self.converts_to(a, b, coercions) {
            return self.vars.promote(b);
        }
        if self.converts_to(b, a, coercions) {
            return self.vars.promote(a);
        }
        if matches!(a, Type::Vector(_)) && matches!(b, Type::Vector(_)) {
            return Type::Any.wrap_vector();
        }
        Type::Any
    }

    pub(crate) fn union_nodes(&mut self, a: NodeId, b: NodeId, coercions: bool) -> Type {
        let (at, bt) = (
            self.arena[a].exptype.clone(),
            self.arena[b].exptype.clone(),
        );
        self.union_t(&at, &bt, coercions)
    }

    pub(crate) fn exact_type(&self, a: &Type, b: &Type) -> bool {
        self.vars.promote(a) == self.vars.promote(b)
    }

    /// Enforce `sub` on both operands of a binary node.
    pub(crate) fn sub_type_lr(
        &mut self,
        sub: &Type,
        n: NodeId,
        left: NodeId,
        right: NodeId,
    ) -> CompileResult<()> {
        let context = self.arena[n].kind.name();
        self.sub_type_node(left, sub, Some("left"), context)?;
        self.sub_type_node(right, sub, Some("right"), context)
    }

    /// Enforce that node `a` converts to `sub`, inserting a coercion node
    /// where one applies. On success `a`'s type is promoted in place.
    pub(crate) fn sub_type_node(
        &mut self,
        a: NodeId,
        sub: &Type,
        argname: Option<&str>,
        context: &str,
    ) -> CompileResult<()> {
        let ty = self.arena[a].exptype.clone();
        if self.converts_to(&ty, sub, false) {
            self.arena[a].exptype = self.vars.promote(&ty);
            return Ok(());
        }
        match sub {
            Type::Float => {
                if self.vars.promote(&ty) == Type::Int {
                    self.arena
                        .wrap_coercion(a, NodeKind::IntToFloat, Type::Float);
                    return Ok(());
                }
            }
            Type::Str => {
                self.arena.wrap_coercion(a, NodeKind::ToString, Type::Str);
                return Ok(());
            }
            Type::Function(Some(target)) => {
                if let Type::Function(Some(value)) = ty {
                    if self.function_value_compatible(value, *target, a)? {
                        return Ok(());
                    }
                }
            }
            _ => {}
        }
        let required = self.syms.type_name(sub, &self.vars);
        Err(self.type_error(&required, &ty, a, argname, Some(context)))
    }

    /// Make a function value usable where a declared function type is
    /// expected: specialize its untyped parameters to the target's,
    /// check parameters contravariantly, type-check the body, then check
    /// the first return type covariantly. Declared function types carry
    /// exactly one return type.
    fn function_value_compatible(
        &mut self,
        value: FuncId,
        target: FuncId,
        n: NodeId,
    ) -> CompileResult<bool> {
        let value_sf = self.syms.function(value).subf[0];
        let target_sf = self.syms.function(target).subf[0];
        let target_args: Vec<Type> = self
            .syms
            .subfunction(target_sf)
            .args
            .iter()
            .map(|a| a.ty.clone())
            .collect();
        if self.syms.subfunction(value_sf).args.len() != target_args.len() {
            return Ok(false);
        }
        for (i, target_ty) in target_args.iter().enumerate() {
            let sub = self.syms.subfunction(value_sf);
            if !sub.typechecked
                && sub.args[i]
                    .flags
                    .contains(minnow_binder::ArgFlags::ANY_TYPE)
            {
                self.syms.subfunction_mut(value_sf).args[i].ty = target_ty.clone();
            }
            // Function arguments are contravariant.
            let value_ty = self.syms.subfunction(value_sf).args[i].ty.clone();
            if !self.converts_to(target_ty, &value_ty, false) {
                return Ok(false);
            }
        }
        self.check_subfunction(value_sf, n)?;
        let value_rets = self.syms.subfunction(value_sf).returntypes.clone();
        let target_rets = self.syms.subfunction(target_sf).returntypes.clone();
        if value_rets.len() != target_rets.len() {
            return Ok(false);
        }
        // Covariant again.
        let ok = self.converts_to(&value_rets[0], &target_rets[0], false);
        Ok(ok)
    }

    /// Enforce `ty -> sub` where the value is not a node (branch result
    /// types, destructuring sources). Returns the promoted type.
    pub(crate) fn sub_type_t(
        &mut self,
        ty: &Type,
        sub: &Type,
        n: NodeId,
        argname: Option<&str>,
        context: Option<&str>,
    ) -> CompileResult<Type> {
        if !self.converts_to(ty, sub, false) {
            let required = self.syms.type_name(sub, &self.vars);
            return Err(self.type_error(&required, ty, n, argname, context));
        }
        Ok(self.vars.promote(ty))
    }

    /// Is `ty` acceptable to the arithmetic operator `op`? Returns the
    /// required-type description on failure.
    pub(crate) fn math_check(
        &self,
        ty: &Type,
        op: ArithOp,
        both_nilable: bool,
    ) -> Option<&'static str> {
        if op == ArithOp::Mod {
            return if *ty == Type::Int { None } else { Some("int") };
        }
        if ty.is_numeric() || matches!(ty, Type::Vector(_) | Type::Struct(_)) {
            return None;
        }
        if op == ArithOp::Add {
            if *ty == Type::Str {
                return None;
            }
            // Anything nilable can be added to a string, but only on one
            // side.
            if let Type::Nilable(elem) = ty {
                if **elem == Type::Str && !both_nilable {
                    return None;
                }
            }
            return Some("numeric/string/vector/struct");
        }
        Some("numeric/vector/struct")
    }

    /// Attribute a math type error to the failing operand, or to the
    /// combination when both are individually fine.
    pub(crate) fn math_error(
        &mut self,
        ty: &Type,
        n: NodeId,
        op: ArithOp,
        left: NodeId,
        right: NodeId,
    ) -> CompileResult<()> {
        let both_nilable = matches!(self.arena[left].exptype, Type::Nilable(_))
            && matches!(self.arena[right].exptype, Type::Nilable(_));
        if let Some(required) = self.math_check(ty, op, both_nilable) {
            let lt = self.arena[left].exptype.clone();
            if self.math_check(&lt, op, both_nilable).is_some() {
                return Err(self.type_error(required, &lt, n, Some("left"), None));
            }
            let rt = self.arena[right].exptype.clone();
            if self.math_check(&rt, op, both_nilable).is_some() {
                return Err(self.type_error(required, &rt, n, Some("right"), None));
            }
            let msg = format!(
                "can't use \"{}\" on {} and {}",
                op.name(),
                self.syms.type_name(&lt, &self.vars),
                self.syms.type_name(&rt, &self.vars)
            );
            return Err(self.error_at(msg, n, minnow_common::codes::TYPE_MISMATCH));
        }
        Ok(())
    }
}

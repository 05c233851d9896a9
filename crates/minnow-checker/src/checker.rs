//! The type-checking traversal.
//!
//! Types are assigned bottom-up except for the kinds with intrinsic
//! semantics (and/or, function values, struct definitions), which manage
//! their own children. Every expression node receives an `exptype`;
//! statements that produce no value receive `any`.

use minnow_ast::{ArithOp, NodeArena, NodeId, NodeKind};
use minnow_binder::{NativeFlag, Symbols};
use minnow_common::{CompileResult, codes};
use minnow_solver::{NativeId, SubFuncId, Type, TypeVars};
use smallvec::SmallVec;
use tracing::trace;

use crate::flow::FlowItem;

/// One enclosing function body being checked, with the call site that
/// caused it (for error backtraces).
#[derive(Clone, Copy, Debug)]
pub(crate) struct Scope {
    pub sf: SubFuncId,
    pub call_context: NodeId,
}

/// Shared state of the checking pass. Borrows the AST and symbol table
/// mutably; owns the unification table and the flow stack.
pub struct TypeChecker<'a> {
    pub(crate) arena: &'a mut NodeArena,
    pub(crate) syms: &'a mut Symbols,
    pub(crate) vars: TypeVars,
    pub(crate) scopes: Vec<Scope>,
    pub(crate) named_scopes: Vec<Scope>,
    pub(crate) flowstack: Vec<FlowItem>,
}

/// Check a whole program and hand back the unification table (needed to
/// render any remaining variable types in later diagnostics).
pub fn check_program(
    arena: &mut NodeArena,
    syms: &mut Symbols,
    root: &[NodeId],
) -> CompileResult<TypeVars> {
    let mut checker = TypeChecker::new(arena, syms);
    checker.run(root)?;
    Ok(checker.into_vars())
}

impl<'a> TypeChecker<'a> {
    pub fn new(arena: &'a mut NodeArena, syms: &'a mut Symbols) -> Self {
        TypeChecker {
            arena,
            syms,
            vars: TypeVars::new(),
            scopes: Vec::new(),
            named_scopes: Vec::new(),
            flowstack: Vec::new(),
        }
    }

    /// Check the top-level statement list. Re-running on an
    /// already-checked tree is idempotent.
    pub fn run(&mut self, root: &[NodeId]) -> CompileResult<()> {
        for &stmt in root {
            self.check(stmt)?;
        }
        debug_assert!(self.scopes.is_empty());
        debug_assert!(self.named_scopes.is_empty());
        debug_assert!(self.flowstack.is_empty());
        Ok(())
    }

    pub fn into_vars(self) -> TypeVars {
        self.vars
    }

    pub(crate) fn check(&mut self, n: NodeId) -> CompileResult<()> {
        // Kinds with intrinsic semantics drive their own children.
        match &self.arena[n].kind {
            NodeKind::StructDef(_) => {
                self.arena[n].exptype = Type::Any;
                return Ok(());
            }
            NodeKind::FunVal { sf } => {
                let ty = match sf {
                    Some(sf) => Type::Function(Some(self.syms.subfunction(*sf).parent)),
                    None => Type::Any,
                };
                self.arena[n].exptype = ty;
                return Ok(());
            }
            NodeKind::And { .. } | NodeKind::Or { .. } => {
                self.check_and_or(n, false)?;
                return Ok(());
            }
            _ => {}
        }

        self.check_children(n)?;

        let kind = self.arena[n].kind.clone();
        let ty: Type = match kind {
            NodeKind::Int(_) => Type::Int,
            NodeKind::Float(_) => Type::Float,
            NodeKind::Str(_) => Type::Str,
            NodeKind::Nil => self.vars.fresh().wrap_nilable(),

            NodeKind::BinOp { op, left, right } if !op.is_compare() => {
                let u = self.union_nodes(left, right, true);
                self.math_error(&u, n, op, left, right)?;
                self.sub_type_lr(&u, n, left, right)?;
                u
            }

            NodeKind::BinOp { op, left, right } => {
                let u = self.union_nodes(left, right, true);
                if !u.is_numeric() && u != Type::Str {
                    if matches!(op, ArithOp::Eq | ArithOp::Ne) {
                        if !matches!(u, Type::Vector(_) | Type::Struct(_) | Type::Nilable(_)) {
                            return Err(self.type_error(
                                "numeric/string/vector/struct",
                                &u,
                                n,
                                None,
                                None,
                            ));
                        }
                    } else {
                        return Err(self.type_error("numeric/string", &u, n, None, None));
                    }
                }
                self.sub_type_lr(&u, n, left, right)?;
                Type::Int
            }

            NodeKind::CompoundAssign { op, target, value } => {
                // The left side's type is authoritative.
                let ty = self.vars.promote(&self.arena[target].exptype);
                self.math_error(&ty, n, op, target, value)?;
                let context = self.arena[n].kind.name();
                self.sub_type_node(value, &ty, Some("right"), context)?;
                ty
            }

            NodeKind::Not(_) => Type::Int,

            NodeKind::IncDec { target, .. } => {
                let ty = self.vars.promote(&self.arena[target].exptype);
                if !ty.is_numeric() {
                    return Err(self.type_error("numeric", &ty, n, None, None));
                }
                ty
            }

            NodeKind::Neg(child) => {
                let ty = self.vars.promote(&self.arena[child].exptype);
                if !ty.is_numeric() && !matches!(ty, Type::Vector(_)) {
                    return Err(self.type_error("numeric/vector", &ty, n, None, None));
                }
                ty
            }

            NodeKind::Ident(id) => {
                self.arena[n].exptype = self.syms.ident(id).ty.clone();
                self.use_flow(n);
                return Ok(());
            }

            NodeKind::Def { ref ids, init } => {
                self.check_destructure(n, ids, init, true)?;
                Type::Any
            }
            NodeKind::AssignList { ref targets, rhs } => {
                self.check_destructure(n, targets, rhs, false)?;
                Type::Any
            }

            NodeKind::Assign { target, value } => {
                self.assign_flow(target);
                let left = self.arena[target].exptype.clone();
                self.sub_type_node(value, &left, Some("right"), "assignment")?;
                self.arena[target].exptype.clone()
            }

            NodeKind::NatCall { nf, ref args } => {
                let (ty, resolved) = self.check_native_call(n, nf, args)?;
                if resolved != nf {
                    if let NodeKind::NatCall { nf: slot, .. } = &mut self.arena[n].kind {
                        *slot = resolved;
                    }
                }
                ty
            }

            NodeKind::Call { fun, ref args, .. } => self.check_call(fun, args, n)?,

            NodeKind::DynCall { fval, ref args, .. } => {
                self.check_dyn_call(fval, args, Some(n))?
            }

            NodeKind::Return { value, target } => {
                match target {
                    // Return from the program.
                    None => Type::Any,
                    Some(fid) => {
                        let sf = match self.named_scopes.last() {
                            Some(scope) if self.syms.subfunction(scope.sf).parent == fid => {
                                scope.sf
                            }
                            _ => {
                                // Non-local return: only allowed once the
                                // target's specialization has been checked.
                                let head = self.syms.function(fid).subf[0];
                                if !self.syms.subfunction(head).typechecked {
                                    let name = self.syms.function(fid).name.clone();
                                    return Err(self.error_at(
                                        format!("return from {name} called out of context"),
                                        n,
                                        codes::NONLOCAL_RETURN,
                                    ));
                                }
                                head
                            }
                        };
                        match value.map(|v| self.arena[v].kind.clone()) {
                            Some(NodeKind::MultiRet(exps)) => {
                                for (i, &exp) in exps.iter().enumerate() {
                                    self.ret_val(Some(exp), sf, i, None)?;
                                }
                            }
                            Some(NodeKind::Call { resolved: Some(callee), .. })
                                if self.syms.subfunction(callee).returntypes.len() > 1 =>
                            {
                                // Multi-return pass-through.
                                let rets = self.syms.subfunction(callee).returntypes.clone();
                                for (i, ret) in rets.iter().enumerate() {
                                    self.ret_val(value, sf, i, Some(ret))?;
                                }
                            }
                            _ => self.ret_val(value, sf, 0, None)?,
                        }
                        match value {
                            Some(v) => self.arena[v].exptype.clone(),
                            None => Type::Any,
                        }
                    }
                }
            }

            NodeKind::If {
                cond,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(els) => {
                    let tleft = self.check_branch(true, cond, then_branch)?;
                    let tright = self.check_branch(false, cond, els)?;
                    let u = self.union_t(&tleft, &tright, false);
                    self.sub_type_t(&tleft, &u, then_branch, Some("then branch"), None)?;
                    self.sub_type_t(&tright, &u, els, Some("else branch"), None)?;
                    u
                }
                None => {
                    self.check_branch(true, cond, then_branch)?;
                    Type::Any
                }
            },

            NodeKind::While { cond, body } => {
                // The condition is a closure value called dynamically.
                self.check_dyn_call(cond, &[], None)?;
                let head = match self.arena[cond].kind {
                    NodeKind::FunVal { sf: Some(sf) } => {
                        self.syms.subfunction(sf).body.first().copied()
                    }
                    _ => None,
                };
                match head {
                    Some(head) => {
                        self.check_branch(true, head, body)?;
                    }
                    None => {
                        self.check_dyn_call(body, &[], None)?;
                    }
                }
                Type::Any
            }

            NodeKind::For { iter, body } => {
                let itertype = self.vars.promote(&self.arena[iter].exptype);
                let elemtype = match itertype {
                    Type::Int | Type::Str => Type::Int,
                    Type::Vector(elem) => *elem,
                    other => {
                        let name = self.syms.type_name(&other, &self.vars);
                        return Err(self.error_at(
                            format!("for can only iterate over int/string/vector, not: {name}"),
                            n,
                            codes::ITERATION,
                        ));
                    }
                };
                // Synthetic nodes typing the body closure's parameters:
                // the element, and the always-int index.
                let loc = self.arena[n].loc;
                let elem_var = self.arena.add(NodeKind::ForLoopVar, loc);
                self.arena[elem_var].exptype = elemtype;
                let index_var = self.arena.add(NodeKind::ForLoopVar, loc);
                self.arena[index_var].exptype = Type::Int;
                self.check_dyn_call(body, &[elem_var, index_var], None)?;
                Type::Any
            }

            NodeKind::Is { .. } => Type::Int,

            NodeKind::Constructor { ref ty, ref args } => {
                self.check_constructor(n, ty.clone(), args.clone())?
            }

            NodeKind::Dot { obj, field, maybe } => {
                let smtype = self.vars.promote(&self.arena[obj].exptype);
                let stype = match (&smtype, maybe) {
                    (Type::Nilable(elem), true) => (**elem).clone(),
                    _ => smtype.clone(),
                };
                let sid = match stype {
                    Type::Struct(sid) => sid,
                    other => {
                        return Err(self.type_error("struct/value", &other, n, Some("object"), None));
                    }
                };
                let struc = self.syms.struct_def(sid);
                let Some(found) = struc.field(field) else {
                    let msg = format!(
                        "type {} has no field named {}",
                        struc.name,
                        self.syms.field(field).name
                    );
                    return Err(self.error_at(msg, n, codes::FIELD_ABSENT));
                };
                let mut ty = found.ty.clone();
                if maybe
                    && matches!(smtype, Type::Nilable(_))
                    && !matches!(ty, Type::Nilable(_))
                {
                    ty = ty.wrap_nilable();
                }
                self.arena[n].exptype = ty;
                self.use_flow(n);
                return Ok(());
            }

            NodeKind::Index { obj, index } => {
                let vtype = self.vars.promote(&self.arena[obj].exptype);
                if !matches!(vtype, Type::Vector(_) | Type::Str) {
                    return Err(self.type_error("vector/string", &vtype, n, Some("container"), None));
                }
                let itype = self.vars.promote(&self.arena[index].exptype);
                match itype {
                    Type::Int => match vtype {
                        Type::Vector(elem) => *elem,
                        _ => Type::Int,
                    },
                    Type::Struct(sid) => {
                        // Each int field peels one vector layer.
                        let field_types: Vec<Type> = self
                            .syms
                            .struct_def(sid)
                            .fields
                            .iter()
                            .map(|f| f.ty.clone())
                            .collect();
                        let mut vtype = vtype;
                        for fty in field_types {
                            if fty != Type::Int {
                                return Err(self.type_error(
                                    "int field",
                                    &fty,
                                    n,
                                    Some("index"),
                                    None,
                                ));
                            }
                            vtype = match vtype {
                                Type::Vector(elem) => *elem,
                                other => {
                                    return Err(self.type_error(
                                        "nested vector",
                                        &other,
                                        n,
                                        Some("container"),
                                        None,
                                    ));
                                }
                            };
                        }
                        vtype
                    }
                    other => {
                        return Err(self.type_error(
                            "int/struct of int",
                            &other,
                            n,
                            Some("index"),
                            None,
                        ));
                    }
                }
            }

            NodeKind::Seq { second, .. } => self.arena[second].exptype.clone(),

            NodeKind::CoAt { var, .. } => self.arena[var].exptype.clone(),

            NodeKind::CoClosure => Type::Function(None),
            NodeKind::Coroutine(_) => Type::Coroutine,
            NodeKind::Super(child) => self.arena[child].exptype.clone(),

            NodeKind::MultiRet(_) => Type::Any,

            // Loop variables get their types where the loop is checked.
            NodeKind::ForLoopVar => return Ok(()),

            // Leftover coercions from an earlier specialization: remove
            // them and let them be regenerated if they still apply.
            NodeKind::IntToFloat(child) | NodeKind::ToString(child) => {
                self.arena.replace_with_child(n, child);
                return Ok(());
            }

            // Handled before child recursion.
            NodeKind::StructDef(_)
            | NodeKind::FunVal { .. }
            | NodeKind::And { .. }
            | NodeKind::Or { .. } => unreachable!("dispatched before child recursion"),
        };
        self.arena[n].exptype = ty;
        Ok(())
    }

    /// Bottom-up recursion into a node's children.
    fn check_children(&mut self, n: NodeId) -> CompileResult<()> {
        let kids: SmallVec<[NodeId; 4]> = match &self.arena[n].kind {
            NodeKind::BinOp { left, right, .. }
            | NodeKind::CompoundAssign {
                target: left,
                value: right,
                ..
            }
            | NodeKind::Assign {
                target: left,
                value: right,
            }
            | NodeKind::Index {
                obj: left,
                index: right,
            }
            | NodeKind::Seq {
                first: left,
                second: right,
            }
            | NodeKind::CoAt {
                coro: left,
                var: right,
            } => SmallVec::from_slice(&[*left, *right]),
            NodeKind::Not(c)
            | NodeKind::Neg(c)
            | NodeKind::Super(c)
            | NodeKind::Coroutine(c) => SmallVec::from_slice(&[*c]),
            NodeKind::IncDec { target, .. } => SmallVec::from_slice(&[*target]),
            NodeKind::Is { value, .. } => SmallVec::from_slice(&[*value]),
            NodeKind::Dot { obj, .. } => SmallVec::from_slice(&[*obj]),
            NodeKind::Def { ids, init } => {
                let mut v = SmallVec::from_slice(ids.as_slice());
                v.push(*init);
                v
            }
            NodeKind::AssignList { targets, rhs } => {
                let mut v = SmallVec::from_slice(targets.as_slice());
                v.push(*rhs);
                v
            }
            NodeKind::Call { args, .. } => SmallVec::from_slice(args.as_slice()),
            NodeKind::NatCall { args, .. } => SmallVec::from_slice(args.as_slice()),
            NodeKind::DynCall { fval, args, .. } => {
                let mut v = SmallVec::from_slice(&[*fval]);
                v.extend_from_slice(args.as_slice());
                v
            }
            NodeKind::Return { value, .. } => value.iter().copied().collect(),
            NodeKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let mut v = SmallVec::from_slice(&[*cond, *then_branch]);
                v.extend(else_branch.iter().copied());
                v
            }
            NodeKind::While { cond, body } => SmallVec::from_slice(&[*cond, *body]),
            NodeKind::For { iter, body } => SmallVec::from_slice(&[*iter, *body]),
            NodeKind::Constructor { args, .. } => SmallVec::from_slice(args.as_slice()),
            NodeKind::MultiRet(exps) => SmallVec::from_slice(exps.as_slice()),
            NodeKind::IntToFloat(c) | NodeKind::ToString(c) => SmallVec::from_slice(&[*c]),
            _ => SmallVec::new(),
        };
        for kid in kids {
            self.check(kid)?;
        }
        Ok(())
    }

    /// `and`/`or` carry refinements across their operands and have a
    /// special "only the true type matters" mode for patterns like
    /// `(a & b) | c` and `a? | b`.
    pub(crate) fn check_and_or(&mut self, n: NodeId, only_true_type: bool) -> CompileResult<Type> {
        let (is_and, left, right) = match self.arena[n].kind {
            NodeKind::And { left, right } => (true, left, right),
            NodeKind::Or { left, right } => (false, left, right),
            _ => {
                self.check(n)?;
                let ty = self.vars.promote(&self.arena[n].exptype);
                if only_true_type {
                    if let Type::Nilable(elem) = &ty {
                        return Ok((**elem).clone());
                    }
                }
                return Ok(ty);
            }
        };

        let tleft = self.check_and_or(left, !is_and)?;
        let flowstart = self.check_flow_changes(is_and, left);
        let tright = self.check_and_or(right, only_true_type)?;
        self.cleanup_flow(flowstart);

        let ty = if only_true_type && is_and {
            tright
        } else {
            self.union_t(&tleft, &tright, false)
        };
        self.arena[n].exptype = ty.clone();
        Ok(ty)
    }

    /// Shared checking for `Def` and `AssignList`: destructure the
    /// right-hand side positionally across the targets.
    fn check_destructure(
        &mut self,
        n: NodeId,
        targets: &[NodeId],
        rhs: NodeId,
        is_def: bool,
    ) -> CompileResult<()> {
        for (i, &target) in targets.iter().enumerate() {
            let ty = match self.arena[rhs].kind.clone() {
                NodeKind::Call {
                    fun,
                    resolved: Some(sf),
                    ..
                } => {
                    let rets = self.syms.subfunction(sf).returntypes.clone();
                    if rets.len() <= i {
                        let name = self.syms.function(fun).name.clone();
                        return Err(self.error_at(
                            format!(
                                "function {} returns {} values, {} requested",
                                name,
                                rets.len(),
                                i + 1
                            ),
                            n,
                            codes::TOO_FEW_RETURN_VALUES,
                        ));
                    }
                    rets[i].clone()
                }
                // For the first value the call node's own type is
                // preferred (it already folded in any specialization).
                NodeKind::NatCall { nf, .. } if i > 0 => {
                    let nat = self.syms.native(nf);
                    if nat.retvals.len() <= i {
                        let msg = format!(
                            "function {} returns {} values, {} requested",
                            nat.name,
                            nat.retvals.len(),
                            i + 1
                        );
                        return Err(self.error_at(msg, n, codes::TOO_FEW_RETURN_VALUES));
                    }
                    debug_assert_eq!(nat.retvals[i].flag, NativeFlag::None);
                    nat.retvals[i].ty.clone()
                }
                NodeKind::MultiRet(exps) => {
                    if exps.len() <= i {
                        return Err(self.error_at(
                            "right hand side does not return enough values".to_string(),
                            n,
                            codes::TOO_FEW_RETURN_VALUES,
                        ));
                    }
                    self.arena[exps[i]].exptype.clone()
                }
                _ if i == 0 => self.arena[rhs].exptype.clone(),
                _ => {
                    return Err(self.error_at(
                        "right hand side does not return enough values".to_string(),
                        n,
                        codes::TOO_FEW_RETURN_VALUES,
                    ));
                }
            };
            if is_def {
                self.arena[target].exptype = ty.clone();
                if let Some(id) = self.arena[target].kind.ident() {
                    trace!(
                        var = %self.syms.ident(id).name,
                        ty = %self.syms.type_name(&ty, &self.vars),
                        "inferred variable"
                    );
                    self.syms.ident_mut(id).ty = ty;
                }
            } else {
                self.assign_flow(target);
                let current = self.arena[target].exptype.clone();
                self.sub_type_t(&ty, &current, n, Some("right"), None)?;
            }
        }
        Ok(())
    }

    /// Overload resolution plus `SubArg1`/`AnyVar` signature
    /// specialization for a builtin call. Returns the call's type and
    /// the resolved overload.
    fn check_native_call(
        &mut self,
        n: NodeId,
        nf: NativeId,
        args: &[NodeId],
    ) -> CompileResult<(Type, NativeId)> {
        let mut nf = nf;
        let first = self.syms.native(nf).first;
        if self.syms.native(first).overload.is_some() {
            // Multiple overloads: exactly one must accept the arguments.
            let mut chosen: Option<NativeId> = None;
            let mut cur = Some(first);
            while let Some(cand) = cur {
                let cand_args: Vec<Type> = self
                    .syms
                    .native(cand)
                    .args
                    .iter()
                    .map(|a| a.ty.clone())
                    .collect();
                cur = self.syms.native(cand).overload;
                let mut fits = true;
                for (i, &a) in args.iter().enumerate() {
                    if i >= cand_args.len() {
                        break;
                    }
                    let given = self.arena[a].exptype.clone();
                    if !self.converts_to(&given, &cand_args[i], true) {
                        fits = false;
                        break;
                    }
                }
                if fits {
                    if chosen.is_some() {
                        let name = self.syms.native(cand).name.clone();
                        return Err(self.error_at(
                            format!("arguments match more than one overload of {name}"),
                            n,
                            codes::OVERLOAD_RESOLUTION,
                        ));
                    }
                    chosen = Some(cand);
                }
            }
            nf = match chosen {
                Some(c) => c,
                None => {
                    let name = self.syms.native(first).name.clone();
                    return Err(self.error_at(
                        format!("arguments match no overloads of {name}"),
                        n,
                        codes::OVERLOAD_RESOLUTION,
                    ));
                }
            };
        }

        let fname = self.syms.native(nf).name.clone();
        let mut argtypes: SmallVec<[Type; 4]> = SmallVec::new();
        for (i, &a) in args.iter().enumerate() {
            let decl = self.syms.native(nf).args[i].clone();
            let mut argtype = decl.ty;
            match decl.flag {
                NativeFlag::SubArg1 => {
                    // This argument follows argument 0's type.
                    let sub = if let Type::Vector(elem) = &argtypes[0] {
                        if matches!(argtype, Type::Vector(_)) {
                            argtypes[0].clone()
                        } else {
                            (**elem).clone()
                        }
                    } else {
                        argtypes[0].clone()
                    };
                    self.sub_type_node(a, &sub, Some(&Self::arg_name(i)), &fname)?;
                }
                NativeFlag::AnyVar => {
                    argtype = match argtype {
                        Type::Vector(_) => self.vars.fresh().wrap_vector(),
                        _ => self.vars.fresh(),
                    };
                }
                NativeFlag::None => {}
            }
            self.sub_type_node(a, &argtype, Some(&Self::arg_name(i)), &fname)?;
            argtypes.push(self.arena[a].exptype.clone());
        }

        let ty = match self.syms.native(nf).retvals.first().cloned() {
            None => Type::Any,
            Some(ret) => match ret.flag {
                NativeFlag::SubArg1 => {
                    if matches!(ret.ty, Type::Nilable(_)) {
                        argtypes[0].clone().wrap_nilable()
                    } else {
                        argtypes[0].clone()
                    }
                }
                NativeFlag::AnyVar => {
                    if matches!(ret.ty, Type::Vector(_)) {
                        self.vars.fresh().wrap_vector()
                    } else {
                        self.vars.fresh()
                    }
                }
                NativeFlag::None => ret.ty,
            },
        };
        Ok((ty, nf))
    }

    /// Constructor checking: infer an untyped vector's element type,
    /// specialize a record, then check every element against its slot.
    fn check_constructor(
        &mut self,
        n: NodeId,
        ty: Option<Type>,
        args: Vec<NodeId>,
    ) -> CompileResult<Type> {
        let mut ctype = match ty {
            Some(t) => t,
            None => {
                // Untyped vector literal: unify the element types.
                let mut union: Option<Type> = None;
                for &a in &args {
                    let at = self.arena[a].exptype.clone();
                    union = Some(match union {
                        None => at,
                        Some(u) => self.union_t(&u, &at, true),
                    });
                }
                match union {
                    Some(u) => u.wrap_vector(),
                    // Empty literal: element stays open.
                    None => self.vars.fresh().wrap_vector(),
                }
            }
        };
        if let Type::Struct(head) = ctype {
            ctype = Type::Struct(self.specialize_struct(head, &args)?);
        }

        let mut i = 0usize;
        for &a in &args {
            let (elemtype, advance) = if matches!(self.arena[a].kind, NodeKind::Super(_)) {
                let Type::Struct(sid) = &ctype else {
                    return Err(self.error_at(
                        "super used outside of a record constructor".to_string(),
                        a,
                        codes::UNKNOWN_SUPER_FIELD,
                    ));
                };
                let super_idx = match self.syms.struct_def(*sid).superclass {
                    Some(s) => s,
                    None => {
                        return Err(self.error_at(
                            "super used in record without superclass".to_string(),
                            a,
                            codes::UNKNOWN_SUPER_FIELD,
                        ));
                    }
                };
                let prefix = self.syms.struct_def(super_idx).fields.len();
                (Type::Struct(super_idx), prefix)
            } else {
                let slot = match &ctype {
                    Type::Struct(sid) => self.syms.struct_def(*sid).fields[i].ty.clone(),
                    Type::Vector(elem) => (**elem).clone(),
                    _ => Type::Any,
                };
                (slot, 1)
            };
            self.sub_type_node(a, &elemtype, Some(&Self::arg_name(i)), "constructor")?;
            i += advance;
        }
        Ok(ctype)
    }
}

#[cfg(test)]
#[path = "tests/checker_tests.rs"]
mod checker_tests;
#[cfg(test)]
#[path = "tests/flow_tests.rs"]
mod flow_tests;
#[cfg(test)]
#[path = "tests/relation_tests.rs"]
mod relation_tests;
#[cfg(test)]
#[path = "tests/specialize_tests.rs"]
mod specialize_tests;

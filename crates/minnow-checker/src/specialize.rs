//! Record and function specialization, and call checking.

use minnow_ast::{NodeId, NodeKind};
use minnow_binder::{Arg, ArgFlags, SubFunction};
use minnow_common::{CompileResult, codes};
use minnow_solver::{FuncId, StructId, SubFuncId, Type};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::trace;

use crate::checker::{Scope, TypeChecker};

impl TypeChecker<'_> {
    /// Recompute a record's vector element type: the common type of all
    /// fields, `Undefined` when non-uniform. Stored wrapped.
    pub(crate) fn compute_struct_vectortype(&mut self, sid: StructId) {
        let fields: Vec<Type> = self
            .syms
            .struct_def(sid)
            .fields
            .iter()
            .map(|f| f.ty.clone())
            .collect();
        if let Some(first) = fields.first() {
            let mut common = first.clone();
            for ty in &fields[1..] {
                if !self.exact_type(ty, &common) {
                    common = Type::Undefined;
                    break;
                }
            }
            self.syms.struct_mut(sid).vectortype = common.wrap_vector();
        }
    }

    /// Match or create the specialization of `head` fitting a
    /// constructor's argument types. `super` arguments contribute the
    /// superclass's field prefix.
    pub(crate) fn specialize_struct(
        &mut self,
        head: StructId,
        args: &[NodeId],
    ) -> CompileResult<StructId> {
        // All fields typed: nothing to specialize.
        if !self.syms.struct_def(head).fields.iter().any(|f| f.generic) {
            self.compute_struct_vectortype(head);
            return Ok(head);
        }

        // Collect the constructor's field types, expanding super.
        let mut argtypes: SmallVec<[Type; 8]> = SmallVec::new();
        for &a in args {
            if matches!(self.arena[a].kind, NodeKind::Super(_)) {
                let stype = self.arena[a].exptype.clone();
                let super_idx = match self.syms.struct_def(head).superclass {
                    Some(s) => s,
                    None => {
                        return Err(self.error_at(
                            "super used in record without superclass".to_string(),
                            a,
                            codes::UNKNOWN_SUPER_FIELD,
                        ));
                    }
                };
                let stype =
                    self.sub_type_t(&stype, &Type::Struct(super_idx), a, None, Some("super"))?;
                if let Type::Struct(ss) = stype {
                    for f in &self.syms.struct_def(ss).fields {
                        argtypes.push(f.ty.clone());
                    }
                }
            } else {
                argtypes.push(self.arena[a].exptype.clone());
            }
        }
        debug_assert_eq!(argtypes.len(), self.syms.struct_def(head).fields.len());

        // Walk the specialization chain for a fit.
        let mut cur = Some(head);
        while let Some(s) = cur {
            let fits = self
                .syms
                .struct_def(s)
                .fields
                .iter()
                .zip(argtypes.iter())
                .all(|(f, ty)| !f.generic || self.exact_type(ty, &f.ty));
            if fits {
                return Ok(s);
            }
            cur = self.syms.struct_def(s).next;
        }

        // No fit: specialize the head if untouched, else a clone of it.
        let target = if self.syms.struct_def(head).typechecked {
            let clone = self.syms.clone_struct(head);
            let after = self.syms.struct_def(head).next;
            self.syms.struct_mut(clone).next = after;
            self.syms.struct_mut(head).next = Some(clone);
            trace!(name = %self.syms.struct_def(clone).name, "cloned struct");
            clone
        } else {
            head
        };
        self.syms.struct_mut(target).typechecked = true;
        for (i, ty) in argtypes.iter().enumerate() {
            if self.syms.struct_def(target).fields[i].generic {
                self.syms.struct_mut(target).fields[i].ty = ty.clone();
            }
        }
        let struc = self.syms.struct_def(target).clone();
        trace!(signature = %self.syms.struct_signature(&struc, &self.vars), "specialized struct");
        self.compute_struct_vectortype(target);
        Ok(target)
    }

    /// Type-check a call to `fidx` and return its first return type.
    /// Records the resolved SubFunction on `def_node`.
    pub(crate) fn check_call(
        &mut self,
        fidx: FuncId,
        args: &[NodeId],
        def_node: NodeId,
    ) -> CompileResult<Type> {
        let f = self.syms.function(fidx).clone();

        if f.multimethod {
            // Every overload is checked with its declared types; the call
            // type is the union of their first return types.
            for &sf in &f.subf {
                self.check_subfunction(sf, def_node)?;
            }
            let mut ty = self.syms.subfunction(f.subf[0]).returntypes[0].clone();
            for &sf in &f.subf[1..] {
                let rt = self.syms.subfunction(sf).returntypes[0].clone();
                ty = self.union_t(&ty, &rt, false);
            }
            self.set_resolved(def_node, f.subf[0]);
            return Ok(ty);
        }

        let template = f.subf[0];
        let needs_specialization = self
            .syms
            .subfunction(template)
            .args
            .iter()
            .any(|a| a.flags.contains(ArgFlags::ANY_TYPE))
            || !self.syms.subfunction(template).freevars.is_empty();

        let sf = if !needs_specialization {
            template
        } else {
            debug_assert!(!f.istype);
            match self.find_specialization(&f.subf, args, f.nargs) {
                Some(found) => found,
                None => {
                    let new_sf = self.clone_subfunction(fidx)?;
                    for (i, &a) in args.iter().take(f.nargs).enumerate() {
                        if self.syms.subfunction(new_sf).args[i]
                            .flags
                            .contains(ArgFlags::ANY_TYPE)
                        {
                            let ty = self.arena[a].exptype.clone();
                            trace!(
                                arg = %self.syms.ident(self.syms.subfunction(new_sf).args[i].ident).name,
                                ty = %self.syms.type_name(&ty, &self.vars),
                                "specializing argument"
                            );
                            self.syms.subfunction_mut(new_sf).args[i].ty = ty;
                        }
                    }
                    // Free variables specialize to their current types.
                    let freevars = self.syms.subfunction(new_sf).freevars.clone();
                    for (i, fv) in freevars.iter().enumerate() {
                        let ty = self.syms.ident(fv.ident).ty.clone();
                        self.syms.subfunction_mut(new_sf).freevars[i].ty = ty;
                    }
                    trace!(
                        signature = %self.syms.signature_with_freevars(new_sf, &self.vars),
                        "specialization"
                    );
                    new_sf
                }
            }
        };

        // Enforce the manually typed arguments (coercions allowed).
        for (i, &a) in args.iter().take(f.nargs).enumerate() {
            let arg = self.syms.subfunction(sf).args[i].clone();
            if !arg.flags.contains(ArgFlags::ANY_TYPE) {
                self.sub_type_node(a, &arg.ty, Some(&Self::arg_name(i)), &f.name)?;
            }
        }
        if !f.istype {
            self.check_subfunction(sf, def_node)?;
        }
        self.set_resolved(def_node, sf);
        let ret = self.syms.subfunction(sf).returntypes[0].clone();
        trace!(
            signature = %self.syms.signature(sf, &self.vars),
            returns = %self.syms.type_name(&ret, &self.vars),
            "function call checked"
        );
        Ok(ret)
    }

    /// Find an existing specialization whose specialized argument types
    /// exactly match the call site and whose free variables still have
    /// the types they were captured with.
    fn find_specialization(
        &self,
        subf: &[SubFuncId],
        args: &[NodeId],
        nargs: usize,
    ) -> Option<SubFuncId> {
        'candidates: for &cand in subf {
            let sub = self.syms.subfunction(cand);
            if !sub.typechecked {
                continue;
            }
            for (i, &a) in args.iter().take(nargs).enumerate() {
                let arg = &sub.args[i];
                if arg.flags.contains(ArgFlags::ANY_TYPE)
                    && !self.exact_type(&self.arena[a].exptype, &arg.ty)
                {
                    continue 'candidates;
                }
            }
            for fv in &sub.freevars {
                if fv.ty != self.syms.ident(fv.ident).ty {
                    continue 'candidates;
                }
            }
            return Some(cand);
        }
        None
    }

    /// Clone the template SubFunction: fresh argument and local
    /// identifiers, body cloned with references remapped. The clone is
    /// appended to the function's chain.
    fn clone_subfunction(&mut self, fidx: FuncId) -> CompileResult<SubFuncId> {
        trace!(name = %self.syms.function(fidx).name, "cloning function");
        let template = self.syms.function(fidx).subf[0];
        let t = self.syms.subfunction(template).clone();

        let mut remap = FxHashMap::default();
        let args = self.clone_arg_idents(&t.args, &mut remap);
        let locals = self.clone_arg_idents(&t.locals, &mut remap);

        let body: Vec<NodeId> = t
            .body
            .iter()
            .map(|&n| self.arena.clone_subtree(n, &remap))
            .collect();

        let sf = self.syms.add_subfunction(SubFunction {
            parent: fidx,
            args,
            locals,
            freevars: t.freevars.clone(),
            body,
            body_loc: t.body_loc,
            returntypes: Vec::new(),
            typechecked: false,
            subbytecodestart: 0,
        });
        self.syms.function_mut(fidx).subf.push(sf);
        Ok(sf)
    }

    /// Fresh identifiers for the arguments/locals of a clone; the old to
    /// new mapping accumulates in `remap` for body cloning.
    fn clone_arg_idents(
        &mut self,
        list: &[Arg],
        remap: &mut FxHashMap<minnow_solver::IdentId, minnow_solver::IdentId>,
    ) -> Vec<Arg> {
        list.iter()
            .map(|a| {
                let name = self.syms.ident(a.ident).name.clone();
                let is_logvar = self.syms.ident(a.ident).is_logvar;
                let id = self.syms.new_ident(name);
                self.syms.ident_mut(id).is_logvar = is_logvar;
                remap.insert(a.ident, id);
                Arg::new(id, a.ty.clone(), a.flags)
            })
            .collect()
    }

    /// Check a SubFunction body once. Argument identifiers temporarily
    /// take their specialized types (and are restored afterwards, since
    /// identifiers outlive any one specialization - think recursion).
    pub(crate) fn check_subfunction(
        &mut self,
        sf: SubFuncId,
        call_context: NodeId,
    ) -> CompileResult<()> {
        if self.syms.subfunction(sf).typechecked {
            return Ok(());
        }
        let scope = Scope { sf, call_context };
        self.scopes.push(scope);
        let anonymous = self
            .syms
            .function(self.syms.subfunction(sf).parent)
            .anonymous;
        if !anonymous {
            self.named_scopes.push(scope);
        }
        self.syms.subfunction_mut(sf).typechecked = true;

        let args = self.syms.subfunction(sf).args.clone();
        let locals = self.syms.subfunction(sf).locals.clone();
        let backup_args: Vec<Type> = args
            .iter()
            .map(|a| {
                let prev = self.syms.ident(a.ident).ty.clone();
                self.syms.ident_mut(a.ident).ty = a.ty.clone();
                prev
            })
            .collect();
        let backup_locals: Vec<Type> = locals
            .iter()
            .map(|a| self.syms.ident(a.ident).ty.clone())
            .collect();

        let fresh = self.vars.fresh();
        {
            let rts = &mut self.syms.subfunction_mut(sf).returntypes;
            rts.clear();
            rts.push(fresh);
        }

        let body = self.syms.subfunction(sf).body.clone();
        for &stmt in &body {
            self.check(stmt)?;
        }

        for (a, ty) in args.iter().zip(backup_args) {
            self.syms.ident_mut(a.ident).ty = ty;
        }
        for (a, ty) in locals.iter().zip(backup_locals) {
            self.syms.ident_mut(a.ident).ty = ty;
        }

        // The last statement's value is the implicit return.
        if let Some(&last) = body.last() {
            if !matches!(self.arena[last].kind, NodeKind::Return { .. }) {
                self.ret_val(Some(last), sf, 0, None)?;
            }
        }

        if !anonymous {
            self.named_scopes.pop();
        }
        self.scopes.pop();
        Ok(())
    }

    /// Feed a value (or an exact pass-through type) into return slot `i`
    /// of `sf`, growing the slot list on first sight.
    pub(crate) fn ret_val(
        &mut self,
        value: Option<NodeId>,
        sf: SubFuncId,
        i: usize,
        exact: Option<&Type>,
    ) -> CompileResult<()> {
        let len = self.syms.subfunction(sf).returntypes.len();
        if i >= len {
            debug_assert_eq!(i, len);
            let ty = match (exact, value) {
                (Some(et), _) => et.clone(),
                (None, Some(v)) => self.arena[v].exptype.clone(),
                (None, None) => Type::Any,
            };
            self.syms.subfunction_mut(sf).returntypes.push(ty);
            return Ok(());
        }
        let target = self.syms.subfunction(sf).returntypes[i].clone();
        if let Some(et) = exact {
            if let Some(v) = value {
                self.sub_type_t(et, &target, v, None, None)?;
            }
        } else if let Some(v) = value {
            self.sub_type_node(v, &target, None, "return value")?;
        } else {
            self.syms.subfunction_mut(sf).returntypes[i] = Type::Any;
        }
        Ok(())
    }

    /// Record the resolved SubFunction on a call-site or function-value
    /// node. Ownership stays with the function table.
    pub(crate) fn set_resolved(&mut self, node: NodeId, sf: SubFuncId) {
        match &mut self.arena[node].kind {
            NodeKind::Call { resolved, .. } => *resolved = Some(sf),
            NodeKind::DynCall { resolved, .. } => *resolved = Some(sf),
            NodeKind::FunVal { sf: slot } => *slot = Some(sf),
            _ => {}
        }
    }

    /// A call through a function value. Statically dispatched when the
    /// value's type names a function; fully dynamic (`any`) otherwise.
    pub(crate) fn check_dyn_call(
        &mut self,
        fval: NodeId,
        args: &[NodeId],
        fdef: Option<NodeId>,
    ) -> CompileResult<Type> {
        let ftype = self.vars.promote(&self.arena[fval].exptype);
        if let Type::Function(Some(fidx)) = ftype {
            if args.len() < self.syms.function(fidx).nargs {
                return Err(self.error_at(
                    "function value called with too few arguments".to_string(),
                    fval,
                    codes::ARITY_MISMATCH,
                ));
            }
            // Extra arguments are ignored, here and in code generation.
            self.check_call(fidx, args, fdef.unwrap_or(fval))
        } else {
            // Dispatched entirely at runtime.
            Ok(Type::Any)
        }
    }

    /// Check a branch body under the flow refinements implied by
    /// `condition` evaluating to `iftrue`.
    pub(crate) fn check_branch(
        &mut self,
        iftrue: bool,
        condition: NodeId,
        fval: NodeId,
    ) -> CompileResult<Type> {
        let flowstart = self.check_flow_changes(iftrue, condition);
        let ty = self.check_dyn_call(fval, &[], None)?;
        self.cleanup_flow(flowstart);
        Ok(ty)
    }
}

//! AST-directed bytecode emission.

use minnow_ast::{NodeArena, NodeId, NodeKind};
use minnow_binder::Symbols;
use minnow_common::{CompileResult, Diagnostic, SrcLoc, codes};
use minnow_solver::{FieldId, FuncId, IdentId, SubFuncId, Type, TypeTag};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::field_dispatch::FieldEncoding;
use crate::opcodes::{LvalOp, Opcode};

/// One line-info entry: emitted whenever `(line, file)` changes from the
/// previous entry; the first emission is always recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInfo {
    pub line: u32,
    pub file: u32,
    pub offset: usize,
}

/// The generator's output: the instruction stream and its line table.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Program {
    pub code: Vec<i32>,
    pub line_info: Vec<LineInfo>,
}

/// Lower a checked program. The symbol table is borrowed mutably for
/// call counting and function layout offsets.
pub fn generate(arena: &NodeArena, syms: &mut Symbols, root: &[NodeId]) -> CompileResult<Program> {
    let start_loc = root
        .first()
        .map(|&n| arena[n].loc)
        .unwrap_or_else(SrcLoc::dummy);
    let mut cg = CodeGen {
        arena,
        syms,
        code: Vec::new(),
        line_info: Vec::new(),
        loc_stack: vec![start_loc],
        call_fixups: Vec::new(),
        field_encodings: FxHashMap::default(),
    };

    cg.gen_field_tables();

    let last = root.len().saturating_sub(1);
    for (i, &stmt) in root.iter().enumerate() {
        cg.gen_node(stmt, usize::from(i == last))?;
    }
    cg.emit_op(Opcode::Exit);

    // Breadth-first generation of the functions that are actually used.
    loop {
        let mut generated = 0;
        for i in 0..cg.syms.functions.len() {
            if cg.gen_function(FuncId::from_index(i))? {
                generated += 1;
            }
        }
        if generated == 0 {
            break;
        }
    }

    // Patch deferred call targets now that every body has an offset.
    for (slot, sf) in std::mem::take(&mut cg.call_fixups) {
        let func = cg.syms.function(cg.syms.subfunction(sf).parent);
        let start = if func.multimethod {
            func.bytecodestart
        } else {
            cg.syms.subfunction(sf).subbytecodestart
        };
        debug_assert!(start != 0, "fixup target was never emitted");
        debug_assert_eq!(cg.code[slot], 0, "fixup slot already patched");
        cg.code[slot] = start as i32;
    }

    Ok(Program {
        code: cg.code,
        line_info: cg.line_info,
    })
}

/// Emission state. Owns the growing code and line-info vectors; the
/// current source location is tracked as a stack pushed per node.
pub struct CodeGen<'a> {
    pub(crate) arena: &'a NodeArena,
    pub(crate) syms: &'a mut Symbols,
    pub(crate) code: Vec<i32>,
    pub(crate) line_info: Vec<LineInfo>,
    loc_stack: Vec<SrcLoc>,
    call_fixups: Vec<(usize, SubFuncId)>,
    pub(crate) field_encodings: FxHashMap<FieldId, FieldEncoding>,
}

impl CodeGen<'_> {
    pub(crate) fn emit(&mut self, word: i32) {
        let loc = self.loc_stack.last().copied().unwrap_or_else(SrcLoc::dummy);
        let changed = match self.line_info.last() {
            None => true,
            Some(prev) => prev.line != loc.line || prev.file != loc.file,
        };
        if changed {
            self.line_info.push(LineInfo {
                line: loc.line,
                file: loc.file,
                offset: self.code.len(),
            });
        }
        self.code.push(word);
    }

    pub(crate) fn emit_op(&mut self, op: Opcode) {
        self.emit(op.word());
    }

    /// Current code offset; used with [`Self::patch_to_here`], which
    /// writes the current offset into the word *before* the mark.
    pub(crate) fn mark(&self) -> usize {
        self.code.len()
    }

    pub(crate) fn patch_to_here(&mut self, mark: usize) {
        self.code[mark - 1] = self.code.len() as i32;
    }

    /// Balance the stack with undefineds where a value is expected but
    /// none is produced.
    fn dummy(&mut self, retval: usize) {
        for _ in 0..retval {
            self.emit_op(Opcode::PushUndef);
        }
    }

    fn err(&self, n: NodeId, msg: impl Into<String>, code: u32) -> Diagnostic {
        Diagnostic::error(self.arena[n].loc, msg, code)
    }

    /// Emit one function if it is reachable and not yet laid out.
    fn gen_function(&mut self, fidx: FuncId) -> CompileResult<bool> {
        let func = self.syms.function(fidx);
        if func.bytecodestart > 0 || func.ncalls == 0 {
            return Ok(false);
        }
        let subf = func.subf.clone();
        let nargs = func.nargs;

        if !func.multimethod {
            self.syms.function_mut(fidx).bytecodestart = self.code.len();
            for &sf in &subf {
                // A template that was never specialized has no checked
                // body to emit; only live specializations are laid out.
                if !self.syms.subfunction(sf).typechecked {
                    continue;
                }
                self.syms.subfunction_mut(sf).subbytecodestart = self.code.len();
                self.gen_scope(sf)?;
            }
        } else {
            for &sf in &subf {
                self.syms.subfunction_mut(sf).subbytecodestart = self.code.len();
                self.gen_scope(sf)?;
            }

            // The dispatch table is ordered by argument type tuple.
            let mut keyed: Vec<(Vec<Type>, SubFuncId)> = subf
                .iter()
                .map(|&sf| {
                    let types = self
                        .syms
                        .subfunction(sf)
                        .args
                        .iter()
                        .map(|a| a.ty.clone())
                        .collect();
                    (types, sf)
                })
                .collect();
            keyed.sort_by(|a, b| a.0.cmp(&b.0));
            for pair in keyed.windows(2) {
                if pair[0].0 == pair[1].0 {
                    let name = self.syms.function(fidx).name.clone();
                    let loc = self.syms.subfunction(pair[1].1).body_loc;
                    return Err(Diagnostic::error(
                        loc,
                        format!("function signature overlap for {name}"),
                        codes::MULTI_DISPATCH_AMBIGUITY,
                    ));
                }
            }

            self.syms.function_mut(fidx).bytecodestart = self.code.len();
            self.emit_op(Opcode::FunMulti);
            self.emit(keyed.len() as i32);
            self.emit(nargs as i32);
            for (types, sf) in keyed {
                for ty in &types {
                    self.emit(ty.dispatch_tag());
                    self.emit(ty.type_idx());
                }
                self.emit(self.syms.subfunction(sf).subbytecodestart as i32);
            }
        }
        Ok(true)
    }

    /// Emit one SubFunction body with its frame layout header.
    fn gen_scope(&mut self, sf: SubFuncId) -> CompileResult<()> {
        let sub = self.syms.subfunction(sf).clone();

        // Collect definitions and log variables in body order; the
        // initializers of one multi-definition unwind in reverse on the
        // runtime stack, so its logvars are reversed to match.
        let mut defs: Vec<IdentId> = Vec::new();
        let mut logvars: Vec<IdentId> = Vec::new();
        for &stmt in &sub.body {
            if let NodeKind::Def { ids, .. } = &self.arena[stmt].kind {
                let stmt_start = logvars.len();
                for &idn in ids {
                    if let Some(id) = self.arena[idn].kind.ident() {
                        if self.syms.ident(id).is_logvar {
                            self.syms.ident_mut(id).logvar_slot = logvars.len() as u32;
                            logvars.push(id);
                        } else {
                            defs.push(id);
                        }
                    }
                }
                logvars[stmt_start..].reverse();
            }
        }

        self.loc_stack.push(sub.body_loc);

        self.emit_op(Opcode::FunStart);
        self.emit(sub.args.len() as i32);
        for arg in &sub.args {
            self.emit(arg.ident.0 as i32);
        }
        self.emit((defs.len() + logvars.len()) as i32);
        for id in &defs {
            self.emit(id.0 as i32);
        }
        for id in &logvars {
            self.emit(id.0 as i32);
        }
        self.emit(logvars.len() as i32);

        if sub.body.is_empty() {
            self.dummy(1);
        } else {
            let last = sub.body.len() - 1;
            for (i, &stmt) in sub.body.iter().enumerate() {
                self.gen_node(stmt, usize::from(i == last))?;
            }
        }
        self.emit_op(Opcode::FunEnd);

        self.loc_stack.pop();
        Ok(())
    }

    /// A branch body is a closure value invoked inline.
    fn gen_inline_scope(&mut self, closure: NodeId, retval: usize, nargs: usize) -> CompileResult<()> {
        self.gen_node(closure, 1)?;
        self.emit_op(Opcode::CallV);
        self.emit(nargs as i32);
        if retval == 0 {
            self.emit_op(Opcode::Pop);
        }
        Ok(())
    }

    /// Runtime type-check instruction for a constructor slot or a typed
    /// call argument, elided when the static types already agree.
    fn gen_type_check(&mut self, given: &Type, wanted: &Type) {
        if given == wanted {
            return;
        }
        match wanted {
            Type::Any => {}
            Type::Float => self.emit_op(Opcode::TtFlt),
            Type::Str => self.emit_op(Opcode::TtStr),
            Type::Struct(s) => {
                self.emit_op(Opcode::TtStruct);
                self.emit(s.0 as i32);
            }
            _ => {
                self.emit_op(Opcode::Tt);
                self.emit(wanted.tag() as i32);
            }
        }
    }

    /// Emit the arguments of a static call and the call itself,
    /// deferring the target offset when the callee is not yet laid out.
    /// Returns the callee's declared return-value count.
    fn gen_static_call(
        &mut self,
        sf: SubFuncId,
        args: &[NodeId],
        errnode: NodeId,
    ) -> CompileResult<usize> {
        let fidx = self.syms.subfunction(sf).parent;
        let func = self.syms.function(fidx);
        let (multimethod, fnargs, fretvals) = (func.multimethod, func.nargs, func.retvals);
        let params: Vec<Type> = self
            .syms
            .subfunction(sf)
            .args
            .iter()
            .map(|a| a.ty.clone())
            .collect();
        let checkargs = if multimethod { 0 } else { params.len() };

        // Arguments beyond the parameter list are skipped; this happens
        // for dynamic calls.
        let mut nargs = 0usize;
        for &a in args {
            if nargs >= params.len() {
                break;
            }
            self.gen_node(a, 1)?;
            if nargs < checkargs {
                let given = self.arena[a].exptype.clone();
                self.gen_type_check(&given, &params[nargs]);
            }
            nargs += 1;
        }
        if fnargs != nargs {
            let name = self.syms.function(fidx).name.clone();
            return Err(self.err(
                errnode,
                format!("call to function {name} needs {fnargs} arguments, {nargs} given"),
                codes::ARITY_MISMATCH,
            ));
        }
        self.syms.function_mut(fidx).ncalls += 1;

        let func = self.syms.function(fidx);
        let start = if multimethod {
            func.bytecodestart
        } else {
            self.syms.subfunction(sf).subbytecodestart
        };
        self.emit_op(if multimethod {
            Opcode::CallMulti
        } else {
            Opcode::Call
        });
        self.emit(nargs as i32);
        self.emit(fidx.0 as i32);
        self.emit(start as i32);
        if start == 0 {
            self.call_fixups.push((self.code.len() - 1, sf));
        }
        Ok(fretvals)
    }

    /// Lower one node, leaving `retval` values on the stack (0 discards,
    /// >1 requests extra copies of a single value).
    pub(crate) fn gen_node(&mut self, n: NodeId, retval: usize) -> CompileResult<()> {
        self.loc_stack.push(self.arena[n].loc);
        // Most kinds supply 0 or 1 values; anything else records how
        // many so the tail below can reconcile with the caller's wish.
        let mut maxretvalsupplied = 1usize;

        match self.arena[n].kind.clone() {
            NodeKind::Int(v) => {
                if retval > 0 {
                    self.emit_op(Opcode::PushInt);
                    self.emit(v);
                }
            }
            NodeKind::Float(v) => {
                if retval > 0 {
                    self.emit_op(Opcode::PushFlt);
                    self.emit((v as f32).to_bits() as i32);
                }
            }
            NodeKind::Str(s) => {
                if retval > 0 {
                    self.emit_op(Opcode::PushStr);
                    for byte in s.bytes() {
                        self.emit(byte as i32);
                    }
                    self.emit(0);
                }
            }
            NodeKind::Nil => {
                if retval > 0 {
                    self.emit_op(Opcode::PushNil);
                }
            }
            NodeKind::Ident(id) => {
                if retval > 0 {
                    self.emit_op(Opcode::PushVar);
                    self.emit(id.0 as i32);
                }
            }

            NodeKind::Dot { obj, field, maybe } => {
                self.gen_node(obj, retval)?;
                if retval > 0 {
                    self.gen_field_access(field, None, maybe);
                }
            }
            NodeKind::Index { obj, index } => {
                self.gen_node(obj, retval)?;
                self.gen_node(index, retval)?;
                if retval > 0 {
                    self.emit_op(Opcode::PushIdx);
                }
            }
            NodeKind::CoAt { coro, var } => {
                self.gen_node(coro, retval)?;
                if retval > 0 {
                    if let Some(id) = self.arena[var].kind.ident() {
                        self.emit_op(Opcode::PushLoc);
                        self.emit(id.0 as i32);
                    }
                }
            }

            NodeKind::Def { ids, init } => {
                self.gen_node(init, ids.len())?;
                for &idn in ids.iter().rev() {
                    let Some(id) = self.arena[idn].kind.ident() else {
                        return Err(self.err(idn, "lvalue required", codes::LVALUE_REQUIRED));
                    };
                    let ident = self.syms.ident(id);
                    if ident.is_logvar {
                        let slot = ident.logvar_slot;
                        self.emit_op(Opcode::LogRead);
                        self.emit(slot as i32);
                    }
                    self.emit_op(Opcode::LvalVar);
                    self.emit(LvalOp::WriteD.word());
                    self.emit(id.0 as i32);
                }
                self.dummy(retval);
            }
            NodeKind::AssignList { targets, rhs } => {
                self.gen_node(rhs, targets.len())?;
                for &t in targets.iter().rev() {
                    let Some(id) = self.arena[t].kind.ident() else {
                        return Err(self.err(t, "lvalue required", codes::LVALUE_REQUIRED));
                    };
                    self.emit_op(Opcode::LvalVar);
                    self.emit(LvalOp::Write.word());
                    self.emit(id.0 as i32);
                }
                self.dummy(retval);
            }

            NodeKind::Assign { target, value } => {
                self.gen_assign(target, LvalOp::Write, retval, Some(value))?;
            }
            NodeKind::CompoundAssign { op, target, value } => {
                let Some(lop) = LvalOp::for_arith(op) else {
                    return Err(self.err(n, "lvalue required", codes::LVALUE_REQUIRED));
                };
                self.gen_assign(target, lop, retval, Some(value))?;
            }
            NodeKind::IncDec { op, target } => {
                self.gen_assign(target, LvalOp::for_incdec(op), retval, None)?;
            }

            NodeKind::BinOp { op, left, right } => {
                self.gen_node(left, retval)?;
                self.gen_node(right, retval)?;
                if retval > 0 {
                    let base = match self.arena[left].exptype {
                        Type::Int => Opcode::IAdd,
                        Type::Float => Opcode::FAdd,
                        _ => Opcode::AAdd,
                    };
                    self.emit(base.word() + op as i32);
                }
            }
            NodeKind::Neg(child) => {
                self.gen_node(child, retval)?;
                if retval > 0 {
                    self.emit_op(Opcode::UMinus);
                }
            }
            NodeKind::Not(child) => {
                self.gen_node(child, retval)?;
                if retval > 0 {
                    self.emit_op(Opcode::LogNot);
                }
            }
            NodeKind::IntToFloat(child) => {
                self.gen_node(child, retval)?;
                if retval > 0 {
                    self.emit_op(Opcode::I2F);
                }
            }
            NodeKind::ToString(child) => {
                self.gen_node(child, retval)?;
                if retval > 0 {
                    self.emit_op(Opcode::A2S);
                }
            }

            NodeKind::FunVal { sf } => {
                if retval > 0 {
                    match sf {
                        Some(sf)
                            if self
                                .syms
                                .function(self.syms.subfunction(sf).parent)
                                .anonymous =>
                        {
                            self.emit_op(Opcode::PushFun);
                            self.emit(0);
                            let mark = self.mark();
                            self.gen_scope(sf)?;
                            self.patch_to_here(mark);
                        }
                        // Named function values defer to the call site.
                        _ => self.dummy(retval),
                    }
                }
            }
            NodeKind::StructDef(_) => {
                self.dummy(retval);
            }

            NodeKind::Call { args, resolved, .. } => {
                let Some(sf) = resolved else {
                    return Err(self.err(n, "call site was never resolved", codes::INTERNAL));
                };
                let retvals = self.gen_static_call(sf, &args, n)?;
                if retvals > 1 {
                    maxretvalsupplied = retvals;
                }
                if retval == 0 {
                    self.emit_op(Opcode::Pop);
                }
            }
            NodeKind::DynCall {
                fval,
                args,
                resolved,
            } => {
                let static_sf = resolved.filter(|&sf| {
                    !self.syms.function(self.syms.subfunction(sf).parent).istype
                });
                match static_sf {
                    Some(sf) => {
                        // The callee is statically known; the function
                        // value is lowered only for a possible side
                        // effect.
                        self.gen_node(fval, 0)?;
                        let retvals = self.gen_static_call(sf, &args, n)?;
                        if retvals > 1 {
                            maxretvalsupplied = retvals;
                        }
                    }
                    None => {
                        let mut nargs = 0usize;
                        for &a in &args {
                            self.gen_node(a, 1)?;
                            nargs += 1;
                        }
                        self.gen_node(fval, 1)?;
                        self.emit_op(Opcode::CallV);
                        self.emit(nargs as i32);
                    }
                }
                if retval == 0 {
                    self.emit_op(Opcode::Pop);
                }
            }
            NodeKind::NatCall { nf, args } => {
                let mut nargs = 0usize;
                let mut lastarg = None;
                for &a in &args {
                    self.gen_node(a, 1)?;
                    lastarg = Some(a);
                    nargs += 1;
                }
                let native = self.syms.native(nf);
                let (cont_exit, nretvals) = (native.cont_exit, native.retvals.len());
                self.emit_op(Opcode::BCall);
                self.emit(nf.0 as i32);
                self.emit(nargs as i32);
                if cont_exit {
                    // Re-enter the trailing closure unless it is
                    // literally nil.
                    let is_nil = lastarg
                        .map(|a| matches!(self.arena[a].kind, NodeKind::Nil))
                        .unwrap_or(true);
                    if !is_nil {
                        self.emit_op(Opcode::CallVCond);
                        self.emit(0);
                        self.emit_op(Opcode::Cont1);
                        self.emit(nf.0 as i32);
                    }
                }
                if nretvals > 1 {
                    maxretvalsupplied = nretvals;
                }
                if retval == 0 {
                    self.emit_op(Opcode::Pop);
                }
            }

            NodeKind::Seq { first, second } => {
                self.gen_node(first, 0)?;
                self.gen_node(second, retval)?;
            }
            NodeKind::MultiRet(exps) => {
                debug_assert!(retval > 0);
                maxretvalsupplied = 0;
                for &exp in &exps {
                    self.gen_node(exp, 1)?;
                    maxretvalsupplied += 1;
                }
            }

            NodeKind::And { left, right } => {
                self.gen_node(left, 1)?;
                self.emit_op(if retval > 0 {
                    Opcode::JumpFailR
                } else {
                    Opcode::JumpFail
                });
                self.emit(0);
                let mark = self.mark();
                self.gen_node(right, retval)?;
                self.patch_to_here(mark);
            }
            NodeKind::Or { left, right } => {
                self.gen_node(left, 1)?;
                self.emit_op(if retval > 0 {
                    Opcode::JumpNoFailR
                } else {
                    Opcode::JumpNoFail
                });
                self.emit(0);
                let mark = self.mark();
                self.gen_node(right, retval)?;
                self.patch_to_here(mark);
            }

            NodeKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.gen_node(cond, 1)?;
                let has_else = else_branch.is_some();
                self.emit_op(if !has_else && retval > 0 {
                    Opcode::JumpFailR
                } else {
                    Opcode::JumpFail
                });
                self.emit(0);
                let over_then = self.mark();
                self.gen_inline_scope(then_branch, retval, 0)?;
                match else_branch {
                    Some(els) => {
                        self.emit_op(Opcode::Jump);
                        self.emit(0);
                        let over_else = self.mark();
                        self.patch_to_here(over_then);
                        self.gen_inline_scope(els, retval, 0)?;
                        self.patch_to_here(over_else);
                    }
                    None => self.patch_to_here(over_then),
                }
            }
            NodeKind::While { cond, body } => {
                let loopback = self.mark();
                self.gen_inline_scope(cond, 1, 0)?;
                self.emit_op(Opcode::JumpFail);
                self.emit(0);
                let jumpout = self.mark();
                self.gen_inline_scope(body, 0, 0)?;
                self.emit_op(Opcode::Jump);
                self.emit(loopback as i32);
                self.patch_to_here(jumpout);
                self.dummy(retval);
            }
            NodeKind::For { iter, body } => {
                self.emit_op(Opcode::PushInt);
                self.emit(-1); // initial index
                self.gen_node(iter, 1)?;
                self.gen_node(body, 1)?;
                self.emit_op(Opcode::PushUndef); // body retval slot
                self.emit_op(Opcode::For);
                self.dummy(retval);
            }

            NodeKind::Constructor { args, .. } => {
                let exptype = self.arena[n].exptype.clone();
                let struc = match &exptype {
                    Type::Struct(sid) => {
                        let nfields = self.syms.struct_def(*sid).fields.len();
                        self.emit_op(Opcode::NewVec);
                        self.emit(sid.0 as i32);
                        self.emit(nfields as i32);
                        Some(*sid)
                    }
                    _ => {
                        self.emit_op(Opcode::NewVec);
                        self.emit(TypeTag::Vector as i32);
                        self.emit(args.len() as i32);
                        None
                    }
                };

                let mut superclass = struc.and_then(|s| self.syms.struct_def(s).superclass);
                let mut i = 0usize;
                for &cn in &args {
                    if let NodeKind::Super(child) = self.arena[cn].kind {
                        let Some(sc) = superclass else {
                            return Err(self.err(
                                cn,
                                "super used in object without superclass",
                                codes::UNKNOWN_SUPER_FIELD,
                            ));
                        };
                        self.gen_node(child, 1)?;
                        self.emit_op(Opcode::PushParent);
                        self.emit(sc.0 as i32);
                        i += self.syms.struct_def(sc).fields.len();
                    } else {
                        self.gen_node(cn, 1)?;
                        let given = self.arena[cn].exptype.clone();
                        let wanted = match (&exptype, struc) {
                            (_, Some(s)) => self.syms.struct_def(s).fields[i].ty.clone(),
                            (Type::Vector(elem), None) => (**elem).clone(),
                            _ => Type::Any,
                        };
                        self.gen_type_check(&given, &wanted);
                        self.emit_op(Opcode::PushOnce);
                        i += 1;
                    }
                    superclass = None;
                }
                if retval == 0 {
                    self.emit_op(Opcode::Pop);
                }
            }

            NodeKind::Is { value, ty } => {
                self.gen_node(value, retval)?;
                if retval > 0 {
                    self.emit_op(Opcode::IsType);
                    self.emit(ty.dispatch_tag());
                    self.emit(ty.type_idx());
                }
            }

            NodeKind::Return { value, target } => {
                let (fid, want) = match target {
                    Some(f) => (f.0 as i32, self.syms.function(f).retvals),
                    None => (-1, 1),
                };
                match value {
                    Some(v) => self.gen_node(v, want)?,
                    None => self.emit_op(Opcode::PushUndef),
                }
                self.emit_op(Opcode::Return);
                self.emit(fid);
            }

            NodeKind::CoClosure => {
                if retval > 0 {
                    self.emit_op(Opcode::CoCl);
                }
            }
            NodeKind::Coroutine(child) => {
                if retval > 0 {
                    self.emit_op(Opcode::Coro);
                    self.emit(0);
                    let skip = self.mark();
                    self.emit(0); // live-variable count, patched below

                    let mut visited = FxHashSet::default();
                    let mut seen = FxHashSet::default();
                    let mut live = Vec::new();
                    let found =
                        self.find_idents_to_yield(child, &mut visited, &mut seen, &mut live);
                    if !found {
                        return Err(self.err(
                            child,
                            "coroutine construction error: cannot find yield call",
                            codes::COROUTINE_CONSTRUCTION,
                        ));
                    }
                    for id in live {
                        self.emit(id.0 as i32);
                    }
                    self.code[skip] = (self.code.len() - skip - 1) as i32;

                    self.gen_node(child, retval)?;
                    self.emit_op(Opcode::CoEnd);
                    self.patch_to_here(skip);
                } else {
                    self.gen_node(child, retval)?;
                }
            }

            NodeKind::Super(_) => {
                return Err(self.err(n, "super used outside a constructor", codes::INTERNAL));
            }
            NodeKind::ForLoopVar => {
                return Err(self.err(n, "loop variable outside a loop body", codes::INTERNAL));
            }
        }

        // Arity reconciliation: a single value can be copied into
        // several requested slots; surplus values are popped.
        if maxretvalsupplied == 1 {
            let mut want = retval;
            while want > 1 {
                self.emit_op(Opcode::Dup);
                self.emit(0);
                want -= 1;
            }
        } else if retval < maxretvalsupplied {
            let mut have = maxretvalsupplied;
            while have > retval && retval > 0 {
                self.emit_op(Opcode::Pop);
                have -= 1;
            }
        } else if retval > maxretvalsupplied {
            return Err(self.err(
                n,
                "expression does not supply that many return values",
                codes::ARITY_MISMATCH,
            ));
        }

        self.loc_stack.pop();
        Ok(())
    }

    /// Write (or read-modify-write) through an lvalue shape.
    fn gen_assign(
        &mut self,
        lval: NodeId,
        op: LvalOp,
        retval: usize,
        rhs: Option<NodeId>,
    ) -> CompileResult<()> {
        let op = if retval > 0 { op.with_result() } else { op };
        if let Some(rhs) = rhs {
            self.gen_node(rhs, 1)?;
        }
        match self.arena[lval].kind.clone() {
            NodeKind::Ident(id) => {
                self.emit_op(Opcode::LvalVar);
                self.emit(op.word());
                self.emit(id.0 as i32);
            }
            NodeKind::Dot { obj, field, .. } => {
                self.gen_node(obj, 1)?;
                self.gen_field_access(field, Some(op), false);
            }
            NodeKind::CoAt { coro, var } => {
                self.gen_node(coro, 1)?;
                if let Some(id) = self.arena[var].kind.ident() {
                    self.emit_op(Opcode::LvalLoc);
                    self.emit(op.word());
                    self.emit(id.0 as i32);
                }
            }
            NodeKind::Index { obj, index } => {
                self.gen_node(obj, 1)?;
                self.gen_node(index, 1)?;
                self.emit_op(Opcode::LvalIdx);
                self.emit(op.word());
            }
            _ => return Err(self.err(lval, "lvalue required", codes::LVALUE_REQUIRED)),
        }
        Ok(())
    }

    /// Conservative walk from a coroutine body to its yield call,
    /// collecting every identifier that may be live across a resume.
    fn find_idents_to_yield(
        &self,
        n: NodeId,
        visited: &mut FxHashSet<SubFuncId>,
        seen: &mut FxHashSet<IdentId>,
        live: &mut Vec<IdentId>,
    ) -> bool {
        let mut collect = |id: IdentId, live: &mut Vec<IdentId>, seen: &mut FxHashSet<IdentId>| {
            if seen.insert(id) {
                live.push(id);
            }
        };
        let mut found = false;
        match &self.arena[n].kind {
            NodeKind::Ident(id) => collect(*id, live, seen),
            NodeKind::NatCall { nf, args } => {
                if self.syms.native(*nf).is_yield {
                    found = true;
                }
                for &a in args {
                    found |= self.find_idents_to_yield(a, visited, seen, live);
                }
            }
            NodeKind::Call { args, resolved, .. }
            | NodeKind::DynCall { args, resolved, .. } => {
                for &a in args {
                    found |= self.find_idents_to_yield(a, visited, seen, live);
                }
                if let NodeKind::DynCall { fval, .. } = &self.arena[n].kind {
                    found |= self.find_idents_to_yield(*fval, visited, seen, live);
                }
                if let Some(sf) = resolved {
                    found |= self.walk_subfunction(*sf, visited, seen, live);
                }
            }
            NodeKind::FunVal { sf: Some(sf) } => {
                found |= self.walk_subfunction(*sf, visited, seen, live);
            }
            kind => {
                for child in kind.children() {
                    found |= self.find_idents_to_yield(child, visited, seen, live);
                }
            }
        }
        found
    }

    fn walk_subfunction(
        &self,
        sf: SubFuncId,
        visited: &mut FxHashSet<SubFuncId>,
        seen: &mut FxHashSet<IdentId>,
        live: &mut Vec<IdentId>,
    ) -> bool {
        if !visited.insert(sf) {
            return false;
        }
        let sub = self.syms.subfunction(sf);
        for arg in sub.args.iter().chain(&sub.locals).chain(&sub.freevars) {
            if seen.insert(arg.ident) {
                live.push(arg.ident);
            }
        }
        let mut found = false;
        for &stmt in &self.syms.subfunction(sf).body {
            found |= self.find_idents_to_yield(stmt, visited, seen, live);
        }
        if found {
            trace!(sf = sf.0, "coroutine yield reachable through callee");
        }
        found
    }
}

#[cfg(test)]
#[path = "tests/emit_tests.rs"]
mod emit_tests;

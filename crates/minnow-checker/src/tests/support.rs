//! Hand-built programs standing in for parser output.

use minnow_ast::{ArithOp, NodeArena, NodeId, NodeKind};
use minnow_binder::{Arg, Function, StructField, SubFunction, Symbols};
use minnow_common::{CompileResult, SrcLoc};
use minnow_solver::{FieldId, FuncId, IdentId, StructId, SubFuncId, Type, TypeVars};

pub(crate) struct Fix {
    pub arena: NodeArena,
    pub syms: Symbols,
    line: u32,
}

impl Fix {
    pub fn new() -> Self {
        Fix {
            arena: NodeArena::new(),
            syms: Symbols::new(),
            line: 1,
        }
    }

    pub fn loc(&mut self) -> SrcLoc {
        let line = self.line;
        self.line += 1;
        SrcLoc::new(0, line)
    }

    pub fn node(&mut self, kind: NodeKind) -> NodeId {
        let loc = self.loc();
        self.arena.add(kind, loc)
    }

    pub fn int(&mut self, v: i32) -> NodeId {
        self.node(NodeKind::Int(v))
    }

    pub fn flt(&mut self, v: f64) -> NodeId {
        self.node(NodeKind::Float(v))
    }

    pub fn str_(&mut self, s: &str) -> NodeId {
        self.node(NodeKind::Str(s.to_string()))
    }

    pub fn ident(&mut self, name: &str) -> IdentId {
        self.syms.new_ident(name)
    }

    pub fn use_(&mut self, id: IdentId) -> NodeId {
        self.node(NodeKind::Ident(id))
    }

    pub fn bin(&mut self, op: ArithOp, left: NodeId, right: NodeId) -> NodeId {
        self.node(NodeKind::BinOp { op, left, right })
    }

    pub fn def1(&mut self, id: IdentId, init: NodeId) -> NodeId {
        let idn = self.use_(id);
        self.node(NodeKind::Def {
            ids: vec![idn],
            init,
        })
    }

    pub fn call(&mut self, fid: FuncId, args: Vec<NodeId>) -> NodeId {
        self.node(NodeKind::Call {
            fun: fid,
            args,
            resolved: None,
        })
    }

    pub fn funval(&mut self, sf: SubFuncId) -> NodeId {
        self.node(NodeKind::FunVal { sf: Some(sf) })
    }

    /// Register a function with one template SubFunction.
    pub fn function_with(
        &mut self,
        name: &str,
        params: Vec<Arg>,
        body: Vec<NodeId>,
        anonymous: bool,
        multimethod: bool,
    ) -> (FuncId, SubFuncId) {
        let fid = FuncId::from_index(self.syms.functions.len());
        let nargs = params.len();
        let body_loc = SrcLoc::new(0, self.line);
        let sf = self.syms.add_subfunction(SubFunction {
            parent: fid,
            args: params,
            locals: Vec::new(),
            freevars: Vec::new(),
            body,
            body_loc,
            returntypes: Vec::new(),
            typechecked: false,
            subbytecodestart: 0,
        });
        self.syms.add_function(Function {
            name: name.to_string(),
            idx: fid,
            subf: vec![sf],
            nargs,
            retvals: 1,
            multimethod,
            anonymous,
            istype: false,
            bytecodestart: 0,
            ncalls: 0,
        });
        (fid, sf)
    }

    /// Another overload of a multimethod.
    pub fn add_overload(&mut self, fid: FuncId, params: Vec<Arg>, body: Vec<NodeId>) -> SubFuncId {
        let body_loc = SrcLoc::new(0, self.line);
        let sf = self.syms.add_subfunction(SubFunction {
            parent: fid,
            args: params,
            locals: Vec::new(),
            freevars: Vec::new(),
            body,
            body_loc,
            returntypes: Vec::new(),
            typechecked: false,
            subbytecodestart: 0,
        });
        self.syms.function_mut(fid).subf.push(sf);
        sf
    }

    /// An anonymous zero-argument closure, as branch bodies are parsed.
    pub fn block(&mut self, body: Vec<NodeId>) -> NodeId {
        let (_, sf) = self.function_with("<anon>", Vec::new(), body, true, false);
        self.funval(sf)
    }

    /// Register a record; field names are shared across records.
    pub fn struct_with_fields(
        &mut self,
        name: &str,
        fields: &[(&str, Type, bool)],
        superclass: Option<StructId>,
    ) -> (StructId, Vec<FieldId>) {
        let mut defs = Vec::new();
        let mut fids = Vec::new();
        for (fname, ty, generic) in fields {
            let fid = match self.syms.fields.iter().position(|f| f.name == *fname) {
                Some(i) => FieldId::from_index(i),
                None => self.syms.declare_field(*fname),
            };
            fids.push(fid);
            defs.push(StructField {
                field: fid,
                ty: ty.clone(),
                generic: *generic,
            });
        }
        (self.syms.add_struct(name, defs, superclass), fids)
    }

    pub fn check(&mut self, root: &[NodeId]) -> CompileResult<TypeVars> {
        crate::check_program(&mut self.arena, &mut self.syms, root)
    }
}

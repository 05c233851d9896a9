//! Symbol table data model.

use bitflags::bitflags;
use minnow_ast::NodeId;
use minnow_common::SrcLoc;
use minnow_solver::{FieldId, FuncId, IdentId, NativeId, StructId, SubFuncId, Type};

use crate::natives::NativeFun;

bitflags! {
    /// Flags on a function argument or local slot.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ArgFlags: u32 {
        /// The slot's type is specialized per call site.
        const ANY_TYPE = 1 << 0;
    }
}

/// A typed argument, local, or captured free variable of a SubFunction.
#[derive(Clone, Debug)]
pub struct Arg {
    pub ident: IdentId,
    pub ty: Type,
    pub flags: ArgFlags,
}

impl Arg {
    pub fn new(ident: IdentId, ty: Type, flags: ArgFlags) -> Self {
        Arg { ident, ty, flags }
    }
}

/// An identifier. Its `IdentId` doubles as the runtime variable slot.
#[derive(Clone, Debug)]
pub struct Ident {
    pub name: String,
    /// Current declared type; rebound as definitions and specializations
    /// are checked.
    pub ty: Type,
    /// Marked for transactional re-initialization on re-entry.
    pub is_logvar: bool,
    /// Slot in the enclosing scope's logvar list, assigned during
    /// function layout. Only meaningful when `is_logvar`.
    pub logvar_slot: u32,
}

/// One field of a record.
#[derive(Clone, Debug)]
pub struct StructField {
    pub field: FieldId,
    pub ty: Type,
    /// Placeholder awaiting specialization.
    pub generic: bool,
}

/// A record. Specializations of one source declaration share a head and
/// are linked through `next`.
#[derive(Clone, Debug)]
pub struct StructDef {
    pub name: String,
    pub idx: StructId,
    /// A subclass's field list starts with its superclass's fields.
    pub fields: Vec<StructField>,
    pub superclass: Option<StructId>,
    /// Common type of all fields, `Undefined` when non-uniform.
    /// Stored wrapped, i.e. `Vector(common)`.
    pub vectortype: Type,
    /// Once set, the record's types are frozen.
    pub typechecked: bool,
    pub next: Option<StructId>,
}

impl StructDef {
    /// Look up a shared field in this record's own field list (which by
    /// the prefix invariant includes every superclass field).
    pub fn field(&self, f: FieldId) -> Option<&StructField> {
        self.fields.iter().find(|sf| sf.field == f)
    }
}

/// A named function: an overload/specialization chain plus call-site
/// bookkeeping for code generation.
#[derive(Clone, Debug)]
pub struct Function {
    pub name: String,
    pub idx: FuncId,
    /// `subf[0]` is the unspecialized template.
    pub subf: Vec<SubFuncId>,
    pub nargs: usize,
    /// Declared number of return values.
    pub retvals: usize,
    pub multimethod: bool,
    pub anonymous: bool,
    /// A type-only declaration; has no body to generate.
    pub istype: bool,
    /// Code offset of the emitted function, 0 until emitted.
    pub bytecodestart: usize,
    /// Call sites observed during code generation.
    pub ncalls: u32,
}

/// One typed instantiation of a function.
#[derive(Clone, Debug)]
pub struct SubFunction {
    pub parent: FuncId,
    pub args: Vec<Arg>,
    pub locals: Vec<Arg>,
    /// Captured identifiers with the types they were specialized against.
    pub freevars: Vec<Arg>,
    pub body: Vec<NodeId>,
    pub body_loc: SrcLoc,
    /// Index 0 is always present once the body has been checked.
    pub returntypes: Vec<Type>,
    pub typechecked: bool,
    pub subbytecodestart: usize,
}

/// A field name shared across records, with the slot offset it has in
/// each record that declares it.
#[derive(Clone, Debug, Default)]
pub struct SharedField {
    pub name: String,
    pub offsets: Vec<(StructId, u32)>,
}

impl SharedField {
    /// Number of distinct offsets across records.
    pub fn num_unique(&self) -> usize {
        let mut seen: Vec<u32> = Vec::new();
        for &(_, off) in &self.offsets {
            if !seen.contains(&off) {
                seen.push(off);
            }
        }
        seen.len()
    }
}

/// The symbol table. Shared by the type checker (which mutates it while
/// specializing) and the code generator (which adds layout info).
#[derive(Debug, Default)]
pub struct Symbols {
    pub idents: Vec<Ident>,
    pub structs: Vec<StructDef>,
    pub functions: Vec<Function>,
    pub subfunctions: Vec<SubFunction>,
    pub fields: Vec<SharedField>,
    pub natives: Vec<NativeFun>,
}

impl Symbols {
    pub fn new() -> Self {
        Symbols::default()
    }

    // Accessors; indices come from the parser and are trusted.

    #[inline]
    pub fn ident(&self, id: IdentId) -> &Ident {
        &self.idents[id.index()]
    }

    #[inline]
    pub fn ident_mut(&mut self, id: IdentId) -> &mut Ident {
        &mut self.idents[id.index()]
    }

    #[inline]
    pub fn struct_def(&self, id: StructId) -> &StructDef {
        &self.structs[id.index()]
    }

    #[inline]
    pub fn struct_mut(&mut self, id: StructId) -> &mut StructDef {
        &mut self.structs[id.index()]
    }

    #[inline]
    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id.index()]
    }

    #[inline]
    pub fn function_mut(&mut self, id: FuncId) -> &mut Function {
        &mut self.functions[id.index()]
    }

    #[inline]
    pub fn subfunction(&self, id: SubFuncId) -> &SubFunction {
        &self.subfunctions[id.index()]
    }

    #[inline]
    pub fn subfunction_mut(&mut self, id: SubFuncId) -> &mut SubFunction {
        &mut self.subfunctions[id.index()]
    }

    #[inline]
    pub fn field(&self, id: FieldId) -> &SharedField {
        &self.fields[id.index()]
    }

    #[inline]
    pub fn native(&self, id: NativeId) -> &NativeFun {
        &self.natives[id.index()]
    }

    // Construction; used by the parser and by test fixtures.

    pub fn new_ident(&mut self, name: impl Into<String>) -> IdentId {
        self.idents.push(Ident {
            name: name.into(),
            ty: Type::Any,
            is_logvar: false,
            logvar_slot: 0,
        });
        IdentId::from_index(self.idents.len() - 1)
    }

    pub fn declare_field(&mut self, name: impl Into<String>) -> FieldId {
        self.fields.push(SharedField {
            name: name.into(),
            offsets: Vec::new(),
        });
        FieldId::from_index(self.fields.len() - 1)
    }

    /// Register a record and record each field's slot offset on its
    /// shared field.
    pub fn add_struct(
        &mut self,
        name: impl Into<String>,
        fields: Vec<StructField>,
        superclass: Option<StructId>,
    ) -> StructId {
        let idx = StructId::from_index(self.structs.len());
        for (offset, sf) in fields.iter().enumerate() {
            self.fields[sf.field.index()]
                .offsets
                .push((idx, offset as u32));
        }
        self.structs.push(StructDef {
            name: name.into(),
            idx,
            fields,
            superclass,
            vectortype: Type::Undefined,
            typechecked: false,
            next: None,
        });
        idx
    }

    pub fn add_function(&mut self, f: Function) -> FuncId {
        debug_assert_eq!(f.idx.index(), self.functions.len());
        let idx = f.idx;
        self.functions.push(f);
        idx
    }

    pub fn add_subfunction(&mut self, sf: SubFunction) -> SubFuncId {
        self.subfunctions.push(sf);
        SubFuncId::from_index(self.subfunctions.len() - 1)
    }

    pub fn add_native(&mut self, nf: NativeFun) -> NativeId {
        debug_assert_eq!(nf.idx.index(), self.natives.len());
        let idx = nf.idx;
        self.natives.push(nf);
        idx
    }

    // Queries used by the semantic passes.

    /// Is `sup` the same record as `sub`, or a transitive superclass of it?
    pub fn is_super_type_or_same(&self, sup: StructId, sub: StructId) -> bool {
        let mut cur = Some(sub);
        while let Some(s) = cur {
            if s == sup {
                return true;
            }
            cur = self.struct_def(s).superclass;
        }
        false
    }

    /// Clone a record for specialization: same name, fields and
    /// inheritance link, fresh index, offsets registered for the clone.
    /// The caller links the clone into the head's `next` chain.
    pub fn clone_struct(&mut self, id: StructId) -> StructId {
        let src = self.struct_def(id).clone();
        let idx = StructId::from_index(self.structs.len());
        for (offset, sf) in src.fields.iter().enumerate() {
            self.fields[sf.field.index()]
                .offsets
                .push((idx, offset as u32));
        }
        self.structs.push(StructDef {
            name: src.name,
            idx,
            fields: src.fields,
            superclass: src.superclass,
            vectortype: src.vectortype,
            typechecked: false,
            next: None,
        });
        idx
    }
}

#[cfg(test)]
#[path = "tests/symbols.rs"]
mod tests;

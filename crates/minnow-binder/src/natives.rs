//! Native-function catalog.
//!
//! The catalog itself is external input; this is its data model and the
//! per-builtin signature metadata the checker and code generator consume.

use minnow_solver::{NativeId, Type};

/// How a native argument or return slot derives its type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NativeFlag {
    None,
    /// Specialize from argument 0's type: taken whole if this slot's
    /// declared type is a vector, element-wise otherwise.
    SubArg1,
    /// Introduce a fresh type variable (vector-wrapped when the declared
    /// type is a vector).
    AnyVar,
}

#[derive(Clone, Debug)]
pub struct NativeArg {
    pub ty: Type,
    pub flag: NativeFlag,
}

impl NativeArg {
    pub fn plain(ty: Type) -> Self {
        NativeArg {
            ty,
            flag: NativeFlag::None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NativeFun {
    pub name: String,
    pub idx: NativeId,
    pub args: Vec<NativeArg>,
    pub retvals: Vec<NativeArg>,
    /// Head of this builtin's overload chain.
    pub first: NativeId,
    /// Next overload, if any.
    pub overload: Option<NativeId>,
    /// Takes a closure argument and re-enters it after the builtin
    /// returns (continuation-exit calling convention).
    pub cont_exit: bool,
    /// This builtin is the coroutine yield primitive.
    pub is_yield: bool,
}

impl NativeFun {
    pub fn new(idx: NativeId, name: impl Into<String>) -> Self {
        NativeFun {
            name: name.into(),
            idx,
            args: Vec::new(),
            retvals: Vec::new(),
            first: idx,
            overload: None,
            cont_exit: false,
            is_yield: false,
        }
    }

    pub fn with_args(mut self, args: Vec<NativeArg>) -> Self {
        self.args = args;
        self
    }

    pub fn with_retvals(mut self, retvals: Vec<NativeArg>) -> Self {
        self.retvals = retvals;
        self
    }
}

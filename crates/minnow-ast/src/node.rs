//! AST node kinds.
//!
//! Children are held inline in the kind; list-shaped children are plain
//! vectors. Multi-definitions and multi-assignments are flattened into a
//! target list plus one right-hand side. Statement lists are owned by the
//! enclosing `SubFunction` (or the program root), not by a node.

use minnow_common::SrcLoc;
use minnow_solver::{FieldId, FuncId, IdentId, NativeId, StructId, SubFuncId, Type};

/// Index of a node in its [`crate::arena::NodeArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn from_index(i: usize) -> Self {
        NodeId(i as u32)
    }
}

/// Arithmetic and comparison operators.
///
/// The discriminant order matches the per-kind instruction group layout
/// (`IADD..INE` and friends), so code generation can add the operator
/// offset to a group base opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

impl ArithOp {
    #[inline]
    pub fn is_compare(self) -> bool {
        matches!(
            self,
            ArithOp::Lt | ArithOp::Gt | ArithOp::Le | ArithOp::Ge | ArithOp::Eq | ArithOp::Ne
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Mod => "%",
            ArithOp::Lt => "<",
            ArithOp::Gt => ">",
            ArithOp::Le => "<=",
            ArithOp::Ge => ">=",
            ArithOp::Eq => "==",
            ArithOp::Ne => "!=",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IncDecOp {
    PreIncr,
    PreDecr,
    PostIncr,
    PostDecr,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Int(i32),
    Float(f64),
    Str(String),
    Nil,
    Ident(IdentId),

    BinOp {
        op: ArithOp,
        left: NodeId,
        right: NodeId,
    },
    CompoundAssign {
        op: ArithOp,
        target: NodeId,
        value: NodeId,
    },
    And {
        left: NodeId,
        right: NodeId,
    },
    Or {
        left: NodeId,
        right: NodeId,
    },
    Not(NodeId),
    Neg(NodeId),
    IncDec {
        op: IncDecOp,
        target: NodeId,
    },

    /// `a, b := rhs` - introduces the target identifiers.
    Def {
        ids: Vec<NodeId>,
        init: NodeId,
    },
    /// `a, b = rhs` - assigns existing identifiers.
    AssignList {
        targets: Vec<NodeId>,
        rhs: NodeId,
    },
    Assign {
        target: NodeId,
        value: NodeId,
    },

    Dot {
        obj: NodeId,
        field: FieldId,
        maybe: bool,
    },
    Index {
        obj: NodeId,
        index: NodeId,
    },
    /// `var @ coro` - reads a variable out of a coroutine's saved stack.
    CoAt {
        coro: NodeId,
        var: NodeId,
    },

    Call {
        fun: FuncId,
        args: Vec<NodeId>,
        /// Specialization resolved by the type checker.
        resolved: Option<SubFuncId>,
    },
    DynCall {
        fval: NodeId,
        args: Vec<NodeId>,
        /// Filled in when the callee is statically known.
        resolved: Option<SubFuncId>,
    },
    NatCall {
        nf: NativeId,
        args: Vec<NodeId>,
    },
    /// A function used as a value; the body lives in the SubFunction.
    FunVal {
        sf: Option<SubFuncId>,
    },
    Return {
        value: Option<NodeId>,
        /// `None` returns from the program.
        target: Option<FuncId>,
    },

    If {
        cond: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    },
    While {
        cond: NodeId,
        body: NodeId,
    },
    For {
        iter: NodeId,
        body: NodeId,
    },
    /// Synthetic argument node used to type a `for` body closure.
    ForLoopVar,

    /// `[..]` / `Name { .. }`; `ty` is `None` for an untyped vector literal.
    Constructor {
        ty: Option<Type>,
        args: Vec<NodeId>,
    },
    /// `super expr` inside a constructor: contributes the superclass's
    /// field prefix.
    Super(NodeId),
    Is {
        value: NodeId,
        ty: Type,
    },

    Seq {
        first: NodeId,
        second: NodeId,
    },
    MultiRet(Vec<NodeId>),

    /// Integer-to-float coercion inserted by the type checker.
    IntToFloat(NodeId),
    /// To-string coercion inserted by the type checker.
    ToString(NodeId),

    CoClosure,
    Coroutine(NodeId),
    StructDef(StructId),
}

impl NodeKind {
    /// The identifier behind an `Ident` node, if this is one.
    #[inline]
    pub fn ident(&self) -> Option<IdentId> {
        match self {
            NodeKind::Ident(id) => Some(*id),
            _ => None,
        }
    }

    /// Generic child enumeration, used by conservative whole-tree
    /// analyses. Structured passes match on the kind instead.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            NodeKind::BinOp { left, right, .. }
            | NodeKind::CompoundAssign {
                target: left,
                value: right,
                ..
            }
            | NodeKind::And { left, right }
            | NodeKind::Or { left, right }
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
            } => vec![*left, *right],
            NodeKind::Not(c)
            | NodeKind::Neg(c)
            | NodeKind::Super(c)
            | NodeKind::IntToFloat(c)
            | NodeKind::ToString(c)
            | NodeKind::Coroutine(c) => vec![*c],
            NodeKind::IncDec { target, .. } => vec![*target],
            NodeKind::Is { value, .. } => vec![*value],
            NodeKind::Dot { obj, .. } => vec![*obj],
            NodeKind::Def { ids, init } => {
                let mut v = ids.clone();
                v.push(*init);
                v
            }
            NodeKind::AssignList { targets, rhs } => {
                let mut v = targets.clone();
                v.push(*rhs);
                v
            }
            NodeKind::Call { args, .. } | NodeKind::NatCall { args, .. } => args.clone(),
            NodeKind::DynCall { fval, args, .. } => {
                let mut v = vec![*fval];
                v.extend_from_slice(args);
                v
            }
            NodeKind::Return { value, .. } => value.iter().copied().collect(),
            NodeKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let mut v = vec![*cond, *then_branch];
                v.extend(else_branch.iter().copied());
                v
            }
            NodeKind::While { cond, body } => vec![*cond, *body],
            NodeKind::For { iter, body } => vec![*iter, *body],
            NodeKind::Constructor { args, .. } => args.clone(),
            NodeKind::MultiRet(exps) => exps.clone(),
            _ => Vec::new(),
        }
    }

    /// Display name used in diagnostics ("context" of a type error).
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Int(_) => "int literal",
            NodeKind::Float(_) => "float literal",
            NodeKind::Str(_) => "string literal",
            NodeKind::Nil => "nil",
            NodeKind::Ident(_) => "identifier",
            NodeKind::BinOp { op, .. } => op.name(),
            NodeKind::CompoundAssign { op, .. } => match op {
                ArithOp::Add => "+=",
                ArithOp::Sub => "-=",
                ArithOp::Mul => "*=",
                ArithOp::Div => "/=",
                ArithOp::Mod => "%=",
                _ => "compound assignment",
            },
            NodeKind::And { .. } => "and",
            NodeKind::Or { .. } => "or",
            NodeKind::Not(_) => "not",
            NodeKind::Neg(_) => "unary minus",
            NodeKind::IncDec { op, .. } => match op {
                IncDecOp::PreIncr => "++",
                IncDecOp::PreDecr => "--",
                IncDecOp::PostIncr => "++ (post)",
                IncDecOp::PostDecr => "-- (post)",
            },
            NodeKind::Def { .. } => "definition",
            NodeKind::AssignList { .. } => "multi-assignment",
            NodeKind::Assign { .. } => "assignment",
            NodeKind::Dot { maybe: false, .. } => ".",
            NodeKind::Dot { maybe: true, .. } => ".?",
            NodeKind::Index { .. } => "indexing",
            NodeKind::CoAt { .. } => "coroutine variable",
            NodeKind::Call { .. } => "call",
            NodeKind::DynCall { .. } => "dynamic call",
            NodeKind::NatCall { .. } => "builtin call",
            NodeKind::FunVal { .. } => "function value",
            NodeKind::Return { .. } => "return",
            NodeKind::If { .. } => "if",
            NodeKind::While { .. } => "while",
            NodeKind::For { .. } => "for",
            NodeKind::ForLoopVar => "loop variable",
            NodeKind::Constructor { .. } => "constructor",
            NodeKind::Super(_) => "super",
            NodeKind::Is { .. } => "is",
            NodeKind::Seq { .. } => "expression sequence",
            NodeKind::MultiRet(_) => "multiple return values",
            NodeKind::IntToFloat(_) => "float conversion",
            NodeKind::ToString(_) => "string conversion",
            NodeKind::CoClosure => "coroutine closure",
            NodeKind::Coroutine(_) => "coroutine",
            NodeKind::StructDef(_) => "struct definition",
        }
    }
}

/// One AST node: kind plus source location, with the checker-filled type.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub loc: SrcLoc,
    /// Filled by the type checker; `Undefined` until then.
    pub exptype: Type,
}

impl Node {
    pub fn new(kind: NodeKind, loc: SrcLoc) -> Self {
        Node {
            kind,
            loc,
            exptype: Type::Undefined,
        }
    }
}

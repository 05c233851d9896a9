//! Instruction and lvalue sub-operation encodings.
//!
//! The code stream is a flat sequence of signed integers: opcodes with
//! their inline operands interleaved, no alignment or section structure.
//! Group layout is load-bearing in two places:
//!
//! - the arithmetic groups (`IAdd..INe`, `FAdd..FNe`, `AAdd..ANe`) are
//!   indexed by adding an [`minnow_ast::ArithOp`] offset to the group
//!   base;
//! - the field-access opcodes are indexed by adding the dispatch form
//!   (0 = uniform, 1 = conditional, 2 = table) to `PushFldO` /
//!   `PushFldMO` / `LvalFldO`.

use minnow_ast::{ArithOp, IncDecOp};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum Opcode {
    PushInt,
    PushFlt,
    PushStr,
    PushUndef,
    PushNil,
    PushFun,
    PushVar,
    LvalVar,
    PushIdx,
    LvalIdx,
    PushFldO,
    PushFldC,
    PushFldT,
    PushFldMO,
    PushFldMC,
    PushFldMT,
    LvalFldO,
    LvalFldC,
    LvalFldT,
    PushLoc,
    LvalLoc,
    BCall,
    Call,
    CallV,
    CallVCond,
    Dup,
    Cont1,
    FunStart,
    FunEnd,
    FunMulti,
    CallMulti,
    Jump,
    NewVec,
    Pop,
    Exit,
    IAdd,
    ISub,
    IMul,
    IDiv,
    IMod,
    ILt,
    IGt,
    ILe,
    IGe,
    IEq,
    INe,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FMod,
    FLt,
    FGt,
    FLe,
    FGe,
    FEq,
    FNe,
    AAdd,
    ASub,
    AMul,
    ADiv,
    AMod,
    ALt,
    AGt,
    ALe,
    AGe,
    AEq,
    ANe,
    UMinus,
    LogNot,
    I2F,
    A2S,
    JumpFail,
    JumpFailR,
    JumpNoFail,
    JumpNoFailR,
    Return,
    For,
    PushOnce,
    PushParent,
    TtStruct,
    Tt,
    TtFlt,
    TtStr,
    IsType,
    Coro,
    CoCl,
    CoEnd,
    FieldTables,
    LogRead,
}

impl Opcode {
    /// The code-stream word for this opcode.
    #[inline]
    pub const fn word(self) -> i32 {
        self as i32
    }
}

/// Lvalue sub-operations. Each write form has a "leave the result on the
/// stack" twin at the next discriminant; `WriteD` signals first
/// initialization and is never bumped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum LvalOp {
    Write,
    WriteR,
    WriteD,
    Plus,
    PlusR,
    Mul,
    MulR,
    Sub,
    SubR,
    Div,
    DivR,
    Mod,
    ModR,
    PP,
    PPR,
    MM,
    MMR,
    PPP,
    PPPR,
    MMP,
    MMPR,
}

impl LvalOp {
    /// The write-and-return twin of this operation.
    pub fn with_result(self) -> LvalOp {
        match self {
            LvalOp::Write => LvalOp::WriteR,
            LvalOp::Plus => LvalOp::PlusR,
            LvalOp::Mul => LvalOp::MulR,
            LvalOp::Sub => LvalOp::SubR,
            LvalOp::Div => LvalOp::DivR,
            LvalOp::Mod => LvalOp::ModR,
            LvalOp::PP => LvalOp::PPR,
            LvalOp::MM => LvalOp::MMR,
            LvalOp::PPP => LvalOp::PPPR,
            LvalOp::MMP => LvalOp::MMPR,
            other => other,
        }
    }

    /// The compound-assignment form of an arithmetic operator.
    pub fn for_arith(op: ArithOp) -> Option<LvalOp> {
        match op {
            ArithOp::Add => Some(LvalOp::Plus),
            ArithOp::Sub => Some(LvalOp::Sub),
            ArithOp::Mul => Some(LvalOp::Mul),
            ArithOp::Div => Some(LvalOp::Div),
            ArithOp::Mod => Some(LvalOp::Mod),
            _ => None,
        }
    }

    pub fn for_incdec(op: IncDecOp) -> LvalOp {
        match op {
            IncDecOp::PreIncr => LvalOp::PP,
            IncDecOp::PreDecr => LvalOp::MM,
            IncDecOp::PostIncr => LvalOp::PPP,
            IncDecOp::PostDecr => LvalOp::MMP,
        }
    }

    #[inline]
    pub const fn word(self) -> i32 {
        self as i32
    }
}

#[cfg(test)]
#[path = "tests/opcode_tests.rs"]
mod tests;

//! Bytecode generator for the minnow compiler.
//!
//! Lowers the type-annotated AST into a single linear instruction stream
//! for the stack VM, plus a parallel line-info table. Functions are laid
//! out breadth-first over the reachable call graph; forward call targets
//! are back-patched once every body has been emitted.

mod codegen;
mod field_dispatch;
pub mod opcodes;

pub use codegen::{CodeGen, LineInfo, Program, generate};
pub use opcodes::{LvalOp, Opcode};

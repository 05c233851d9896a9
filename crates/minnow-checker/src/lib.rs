//! Type checker for the minnow compiler.
//!
//! One traversal over the shared AST that infers and specializes function
//! and record types, resolves overloads, performs flow-sensitive
//! narrowing, inserts implicit coercions, and annotates every node with a
//! final type. Organized into:
//!
//! - `checker` - `TypeChecker` state and the per-node-kind rules
//! - `relations` - conversion, union, and subtype enforcement
//! - `specialize` - record and SubFunction specialization, call checking
//! - `flow` - the flow-narrowing stack
//! - `error_reporter` - diagnostics with the enclosing-scope backtrace

mod checker;
mod error_reporter;
mod flow;
mod relations;
mod specialize;

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

pub use checker::{TypeChecker, check_program};

//! The post-parse AST consumed by the type checker and code generator.
//!
//! Nodes live in a flat arena and reference each other by `NodeId`. The
//! checker mutates nodes in place: every node's `exptype` is filled in,
//! coercions are spliced into child slots, and call sites get their
//! resolved specialization recorded.

pub mod arena;
pub mod node;

pub use arena::NodeArena;
pub use node::{ArithOp, IncDecOp, Node, NodeId, NodeKind};

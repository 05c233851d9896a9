//! Type representation and unification for the minnow compiler.
//!
//! This crate is the leaf of the semantic pipeline:
//! - `ids` - index newtypes shared by the symbol table and the AST
//! - `types` - the `Type` tagged value and its wire-level `TypeTag` encoding
//! - `table` - the single-assignment unification table (`TypeVars`)
//!
//! Conversion and union rules live in `minnow-checker`; they need the
//! record table, which this crate deliberately knows nothing about.

pub mod ids;
pub mod table;
pub mod types;

pub use ids::{FieldId, FuncId, IdentId, NativeId, StructId, SubFuncId, VarId};
pub use table::TypeVars;
pub use types::{Type, TypeTag};

//! Symbol table for the minnow compiler.
//!
//! This crate owns the data model both passes query and specialize:
//! identifiers, records, functions and their SubFunction specializations,
//! shared fields with per-record offsets, and the native-function catalog.
//! Construction of the table is the parser's job; this crate provides the
//! model, the query contract, and the cloning support specialization
//! needs.

pub mod natives;
pub mod symbols;
mod type_name;

pub use natives::{NativeArg, NativeFlag, NativeFun};
pub use symbols::{Arg, ArgFlags, Function, Ident, SharedField, StructDef, StructField, SubFunction, Symbols};

//! Common types shared by every pass of the minnow compiler core.
//!
//! This crate holds the leaf types with no compiler logic of their own:
//! - `src_loc` - `(file, line)` coordinates carried by AST nodes
//! - `diagnostics` - the error value produced by both passes

pub mod diagnostics;
pub mod src_loc;

pub use diagnostics::{
    CompileResult, Diagnostic, DiagnosticCategory, DiagnosticRelatedInformation, codes,
};
pub use src_loc::SrcLoc;

//! Compile-time diagnostics.
//!
//! Both passes report through a single error value: the first `Diagnostic`
//! produced aborts the pass (errors are non-recoverable). Type errors carry
//! a backtrace of the enclosing function scopes as related information.

use crate::src_loc::SrcLoc;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DiagnosticCategory {
    Warning,
    Error,
    Message,
}

/// Error codes for the error kinds the core can produce.
pub mod codes {
    pub const TYPE_MISMATCH: u32 = 1001;
    pub const ARITY_MISMATCH: u32 = 1002;
    pub const OVERLOAD_RESOLUTION: u32 = 1003;
    pub const LVALUE_REQUIRED: u32 = 1004;
    pub const FIELD_ABSENT: u32 = 1005;
    pub const UNKNOWN_SUPER_FIELD: u32 = 1006;
    pub const ITERATION: u32 = 1007;
    pub const COROUTINE_CONSTRUCTION: u32 = 1008;
    pub const MULTI_DISPATCH_AMBIGUITY: u32 = 1009;
    pub const NONLOCAL_RETURN: u32 = 1010;
    pub const TOO_FEW_RETURN_VALUES: u32 = 1011;
    pub const INTERNAL: u32 = 1099;
}

/// Extra context attached to a diagnostic, e.g. one enclosing scope of the
/// type-error backtrace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRelatedInformation {
    pub category: DiagnosticCategory,
    pub loc: SrcLoc,
    pub message_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub category: DiagnosticCategory,
    pub code: u32,
    pub loc: SrcLoc,
    pub message_text: String,
    pub related_information: Vec<DiagnosticRelatedInformation>,
}

impl Diagnostic {
    pub fn error(loc: SrcLoc, message: impl Into<String>, code: u32) -> Self {
        Self {
            category: DiagnosticCategory::Error,
            code,
            loc,
            message_text: message.into(),
            related_information: Vec::new(),
        }
    }

    pub fn with_related(mut self, loc: SrcLoc, message: impl Into<String>) -> Self {
        self.related_information.push(DiagnosticRelatedInformation {
            category: DiagnosticCategory::Message,
            loc,
            message_text: message.into(),
        });
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.loc, self.message_text)?;
        for rel in &self.related_information {
            write!(f, "\n  {}", rel.message_text)?;
        }
        Ok(())
    }
}

/// Result alias used by both passes; the `Err` side aborts compilation.
pub type CompileResult<T> = Result<T, Diagnostic>;

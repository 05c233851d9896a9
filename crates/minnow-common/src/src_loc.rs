//! SrcLoc - Source coordinates for AST nodes and diagnostics
//!
//! A `SrcLoc` pairs a file index with a 1-based line number. It is used for:
//! - Tracking where an AST node came from
//! - Pointing diagnostics at source lines
//! - Driving line-info emission during code generation
//!
//! Locations are small (8 bytes) and cheap to copy.

use serde::{Deserialize, Serialize};

/// A source coordinate: file table index plus line number.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SrcLoc {
    /// Index into the driver's file table.
    pub file: u32,
    /// 1-based line number.
    pub line: u32,
}

impl SrcLoc {
    /// Create a new location from file index and line number.
    #[inline]
    pub const fn new(file: u32, line: u32) -> Self {
        SrcLoc { file, line }
    }

    /// Create a dummy/invalid location (used for synthetic nodes).
    #[inline]
    pub const fn dummy() -> Self {
        SrcLoc {
            file: u32::MAX,
            line: u32::MAX,
        }
    }

    /// Check if this is a dummy/invalid location.
    #[inline]
    pub const fn is_dummy(&self) -> bool {
        self.file == u32::MAX && self.line == u32::MAX
    }
}

impl std::fmt::Display for SrcLoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "file {}, line {}", self.file, self.line)
    }
}

#[cfg(test)]
#[path = "tests/src_loc.rs"]
mod tests;

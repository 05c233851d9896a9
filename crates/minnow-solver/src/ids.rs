//! Index newtypes for the compiler's side tables.
//!
//! Everything in the core cross-references by index, never by owning
//! pointer: records, functions and specializations live in the symbol
//! table, type variables in the unification table.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub u32);

        impl $name {
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            #[inline]
            pub const fn from_index(i: usize) -> Self {
                $name(i as u32)
            }
        }
    };
}

define_id!(
    /// A record (struct) in the symbol table's record table.
    StructId
);
define_id!(
    /// A function in the symbol table's function table.
    FuncId
);
define_id!(
    /// One typed specialization of a function.
    SubFuncId
);
define_id!(
    /// An identifier; its index doubles as the runtime variable slot.
    IdentId
);
define_id!(
    /// A field name shared across records.
    FieldId
);
define_id!(
    /// A native (builtin) function in the external catalog.
    NativeId
);
define_id!(
    /// A cell in the unification table.
    VarId
);

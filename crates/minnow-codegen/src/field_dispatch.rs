//! Per-access dispatch for fields shared across records.
//!
//! A field whose slot offset differs between records needs the VM to
//! pick the right offset at access time. Three encodings, cheapest
//! first:
//!
//! - uniform: one offset everywhere, emitted inline;
//! - conditional: two distinct offsets where one belongs to exactly one
//!   record, encoded as (distinguishing record, its offset, default);
//! - table: a per-record offset table embedded in the code stream,
//!   indexed by the value's runtime record index.
//!
//! The table block sits at the top of the program behind a
//! `FIELDTABLES` header whose operand lets the VM skip it at startup.

use minnow_solver::StructId;
use tracing::debug;

use crate::codegen::CodeGen;
use crate::opcodes::{LvalOp, Opcode};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FieldEncoding {
    Uniform(u32),
    Cond {
        struct_idx: StructId,
        one: u32,
        other: u32,
    },
    Table(usize),
}

impl CodeGen<'_> {
    /// Emit the offset tables for all fields needing the table form and
    /// pick an encoding for every shared field.
    pub(crate) fn gen_field_tables(&mut self) {
        self.emit_op(Opcode::FieldTables);
        self.emit(0);
        let mark = self.mark();

        let mut cond_fields = String::new();
        let mut table_fields = String::new();
        for idx in 0..self.syms.fields.len() {
            let field = &self.syms.fields[idx];
            let fid = minnow_solver::FieldId::from_index(idx);
            let offsets = field.offsets.clone();
            let unique = field.num_unique();
            if unique <= 1 {
                continue;
            }

            if unique == 2 {
                // If one of the two offsets belongs to exactly one
                // record, a compare beats a table lookup.
                let first = offsets[0].1;
                let firsts: Vec<&(StructId, u32)> =
                    offsets.iter().filter(|(_, o)| *o == first).collect();
                let others: Vec<&(StructId, u32)> =
                    offsets.iter().filter(|(_, o)| *o != first).collect();
                let picked = if firsts.len() == 1 {
                    Some((firsts[0], others[0].1))
                } else if others.len() == 1 {
                    Some((others[0], first))
                } else {
                    None
                };
                if let Some((&(sid, one), other)) = picked {
                    self.field_encodings.insert(
                        fid,
                        FieldEncoding::Cond {
                            struct_idx: sid,
                            one,
                            other,
                        },
                    );
                    cond_fields.push(' ');
                    cond_fields.push_str(&self.syms.field(fid).name);
                    continue;
                }
            }

            // A wider distribution gets a lookup table, indexed by the
            // runtime record index; records without this field stay 0.
            let table_at = self.code.len();
            for _ in 0..self.syms.structs.len() {
                self.emit(0);
            }
            for &(sid, off) in &offsets {
                self.code[table_at + sid.index()] = off as i32;
            }
            self.field_encodings.insert(fid, FieldEncoding::Table(table_at));
            table_fields.push(' ');
            table_fields.push_str(&self.syms.field(fid).name);
        }

        self.patch_to_here(mark);

        if !cond_fields.is_empty() {
            debug!("conditionals generated for fields:{cond_fields}");
        }
        if !table_fields.is_empty() {
            debug!(
                "table lookups generated for fields:{table_fields} (in {} types)",
                self.syms.structs.len()
            );
        }
    }

    /// Emit a field read or lvalue access in the field's chosen form.
    pub(crate) fn gen_field_access(
        &mut self,
        field: minnow_solver::FieldId,
        lvalop: Option<LvalOp>,
        maybe: bool,
    ) {
        let encoding = self.field_encodings.get(&field).copied().unwrap_or_else(|| {
            let off = self
                .syms
                .field(field)
                .offsets
                .first()
                .map(|&(_, o)| o)
                .unwrap_or(0);
            FieldEncoding::Uniform(off)
        });
        let form = match encoding {
            FieldEncoding::Uniform(_) => 0,
            FieldEncoding::Cond { .. } => 1,
            FieldEncoding::Table(_) => 2,
        };

        match lvalop {
            Some(op) => {
                self.emit(Opcode::LvalFldO.word() + form);
                self.emit(op.word());
            }
            None => {
                let base = if maybe {
                    Opcode::PushFldMO
                } else {
                    Opcode::PushFldO
                };
                self.emit(base.word() + form);
            }
        }

        match encoding {
            FieldEncoding::Uniform(off) => self.emit(off as i32),
            FieldEncoding::Cond {
                struct_idx,
                one,
                other,
            } => {
                self.emit(struct_idx.0 as i32);
                self.emit(one as i32);
                self.emit(other as i32);
            }
            FieldEncoding::Table(at) => self.emit(at as i32),
        }
    }
}

//! The unification table.
//!
//! A growing sequence of `Type` cells. A cell is either `Undefined` (free)
//! or bound to a concrete type. Bindings are monotone: once a cell is
//! non-`Undefined` it is never rewritten, so cycles cannot form and
//! promotion terminates.

use crate::ids::VarId;
use crate::types::Type;

#[derive(Debug, Default)]
pub struct TypeVars {
    cells: Vec<Type>,
}

impl TypeVars {
    pub fn new() -> Self {
        TypeVars { cells: Vec::new() }
    }

    /// Append a free cell and return a variable type referring to it.
    pub fn fresh(&mut self) -> Type {
        self.cells.push(Type::Undefined);
        Type::Var(VarId::from_index(self.cells.len() - 1))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn get(&self, v: VarId) -> &Type {
        &self.cells[v.index()]
    }

    /// Resolve a variable chain to its bound type and rebuild any wrapper
    /// around the resolved element. Never allocates new variables;
    /// idempotent.
    pub fn promote(&self, ty: &Type) -> Type {
        match ty {
            Type::Var(v) if *self.get(*v) != Type::Undefined => {
                let bound = self.get(*v).clone();
                self.promote(&bound)
            }
            Type::Vector(e) => self.promote(e).wrap_vector(),
            Type::Nilable(e) => self.promote(e).wrap_nilable(),
            _ => ty.clone(),
        }
    }

    /// Bind cell `var` to `promote(ty)` if it is still free and the
    /// promoted value is not `var` itself (no self-binding). Returns the
    /// cell's value after the attempt.
    pub fn unify(&mut self, ty: &Type, var: VarId) -> Type {
        if *self.get(var) == Type::Undefined {
            let pt = self.promote(ty);
            if pt != Type::Var(var) {
                self.cells[var.index()] = pt;
            }
        }
        self.get(var).clone()
    }
}

#[cfg(test)]
#[path = "tests/table.rs"]
mod tests;

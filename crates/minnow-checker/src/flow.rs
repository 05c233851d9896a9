//! The flow-narrowing stack.
//!
//! A cheap alternative to SSA: each in-branch refinement pushes an entry
//! `(item, old type, now type)` where `item` is an identifier access or a
//! dot access rooted at an identifier. Entries live strictly for the
//! branch being analyzed; `check_flow_changes` returns the stack height
//! to truncate back to.

use minnow_ast::{NodeId, NodeKind};
use minnow_solver::Type;

use crate::checker::TypeChecker;

#[derive(Clone, Debug)]
pub(crate) struct FlowItem {
    pub item: NodeId,
    pub old: Type,
    pub now: Type,
}

impl TypeChecker<'_> {
    /// Record a refinement for `n` if it has a narrowable shape.
    fn check_flow_id_or_dot(&mut self, n: NodeId, ty: Type) {
        let narrowable = match &self.arena[n].kind {
            NodeKind::Ident(_) => true,
            NodeKind::Dot { obj, .. } => self.arena[*obj].kind.ident().is_some(),
            _ => false,
        };
        if narrowable {
            let old = self.arena[n].exptype.clone();
            self.flowstack.push(FlowItem { item: n, old, now: ty });
        }
    }

    fn check_flow_changes_sub(&mut self, iftrue: bool, cond: NodeId) {
        let ty = self.vars.promote(&self.arena[cond].exptype);
        match self.arena[cond].kind.clone() {
            NodeKind::Is { value, ty: tested } => {
                if iftrue {
                    self.check_flow_id_or_dot(value, tested);
                }
            }
            NodeKind::Not(child) => self.check_flow_changes_sub(!iftrue, child),
            _ => {
                if iftrue {
                    if let Type::Nilable(elem) = ty {
                        self.check_flow_id_or_dot(cond, *elem);
                    }
                }
            }
        }
    }

    /// Push the refinements implied by `cond` holding (`iftrue`) or
    /// failing, returning the previous stack height.
    pub(crate) fn check_flow_changes(&mut self, iftrue: bool, cond: NodeId) -> usize {
        let start = self.flowstack.len();
        match self.arena[cond].kind.clone() {
            // `and` only narrows the true branch, `or` only the false one.
            NodeKind::And { left, right } => {
                if iftrue {
                    self.check_flow_changes_sub(iftrue, left);
                    self.check_flow_changes_sub(iftrue, right);
                }
            }
            NodeKind::Or { left, right } => {
                if !iftrue {
                    self.check_flow_changes_sub(iftrue, left);
                    self.check_flow_changes_sub(iftrue, right);
                }
            }
            _ => self.check_flow_changes_sub(iftrue, cond),
        }
        start
    }

    pub(crate) fn cleanup_flow(&mut self, start: usize) {
        self.flowstack.truncate(start);
    }

    /// An assignment to `left` invalidates matching refinements.
    pub(crate) fn assign_flow(&mut self, left: NodeId) {
        // Numeric types are never nilable, nor do they narrow.
        if self.arena[left].exptype.is_numeric() {
            return;
        }
        self.lookup_flow(left, true);
    }

    /// A read of `n` picks up the innermost matching refinement.
    pub(crate) fn use_flow(&mut self, n: NodeId) {
        if self.arena[n].exptype.is_numeric() {
            return;
        }
        self.lookup_flow(n, false);
    }

    fn lookup_flow(&mut self, n: NodeId, assign: bool) {
        for idx in (0..self.flowstack.len()).rev() {
            let item = self.flowstack[idx].item;
            enum Match {
                No,
                /// Same access path: restore the pre-refinement type.
                Path,
                /// Writing the root identifier of a recorded dot path.
                Root,
            }
            let matched = match (&self.arena[n].kind, &self.arena[item].kind) {
                (NodeKind::Ident(a), NodeKind::Ident(b)) if a == b => Match::Path,
                (NodeKind::Ident(a), NodeKind::Dot { obj, .. })
                    if assign && self.arena[*obj].kind.ident() == Some(*a) =>
                {
                    Match::Root
                }
                (
                    NodeKind::Dot {
                        obj: nobj,
                        field: nfld,
                        ..
                    },
                    NodeKind::Dot {
                        obj: iobj,
                        field: ifld,
                        ..
                    },
                ) if nfld == ifld => {
                    let a = self.arena[*nobj].kind.ident();
                    let b = self.arena[*iobj].kind.ident();
                    if a.is_some() && a == b {
                        Match::Path
                    } else {
                        Match::No
                    }
                }
                _ => Match::No,
            };
            match matched {
                Match::No => continue,
                Match::Path => {
                    self.arena[n].exptype = self.flowstack[idx].old.clone();
                }
                Match::Root => {}
            }
            if assign {
                // The refinement no longer holds; a single assignment may
                // invalidate several entries, so keep scanning.
                let old = self.flowstack[idx].old.clone();
                self.flowstack[idx].now = old;
            } else {
                self.arena[n].exptype = self.flowstack[idx].now.clone();
                return;
            }
        }
    }
}

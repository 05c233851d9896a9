//! Flat node storage.
//!
//! All deep AST mutation goes through the helpers here:
//!
//! - `wrap_coercion` splices a coercion above a node *in place*: the node
//!   is moved to a fresh slot and its old slot becomes the wrapper, so
//!   every `NodeId` held by a parent stays valid.
//! - `replace_with_child` undoes that: the child is copied back over the
//!   wrapper slot (used when re-checking removes stale coercions).
//! - `clone_subtree` deep-clones a body for SubFunction specialization,
//!   remapping argument/local identifiers to their clones.
//!
//! Vacated slots stay allocated until the arena drops; cloned and
//! coerced nodes only ever grow the arena.

use minnow_common::SrcLoc;
use minnow_solver::{IdentId, Type};
use rustc_hash::FxHashMap;

use crate::node::{Node, NodeId, NodeKind};

#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    pub fn new() -> Self {
        NodeArena { nodes: Vec::new() }
    }

    pub fn add(&mut self, kind: NodeKind, loc: SrcLoc) -> NodeId {
        self.nodes.push(Node::new(kind, loc));
        NodeId::from_index(self.nodes.len() - 1)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId::from_index(i), n))
    }

    /// Splice a coercion wrapper above `id` without invalidating the id:
    /// the wrapped node moves to a fresh slot, `id` becomes the wrapper.
    pub fn wrap_coercion(
        &mut self,
        id: NodeId,
        make: impl FnOnce(NodeId) -> NodeKind,
        ty: Type,
    ) {
        let loc = self[id].loc;
        let placeholder = Node::new(NodeKind::Nil, loc);
        let inner = std::mem::replace(&mut self.nodes[id.index()], placeholder);
        self.nodes.push(inner);
        let child = NodeId::from_index(self.nodes.len() - 1);
        self.nodes[id.index()] = Node {
            kind: make(child),
            loc,
            exptype: ty,
        };
    }

    /// Overwrite `id` with a copy of `child`, discarding the node at `id`.
    pub fn replace_with_child(&mut self, id: NodeId, child: NodeId) {
        self.nodes[id.index()] = self.nodes[child.index()].clone();
    }

    /// Deep-clone the subtree at `id`. Identifier references found in
    /// `remap` are substituted; everything else (resolved specializations
    /// included) is copied verbatim.
    pub fn clone_subtree(&mut self, id: NodeId, remap: &FxHashMap<IdentId, IdentId>) -> NodeId {
        let node = self.nodes[id.index()].clone();
        let kind = match node.kind {
            NodeKind::Ident(i) => NodeKind::Ident(remap.get(&i).copied().unwrap_or(i)),
            NodeKind::BinOp { op, left, right } => NodeKind::BinOp {
                op,
                left: self.clone_subtree(left, remap),
                right: self.clone_subtree(right, remap),
            },
            NodeKind::CompoundAssign { op, target, value } => NodeKind::CompoundAssign {
                op,
                target: self.clone_subtree(target, remap),
                value: self.clone_subtree(value, remap),
            },
            NodeKind::And { left, right } => NodeKind::And {
                left: self.clone_subtree(left, remap),
                right: self.clone_subtree(right, remap),
            },
            NodeKind::Or { left, right } => NodeKind::Or {
                left: self.clone_subtree(left, remap),
                right: self.clone_subtree(right, remap),
            },
            NodeKind::Not(c) => NodeKind::Not(self.clone_subtree(c, remap)),
            NodeKind::Neg(c) => NodeKind::Neg(self.clone_subtree(c, remap)),
            NodeKind::IncDec { op, target } => NodeKind::IncDec {
                op,
                target: self.clone_subtree(target, remap),
            },
            NodeKind::Def { ids, init } => NodeKind::Def {
                ids: self.clone_list(&ids, remap),
                init: self.clone_subtree(init, remap),
            },
            NodeKind::AssignList { targets, rhs } => NodeKind::AssignList {
                targets: self.clone_list(&targets, remap),
                rhs: self.clone_subtree(rhs, remap),
            },
            NodeKind::Assign { target, value } => NodeKind::Assign {
                target: self.clone_subtree(target, remap),
                value: self.clone_subtree(value, remap),
            },
            NodeKind::Dot { obj, field, maybe } => NodeKind::Dot {
                obj: self.clone_subtree(obj, remap),
                field,
                maybe,
            },
            NodeKind::Index { obj, index } => NodeKind::Index {
                obj: self.clone_subtree(obj, remap),
                index: self.clone_subtree(index, remap),
            },
            NodeKind::CoAt { coro, var } => NodeKind::CoAt {
                coro: self.clone_subtree(coro, remap),
                var: self.clone_subtree(var, remap),
            },
            NodeKind::Call {
                fun,
                args,
                resolved,
            } => NodeKind::Call {
                fun,
                args: self.clone_list(&args, remap),
                resolved,
            },
            NodeKind::DynCall {
                fval,
                args,
                resolved,
            } => NodeKind::DynCall {
                fval: self.clone_subtree(fval, remap),
                args: self.clone_list(&args, remap),
                resolved,
            },
            NodeKind::NatCall { nf, args } => NodeKind::NatCall {
                nf,
                args: self.clone_list(&args, remap),
            },
            NodeKind::Return { value, target } => NodeKind::Return {
                value: value.map(|v| self.clone_subtree(v, remap)),
                target,
            },
            NodeKind::If {
                cond,
                then_branch,
                else_branch,
            } => NodeKind::If {
                cond: self.clone_subtree(cond, remap),
                then_branch: self.clone_subtree(then_branch, remap),
                else_branch: else_branch.map(|e| self.clone_subtree(e, remap)),
            },
            NodeKind::While { cond, body } => NodeKind::While {
                cond: self.clone_subtree(cond, remap),
                body: self.clone_subtree(body, remap),
            },
            NodeKind::For { iter, body } => NodeKind::For {
                iter: self.clone_subtree(iter, remap),
                body: self.clone_subtree(body, remap),
            },
            NodeKind::Constructor { ty, args } => NodeKind::Constructor {
                ty,
                args: self.clone_list(&args, remap),
            },
            NodeKind::Super(c) => NodeKind::Super(self.clone_subtree(c, remap)),
            NodeKind::Is { value, ty } => NodeKind::Is {
                value: self.clone_subtree(value, remap),
                ty,
            },
            NodeKind::Seq { first, second } => NodeKind::Seq {
                first: self.clone_subtree(first, remap),
                second: self.clone_subtree(second, remap),
            },
            NodeKind::MultiRet(exps) => NodeKind::MultiRet(self.clone_list(&exps, remap)),
            NodeKind::IntToFloat(c) => NodeKind::IntToFloat(self.clone_subtree(c, remap)),
            NodeKind::ToString(c) => NodeKind::ToString(self.clone_subtree(c, remap)),
            NodeKind::Coroutine(c) => NodeKind::Coroutine(self.clone_subtree(c, remap)),
            leaf @ (NodeKind::Int(_)
            | NodeKind::Float(_)
            | NodeKind::Str(_)
            | NodeKind::Nil
            | NodeKind::FunVal { .. }
            | NodeKind::ForLoopVar
            | NodeKind::CoClosure
            | NodeKind::StructDef(_)) => leaf,
        };
        self.nodes.push(Node {
            kind,
            loc: node.loc,
            exptype: Type::Undefined,
        });
        NodeId::from_index(self.nodes.len() - 1)
    }

    fn clone_list(&mut self, ids: &[NodeId], remap: &FxHashMap<IdentId, IdentId>) -> Vec<NodeId> {
        ids.iter().map(|&n| self.clone_subtree(n, remap)).collect()
    }
}

impl std::ops::Index<NodeId> for NodeArena {
    type Output = Node;

    #[inline]
    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }
}

impl std::ops::IndexMut<NodeId> for NodeArena {
    #[inline]
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }
}

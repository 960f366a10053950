//! Children of Document, DocumentFragment and Element nodes.
//!
//! A container starts in list mode: it only knows its first child and the
//! children form a circular sibling list. The first indexed access switches it
//! to indexed mode for good. From then on the children live in
//! [`NodeData::child_nodes`](super::node::NodeData::child_nodes) and every one
//! of them is a self-linked singleton, so the two representations never have
//! to be kept in sync.

use tracing::debug;

use super::{
    NodeId, Tree,
    linked_list::{self, SiblingLinks},
};

impl Tree {
    pub(crate) fn is_indexed(&self, parent: NodeId) -> bool {
        self.node(parent).child_nodes.is_some()
    }

    pub(crate) fn first_child(&self, parent: NodeId) -> Option<NodeId> {
        let node = self.node(parent);
        match &node.child_nodes {
            Some(kids) => kids.first().copied(),
            None => node.first_child,
        }
    }

    pub(crate) fn last_child(&self, parent: NodeId) -> Option<NodeId> {
        let node = self.node(parent);
        match &node.child_nodes {
            Some(kids) => kids.last().copied(),
            None => node.first_child.map(|first| self.prev(first)),
        }
    }

    pub(crate) fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        if let Some(kids) = &self.node(parent).child_nodes {
            return kids.get(self.index_in(parent, id) + 1).copied();
        }
        let next = self.next(id);
        (Some(next) != self.node(parent).first_child).then_some(next)
    }

    pub(crate) fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        if let Some(kids) = &self.node(parent).child_nodes {
            let index = self.index_in(parent, id);
            return index.checked_sub(1).map(|i| kids[i]);
        }
        (Some(id) != self.node(parent).first_child).then(|| self.prev(id))
    }

    /// Position of `child` in the children vector of the indexed `parent`.
    ///
    /// The cached index of the child is trusted only if it still points at the
    /// child; otherwise every child of `parent` is renumbered.
    fn index_in(&self, parent: NodeId, child: NodeId) -> usize {
        let Some(kids) = &self.node(parent).child_nodes else {
            unreachable!("{parent:?} is not indexed");
        };
        let hint = self.node(child).index.get();
        if kids.get(hint) == Some(&child) {
            return hint;
        }
        for (i, &kid) in kids.iter().enumerate() {
            self.node(kid).index.set(i);
        }
        let index = self.node(child).index.get();
        assert_eq!(kids.get(index), Some(&child), "{child:?} is not a child of {parent:?}");
        index
    }

    /// Position of `child` among the children of its parent.
    pub(crate) fn child_index(&self, child: NodeId) -> Option<usize> {
        let parent = self.parent(child)?;
        if self.is_indexed(parent) {
            return Some(self.index_in(parent, child));
        }
        self.children(parent).iter().position(|&c| c == child)
    }

    /// Switch `parent` to indexed mode if it is not already.
    pub(crate) fn ensure_child_nodes(&mut self, parent: NodeId) {
        if self.is_indexed(parent) {
            return;
        }
        let kids = self.children(parent);
        debug!(?parent, children = kids.len(), "materialize child nodes");
        for (i, &kid) in kids.iter().enumerate() {
            self.set_next(kid, kid);
            self.set_prev(kid, kid);
            self.node(kid).index.set(i);
        }
        let node = self.node_mut(parent);
        node.first_child = None;
        node.child_nodes = Some(kids);
    }

    /// Collect the children of `parent` in order.
    pub(crate) fn children(&self, parent: NodeId) -> Vec<NodeId> {
        let node = self.node(parent);
        if let Some(kids) = &node.child_nodes {
            return kids.clone();
        }
        let Some(first) = node.first_child else {
            return vec![];
        };
        let mut res = vec![first];
        let mut cur = self.next(first);
        while cur != first {
            res.push(cur);
            cur = self.next(cur);
        }
        res
    }

    pub(crate) fn has_children(&self, parent: NodeId) -> bool {
        self.first_child(parent).is_some()
    }

    pub(crate) fn child_count(&self, parent: NodeId) -> usize {
        match &self.node(parent).child_nodes {
            Some(kids) => kids.len(),
            None => self.children(parent).len(),
        }
    }

    pub(crate) fn child_at(&self, parent: NodeId, index: usize) -> Option<NodeId> {
        match &self.node(parent).child_nodes {
            Some(kids) => kids.get(index).copied(),
            None => self.children(parent).get(index).copied(),
        }
    }

    /// Link the detached `node` into `parent` in front of `before`, or at the
    /// end if `before` is `None`.
    pub(crate) fn link_before(&mut self, parent: NodeId, node: NodeId, before: Option<NodeId>) {
        self.link_many_before(parent, &[node], before);
    }

    /// Link the detached `nodes` into `parent`, in order, in front of
    /// `before`.
    pub(crate) fn link_many_before(&mut self, parent: NodeId, nodes: &[NodeId], before: Option<NodeId>) {
        let Some((&head, rest)) = nodes.split_first() else {
            return;
        };
        for &node in nodes {
            debug_assert!(self.parent(node).is_none(), "{node:?} is still attached");
            self.node_mut(node).parent = Some(parent);
        }

        if self.is_indexed(parent) {
            let at = match before {
                Some(before) => self.index_in(parent, before),
                None => self.child_count(parent),
            };
            for (i, &node) in nodes.iter().enumerate() {
                self.node(node).index.set(at + i);
            }
            if let Some(kids) = self.node_mut(parent).child_nodes.as_mut() {
                kids.splice(at..at, nodes.iter().copied());
            }
            return;
        }

        for &node in rest {
            linked_list::insert_before(self, node, head);
        }
        match self.node(parent).first_child {
            None => self.node_mut(parent).first_child = Some(head),
            Some(first) => {
                linked_list::insert_before(self, head, before.unwrap_or(first));
                if before == Some(first) {
                    self.node_mut(parent).first_child = Some(head);
                }
            }
        }
    }

    /// Detach `node` from its parent without any bookkeeping.
    pub(crate) fn unlink(&mut self, node: NodeId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        if self.is_indexed(parent) {
            let at = self.index_in(parent, node);
            if let Some(kids) = self.node_mut(parent).child_nodes.as_mut() {
                kids.remove(at);
            }
        } else {
            if self.node(parent).first_child == Some(node) {
                let next = self.next(node);
                self.node_mut(parent).first_child = (next != node).then_some(next);
            }
            linked_list::remove(self, node);
        }
        self.node_mut(node).parent = None;
    }

    /// Put the detached `new` where `old` is, detaching `old`.
    pub(crate) fn replace_link(&mut self, old: NodeId, new: NodeId) {
        let Some(parent) = self.parent(old) else {
            return;
        };
        if self.is_indexed(parent) {
            let at = self.index_in(parent, old);
            self.node(new).index.set(at);
            if let Some(kids) = self.node_mut(parent).child_nodes.as_mut() {
                kids[at] = new;
            }
        } else {
            linked_list::replace(self, old, Some(new));
            if self.node(parent).first_child == Some(old) {
                self.node_mut(parent).first_child = Some(new);
            }
        }
        self.node_mut(new).parent = Some(parent);
        self.node_mut(old).parent = None;
    }

    /// Detach every child of `parent` without any bookkeeping and return them.
    pub(crate) fn unlink_children(&mut self, parent: NodeId) -> Vec<NodeId> {
        let kids = self.children(parent);
        for &kid in &kids {
            self.set_next(kid, kid);
            self.set_prev(kid, kid);
            self.node_mut(kid).parent = None;
        }
        let node = self.node_mut(parent);
        node.first_child = None;
        if let Some(vec) = node.child_nodes.as_mut() {
            vec.clear();
        }
        kids
    }
}

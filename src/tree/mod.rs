//! Arena storage of the node tree.
//!
//! All nodes of all documents created through one `DOMImplementation` live in
//! a single [`Tree`]. Nodes refer to each other by [`NodeId`], so the circular
//! sibling lists and the parent/owner back links never form ownership cycles.
//! Slots of unreachable nodes are reclaimed by [`Tree::collect`] and reused
//! by later allocations.
//!
//! Functions in this module and its children keep every structural invariant
//! but never call back into user code. Notifications for the mutation handler
//! are queued in [`Tree::pending`] and delivered by the `dom` layer after the
//! arena borrow has been released.

pub(crate) mod attribute;
pub(crate) mod collect;
pub(crate) mod container;
pub(crate) mod document;
pub(crate) mod id;
pub(crate) mod leaf;
pub(crate) mod linked_list;
pub(crate) mod mutation;
pub(crate) mod names;
pub(crate) mod node;
pub(crate) mod position;

use std::{
    cell::RefCell,
    collections::VecDeque,
    num::NonZeroU32,
    rc::Weak,
};

use crate::dom::NodeType;

use document::{NodeIteratorState, PendingMutation};
use linked_list::SiblingLinks;
use node::{AttrData, ElementData, NodeData, NodeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct NodeId(NonZeroU32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0.get() as usize - 1
    }

    pub(crate) fn from_index(index: usize) -> Self {
        let raw = u32::try_from(index + 1).expect("Internal Error: arena is full");
        Self(NonZeroU32::new(raw).expect("Internal Error: zero node id"))
    }
}

#[derive(Default)]
pub(crate) struct Tree {
    /// `None` for reclaimed slots waiting in `free`.
    nodes: Vec<Option<NodeData>>,
    /// Bumped every time a slot is reclaimed.
    generations: Vec<u32>,
    free: Vec<NodeId>,
    /// Allocations since the last collection.
    allocated: usize,
    /// Live slots after the last collection.
    survivors: usize,
    /// Modification clock shared by every document of this arena.
    modclock: u64,
    pub(crate) pending: VecDeque<PendingMutation>,
    /// Set while pending records are handed to mutation handlers.
    pub(crate) delivering: bool,
    /// Every live `NodeIterator` of the arena, whatever document its root
    /// currently belongs to.
    pub(crate) node_iterators: Vec<Weak<RefCell<NodeIteratorState>>>,
}

impl Tree {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn alloc(&mut self, kind: NodeKind, owner_document: Option<NodeId>) -> NodeId {
        self.allocated += 1;
        if let Some(id) = self.free.pop() {
            self.nodes[id.index()] = Some(NodeData::new(id, kind, owner_document));
            return id;
        }
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(Some(NodeData::new(id, kind, owner_document)));
        self.generations.push(0);
        id
    }

    pub(crate) fn node(&self, id: NodeId) -> &NodeData {
        self.nodes[id.index()]
            .as_ref()
            .expect("Internal Error: access to a reclaimed node")
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        self.nodes[id.index()]
            .as_mut()
            .expect("Internal Error: access to a reclaimed node")
    }

    /// The number of times the slot of `id` has been reclaimed.
    pub(crate) fn generation(&self, id: NodeId) -> u32 {
        self.generations[id.index()]
    }

    /// The number of slots holding a node, reachable or not.
    pub(crate) fn live_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub(crate) fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub(crate) fn node_type(&self, id: NodeId) -> NodeType {
        self.kind(id).node_type()
    }

    pub(crate) fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.kind(id) {
            NodeKind::Element(elem) => Some(elem),
            _ => None,
        }
    }

    pub(crate) fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.node_mut(id).kind {
            NodeKind::Element(elem) => Some(elem),
            _ => None,
        }
    }

    pub(crate) fn attr(&self, id: NodeId) -> Option<&AttrData> {
        match self.kind(id) {
            NodeKind::Attribute(attr) => Some(attr),
            _ => None,
        }
    }

    pub(crate) fn attr_mut(&mut self, id: NodeId) -> Option<&mut AttrData> {
        match &mut self.node_mut(id).kind {
            NodeKind::Attribute(attr) => Some(attr),
            _ => None,
        }
    }

    pub(crate) fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Element(_))
    }

    pub(crate) fn is_document(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Document(_))
    }

    pub(crate) fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub(crate) fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|&p| self.is_element(p))
    }

    /// The document this node belongs to: itself for documents, the owner
    /// document for everything else.
    pub(crate) fn node_document(&self, id: NodeId) -> Option<NodeId> {
        if self.is_document(id) {
            Some(id)
        } else {
            self.node(id).owner_document
        }
    }

    pub(crate) fn is_rooted(&self, id: NodeId) -> bool {
        self.node(id).nid.is_some()
    }

    /// Iterate over the ancestors of `id`, nearest first, excluding `id`.
    pub(crate) fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), |&n| self.parent(n))
    }

    /// Check if `ancestor` is `id` or one of its ancestors.
    pub(crate) fn is_inclusive_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        ancestor == id || self.ancestors(id).any(|n| n == ancestor)
    }

    /// The root of the tree `id` belongs to.
    pub(crate) fn root(&self, id: NodeId) -> NodeId {
        self.ancestors(id).last().unwrap_or(id)
    }

    /// The node following `id` in tree order, staying inside `root`.
    pub(crate) fn following(&self, id: NodeId, root: NodeId) -> Option<NodeId> {
        if let Some(child) = self.first_child(id) {
            return Some(child);
        }
        self.following_skipping_children(id, root)
    }

    /// The node following `id` in tree order that is not a descendant of `id`,
    /// staying inside `root`.
    pub(crate) fn following_skipping_children(&self, id: NodeId, root: NodeId) -> Option<NodeId> {
        let mut cur = id;
        loop {
            if cur == root {
                return None;
            }
            if let Some(next) = self.next_sibling(cur) {
                return Some(next);
            }
            cur = self.parent(cur)?;
        }
    }

    /// The node preceding `id` in tree order, staying inside `root`.
    pub(crate) fn preceding(&self, id: NodeId, root: NodeId) -> Option<NodeId> {
        if id == root {
            return None;
        }
        match self.previous_sibling(id) {
            Some(prev) => Some(self.last_inclusive_descendant(prev)),
            None => self.parent(id),
        }
    }

    /// The last node in tree order of the subtree rooted at `id`.
    pub(crate) fn last_inclusive_descendant(&self, id: NodeId) -> NodeId {
        let mut cur = id;
        while let Some(last) = self.last_child(cur) {
            cur = last;
        }
        cur
    }

    /// Collect the subtree rooted at `id` in tree order.
    pub(crate) fn inclusive_descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut res = vec![id];
        let mut cur = id;
        while let Some(next) = self.following(cur, id) {
            res.push(next);
            cur = next;
        }
        res
    }

    /// Advance the shared modification clock and stamp `id` and all of its
    /// ancestors with the new time.
    pub(crate) fn modify(&mut self, id: NodeId) {
        self.modclock += 1;
        let time = self.modclock;
        self.node(id).last_mod_time.set(time);
        for n in self.ancestors(id) {
            self.node(n).last_mod_time.set(time);
        }
    }

    pub(crate) fn last_mod_time(&self, id: NodeId) -> u64 {
        self.node(id).last_mod_time.get()
    }
}

impl SiblingLinks for Tree {
    fn next(&self, id: NodeId) -> NodeId {
        self.node(id).next_sibling
    }

    fn prev(&self, id: NodeId) -> NodeId {
        self.node(id).previous_sibling
    }

    fn set_next(&mut self, id: NodeId, next: NodeId) {
        self.node_mut(id).next_sibling = next;
    }

    fn set_prev(&mut self, id: NodeId, prev: NodeId) {
        self.node_mut(id).previous_sibling = prev;
    }
}

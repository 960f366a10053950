//! Rooting, node numbering and mutation notifications of documents.

use std::{
    cell::RefCell,
    collections::HashMap,
    rc::{Rc, Weak},
};

use tracing::{debug, trace};

use crate::dom::{document::DocumentReadyState, mutation::MutationHandler};

use super::{NodeId, Tree, id::IdRegistry, node::NodeKind};

pub(crate) struct DocumentData {
    pub(crate) is_html: bool,
    pub(crate) content_type: Rc<str>,
    pub(crate) address: Rc<str>,
    pub(crate) quirks: bool,
    pub(crate) ready_state: DocumentReadyState,
    next_nid: u32,
    nodes_by_nid: HashMap<u32, NodeId>,
    pub(crate) ids: IdRegistry,
    pub(crate) mutation_handler: Option<MutationHandler>,
    /// Bumped whenever the handler slot is set or cleared.
    pub(crate) handler_epoch: u64,
}

/// The part of a `NodeIterator` the document has to adjust when nodes are
/// removed.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NodeIteratorState {
    pub(crate) root: NodeId,
    pub(crate) reference: NodeId,
    pub(crate) pointer_before_reference: bool,
}

/// Mutation record in arena terms, waiting for delivery.
#[derive(Debug, Clone)]
pub(crate) enum RawMutation {
    Value {
        target: NodeId,
        data: String,
    },
    Attr {
        target: NodeId,
        attr: NodeId,
        old_value: Option<String>,
    },
    RemoveAttr {
        target: NodeId,
        attr: NodeId,
    },
    Insert {
        target: NodeId,
        node: NodeId,
    },
    Remove {
        target: NodeId,
        nodes: Vec<NodeId>,
    },
    Move {
        target: NodeId,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct PendingMutation {
    pub(crate) document: NodeId,
    pub(crate) record: RawMutation,
}

impl Tree {
    pub(crate) fn create_document(
        &mut self,
        is_html: bool,
        address: Rc<str>,
        content_type: Rc<str>,
    ) -> NodeId {
        let data = DocumentData {
            is_html,
            content_type,
            address,
            quirks: false,
            ready_state: DocumentReadyState::Loading,
            next_nid: 2,
            nodes_by_nid: HashMap::new(),
            ids: IdRegistry::default(),
            mutation_handler: None,
            handler_epoch: 0,
        };
        let doc = self.alloc(NodeKind::Document(Box::new(data)), None);
        self.node_mut(doc).nid = Some(1);
        self.document_mut(doc).nodes_by_nid.insert(1, doc);
        doc
    }

    pub(crate) fn document(&self, doc: NodeId) -> &DocumentData {
        match self.kind(doc) {
            NodeKind::Document(data) => data,
            _ => unreachable!("{doc:?} is not a document"),
        }
    }

    pub(crate) fn document_mut(&mut self, doc: NodeId) -> &mut DocumentData {
        match &mut self.node_mut(doc).kind {
            NodeKind::Document(data) => data,
            _ => unreachable!("{doc:?} is not a document"),
        }
    }

    pub(crate) fn node_by_number(&self, doc: NodeId, nid: u32) -> Option<NodeId> {
        self.document(doc).nodes_by_nid.get(&nid).copied()
    }

    pub(crate) fn rooted_count(&self, doc: NodeId) -> usize {
        self.document(doc).nodes_by_nid.len()
    }

    /// The registered id of an element: its null namespace, unprefixed `id`
    /// attribute.
    pub(crate) fn element_id(&self, elem: NodeId) -> Option<Rc<str>> {
        let attr = self.element(elem)?.attributes.find_ns(None, "id")?;
        let attr = self.attr(attr)?;
        if attr.prefix.is_some() || attr.value.is_empty() {
            return None;
        }
        Some(attr.value.as_str().into())
    }

    fn root_node(&mut self, node: NodeId) {
        let Some(doc) = self.node_document(node) else {
            unreachable!("{node:?} is rooted without a document");
        };
        let data = self.document_mut(doc);
        let nid = data.next_nid;
        data.next_nid += 1;
        data.nodes_by_nid.insert(nid, node);
        self.node_mut(node).nid = Some(nid);
        trace!(?node, nid, "root");
        if let Some(id) = self.element_id(node) {
            self.add_id(doc, &id, node);
        }
    }

    fn uproot_node(&mut self, node: NodeId) {
        let Some(doc) = self.node_document(node) else {
            return;
        };
        if let Some(id) = self.element_id(node) {
            self.del_id(doc, &id, node);
        }
        if let Some(nid) = self.node_mut(node).nid.take() {
            trace!(?node, nid, "uproot");
            self.document_mut(doc).nodes_by_nid.remove(&nid);
        }
    }

    /// Number `node` and its descendants top-down.
    pub(crate) fn recursively_root(&mut self, node: NodeId) {
        for n in self.inclusive_descendants(node) {
            self.root_node(n);
        }
    }

    pub(crate) fn recursively_uproot(&mut self, node: NodeId) {
        for n in self.inclusive_descendants(node) {
            self.uproot_node(n);
        }
    }

    fn enqueue(&mut self, node: NodeId, record: RawMutation) {
        let Some(document) = self.node_document(node) else {
            return;
        };
        if self.document(document).mutation_handler.is_some() {
            self.pending.push_back(PendingMutation { document, record });
        }
    }

    /// `node` has just been linked below a rooted parent.
    pub(crate) fn mutate_insert(&mut self, node: NodeId) {
        self.recursively_root(node);
        if let Some(target) = self.parent(node) {
            self.enqueue(node, RawMutation::Insert { target, node });
        }
    }

    /// `node` is about to be unlinked from its rooted parent.
    pub(crate) fn mutate_remove(&mut self, node: NodeId) {
        if let Some(target) = self.parent(node) {
            self.enqueue(
                node,
                RawMutation::Remove {
                    target,
                    nodes: vec![node],
                },
            );
        }
        self.recursively_uproot(node);
    }

    /// `nodes` (all children of the rooted `parent`) are about to be unlinked
    /// together.
    pub(crate) fn mutate_remove_all(&mut self, parent: NodeId, nodes: &[NodeId]) {
        self.enqueue(
            parent,
            RawMutation::Remove {
                target: parent,
                nodes: nodes.to_vec(),
            },
        );
        for &node in nodes {
            self.recursively_uproot(node);
        }
    }

    pub(crate) fn mutate_move(&mut self, node: NodeId) {
        self.enqueue(node, RawMutation::Move { target: node });
    }

    pub(crate) fn mutate_value(&mut self, node: NodeId) {
        if let Some(data) = self.kind(node).character_data() {
            let data = data.to_owned();
            self.enqueue(node, RawMutation::Value { target: node, data });
        }
    }

    pub(crate) fn mutate_attr(&mut self, elem: NodeId, attr: NodeId, old_value: Option<String>) {
        self.enqueue(
            elem,
            RawMutation::Attr {
                target: elem,
                attr,
                old_value,
            },
        );
    }

    pub(crate) fn mutate_remove_attr(&mut self, elem: NodeId, attr: NodeId) {
        self.enqueue(elem, RawMutation::RemoveAttr { target: elem, attr });
    }

    pub(crate) fn register_node_iterator(&mut self, state: &Rc<RefCell<NodeIteratorState>>) {
        self.node_iterators.retain(|it| it.strong_count() > 0);
        self.node_iterators.push(Rc::downgrade(state));
    }

    /// Give every live node iterator whose root contains `node` the chance to
    /// move away from `node` before it is removed.
    ///
    /// Iterators are kept per arena, so they follow their root through
    /// adoption into another document.
    pub(crate) fn preremove_node_iterators(&mut self, node: NodeId) {
        let iterators = &mut self.node_iterators;
        iterators.retain(|it| it.strong_count() > 0);
        if iterators.is_empty() {
            return;
        }
        let iterators = iterators.iter().filter_map(Weak::upgrade).collect::<Vec<_>>();
        for it in iterators {
            let mut state = it.borrow_mut();
            self.preremove_node_iterator(&mut state, node);
        }
    }

    fn preremove_node_iterator(&self, it: &mut NodeIteratorState, to_be_removed: NodeId) {
        if to_be_removed == it.root
            || !self.is_inclusive_ancestor(to_be_removed, it.reference)
            || !self.is_inclusive_ancestor(it.root, to_be_removed)
        {
            return;
        }
        if it.pointer_before_reference {
            if let Some(next) = self.following_skipping_children(to_be_removed, it.root) {
                it.reference = next;
                return;
            }
            it.pointer_before_reference = false;
        }
        it.reference = match self.previous_sibling(to_be_removed) {
            Some(prev) => self.last_inclusive_descendant(prev),
            None => self.parent(to_be_removed).unwrap_or(it.root),
        };
    }

    /// Make `doc` the owner document of `node`, its descendants and their
    /// attributes.
    pub(crate) fn set_owner_recursively(&mut self, node: NodeId, doc: NodeId) {
        if self.node(node).owner_document == Some(doc) {
            return;
        }
        debug!(?node, ?doc, "adopt subtree");
        for n in self.inclusive_descendants(node) {
            self.node_mut(n).owner_document = Some(doc);
            if let Some(elem) = self.element(n) {
                elem.tag_name.replace(None);
                let attrs = elem.attributes.ids().collect::<Vec<_>>();
                for attr in attrs {
                    self.node_mut(attr).owner_document = Some(doc);
                }
            }
        }
    }
}

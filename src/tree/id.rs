//! Id to element index of a document.
//!
//! Most ids are unique, so the registry stores a single element per id and
//! only switches to a [`MultiId`] holder while more than one rooted element
//! carries the same id.

use std::{cell::Cell, collections::HashMap, rc::Rc};

use tracing::{debug, warn};

use super::{NodeId, Tree};

#[derive(Debug)]
pub(crate) enum IdEntry {
    Single(NodeId),
    Multiple(MultiId),
}

/// Several elements sharing one id.
///
/// The first element in document order is computed on demand and cached until
/// the next membership change.
#[derive(Debug)]
pub(crate) struct MultiId {
    nodes: Vec<NodeId>,
    first: Cell<Option<NodeId>>,
}

impl MultiId {
    fn new(node: NodeId) -> Self {
        Self {
            nodes: vec![node],
            first: Cell::new(None),
        }
    }

    fn add(&mut self, node: NodeId) {
        if !self.nodes.contains(&node) {
            self.nodes.push(node);
            self.first.set(None);
        }
    }

    fn del(&mut self, node: NodeId) {
        if let Some(pos) = self.nodes.iter().position(|&n| n == node) {
            self.nodes.swap_remove(pos);
            self.first.set(None);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }
}

#[derive(Debug, Default)]
pub(crate) struct IdRegistry {
    map: HashMap<Rc<str>, IdEntry>,
}

impl IdRegistry {
    pub(crate) fn add(&mut self, id: &str, node: NodeId) {
        let Some(entry) = self.map.get_mut(id) else {
            self.map.insert(id.into(), IdEntry::Single(node));
            return;
        };
        match entry {
            IdEntry::Single(old) if *old == node => {}
            IdEntry::Single(old) => {
                let old = *old;
                debug!(id, "id is shared by several elements");
                let mut multi = MultiId::new(old);
                multi.add(node);
                *entry = IdEntry::Multiple(multi);
            }
            IdEntry::Multiple(multi) => multi.add(node),
        }
    }

    pub(crate) fn del(&mut self, id: &str, node: NodeId) {
        let Some(entry) = self.map.get_mut(id) else {
            warn!(id, "removing an id that is not registered");
            return;
        };
        match entry {
            IdEntry::Single(old) if *old == node => {
                self.map.remove(id);
            }
            IdEntry::Single(_) => warn!(id, "removing an id registered for another element"),
            IdEntry::Multiple(multi) => {
                multi.del(node);
                if multi.len() == 1 {
                    let last = multi.nodes[0];
                    debug!(id, "id is unique again");
                    *entry = IdEntry::Single(last);
                }
            }
        }
    }

    pub(crate) fn get(&self, id: &str) -> Option<&IdEntry> {
        self.map.get(id)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }
}

impl Tree {
    pub(crate) fn add_id(&mut self, doc: NodeId, id: &str, node: NodeId) {
        if !id.is_empty() {
            self.document_mut(doc).ids.add(id, node);
        }
    }

    pub(crate) fn del_id(&mut self, doc: NodeId, id: &str, node: NodeId) {
        if !id.is_empty() {
            self.document_mut(doc).ids.del(id, node);
        }
    }

    /// Look up the first element in document order whose id is `id`.
    pub(crate) fn get_element_by_id(&self, doc: NodeId, id: &str) -> Option<NodeId> {
        match self.document(doc).ids.get(id)? {
            IdEntry::Single(node) => Some(*node),
            IdEntry::Multiple(multi) => {
                if let Some(first) = multi.first.get() {
                    return Some(first);
                }
                let first = multi
                    .nodes
                    .iter()
                    .copied()
                    .reduce(|a, b| if self.precedes(b, a) { b } else { a })?;
                multi.first.set(Some(first));
                Some(first)
            }
        }
    }
}

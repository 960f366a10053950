//! Reclamation of unreachable nodes.
//!
//! Nodes are kept alive by handles. A node is reachable if any node of its
//! tree is held, or if it is the document of a reachable node. Attributes
//! belong to the tree of their owner element. Everything else is swept and
//! its slot goes back to the free list.

use tracing::debug;

use super::{NodeId, Tree, node::NodeData};

/// Collections are not attempted before this many allocations happened.
const MIN_COLLECT_INTERVAL: usize = 256;

impl Tree {
    /// Check if enough has been allocated since the last collection to make
    /// another one worthwhile.
    pub(crate) fn collect_due(&self) -> bool {
        self.allocated >= (self.survivors / 2).max(MIN_COLLECT_INTERVAL)
    }

    /// The root of the tree `id` belongs to, following the owner element of
    /// attributes.
    fn tree_root(&self, id: NodeId) -> NodeId {
        let id = self.attr(id).and_then(|attr| attr.owner_element).unwrap_or(id);
        self.root(id)
    }

    /// Free every node that cannot be reached from `roots`.
    ///
    /// The removed nodes are returned instead of being dropped, because
    /// listeners and handlers stored in them may hold handles of this arena.
    /// The caller drops them after releasing the arena.
    ///
    /// Nothing may be pending delivery: queued records refer to nodes by id.
    pub(crate) fn collect(&mut self, roots: impl IntoIterator<Item = NodeId>) -> Vec<NodeData> {
        assert!(self.pending.is_empty(), "collection with undelivered mutation records");

        let mut marks = vec![false; self.nodes.len()];
        let mut stack = roots.into_iter().collect::<Vec<_>>();
        while let Some(id) = stack.pop() {
            let top = self.tree_root(id);
            if marks[top.index()] {
                continue;
            }
            for n in self.inclusive_descendants(top) {
                marks[n.index()] = true;
                let node = self.node(n);
                if let Some(doc) = node.owner_document {
                    if !marks[doc.index()] {
                        stack.push(doc);
                    }
                }
                if let Some(elem) = self.element(n) {
                    for attr in elem.attributes.ids() {
                        marks[attr.index()] = true;
                    }
                }
            }
        }

        let mut garbage = vec![];
        for (index, slot) in self.nodes.iter_mut().enumerate() {
            if marks[index] {
                continue;
            }
            if let Some(node) = slot.take() {
                garbage.push(node);
                self.generations[index] += 1;
                self.free.push(NodeId::from_index(index));
            }
        }
        self.allocated = 0;
        self.survivors = self.live_count();
        debug!(freed = garbage.len(), live = self.survivors, "collect");
        garbage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::node::{AttrData, ElementData, NodeKind};

    fn element(tree: &mut Tree, doc: NodeId, name: &str) -> NodeId {
        let data = ElementData::new(name.into(), None, None);
        tree.alloc(NodeKind::Element(Box::new(data)), Some(doc))
    }

    #[test]
    fn unreachable_subtrees_are_freed() {
        let mut tree = Tree::new();
        let doc = tree.create_document(false, "about:blank".into(), "application/xml".into());
        let root = element(&mut tree, doc, "root");
        tree.append_child(doc, root).unwrap();
        tree.set_attribute_raw(root, "id", "r");

        // detached subtree without any holder
        let lost = element(&mut tree, doc, "lost");
        let inner = element(&mut tree, doc, "inner");
        tree.append_child(lost, inner).unwrap();

        // detached subtree held through a descendant
        let kept = element(&mut tree, doc, "kept");
        let held = element(&mut tree, doc, "held");
        tree.append_child(kept, held).unwrap();

        let before = tree.live_count();
        let garbage = tree.collect([doc, held]);
        assert_eq!(garbage.len(), 2);
        assert_eq!(tree.live_count(), before - 2);
        assert_eq!(tree.children(kept), [held]);
        assert_eq!(tree.get_element_by_id(doc, "r"), Some(root));

        // freed slots are handed out again with a new generation
        assert_eq!(tree.generation(lost), 1);
        let again = element(&mut tree, doc, "again");
        assert!([lost, inner].contains(&again));
    }

    #[test]
    fn documents_live_while_their_nodes_do() {
        let mut tree = Tree::new();
        let doc = tree.create_document(false, "about:blank".into(), "application/xml".into());
        let root = element(&mut tree, doc, "root");
        tree.append_child(doc, root).unwrap();
        let orphan = element(&mut tree, doc, "orphan");

        // the detached element keeps its document and the document's tree
        assert!(tree.collect([orphan]).is_empty());
        assert!(tree.is_document(doc));

        let garbage = tree.collect(Vec::<NodeId>::new());
        assert_eq!(garbage.len(), 3);
        assert_eq!(tree.live_count(), 0);
    }

    #[test]
    fn attributes_follow_their_owner() {
        let mut tree = Tree::new();
        let doc = tree.create_document(false, "about:blank".into(), "application/xml".into());
        let elem = element(&mut tree, doc, "e");
        tree.set_attribute_raw(elem, "a", "1");
        let attr = tree.attribute_at(elem, 0).unwrap();
        let loose = tree.alloc(
            NodeKind::Attribute(Box::new(AttrData::new("b".into(), None, None, "2".into()))),
            Some(doc),
        );

        // holding the attribute keeps its element
        assert_eq!(tree.collect([attr]).len(), 1);
        assert!(tree.is_element(elem));
        assert!(tree.generation(loose) > 0);
    }
}

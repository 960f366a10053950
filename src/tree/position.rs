//! Tree order, containment and structural equality.

use std::cmp::Ordering;

use crate::dom::DocumentPosition;

use super::{NodeId, Tree, node::NodeKind};

impl Tree {
    /// The ancestor path of `id`, root first, `id` last.
    fn path(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = vec![id];
        path.extend(self.ancestors(id));
        path.reverse();
        path
    }

    /// Compare two nodes in tree order.
    ///
    /// Nodes of different trees are ordered by their arena slot, which is
    /// arbitrary but stable.
    pub(crate) fn tree_order(&self, a: NodeId, b: NodeId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        let pa = self.path(a);
        let pb = self.path(b);
        if pa[0] != pb[0] {
            return a.cmp(&b);
        }
        let common = pa.iter().zip(&pb).take_while(|(x, y)| x == y).count();
        match (pa.get(common), pb.get(common)) {
            // `a` is an ancestor of `b`
            (None, _) => Ordering::Less,
            (_, None) => Ordering::Greater,
            (Some(&x), Some(&y)) => self.sibling_order(x, y),
        }
    }

    fn sibling_order(&self, x: NodeId, y: NodeId) -> Ordering {
        if self.parent(x).is_some_and(|parent| self.is_indexed(parent)) {
            return self.child_index(x).cmp(&self.child_index(y));
        }
        let mut cur = self.next_sibling(x);
        while let Some(n) = cur {
            if n == y {
                return Ordering::Less;
            }
            cur = self.next_sibling(n);
        }
        Ordering::Greater
    }

    /// Check if `a` precedes `b` in tree order.
    pub(crate) fn precedes(&self, a: NodeId, b: NodeId) -> bool {
        self.tree_order(a, b) == Ordering::Less
    }

    pub(crate) fn contains(&self, node: NodeId, other: NodeId) -> bool {
        self.is_inclusive_ancestor(node, other)
    }

    /// The position of `other` relative to `node`.
    pub(crate) fn compare_document_position(&self, node: NodeId, other: NodeId) -> DocumentPosition {
        let res = DocumentPosition::new();
        if node == other {
            return res;
        }

        let mut node1 = Some(other);
        let mut node2 = Some(node);
        let mut attr1 = None;
        let mut attr2 = None;
        if let Some(attr) = self.attr(other) {
            attr1 = Some(other);
            node1 = attr.owner_element;
        }
        if let Some(attr) = self.attr(node) {
            attr2 = Some(node);
            node2 = attr.owner_element;
            let owner = node2.filter(|_| attr1.is_some() && node1 == node2);
            if let Some(elem) = owner.and_then(|e| self.element(e)) {
                for a in elem.attributes.ids() {
                    if Some(a) == attr1 {
                        return res
                            .set_flag(DocumentPosition::IMPLEMENTATION_SPECIFIC)
                            .set_flag(DocumentPosition::PRECEDING);
                    }
                    if a == node {
                        return res
                            .set_flag(DocumentPosition::IMPLEMENTATION_SPECIFIC)
                            .set_flag(DocumentPosition::FOLLOWING);
                    }
                }
            }
        }

        let (Some(node1), Some(node2)) = (node1, node2) else {
            return self.disconnected(node, other);
        };
        if self.root(node1) != self.root(node2) {
            return self.disconnected(node, other);
        }

        if (node1 != node2 && self.is_inclusive_ancestor(node1, node2) && attr1.is_none())
            || (node1 == node2 && attr2.is_some())
        {
            return res
                .set_flag(DocumentPosition::CONTAINS)
                .set_flag(DocumentPosition::PRECEDING);
        }
        if (node1 != node2 && self.is_inclusive_ancestor(node2, node1) && attr2.is_none())
            || (node1 == node2 && attr1.is_some())
        {
            return res
                .set_flag(DocumentPosition::CONTAINED_BY)
                .set_flag(DocumentPosition::FOLLOWING);
        }
        if self.precedes(node1, node2) {
            res.set_flag(DocumentPosition::PRECEDING)
        } else {
            res.set_flag(DocumentPosition::FOLLOWING)
        }
    }

    fn disconnected(&self, node: NodeId, other: NodeId) -> DocumentPosition {
        let order = if other < node {
            DocumentPosition::PRECEDING
        } else {
            DocumentPosition::FOLLOWING
        };
        DocumentPosition::new()
            .set_flag(DocumentPosition::DISCONNECTED)
            .set_flag(DocumentPosition::IMPLEMENTATION_SPECIFIC)
            .set_flag(order)
    }
}

/// Structural equality of two subtrees, possibly living in different arenas.
pub(crate) fn is_equal_node(left: &Tree, a: NodeId, right: &Tree, b: NodeId) -> bool {
    if a == b && std::ptr::eq(left, right) {
        return true;
    }
    let same = match (left.kind(a), right.kind(b)) {
        (NodeKind::Document(_), NodeKind::Document(_))
        | (NodeKind::DocumentFragment, NodeKind::DocumentFragment) => true,
        (NodeKind::DocumentType(l), NodeKind::DocumentType(r)) => {
            l.name == r.name && l.public_id == r.public_id && l.system_id == r.system_id
        }
        (NodeKind::Element(l), NodeKind::Element(r)) => {
            l.namespace_uri == r.namespace_uri
                && l.prefix == r.prefix
                && l.local_name == r.local_name
                && l.attributes.len() == r.attributes.len()
                && l.attributes.ids().all(|attr| {
                    let Some(attr) = left.attr(attr) else {
                        return false;
                    };
                    r.attributes
                        .find_ns(attr.namespace_uri.as_deref(), &attr.local_name)
                        .and_then(|other| right.attr(other))
                        .is_some_and(|other| other.value == attr.value)
                })
        }
        (NodeKind::Text(l), NodeKind::Text(r)) | (NodeKind::Comment(l), NodeKind::Comment(r)) => {
            l == r
        }
        (NodeKind::ProcessingInstruction(l), NodeKind::ProcessingInstruction(r)) => {
            l.target == r.target && l.data == r.data
        }
        (NodeKind::Attribute(l), NodeKind::Attribute(r)) => {
            l.namespace_uri == r.namespace_uri && l.local_name == r.local_name && l.value == r.value
        }
        _ => false,
    };
    if !same {
        return false;
    }
    let lkids = left.children(a);
    let rkids = right.children(b);
    lkids.len() == rkids.len()
        && lkids
            .iter()
            .zip(&rkids)
            .all(|(&l, &r)| is_equal_node(left, l, right, r))
}

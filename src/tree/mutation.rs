//! Structural mutations: insertion, removal, replacement, adoption and
//! cloning.
//!
//! Every public entry point validates first and touches the links only after
//! all checks passed, so a failed call leaves the tree as it was.

use crate::dom::{DOMException, NodeType};

use super::{
    NodeId, Tree,
    node::{AttrData, DocumentTypeData, ElementData, NodeKind, ProcessingInstructionData},
};

/// One argument of a variadic insertion, such as `append` or `after`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InsertItem {
    Node(NodeId),
    /// A string, which becomes a new Text node.
    Text,
}

impl Tree {
    fn is_type(&self, id: NodeId, ty: NodeType) -> bool {
        self.node_type(id) == ty
    }

    /// Checks shared by insertion and replacement.
    ///
    /// `child` must already be known to be a child of `parent`.
    fn check_hierarchy(
        &self,
        parent: NodeId,
        node: NodeId,
        child: Option<NodeId>,
        replacing: bool,
    ) -> Result<(), DOMException> {
        use NodeType::*;

        if self.is_inclusive_ancestor(node, parent) {
            return Err(DOMException::HierarchyRequestErr);
        }
        let parent_type = self.node_type(parent);
        match self.node_type(node) {
            Document | Attribute => return Err(DOMException::HierarchyRequestErr),
            Text if parent_type == Document => return Err(DOMException::HierarchyRequestErr),
            DocumentType if parent_type != Document => {
                return Err(DOMException::HierarchyRequestErr);
            }
            _ => {}
        }
        if parent_type != Document {
            return Ok(());
        }

        let (elements, doctype, text) = match self.node_type(node) {
            DocumentFragment => {
                let frag = self.children(node);
                let elements = frag.iter().filter(|&&k| self.is_type(k, Element)).count();
                (elements, false, frag.iter().any(|&k| self.is_type(k, Text)))
            }
            Element => (1, false, false),
            DocumentType => (0, true, false),
            _ => (0, false, false),
        };
        self.check_document_slots(parent, elements, doctype, text, child, replacing, &[])
    }

    /// The element and doctype constraints of a document's children.
    ///
    /// The insertion brings `elements` elements, a doctype if `doctype` and
    /// some Text if `text`. Children of `parent` listed in `leaving` are moved
    /// away before the insertion and do not count.
    #[allow(clippy::too_many_arguments)]
    fn check_document_slots(
        &self,
        parent: NodeId,
        elements: usize,
        doctype: bool,
        text: bool,
        child: Option<NodeId>,
        replacing: bool,
        leaving: &[NodeId],
    ) -> Result<(), DOMException> {
        use NodeType::*;

        if text || elements > 1 {
            return Err(DOMException::HierarchyRequestErr);
        }
        let kids = self
            .children(parent)
            .into_iter()
            .filter(|k| !leaving.contains(k))
            .collect::<Vec<_>>();
        let position = child.and_then(|c| kids.iter().position(|&k| k == c));
        let (before, after) = match position {
            Some(pos) => (&kids[..pos], &kids[pos + 1..]),
            None => (&kids[..], &kids[kids.len()..]),
        };
        let is_other = |k: &&NodeId| !replacing || Some(**k) != child;
        let has_element = kids
            .iter()
            .filter(is_other)
            .any(|&k| self.is_type(k, Element));
        let has_doctype = kids
            .iter()
            .filter(is_other)
            .any(|&k| self.is_type(k, DocumentType));
        let doctype_after = position.is_some() && after.iter().any(|&k| self.is_type(k, DocumentType));
        let element_before = position.is_some() && before.iter().any(|&k| self.is_type(k, Element));
        let child_is_doctype = !replacing && child.is_some_and(|c| self.is_type(c, DocumentType));

        let violated = (elements == 1 && (has_element || child_is_doctype || doctype_after))
            || (doctype && (has_doctype || element_before || (child.is_none() && has_element)));
        if violated {
            return Err(DOMException::HierarchyRequestErr);
        }
        Ok(())
    }

    /// Check a whole variadic insertion before anything is moved.
    ///
    /// Several items are gathered into a fragment first, which detaches them
    /// from wherever they are. All of them are validated together here so
    /// that a failure leaves every item in place. `child` is the reference
    /// child the gathered items will be inserted before, or the child they
    /// replace if `replacing`. A single item is inserted as it is, and the
    /// insertion itself validates it.
    pub(crate) fn ensure_items_valid(
        &self,
        parent: NodeId,
        items: &[InsertItem],
        child: Option<NodeId>,
        replacing: bool,
    ) -> Result<(), DOMException> {
        use NodeType::*;

        if items.len() == 1 {
            return Ok(());
        }
        self.check_container(parent, DOMException::HierarchyRequestErr)?;
        if child.is_some_and(|c| self.parent(c) != Some(parent)) {
            return Err(if replacing {
                DOMException::NotFoundErr
            } else {
                DOMException::HierarchyRequestErr
            });
        }

        let mut gathered = vec![];
        let mut leaving = vec![];
        let mut text = false;
        for &item in items {
            let InsertItem::Node(node) = item else {
                text = true;
                continue;
            };
            match self.node_type(node) {
                Document | Attribute | DocumentType => {
                    return Err(DOMException::HierarchyRequestErr);
                }
                // the fragment itself stays where it is, only its children move
                DocumentFragment => {
                    if node != parent && self.is_inclusive_ancestor(node, parent) {
                        return Err(DOMException::HierarchyRequestErr);
                    }
                    gathered.extend(self.children(node));
                }
                _ => {
                    if self.is_inclusive_ancestor(node, parent) {
                        return Err(DOMException::HierarchyRequestErr);
                    }
                    if self.parent(node) == Some(parent) {
                        leaving.push(node);
                    }
                    gathered.push(node);
                }
            }
        }
        if self.node_type(parent) != Document {
            return Ok(());
        }

        gathered.sort_unstable();
        gathered.dedup();
        text |= gathered.iter().any(|&n| self.is_type(n, Text));
        let elements = gathered.iter().filter(|&&n| self.is_type(n, Element)).count();
        self.check_document_slots(parent, elements, false, text, child, replacing, &leaving)
    }

    pub(crate) fn ensure_insert_valid(
        &self,
        parent: NodeId,
        node: NodeId,
        child: Option<NodeId>,
    ) -> Result<(), DOMException> {
        self.check_container(parent, DOMException::HierarchyRequestErr)?;
        if child.is_some_and(|c| self.parent(c) != Some(parent)) {
            return Err(DOMException::HierarchyRequestErr);
        }
        self.check_hierarchy(parent, node, child, false)
    }

    pub(crate) fn ensure_replace_valid(
        &self,
        parent: NodeId,
        node: NodeId,
        child: NodeId,
    ) -> Result<(), DOMException> {
        self.check_container(parent, DOMException::HierarchyRequestErr)?;
        if self.is_inclusive_ancestor(node, parent) {
            return Err(DOMException::HierarchyRequestErr);
        }
        if self.parent(child) != Some(parent) {
            return Err(DOMException::NotFoundErr);
        }
        self.check_hierarchy(parent, node, Some(child), true)
    }

    /// Move `node` into the document `doc`, detaching it from its current
    /// parent first.
    fn adopt_into(&mut self, node: NodeId, doc: Option<NodeId>) {
        if self.parent(node).is_some() {
            self.remove_node(node);
        }
        if let Some(doc) = doc {
            self.set_owner_recursively(node, doc);
        }
    }

    pub(crate) fn adopt_node(&mut self, doc: NodeId, node: NodeId) -> Result<NodeId, DOMException> {
        match self.node_type(node) {
            NodeType::Document => Err(DOMException::NotSupportedErr),
            NodeType::Attribute => Ok(node),
            _ => {
                self.adopt_into(node, Some(doc));
                Ok(node)
            }
        }
    }

    pub(crate) fn insert_before(
        &mut self,
        parent: NodeId,
        node: NodeId,
        child: Option<NodeId>,
    ) -> Result<NodeId, DOMException> {
        self.ensure_insert_valid(parent, node, child)?;
        let child = if child == Some(node) {
            self.next_sibling(node)
        } else {
            child
        };
        let doc = self.node_document(parent);
        self.adopt_into(node, doc);
        self.insert_node(parent, node, child);
        Ok(node)
    }

    pub(crate) fn append_child(&mut self, parent: NodeId, node: NodeId) -> Result<NodeId, DOMException> {
        self.insert_before(parent, node, None)
    }

    /// Detach the children of the fragment `frag` for insertion elsewhere.
    fn take_fragment_children(&mut self, frag: NodeId) -> Vec<NodeId> {
        let kids = self.children(frag);
        for &kid in &kids {
            self.preremove_node_iterators(kid);
        }
        self.unlink_children(frag);
        if !kids.is_empty() {
            self.modify(frag);
        }
        kids
    }

    /// Link the detached `node` (or the children of the fragment `node`) in
    /// front of `before` and notify.
    ///
    /// No validation happens here.
    pub(crate) fn insert_node(&mut self, parent: NodeId, node: NodeId, before: Option<NodeId>) {
        let nodes = if self.is_type(node, NodeType::DocumentFragment) {
            self.take_fragment_children(node)
        } else {
            vec![node]
        };
        if nodes.is_empty() {
            return;
        }
        self.link_many_before(parent, &nodes, before);
        self.modify(parent);
        if self.is_rooted(parent) {
            for node in nodes {
                self.mutate_insert(node);
            }
        }
    }

    /// Remove `node` from its parent with the whole removal bookkeeping.
    pub(crate) fn remove_node(&mut self, node: NodeId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        self.preremove_node_iterators(node);
        if self.is_rooted(node) {
            self.mutate_remove(node);
        }
        self.unlink(node);
        self.modify(parent);
    }

    pub(crate) fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId, DOMException> {
        self.check_container(parent, DOMException::NotFoundErr)?;
        if self.parent(child) != Some(parent) {
            return Err(DOMException::NotFoundErr);
        }
        self.remove_node(child);
        Ok(child)
    }

    pub(crate) fn replace_child(
        &mut self,
        parent: NodeId,
        node: NodeId,
        child: NodeId,
    ) -> Result<NodeId, DOMException> {
        self.ensure_replace_valid(parent, node, child)?;
        if node == child {
            return Ok(child);
        }
        let doc = self.node_document(parent);
        if self.node_document(node) != doc {
            self.adopt_into(node, doc);
        }
        self.replace_node(parent, node, child);
        Ok(child)
    }

    /// Put `node` (or the children of the fragment `node`) where `child` is.
    ///
    /// A node that is rooted in the same document as `parent` is moved
    /// without being uprooted, and reported with a single MOVE record.
    fn replace_node(&mut self, parent: NodeId, node: NodeId, child: NodeId) {
        self.preremove_node_iterators(child);
        if self.is_rooted(child) {
            self.mutate_remove(child);
        }

        // `node` may have been uprooted with `child` just now
        let moved = self.is_rooted(node) && self.is_rooted(parent);
        let nodes = if self.is_type(node, NodeType::DocumentFragment) {
            self.take_fragment_children(node)
        } else {
            if let Some(old_parent) = self.parent(node) {
                if moved {
                    self.preremove_node_iterators(node);
                    self.unlink(node);
                    self.modify(old_parent);
                } else {
                    self.remove_node(node);
                }
            }
            vec![node]
        };

        match nodes.split_first() {
            Some((&first, rest)) => {
                self.replace_link(child, first);
                let next = self.next_sibling(first);
                self.link_many_before(parent, rest, next);
            }
            None => self.unlink(child),
        }
        self.modify(parent);
        if !self.is_rooted(parent) {
            return;
        }
        if moved {
            self.mutate_move(node);
        } else {
            for node in nodes {
                self.mutate_insert(node);
            }
        }
    }

    /// Remove every child of `parent` at once.
    ///
    /// A single REMOVE record lists all of them and the modification clock
    /// advances once.
    pub(crate) fn remove_children(&mut self, parent: NodeId) {
        let kids = self.children(parent);
        if kids.is_empty() {
            return;
        }
        for &kid in &kids {
            self.preremove_node_iterators(kid);
        }
        if self.is_rooted(parent) {
            self.mutate_remove_all(parent, &kids);
        }
        self.unlink_children(parent);
        self.modify(parent);
    }

    /// Copy `node`, and its descendants if `deep`.
    ///
    /// The copy belongs to the same document as `node` and is never rooted,
    /// except for documents, whose clone is a new document.
    pub(crate) fn clone_node(&mut self, node: NodeId, deep: bool) -> NodeId {
        let owner = self.node(node).owner_document;
        let kind = match self.kind(node) {
            NodeKind::Document(data) => {
                let is_html = data.is_html;
                let quirks = data.quirks;
                let address = data.address.clone();
                let content_type = data.content_type.clone();
                let doc = self.create_document(is_html, address, content_type);
                self.document_mut(doc).quirks = quirks;
                if deep {
                    for kid in self.children(node) {
                        let copy = self.clone_node(kid, true);
                        self.set_owner_recursively(copy, doc);
                        self.link_before(doc, copy, None);
                        self.modify(doc);
                        self.mutate_insert(copy);
                    }
                }
                return doc;
            }
            NodeKind::DocumentFragment => NodeKind::DocumentFragment,
            NodeKind::DocumentType(data) => NodeKind::DocumentType(Box::new(DocumentTypeData {
                name: data.name.clone(),
                public_id: data.public_id.clone(),
                system_id: data.system_id.clone(),
            })),
            NodeKind::Element(data) => NodeKind::Element(Box::new(ElementData::new(
                data.local_name.clone(),
                data.namespace_uri.clone(),
                data.prefix.clone(),
            ))),
            NodeKind::Text(data) => NodeKind::Text(data.clone()),
            NodeKind::Comment(data) => NodeKind::Comment(data.clone()),
            NodeKind::ProcessingInstruction(data) => {
                NodeKind::ProcessingInstruction(Box::new(ProcessingInstructionData {
                    target: data.target.clone(),
                    data: data.data.clone(),
                }))
            }
            NodeKind::Attribute(data) => NodeKind::Attribute(Box::new(AttrData::new(
                data.local_name.clone(),
                data.namespace_uri.clone(),
                data.prefix.clone(),
                data.value.clone(),
            ))),
        };
        let copy = self.alloc(kind, owner);
        if self.is_element(copy) {
            self.clone_attributes(node, copy);
        }
        if deep {
            let kids = self
                .children(node)
                .into_iter()
                .map(|kid| self.clone_node(kid, true))
                .collect::<Vec<_>>();
            self.link_many_before(copy, &kids, None);
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::position::is_equal_node;

    fn document() -> (Tree, NodeId) {
        let mut tree = Tree::new();
        let doc = tree.create_document(false, "about:blank".into(), "application/xml".into());
        (tree, doc)
    }

    fn element(tree: &mut Tree, doc: NodeId, name: &str) -> NodeId {
        let data = ElementData::new(name.into(), None, None);
        tree.alloc(NodeKind::Element(Box::new(data)), Some(doc))
    }

    #[test]
    fn document_children_constraints() {
        let (mut tree, doc) = document();
        let root = element(&mut tree, doc, "root");
        tree.append_child(doc, root).unwrap();

        let second = element(&mut tree, doc, "second");
        assert_eq!(tree.append_child(doc, second), Err(DOMException::HierarchyRequestErr));

        let text = tree.alloc(NodeKind::Text("t".into()), Some(doc));
        assert_eq!(tree.append_child(doc, text), Err(DOMException::HierarchyRequestErr));

        let doctype = tree.alloc(
            NodeKind::DocumentType(Box::new(DocumentTypeData {
                name: "root".into(),
                public_id: "".into(),
                system_id: "".into(),
            })),
            Some(doc),
        );
        // a doctype must come before the element
        assert_eq!(tree.append_child(doc, doctype), Err(DOMException::HierarchyRequestErr));
        tree.insert_before(doc, doctype, Some(root)).unwrap();
        assert_eq!(tree.children(doc), [doctype, root]);

        // replacing the element by another element is fine
        assert_eq!(tree.replace_child(doc, second, root), Ok(root));
        assert_eq!(tree.children(doc), [doctype, second]);
        assert!(tree.is_rooted(second));
        assert!(!tree.is_rooted(root));
    }

    #[test]
    fn cycles_are_rejected() {
        let (mut tree, doc) = document();
        let a = element(&mut tree, doc, "a");
        let b = element(&mut tree, doc, "b");
        tree.append_child(a, b).unwrap();
        assert_eq!(tree.append_child(b, a), Err(DOMException::HierarchyRequestErr));
        assert_eq!(tree.append_child(a, a), Err(DOMException::HierarchyRequestErr));
        assert_eq!(tree.children(a), [b]);
    }

    #[test]
    fn item_lists_are_checked_as_a_whole() {
        let (mut tree, doc) = document();
        let root = element(&mut tree, doc, "root");
        tree.append_child(doc, root).unwrap();
        let a = element(&mut tree, doc, "a");
        let b = element(&mut tree, doc, "b");
        tree.append_child(root, a).unwrap();
        tree.append_child(root, b).unwrap();
        let comment = tree.alloc(NodeKind::Comment("c".into()), Some(doc));

        use InsertItem::{Node, Text};
        // a single item is left to the insertion itself
        assert_eq!(tree.ensure_items_valid(a, &[Node(doc)], None, false), Ok(()));
        assert_eq!(
            tree.ensure_items_valid(b, &[Node(a), Node(root)], None, false),
            Err(DOMException::HierarchyRequestErr)
        );
        assert_eq!(
            tree.ensure_items_valid(root, &[Node(a), Node(doc)], None, false),
            Err(DOMException::HierarchyRequestErr)
        );
        assert_eq!(tree.ensure_items_valid(root, &[Node(a), Text], Some(b), false), Ok(()));
        assert_eq!(
            tree.ensure_items_valid(root, &[Node(a), Text], Some(comment), false),
            Err(DOMException::HierarchyRequestErr)
        );

        // document children: one element, no text
        assert_eq!(
            tree.ensure_items_valid(doc, &[Node(comment), Node(a)], None, false),
            Err(DOMException::HierarchyRequestErr)
        );
        assert_eq!(
            tree.ensure_items_valid(doc, &[Node(comment), Node(a)], Some(root), true),
            Ok(())
        );
        assert_eq!(
            tree.ensure_items_valid(doc, &[Node(comment), Node(root)], None, false),
            Ok(())
        );
        assert_eq!(
            tree.ensure_items_valid(doc, &[Node(comment), Text], Some(root), true),
            Err(DOMException::HierarchyRequestErr)
        );
        assert_eq!(tree.children(root), [a, b]);
    }

    #[test]
    fn fragments_are_emptied() {
        let (mut tree, doc) = document();
        let root = element(&mut tree, doc, "root");
        tree.append_child(doc, root).unwrap();
        let x = element(&mut tree, doc, "x");
        tree.append_child(root, x).unwrap();

        let frag = tree.alloc(NodeKind::DocumentFragment, Some(doc));
        let kids: Vec<_> = ["a", "b", "c"].iter().map(|n| element(&mut tree, doc, n)).collect();
        for &kid in &kids {
            tree.append_child(frag, kid).unwrap();
        }
        tree.insert_before(root, frag, Some(x)).unwrap();
        assert!(!tree.has_children(frag));
        assert_eq!(tree.children(root), [kids[0], kids[1], kids[2], x]);
        assert!(kids.iter().all(|&k| tree.is_rooted(k)));
    }

    #[test]
    fn replace_with_descendant_of_replaced() {
        let (mut tree, doc) = document();
        let root = element(&mut tree, doc, "root");
        tree.append_child(doc, root).unwrap();
        let old = element(&mut tree, doc, "old");
        let inner = element(&mut tree, doc, "inner");
        tree.append_child(root, old).unwrap();
        tree.append_child(old, inner).unwrap();

        tree.replace_child(root, inner, old).unwrap();
        assert_eq!(tree.children(root), [inner]);
        assert!(!tree.has_children(old));
        assert!(tree.is_rooted(inner));
        assert!(!tree.is_rooted(old));
    }

    #[test]
    fn leaf_parents() {
        let (mut tree, doc) = document();
        let text = tree.alloc(NodeKind::Text("t".into()), Some(doc));
        let elem = element(&mut tree, doc, "e");
        assert_eq!(tree.append_child(text, elem), Err(DOMException::HierarchyRequestErr));
        assert_eq!(tree.replace_child(text, elem, elem), Err(DOMException::HierarchyRequestErr));
        assert_eq!(tree.remove_child(text, elem), Err(DOMException::NotFoundErr));
    }

    #[test]
    fn deep_clone_is_detached_copy() {
        let (mut tree, doc) = document();
        let root = element(&mut tree, doc, "root");
        tree.append_child(doc, root).unwrap();
        tree.set_attribute_raw(root, "id", "r");
        let child = tree.alloc(NodeKind::Text("hi".into()), Some(doc));
        tree.append_child(root, child).unwrap();

        let copy = tree.clone_node(root, true);
        assert!(is_equal_node(&tree, root, &tree, copy));
        assert!(!tree.is_rooted(copy));
        assert_ne!(tree.attribute_at(root, 0), tree.attribute_at(copy, 0));
        assert_eq!(tree.get_element_by_id(doc, "r"), Some(root));

        let shallow = tree.clone_node(root, false);
        assert!(!tree.has_children(shallow));
    }
}

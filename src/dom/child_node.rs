//! The `ParentNode`, `NonDocumentTypeChildNode` and `ChildNode` mixins.

use crate::tree::{NodeId, Tree, mutation::InsertItem, node::NodeKind};

use super::{
    DOMException,
    character_data::{CommentRef, TextRef},
    document::DocumentRef,
    document_fragment::DocumentFragmentRef,
    document_type::DocumentTypeRef,
    element::ElementRef,
    node::{Node, NodeConnection, NodeHandle, NodeRef},
    node_list::{ElementFilter, HTMLCollection, StaticNodeList},
    pi::ProcessingInstructionRef,
    select::SelectorEngine,
};

/// An argument of the variadic mixin methods: a node, or a string that
/// becomes a Text node.
#[derive(Debug, Clone)]
pub enum NodeOrString {
    Node(NodeRef),
    String(String),
}

impl From<NodeRef> for NodeOrString {
    fn from(node: NodeRef) -> Self {
        NodeOrString::Node(node)
    }
}

impl From<&str> for NodeOrString {
    fn from(text: &str) -> Self {
        NodeOrString::String(text.to_owned())
    }
}

impl From<String> for NodeOrString {
    fn from(text: String) -> Self {
        NodeOrString::String(text)
    }
}

macro_rules! impl_node_or_string_from {
    ( $( $t:ty ),* ) => {
        $(
            impl From<$t> for NodeOrString {
                fn from(node: $t) -> Self {
                    NodeOrString::Node(node.into())
                }
            }
        )*
    };
}

impl_node_or_string_from!(
    ElementRef,
    TextRef,
    CommentRef,
    ProcessingInstructionRef,
    DocumentTypeRef,
    DocumentFragmentRef
);

/// Check that every node of `nodes` lives in the arena of `context`.
fn check_nodes(context: &NodeHandle, nodes: &[NodeOrString]) -> Result<(), DOMException> {
    for node in nodes {
        if let NodeOrString::Node(node) = node {
            context.check_arena(node.handle())?;
        }
    }
    Ok(())
}

fn node_ids(nodes: &[NodeOrString]) -> Vec<NodeId> {
    nodes
        .iter()
        .filter_map(|node| match node {
            NodeOrString::Node(node) => Some(node.node_id()),
            NodeOrString::String(_) => None,
        })
        .collect()
}

fn insert_items(nodes: &[NodeOrString]) -> Vec<InsertItem> {
    nodes
        .iter()
        .map(|node| match node {
            NodeOrString::Node(node) => InsertItem::Node(node.node_id()),
            NodeOrString::String(_) => InsertItem::Text,
        })
        .collect()
}

/// The first node of `from` and its following siblings that is not one of
/// `excluded`.
fn first_not_in(tree: &Tree, from: Option<NodeId>, excluded: &[NodeId]) -> Option<NodeId> {
    std::iter::successors(from, |&n| tree.next_sibling(n)).find(|n| !excluded.contains(n))
}

/// Implementation of "convert nodes into a node".
///
/// A single node is returned as is, anything else is gathered into a new
/// fragment owned by `doc`.
fn convert_nodes(tree: &mut Tree, doc: Option<NodeId>, nodes: &[NodeOrString]) -> Result<NodeId, DOMException> {
    let mut ids = nodes
        .iter()
        .map(|node| match node {
            NodeOrString::Node(node) => node.node_id(),
            NodeOrString::String(text) => tree.alloc(NodeKind::Text(text.clone()), doc),
        })
        .collect::<Vec<_>>();
    if ids.len() == 1 {
        return Ok(ids.remove(0));
    }
    let frag = tree.alloc(NodeKind::DocumentFragment, doc);
    for id in ids {
        tree.append_child(frag, id)?;
    }
    Ok(frag)
}

/// Implementation of [ParentNode](https://dom.spec.whatwg.org/#interface-parentnode) mixin.
///
/// Implemented for [`ElementRef`], [`DocumentRef`] and [`DocumentFragmentRef`].
pub trait ParentNode: Node {
    /// Implementation of [`children`](https://dom.spec.whatwg.org/#dom-parentnode-children) attribute.
    fn children(&self) -> HTMLCollection {
        HTMLCollection::new(self.handle().clone(), ElementFilter::Children)
    }

    /// Implementation of [`firstElementChild`](https://dom.spec.whatwg.org/#dom-parentnode-firstelementchild) attribute.
    fn first_element_child(&self) -> Option<ElementRef> {
        let child = {
            let tree = self.tree();
            std::iter::successors(tree.first_child(self.node_id()), |&n| tree.next_sibling(n))
                .find(|&n| tree.is_element(n))
        };
        Some(ElementRef(self.handle().with_id(child?)))
    }

    /// Implementation of [`lastElementChild`](https://dom.spec.whatwg.org/#dom-parentnode-lastelementchild) attribute.
    fn last_element_child(&self) -> Option<ElementRef> {
        let child = {
            let tree = self.tree();
            std::iter::successors(tree.last_child(self.node_id()), |&n| tree.previous_sibling(n))
                .find(|&n| tree.is_element(n))
        };
        Some(ElementRef(self.handle().with_id(child?)))
    }

    /// Implementation of [`childElementCount`](https://dom.spec.whatwg.org/#dom-parentnode-childelementcount) attribute.
    fn child_element_count(&self) -> usize {
        let tree = self.tree();
        tree.children(self.node_id())
            .into_iter()
            .filter(|&n| tree.is_element(n))
            .count()
    }

    /// Implementation of [`prepend`](https://dom.spec.whatwg.org/#dom-parentnode-prepend) method.
    ///
    /// # Specification
    /// ```text
    /// The prepend(nodes) method steps are:
    ///
    /// 1. Let node be the result of converting nodes into a node given nodes and this's
    ///    node document.
    /// 2. Pre-insert node into this before this's first child.
    /// ```
    fn prepend(&self, nodes: Vec<NodeOrString>) -> Result<(), DOMException> {
        check_nodes(self.handle(), &nodes)?;
        let excluded = node_ids(&nodes);
        self.handle().mutate(|tree, id| {
            let first = first_not_in(tree, tree.first_child(id), &excluded);
            tree.ensure_items_valid(id, &insert_items(&nodes), first, false)?;
            let doc = tree.node_document(id);
            let node = convert_nodes(tree, doc, &nodes)?;
            let first = tree.first_child(id);
            tree.insert_before(id, node, first)?;
            Ok(())
        })
    }

    /// Implementation of [`append`](https://dom.spec.whatwg.org/#dom-parentnode-append) method.
    fn append(&self, nodes: Vec<NodeOrString>) -> Result<(), DOMException> {
        check_nodes(self.handle(), &nodes)?;
        self.handle().mutate(|tree, id| {
            tree.ensure_items_valid(id, &insert_items(&nodes), None, false)?;
            let doc = tree.node_document(id);
            let node = convert_nodes(tree, doc, &nodes)?;
            tree.append_child(id, node)?;
            Ok(())
        })
    }

    /// Implementation of [`replaceChildren`](https://dom.spec.whatwg.org/#dom-parentnode-replacechildren) method.
    ///
    /// # Specification
    /// ```text
    /// The replaceChildren(nodes) method steps are:
    ///
    /// 1. Let node be the result of converting nodes into a node given nodes and this's
    ///    node document.
    /// 2. Ensure pre-insertion validity of node into this before null.
    /// 3. Replace all with node within this.
    /// ```
    fn replace_children(&self, nodes: Vec<NodeOrString>) -> Result<(), DOMException> {
        check_nodes(self.handle(), &nodes)?;
        self.handle().mutate(|tree, id| {
            tree.ensure_items_valid(id, &insert_items(&nodes), None, false)?;
            let doc = tree.node_document(id);
            let node = convert_nodes(tree, doc, &nodes)?;
            tree.ensure_insert_valid(id, node, None)?;
            tree.remove_children(id);
            tree.insert_before(id, node, None)?;
            Ok(())
        })
    }

    /// Implementation of [`querySelector`](https://dom.spec.whatwg.org/#dom-parentnode-queryselector) method.
    fn query_selector(
        &self,
        engine: &dyn SelectorEngine,
        selectors: &str,
    ) -> Result<Option<ElementRef>, DOMException> {
        let root: NodeRef = self.clone().into();
        Ok(engine.select(selectors, &root)?.into_iter().next())
    }

    /// Implementation of [`querySelectorAll`](https://dom.spec.whatwg.org/#dom-parentnode-queryselectorall) method.
    ///
    /// The result is a snapshot.
    fn query_selector_all(
        &self,
        engine: &dyn SelectorEngine,
        selectors: &str,
    ) -> Result<StaticNodeList<ElementRef>, DOMException> {
        let root: NodeRef = self.clone().into();
        Ok(StaticNodeList::new(engine.select(selectors, &root)?))
    }
}

impl ParentNode for ElementRef {}
impl ParentNode for DocumentRef {}
impl ParentNode for DocumentFragmentRef {}

/// Implementation of [NonDocumentTypeChildNode](https://dom.spec.whatwg.org/#interface-nondocumenttypechildnode) mixin.
pub trait NonDocumentTypeChildNode: Node {
    /// Implementation of [`previousElementSibling`](https://dom.spec.whatwg.org/#dom-nondocumenttypechildnode-previouselementsibling) attribute.
    fn previous_element_sibling(&self) -> Option<ElementRef> {
        let sibling = {
            let tree = self.tree();
            std::iter::successors(tree.previous_sibling(self.node_id()), |&n| {
                tree.previous_sibling(n)
            })
            .find(|&n| tree.is_element(n))
        };
        Some(ElementRef(self.handle().with_id(sibling?)))
    }

    /// Implementation of [`nextElementSibling`](https://dom.spec.whatwg.org/#dom-nondocumenttypechildnode-nextelementsibling) attribute.
    fn next_element_sibling(&self) -> Option<ElementRef> {
        let sibling = {
            let tree = self.tree();
            std::iter::successors(tree.next_sibling(self.node_id()), |&n| tree.next_sibling(n))
                .find(|&n| tree.is_element(n))
        };
        Some(ElementRef(self.handle().with_id(sibling?)))
    }
}

impl NonDocumentTypeChildNode for ElementRef {}
impl NonDocumentTypeChildNode for TextRef {}
impl NonDocumentTypeChildNode for CommentRef {}
impl NonDocumentTypeChildNode for ProcessingInstructionRef {}

/// Implementation of [ChildNode](https://dom.spec.whatwg.org/#interface-childnode) mixin.
///
/// Every method is a no-op for a node without a parent.
pub trait ChildNode: Node {
    /// Implementation of [`before`](https://dom.spec.whatwg.org/#dom-childnode-before) method.
    ///
    /// # Specification
    /// ```text
    /// The before(nodes) method steps are:
    ///
    /// 1. Let parent be this's parent.
    /// 2. If parent is null, then return.
    /// 3. Let viablePreviousSibling be this's first preceding sibling not in nodes;
    ///    otherwise null.
    /// 4. Let node be the result of converting nodes into a node, given nodes and this's
    ///    node document.
    /// 5. If viablePreviousSibling is null, then set it to parent's first child;
    ///    otherwise to viablePreviousSibling's next sibling.
    /// 6. Pre-insert node into parent before viablePreviousSibling.
    /// ```
    fn before(&self, nodes: Vec<NodeOrString>) -> Result<(), DOMException> {
        check_nodes(self.handle(), &nodes)?;
        let excluded = node_ids(&nodes);
        self.handle().mutate(|tree, id| {
            let Some(parent) = tree.parent(id) else {
                return Ok(());
            };
            let viable = std::iter::successors(tree.previous_sibling(id), |&n| tree.previous_sibling(n))
                .find(|n| !excluded.contains(n));
            let from = match viable {
                Some(viable) => tree.next_sibling(viable),
                None => tree.first_child(parent),
            };
            let child = first_not_in(tree, from, &excluded);
            tree.ensure_items_valid(parent, &insert_items(&nodes), child, false)?;
            let doc = tree.node_document(id);
            let node = convert_nodes(tree, doc, &nodes)?;
            let before = match viable {
                Some(viable) => tree.next_sibling(viable),
                None => tree.first_child(parent),
            };
            tree.insert_before(parent, node, before)?;
            Ok(())
        })
    }

    /// Implementation of [`after`](https://dom.spec.whatwg.org/#dom-childnode-after) method.
    fn after(&self, nodes: Vec<NodeOrString>) -> Result<(), DOMException> {
        check_nodes(self.handle(), &nodes)?;
        let excluded = node_ids(&nodes);
        self.handle().mutate(|tree, id| {
            let Some(parent) = tree.parent(id) else {
                return Ok(());
            };
            let viable = first_not_in(tree, tree.next_sibling(id), &excluded);
            tree.ensure_items_valid(parent, &insert_items(&nodes), viable, false)?;
            let doc = tree.node_document(id);
            let node = convert_nodes(tree, doc, &nodes)?;
            tree.insert_before(parent, node, viable)?;
            Ok(())
        })
    }

    /// Implementation of [`replaceWith`](https://dom.spec.whatwg.org/#dom-childnode-replacewith) method.
    ///
    /// # Specification
    /// ```text
    /// The replaceWith(nodes) method steps are:
    ///
    /// 1. Let parent be this's parent.
    /// 2. If parent is null, then return.
    /// 3. Let viableNextSibling be this's first following sibling not in nodes;
    ///    otherwise null.
    /// 4. Let node be the result of converting nodes into a node, given nodes and this's
    ///    node document.
    /// 5. If this's parent is parent, replace this with node within parent.
    /// 6. Otherwise, pre-insert node into parent before viableNextSibling.
    /// ```
    fn replace_with(&self, nodes: Vec<NodeOrString>) -> Result<(), DOMException> {
        check_nodes(self.handle(), &nodes)?;
        let excluded = node_ids(&nodes);
        self.handle().mutate(|tree, id| {
            let Some(parent) = tree.parent(id) else {
                return Ok(());
            };
            let viable = first_not_in(tree, tree.next_sibling(id), &excluded);
            let items = insert_items(&nodes);
            if excluded.contains(&id) {
                tree.ensure_items_valid(parent, &items, viable, false)?;
            } else {
                tree.ensure_items_valid(parent, &items, Some(id), true)?;
            }
            let doc = tree.node_document(id);
            let node = convert_nodes(tree, doc, &nodes)?;
            if tree.parent(id) == Some(parent) {
                tree.replace_child(parent, node, id)?;
            } else {
                tree.insert_before(parent, node, viable)?;
            }
            Ok(())
        })
    }

    /// Implementation of [`remove`](https://dom.spec.whatwg.org/#dom-childnode-remove) method.
    fn remove(&self) {
        self.handle().mutate(|tree, id| tree.remove_node(id))
    }
}

impl ChildNode for ElementRef {}
impl ChildNode for TextRef {}
impl ChildNode for CommentRef {}
impl ChildNode for ProcessingInstructionRef {}
impl ChildNode for DocumentTypeRef {}

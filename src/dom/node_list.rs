use std::{cell::RefCell, rc::Rc};

use crate::tree::{NodeId, Tree};

use super::{
    HTML_NAMESPACE,
    element::ElementRef,
    node::{Node, NodeHandle, NodeRef},
};

/// Implementation of [NodeList](https://dom.spec.whatwg.org/#interface-nodelist) interface.
///
/// # Specification
/// ```text
/// A NodeList object is a collection of nodes.
///
/// collection . length
///     Returns the number of nodes in the collection.
/// element = collection . item(index)
///     Returns the node with index index from the collection. The nodes are sorted
///     in tree order.
/// ```
pub trait NodeList {
    type Output: Node;

    /// Implementation of [`item`](https://dom.spec.whatwg.org/#dom-nodelist-item) method.
    fn item(&self, index: usize) -> Option<Self::Output>;
    /// Implementation of [`length`](https://dom.spec.whatwg.org/#dom-nodelist-length) attribute.
    fn length(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.length() == 0
    }

    /// Copy the current content of the list.
    fn to_vec(&self) -> Vec<Self::Output> {
        (0..self.length()).filter_map(|i| self.item(i)).collect()
    }
}

/// A live [NodeList] that [Node::child_nodes] returns.
///
/// The parent is kept in indexed mode, so both [`item`](ChildNodes::item) and
/// [`length`](ChildNodes::length) are constant time.
pub struct ChildNodes {
    parent: NodeHandle,
}

impl ChildNodes {
    pub(super) fn new(parent: NodeHandle) -> Self {
        Self { parent }
    }
}

impl NodeList for ChildNodes {
    type Output = NodeRef;

    fn item(&self, index: usize) -> Option<Self::Output> {
        let child = self.parent.tree().child_at(self.parent.id(), index)?;
        Some(self.parent.wrap(child))
    }

    fn length(&self) -> usize {
        self.parent.tree().child_count(self.parent.id())
    }
}

/// A snapshot that does not follow later mutations.
#[derive(Debug, Clone)]
pub struct StaticNodeList<N: Node> {
    nodes: Vec<N>,
}

impl<N: Node> StaticNodeList<N> {
    pub(super) fn new(nodes: Vec<N>) -> Self {
        Self { nodes }
    }

    pub fn iter(&self) -> impl Iterator<Item = &N> {
        self.nodes.iter()
    }
}

impl<N: Node> NodeList for StaticNodeList<N> {
    type Output = N;

    fn item(&self, index: usize) -> Option<Self::Output> {
        self.nodes.get(index).cloned()
    }

    fn length(&self) -> usize {
        self.nodes.len()
    }
}

/// The elements an [`HTMLCollection`] is made of.
#[derive(Debug, Clone)]
pub(crate) enum ElementFilter {
    /// Element children of the root.
    Children,
    /// Descendants by qualified name. `lower` is used for HTML elements in
    /// HTML documents.
    TagName { name: Rc<str>, lower: Rc<str> },
    /// Descendants by namespace and local name. `None` in either position is
    /// the `"*"` wildcard.
    TagNameNS {
        namespace: Option<Option<Rc<str>>>,
        local_name: Option<Rc<str>>,
    },
    /// Descendants carrying every one of the class names.
    ClassNames(Rc<[Rc<str>]>),
    /// Descendants whose `name` attribute is the value.
    Name(Rc<str>),
}

impl ElementFilter {
    pub(crate) fn tag_name(qname: &str) -> Self {
        ElementFilter::TagName {
            name: qname.into(),
            lower: qname.to_ascii_lowercase().into(),
        }
    }

    pub(crate) fn tag_name_ns(namespace: Option<&str>, local_name: &str) -> Self {
        let namespace = match namespace {
            Some("*") => None,
            Some("") | None => Some(None),
            Some(ns) => Some(Some(ns.into())),
        };
        let local_name = (local_name != "*").then(|| local_name.into());
        ElementFilter::TagNameNS {
            namespace,
            local_name,
        }
    }

    fn matches(&self, tree: &Tree, elem: NodeId) -> bool {
        let Some(data) = tree.element(elem) else {
            return false;
        };
        match self {
            ElementFilter::Children => true,
            ElementFilter::TagName { name, .. } if &**name == "*" => true,
            ElementFilter::TagName { name, lower } => {
                if tree.is_html_element(elem) {
                    data.qualified_name == *lower
                } else {
                    data.qualified_name == *name
                }
            }
            ElementFilter::TagNameNS {
                namespace,
                local_name,
            } => {
                namespace.as_ref().is_none_or(|ns| *ns == data.namespace_uri)
                    && local_name.as_ref().is_none_or(|local| *local == data.local_name)
            }
            ElementFilter::ClassNames(names) => {
                if names.is_empty() {
                    return false;
                }
                let tokens = tree.class_tokens(elem);
                let quirks = tree
                    .node_document(elem)
                    .is_some_and(|doc| tree.document(doc).quirks);
                names.iter().all(|name| {
                    tokens.iter().any(|token| {
                        if quirks {
                            token.eq_ignore_ascii_case(name)
                        } else {
                            token == name
                        }
                    })
                })
            }
            ElementFilter::Name(name) => data
                .attributes
                .find_ns(None, "name")
                .and_then(|attr| tree.attr_value(attr))
                .is_some_and(|value| value == &**name),
        }
    }
}

/// Implementation of [HTMLCollection](https://dom.spec.whatwg.org/#interface-htmlcollection) interface.
///
/// The collection is live. Its content is recomputed on access after the
/// subtree of its root has been modified, and cached otherwise.
pub struct HTMLCollection {
    root: NodeHandle,
    filter: ElementFilter,
    /// Root modification time and owner document the cached ids are valid for.
    cache: RefCell<Option<(u64, Option<NodeId>, Rc<[NodeId]>)>>,
}

impl HTMLCollection {
    pub(crate) fn new(root: NodeHandle, filter: ElementFilter) -> Self {
        Self {
            root,
            filter,
            cache: RefCell::new(None),
        }
    }

    fn elements(&self) -> Rc<[NodeId]> {
        let tree = self.root.tree();
        let root = self.root.id();
        let time = tree.last_mod_time(root);
        let doc = tree.node_document(root);
        if let Some((t, d, elements)) = &*self.cache.borrow() {
            if *t == time && *d == doc {
                return elements.clone();
            }
        }

        let elements: Rc<[NodeId]> = match self.filter {
            ElementFilter::Children => tree
                .children(root)
                .into_iter()
                .filter(|&n| tree.is_element(n))
                .collect(),
            _ => tree
                .inclusive_descendants(root)
                .into_iter()
                .skip(1)
                .filter(|&n| self.filter.matches(&tree, n))
                .collect(),
        };
        *self.cache.borrow_mut() = Some((time, doc, elements.clone()));
        elements
    }

    /// Implementation of [`namedItem`](https://dom.spec.whatwg.org/#dom-htmlcollection-nameditem) method.
    ///
    /// # Specification
    /// ```text
    /// element = collection . namedItem(key)
    ///     Returns the first element with ID or name key from the collection.
    /// ```
    pub fn named_item(&self, key: &str) -> Option<ElementRef> {
        if key.is_empty() {
            return None;
        }
        let found = {
            let tree = self.root.tree();
            self.elements().iter().copied().find(|&elem| {
                let Some(data) = tree.element(elem) else {
                    return false;
                };
                let attr = |name| {
                    data.attributes
                        .find_ns(None, name)
                        .and_then(|attr| tree.attr_value(attr))
                        .is_some_and(|value| value == key)
                };
                attr("id") || (data.namespace_uri.as_deref() == Some(HTML_NAMESPACE) && attr("name"))
            })
        };
        Some(ElementRef(self.root.with_id(found?)))
    }
}

impl NodeList for HTMLCollection {
    type Output = ElementRef;

    fn item(&self, index: usize) -> Option<Self::Output> {
        let elem = *self.elements().get(index)?;
        Some(ElementRef(self.root.with_id(elem)))
    }

    fn length(&self) -> usize {
        self.elements().len()
    }
}

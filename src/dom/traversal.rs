//! Implementation of [Traversal](https://dom.spec.whatwg.org/#traversal):
//! `NodeIterator` and `TreeWalker`.
//!
//! Filters run while the arena is not borrowed, so they may inspect or modify
//! the tree. A filter calling back into the cursor that invoked it gets
//! `InvalidStateErr`.

use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

use crate::tree::{NodeId, Tree, document::NodeIteratorState};

use super::{
    DOMException,
    node::{NodeConnection, NodeHandle, NodeRef},
};

pub const SHOW_ALL: u32 = 0xFFFF_FFFF;
pub const SHOW_ELEMENT: u32 = 0x1;
pub const SHOW_ATTRIBUTE: u32 = 0x2;
pub const SHOW_TEXT: u32 = 0x4;
pub const SHOW_PROCESSING_INSTRUCTION: u32 = 0x40;
pub const SHOW_COMMENT: u32 = 0x80;
pub const SHOW_DOCUMENT: u32 = 0x100;
pub const SHOW_DOCUMENT_TYPE: u32 = 0x200;
pub const SHOW_DOCUMENT_FRAGMENT: u32 = 0x400;

/// Return values of a [`NodeFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterResult {
    Accept = 1,
    /// Skip the node and, for a `TreeWalker`, its descendants.
    Reject = 2,
    /// Skip the node but not its descendants.
    Skip = 3,
}

/// Implementation of [NodeFilter](https://dom.spec.whatwg.org/#callbackdef-nodefilter) callback.
pub type NodeFilter = Rc<dyn Fn(&NodeRef) -> FilterResult>;

/// State shared by both kinds of cursors.
struct Traversal {
    root: NodeRef,
    what_to_show: u32,
    filter: Option<NodeFilter>,
    active: Cell<bool>,
}

impl Traversal {
    fn new(root: NodeRef, what_to_show: u32, filter: Option<NodeFilter>) -> Self {
        Self {
            root,
            what_to_show,
            filter,
            active: Cell::new(false),
        }
    }

    fn root_id(&self) -> NodeId {
        self.root.node_id()
    }

    fn nav(&self, id: NodeId, f: impl FnOnce(&Tree, NodeId) -> Option<NodeId>) -> Option<NodeId> {
        f(&self.root.tree(), id)
    }

    fn wrap(&self, id: NodeId) -> NodeRef {
        self.root.handle().wrap(id)
    }

    /// Implementation of [filter](https://dom.spec.whatwg.org/#concept-node-filter) algorithm.
    ///
    /// # Specification
    /// ```text
    /// 1. If traverser's active flag is set, then throw an "InvalidStateError"
    ///    DOMException.
    /// 2. Let n be node's nodeType attribute value − 1.
    /// 3. If the nth bit (where 0 is the least significant bit) of traverser's
    ///    whatToShow is not set, then return FILTER_SKIP.
    /// 4. If traverser's filter is null, then return FILTER_ACCEPT.
    /// 5. Set traverser's active flag.
    /// 6. Let result be the return value of call a user object's operation with
    ///    traverser's filter, "acceptNode", and « node ».
    /// 7. Unset traverser's active flag.
    /// 8. Return result.
    /// ```
    fn filter(&self, id: NodeId) -> Result<FilterResult, DOMException> {
        if self.active.get() {
            return Err(DOMException::InvalidStateErr);
        }
        let n = self.root.tree().node_type(id) as u32 - 1;
        if self.what_to_show & (1 << n) == 0 {
            return Ok(FilterResult::Skip);
        }
        let Some(filter) = self.filter.as_ref() else {
            return Ok(FilterResult::Accept);
        };
        self.active.set(true);
        let res = filter(&self.wrap(id));
        self.active.set(false);
        Ok(res)
    }
}

/// Implementation of [NodeIterator](https://dom.spec.whatwg.org/#interface-nodeiterator) interface.
///
/// The iterator is registered with the arena of its root, which moves its
/// reference node out of any subtree that is about to be removed. The
/// registration follows the root when it is adopted into another document.
#[derive(Clone)]
pub struct NodeIterator {
    traversal: Rc<Traversal>,
    state: Rc<RefCell<NodeIteratorState>>,
}

impl NodeIterator {
    pub(crate) fn new(root: NodeRef, what_to_show: u32, filter: Option<NodeFilter>) -> Self {
        let id = root.node_id();
        let state = Rc::new(RefCell::new(NodeIteratorState {
            root: id,
            reference: id,
            pointer_before_reference: true,
        }));
        root.handle().arena().borrow_mut().register_node_iterator(&state);
        Self {
            traversal: Rc::new(Traversal::new(root, what_to_show, filter)),
            state,
        }
    }

    /// Implementation of [`root`](https://dom.spec.whatwg.org/#dom-nodeiterator-root) attribute.
    pub fn root(&self) -> NodeRef {
        self.traversal.root.clone()
    }

    /// Implementation of [`referenceNode`](https://dom.spec.whatwg.org/#dom-nodeiterator-referencenode) attribute.
    pub fn reference_node(&self) -> NodeRef {
        let reference = self.state.borrow().reference;
        self.traversal.wrap(reference)
    }

    /// Implementation of [`pointerBeforeReferenceNode`](https://dom.spec.whatwg.org/#dom-nodeiterator-pointerbeforereferencenode) attribute.
    pub fn pointer_before_reference_node(&self) -> bool {
        self.state.borrow().pointer_before_reference
    }

    /// Implementation of [`whatToShow`](https://dom.spec.whatwg.org/#dom-nodeiterator-whattoshow) attribute.
    pub fn what_to_show(&self) -> u32 {
        self.traversal.what_to_show
    }

    /// Implementation of [`filter`](https://dom.spec.whatwg.org/#dom-nodeiterator-filter) attribute.
    pub fn filter(&self) -> Option<NodeFilter> {
        self.traversal.filter.clone()
    }

    /// Implementation of [`traverse`](https://dom.spec.whatwg.org/#concept-nodeiterator-traverse) algorithm.
    fn traverse(&self, forward: bool) -> Result<Option<NodeRef>, DOMException> {
        let root = self.traversal.root_id();
        let (mut node, mut before) = {
            let state = self.state.borrow();
            (state.reference, state.pointer_before_reference)
        };
        loop {
            if forward {
                if before {
                    before = false;
                } else {
                    match self.traversal.nav(node, |tree, n| tree.following(n, root)) {
                        Some(next) => node = next,
                        None => return Ok(None),
                    }
                }
            } else if !before {
                before = true;
            } else {
                match self.traversal.nav(node, |tree, n| tree.preceding(n, root)) {
                    Some(prev) => node = prev,
                    None => return Ok(None),
                }
            }
            if self.traversal.filter(node)? == FilterResult::Accept {
                break;
            }
        }
        let mut state = self.state.borrow_mut();
        state.reference = node;
        state.pointer_before_reference = before;
        Ok(Some(self.traversal.wrap(node)))
    }

    /// Implementation of [`nextNode`](https://dom.spec.whatwg.org/#dom-nodeiterator-nextnode) method.
    pub fn next_node(&self) -> Result<Option<NodeRef>, DOMException> {
        self.traverse(true)
    }

    /// Implementation of [`previousNode`](https://dom.spec.whatwg.org/#dom-nodeiterator-previousnode) method.
    pub fn previous_node(&self) -> Result<Option<NodeRef>, DOMException> {
        self.traverse(false)
    }

    /// Implementation of [`detach`](https://dom.spec.whatwg.org/#dom-nodeiterator-detach) method.
    ///
    /// This does nothing. The registration with the arena is dropped
    /// together with the last clone of this iterator.
    pub fn detach(&self) {}
}

impl fmt::Debug for NodeIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeIterator")
            .field("root", &self.traversal.root)
            .field("state", &*self.state.borrow())
            .finish()
    }
}

/// Implementation of [TreeWalker](https://dom.spec.whatwg.org/#interface-treewalker) interface.
#[derive(Clone)]
pub struct TreeWalker {
    traversal: Rc<Traversal>,
    current: Rc<RefCell<NodeHandle>>,
}

impl TreeWalker {
    pub(crate) fn new(root: NodeRef, what_to_show: u32, filter: Option<NodeFilter>) -> Self {
        let current = Rc::new(RefCell::new(root.handle().clone()));
        Self {
            traversal: Rc::new(Traversal::new(root, what_to_show, filter)),
            current,
        }
    }

    /// Implementation of [`root`](https://dom.spec.whatwg.org/#dom-treewalker-root) attribute.
    pub fn root(&self) -> NodeRef {
        self.traversal.root.clone()
    }

    pub fn what_to_show(&self) -> u32 {
        self.traversal.what_to_show
    }

    pub fn filter(&self) -> Option<NodeFilter> {
        self.traversal.filter.clone()
    }

    /// Implementation of [`currentNode`](https://dom.spec.whatwg.org/#dom-treewalker-currentnode) attribute.
    pub fn current_node(&self) -> NodeRef {
        self.traversal.wrap(self.current_id())
    }

    /// Setter of [`currentNode`](https://dom.spec.whatwg.org/#dom-treewalker-currentnode) attribute.
    ///
    /// `node` does not have to be a descendant of the root, but it has to come
    /// from the same [`DOMImplementation`](super::dom_implementation::DOMImplementation).
    pub fn set_current_node(&self, node: &NodeRef) -> Result<(), DOMException> {
        self.traversal.root.handle().check_arena(node.handle())?;
        *self.current.borrow_mut() = node.handle().clone();
        Ok(())
    }

    fn current_id(&self) -> NodeId {
        self.current.borrow().id()
    }

    fn accept(&self, node: NodeId) -> Option<NodeRef> {
        let node = self.traversal.wrap(node);
        *self.current.borrow_mut() = node.handle().clone();
        Some(node)
    }

    /// Implementation of [`parentNode`](https://dom.spec.whatwg.org/#dom-treewalker-parentnode) method.
    pub fn parent_node(&self) -> Result<Option<NodeRef>, DOMException> {
        let root = self.traversal.root_id();
        let mut node = self.current_id();
        while node != root {
            let Some(parent) = self.traversal.nav(node, Tree::parent) else {
                break;
            };
            node = parent;
            if self.traversal.filter(node)? == FilterResult::Accept {
                return Ok(self.accept(node));
            }
        }
        Ok(None)
    }

    /// Implementation of [traverse children](https://dom.spec.whatwg.org/#concept-traverse-children) algorithm.
    fn traverse_children(&self, first: bool) -> Result<Option<NodeRef>, DOMException> {
        let root = self.traversal.root_id();
        let current = self.current_id();
        let child = |tree: &Tree, n| {
            if first {
                tree.first_child(n)
            } else {
                tree.last_child(n)
            }
        };
        let sibling = |tree: &Tree, n| {
            if first {
                tree.next_sibling(n)
            } else {
                tree.previous_sibling(n)
            }
        };

        let mut next = self.traversal.nav(current, child);
        'outer: while let Some(mut node) = next {
            match self.traversal.filter(node)? {
                FilterResult::Accept => return Ok(self.accept(node)),
                FilterResult::Skip => {
                    if let Some(c) = self.traversal.nav(node, child) {
                        next = Some(c);
                        continue;
                    }
                }
                FilterResult::Reject => {}
            }
            loop {
                if let Some(s) = self.traversal.nav(node, sibling) {
                    next = Some(s);
                    continue 'outer;
                }
                match self.traversal.nav(node, Tree::parent) {
                    Some(parent) if parent != root && parent != current => node = parent,
                    _ => return Ok(None),
                }
            }
        }
        Ok(None)
    }

    /// Implementation of [`firstChild`](https://dom.spec.whatwg.org/#dom-treewalker-firstchild) method.
    pub fn first_child(&self) -> Result<Option<NodeRef>, DOMException> {
        self.traverse_children(true)
    }

    /// Implementation of [`lastChild`](https://dom.spec.whatwg.org/#dom-treewalker-lastchild) method.
    pub fn last_child(&self) -> Result<Option<NodeRef>, DOMException> {
        self.traverse_children(false)
    }

    /// Implementation of [traverse siblings](https://dom.spec.whatwg.org/#concept-traverse-siblings) algorithm.
    ///
    /// # Specification
    /// ```text
    /// 1. Let node be walker's current.
    /// 2. If node is root, then return null.
    /// 3. While true:
    ///    1. Let sibling be node's next sibling if type is next, and node's
    ///       previous sibling if type is previous.
    ///    2. While sibling is non-null:
    ///       1. Set node to sibling.
    ///       2. Let result be the result of filtering node within walker.
    ///       3. If result is FILTER_ACCEPT, then set walker's current to node and
    ///          return node.
    ///       4. Set sibling to node's first child if type is next, and node's last
    ///          child if type is previous.
    ///       5. If result is FILTER_REJECT or sibling is null, then set sibling to
    ///          node's next sibling if type is next, and node's previous sibling if
    ///          type is previous.
    ///    3. Set node to node's parent.
    ///    4. If node is null or walker's root, then return null.
    ///    5. If the return value of filtering node within walker is FILTER_ACCEPT,
    ///       then return null.
    /// ```
    fn traverse_siblings(&self, next: bool) -> Result<Option<NodeRef>, DOMException> {
        let root = self.traversal.root_id();
        let mut node = self.current_id();
        if node == root {
            return Ok(None);
        }
        let child = |tree: &Tree, n| {
            if next {
                tree.first_child(n)
            } else {
                tree.last_child(n)
            }
        };
        let sibling = |tree: &Tree, n| {
            if next {
                tree.next_sibling(n)
            } else {
                tree.previous_sibling(n)
            }
        };
        loop {
            let mut candidate = self.traversal.nav(node, sibling);
            while let Some(s) = candidate {
                node = s;
                let result = self.traversal.filter(node)?;
                if result == FilterResult::Accept {
                    return Ok(self.accept(node));
                }
                candidate = self.traversal.nav(node, child);
                if result == FilterResult::Reject || candidate.is_none() {
                    candidate = self.traversal.nav(node, sibling);
                }
            }
            match self.traversal.nav(node, Tree::parent) {
                Some(parent) if parent != root => node = parent,
                _ => return Ok(None),
            }
            if self.traversal.filter(node)? == FilterResult::Accept {
                return Ok(None);
            }
        }
    }

    /// Implementation of [`nextSibling`](https://dom.spec.whatwg.org/#dom-treewalker-nextsibling) method.
    pub fn next_sibling(&self) -> Result<Option<NodeRef>, DOMException> {
        self.traverse_siblings(true)
    }

    /// Implementation of [`previousSibling`](https://dom.spec.whatwg.org/#dom-treewalker-previoussibling) method.
    pub fn previous_sibling(&self) -> Result<Option<NodeRef>, DOMException> {
        self.traverse_siblings(false)
    }

    /// Implementation of [`previousNode`](https://dom.spec.whatwg.org/#dom-treewalker-previousnode) method.
    pub fn previous_node(&self) -> Result<Option<NodeRef>, DOMException> {
        let root = self.traversal.root_id();
        let mut node = self.current_id();
        while node != root {
            let mut sibling = self.traversal.nav(node, Tree::previous_sibling);
            while let Some(s) = sibling {
                node = s;
                let mut result = self.traversal.filter(node)?;
                while result != FilterResult::Reject {
                    let Some(last) = self.traversal.nav(node, Tree::last_child) else {
                        break;
                    };
                    node = last;
                    result = self.traversal.filter(node)?;
                }
                if result == FilterResult::Accept {
                    return Ok(self.accept(node));
                }
                sibling = self.traversal.nav(node, Tree::previous_sibling);
            }
            let Some(parent) = self.traversal.nav(node, Tree::parent) else {
                return Ok(None);
            };
            if node == root {
                return Ok(None);
            }
            node = parent;
            if self.traversal.filter(node)? == FilterResult::Accept {
                return Ok(self.accept(node));
            }
        }
        Ok(None)
    }

    /// Implementation of [`nextNode`](https://dom.spec.whatwg.org/#dom-treewalker-nextnode) method.
    pub fn next_node(&self) -> Result<Option<NodeRef>, DOMException> {
        let root = self.traversal.root_id();
        let mut node = self.current_id();
        let mut result = FilterResult::Accept;
        loop {
            while result != FilterResult::Reject {
                let Some(first) = self.traversal.nav(node, Tree::first_child) else {
                    break;
                };
                node = first;
                result = self.traversal.filter(node)?;
                if result == FilterResult::Accept {
                    return Ok(self.accept(node));
                }
            }
            let mut temporary = Some(node);
            let mut sibling = None;
            while let Some(t) = temporary {
                if t == root {
                    return Ok(None);
                }
                sibling = self.traversal.nav(t, Tree::next_sibling);
                if sibling.is_some() {
                    break;
                }
                temporary = self.traversal.nav(t, Tree::parent);
            }
            let Some(s) = sibling else {
                return Ok(None);
            };
            node = s;
            result = self.traversal.filter(node)?;
            if result == FilterResult::Accept {
                return Ok(self.accept(node));
            }
        }
    }
}

impl fmt::Debug for TreeWalker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeWalker")
            .field("root", &self.traversal.root)
            .field("current", &self.current_node())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{
        child_node::ChildNode, dom_implementation::DOMImplementation, element::ElementRef,
        node::Node,
    };

    /// `<root><a><b/></a><c/>text</root>`
    fn fixture() -> (ElementRef, [NodeRef; 4]) {
        let doc = DOMImplementation::new().create_html_document(None);
        let root = doc.create_element("root").unwrap();
        let a = doc.create_element("a").unwrap();
        let b = doc.create_element("b").unwrap();
        let c = doc.create_element("c").unwrap();
        let text = doc.create_text_node("text");
        doc.body().unwrap().append_child(root.clone().into()).unwrap();
        root.append_child(a.clone().into()).unwrap();
        a.append_child(b.clone().into()).unwrap();
        root.append_child(c.clone().into()).unwrap();
        root.append_child(text.clone().into()).unwrap();
        (root, [a.into(), b.into(), c.into(), text.into()])
    }

    #[test]
    fn node_iterator_walks_in_tree_order() {
        let (root, [a, b, c, text]) = fixture();
        let doc = root.owner_document().unwrap();
        let it = doc.create_node_iterator(root.clone().into(), SHOW_ELEMENT, None);
        assert_eq!(it.next_node().unwrap(), Some(root.clone().into()));
        assert_eq!(it.next_node().unwrap(), Some(a.clone()));
        assert_eq!(it.next_node().unwrap(), Some(b.clone()));
        assert_eq!(it.next_node().unwrap(), Some(c.clone()));
        assert_eq!(it.next_node().unwrap(), None);
        assert_eq!(it.previous_node().unwrap(), Some(c.clone()));
        assert!(it.pointer_before_reference_node());

        // the text node is hidden by `what_to_show`
        let it = doc.create_node_iterator(root.into(), SHOW_TEXT, None);
        assert_eq!(it.next_node().unwrap(), Some(text));
    }

    #[test]
    fn node_iterator_survives_removal() {
        let (root, [a, b, c, _]) = fixture();
        let doc = root.owner_document().unwrap();
        let it = doc.create_node_iterator(root.into(), SHOW_ALL, None);
        it.next_node().unwrap();
        it.next_node().unwrap();
        assert_eq!(it.next_node().unwrap(), Some(b.clone()));

        a.as_element().unwrap().remove();
        // the reference moved to the node preceding the removed subtree
        assert_ne!(it.reference_node(), b);
        assert_eq!(it.next_node().unwrap(), Some(c));
    }

    #[test]
    fn node_iterator_follows_adopted_root() {
        let imp = DOMImplementation::new();
        let first = imp.create_html_document(None);
        let second = imp.create_html_document(None);
        let root = first.create_element("r").unwrap();
        let c1 = first.create_element("c1").unwrap();
        let c2 = first.create_element("c2").unwrap();
        root.append_child(c1.clone().into()).unwrap();
        root.append_child(c2.clone().into()).unwrap();

        let it = first.create_node_iterator(root.clone().into(), SHOW_ALL, None);
        second.adopt_node(root.clone().into()).unwrap();
        assert_eq!(root.owner_document(), Some(second));
        assert_eq!(it.next_node().unwrap(), Some(root.clone().into()));
        assert_eq!(it.next_node().unwrap(), Some(c1.clone().into()));

        root.remove_child(&c1.into()).unwrap();
        assert_eq!(it.reference_node(), root.into());
        assert_eq!(it.next_node().unwrap(), Some(c2.into()));
    }

    #[test]
    fn tree_walker_navigation() {
        let (root, [a, b, c, text]) = fixture();
        let doc = root.owner_document().unwrap();
        let walker = doc.create_tree_walker(root.clone().into(), SHOW_ALL, None);
        assert_eq!(walker.first_child().unwrap(), Some(a.clone()));
        assert_eq!(walker.next_sibling().unwrap(), Some(c.clone()));
        assert_eq!(walker.next_sibling().unwrap(), Some(text.clone()));
        assert_eq!(walker.next_sibling().unwrap(), None);
        assert_eq!(walker.previous_node().unwrap(), Some(c.clone()));
        assert_eq!(walker.previous_node().unwrap(), Some(b.clone()));
        assert_eq!(walker.parent_node().unwrap(), Some(a.clone()));
        assert_eq!(walker.next_node().unwrap(), Some(b));
        assert_eq!(walker.next_node().unwrap(), Some(c));
        walker.set_current_node(&root.clone().into()).unwrap();
        assert_eq!(walker.last_child().unwrap(), Some(text));
        assert_eq!(walker.parent_node().unwrap(), Some(root.into()));
        assert_eq!(walker.parent_node().unwrap(), None);
    }

    #[test]
    fn reject_skips_subtree() {
        let (root, [a, _, c, _]) = fixture();
        let doc = root.owner_document().unwrap();
        let filter: NodeFilter = Rc::new(|node: &NodeRef| {
            if node.node_name().as_ref() == "A" {
                FilterResult::Reject
            } else {
                FilterResult::Accept
            }
        });
        let walker = doc.create_tree_walker(root.clone().into(), SHOW_ELEMENT, Some(filter.clone()));
        assert_eq!(walker.next_node().unwrap(), Some(c.clone()));

        // a NodeIterator treats reject like skip
        let it = doc.create_node_iterator(root.into(), SHOW_ELEMENT, Some(filter));
        it.next_node().unwrap();
        assert_ne!(it.next_node().unwrap(), Some(a));
    }

    #[test]
    fn reentrant_filter_is_rejected() {
        let (root, _) = fixture();
        let doc = root.owner_document().unwrap();
        let slot: Rc<RefCell<Option<TreeWalker>>> = Rc::new(RefCell::new(None));
        let seen = Rc::new(Cell::new(None));
        let filter: NodeFilter = {
            let slot = slot.clone();
            let seen = seen.clone();
            Rc::new(move |_: &NodeRef| {
                if let Some(walker) = slot.borrow().as_ref() {
                    seen.set(walker.next_node().err());
                }
                FilterResult::Accept
            })
        };
        let walker = doc.create_tree_walker(root.into(), SHOW_ALL, Some(filter));
        *slot.borrow_mut() = Some(walker.clone());
        assert!(walker.first_child().unwrap().is_some());
        assert_eq!(seen.get(), Some(DOMException::InvalidStateErr));
        slot.borrow_mut().take();
    }
}

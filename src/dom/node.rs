use std::{
    cell::{Cell, Ref, RefCell},
    cmp::Ordering,
    fmt,
    ops::Deref,
    rc::{Rc, Weak},
};

use crate::tree::{NodeId, Tree, node::NodeKind, position::is_equal_node};

use super::{
    DOMException, DocumentPosition, NodeType,
    attr::AttrRef,
    character_data::{CommentRef, TextRef},
    document::DocumentRef,
    document_fragment::DocumentFragmentRef,
    document_type::DocumentTypeRef,
    element::{ElementRef, tag_name},
    mutation::deliver_pending,
    node_list::ChildNodes,
    pi::ProcessingInstructionRef,
};

pub(crate) type Arena = Rc<ArenaCell>;

/// The tree of one `DOMImplementation` together with the number of handles
/// held on each of its slots.
///
/// Held slots are the roots of [`Tree::collect`].
pub(crate) struct ArenaCell {
    tree: RefCell<Tree>,
    handles: RefCell<Vec<Cell<u32>>>,
}

impl ArenaCell {
    pub(crate) fn new() -> Self {
        Self {
            tree: RefCell::new(Tree::new()),
            handles: RefCell::new(vec![]),
        }
    }

    fn retain(&self, id: NodeId) {
        {
            let handles = self.handles.borrow();
            if let Some(count) = handles.get(id.index()) {
                count.set(count.get() + 1);
                return;
            }
        }
        let mut handles = self.handles.borrow_mut();
        handles.resize_with(id.index() + 1, Cell::default);
        handles[id.index()].set(1);
    }

    fn release(&self, id: NodeId) {
        if let Some(count) = self.handles.borrow().get(id.index()) {
            count.set(count.get().saturating_sub(1));
        }
    }

    /// Collect if the arena is idle and enough has been allocated since the
    /// last collection.
    pub(crate) fn maybe_collect(&self) {
        let due = self.tree.try_borrow().is_ok_and(|tree| tree.collect_due());
        if due {
            self.collect();
        }
    }

    /// Free every node that no handle can reach and return how many were
    /// freed.
    ///
    /// Nothing happens while the arena is borrowed or while mutation records
    /// are waiting for delivery.
    pub(crate) fn collect(&self) -> usize {
        let garbage = {
            let Ok(mut tree) = self.tree.try_borrow_mut() else {
                return 0;
            };
            if tree.delivering || !tree.pending.is_empty() {
                return 0;
            }
            let handles = self.handles.borrow();
            let roots = handles
                .iter()
                .enumerate()
                .filter(|(_, count)| count.get() > 0)
                .map(|(index, _)| NodeId::from_index(index))
                .collect::<Vec<_>>();
            tree.collect(roots)
        };
        // listeners of the freed nodes may drop handles of this arena
        garbage.len()
    }
}

impl Deref for ArenaCell {
    type Target = RefCell<Tree>;

    fn deref(&self) -> &RefCell<Tree> {
        &self.tree
    }
}

/// A node of an arena.
///
/// Every public handle type wraps one of these. A node stays allocated while
/// a handle to any node of its tree exists.
pub(crate) struct NodeHandle {
    arena: Arena,
    id: NodeId,
}

impl NodeHandle {
    pub(crate) fn new(arena: Arena, id: NodeId) -> Self {
        arena.retain(id);
        Self { arena, id }
    }

    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn arena(&self) -> &Arena {
        &self.arena
    }

    pub(crate) fn tree(&self) -> Ref<'_, Tree> {
        self.arena.borrow()
    }

    /// Run `f` on the arena, then deliver the mutation records it produced.
    ///
    /// The arena is not borrowed anymore when the handlers run.
    pub(crate) fn mutate<R>(&self, f: impl FnOnce(&mut Tree, NodeId) -> R) -> R {
        self.arena.maybe_collect();
        let res = f(&mut self.arena.borrow_mut(), self.id);
        deliver_pending(&self.arena);
        res
    }

    /// A handle to another node of the same arena.
    pub(crate) fn with_id(&self, id: NodeId) -> NodeHandle {
        NodeHandle::new(self.arena.clone(), id)
    }

    pub(crate) fn wrap(&self, id: NodeId) -> NodeRef {
        NodeRef::from_handle(self.with_id(id))
    }

    pub(crate) fn wrap_opt(&self, id: Option<NodeId>) -> Option<NodeRef> {
        id.map(|id| self.wrap(id))
    }

    pub(crate) fn same_arena(&self, other: &NodeHandle) -> bool {
        Rc::ptr_eq(&self.arena, &other.arena)
    }

    /// Fail with `WrongDocumentErr` if `other` lives in another arena.
    pub(crate) fn check_arena(&self, other: &NodeHandle) -> Result<(), DOMException> {
        if !self.same_arena(other) {
            return Err(DOMException::WrongDocumentErr);
        }
        Ok(())
    }

    fn arena_order(&self, other: &NodeHandle) -> Ordering {
        Rc::as_ptr(&self.arena).cmp(&Rc::as_ptr(&other.arena))
    }
}

impl Clone for NodeHandle {
    fn clone(&self) -> Self {
        NodeHandle::new(self.arena.clone(), self.id)
    }
}

impl Drop for NodeHandle {
    fn drop(&mut self) {
        self.arena.release(self.id);
    }
}

impl PartialEq for NodeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.same_arena(other)
    }
}

impl Eq for NodeHandle {}

/// Implementation of [Node](https://dom.spec.whatwg.org/#interface-node) interface.
///
/// Every method has a default implementation working on the arena, so the
/// typed handles and [`NodeRef`] share a single implementation.
#[allow(private_bounds)]
pub trait Node: NodeConnection {
    /// Implementation of [`nodeType`](https://dom.spec.whatwg.org/#dom-node-nodetype) attribute.
    fn node_type(&self) -> NodeType {
        self.tree().node_type(self.node_id())
    }

    /// Implementation of [`nodeName`](https://dom.spec.whatwg.org/#dom-node-nodename) attribute.
    ///
    /// # Specification
    /// ```text
    /// The nodeName getter steps are to return the first matching statement,
    /// switching on the interface this implements:
    ///
    /// Element
    ///     Its HTML-uppercased qualified name.
    /// Attr
    ///     Its qualified name.
    /// An exclusive Text node
    ///     "#text".
    /// ProcessingInstruction
    ///     Its target.
    /// Comment
    ///     "#comment".
    /// Document
    ///     "#document".
    /// DocumentType
    ///     Its name.
    /// DocumentFragment
    ///     "#document-fragment".
    /// ```
    fn node_name(&self) -> Rc<str> {
        let tree = self.tree();
        match tree.kind(self.node_id()) {
            NodeKind::Element(_) => tag_name(&tree, self.node_id()),
            NodeKind::Attribute(attr) => attr.qualified_name.clone(),
            NodeKind::Text(_) => "#text".into(),
            NodeKind::ProcessingInstruction(pi) => pi.target.clone(),
            NodeKind::Comment(_) => "#comment".into(),
            NodeKind::Document(_) => "#document".into(),
            NodeKind::DocumentType(doctype) => doctype.name.clone(),
            NodeKind::DocumentFragment => "#document-fragment".into(),
        }
    }

    /// Implementation of [`nodeValue`](https://dom.spec.whatwg.org/#dom-node-nodevalue) attribute.
    fn node_value(&self) -> Option<String> {
        let tree = self.tree();
        match tree.kind(self.node_id()) {
            NodeKind::Attribute(attr) => Some(attr.value.clone()),
            kind => kind.character_data().map(str::to_owned),
        }
    }

    /// Setter of [`nodeValue`](https://dom.spec.whatwg.org/#dom-node-nodevalue) attribute.
    ///
    /// `None` is treated as the empty string. Nodes without a value ignore
    /// this call.
    fn set_node_value(&self, value: Option<&str>) {
        let value = value.unwrap_or_default();
        self.handle().mutate(|tree, id| match tree.node_type(id) {
            NodeType::Attribute => tree.set_attr_value(id, value),
            NodeType::Text | NodeType::Comment | NodeType::ProcessingInstruction => {
                tree.set_character_data(id, value.to_owned())
            }
            _ => {}
        })
    }

    /// Implementation of [`textContent`](https://dom.spec.whatwg.org/#dom-node-textcontent) attribute.
    fn text_content(&self) -> Option<String> {
        let tree = self.tree();
        let id = self.node_id();
        match tree.kind(id) {
            NodeKind::Element(_) | NodeKind::DocumentFragment => Some(
                tree.inclusive_descendants(id)
                    .into_iter()
                    .filter_map(|n| match tree.kind(n) {
                        NodeKind::Text(data) => Some(data.as_str()),
                        _ => None,
                    })
                    .collect(),
            ),
            NodeKind::Attribute(attr) => Some(attr.value.clone()),
            NodeKind::Document(_) | NodeKind::DocumentType(_) => None,
            kind => kind.character_data().map(str::to_owned),
        }
    }

    /// Setter of [`textContent`](https://dom.spec.whatwg.org/#dom-node-textcontent) attribute.
    ///
    /// Elements and fragments lose all of their children and get a single
    /// Text node instead, unless `value` is empty.
    fn set_text_content(&self, value: Option<&str>) {
        let value = value.unwrap_or_default();
        self.handle().mutate(|tree, id| match tree.node_type(id) {
            NodeType::Element | NodeType::DocumentFragment => {
                tree.remove_children(id);
                if !value.is_empty() {
                    let owner = tree.node(id).owner_document;
                    let text = tree.alloc(NodeKind::Text(value.to_owned()), owner);
                    tree.insert_node(id, text, None);
                }
            }
            NodeType::Attribute => tree.set_attr_value(id, value),
            NodeType::Text | NodeType::Comment | NodeType::ProcessingInstruction => {
                tree.set_character_data(id, value.to_owned())
            }
            _ => {}
        })
    }

    /// Implementation of [`parentNode`](https://dom.spec.whatwg.org/#dom-node-parentnode) attribute.
    fn parent_node(&self) -> Option<NodeRef> {
        let parent = self.tree().parent(self.node_id());
        self.handle().wrap_opt(parent)
    }

    /// Implementation of [`parentElement`](https://dom.spec.whatwg.org/#dom-node-parentelement) attribute.
    fn parent_element(&self) -> Option<ElementRef> {
        let parent = self.tree().parent_element(self.node_id())?;
        Some(ElementRef(self.handle().with_id(parent)))
    }

    /// Implementation of [`ownerDocument`](https://dom.spec.whatwg.org/#dom-node-ownerdocument) attribute.
    ///
    /// Documents have no owner document.
    fn owner_document(&self) -> Option<DocumentRef> {
        let tree = self.tree();
        if tree.is_document(self.node_id()) {
            return None;
        }
        let doc = tree.node(self.node_id()).owner_document?;
        Some(DocumentRef(self.handle().with_id(doc)))
    }

    /// Implementation of [`childNodes`](https://dom.spec.whatwg.org/#dom-node-childnodes) attribute.
    ///
    /// The first call switches the node to indexed storage of its children.
    fn child_nodes(&self) -> ChildNodes {
        {
            let mut tree = self.handle().arena().borrow_mut();
            if !tree.is_leaf(self.node_id()) {
                tree.ensure_child_nodes(self.node_id());
            }
        }
        ChildNodes::new(self.handle().clone())
    }

    /// Implementation of [`firstChild`](https://dom.spec.whatwg.org/#dom-node-firstchild) attribute.
    fn first_child(&self) -> Option<NodeRef> {
        let child = self.tree().first_child(self.node_id());
        self.handle().wrap_opt(child)
    }

    /// Implementation of [`lastChild`](https://dom.spec.whatwg.org/#dom-node-lastchild) attribute.
    fn last_child(&self) -> Option<NodeRef> {
        let child = self.tree().last_child(self.node_id());
        self.handle().wrap_opt(child)
    }

    /// Implementation of [`previousSibling`](https://dom.spec.whatwg.org/#dom-node-previoussibling) attribute.
    fn previous_sibling(&self) -> Option<NodeRef> {
        let sibling = self.tree().previous_sibling(self.node_id());
        self.handle().wrap_opt(sibling)
    }

    /// Implementation of [`nextSibling`](https://dom.spec.whatwg.org/#dom-node-nextsibling) attribute.
    fn next_sibling(&self) -> Option<NodeRef> {
        let sibling = self.tree().next_sibling(self.node_id());
        self.handle().wrap_opt(sibling)
    }

    /// Implementation of [`hasChildNodes`](https://dom.spec.whatwg.org/#dom-node-haschildnodes) method.
    fn has_child_nodes(&self) -> bool {
        self.tree().has_children(self.node_id())
    }

    /// Implementation of [`insertBefore`](https://dom.spec.whatwg.org/#dom-node-insertbefore) method.
    ///
    /// `HierarchyRequestErr` is returned if `ref_child` is not a child of this
    /// node, and `WrongDocumentErr` if `new_child` belongs to another
    /// [`DOMImplementation`](super::dom_implementation::DOMImplementation).
    ///
    /// # Specification
    /// ```text
    /// node . insertBefore(node, child)
    ///     Inserts node before child within node.
    ///     If child is null, inserts node at the end of node's children.
    ///     If node is a DocumentFragment, its children are inserted instead and the
    ///     fragment is left empty.
    ///
    ///     Throws a "HierarchyRequestError" DOMException if the constraints of the node
    ///     tree are violated.
    /// ```
    fn insert_before(
        &self,
        new_child: NodeRef,
        ref_child: Option<&NodeRef>,
    ) -> Result<NodeRef, DOMException> {
        self.handle().check_arena(new_child.handle())?;
        if let Some(ref_child) = ref_child {
            if !self.handle().same_arena(ref_child.handle()) {
                return Err(DOMException::HierarchyRequestErr);
            }
        }
        let node = new_child.node_id();
        let child = ref_child.map(|c| c.node_id());
        self.handle()
            .mutate(|tree, id| tree.insert_before(id, node, child))?;
        Ok(new_child)
    }

    /// Implementation of [`appendChild`](https://dom.spec.whatwg.org/#dom-node-appendchild) method.
    fn append_child(&self, new_child: NodeRef) -> Result<NodeRef, DOMException> {
        self.insert_before(new_child, None)
    }

    /// Implementation of [`replaceChild`](https://dom.spec.whatwg.org/#dom-node-replacechild) method.
    ///
    /// If `new_child` is already connected to the same document as this node,
    /// it is moved without being disconnected in between.
    ///
    /// # Specification
    /// ```text
    /// node . replaceChild(node, child)
    ///     Replaces child with node within node and returns child.
    ///
    ///     Throws a "HierarchyRequestError" DOMException if the constraints of the node
    ///     tree are violated.
    ///     Throws a "NotFoundError" DOMException if child is not a child of node.
    /// ```
    fn replace_child(&self, new_child: NodeRef, old_child: &NodeRef) -> Result<NodeRef, DOMException> {
        self.handle().check_arena(new_child.handle())?;
        if !self.handle().same_arena(old_child.handle()) {
            return Err(DOMException::NotFoundErr);
        }
        let node = new_child.node_id();
        let child = old_child.node_id();
        self.handle()
            .mutate(|tree, id| tree.replace_child(id, node, child))?;
        Ok(old_child.clone())
    }

    /// Implementation of [`removeChild`](https://dom.spec.whatwg.org/#dom-node-removechild) method.
    fn remove_child(&self, old_child: &NodeRef) -> Result<NodeRef, DOMException> {
        if !self.handle().same_arena(old_child.handle()) {
            return Err(DOMException::NotFoundErr);
        }
        let child = old_child.node_id();
        self.handle().mutate(|tree, id| tree.remove_child(id, child))?;
        Ok(old_child.clone())
    }

    /// Remove every child of this node at once.
    ///
    /// A single REMOVE record lists all removed children. Leaves ignore this
    /// call.
    fn remove_children(&self) {
        self.handle().mutate(|tree, id| {
            if !tree.is_leaf(id) {
                tree.remove_children(id)
            }
        })
    }

    /// Implementation of [`cloneNode`](https://dom.spec.whatwg.org/#dom-node-clonenode) method.
    ///
    /// The copy is never connected, except when a document is cloned.
    fn clone_node(&self, deep: bool) -> NodeRef {
        let copy = self.handle().mutate(|tree, id| tree.clone_node(id, deep));
        self.handle().wrap(copy)
    }

    /// Implementation of [`normalize`](https://dom.spec.whatwg.org/#dom-node-normalize) method.
    ///
    /// # Specification
    /// ```text
    /// node . normalize()
    ///     Removes empty exclusive Text nodes and concatenates the data of remaining
    ///     contiguous exclusive Text nodes into the first of their nodes.
    /// ```
    fn normalize(&self) {
        self.handle().mutate(|tree, id| tree.normalize(id))
    }

    /// Implementation of [`compareDocumentPosition`](https://dom.spec.whatwg.org/#dom-node-comparedocumentposition) method.
    ///
    /// Nodes in different trees are reported as disconnected, together with
    /// an order that is stable for the pair.
    fn compare_document_position(&self, other: &NodeRef) -> DocumentPosition {
        let (this, other) = (self.handle(), other.handle());
        if !this.same_arena(other) {
            let order = match this.arena_order(other) {
                Ordering::Greater => DocumentPosition::PRECEDING,
                _ => DocumentPosition::FOLLOWING,
            };
            return DocumentPosition::new()
                .set_flag(DocumentPosition::DISCONNECTED)
                .set_flag(DocumentPosition::IMPLEMENTATION_SPECIFIC)
                .set_flag(order);
        }
        self.tree().compare_document_position(this.id(), other.id())
    }

    /// Implementation of [`isEqualNode`](https://dom.spec.whatwg.org/#dom-node-isequalnode) method.
    ///
    /// # Specification
    /// ```text
    /// A node A equals a node B if all of the following conditions are true:
    ///
    /// - A and B implement the same interfaces.
    /// - The following are equal, switching on the interface A implements:
    ///     DocumentType: Its name, public ID, and system ID.
    ///     Element: Its namespace, namespace prefix, local name, and its attribute
    ///              list's size.
    ///     Attr: Its namespace, local name, and value.
    ///     ProcessingInstruction: Its target and data.
    ///     Text, Comment: Its data.
    /// - If A is an element, each attribute in its attribute list has an attribute
    ///   that equals an attribute in B's attribute list.
    /// - A and B have the same number of children.
    /// - Each child of A equals the child of B at the identical index.
    /// ```
    fn is_equal_node(&self, other: &NodeRef) -> bool {
        let left = self.tree();
        let right = other.tree();
        is_equal_node(&left, self.node_id(), &right, other.node_id())
    }

    /// Implementation of [`isSameNode`](https://dom.spec.whatwg.org/#dom-node-issamenode) method.
    fn is_same_node(&self, other: &NodeRef) -> bool {
        self.handle() == other.handle()
    }

    /// A reference to this node that does not keep it alive.
    ///
    /// Event listeners and mutation handlers are stored in the tree. A strong
    /// reference captured by one of them keeps its whole arena allocated for
    /// as long as it is installed, so they should capture one of these.
    fn downgrade(&self) -> WeakNodeRef {
        let handle = self.handle();
        WeakNodeRef {
            arena: Rc::downgrade(handle.arena()),
            id: handle.id(),
            generation: self.tree().generation(handle.id()),
        }
    }

    /// Implementation of [`contains`](https://dom.spec.whatwg.org/#dom-node-contains) method.
    fn contains(&self, other: &NodeRef) -> bool {
        self.handle().same_arena(other.handle()) && self.tree().contains(self.node_id(), other.node_id())
    }

    /// Implementation of [`isConnected`](https://dom.spec.whatwg.org/#dom-node-isconnected) attribute.
    fn is_connected(&self) -> bool {
        self.tree().is_rooted(self.node_id())
    }

    /// The document order number of this node while it is connected.
    ///
    /// Numbers are unique within a document and are never reused. Use
    /// [`DocumentRef::node_by_number`] for the reverse lookup.
    fn node_number(&self) -> Option<u32> {
        self.tree().node(self.node_id()).nid
    }

    /// Implementation of [`getRootNode`](https://dom.spec.whatwg.org/#dom-node-getrootnode) method.
    fn get_root_node(&self) -> NodeRef {
        let root = self.tree().root(self.node_id());
        self.handle().wrap(root)
    }

    /// Implementation of [`lookupPrefix`](https://dom.spec.whatwg.org/#dom-node-lookupprefix) method.
    fn lookup_prefix(&self, namespace: Option<&str>) -> Option<Rc<str>> {
        self.tree().lookup_prefix(self.node_id(), namespace)
    }

    /// Implementation of [`lookupNamespaceURI`](https://dom.spec.whatwg.org/#dom-node-lookupnamespaceuri) method.
    fn lookup_namespace_uri(&self, prefix: Option<&str>) -> Option<Rc<str>> {
        let prefix = prefix.filter(|p| !p.is_empty());
        self.tree().locate_namespace(self.node_id(), prefix)
    }

    /// Implementation of [`isDefaultNamespace`](https://dom.spec.whatwg.org/#dom-node-isdefaultnamespace) method.
    fn is_default_namespace(&self, namespace: Option<&str>) -> bool {
        let namespace = namespace.filter(|ns| !ns.is_empty());
        self.tree().locate_namespace(self.node_id(), None).as_deref() == namespace
    }
}

/// Access to the arena behind a handle.
///
/// None of these methods are exposed to the user.
pub(crate) trait NodeConnection: Clone + Into<NodeRef> {
    fn handle(&self) -> &NodeHandle;

    fn node_id(&self) -> NodeId {
        self.handle().id()
    }

    fn tree(&self) -> Ref<'_, Tree> {
        self.handle().tree()
    }
}

/// Any node of the tree.
#[derive(Clone, PartialEq, Eq)]
pub enum NodeRef {
    Element(ElementRef),
    Attribute(AttrRef),
    Text(TextRef),
    ProcessingInstruction(ProcessingInstructionRef),
    Comment(CommentRef),
    Document(DocumentRef),
    DocumentType(DocumentTypeRef),
    DocumentFragment(DocumentFragmentRef),
}

impl NodeRef {
    pub(crate) fn from_handle(handle: NodeHandle) -> Self {
        let node_type = handle.tree().node_type(handle.id());
        match node_type {
            NodeType::Element => NodeRef::Element(ElementRef(handle)),
            NodeType::Attribute => NodeRef::Attribute(AttrRef(handle)),
            NodeType::Text => NodeRef::Text(TextRef(handle)),
            NodeType::ProcessingInstruction => {
                NodeRef::ProcessingInstruction(ProcessingInstructionRef(handle))
            }
            NodeType::Comment => NodeRef::Comment(CommentRef(handle)),
            NodeType::Document => NodeRef::Document(DocumentRef(handle)),
            NodeType::DocumentType => NodeRef::DocumentType(DocumentTypeRef(handle)),
            NodeType::DocumentFragment => NodeRef::DocumentFragment(DocumentFragmentRef(handle)),
        }
    }
}

/// A node reference that does not keep the node allocated.
///
/// Created by [`Node::downgrade`].
#[derive(Clone)]
pub struct WeakNodeRef {
    arena: Weak<ArenaCell>,
    id: NodeId,
    generation: u32,
}

impl WeakNodeRef {
    /// The node, if it is still allocated.
    pub fn upgrade(&self) -> Option<NodeRef> {
        let arena = self.arena.upgrade()?;
        if arena.borrow().generation(self.id) != self.generation {
            return None;
        }
        Some(NodeRef::from_handle(NodeHandle::new(arena, self.id)))
    }
}

impl fmt::Debug for WeakNodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakNodeRef")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .finish()
    }
}

impl NodeConnection for NodeRef {
    fn handle(&self) -> &NodeHandle {
        match self {
            NodeRef::Element(node) => &node.0,
            NodeRef::Attribute(node) => &node.0,
            NodeRef::Text(node) => &node.0,
            NodeRef::ProcessingInstruction(node) => &node.0,
            NodeRef::Comment(node) => &node.0,
            NodeRef::Document(node) => &node.0,
            NodeRef::DocumentType(node) => &node.0,
            NodeRef::DocumentFragment(node) => &node.0,
        }
    }
}

impl Node for NodeRef {}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Element(node) => node.fmt(f),
            NodeRef::Attribute(node) => node.fmt(f),
            NodeRef::Text(node) => node.fmt(f),
            NodeRef::ProcessingInstruction(node) => node.fmt(f),
            NodeRef::Comment(node) => node.fmt(f),
            NodeRef::Document(node) => node.fmt(f),
            NodeRef::DocumentType(node) => node.fmt(f),
            NodeRef::DocumentFragment(node) => node.fmt(f),
        }
    }
}

macro_rules! impl_node_conversion {
    ( $( ( $fn:ident, $var:ident, $t:ty ) ),* ) => {
        impl NodeRef {
            $(
                pub fn $fn (&self) -> Option<$t> {
                    match self {
                        NodeRef:: $var (node) => Some(node.clone()),
                        _ => None
                    }
                }
            )*
        }
    };
}

impl_node_conversion! {
    ( as_element, Element, ElementRef ),
    ( as_attribute, Attribute, AttrRef ),
    ( as_text_node, Text, TextRef ),
    ( as_processing_instruction, ProcessingInstruction, ProcessingInstructionRef ),
    ( as_comment, Comment, CommentRef ),
    ( as_document, Document, DocumentRef ),
    ( as_document_type, DocumentType, DocumentTypeRef ),
    ( as_document_fragment, DocumentFragment, DocumentFragmentRef )
}

macro_rules! impl_node_handle {
    ( $( ( $t:ident, $var:ident ) ),* ) => {
        $(
            impl NodeConnection for $t {
                fn handle(&self) -> &NodeHandle {
                    &self.0
                }
            }

            impl Node for $t {}

            impl From<$t> for NodeRef {
                fn from(node: $t) -> NodeRef {
                    NodeRef::$var(node)
                }
            }

            impl TryFrom<NodeRef> for $t {
                type Error = NodeRef;

                fn try_from(node: NodeRef) -> Result<Self, Self::Error> {
                    match node {
                        NodeRef::$var(node) => Ok(node),
                        other => Err(other),
                    }
                }
            }

            impl PartialEq for $t {
                fn eq(&self, other: &Self) -> bool {
                    self.0 == other.0
                }
            }

            impl Eq for $t {}

            impl fmt::Debug for $t {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}({:?}, {})", stringify!($t), self.0.id(), self.node_name())
                }
            }
        )*
    };
}

impl_node_handle! {
    ( ElementRef, Element ),
    ( AttrRef, Attribute ),
    ( TextRef, Text ),
    ( ProcessingInstructionRef, ProcessingInstruction ),
    ( CommentRef, Comment ),
    ( DocumentRef, Document ),
    ( DocumentTypeRef, DocumentType ),
    ( DocumentFragmentRef, DocumentFragment )
}

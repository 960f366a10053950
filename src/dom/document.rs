use std::rc::Rc;

use crate::tree::{
    NodeId,
    names::{is_ascii_whitespace, validate_and_extract, validate_name},
    node::{AttrData, ElementData, NodeKind, ProcessingInstructionData},
};

use super::{
    DOMException, HTML_NAMESPACE,
    attr::AttrRef,
    character_data::{CommentRef, TextRef},
    document_fragment::DocumentFragmentRef,
    document_type::DocumentTypeRef,
    dom_implementation::DOMImplementation,
    element::ElementRef,
    event::{Event, dispatch},
    mutation::MutationRecord,
    node::{Node, NodeConnection, NodeHandle, NodeRef},
    node_list::{ElementFilter, HTMLCollection},
    pi::ProcessingInstructionRef,
    traversal::{NodeFilter, NodeIterator, TreeWalker},
};

/// Implementation of [DocumentReadyState](https://html.spec.whatwg.org/multipage/dom.html#documentreadystate) enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DocumentReadyState {
    #[default]
    Loading,
    Interactive,
    Complete,
}

impl DocumentReadyState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Interactive => "interactive",
            Self::Complete => "complete",
        }
    }
}

/// Implementation of [Document](https://dom.spec.whatwg.org/#interface-document) interface.
///
/// A document is the root of a node tree. It owns the node numbering, the id
/// registry and the mutation handler slot of every node connected to it.
///
/// A document may contain the following children.
/// - `Element` (maximum of one)
/// - `ProcessingInstruction`
/// - `Comment`
/// - `DocumentType` (maximum of one, before the element)
#[derive(Clone)]
pub struct DocumentRef(pub(crate) NodeHandle);

impl DocumentRef {
    fn alloc(&self, kind: NodeKind) -> NodeHandle {
        self.0.arena().maybe_collect();
        let id = self
            .0
            .arena()
            .borrow_mut()
            .alloc(kind, Some(self.node_id()));
        self.0.with_id(id)
    }

    fn new_element(
        &self,
        local_name: Rc<str>,
        namespace: Option<Rc<str>>,
        prefix: Option<Rc<str>>,
    ) -> ElementRef {
        let data = ElementData::new(local_name, namespace, prefix);
        ElementRef(self.alloc(NodeKind::Element(Box::new(data))))
    }

    /// Elements created by `createElement` are HTML elements in HTML and XHTML
    /// documents.
    fn default_element_namespace(&self) -> Option<Rc<str>> {
        let tree = self.tree();
        let data = tree.document(self.node_id());
        (data.is_html || &*data.content_type == "application/xhtml+xml").then(|| HTML_NAMESPACE.into())
    }

    /// Implementation of [`createElement`](https://dom.spec.whatwg.org/#dom-document-createelement) method.
    ///
    /// # Specification
    /// ```text
    /// 1. If localName is not a valid element local name, then throw an
    ///    "InvalidCharacterError" DOMException.
    /// 2. If this is an HTML document, then set localName to localName in ASCII
    ///    lowercase.
    /// 3. ...
    /// 4. Let namespace be the HTML namespace, if this is an HTML document or
    ///    this's content type is "application/xhtml+xml"; otherwise null.
    /// 5. Return the result of creating an element given this, localName,
    ///    namespace, null, is, and true.
    /// ```
    pub fn create_element(&self, local_name: &str) -> Result<ElementRef, DOMException> {
        validate_name(local_name).map_err(|_| DOMException::InvalidCharacterErr)?;
        let local_name: Rc<str> = if self.is_html() {
            local_name.to_ascii_lowercase().into()
        } else {
            local_name.into()
        };
        Ok(self.new_element(local_name, self.default_element_namespace(), None))
    }

    /// Implementation of [`createElementNS`](https://dom.spec.whatwg.org/#dom-document-createelementns) method.
    pub fn create_element_ns(
        &self,
        namespace: Option<&str>,
        qname: &str,
    ) -> Result<ElementRef, DOMException> {
        let name = validate_and_extract(namespace, qname)?;
        Ok(self.new_element(name.local_name, name.namespace, name.prefix))
    }

    /// Create an element from parts that have already been validated.
    ///
    /// This is the entry point for parsers. Neither the names are checked nor
    /// is `local_name` case folded.
    pub fn create_element_raw(
        &self,
        local_name: &str,
        namespace: Option<&str>,
        prefix: Option<&str>,
    ) -> ElementRef {
        self.new_element(
            local_name.into(),
            namespace.map(Rc::from),
            prefix.map(Rc::from),
        )
    }

    /// Implementation of [`createTextNode`](https://dom.spec.whatwg.org/#dom-document-createtextnode) method.
    pub fn create_text_node(&self, data: &str) -> TextRef {
        TextRef(self.alloc(NodeKind::Text(data.to_owned())))
    }

    /// Implementation of [`createComment`](https://dom.spec.whatwg.org/#dom-document-createcomment) method.
    pub fn create_comment(&self, data: &str) -> CommentRef {
        CommentRef(self.alloc(NodeKind::Comment(data.to_owned())))
    }

    /// Implementation of [`createDocumentFragment`](https://dom.spec.whatwg.org/#dom-document-createdocumentfragment) method.
    pub fn create_document_fragment(&self) -> DocumentFragmentRef {
        DocumentFragmentRef(self.alloc(NodeKind::DocumentFragment))
    }

    /// Implementation of [`createProcessingInstruction`](https://dom.spec.whatwg.org/#dom-document-createprocessinginstruction) method.
    ///
    /// # Specification
    /// ```text
    /// 1. If target does not match the Name production, then throw an
    ///    "InvalidCharacterError" DOMException.
    /// 2. If data contains the string "?>", then throw an "InvalidCharacterError"
    ///    DOMException.
    /// 3. Return a new ProcessingInstruction node, with target set to target, data
    ///    set to data, and node document set to this.
    /// ```
    pub fn create_processing_instruction(
        &self,
        target: &str,
        data: &str,
    ) -> Result<ProcessingInstructionRef, DOMException> {
        validate_name(target).map_err(|_| DOMException::InvalidCharacterErr)?;
        if data.contains("?>") {
            return Err(DOMException::InvalidCharacterErr);
        }
        let pi = ProcessingInstructionData {
            target: target.into(),
            data: data.to_owned(),
        };
        Ok(ProcessingInstructionRef(self.alloc(
            NodeKind::ProcessingInstruction(Box::new(pi)),
        )))
    }

    /// Implementation of [`createAttribute`](https://dom.spec.whatwg.org/#dom-document-createattribute) method.
    pub fn create_attribute(&self, local_name: &str) -> Result<AttrRef, DOMException> {
        validate_name(local_name).map_err(|_| DOMException::InvalidCharacterErr)?;
        let local_name: Rc<str> = if self.is_html() {
            local_name.to_ascii_lowercase().into()
        } else {
            local_name.into()
        };
        let data = AttrData::new(local_name, None, None, String::new());
        Ok(AttrRef(self.alloc(NodeKind::Attribute(Box::new(data)))))
    }

    /// Implementation of [`createAttributeNS`](https://dom.spec.whatwg.org/#dom-document-createattributens) method.
    pub fn create_attribute_ns(
        &self,
        namespace: Option<&str>,
        qname: &str,
    ) -> Result<AttrRef, DOMException> {
        let name = validate_and_extract(namespace, qname)?;
        let data = AttrData::new(name.local_name, name.namespace, name.prefix, String::new());
        Ok(AttrRef(self.alloc(NodeKind::Attribute(Box::new(data)))))
    }

    /// Implementation of [`createEvent`](https://dom.spec.whatwg.org/#dom-document-createevent) method.
    ///
    /// Only the plain `Event` interface is supported. The returned event has
    /// to be initialized with [`Event::init_event`] before it is dispatched.
    pub fn create_event(&self, interface: &str) -> Result<Event, DOMException> {
        match interface.to_ascii_lowercase().as_str() {
            "event" | "events" | "htmlevents" => Ok(Event::uninitialized()),
            _ => Err(DOMException::NotSupportedErr),
        }
    }

    /// Implementation of [`createNodeIterator`](https://dom.spec.whatwg.org/#dom-document-createnodeiterator) method.
    pub fn create_node_iterator(
        &self,
        root: NodeRef,
        what_to_show: u32,
        filter: Option<NodeFilter>,
    ) -> NodeIterator {
        NodeIterator::new(root, what_to_show, filter)
    }

    /// Implementation of [`createTreeWalker`](https://dom.spec.whatwg.org/#dom-document-createtreewalker) method.
    pub fn create_tree_walker(
        &self,
        root: NodeRef,
        what_to_show: u32,
        filter: Option<NodeFilter>,
    ) -> TreeWalker {
        TreeWalker::new(root, what_to_show, filter)
    }

    /// Implementation of [`adoptNode`](https://dom.spec.whatwg.org/#dom-document-adoptnode) method.
    ///
    /// Attributes are returned unchanged. Other nodes are removed from their
    /// parent and moved, with all of their descendants, into this document.
    ///
    /// # Specification
    /// ```text
    /// 1. If node is a document, then throw a "NotSupportedError" DOMException.
    /// 2. If node is a shadow root, then throw a "HierarchyRequestError" DOMException.
    /// 3. If node is a DocumentFragment node whose host is non-null, then return node.
    /// 4. Adopt node into this.
    /// 5. Return node.
    /// ```
    pub fn adopt_node(&self, node: NodeRef) -> Result<NodeRef, DOMException> {
        self.0.check_arena(node.handle())?;
        let id = node.node_id();
        self.0.mutate(|tree, doc| tree.adopt_node(doc, id))?;
        Ok(node)
    }

    /// Implementation of [`importNode`](https://dom.spec.whatwg.org/#dom-document-importnode) method.
    ///
    /// `node` has to come from the same [`DOMImplementation`].
    pub fn import_node(&self, node: &NodeRef, deep: bool) -> Result<NodeRef, DOMException> {
        if node.node_type() == super::NodeType::Document {
            return Err(DOMException::NotSupportedErr);
        }
        self.0.check_arena(node.handle())?;
        self.adopt_node(node.clone_node(deep))
    }

    /// Implementation of [`doctype`](https://dom.spec.whatwg.org/#dom-document-doctype) attribute.
    pub fn doctype(&self) -> Option<DocumentTypeRef> {
        let tree = self.tree();
        let doctype = tree
            .children(self.node_id())
            .into_iter()
            .find(|&n| matches!(tree.kind(n), NodeKind::DocumentType(_)))?;
        Some(DocumentTypeRef(self.0.with_id(doctype)))
    }

    /// Implementation of [`documentElement`](https://dom.spec.whatwg.org/#dom-document-documentelement) attribute.
    pub fn document_element(&self) -> Option<ElementRef> {
        let root = self.document_element_id()?;
        Some(ElementRef(self.0.with_id(root)))
    }

    fn document_element_id(&self) -> Option<NodeId> {
        let tree = self.tree();
        tree.children(self.node_id())
            .into_iter()
            .find(|&n| tree.is_element(n))
    }

    /// The first child of the document element that is an HTML element named
    /// `name`.
    fn named_html_child(&self, name: &str) -> Option<ElementRef> {
        let root = self.document_element_id()?;
        let tree = self.tree();
        let found = tree.children(root).into_iter().find(|&n| {
            tree.element(n).is_some_and(|elem| {
                elem.namespace_uri.as_deref() == Some(HTML_NAMESPACE) && &*elem.local_name == name
            })
        })?;
        Some(ElementRef(self.0.with_id(found)))
    }

    /// Implementation of [`head`](https://html.spec.whatwg.org/multipage/dom.html#dom-document-head) attribute.
    pub fn head(&self) -> Option<ElementRef> {
        self.named_html_child("head")
    }

    /// Implementation of [`body`](https://html.spec.whatwg.org/multipage/dom.html#dom-document-body) attribute.
    pub fn body(&self) -> Option<ElementRef> {
        self.named_html_child("body")
    }

    fn title_element(&self) -> Option<ElementRef> {
        let tree = self.tree();
        let title = tree
            .inclusive_descendants(self.node_id())
            .into_iter()
            .find(|&n| tree.element(n).is_some_and(|e| &*e.qualified_name == "title"))?;
        Some(ElementRef(self.0.with_id(title)))
    }

    /// Implementation of [`title`](https://html.spec.whatwg.org/multipage/dom.html#document.title) attribute.
    ///
    /// The text of the first `title` element with whitespace stripped and
    /// collapsed, or the empty string.
    pub fn title(&self) -> String {
        let Some(title) = self.title_element() else {
            return String::new();
        };
        let value = title.text_content().unwrap_or_default();
        value
            .split(is_ascii_whitespace)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Setter of [`title`](https://html.spec.whatwg.org/multipage/dom.html#document.title) attribute.
    ///
    /// A `title` element is created in `head` if there is none. Without a
    /// `head` this does nothing.
    pub fn set_title(&self, value: &str) {
        let title = match self.title_element() {
            Some(title) => title,
            None => {
                let Some(head) = self.head() else {
                    return;
                };
                let title = self.new_element("title".into(), self.default_element_namespace(), None);
                let id = title.node_id();
                head.0.mutate(|tree, head| tree.insert_node(head, id, None));
                title
            }
        };
        title.set_text_content(Some(value));
    }

    /// Implementation of [`getElementById`](https://dom.spec.whatwg.org/#dom-nonelementparentnode-getelementbyid) method.
    ///
    /// If several connected elements share `id`, the first one in document
    /// order is returned.
    pub fn get_element_by_id(&self, id: &str) -> Option<ElementRef> {
        let found = self.tree().get_element_by_id(self.node_id(), id)?;
        Some(ElementRef(self.0.with_id(found)))
    }

    /// Implementation of [`getElementsByTagName`](https://dom.spec.whatwg.org/#dom-document-getelementsbytagname) method.
    pub fn get_elements_by_tag_name(&self, qname: &str) -> HTMLCollection {
        HTMLCollection::new(self.0.clone(), ElementFilter::tag_name(qname))
    }

    /// Implementation of [`getElementsByTagNameNS`](https://dom.spec.whatwg.org/#dom-document-getelementsbytagnamens) method.
    pub fn get_elements_by_tag_name_ns(&self, namespace: Option<&str>, local_name: &str) -> HTMLCollection {
        HTMLCollection::new(
            self.0.clone(),
            ElementFilter::tag_name_ns(namespace, local_name),
        )
    }

    /// Implementation of [`getElementsByClassName`](https://dom.spec.whatwg.org/#dom-document-getelementsbyclassname) method.
    pub fn get_elements_by_class_name(&self, class_names: &str) -> HTMLCollection {
        HTMLCollection::new(
            self.0.clone(),
            ElementFilter::ClassNames(crate::tree::names::split_tokens(class_names).into()),
        )
    }

    /// Implementation of [`getElementsByName`](https://html.spec.whatwg.org/multipage/dom.html#dom-document-getelementsbyname) method.
    pub fn get_elements_by_name(&self, name: &str) -> HTMLCollection {
        HTMLCollection::new(self.0.clone(), ElementFilter::Name(name.into()))
    }

    /// Check if this is an HTML document.
    pub fn is_html(&self) -> bool {
        self.tree().document(self.node_id()).is_html
    }

    /// Implementation of [`contentType`](https://dom.spec.whatwg.org/#dom-document-contenttype) attribute.
    pub fn content_type(&self) -> Rc<str> {
        self.tree().document(self.node_id()).content_type.clone()
    }

    /// Implementation of [`URL`](https://dom.spec.whatwg.org/#dom-document-url) attribute.
    pub fn url(&self) -> Rc<str> {
        self.tree().document(self.node_id()).address.clone()
    }

    /// Implementation of [`compatMode`](https://dom.spec.whatwg.org/#dom-document-compatmode) attribute.
    pub fn compat_mode(&self) -> &'static str {
        if self.tree().document(self.node_id()).quirks {
            "BackCompat"
        } else {
            "CSS1Compat"
        }
    }

    /// Switch quirks mode on or off. Parsers call this after seeing the
    /// doctype.
    pub fn set_quirks_mode(&self, quirks: bool) {
        let mut tree = self.0.arena().borrow_mut();
        tree.document_mut(self.node_id()).quirks = quirks;
    }

    /// Implementation of [`readyState`](https://html.spec.whatwg.org/multipage/dom.html#dom-document-readystate) attribute.
    pub fn ready_state(&self) -> DocumentReadyState {
        self.tree().document(self.node_id()).ready_state
    }

    fn set_ready_state(&self, state: DocumentReadyState) {
        let mut tree = self.0.arena().borrow_mut();
        tree.document_mut(self.node_id()).ready_state = state;
    }

    /// Implementation of [`implementation`](https://dom.spec.whatwg.org/#dom-document-implementation) attribute.
    pub fn implementation(&self) -> DOMImplementation {
        DOMImplementation::with_context(self.0.clone())
    }

    /// Implementation of [`write`](https://html.spec.whatwg.org/multipage/dynamic-markup-insertion.html#dom-document-write) method.
    ///
    /// No parser is attached to documents of this crate, so the text is
    /// discarded.
    pub fn write(&self, _text: &str) -> Result<(), DOMException> {
        if !self.is_html() {
            return Err(DOMException::InvalidStateErr);
        }
        Ok(())
    }

    /// Implementation of [`writeln`](https://html.spec.whatwg.org/multipage/dynamic-markup-insertion.html#dom-document-writeln) method.
    pub fn writeln(&self, text: &str) -> Result<(), DOMException> {
        self.write(&format!("{text}\n"))
    }

    /// Implementation of [`close`](https://html.spec.whatwg.org/multipage/dynamic-markup-insertion.html#dom-document-close) method.
    ///
    /// Finish loading: the ready state goes through `interactive` to
    /// `complete`, and `readystatechange` and `DOMContentLoaded` are
    /// dispatched to this document.
    pub fn close(&self) {
        self.set_ready_state(DocumentReadyState::Interactive);
        self.fire("readystatechange", false);
        self.fire("DOMContentLoaded", true);
        self.set_ready_state(DocumentReadyState::Complete);
        self.fire("readystatechange", false);
    }

    fn fire(&self, event_type: &str, bubbles: bool) {
        let mut event = Event::new(event_type, bubbles, false);
        // a fresh event is always dispatchable
        let _ = dispatch(&self.clone().into(), &mut event, true);
    }

    /// Install the mutation handler of this document, replacing the previous
    /// one.
    ///
    /// The handler receives one [`MutationRecord`] per change of a node
    /// connected to this document, right after the change is made.
    pub fn set_mutation_handler(&self, handler: impl FnMut(&MutationRecord) + 'static) {
        let mut tree = self.0.arena().borrow_mut();
        let data = tree.document_mut(self.node_id());
        data.mutation_handler = Some(Box::new(handler));
        data.handler_epoch += 1;
    }

    /// Remove the mutation handler of this document.
    pub fn clear_mutation_handler(&self) {
        let mut tree = self.0.arena().borrow_mut();
        let data = tree.document_mut(self.node_id());
        data.mutation_handler = None;
        data.handler_epoch += 1;
    }

    /// Find the connected node whose [`node_number`](Node::node_number) is
    /// `number`.
    pub fn node_by_number(&self, number: u32) -> Option<NodeRef> {
        let found = self.tree().node_by_number(self.node_id(), number)?;
        Some(self.0.wrap(found))
    }

    /// The number of nodes connected to this document, the document included.
    pub fn connected_count(&self) -> usize {
        self.tree().rooted_count(self.node_id())
    }

    /// Dispatch a trusted, bubbling and cancelable event of `event_type` to the
    /// connected node numbered `number`.
    ///
    /// This is how a host reports events, such as user input, that refer to
    /// nodes by number. Returns `false` if the event was canceled.
    pub fn dispatch_renderer_event(&self, number: u32, event_type: &str) -> Result<bool, DOMException> {
        let target = self
            .node_by_number(number)
            .ok_or(DOMException::NotFoundErr)?;
        let mut event = Event::new(event_type, true, true);
        dispatch(&target, &mut event, true)
    }
}

use std::rc::Rc;

use tracing::debug;

use crate::{
    globals::default_address,
    tree::{
        Tree,
        names::validate_qname,
        node::{DocumentTypeData, ElementData, NodeKind},
    },
};

use super::{
    DOMException, HTML_NAMESPACE, SVG_NAMESPACE,
    document::DocumentRef,
    document_type::DocumentTypeRef,
    node::{Arena, ArenaCell, Node, NodeConnection, NodeHandle},
};

/// Implementation of [DOMImplementation](https://dom.spec.whatwg.org/#interface-domimplementation) interface.
///
/// Every `DOMImplementation` created by [`DOMImplementation::new`] owns a
/// separate arena. Nodes can move between the documents of one
/// implementation, but not between implementations.
///
/// Nodes that can no longer be reached from any handle are freed from time to
/// time while the arena is mutated. [`collect_garbage`](Self::collect_garbage)
/// forces a collection.
#[derive(Clone)]
pub struct DOMImplementation {
    arena: Arena,
    /// The document whose `implementation` attribute returned this.
    context: Option<NodeHandle>,
}

impl DOMImplementation {
    /// Create an implementation with a fresh, empty arena.
    pub fn new() -> Self {
        Self {
            arena: Rc::new(ArenaCell::new()),
            context: None,
        }
    }

    pub(crate) fn with_context(document: NodeHandle) -> Self {
        Self {
            arena: document.arena().clone(),
            context: Some(document),
        }
    }

    /// Free every node of this arena that no handle can reach, and return
    /// how many were freed.
    ///
    /// A node is reachable while a handle to any node of its tree exists, or
    /// while it is the owner document of a reachable node. Nothing is freed
    /// when this is called from a mutation handler.
    pub fn collect_garbage(&self) -> usize {
        self.arena.collect()
    }

    /// The number of nodes currently allocated in this arena, including
    /// unreachable ones not collected yet.
    pub fn node_count(&self) -> usize {
        self.arena.borrow().live_count()
    }

    /// Implementation of [`hasFeature`](https://dom.spec.whatwg.org/#dom-domimplementation-hasfeature) method.
    ///
    /// `feature` is case-insensitive.
    ///
    /// | feature       | versions             |
    /// | ------------- |:-------------------- |
    /// | xml           | `""`, `1.0`, `2.0`   |
    /// | core          | `""`, `2.0`          |
    /// | html, xhtml   | `""`, `1.0`, `2.0`   |
    pub fn has_feature(&self, feature: &str, version: &str) -> bool {
        match feature.to_ascii_lowercase().as_str() {
            "xml" | "html" | "xhtml" => matches!(version, "" | "1.0" | "2.0"),
            "core" => matches!(version, "" | "2.0"),
            _ => false,
        }
    }

    fn new_document(&self, is_html: bool, content_type: &str) -> DocumentRef {
        let address: Rc<str> = default_address().as_ref().into();
        self.arena.maybe_collect();
        let doc = self
            .arena
            .borrow_mut()
            .create_document(is_html, address, content_type.into());
        debug!(?doc, is_html, content_type, "create document");
        DocumentRef(NodeHandle::new(self.arena.clone(), doc))
    }

    /// Implementation of [`createDocumentType`](https://dom.spec.whatwg.org/#dom-domimplementation-createdocumenttype) method.
    ///
    /// # Specification
    /// ```text
    /// The createDocumentType(name, publicId, systemId) method steps are:
    ///
    /// 1. If name is not a valid doctype name, then throw an
    ///    "InvalidCharacterError" DOMException.
    /// 2. Return a new doctype, with name as its name, publicId as its public ID,
    ///    and systemId as its system ID, and with its node document set to the
    ///    associated document of this.
    /// ```
    pub fn create_document_type(
        &self,
        qname: &str,
        public_id: &str,
        system_id: &str,
    ) -> Result<DocumentTypeRef, DOMException> {
        validate_qname(qname).map_err(|_| DOMException::InvalidCharacterErr)?;
        Ok(self.new_document_type(qname, public_id, system_id))
    }

    fn new_document_type(&self, name: &str, public_id: &str, system_id: &str) -> DocumentTypeRef {
        let data = DocumentTypeData {
            name: name.into(),
            public_id: public_id.into(),
            system_id: system_id.into(),
        };
        self.arena.maybe_collect();
        let context = self.context.as_ref().map(NodeHandle::id);
        let id = self
            .arena
            .borrow_mut()
            .alloc(NodeKind::DocumentType(Box::new(data)), context);
        DocumentTypeRef(NodeHandle::new(self.arena.clone(), id))
    }

    /// Implementation of [`createDocument`](https://dom.spec.whatwg.org/#dom-domimplementation-createdocument) method.
    ///
    /// An empty `qname` creates a document without a document element.\
    /// The content type follows `namespace`: `application/xhtml+xml` for the
    /// HTML namespace, `image/svg+xml` for SVG and `application/xml` otherwise.
    ///
    /// # Specification
    /// ```text
    /// 1. Let document be a new XMLDocument.
    /// 2. Let element be null.
    /// 3. If qualifiedName is not the empty string, then set element to the result
    ///    of running the internal createElementNS steps, given document, namespace,
    ///    qualifiedName, and an empty dictionary.
    /// 4. If doctype is non-null, append doctype to document.
    /// 5. If element is non-null, append element to document.
    /// 6. document's origin is this's associated document's origin.
    /// 7. document's content type is determined by namespace:
    ///     HTML namespace
    ///         application/xhtml+xml
    ///     SVG namespace
    ///         image/svg+xml
    ///     Any other namespace
    ///         application/xml
    /// 8. Return document.
    /// ```
    pub fn create_document(
        &self,
        namespace: Option<&str>,
        qname: &str,
        doctype: Option<DocumentTypeRef>,
    ) -> Result<DocumentRef, DOMException> {
        if let Some(doctype) = doctype.as_ref() {
            if !Rc::ptr_eq(&self.arena, doctype.handle().arena()) {
                return Err(DOMException::WrongDocumentErr);
            }
        }
        let content_type = match namespace {
            Some(HTML_NAMESPACE) => "application/xhtml+xml",
            Some(SVG_NAMESPACE) => "image/svg+xml",
            _ => "application/xml",
        };
        let doc = self.new_document(false, content_type);
        let element = if qname.is_empty() {
            None
        } else {
            Some(doc.create_element_ns(namespace, qname)?)
        };
        if let Some(doctype) = doctype {
            doc.append_child(doctype.into())?;
        }
        if let Some(element) = element {
            doc.append_child(element.into())?;
        }
        Ok(doc)
    }

    /// Implementation of [`createHTMLDocument`](https://dom.spec.whatwg.org/#dom-domimplementation-createhtmldocument) method.
    ///
    /// # Specification
    /// ```text
    /// 1. Let doc be a new document that is an HTML document.
    /// 2. Set doc's content type to "text/html".
    /// 3. Append a new doctype, with "html" as its name and with its node document
    ///    set to doc, to doc.
    /// 4. Append the result of creating an element given doc, "html", and the HTML
    ///    namespace, to doc.
    /// 5. Append the result of creating an element given doc, "head", and the HTML
    ///    namespace, to the html element created earlier.
    /// 6. If title is given:
    ///    1. Append the result of creating an element given doc, "title", and the
    ///       HTML namespace, to the head element created earlier.
    ///    2. Append a new Text node, with its data set to title (which could be the
    ///       empty string) and its node document set to doc, to the title element
    ///       created earlier.
    /// 7. Append the result of creating an element given doc, "body", and the HTML
    ///    namespace, to the html element created earlier.
    /// 8. ...
    /// 9. Return doc.
    /// ```
    pub fn create_html_document(&self, title: Option<&str>) -> DocumentRef {
        let doc = self.new_document(true, "text/html");
        doc.0.mutate(|tree, doc| {
            let html_element = |tree: &mut Tree, name: &str| {
                let data = ElementData::new(name.into(), Some(HTML_NAMESPACE.into()), None);
                tree.alloc(NodeKind::Element(Box::new(data)), Some(doc))
            };
            let doctype = DocumentTypeData {
                name: "html".into(),
                public_id: "".into(),
                system_id: "".into(),
            };
            let doctype = tree.alloc(NodeKind::DocumentType(Box::new(doctype)), Some(doc));
            tree.insert_node(doc, doctype, None);

            let html = html_element(tree, "html");
            let head = html_element(tree, "head");
            tree.insert_node(html, head, None);
            if let Some(title) = title {
                let elem = html_element(tree, "title");
                let text = tree.alloc(NodeKind::Text(title.to_owned()), Some(doc));
                tree.insert_node(elem, text, None);
                tree.insert_node(head, elem, None);
            }
            let body = html_element(tree, "body");
            tree.insert_node(html, body, None);
            tree.insert_node(doc, html, None);
        });
        doc
    }
}

impl Default for DOMImplementation {
    fn default() -> Self {
        Self::new()
    }
}

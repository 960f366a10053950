use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use crate::dom::{NodeType, event::EventTargetData};

use super::{NodeId, attribute::AttributeStore, document::DocumentData};

/// One slot of the arena.
pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    /// `None` for documents, and for document types created without a
    /// context document.
    pub(crate) owner_document: Option<NodeId>,
    pub(crate) next_sibling: NodeId,
    pub(crate) previous_sibling: NodeId,
    /// Head of the children list while the node is in list mode.
    pub(crate) first_child: Option<NodeId>,
    /// Children while the node is in indexed mode.
    pub(crate) child_nodes: Option<Vec<NodeId>>,
    /// Position in the parent's `child_nodes`. Only a hint, revalidated before
    /// use.
    pub(crate) index: Cell<usize>,
    /// Document order number while rooted.
    pub(crate) nid: Option<u32>,
    pub(crate) last_mod_time: Cell<u64>,
    pub(crate) events: Option<Box<EventTargetData>>,
}

impl NodeData {
    pub(crate) fn new(id: NodeId, kind: NodeKind, owner_document: Option<NodeId>) -> Self {
        Self {
            kind,
            parent: None,
            owner_document,
            next_sibling: id,
            previous_sibling: id,
            first_child: None,
            child_nodes: None,
            index: Cell::new(0),
            nid: None,
            last_mod_time: Cell::new(0),
            events: None,
        }
    }
}

pub(crate) enum NodeKind {
    Document(Box<DocumentData>),
    DocumentFragment,
    DocumentType(Box<DocumentTypeData>),
    Element(Box<ElementData>),
    Text(String),
    Comment(String),
    ProcessingInstruction(Box<ProcessingInstructionData>),
    Attribute(Box<AttrData>),
}

impl NodeKind {
    pub(crate) fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Document(_) => NodeType::Document,
            NodeKind::DocumentFragment => NodeType::DocumentFragment,
            NodeKind::DocumentType(_) => NodeType::DocumentType,
            NodeKind::Element(_) => NodeType::Element,
            NodeKind::Text(_) => NodeType::Text,
            NodeKind::Comment(_) => NodeType::Comment,
            NodeKind::ProcessingInstruction(_) => NodeType::ProcessingInstruction,
            NodeKind::Attribute(_) => NodeType::Attribute,
        }
    }

    /// Check if this kind of node may hold children.
    pub(crate) fn is_container(&self) -> bool {
        matches!(
            self,
            NodeKind::Document(_) | NodeKind::DocumentFragment | NodeKind::Element(_)
        )
    }

    /// The character data of Text, Comment and ProcessingInstruction.
    pub(crate) fn character_data(&self) -> Option<&str> {
        match self {
            NodeKind::Text(data) | NodeKind::Comment(data) => Some(data),
            NodeKind::ProcessingInstruction(pi) => Some(&pi.data),
            _ => None,
        }
    }

    pub(crate) fn character_data_mut(&mut self) -> Option<&mut String> {
        match self {
            NodeKind::Text(data) | NodeKind::Comment(data) => Some(data),
            NodeKind::ProcessingInstruction(pi) => Some(&mut pi.data),
            _ => None,
        }
    }
}

pub(crate) struct DocumentTypeData {
    pub(crate) name: Rc<str>,
    pub(crate) public_id: Rc<str>,
    pub(crate) system_id: Rc<str>,
}

pub(crate) struct ProcessingInstructionData {
    pub(crate) target: Rc<str>,
    pub(crate) data: String,
}

pub(crate) struct ElementData {
    pub(crate) local_name: Rc<str>,
    pub(crate) namespace_uri: Option<Rc<str>>,
    pub(crate) prefix: Option<Rc<str>>,
    pub(crate) qualified_name: Rc<str>,
    pub(crate) attributes: AttributeStore,
    /// Cached `tagName`; cleared on adoption because it depends on the
    /// document's HTML flag.
    pub(crate) tag_name: RefCell<Option<Rc<str>>>,
    /// Cached tokens of the `class` attribute.
    pub(crate) class_tokens: RefCell<Option<Rc<[Rc<str>]>>>,
}

impl ElementData {
    pub(crate) fn new(
        local_name: Rc<str>,
        namespace_uri: Option<Rc<str>>,
        prefix: Option<Rc<str>>,
    ) -> Self {
        let qualified_name = qualified_name(prefix.as_deref(), &local_name);
        Self {
            local_name,
            namespace_uri,
            prefix,
            qualified_name,
            attributes: AttributeStore::default(),
            tag_name: RefCell::new(None),
            class_tokens: RefCell::new(None),
        }
    }
}

pub(crate) struct AttrData {
    pub(crate) local_name: Rc<str>,
    pub(crate) namespace_uri: Option<Rc<str>>,
    pub(crate) prefix: Option<Rc<str>>,
    pub(crate) qualified_name: Rc<str>,
    pub(crate) value: String,
    pub(crate) owner_element: Option<NodeId>,
}

impl AttrData {
    pub(crate) fn new(
        local_name: Rc<str>,
        namespace_uri: Option<Rc<str>>,
        prefix: Option<Rc<str>>,
        value: String,
    ) -> Self {
        let qualified_name = qualified_name(prefix.as_deref(), &local_name);
        Self {
            local_name,
            namespace_uri,
            prefix,
            qualified_name,
            value,
            owner_element: None,
        }
    }
}

pub(crate) fn qualified_name(prefix: Option<&str>, local_name: &Rc<str>) -> Rc<str> {
    match prefix {
        Some(prefix) => format!("{prefix}:{local_name}").into(),
        None => local_name.clone(),
    }
}

//! Implement the node tree of the [DOM Standard](https://dom.spec.whatwg.org/).
//!
//! Every node is a cheap handle into an arena shared by all documents created
//! through one [`DOMImplementation`](dom_implementation::DOMImplementation).
//! Cloning a handle never clones the node; use
//! [`Node::clone_node`](node::Node::clone_node) for that.
//!
//! # Note
//! - There is no parser and no serializer.\
//!   Trees are built through the factory methods of [`DocumentRef`](document::DocumentRef)
//!   or through the unchecked `*_raw` entry points meant for parsers.
//! - Selector matching is delegated to an external [`SelectorEngine`](select::SelectorEngine).

pub mod attr;
pub mod character_data;
pub mod child_node;
pub mod document;
pub mod document_fragment;
pub mod document_type;
pub mod dom_implementation;
pub mod dom_token_list;
pub mod element;
pub mod event;
pub mod mutation;
pub mod named_node_map;
pub mod node;
pub mod node_list;
pub mod pi;
pub mod select;
pub mod traversal;

pub const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";
/// This is the namespace for the special xml: prefix predefined in the
/// XML Namespace specification.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
pub const MATHML_NAMESPACE: &str = "http://www.w3.org/1998/Math/MathML";
pub const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";

/// Implementation of [DOMException](https://webidl.spec.whatwg.org/#idl-DOMException)
/// restricted to the error names the node tree can raise.
///
/// Although named “Exception”,
/// it merely inherits its name from the specification and is in fact just an error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum DOMException {
    /// If an index or offset is out of range, or splits a character.
    #[error("IndexSizeError: the index is not in the allowed range")]
    IndexSizeErr = 1,
    /// If any Node is inserted somewhere it doesn't belong.
    #[error("HierarchyRequestError: the operation would yield an incorrect node tree")]
    HierarchyRequestErr = 3,
    /// If a Node is used with a tree that cannot hold it.
    #[error("WrongDocumentError: the object is in the wrong document")]
    WrongDocumentErr = 4,
    /// If an invalid or illegal character is specified, such as in an XML name.
    #[error("InvalidCharacterError: the string contains invalid characters")]
    InvalidCharacterErr = 5,
    /// If an attempt is made to reference a Node in a context where it does not exist.
    #[error("NotFoundError: the object can not be found here")]
    NotFoundErr = 8,
    /// If the implementation does not support the requested type of object or operation.
    #[error("NotSupportedError: the operation is not supported")]
    NotSupportedErr = 9,
    /// If an attempt is made to add an attribute that is already in use elsewhere.
    #[error("InUseAttributeError: the attribute is in use by another element")]
    InuseAttributeErr = 10,
    /// If an attempt is made to use an object that is not, or is no longer, usable.
    #[error("InvalidStateError: the object is in an invalid state")]
    InvalidStateErr = 11,
    /// If an invalid or illegal string is specified.
    #[error("SyntaxError: the string did not match the expected pattern")]
    SyntaxErr = 12,
    /// If an attempt is made to create or change an object in a way which is incorrect with
    /// regard to namespaces.
    #[error("NamespaceError: the operation is not allowed by Namespaces in XML")]
    NamespaceErr = 14,
}

impl DOMException {
    /// The legacy numeric code of this error.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// The error name used by the DOM Standard.
    pub fn name(self) -> &'static str {
        match self {
            Self::IndexSizeErr => "IndexSizeError",
            Self::HierarchyRequestErr => "HierarchyRequestError",
            Self::WrongDocumentErr => "WrongDocumentError",
            Self::InvalidCharacterErr => "InvalidCharacterError",
            Self::NotFoundErr => "NotFoundError",
            Self::NotSupportedErr => "NotSupportedError",
            Self::InuseAttributeErr => "InUseAttributeError",
            Self::InvalidStateErr => "InvalidStateError",
            Self::SyntaxErr => "SyntaxError",
            Self::NamespaceErr => "NamespaceError",
        }
    }
}

/// Constants `DocumentPosition` in [Interface Node](https://dom.spec.whatwg.org/#interface-node).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DocumentPosition(u16);

impl DocumentPosition {
    /// The two nodes are disconnected.\
    /// Order between disconnected nodes is always implementation-specific.
    pub const DISCONNECTED: u16 = 0x01;
    /// The second node precedes the reference node.
    pub const PRECEDING: u16 = 0x02;
    /// The node follows the reference node.
    pub const FOLLOWING: u16 = 0x04;
    /// The node contains the reference node.\
    /// A node which contains is always preceding, too.
    pub const CONTAINS: u16 = 0x08;
    /// The node is contained by the reference node.\
    /// A node which is contained is always following, too.
    pub const CONTAINED_BY: u16 = 0x10;
    /// The determination of preceding versus following is implementation-specific.
    pub const IMPLEMENTATION_SPECIFIC: u16 = 0x20;

    pub(crate) fn new() -> Self {
        DocumentPosition(0)
    }

    pub(crate) fn set_flag(mut self, flag: u16) -> Self {
        self.0 |= flag;
        self
    }

    pub fn is_same_node(self) -> bool {
        self.0 == 0
    }

    pub fn is_disconnected(self) -> bool {
        self.0 & Self::DISCONNECTED != 0
    }

    pub fn is_preceding(self) -> bool {
        self.0 & Self::PRECEDING != 0
    }

    pub fn is_following(self) -> bool {
        self.0 & Self::FOLLOWING != 0
    }

    pub fn is_contains(self) -> bool {
        self.0 & Self::CONTAINS != 0
    }

    pub fn is_contained_by(self) -> bool {
        self.0 & Self::CONTAINED_BY != 0
    }

    pub fn is_implementation_specific(self) -> bool {
        self.0 & Self::IMPLEMENTATION_SPECIFIC != 0
    }
}

impl From<DocumentPosition> for u16 {
    fn from(value: DocumentPosition) -> Self {
        value.0
    }
}

/// Constants `NodeType` in [Interface Node](https://dom.spec.whatwg.org/#interface-node).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeType {
    Element = 1,
    Attribute = 2,
    Text = 3,
    ProcessingInstruction = 7,
    Comment = 8,
    Document = 9,
    DocumentType = 10,
    DocumentFragment = 11,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exception_codes_and_names() {
        assert_eq!(DOMException::HierarchyRequestErr.code(), 3);
        assert_eq!(DOMException::NamespaceErr.code(), 14);
        assert_eq!(DOMException::InuseAttributeErr.name(), "InUseAttributeError");
        assert!(
            DOMException::NotFoundErr
                .to_string()
                .starts_with("NotFoundError")
        );
    }

    #[test]
    fn document_position_flags() {
        let pos = DocumentPosition::new()
            .set_flag(DocumentPosition::CONTAINS)
            .set_flag(DocumentPosition::PRECEDING);
        assert!(pos.is_contains() && pos.is_preceding());
        assert!(!pos.is_following());
        assert_eq!(u16::from(pos), 0x0A);
        assert!(DocumentPosition::new().is_same_node());
    }
}

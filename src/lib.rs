//! A server-side implementation of the WHATWG DOM node tree.
//!
//! Every node lives in an arena shared by all documents created through the
//! same [`DOMImplementation`](crate::dom::dom_implementation::DOMImplementation).
//! The public API in [`dom`] hands out cheap, clonable handles to those
//! nodes. Structural edits, attribute changes, id lookup, live collections,
//! traversal cursors and event dispatch all go through the handles.
//!
//! ```
//! use exdom::dom::{dom_implementation::DOMImplementation, node::Node};
//!
//! let doc = DOMImplementation::new().create_html_document(Some("title"));
//! let body = doc.body().unwrap();
//! let div = doc.create_element("div").unwrap();
//! div.set_attribute("id", "main").unwrap();
//! body.append_child(div.clone().into()).unwrap();
//! assert!(doc.get_element_by_id("main").unwrap().is_same_node(&div.into()));
//! ```

pub mod dom;
pub mod globals;
pub(crate) mod tree;

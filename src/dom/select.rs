//! The seam to an external selector engine.
//!
//! This crate does not parse selectors. `query_selector`, `query_selector_all`,
//! `matches` and `closest` hand the selector string to a [`SelectorEngine`]
//! supplied by the caller, which reads the tree through the public API.
//! [`ElementRef::next_element`] is the stepping primitive for walking a
//! subtree in tree order.

use super::{DOMException, element::ElementRef, node::NodeRef};

pub trait SelectorEngine {
    /// Every element of the subtree of `root` (excluding `root`) matching
    /// `selectors`, in tree order.
    ///
    /// An unparsable selector is a `SyntaxErr`.
    fn select(&self, selectors: &str, root: &NodeRef) -> Result<Vec<ElementRef>, DOMException>;

    /// Check if `element` matches `selectors`.
    fn matches(&self, selectors: &str, element: &ElementRef) -> Result<bool, DOMException>;
}

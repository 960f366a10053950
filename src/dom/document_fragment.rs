use super::{
    element::ElementRef,
    node::{NodeConnection, NodeHandle},
};

/// Implementation of [DocumentFragment](https://dom.spec.whatwg.org/#interface-documentfragment) interface.
///
/// Inserting a fragment inserts its children instead and leaves the fragment
/// empty.
#[derive(Clone)]
pub struct DocumentFragmentRef(pub(crate) NodeHandle);

impl DocumentFragmentRef {
    /// Implementation of [`getElementById`](https://dom.spec.whatwg.org/#dom-nonelementparentnode-getelementbyid) method.
    ///
    /// Fragments are never connected, so this walks the subtree instead of
    /// asking the id index of the document.
    pub fn get_element_by_id(&self, id: &str) -> Option<ElementRef> {
        if id.is_empty() {
            return None;
        }
        let found = {
            let tree = self.tree();
            tree.inclusive_descendants(self.node_id())
                .into_iter()
                .find(|&n| tree.element_id(n).is_some_and(|v| &*v == id))
        };
        Some(ElementRef(self.0.with_id(found?)))
    }
}

use std::rc::Rc;

use crate::tree::node::AttrData;

use super::{
    element::ElementRef,
    node::{NodeConnection, NodeHandle},
};

/// Implementation of [Attr](https://dom.spec.whatwg.org/#interface-attr) interface.
///
/// Attributes are nodes, but never children: their parent and siblings are
/// always `None`. The prefix is fixed when the attribute is created.
#[derive(Clone)]
pub struct AttrRef(pub(crate) NodeHandle);

impl AttrRef {
    fn with_data<R>(&self, f: impl FnOnce(&AttrData) -> R) -> R {
        let tree = self.tree();
        match tree.attr(self.node_id()) {
            Some(data) => f(data),
            None => unreachable!("{:?} is not an attribute", self.node_id()),
        }
    }

    /// Implementation of [`name`](https://dom.spec.whatwg.org/#dom-attr-name) attribute.
    pub fn name(&self) -> Rc<str> {
        self.with_data(|data| data.qualified_name.clone())
    }

    /// Implementation of [`localName`](https://dom.spec.whatwg.org/#dom-attr-localname) attribute.
    pub fn local_name(&self) -> Rc<str> {
        self.with_data(|data| data.local_name.clone())
    }

    /// Implementation of [`namespaceURI`](https://dom.spec.whatwg.org/#dom-attr-namespaceuri) attribute.
    pub fn namespace_uri(&self) -> Option<Rc<str>> {
        self.with_data(|data| data.namespace_uri.clone())
    }

    /// Implementation of [`prefix`](https://dom.spec.whatwg.org/#dom-attr-prefix) attribute.
    pub fn prefix(&self) -> Option<Rc<str>> {
        self.with_data(|data| data.prefix.clone())
    }

    /// Implementation of [`value`](https://dom.spec.whatwg.org/#dom-attr-value) attribute.
    pub fn value(&self) -> String {
        self.with_data(|data| data.value.clone())
    }

    /// Setter of [`value`](https://dom.spec.whatwg.org/#dom-attr-value) attribute.
    ///
    /// # Specification
    /// ```text
    /// To set an existing attribute value, given an attribute attribute and string
    /// value, run these steps:
    ///
    /// 1. If attribute's element is null, then set attribute's value to value.
    /// 2. Otherwise, change attribute to value.
    /// ```
    pub fn set_value(&self, value: &str) {
        self.0.mutate(|tree, id| tree.set_attr_value(id, value))
    }

    /// Implementation of [`ownerElement`](https://dom.spec.whatwg.org/#dom-attr-ownerelement) attribute.
    pub fn owner_element(&self) -> Option<ElementRef> {
        let owner = self.with_data(|data| data.owner_element)?;
        Some(ElementRef(self.0.with_id(owner)))
    }

    /// Implementation of [`specified`](https://dom.spec.whatwg.org/#dom-attr-specified) attribute.
    ///
    /// Always `true`.
    pub fn specified(&self) -> bool {
        true
    }
}

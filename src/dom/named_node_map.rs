use super::{
    DOMException,
    attr::AttrRef,
    element::ElementRef,
    node::{Node, NodeConnection},
};

/// Implementation of [NamedNodeMap](https://dom.spec.whatwg.org/#interface-namednodemap) interface.
///
/// A live view over the attribute list of one element, in list order.
#[derive(Clone)]
pub struct NamedNodeMap {
    element: ElementRef,
}

impl NamedNodeMap {
    pub(super) fn new(element: ElementRef) -> Self {
        Self { element }
    }

    /// Implementation of [`length`](https://dom.spec.whatwg.org/#dom-namednodemap-length) attribute.
    pub fn length(&self) -> usize {
        self.element.attribute_count()
    }

    pub fn is_empty(&self) -> bool {
        self.length() == 0
    }

    /// Implementation of [`item`](https://dom.spec.whatwg.org/#dom-namednodemap-item) method.
    pub fn item(&self, index: usize) -> Option<AttrRef> {
        let attr = self
            .element
            .tree()
            .attribute_at(self.element.node_id(), index)?;
        Some(AttrRef(self.element.handle().with_id(attr)))
    }

    /// Implementation of [`getNamedItem`](https://dom.spec.whatwg.org/#dom-namednodemap-getnameditem) method.
    pub fn get_named_item(&self, qname: &str) -> Option<AttrRef> {
        self.element.get_attribute_node(qname)
    }

    /// Implementation of [`getNamedItemNS`](https://dom.spec.whatwg.org/#dom-namednodemap-getnameditemns) method.
    pub fn get_named_item_ns(&self, namespace: Option<&str>, local_name: &str) -> Option<AttrRef> {
        self.element.get_attribute_node_ns(namespace, local_name)
    }

    /// Implementation of [`setNamedItem`](https://dom.spec.whatwg.org/#dom-namednodemap-setnameditem) method.
    pub fn set_named_item(&self, attr: AttrRef) -> Result<Option<AttrRef>, DOMException> {
        self.element.set_attribute_node(attr)
    }

    /// Implementation of [`setNamedItemNS`](https://dom.spec.whatwg.org/#dom-namednodemap-setnameditemns) method.
    pub fn set_named_item_ns(&self, attr: AttrRef) -> Result<Option<AttrRef>, DOMException> {
        self.element.set_attribute_node(attr)
    }

    /// Implementation of [`removeNamedItem`](https://dom.spec.whatwg.org/#dom-namednodemap-removenameditem) method.
    ///
    /// # Specification
    /// ```text
    /// The removeNamedItem(qualifiedName) method steps are:
    ///
    /// 1. Let attr be the result of removing an attribute given qualifiedName and
    ///    element.
    /// 2. If attr is null, then throw a "NotFoundError" DOMException.
    /// 3. Return attr.
    /// ```
    pub fn remove_named_item(&self, qname: &str) -> Result<AttrRef, DOMException> {
        let attr = self
            .get_named_item(qname)
            .ok_or(DOMException::NotFoundErr)?;
        self.element.remove_attribute_node(attr)
    }

    /// Implementation of [`removeNamedItemNS`](https://dom.spec.whatwg.org/#dom-namednodemap-removenameditemns) method.
    pub fn remove_named_item_ns(
        &self,
        namespace: Option<&str>,
        local_name: &str,
    ) -> Result<AttrRef, DOMException> {
        let attr = self
            .get_named_item_ns(namespace, local_name)
            .ok_or(DOMException::NotFoundErr)?;
        self.element.remove_attribute_node(attr)
    }

    /// The element this map belongs to.
    pub fn owner_element(&self) -> ElementRef {
        self.element.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = AttrRef> + '_ {
        (0..self.length()).filter_map(|i| self.item(i))
    }
}

impl PartialEq for NamedNodeMap {
    fn eq(&self, other: &Self) -> bool {
        self.element.is_same_node(&other.element.clone().into())
    }
}

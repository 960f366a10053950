use std::rc::Rc;

use crate::{
    globals::to_uppercase_cached,
    tree::{NodeId, Tree, names::split_tokens, node::ElementData},
};

use super::{
    DOMException,
    attr::AttrRef,
    dom_token_list::DOMTokenList,
    named_node_map::NamedNodeMap,
    node::{Node, NodeConnection, NodeHandle},
    node_list::{ElementFilter, HTMLCollection},
    select::SelectorEngine,
};

/// `tagName` of `elem`: the qualified name, uppercased for HTML elements in
/// HTML documents.
pub(crate) fn tag_name(tree: &Tree, elem: NodeId) -> Rc<str> {
    let Some(data) = tree.element(elem) else {
        unreachable!("{elem:?} is not an element");
    };
    if let Some(name) = &*data.tag_name.borrow() {
        return name.clone();
    }
    let name = if tree.is_html_element(elem) {
        to_uppercase_cached(&data.qualified_name)
    } else {
        data.qualified_name.clone()
    };
    data.tag_name.replace(Some(name.clone()));
    name
}

/// Implementation of [Element](https://dom.spec.whatwg.org/#interface-element) interface.
#[derive(Clone)]
pub struct ElementRef(pub(crate) NodeHandle);

impl ElementRef {
    /// Implementation of [`tagName`](https://dom.spec.whatwg.org/#dom-element-tagname) attribute.
    pub fn tag_name(&self) -> Rc<str> {
        tag_name(&self.tree(), self.node_id())
    }

    /// Implementation of [`localName`](https://dom.spec.whatwg.org/#dom-element-localname) attribute.
    pub fn local_name(&self) -> Rc<str> {
        self.with_data(|data| data.local_name.clone())
    }

    /// Implementation of [`namespaceURI`](https://dom.spec.whatwg.org/#dom-element-namespaceuri) attribute.
    pub fn namespace_uri(&self) -> Option<Rc<str>> {
        self.with_data(|data| data.namespace_uri.clone())
    }

    /// Implementation of [`prefix`](https://dom.spec.whatwg.org/#dom-element-prefix) attribute.
    pub fn prefix(&self) -> Option<Rc<str>> {
        self.with_data(|data| data.prefix.clone())
    }

    fn with_data<R>(&self, f: impl FnOnce(&ElementData) -> R) -> R {
        let tree = self.tree();
        match tree.element(self.node_id()) {
            Some(data) => f(data),
            None => unreachable!("{:?} is not an element", self.node_id()),
        }
    }

    /// Implementation of [`id`](https://dom.spec.whatwg.org/#dom-element-id) attribute.
    pub fn id(&self) -> String {
        self.get_attribute_ns(None, "id").unwrap_or_default()
    }

    pub fn set_id(&self, id: &str) {
        self.set_attribute_ns_raw(None, "id", id);
    }

    /// Implementation of [`className`](https://dom.spec.whatwg.org/#dom-element-classname) attribute.
    pub fn class_name(&self) -> String {
        self.get_attribute_ns(None, "class").unwrap_or_default()
    }

    pub fn set_class_name(&self, class_name: &str) {
        self.set_attribute_ns_raw(None, "class", class_name);
    }

    /// Implementation of [`classList`](https://dom.spec.whatwg.org/#dom-element-classlist) attribute.
    pub fn class_list(&self) -> DOMTokenList {
        DOMTokenList::new(self.clone())
    }

    /// Implementation of [`hasAttributes`](https://dom.spec.whatwg.org/#dom-element-hasattributes) method.
    pub fn has_attributes(&self) -> bool {
        self.tree().has_attributes(self.node_id())
    }

    /// Implementation of [`attributes`](https://dom.spec.whatwg.org/#dom-element-attributes) attribute.
    pub fn attributes(&self) -> NamedNodeMap {
        NamedNodeMap::new(self.clone())
    }

    /// Implementation of [`getAttributeNames`](https://dom.spec.whatwg.org/#dom-element-getattributenames) method.
    pub fn get_attribute_names(&self) -> Vec<Rc<str>> {
        self.tree().attribute_names(self.node_id())
    }

    /// Implementation of [`getAttribute`](https://dom.spec.whatwg.org/#dom-element-getattribute) method.
    ///
    /// # Specification
    /// ```text
    /// The getAttribute(qualifiedName) method steps are:
    ///
    /// 1. Let attr be the result of getting an attribute given qualifiedName and this.
    /// 2. If attr is null, return null.
    /// 3. Return attr's value.
    /// ```
    pub fn get_attribute(&self, qname: &str) -> Option<String> {
        self.tree().get_attribute(self.node_id(), qname)
    }

    /// Implementation of [`getAttributeNS`](https://dom.spec.whatwg.org/#dom-element-getattributens) method.
    pub fn get_attribute_ns(&self, namespace: Option<&str>, local_name: &str) -> Option<String> {
        self.tree().get_attribute_ns(self.node_id(), namespace, local_name)
    }

    /// Implementation of [`setAttribute`](https://dom.spec.whatwg.org/#dom-element-setattribute) method.
    ///
    /// # Specification
    /// ```text
    /// The setAttribute(qualifiedName, value) method steps are:
    ///
    /// 1. If qualifiedName does not match the Name production in XML, then throw an
    ///    "InvalidCharacterError" DOMException.
    /// 2. If this is in the HTML namespace and its node document is an HTML document,
    ///    then set qualifiedName to qualifiedName in ASCII lowercase.
    /// 3. Let attribute be the first attribute in this's attribute list whose
    ///    qualified name is qualifiedName, and null otherwise.
    /// 4. If attribute is null, create an attribute whose local name is qualifiedName,
    ///    value is value, and node document is this's node document, then append this
    ///    attribute to this, and then return.
    /// 5. Change attribute to value.
    /// ```
    pub fn set_attribute(&self, qname: &str, value: &str) -> Result<(), DOMException> {
        self.0.mutate(|tree, id| tree.set_attribute(id, qname, value))
    }

    /// Implementation of [`setAttributeNS`](https://dom.spec.whatwg.org/#dom-element-setattributens) method.
    ///
    /// # Specification
    /// ```text
    /// The setAttributeNS(namespace, qualifiedName, value) method steps are:
    ///
    /// 1. Let namespace, prefix, and localName be the result of passing namespace and
    ///    qualifiedName to validate and extract.
    /// 2. Set an attribute value for this using localName, value, and also prefix and
    ///    namespace.
    /// ```
    pub fn set_attribute_ns(
        &self,
        namespace: Option<&str>,
        qname: &str,
        value: &str,
    ) -> Result<(), DOMException> {
        self.0
            .mutate(|tree, id| tree.set_attribute_ns(id, namespace, qname, value))
    }

    /// Set the null namespace attribute `qname` without validation or case
    /// folding.
    ///
    /// This is the entry point for parsers that already checked the name.
    pub fn set_attribute_raw(&self, qname: &str, value: &str) {
        self.0.mutate(|tree, id| tree.set_attribute_raw(id, qname, value))
    }

    /// Set a namespaced attribute without validation. `qname` is split at its
    /// first colon.
    pub fn set_attribute_ns_raw(&self, namespace: Option<&str>, qname: &str, value: &str) {
        self.0
            .mutate(|tree, id| tree.set_attribute_ns_raw(id, namespace, qname, value))
    }

    /// Implementation of [`removeAttribute`](https://dom.spec.whatwg.org/#dom-element-removeattribute) method.
    pub fn remove_attribute(&self, qname: &str) {
        self.0.mutate(|tree, id| {
            tree.remove_attribute(id, qname);
        })
    }

    /// Implementation of [`removeAttributeNS`](https://dom.spec.whatwg.org/#dom-element-removeattributens) method.
    pub fn remove_attribute_ns(&self, namespace: Option<&str>, local_name: &str) {
        self.0.mutate(|tree, id| {
            tree.remove_attribute_ns(id, namespace, local_name);
        })
    }

    /// Implementation of [`toggleAttribute`](https://dom.spec.whatwg.org/#dom-element-toggleattribute) method.
    ///
    /// Returns whether the attribute is present afterwards.
    ///
    /// # Specification
    /// ```text
    /// The toggleAttribute(qualifiedName, force) method steps are:
    ///
    /// 1. If qualifiedName does not match the Name production in XML, then throw an
    ///    "InvalidCharacterError" DOMException.
    /// 2. If this is in the HTML namespace and its node document is an HTML document,
    ///    then set qualifiedName to qualifiedName in ASCII lowercase.
    /// 3. Let attribute be the first attribute in this's attribute list whose
    ///    qualified name is qualifiedName, and null otherwise.
    /// 4. If attribute is null:
    ///    1. If force is not given or is true, create an attribute whose local name is
    ///       qualifiedName, value is the empty string, and node document is this's node
    ///       document, then append this attribute to this, and then return true.
    ///    2. Return false.
    /// 5. Otherwise, if force is not given or is false, remove an attribute given
    ///    qualifiedName and this, and then return false.
    /// 6. Return true.
    /// ```
    pub fn toggle_attribute(&self, qname: &str, force: Option<bool>) -> Result<bool, DOMException> {
        self.0
            .mutate(|tree, id| tree.toggle_attribute(id, qname, force))
    }

    /// Implementation of [`hasAttribute`](https://dom.spec.whatwg.org/#dom-element-hasattribute) method.
    pub fn has_attribute(&self, qname: &str) -> bool {
        self.tree().get_attribute_node(self.node_id(), qname).is_some()
    }

    /// Implementation of [`hasAttributeNS`](https://dom.spec.whatwg.org/#dom-element-hasattributens) method.
    pub fn has_attribute_ns(&self, namespace: Option<&str>, local_name: &str) -> bool {
        self.tree()
            .get_attribute_node_ns(self.node_id(), namespace, local_name)
            .is_some()
    }

    /// Implementation of [`getAttributeNode`](https://dom.spec.whatwg.org/#dom-element-getattributenode) method.
    pub fn get_attribute_node(&self, qname: &str) -> Option<AttrRef> {
        let attr = self.tree().get_attribute_node(self.node_id(), qname)?;
        Some(AttrRef(self.0.with_id(attr)))
    }

    /// Implementation of [`getAttributeNodeNS`](https://dom.spec.whatwg.org/#dom-element-getattributenodens) method.
    pub fn get_attribute_node_ns(&self, namespace: Option<&str>, local_name: &str) -> Option<AttrRef> {
        let attr = self
            .tree()
            .get_attribute_node_ns(self.node_id(), namespace, local_name)?;
        Some(AttrRef(self.0.with_id(attr)))
    }

    /// Implementation of [`setAttributeNode`](https://dom.spec.whatwg.org/#dom-element-setattributenode) method.
    ///
    /// The attribute with the same namespace and local name is displaced and
    /// returned. The new attribute takes its place in the list.
    ///
    /// # Specification
    /// ```text
    /// To set an attribute given an attr and element, run these steps:
    ///
    /// 1. If attr's element is neither null nor element, throw an "InUseAttributeError"
    ///    DOMException.
    /// 2. Let oldAttr be the result of getting an attribute given attr's namespace,
    ///    attr's local name, and element.
    /// 3. If oldAttr is attr, return attr.
    /// 4. If oldAttr is non-null, then replace oldAttr with attr.
    /// 5. Otherwise, append attr to element.
    /// 6. Return oldAttr.
    /// ```
    pub fn set_attribute_node(&self, attr: AttrRef) -> Result<Option<AttrRef>, DOMException> {
        self.0.check_arena(&attr.0)?;
        let old = self
            .0
            .mutate(|tree, id| tree.set_attribute_node(id, attr.node_id()))?;
        Ok(old.map(|old| AttrRef(self.0.with_id(old))))
    }

    /// Implementation of [`setAttributeNodeNS`](https://dom.spec.whatwg.org/#dom-element-setattributenodens) method.
    ///
    /// Same as [`set_attribute_node`](ElementRef::set_attribute_node).
    pub fn set_attribute_node_ns(&self, attr: AttrRef) -> Result<Option<AttrRef>, DOMException> {
        self.set_attribute_node(attr)
    }

    /// Implementation of [`removeAttributeNode`](https://dom.spec.whatwg.org/#dom-element-removeattributenode) method.
    pub fn remove_attribute_node(&self, attr: AttrRef) -> Result<AttrRef, DOMException> {
        if !self.0.same_arena(&attr.0) {
            return Err(DOMException::NotFoundErr);
        }
        self.0
            .mutate(|tree, id| tree.remove_attribute_node(id, attr.node_id()))?;
        Ok(attr)
    }

    /// Implementation of [`getElementsByTagName`](https://dom.spec.whatwg.org/#dom-element-getelementsbytagname) method.
    pub fn get_elements_by_tag_name(&self, qname: &str) -> HTMLCollection {
        HTMLCollection::new(self.0.clone(), ElementFilter::tag_name(qname))
    }

    /// Implementation of [`getElementsByTagNameNS`](https://dom.spec.whatwg.org/#dom-element-getelementsbytagnamens) method.
    pub fn get_elements_by_tag_name_ns(&self, namespace: Option<&str>, local_name: &str) -> HTMLCollection {
        HTMLCollection::new(
            self.0.clone(),
            ElementFilter::tag_name_ns(namespace, local_name),
        )
    }

    /// Implementation of [`getElementsByClassName`](https://dom.spec.whatwg.org/#dom-element-getelementsbyclassname) method.
    pub fn get_elements_by_class_name(&self, class_names: &str) -> HTMLCollection {
        HTMLCollection::new(
            self.0.clone(),
            ElementFilter::ClassNames(split_tokens(class_names).into()),
        )
    }

    /// The element following this one in tree order, staying inside `root`.
    ///
    /// Selector engines walk subtrees with this.
    pub fn next_element(&self, root: &impl Node) -> Option<ElementRef> {
        if !self.0.same_arena(root.handle()) {
            return None;
        }
        let next = {
            let tree = self.tree();
            let root = root.node_id();
            let mut cur = tree.following(self.node_id(), root);
            while let Some(n) = cur.filter(|&n| !tree.is_element(n)) {
                cur = tree.following(n, root);
            }
            cur
        };
        Some(ElementRef(self.0.with_id(next?)))
    }

    /// Implementation of [`matches`](https://dom.spec.whatwg.org/#dom-element-matches) method.
    pub fn matches(&self, engine: &dyn SelectorEngine, selectors: &str) -> Result<bool, DOMException> {
        engine.matches(selectors, self)
    }

    /// Implementation of [`closest`](https://dom.spec.whatwg.org/#dom-element-closest) method.
    ///
    /// # Specification
    /// ```text
    /// The closest(selectors) method steps are:
    ///
    /// 1. Let s be the result of parse a selector from selectors.
    /// 2. If s is failure, then throw a "SyntaxError" DOMException.
    /// 3. Let elements be this's inclusive ancestors that are elements, in reverse
    ///    tree order.
    /// 4. For each element in elements, if match a selector against an element, using
    ///    s, element, and scoping root this, returns success, return element.
    /// 5. Return null.
    /// ```
    pub fn closest(
        &self,
        engine: &dyn SelectorEngine,
        selectors: &str,
    ) -> Result<Option<ElementRef>, DOMException> {
        let mut cur = Some(self.clone());
        while let Some(elem) = cur {
            if engine.matches(selectors, &elem)? {
                return Ok(Some(elem));
            }
            cur = elem.parent_element();
        }
        Ok(None)
    }

    /// The number of attributes of this element.
    pub(crate) fn attribute_count(&self) -> usize {
        self.tree().attribute_count(self.node_id())
    }
}

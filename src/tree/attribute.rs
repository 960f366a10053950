//! Attribute storage of elements.
//!
//! The ordered entry list keyed by `(namespace, local name)` is the only
//! source of truth. Lookups by qualified name go through an index derived
//! from it, built on first use and thrown away on every add or remove.
//! Qualified names may collide across namespaces; such lookups see the first
//! entry in list order.

use std::{borrow::Cow, cell::RefCell, collections::HashMap, rc::Rc};

use crate::dom::{DOMException, HTML_NAMESPACE};

use super::{
    NodeId, Tree,
    names::{split_qname, split_tokens, validate_and_extract, validate_name},
    node::{AttrData, NodeKind},
};

#[derive(Debug, Clone)]
struct AttrEntry {
    namespace: Option<Rc<str>>,
    local_name: Rc<str>,
    qualified_name: Rc<str>,
    attr: NodeId,
}

#[derive(Debug, Default)]
pub(crate) struct AttributeStore {
    entries: Vec<AttrEntry>,
    by_qname: RefCell<Option<HashMap<Rc<str>, usize>>>,
}

impl AttributeStore {
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn get(&self, index: usize) -> Option<NodeId> {
        self.entries.get(index).map(|e| e.attr)
    }

    pub(crate) fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries.iter().map(|e| e.attr)
    }

    pub(crate) fn qualified_names(&self) -> impl Iterator<Item = Rc<str>> + '_ {
        self.entries.iter().map(|e| e.qualified_name.clone())
    }

    pub(crate) fn position(&self, attr: NodeId) -> Option<usize> {
        self.entries.iter().position(|e| e.attr == attr)
    }

    pub(crate) fn find_ns(&self, namespace: Option<&str>, local_name: &str) -> Option<NodeId> {
        self.entries
            .iter()
            .find(|e| e.namespace.as_deref() == namespace && &*e.local_name == local_name)
            .map(|e| e.attr)
    }

    /// The first attribute in list order whose qualified name is `qname`.
    pub(crate) fn find_qname(&self, qname: &str) -> Option<NodeId> {
        let mut index = self.by_qname.borrow_mut();
        let index = index.get_or_insert_with(|| {
            let mut map = HashMap::with_capacity(self.entries.len());
            for (i, e) in self.entries.iter().enumerate() {
                map.entry(e.qualified_name.clone()).or_insert(i);
            }
            map
        });
        index.get(qname).map(|&i| self.entries[i].attr)
    }

    fn insert(&mut self, index: usize, entry: AttrEntry) {
        self.entries.insert(index, entry);
        self.by_qname.replace(None);
    }

    fn remove(&mut self, index: usize) -> NodeId {
        let entry = self.entries.remove(index);
        self.by_qname.replace(None);
        entry.attr
    }
}

/// Bookkeeping run when a null namespace, unprefixed attribute is added,
/// changed or removed.
type ChangeHandler = fn(&mut Tree, NodeId, Option<&str>, Option<&str>);

fn change_handler(local_name: &str) -> Option<ChangeHandler> {
    match local_name {
        "id" => Some(id_changed),
        "class" => Some(class_changed),
        _ => None,
    }
}

fn id_changed(tree: &mut Tree, elem: NodeId, old: Option<&str>, new: Option<&str>) {
    if !tree.is_rooted(elem) {
        return;
    }
    let Some(doc) = tree.node_document(elem) else {
        return;
    };
    if let Some(old) = old {
        tree.del_id(doc, old, elem);
    }
    if let Some(new) = new {
        tree.add_id(doc, new, elem);
    }
}

fn class_changed(tree: &mut Tree, elem: NodeId, _: Option<&str>, _: Option<&str>) {
    if let Some(elem) = tree.element(elem) {
        elem.class_tokens.replace(None);
    }
}

impl Tree {
    /// Check if `elem` is an HTML element in an HTML document.
    pub(crate) fn is_html_element(&self, elem: NodeId) -> bool {
        let Some(data) = self.element(elem) else {
            return false;
        };
        data.namespace_uri.as_deref() == Some(HTML_NAMESPACE)
            && self
                .node_document(elem)
                .is_some_and(|doc| self.document(doc).is_html)
    }

    fn attribute_lookup_name<'a>(&self, elem: NodeId, qname: &'a str) -> Cow<'a, str> {
        if self.is_html_element(elem) && qname.bytes().any(|b| b.is_ascii_uppercase()) {
            Cow::Owned(qname.to_ascii_lowercase())
        } else {
            Cow::Borrowed(qname)
        }
    }

    fn attributes(&self, elem: NodeId) -> Option<&AttributeStore> {
        self.element(elem).map(|e| &e.attributes)
    }

    pub(crate) fn get_attribute_node(&self, elem: NodeId, qname: &str) -> Option<NodeId> {
        let qname = self.attribute_lookup_name(elem, qname);
        self.attributes(elem)?.find_qname(&qname)
    }

    pub(crate) fn get_attribute_node_ns(
        &self,
        elem: NodeId,
        namespace: Option<&str>,
        local_name: &str,
    ) -> Option<NodeId> {
        let namespace = namespace.filter(|ns| !ns.is_empty());
        self.attributes(elem)?.find_ns(namespace, local_name)
    }

    pub(crate) fn attr_value(&self, attr: NodeId) -> Option<&str> {
        self.attr(attr).map(|a| a.value.as_str())
    }

    pub(crate) fn get_attribute(&self, elem: NodeId, qname: &str) -> Option<String> {
        let attr = self.get_attribute_node(elem, qname)?;
        self.attr_value(attr).map(str::to_owned)
    }

    pub(crate) fn get_attribute_ns(
        &self,
        elem: NodeId,
        namespace: Option<&str>,
        local_name: &str,
    ) -> Option<String> {
        let attr = self.get_attribute_node_ns(elem, namespace, local_name)?;
        self.attr_value(attr).map(str::to_owned)
    }

    /// Checked `setAttribute`.
    pub(crate) fn set_attribute(
        &mut self,
        elem: NodeId,
        qname: &str,
        value: &str,
    ) -> Result<(), DOMException> {
        validate_name(qname).map_err(|_| DOMException::InvalidCharacterErr)?;
        let qname = self.attribute_lookup_name(elem, qname).into_owned();
        self.set_attribute_raw(elem, &qname, value);
        Ok(())
    }

    /// `setAttribute` without name validation or case folding.
    ///
    /// The attribute in the null namespace whose local name is `qname` is
    /// updated or created. Attributes of other namespaces that happen to have
    /// the same qualified name are never touched.
    pub(crate) fn set_attribute_raw(&mut self, elem: NodeId, qname: &str, value: &str) {
        self.set_attribute_parts(elem, None, None, qname.into(), value);
    }

    /// Checked `setAttributeNS`.
    pub(crate) fn set_attribute_ns(
        &mut self,
        elem: NodeId,
        namespace: Option<&str>,
        qname: &str,
        value: &str,
    ) -> Result<(), DOMException> {
        let name = validate_and_extract(namespace, qname)?;
        self.set_attribute_parts(elem, name.namespace, name.prefix, name.local_name, value);
        Ok(())
    }

    /// `setAttributeNS` without validation.
    pub(crate) fn set_attribute_ns_raw(
        &mut self,
        elem: NodeId,
        namespace: Option<&str>,
        qname: &str,
        value: &str,
    ) {
        let namespace = namespace.filter(|ns| !ns.is_empty()).map(Rc::from);
        let (prefix, local_name) = split_qname(qname);
        self.set_attribute_parts(elem, namespace, prefix.map(Rc::from), local_name.into(), value);
    }

    fn set_attribute_parts(
        &mut self,
        elem: NodeId,
        namespace: Option<Rc<str>>,
        prefix: Option<Rc<str>>,
        local_name: Rc<str>,
        value: &str,
    ) {
        let Some(store) = self.attributes(elem) else {
            return;
        };
        // the prefix of an existing attribute is kept as it is
        if let Some(attr) = store.find_ns(namespace.as_deref(), &local_name) {
            self.set_attr_value(attr, value);
            return;
        }
        let owner = self.node(elem).owner_document;
        let data = AttrData::new(local_name, namespace, prefix, value.to_owned());
        let attr = self.alloc(NodeKind::Attribute(Box::new(data)), owner);
        let at = self.attributes(elem).map_or(0, |s| s.len());
        self.attach_attr(elem, attr, at);
    }

    /// Update the value of `attr`, running the change hook and notifying the
    /// mutation handler if the value actually changes.
    pub(crate) fn set_attr_value(&mut self, attr: NodeId, value: &str) {
        let Some(data) = self.attr_mut(attr) else {
            return;
        };
        if data.value == value {
            return;
        }
        let old = std::mem::replace(&mut data.value, value.to_owned());
        let Some(elem) = data.owner_element else {
            return;
        };
        self.run_change_handler(attr, elem, Some(&old), Some(value));
        self.modify(elem);
        if self.is_rooted(elem) {
            self.mutate_attr(elem, attr, Some(old));
        }
    }

    fn run_change_handler(&mut self, attr: NodeId, elem: NodeId, old: Option<&str>, new: Option<&str>) {
        let Some(data) = self.attr(attr) else {
            return;
        };
        if data.namespace_uri.is_some() || data.prefix.is_some() {
            return;
        }
        if let Some(handler) = change_handler(&data.local_name) {
            handler(self, elem, old, new);
        }
    }

    fn attach_attr(&mut self, elem: NodeId, attr: NodeId, at: usize) {
        let Some(data) = self.attr_mut(attr) else {
            return;
        };
        data.owner_element = Some(elem);
        let entry = AttrEntry {
            namespace: data.namespace_uri.clone(),
            local_name: data.local_name.clone(),
            qualified_name: data.qualified_name.clone(),
            attr,
        };
        let value = data.value.clone();
        if let Some(elem) = self.element_mut(elem) {
            elem.attributes.insert(at, entry);
        }
        self.run_change_handler(attr, elem, None, Some(&value));
        self.modify(elem);
        if self.is_rooted(elem) {
            self.mutate_attr(elem, attr, None);
        }
    }

    fn detach_attr(&mut self, elem: NodeId, at: usize) -> NodeId {
        let attr = match self.element_mut(elem) {
            Some(data) => data.attributes.remove(at),
            None => unreachable!("{elem:?} is not an element"),
        };
        let value = match self.attr_mut(attr) {
            Some(data) => {
                data.owner_element = None;
                data.value.clone()
            }
            None => unreachable!("{attr:?} is not an attribute"),
        };
        self.run_change_handler(attr, elem, Some(&value), None);
        self.modify(elem);
        if self.is_rooted(elem) {
            self.mutate_remove_attr(elem, attr);
        }
        attr
    }

    fn remove_attribute_at(&mut self, elem: NodeId, attr: NodeId) -> Option<NodeId> {
        let at = self.attributes(elem)?.position(attr)?;
        Some(self.detach_attr(elem, at))
    }

    /// Remove the first attribute whose qualified name is `qname`.
    pub(crate) fn remove_attribute(&mut self, elem: NodeId, qname: &str) -> Option<NodeId> {
        let attr = self.get_attribute_node(elem, qname)?;
        self.remove_attribute_at(elem, attr)
    }

    pub(crate) fn remove_attribute_ns(
        &mut self,
        elem: NodeId,
        namespace: Option<&str>,
        local_name: &str,
    ) -> Option<NodeId> {
        let attr = self.get_attribute_node_ns(elem, namespace, local_name)?;
        self.remove_attribute_at(elem, attr)
    }

    pub(crate) fn remove_attribute_node(
        &mut self,
        elem: NodeId,
        attr: NodeId,
    ) -> Result<NodeId, DOMException> {
        if self.attr(attr).and_then(|a| a.owner_element) != Some(elem) {
            return Err(DOMException::NotFoundErr);
        }
        self.remove_attribute_at(elem, attr)
            .ok_or(DOMException::NotFoundErr)
    }

    /// Attach `attr` to `elem`, displacing the attribute with the same
    /// namespace and local name.
    ///
    /// The displaced attribute keeps its position in the list for the new one.
    pub(crate) fn set_attribute_node(
        &mut self,
        elem: NodeId,
        attr: NodeId,
    ) -> Result<Option<NodeId>, DOMException> {
        let Some(data) = self.attr(attr) else {
            return Err(DOMException::HierarchyRequestErr);
        };
        match data.owner_element {
            Some(owner) if owner == elem => return Ok(Some(attr)),
            Some(_) => return Err(DOMException::InuseAttributeErr),
            None => {}
        }
        let namespace = data.namespace_uri.clone();
        let local_name = data.local_name.clone();
        let Some(store) = self.attributes(elem) else {
            return Err(DOMException::HierarchyRequestErr);
        };
        let len = store.len();
        let old = store.find_ns(namespace.as_deref(), &local_name);
        match old.and_then(|old| Some((old, store.position(old)?))) {
            Some((old, at)) => {
                self.detach_attr(elem, at);
                self.attach_attr(elem, attr, at);
                Ok(Some(old))
            }
            None => {
                self.attach_attr(elem, attr, len);
                Ok(None)
            }
        }
    }

    pub(crate) fn toggle_attribute(
        &mut self,
        elem: NodeId,
        qname: &str,
        force: Option<bool>,
    ) -> Result<bool, DOMException> {
        validate_name(qname).map_err(|_| DOMException::InvalidCharacterErr)?;
        let qname = self.attribute_lookup_name(elem, qname).into_owned();
        match self.attributes(elem).and_then(|s| s.find_qname(&qname)) {
            None if force == Some(false) => Ok(false),
            None => {
                self.set_attribute_raw(elem, &qname, "");
                Ok(true)
            }
            Some(_) if force == Some(true) => Ok(true),
            Some(attr) => {
                self.remove_attribute_at(elem, attr);
                Ok(false)
            }
        }
    }

    /// The tokens of the null namespace `class` attribute of `elem`, cached
    /// until the attribute changes.
    pub(crate) fn class_tokens(&self, elem: NodeId) -> Rc<[Rc<str>]> {
        let Some(data) = self.element(elem) else {
            return Rc::from([]);
        };
        if let Some(tokens) = &*data.class_tokens.borrow() {
            return tokens.clone();
        }
        let tokens: Rc<[Rc<str>]> = data
            .attributes
            .find_ns(None, "class")
            .and_then(|attr| self.attr_value(attr))
            .map(split_tokens)
            .unwrap_or_default()
            .into();
        data.class_tokens.replace(Some(tokens.clone()));
        tokens
    }

    pub(crate) fn attribute_names(&self, elem: NodeId) -> Vec<Rc<str>> {
        self.attributes(elem)
            .map(|s| s.qualified_names().collect())
            .unwrap_or_default()
    }

    pub(crate) fn has_attributes(&self, elem: NodeId) -> bool {
        self.attributes(elem).is_some_and(|s| !s.is_empty())
    }

    pub(crate) fn attribute_count(&self, elem: NodeId) -> usize {
        self.attributes(elem).map_or(0, |s| s.len())
    }

    pub(crate) fn attribute_at(&self, elem: NodeId, index: usize) -> Option<NodeId> {
        self.attributes(elem)?.get(index)
    }

    /// Copy every attribute of `from` onto the fresh element `to`, without
    /// hooks or notifications.
    pub(crate) fn clone_attributes(&mut self, from: NodeId, to: NodeId) {
        let attrs = self
            .attributes(from)
            .map(|s| s.ids().collect::<Vec<_>>())
            .unwrap_or_default();
        let owner = self.node(to).owner_document;
        for attr in attrs {
            let Some(data) = self.attr(attr) else {
                continue;
            };
            let mut copy = AttrData::new(
                data.local_name.clone(),
                data.namespace_uri.clone(),
                data.prefix.clone(),
                data.value.clone(),
            );
            copy.owner_element = Some(to);
            let namespace = copy.namespace_uri.clone();
            let local_name = copy.local_name.clone();
            let qualified_name = copy.qualified_name.clone();
            let copy = self.alloc(NodeKind::Attribute(Box::new(copy)), owner);
            if let Some(elem) = self.element_mut(to) {
                let at = elem.attributes.len();
                let entry = AttrEntry {
                    namespace,
                    local_name,
                    qualified_name,
                    attr: copy,
                };
                elem.attributes.insert(at, entry);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::node::ElementData;

    fn setup(is_html: bool) -> (Tree, NodeId) {
        let mut tree = Tree::new();
        let doc = tree.create_document(is_html, "about:blank".into(), "text/html".into());
        let ns = is_html.then(|| Rc::from(HTML_NAMESPACE));
        let data = ElementData::new("div".into(), ns, None);
        let elem = tree.alloc(NodeKind::Element(Box::new(data)), Some(doc));
        (tree, elem)
    }

    #[test]
    fn qname_and_namespace_do_not_mix() {
        let (mut tree, elem) = setup(false);
        tree.set_attribute_ns(elem, Some("urn:a"), "p:x", "1").unwrap();
        tree.set_attribute(elem, "p:x", "2").unwrap();
        assert_eq!(tree.get_attribute(elem, "p:x").as_deref(), Some("1"));
        assert_eq!(tree.get_attribute_ns(elem, Some("urn:a"), "x").as_deref(), Some("1"));
        assert_eq!(tree.get_attribute_ns(elem, None, "p:x").as_deref(), Some("2"));
        assert_eq!(tree.attribute_count(elem), 2);

        // removal by qname sees the first match only
        tree.remove_attribute(elem, "p:x");
        assert_eq!(tree.get_attribute(elem, "p:x").as_deref(), Some("2"));
        assert!(tree.get_attribute_ns(elem, Some("urn:a"), "x").is_none());
    }

    #[test]
    fn html_elements_fold_names() {
        let (mut tree, elem) = setup(true);
        tree.set_attribute(elem, "DATA-X", "v").unwrap();
        assert_eq!(tree.get_attribute(elem, "data-x").as_deref(), Some("v"));
        assert_eq!(tree.get_attribute(elem, "Data-X").as_deref(), Some("v"));
        assert_eq!(&*tree.attribute_names(elem)[0], "data-x");
        // the namespace aware accessors never fold
        assert!(tree.get_attribute_ns(elem, None, "DATA-X").is_none());
    }

    #[test]
    fn invalid_names_are_rejected() {
        let (mut tree, elem) = setup(false);
        assert_eq!(
            tree.set_attribute(elem, "1bad", "v"),
            Err(DOMException::InvalidCharacterErr)
        );
        assert_eq!(tree.attribute_count(elem), 0);
        // the raw entry point trusts its caller
        tree.set_attribute_raw(elem, "1bad", "v");
        assert_eq!(tree.get_attribute(elem, "1bad").as_deref(), Some("v"));
    }

    #[test]
    fn toggle() {
        let (mut tree, elem) = setup(false);
        assert_eq!(tree.toggle_attribute(elem, "hidden", None), Ok(true));
        assert_eq!(tree.get_attribute(elem, "hidden").as_deref(), Some(""));
        assert_eq!(tree.toggle_attribute(elem, "hidden", Some(true)), Ok(true));
        assert_eq!(tree.toggle_attribute(elem, "hidden", None), Ok(false));
        assert_eq!(tree.toggle_attribute(elem, "hidden", Some(false)), Ok(false));
        assert_eq!(tree.attribute_count(elem), 0);
    }

    #[test]
    fn set_attribute_node_displaces_in_place() {
        let (mut tree, elem) = setup(false);
        tree.set_attribute(elem, "a", "1").unwrap();
        tree.set_attribute(elem, "b", "2").unwrap();
        let old = tree.get_attribute_node(elem, "a").unwrap();
        let new = tree.alloc(
            NodeKind::Attribute(Box::new(AttrData::new("a".into(), None, None, "3".into()))),
            None,
        );
        assert_eq!(tree.set_attribute_node(elem, new), Ok(Some(old)));
        assert_eq!(tree.attribute_at(elem, 0), Some(new));
        assert_eq!(tree.attr(old).unwrap().owner_element, None);
        assert_eq!(tree.set_attribute_node(elem, new), Ok(Some(new)));

        // an attribute owned by another element is in use
        let other_elem = tree.alloc(
            NodeKind::Element(Box::new(ElementData::new("p".into(), None, None))),
            None,
        );
        assert_eq!(
            tree.set_attribute_node(other_elem, new),
            Err(DOMException::InuseAttributeErr)
        );
        assert_eq!(
            tree.remove_attribute_node(other_elem, new),
            Err(DOMException::NotFoundErr)
        );
        assert_eq!(tree.remove_attribute_node(elem, new), Ok(new));
    }
}

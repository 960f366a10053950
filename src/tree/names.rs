//! Name productions and namespace checks.

use std::rc::Rc;

use crate::dom::{DOMException, XML_NAMESPACE, XMLNS_NAMESPACE};

use super::{NodeId, Tree, node::NodeKind};

fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | 'A'..='Z' | '_' | 'a'..='z'
        | '\u{C0}'..='\u{D6}'
        | '\u{D8}'..='\u{F6}'
        | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}'
        | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}'
    )
}

fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}'
        )
}

/// Check if `value` matches the `Name` production of XML 1.0 (Fifth Edition).
pub fn validate_name(value: &str) -> Result<(), &'static str> {
    // First quick algorithm for ASCII range
    let ascii = value.strip_prefix(|c: char| c.is_ascii_alphabetic() || c == '_' || c == ':');
    if let Some(rem) = ascii {
        let rem = rem.trim_start_matches(|c: char| {
            c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
        });
        if rem.is_empty() {
            return Ok(());
        }
    }

    // Second check for chars outside the ASCII range
    let Some(rem) = value.strip_prefix(is_name_start_char) else {
        return Err("Invalid Name");
    };
    if rem.chars().all(is_name_char) {
        Ok(())
    } else {
        Err("Invalid Name")
    }
}

/// Check if `value` matches the `NCName` production of Namespaces in XML.
pub fn validate_ncname(value: &str) -> Result<(), &'static str> {
    if value.contains(':') || validate_name(value).is_err() {
        return Err("Invalid NCName");
    }
    Ok(())
}

/// Check if `value` matches the `QName` production of Namespaces in XML.
pub fn validate_qname(value: &str) -> Result<(), &'static str> {
    match value.split_once(':') {
        Some((prefix, local)) => {
            if validate_ncname(prefix).is_err() || validate_ncname(local).is_err() {
                return Err("Invalid QName");
            }
            Ok(())
        }
        None => validate_ncname(value).map_err(|_| "Invalid QName"),
    }
}

/// Split `qname` into its prefix and local part.
///
/// No validation is performed: `"a:b:c"` is split at the first colon.
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qname),
    }
}

/// Namespace, prefix and local name checked for use on an element or an
/// attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExtractedName {
    pub(crate) namespace: Option<Rc<str>>,
    pub(crate) prefix: Option<Rc<str>>,
    pub(crate) local_name: Rc<str>,
}

/// Validate and extract a namespace and a qualified name.
///
/// The empty string namespace is the null namespace.
pub(crate) fn validate_and_extract(
    namespace: Option<&str>,
    qname: &str,
) -> Result<ExtractedName, DOMException> {
    let namespace = namespace.filter(|ns| !ns.is_empty());
    validate_qname(qname).map_err(|_| DOMException::InvalidCharacterErr)?;
    let (prefix, local_name) = split_qname(qname);

    if prefix.is_some() && namespace.is_none() {
        return Err(DOMException::NamespaceErr);
    }
    if prefix == Some("xml") && namespace != Some(XML_NAMESPACE) {
        return Err(DOMException::NamespaceErr);
    }
    let is_xmlns = prefix == Some("xmlns") || qname == "xmlns";
    if is_xmlns != (namespace == Some(XMLNS_NAMESPACE)) {
        return Err(DOMException::NamespaceErr);
    }

    Ok(ExtractedName {
        namespace: namespace.map(Rc::from),
        prefix: prefix.map(Rc::from),
        local_name: local_name.into(),
    })
}

/// ASCII whitespace as defined by the Infra standard.
pub(crate) fn is_ascii_whitespace(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\u{C}' | '\r' | ' ')
}

/// Split `value` on ASCII whitespace into an ordered set of tokens.
pub(crate) fn split_tokens(value: &str) -> Vec<Rc<str>> {
    let mut tokens: Vec<Rc<str>> = vec![];
    for token in value.split(is_ascii_whitespace).filter(|t| !t.is_empty()) {
        if !tokens.iter().any(|t| &**t == token) {
            tokens.push(token.into());
        }
    }
    tokens
}

impl Tree {
    /// The element a namespace lookup on `id` starts from.
    fn lookup_start(&self, id: NodeId) -> Option<NodeId> {
        match self.kind(id) {
            NodeKind::Element(_) => Some(id),
            NodeKind::Document(_) => self
                .children(id)
                .into_iter()
                .find(|&n| self.is_element(n)),
            NodeKind::DocumentType(_) | NodeKind::DocumentFragment => None,
            NodeKind::Attribute(attr) => attr.owner_element,
            _ => self.parent_element(id),
        }
    }

    /// Find the namespace bound to `prefix` in scope of `id`.
    ///
    /// `None` looks up the default namespace.
    pub(crate) fn locate_namespace(&self, id: NodeId, prefix: Option<&str>) -> Option<Rc<str>> {
        let mut cur = self.lookup_start(id);
        while let Some(elem) = cur {
            let data = self.element(elem)?;
            match prefix {
                Some("xml") => return Some(XML_NAMESPACE.into()),
                Some("xmlns") => return Some(XMLNS_NAMESPACE.into()),
                _ => {}
            }
            if data.namespace_uri.is_some() && data.prefix.as_deref() == prefix {
                return data.namespace_uri.clone();
            }
            let decl = data.attributes.ids().filter_map(|a| self.attr(a)).find(|attr| {
                attr.namespace_uri.as_deref() == Some(XMLNS_NAMESPACE)
                    && match prefix {
                        Some(prefix) => attr.prefix.as_deref() == Some("xmlns") && &*attr.local_name == prefix,
                        None => attr.prefix.is_none() && &*attr.local_name == "xmlns",
                    }
            });
            if let Some(decl) = decl {
                return (!decl.value.is_empty()).then(|| decl.value.as_str().into());
            }
            cur = self.parent_element(elem);
        }
        None
    }

    /// Find a prefix bound to `namespace` in scope of `id`.
    pub(crate) fn lookup_prefix(&self, id: NodeId, namespace: Option<&str>) -> Option<Rc<str>> {
        let namespace = namespace.filter(|ns| !ns.is_empty())?;
        let mut cur = self.lookup_start(id);
        while let Some(elem) = cur {
            let data = self.element(elem)?;
            if data.namespace_uri.as_deref() == Some(namespace) && data.prefix.is_some() {
                return data.prefix.clone();
            }
            let decl = data.attributes.ids().filter_map(|a| self.attr(a)).find(|attr| {
                attr.prefix.as_deref() == Some("xmlns") && attr.value == namespace
            });
            if let Some(decl) = decl {
                return Some(decl.local_name.clone());
            }
            cur = self.parent_element(elem);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_productions() {
        assert!(validate_name("div").is_ok());
        assert!(validate_name(":a-b.c_1").is_ok());
        assert!(validate_name("\u{3042}\u{3044}").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("1abc").is_err());
        assert!(validate_name("a b").is_err());
        assert!(validate_name("-a").is_err());

        assert!(validate_ncname("svg").is_ok());
        assert!(validate_ncname("a:b").is_err());

        assert!(validate_qname("svg:g").is_ok());
        assert!(validate_qname("g").is_ok());
        assert!(validate_qname(":g").is_err());
        assert!(validate_qname("svg:").is_err());
        assert!(validate_qname("a:b:c").is_err());
    }

    #[test]
    fn extract_rules() {
        let ns = "urn:x";
        let name = validate_and_extract(Some(ns), "p:x").unwrap();
        assert_eq!(name.prefix.as_deref(), Some("p"));
        assert_eq!(&*name.local_name, "x");
        assert_eq!(name.namespace.as_deref(), Some(ns));

        assert_eq!(
            validate_and_extract(Some(""), "p:x"),
            Err(DOMException::NamespaceErr)
        );
        assert_eq!(
            validate_and_extract(Some(ns), "1x"),
            Err(DOMException::InvalidCharacterErr)
        );
        assert_eq!(
            validate_and_extract(Some(ns), "xml:lang"),
            Err(DOMException::NamespaceErr)
        );
        assert!(validate_and_extract(Some(XML_NAMESPACE), "xml:lang").is_ok());
        assert_eq!(
            validate_and_extract(Some(ns), "xmlns"),
            Err(DOMException::NamespaceErr)
        );
        assert_eq!(
            validate_and_extract(Some(XMLNS_NAMESPACE), "x"),
            Err(DOMException::NamespaceErr)
        );
        assert!(validate_and_extract(Some(XMLNS_NAMESPACE), "xmlns:x").is_ok());
        assert!(validate_and_extract(None, "plain").is_ok());
    }

    #[test]
    fn token_sets() {
        let tokens = split_tokens("  a\tb\na  c\u{C}");
        let tokens = tokens.iter().map(|t| &**t).collect::<Vec<_>>();
        assert_eq!(tokens, ["a", "b", "c"]);
        assert!(split_tokens(" \r\n").is_empty());
        // non-ASCII whitespace is part of a token
        assert_eq!(split_tokens("a\u{A0}b").len(), 1);
    }
}

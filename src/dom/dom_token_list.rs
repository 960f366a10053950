use std::rc::Rc;

use crate::tree::names::is_ascii_whitespace;

use super::{
    DOMException,
    element::ElementRef,
    node::{Node, NodeConnection},
};

/// Implementation of [DOMTokenList](https://dom.spec.whatwg.org/#interface-domtokenlist) interface
/// for the `class` attribute.
///
/// The list is live: every read parses the current attribute value, and every
/// write serializes the token set back into the attribute.
#[derive(Clone)]
pub struct DOMTokenList {
    element: ElementRef,
}

/// An empty token is a `SyntaxErr`, a token containing ASCII whitespace an
/// `InvalidCharacterErr`.
fn validate_token(token: &str) -> Result<(), DOMException> {
    if token.is_empty() {
        return Err(DOMException::SyntaxErr);
    }
    if token.contains(is_ascii_whitespace) {
        return Err(DOMException::InvalidCharacterErr);
    }
    Ok(())
}

impl DOMTokenList {
    pub(super) fn new(element: ElementRef) -> Self {
        Self { element }
    }

    fn tokens(&self) -> Rc<[Rc<str>]> {
        self.element.tree().class_tokens(self.element.node_id())
    }

    /// Run the update steps: write the serialized set back, unless the
    /// attribute is missing and the set is empty.
    fn update(&self, tokens: &[Rc<str>]) {
        if tokens.is_empty() && !self.element.has_attribute_ns(None, "class") {
            return;
        }
        self.element.set_attribute_ns_raw(None, "class", &tokens.join(" "));
    }

    /// Implementation of [`length`](https://dom.spec.whatwg.org/#dom-domtokenlist-length) attribute.
    pub fn length(&self) -> usize {
        self.tokens().len()
    }

    pub fn is_empty(&self) -> bool {
        self.length() == 0
    }

    /// Implementation of [`item`](https://dom.spec.whatwg.org/#dom-domtokenlist-item) method.
    pub fn item(&self, index: usize) -> Option<Rc<str>> {
        self.tokens().get(index).cloned()
    }

    /// Implementation of [`contains`](https://dom.spec.whatwg.org/#dom-domtokenlist-contains) method.
    pub fn contains(&self, token: &str) -> bool {
        self.tokens().iter().any(|t| &**t == token)
    }

    /// Implementation of [`add`](https://dom.spec.whatwg.org/#dom-domtokenlist-add) method.
    ///
    /// # Specification
    /// ```text
    /// The add(tokens…) method steps are:
    ///
    /// 1. For each token of tokens:
    ///    1. If token is the empty string, then throw a "SyntaxError" DOMException.
    ///    2. If token contains any ASCII whitespace, then throw an
    ///       "InvalidCharacterError" DOMException.
    /// 2. For each token of tokens, append token to this's token set.
    /// 3. Run the update steps.
    /// ```
    pub fn add(&self, tokens: &[&str]) -> Result<(), DOMException> {
        for token in tokens {
            validate_token(token)?;
        }
        let mut set = self.tokens().to_vec();
        for &token in tokens {
            if !set.iter().any(|t| &**t == token) {
                set.push(token.into());
            }
        }
        self.update(&set);
        Ok(())
    }

    /// Implementation of [`remove`](https://dom.spec.whatwg.org/#dom-domtokenlist-remove) method.
    pub fn remove(&self, tokens: &[&str]) -> Result<(), DOMException> {
        for token in tokens {
            validate_token(token)?;
        }
        let mut set = self.tokens().to_vec();
        set.retain(|t| !tokens.contains(&&**t));
        self.update(&set);
        Ok(())
    }

    /// Implementation of [`toggle`](https://dom.spec.whatwg.org/#dom-domtokenlist-toggle) method.
    ///
    /// Returns whether `token` is present afterwards.
    ///
    /// # Specification
    /// ```text
    /// The toggle(token, force) method steps are:
    ///
    /// 1. If token is the empty string, then throw a "SyntaxError" DOMException.
    /// 2. If token contains any ASCII whitespace, then throw an
    ///    "InvalidCharacterError" DOMException.
    /// 3. If this's token set[token] exists, then:
    ///    1. If force is either not given or is false, then remove token from this's
    ///       token set, run the update steps and return false.
    ///    2. Return true.
    /// 4. Otherwise, if force not given or is true, append token to this's token set,
    ///    run the update steps, and return true.
    /// 5. Return false.
    /// ```
    pub fn toggle(&self, token: &str, force: Option<bool>) -> Result<bool, DOMException> {
        validate_token(token)?;
        let mut set = self.tokens().to_vec();
        if let Some(pos) = set.iter().position(|t| &**t == token) {
            if force == Some(true) {
                return Ok(true);
            }
            set.remove(pos);
            self.update(&set);
            return Ok(false);
        }
        if force == Some(false) {
            return Ok(false);
        }
        set.push(token.into());
        self.update(&set);
        Ok(true)
    }

    /// Implementation of [`replace`](https://dom.spec.whatwg.org/#dom-domtokenlist-replace) method.
    ///
    /// Returns `false` if `token` was not in the list.
    pub fn replace(&self, token: &str, new_token: &str) -> Result<bool, DOMException> {
        validate_token(token)?;
        validate_token(new_token)?;
        let set = self.tokens();
        if !set.iter().any(|t| &**t == token) {
            return Ok(false);
        }
        // the first of `token` and `new_token` takes the place, others go away
        let mut replaced = false;
        let mut new = Vec::with_capacity(set.len());
        for t in set.iter() {
            if &**t == token || &**t == new_token {
                if !replaced {
                    new.push(Rc::from(new_token));
                    replaced = true;
                }
            } else {
                new.push(t.clone());
            }
        }
        self.update(&new);
        Ok(true)
    }

    /// Implementation of [`value`](https://dom.spec.whatwg.org/#dom-domtokenlist-value) attribute.
    pub fn value(&self) -> String {
        self.element.class_name()
    }

    pub fn set_value(&self, value: &str) {
        self.element.set_class_name(value);
    }

    pub fn iter(&self) -> impl Iterator<Item = Rc<str>> {
        self.tokens().to_vec().into_iter()
    }
}

impl PartialEq for DOMTokenList {
    fn eq(&self, other: &Self) -> bool {
        self.element.is_same_node(&other.element.clone().into())
    }
}

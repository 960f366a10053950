//! Per-thread configuration of the DOM implementation.
//!
//! Every handle in this crate is `!Send`, so thread-local state is enough to
//! configure all documents created on the current thread.

use std::{borrow::Cow, cell::RefCell, collections::HashMap, rc::Rc};

use const_format::concatcp;

/// The version of this crate, `major.minor.patch`.
pub const VERSION: &str = concatcp!(
    env!("CARGO_PKG_VERSION_MAJOR"),
    ".",
    env!("CARGO_PKG_VERSION_MINOR"),
    ".",
    env!("CARGO_PKG_VERSION_PATCH")
);

const DEFAULT_UPPERCASE_CACHE_LIMIT: usize = 1024;

pub struct DomGlobalState {
    version: Cow<'static, str>,
    uppercase_cache: HashMap<Rc<str>, Rc<str>>,
    uppercase_cache_limit: usize,
    list_consistency_check: bool,
    default_address: Cow<'static, str>,
}

impl DomGlobalState {
    fn new() -> Self {
        Self {
            version: Cow::Borrowed(VERSION),
            uppercase_cache: HashMap::new(),
            uppercase_cache_limit: DEFAULT_UPPERCASE_CACHE_LIMIT,
            list_consistency_check: cfg!(any(debug_assertions, feature = "list_check")),
            default_address: Cow::Borrowed("about:blank"),
        }
    }
}

thread_local! {
    pub static GLOBAL_STATE: RefCell<DomGlobalState> = RefCell::new(DomGlobalState::new());
}

/// Get the version string of this library.
pub fn get_version() -> Cow<'static, str> {
    GLOBAL_STATE.with_borrow(|state| state.version.clone())
}

/// Return the ASCII uppercase form of `name`, memoized.
///
/// `tagName` of HTML elements is computed through this cache. When the cache
/// reaches its limit it is emptied before the new entry is stored, so it never
/// grows past [`uppercase_cache_limit`].
pub fn to_uppercase_cached(name: &str) -> Rc<str> {
    if !name.bytes().any(|b| b.is_ascii_lowercase()) {
        return name.into();
    }
    GLOBAL_STATE.with_borrow_mut(|state| {
        if let Some(upper) = state.uppercase_cache.get(name) {
            return upper.clone();
        }
        if state.uppercase_cache_limit == 0 {
            return name.to_ascii_uppercase().into();
        }
        if state.uppercase_cache.len() >= state.uppercase_cache_limit {
            state.uppercase_cache.clear();
        }
        let upper: Rc<str> = name.to_ascii_uppercase().into();
        state.uppercase_cache.insert(name.into(), upper.clone());
        upper
    })
}

/// Set the maximum number of entries of the uppercase cache.
///
/// `0` disables the cache. Existing entries beyond the new limit are dropped.
pub fn set_uppercase_cache_limit(limit: usize) {
    GLOBAL_STATE.with_borrow_mut(|state| {
        state.uppercase_cache_limit = limit;
        if state.uppercase_cache.len() > limit {
            state.uppercase_cache.clear();
        }
    });
}

/// Get the maximum number of entries of the uppercase cache.
pub fn uppercase_cache_limit() -> usize {
    GLOBAL_STATE.with_borrow(|state| state.uppercase_cache_limit)
}

/// Drop all entries of the uppercase cache.
pub fn clear_uppercase_cache() {
    GLOBAL_STATE.with_borrow_mut(|state| state.uppercase_cache.clear());
}

/// Get the current number of entries of the uppercase cache.
pub fn uppercase_cache_len() -> usize {
    GLOBAL_STATE.with_borrow(|state| state.uppercase_cache.len())
}

/// Enable or disable sibling list consistency checks.
///
/// The checks are enabled by default in debug builds or with the `list_check`
/// feature. A failed check panics.
pub fn set_list_consistency_check(enable: bool) {
    GLOBAL_STATE.with_borrow_mut(|state| state.list_consistency_check = enable);
}

/// Check if sibling list consistency checks are enabled.
pub fn list_consistency_check() -> bool {
    GLOBAL_STATE.with_borrow(|state| state.list_consistency_check)
}

/// Set the address given to documents created without one.
pub fn set_default_address(address: impl Into<Cow<'static, str>>) {
    GLOBAL_STATE.with_borrow_mut(|state| state.default_address = address.into());
}

/// Get the address given to documents created without one.
pub fn default_address() -> Cow<'static, str> {
    GLOBAL_STATE.with_borrow(|state| state.default_address.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uppercase_cache_is_bounded() {
        clear_uppercase_cache();
        set_uppercase_cache_limit(2);
        assert_eq!(&*to_uppercase_cached("div"), "DIV");
        assert_eq!(&*to_uppercase_cached("span"), "SPAN");
        assert_eq!(uppercase_cache_len(), 2);
        assert_eq!(&*to_uppercase_cached("p"), "P");
        assert_eq!(uppercase_cache_len(), 1);

        // already uppercase names bypass the cache
        assert_eq!(&*to_uppercase_cached("SVG:G"), "SVG:G");
        assert_eq!(uppercase_cache_len(), 1);

        set_uppercase_cache_limit(0);
        assert_eq!(uppercase_cache_len(), 0);
        assert_eq!(&*to_uppercase_cached("a"), "A");
        assert_eq!(uppercase_cache_len(), 0);
        set_uppercase_cache_limit(DEFAULT_UPPERCASE_CACHE_LIMIT);
    }

    #[test]
    fn version_matches_manifest() {
        assert_eq!(get_version(), env!("CARGO_PKG_VERSION"));
    }
}

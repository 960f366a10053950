//! Circular doubly linked sibling lists.
//!
//! Every node is a member of exactly one circular list. A detached node is a
//! list of one, linked to itself. A container only remembers its first child;
//! the last child is the previous sibling of the first child.
//!
//! The functions are written against [`SiblingLinks`] so they do not depend on
//! how the nodes are stored.

use crate::globals::list_consistency_check;

use super::NodeId;

pub(crate) trait SiblingLinks {
    fn next(&self, id: NodeId) -> NodeId;
    fn prev(&self, id: NodeId) -> NodeId;
    fn set_next(&mut self, id: NodeId, next: NodeId);
    fn set_prev(&mut self, id: NodeId, prev: NodeId);
}

/// Check that `a` is a member of a well formed circular list.
///
/// Every `next` must be answered by the matching `prev`, and walking `next`
/// must come back to `a`.
pub(crate) fn valid<L: SiblingLinks + ?Sized>(list: &L, a: NodeId) -> bool {
    let mut cur = a;
    loop {
        let next = list.next(cur);
        if list.prev(next) != cur {
            return false;
        }
        cur = next;
        if cur == a {
            return true;
        }
    }
}

fn check<L: SiblingLinks + ?Sized>(list: &L, a: NodeId) {
    if list_consistency_check() {
        assert!(valid(list, a), "broken sibling list at {a:?}");
    }
}

/// Splice the whole circular list that starts at `a` in front of `b`.
///
/// The node before `a` (the last one of its list) becomes the previous sibling
/// of `b`.
pub(crate) fn insert_before<L: SiblingLinks + ?Sized>(list: &mut L, a: NodeId, b: NodeId) {
    check(list, a);
    check(list, b);
    let a_first = a;
    let a_last = list.prev(a);
    let b_first = b;
    let b_last = list.prev(b);
    list.set_next(a_last, b_first);
    list.set_prev(b_first, a_last);
    list.set_next(b_last, a_first);
    list.set_prev(a_first, b_last);
    check(list, a);
    check(list, b);
}

/// Replace `a` with the list that `b` belongs to, or just remove `a` if `b` is
/// `None`.
pub(crate) fn replace<L: SiblingLinks + ?Sized>(list: &mut L, a: NodeId, b: Option<NodeId>) {
    check(list, a);
    if let Some(b) = b {
        check(list, b);
        insert_before(list, b, a);
    }
    remove(list, a);
    check(list, a);
    if let Some(b) = b {
        check(list, b);
    }
}

/// Unlink `a` from its list and make it a list of one.
pub(crate) fn remove<L: SiblingLinks + ?Sized>(list: &mut L, a: NodeId) {
    check(list, a);
    let prev = list.prev(a);
    if prev == a {
        return;
    }
    let next = list.next(a);
    list.set_next(prev, next);
    list.set_prev(next, prev);
    list.set_prev(a, a);
    list.set_next(a, a);
    check(list, a);
    check(list, prev);
}

//! Nodes that never hold children, and the character data they carry.
//!
//! Offsets into character data are UTF-8 byte offsets. An offset past the end
//! of the data or inside a character is an `IndexSizeErr`.

use crate::dom::DOMException;

use super::{NodeId, Tree, node::NodeKind};

/// Check that `offset` is usable on `data`.
fn check_offset(data: &str, offset: usize) -> Result<(), DOMException> {
    if offset > data.len() || !data.is_char_boundary(offset) {
        return Err(DOMException::IndexSizeErr);
    }
    Ok(())
}

/// Clamp `offset + count` to the data, then back off to the previous character
/// boundary.
fn end_of_range(data: &str, offset: usize, count: usize) -> usize {
    let mut end = offset.saturating_add(count).min(data.len());
    while !data.is_char_boundary(end) {
        end -= 1;
    }
    end
}

impl Tree {
    /// Check if `id` is a leaf, that is, a node kind that can never have
    /// children.
    pub(crate) fn is_leaf(&self, id: NodeId) -> bool {
        !self.kind(id).is_container()
    }

    /// Every structural mutation of a leaf fails with `err`.
    pub(crate) fn check_container(&self, id: NodeId, err: DOMException) -> Result<(), DOMException> {
        if self.is_leaf(id) {
            return Err(err);
        }
        Ok(())
    }

    pub(crate) fn character_data(&self, id: NodeId) -> Option<&str> {
        self.kind(id).character_data()
    }

    /// Replace the whole character data of `id`.
    pub(crate) fn set_character_data(&mut self, id: NodeId, data: String) {
        let Some(slot) = self.node_mut(id).kind.character_data_mut() else {
            return;
        };
        *slot = data;
        self.modify(id);
        if self.is_rooted(id) {
            self.mutate_value(id);
        }
    }

    pub(crate) fn substring_data(
        &self,
        id: NodeId,
        offset: usize,
        count: usize,
    ) -> Result<String, DOMException> {
        let data = self.character_data(id).unwrap_or_default();
        check_offset(data, offset)?;
        let end = end_of_range(data, offset, count);
        Ok(data[offset..end].to_owned())
    }

    /// Implementation of "replace data": every other editing operation is a
    /// special case of this one.
    pub(crate) fn replace_data(
        &mut self,
        id: NodeId,
        offset: usize,
        count: usize,
        with: &str,
    ) -> Result<(), DOMException> {
        let data = self.character_data(id).unwrap_or_default();
        check_offset(data, offset)?;
        let end = end_of_range(data, offset, count);
        let mut new = String::with_capacity(data.len() - (end - offset) + with.len());
        new.push_str(&data[..offset]);
        new.push_str(with);
        new.push_str(&data[end..]);
        self.set_character_data(id, new);
        Ok(())
    }

    /// Split the Text node `id` at `offset` and return the new node that holds
    /// the tail.
    ///
    /// If `id` has a parent, the new node is inserted right after it.
    pub(crate) fn split_text(&mut self, id: NodeId, offset: usize) -> Result<NodeId, DOMException> {
        let NodeKind::Text(data) = self.kind(id) else {
            return Err(DOMException::NotSupportedErr);
        };
        check_offset(data, offset)?;
        let tail = data[offset..].to_owned();
        let owner = self.node(id).owner_document;
        let new = self.alloc(NodeKind::Text(tail), owner);
        if let Some(parent) = self.parent(id) {
            let next = self.next_sibling(id);
            self.insert_node(parent, new, next);
        }
        self.replace_data(id, offset, usize::MAX, "")?;
        Ok(new)
    }

    /// The contiguous Text nodes around `id`, in order.
    pub(crate) fn contiguous_text_nodes(&self, id: NodeId) -> Vec<NodeId> {
        let is_text = |n: &NodeId| matches!(self.kind(*n), NodeKind::Text(_));
        let mut before =
            std::iter::successors(self.previous_sibling(id), |&n| self.previous_sibling(n))
                .take_while(is_text)
                .collect::<Vec<_>>();
        before.reverse();
        before.push(id);
        before.extend(
            std::iter::successors(self.next_sibling(id), |&n| self.next_sibling(n))
                .take_while(is_text),
        );
        before
    }

    pub(crate) fn whole_text(&self, id: NodeId) -> String {
        self.contiguous_text_nodes(id)
            .into_iter()
            .filter_map(|n| self.character_data(n))
            .collect()
    }

    /// Remove empty Text descendants of `root` and merge runs of adjacent
    /// Text nodes into the first node of each run.
    pub(crate) fn normalize(&mut self, root: NodeId) {
        let texts = self
            .inclusive_descendants(root)
            .into_iter()
            .filter(|&n| n != root && matches!(self.kind(n), NodeKind::Text(_)))
            .collect::<Vec<_>>();
        for node in texts {
            // already merged into a previous node
            if self.parent(node).is_none() {
                continue;
            }
            if self.character_data(node).is_some_and(str::is_empty) {
                self.remove_node(node);
                continue;
            }
            let run = std::iter::successors(self.next_sibling(node), |&n| self.next_sibling(n))
                .take_while(|&n| matches!(self.kind(n), NodeKind::Text(_)))
                .collect::<Vec<_>>();
            if run.is_empty() {
                continue;
            }
            let mut data = self.character_data(node).unwrap_or_default().to_owned();
            for &n in &run {
                data.push_str(self.character_data(n).unwrap_or_default());
            }
            self.set_character_data(node, data);
            for n in run {
                self.remove_node(n);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_offsets() {
        let mut tree = Tree::new();
        let text = tree.alloc(NodeKind::Text("h\u{e9}llo".into()), None);
        // 'é' occupies bytes 1 and 2
        assert_eq!(tree.substring_data(text, 1, 2).as_deref(), Ok("\u{e9}"));
        assert_eq!(tree.substring_data(text, 2, 1), Err(DOMException::IndexSizeErr));
        assert_eq!(tree.substring_data(text, 7, 1), Err(DOMException::IndexSizeErr));
        assert_eq!(tree.substring_data(text, 6, 100).as_deref(), Ok(""));
        // a count ending inside a character stops before it
        assert_eq!(tree.substring_data(text, 0, 2).as_deref(), Ok("h"));

        tree.replace_data(text, 1, 2, "e").unwrap();
        assert_eq!(tree.character_data(text), Some("hello"));
        tree.replace_data(text, 5, 0, "!").unwrap();
        assert_eq!(tree.character_data(text), Some("hello!"));
    }

    #[test]
    fn leaves_reject_children() {
        let mut tree = Tree::new();
        let comment = tree.alloc(NodeKind::Comment("c".into()), None);
        assert!(tree.is_leaf(comment));
        assert_eq!(
            tree.check_container(comment, DOMException::HierarchyRequestErr),
            Err(DOMException::HierarchyRequestErr)
        );
        let frag = tree.alloc(NodeKind::DocumentFragment, None);
        assert!(tree.check_container(frag, DOMException::NotFoundErr).is_ok());
    }

    #[test]
    fn normalize_merges_runs() {
        let mut tree = Tree::new();
        let frag = tree.alloc(NodeKind::DocumentFragment, None);
        for data in ["a", "", "b", "c"] {
            let text = tree.alloc(NodeKind::Text(data.into()), None);
            tree.link_before(frag, text, None);
        }
        let comment = tree.alloc(NodeKind::Comment("x".into()), None);
        tree.link_before(frag, comment, None);
        let empty = tree.alloc(NodeKind::Text(String::new()), None);
        tree.link_before(frag, empty, None);

        tree.normalize(frag);
        let kids = tree.children(frag);
        assert_eq!(kids.len(), 2);
        assert_eq!(tree.character_data(kids[0]), Some("abc"));
        assert_eq!(kids[1], comment);
    }
}

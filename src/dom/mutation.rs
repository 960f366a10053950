//! Mutation notifications.
//!
//! A document may carry a single [`MutationHandler`]. Records are queued by
//! the arena while a mutation runs and handed to the handler once the
//! mutation is complete, so the handler is free to read or modify the tree.
//! Mutations made by the handler itself are not reported back to it.

use tracing::trace;

use crate::tree::document::{PendingMutation, RawMutation};

use super::{
    attr::AttrRef,
    element::ElementRef,
    node::{Arena, NodeHandle, NodeRef},
};

/// Callback receiving the mutation records of a document.
pub type MutationHandler = Box<dyn FnMut(&MutationRecord)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// Character data was replaced.
    Value,
    /// An attribute was added or its value changed.
    Attr,
    /// An attribute was removed.
    RemoveAttr,
    /// A node was connected.
    Insert,
    /// Nodes were disconnected.
    Remove,
    /// A connected node moved without being disconnected.
    Move,
}

/// A change of a connected node.
#[derive(Debug, Clone)]
pub enum MutationRecord {
    Value {
        target: NodeRef,
        data: String,
    },
    Attr {
        target: ElementRef,
        attr: AttrRef,
        /// `None` if the attribute was just added.
        old_value: Option<String>,
    },
    RemoveAttr {
        target: ElementRef,
        attr: AttrRef,
    },
    Insert {
        /// The new parent.
        target: NodeRef,
        node: NodeRef,
    },
    Remove {
        /// The former parent.
        target: NodeRef,
        nodes: Vec<NodeRef>,
    },
    Move {
        target: NodeRef,
    },
}

impl MutationRecord {
    pub fn kind(&self) -> MutationKind {
        match self {
            MutationRecord::Value { .. } => MutationKind::Value,
            MutationRecord::Attr { .. } => MutationKind::Attr,
            MutationRecord::RemoveAttr { .. } => MutationKind::RemoveAttr,
            MutationRecord::Insert { .. } => MutationKind::Insert,
            MutationRecord::Remove { .. } => MutationKind::Remove,
            MutationRecord::Move { .. } => MutationKind::Move,
        }
    }

    pub fn target(&self) -> NodeRef {
        match self {
            MutationRecord::Value { target, .. }
            | MutationRecord::Insert { target, .. }
            | MutationRecord::Remove { target, .. }
            | MutationRecord::Move { target } => target.clone(),
            MutationRecord::Attr { target, .. } | MutationRecord::RemoveAttr { target, .. } => {
                target.clone().into()
            }
        }
    }

    fn from_raw(base: &NodeHandle, raw: RawMutation) -> Self {
        let element = |id| ElementRef(base.with_id(id));
        let attr = |id| AttrRef(base.with_id(id));
        match raw {
            RawMutation::Value { target, data } => MutationRecord::Value {
                target: base.wrap(target),
                data,
            },
            RawMutation::Attr {
                target,
                attr: a,
                old_value,
            } => MutationRecord::Attr {
                target: element(target),
                attr: attr(a),
                old_value,
            },
            RawMutation::RemoveAttr { target, attr: a } => MutationRecord::RemoveAttr {
                target: element(target),
                attr: attr(a),
            },
            RawMutation::Insert { target, node } => MutationRecord::Insert {
                target: base.wrap(target),
                node: base.wrap(node),
            },
            RawMutation::Remove { target, nodes } => MutationRecord::Remove {
                target: base.wrap(target),
                nodes: nodes.into_iter().map(|n| base.wrap(n)).collect(),
            },
            RawMutation::Move { target } => MutationRecord::Move {
                target: base.wrap(target),
            },
        }
    }
}

/// Hand every queued record to the handler of its document.
///
/// Calls nested inside a running handler return at once; the outermost call
/// keeps draining the queue until it is empty.
pub(crate) fn deliver_pending(arena: &Arena) {
    {
        let mut tree = arena.borrow_mut();
        if tree.delivering || tree.pending.is_empty() {
            return;
        }
        tree.delivering = true;
    }

    loop {
        let (document, record, mut handler, epoch) = {
            let mut tree = arena.borrow_mut();
            let Some(PendingMutation { document, record }) = tree.pending.pop_front() else {
                tree.delivering = false;
                return;
            };
            let data = tree.document_mut(document);
            let Some(handler) = data.mutation_handler.take() else {
                continue;
            };
            let epoch = data.handler_epoch;
            (document, record, handler, epoch)
        };

        let base = NodeHandle::new(arena.clone(), document);
        let record = MutationRecord::from_raw(&base, record);
        trace!(kind = ?record.kind(), "deliver mutation record");
        handler(&record);

        let mut tree = arena.borrow_mut();
        // the handler may have replaced or cleared itself
        let data = tree.document_mut(document);
        if data.handler_epoch == epoch && data.mutation_handler.is_none() {
            data.mutation_handler = Some(handler);
        }
    }
}

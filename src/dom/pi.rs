use std::rc::Rc;

use crate::tree::node::NodeKind;

use super::{
    character_data::CharacterData,
    node::{NodeConnection, NodeHandle},
};

/// Implementation of [ProcessingInstruction](https://dom.spec.whatwg.org/#interface-processinginstruction) interface.
#[derive(Clone)]
pub struct ProcessingInstructionRef(pub(crate) NodeHandle);

impl ProcessingInstructionRef {
    /// Implementation of [`target`](https://dom.spec.whatwg.org/#dom-processinginstruction-target) attribute.
    pub fn target(&self) -> Rc<str> {
        match self.tree().kind(self.node_id()) {
            NodeKind::ProcessingInstruction(pi) => pi.target.clone(),
            _ => unreachable!("{:?} is not a processing instruction", self.node_id()),
        }
    }
}

impl CharacterData for ProcessingInstructionRef {}

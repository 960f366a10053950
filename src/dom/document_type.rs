use std::rc::Rc;

use crate::tree::node::{DocumentTypeData, NodeKind};

use super::node::{NodeConnection, NodeHandle};

/// Implementation of [DocumentType](https://dom.spec.whatwg.org/#interface-documenttype) interface.
#[derive(Clone)]
pub struct DocumentTypeRef(pub(crate) NodeHandle);

impl DocumentTypeRef {
    fn with_data<R>(&self, f: impl FnOnce(&DocumentTypeData) -> R) -> R {
        match self.tree().kind(self.node_id()) {
            NodeKind::DocumentType(data) => f(data),
            _ => unreachable!("{:?} is not a document type", self.node_id()),
        }
    }

    /// Implementation of [`name`](https://dom.spec.whatwg.org/#dom-documenttype-name) attribute.
    pub fn name(&self) -> Rc<str> {
        self.with_data(|data| data.name.clone())
    }

    /// Implementation of [`publicId`](https://dom.spec.whatwg.org/#dom-documenttype-publicid) attribute.
    pub fn public_id(&self) -> Rc<str> {
        self.with_data(|data| data.public_id.clone())
    }

    /// Implementation of [`systemId`](https://dom.spec.whatwg.org/#dom-documenttype-systemid) attribute.
    pub fn system_id(&self) -> Rc<str> {
        self.with_data(|data| data.system_id.clone())
    }
}

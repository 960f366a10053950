use super::{
    DOMException,
    node::{Node, NodeConnection, NodeHandle},
};

/// Implementation of [CharacterData](https://dom.spec.whatwg.org/#interface-characterdata) interface.
///
/// Offsets and counts are UTF-8 byte offsets into [`data`](CharacterData::data).
/// An offset past the end of the data, or inside a character, is an
/// `IndexSizeErr`. A count reaching past the end is clamped.
pub trait CharacterData: Node {
    /// Implementation of [`data`](https://dom.spec.whatwg.org/#dom-characterdata-data) attribute.
    fn data(&self) -> String {
        self.tree()
            .character_data(self.node_id())
            .unwrap_or_default()
            .to_owned()
    }

    /// Setter of [`data`](https://dom.spec.whatwg.org/#dom-characterdata-data) attribute.
    fn set_data(&self, data: &str) {
        self.handle()
            .mutate(|tree, id| tree.set_character_data(id, data.to_owned()))
    }

    /// Implementation of [`length`](https://dom.spec.whatwg.org/#dom-characterdata-length) attribute.
    fn length(&self) -> usize {
        self.tree()
            .character_data(self.node_id())
            .map_or(0, str::len)
    }

    /// Implementation of [`substringData`](https://dom.spec.whatwg.org/#dom-characterdata-substringdata) method.
    ///
    /// # Specification
    /// ```text
    /// To substring data with node node, offset offset, and count count, run these steps:
    ///
    /// 1. Let length be node's length.
    /// 2. If offset is greater than length, then throw an "IndexSizeError" DOMException.
    /// 3. If offset plus count is greater than length, return a string whose value is
    ///    the code units from the offsetth code unit to the end of node's data, and
    ///    then return.
    /// 4. Return a string whose value is the code units from the offsetth code unit to
    ///    the offset+countth code unit in node's data.
    /// ```
    fn substring_data(&self, offset: usize, count: usize) -> Result<String, DOMException> {
        self.tree().substring_data(self.node_id(), offset, count)
    }

    /// Implementation of [`appendData`](https://dom.spec.whatwg.org/#dom-characterdata-appenddata) method.
    fn append_data(&self, data: &str) {
        self.handle().mutate(|tree, id| {
            let len = tree.character_data(id).map_or(0, str::len);
            tree.replace_data(id, len, 0, data)
                .expect("Internal Error: the end of data is always a valid offset");
        })
    }

    /// Implementation of [`insertData`](https://dom.spec.whatwg.org/#dom-characterdata-insertdata) method.
    fn insert_data(&self, offset: usize, data: &str) -> Result<(), DOMException> {
        self.handle()
            .mutate(|tree, id| tree.replace_data(id, offset, 0, data))
    }

    /// Implementation of [`deleteData`](https://dom.spec.whatwg.org/#dom-characterdata-deletedata) method.
    fn delete_data(&self, offset: usize, count: usize) -> Result<(), DOMException> {
        self.handle()
            .mutate(|tree, id| tree.replace_data(id, offset, count, ""))
    }

    /// Implementation of [`replaceData`](https://dom.spec.whatwg.org/#dom-characterdata-replacedata) method.
    ///
    /// # Specification
    /// ```text
    /// To replace data of node node with offset offset, count count, and data data,
    /// run these steps:
    ///
    /// 1. Let length be node's length.
    /// 2. If offset is greater than length, then throw an "IndexSizeError" DOMException.
    /// 3. If offset plus count is greater than length, then set count to length minus
    ///    offset.
    /// 4. Queue a mutation record of "characterData" for node with null, null, node's
    ///    data, « », « », null, and null.
    /// 5. Insert data into node's data after offset code units.
    /// 6. Let delete offset be offset + data's length.
    /// 7. Starting from delete offset code units, remove count code units from node's
    ///    data.
    /// ```
    fn replace_data(&self, offset: usize, count: usize, data: &str) -> Result<(), DOMException> {
        self.handle()
            .mutate(|tree, id| tree.replace_data(id, offset, count, data))
    }
}

/// Implementation of [Text](https://dom.spec.whatwg.org/#interface-text) interface.
#[derive(Clone)]
pub struct TextRef(pub(crate) NodeHandle);

impl TextRef {
    /// Implementation of [`splitText`](https://dom.spec.whatwg.org/#dom-text-splittext) method.
    ///
    /// # Specification
    /// ```text
    /// To split a Text node node with offset offset, run these steps:
    ///
    /// 1. Let length be node's length.
    /// 2. If offset is greater than length, then throw an "IndexSizeError" DOMException.
    /// 3. Let count be length minus offset.
    /// 4. Let new data be the result of substringing data with node node, offset
    ///    offset, and count count.
    /// 5. Let new node be a new Text node, with the same node document as node. Set
    ///    new node's data to new data.
    /// 6. Let parent be node's parent.
    /// 7. If parent is not null, then insert new node into parent before node's next
    ///    sibling.
    /// 8. Replace data with node node, offset offset, count count, and data the empty
    ///    string.
    /// 9. Return new node.
    /// ```
    pub fn split_text(&self, offset: usize) -> Result<TextRef, DOMException> {
        let new = self.0.mutate(|tree, id| tree.split_text(id, offset))?;
        Ok(TextRef(self.0.with_id(new)))
    }

    /// Implementation of [`wholeText`](https://dom.spec.whatwg.org/#dom-text-wholetext) attribute.
    ///
    /// The data of this node and its contiguous Text siblings, in tree order.
    pub fn whole_text(&self) -> String {
        self.tree().whole_text(self.node_id())
    }
}

impl CharacterData for TextRef {}

/// Implementation of [Comment](https://dom.spec.whatwg.org/#interface-comment) interface.
#[derive(Clone)]
pub struct CommentRef(pub(crate) NodeHandle);

impl CharacterData for CommentRef {}

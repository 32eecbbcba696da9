use crate::fences::CodeBlock;
use crate::identity::identify;
use std::collections::HashMap;

/// Identifier to block mapping for a single parse pass.
///
/// The index holds byte offsets into the document it was built from, so it
/// must be rebuilt after every edit; merging through a stale index would
/// splice into dead offsets. Duplicated snippets share an identifier and the
/// first occurrence owns the entry, so one run answers for every copy.
#[derive(Debug, Default)]
pub struct BlockIndex {
    entries: HashMap<String, CodeBlock>,
    order: Vec<String>,
}

impl BlockIndex {
    pub fn build(blocks: Vec<CodeBlock>) -> Self {
        let mut entries = HashMap::new();
        let mut order = Vec::new();
        for block in blocks {
            let id = identify(&block.language, &block.normalized);
            if !entries.contains_key(&id) {
                order.push(id.clone());
                entries.insert(id, block);
            }
        }
        Self { entries, order }
    }

    pub fn get(&self, identifier: &str) -> Option<&CodeBlock> {
        self.entries.get(identifier)
    }

    /// Identifiers in document order, deduplicated.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

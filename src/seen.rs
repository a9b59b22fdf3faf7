//! Session-scoped deduplication of cards

use std::collections::HashSet;

use crate::page::CardId;

/// Cards already extracted during one scrape session. Never evicts.
#[derive(Debug, Default)]
pub struct SeenSet {
    ids: HashSet<CardId>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, id: &CardId) -> bool {
        self.ids.contains(id)
    }

    /// Returns true if `id` was not seen before
    pub fn mark(&mut self, id: CardId) -> bool {
        self.ids.insert(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

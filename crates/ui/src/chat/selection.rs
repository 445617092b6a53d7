use std::collections::BTreeSet;

use lectern_storage::MessageId;

/// Set of selected message ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    selected: BTreeSet<MessageId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips membership of `id` and returns whether it is now selected.
    pub fn toggle(&mut self, id: &MessageId) -> bool {
        if self.selected.remove(id) {
            false
        } else {
            self.selected.insert(id.clone());
            true
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.selected.contains(id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn snapshot(&self) -> Vec<MessageId> {
        self.selected.iter().cloned().collect()
    }

    /// Drops ids rejected by `exists`. Returns how many were removed.
    pub fn retain_existing(&mut self, mut exists: impl FnMut(&MessageId) -> bool) -> usize {
        let before = self.selected.len();
        self.selected.retain(|id| exists(id));
        before - self.selected.len()
    }
}

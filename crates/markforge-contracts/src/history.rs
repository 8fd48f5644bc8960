use std::collections::VecDeque;

use uuid::Uuid;

use crate::generation::HistoryEntry;

pub const HISTORY_CAPACITY: usize = 10;

/// In-memory list of past generations, most recent first.
///
/// Inserting past capacity evicts the oldest entry. There is no dedup and no
/// removal besides truncation and [`HistoryStore::clear`].
#[derive(Debug, Clone)]
pub struct HistoryStore {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    pub fn get(&self, id: Uuid) -> Option<&HistoryEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{HistoryStore, HISTORY_CAPACITY};
    use crate::generation::{GenerationResult, HistoryEntry, Mode};
    use crate::image::DataUri;

    fn entry(prompt: &str) -> HistoryEntry {
        HistoryEntry::new(
            GenerationResult::new(DataUri::svg("<svg/>"), Mode::Create, prompt),
            Vec::new(),
        )
    }

    #[test]
    fn eleventh_entry_evicts_the_oldest() {
        let mut history = HistoryStore::new();
        for idx in 0..=HISTORY_CAPACITY {
            history.push(entry(&format!("logo {idx}")));
        }
        assert_eq!(history.len(), HISTORY_CAPACITY);
        let prompts: Vec<&str> = history
            .entries()
            .map(|entry| entry.result.prompt.as_str())
            .collect();
        assert_eq!(prompts.first(), Some(&"logo 10"));
        assert_eq!(prompts.last(), Some(&"logo 1"));
        assert!(!prompts.contains(&"logo 0"));
    }

    #[test]
    fn preserves_most_recent_first_order() {
        let mut history = HistoryStore::new();
        history.push(entry("a"));
        history.push(entry("b"));
        history.push(entry("c"));
        let prompts: Vec<&str> = history
            .entries()
            .map(|entry| entry.result.prompt.as_str())
            .collect();
        assert_eq!(prompts, vec!["c", "b", "a"]);
        assert_eq!(history.latest().map(|entry| entry.result.prompt.as_str()), Some("c"));
    }

    #[test]
    fn identical_prompts_are_kept_as_separate_entries() {
        let mut history = HistoryStore::new();
        let first = entry("fox");
        let second = entry("fox");
        let first_id = first.id;
        history.push(first);
        history.push(second);
        assert_eq!(history.len(), 2);
        assert!(history.get(first_id).is_some());

        history.clear();
        assert!(history.is_empty());
    }
}

use crate::rss_utils::url::canonical_identifier;
use std::collections::{HashSet, VecDeque};

/// Bounded, insertion-ordered log of identifiers that have been published.
///
/// The deque holds the durable order (oldest first); the set is an index
/// rebuilt on load so membership checks do not scan the log. When the cap is
/// exceeded the oldest entries are evicted first.
#[derive(Debug, Clone)]
pub struct PostedSet {
    entries: VecDeque<String>,
    index: HashSet<String>,
    cap: usize,
}

impl PostedSet {
    pub fn new(cap: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            index: HashSet::new(),
            cap: cap.max(1),
        }
    }

    /// Rebuild from a stored sequence (oldest first). Entries are canonicalized
    /// so raw links written by older runs still match candidate identifiers.
    /// Blank lines and repeats are ignored; if the sequence is over the cap
    /// only the newest survive.
    pub fn from_entries<I>(entries: I, cap: usize) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut set = Self::new(cap);
        for entry in entries {
            set.push(canonical_identifier(&entry));
        }
        set
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.index.contains(identifier)
    }

    /// Append an identifier. Returns false if it was already recorded.
    pub fn push(&mut self, identifier: impl Into<String>) -> bool {
        let identifier = identifier.into().trim().to_string();
        if identifier.is_empty() || self.index.contains(&identifier) {
            return false;
        }
        self.index.insert(identifier.clone());
        self.entries.push_back(identifier);
        self.enforce_cap();
        true
    }

    fn enforce_cap(&mut self) {
        while self.entries.len() > self.cap {
            if let Some(evicted) = self.entries.pop_front() {
                self.index.remove(&evicted);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_first() {
        let mut set = PostedSet::new(3);
        for id in ["a", "b", "c"] {
            assert!(set.push(id));
        }
        assert!(set.push("d"));
        assert_eq!(set.to_vec(), vec!["b", "c", "d"]);
        assert!(!set.contains("a"));
        assert!(set.contains("d"));
    }

    #[test]
    fn repeats_are_not_appended() {
        let mut set = PostedSet::new(10);
        assert!(set.push("a"));
        assert!(!set.push("a"));
        assert!(!set.push("   "));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn load_over_cap_keeps_newest() {
        let stored: Vec<String> = (0..5).map(|i| format!("id-{}", i)).collect();
        let set = PostedSet::from_entries(stored, 2);
        assert_eq!(set.to_vec(), vec!["id-3", "id-4"]);
        assert!(!set.contains("id-0"));
    }

    #[test]
    fn stored_raw_links_are_canonicalized() {
        let stored = vec![
            "https://techcrunch.com/2025/06/01/story/".to_string(),
            "https://techcrunch.com/2025/06/01/story?utm_source=rss".to_string(),
            "https://example.com/other#comments".to_string(),
        ];
        let set = PostedSet::from_entries(stored, 10);
        assert_eq!(
            set.to_vec(),
            vec!["https://techcrunch.com/2025/06/01/story", "https://example.com/other"]
        );
    }
}

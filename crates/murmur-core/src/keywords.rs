//! Recent-keyword tracking for keyword drills.

use std::collections::{HashMap, VecDeque};

use once_cell::sync::Lazy;
use regex::Regex;

/// Runs of two or more Latin, hiragana, katakana or CJK letters.
static KEYWORD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[一-龠ぁ-んァ-ンa-zA-Z]{2,}").expect("valid regex"));

/// Number of recent keywords remembered.
pub const DEFAULT_KEYWORD_CAPACITY: usize = 50;

/// Remembers the most recent keywords seen in user messages.
#[derive(Debug, Clone)]
pub struct KeywordTracker {
    recent: VecDeque<String>,
    capacity: usize,
}

impl Default for KeywordTracker {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORD_CAPACITY)
    }
}

impl KeywordTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            recent: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Extracts keywords from `text`, dropping the oldest beyond capacity.
    pub fn observe(&mut self, text: &str) {
        for m in KEYWORD_PATTERN.find_iter(text) {
            if self.recent.len() == self.capacity {
                self.recent.pop_front();
            }
            if self.capacity > 0 {
                self.recent.push_back(m.as_str().to_string());
            }
        }
    }

    /// The most frequent remembered keyword; ties go to the one seen first.
    pub fn most_frequent(&self) -> Option<&str> {
        let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
        for (position, keyword) in self.recent.iter().enumerate() {
            counts
                .entry(keyword.as_str())
                .or_insert((0, position))
                .0 += 1;
        }
        counts
            .into_iter()
            .max_by(|(_, (a_count, a_first)), (_, (b_count, b_first))| {
                a_count.cmp(b_count).then(b_first.cmp(a_first))
            })
            .map(|(keyword, _)| keyword)
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }

    pub fn clear(&mut self) {
        self.recent.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_mixed_scripts() {
        let mut tracker = KeywordTracker::default();
        tracker.observe("I love テスト and 料理, a b!");
        assert_eq!(tracker.len(), 4); // love, テスト, and, 料理
    }

    #[test]
    fn test_most_frequent_with_tie_break() {
        let mut tracker = KeywordTracker::default();
        tracker.observe("cats dogs dogs cats birds");
        assert_eq!(tracker.most_frequent(), Some("cats"));

        tracker.observe("dogs");
        assert_eq!(tracker.most_frequent(), Some("dogs"));
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut tracker = KeywordTracker::new(3);
        tracker.observe("alpha alpha beta gamma delta");
        assert_eq!(tracker.len(), 3);
        // Both "alpha"s were pushed out; the tie goes to the earliest.
        assert_eq!(tracker.most_frequent(), Some("beta"));

        tracker.clear();
        assert!(tracker.most_frequent().is_none());
    }
}

//! Rolling chat history, oldest entries evicted first.

use std::collections::VecDeque;

/// Stored entries (10 exchanges of user + assistant)
pub const MAX_HISTORY_ENTRIES: usize = 20;

#[derive(Debug, Clone, Default)]
pub struct ChatHistory {
    entries: VecDeque<String>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one exchange and trim to `MAX_HISTORY_ENTRIES`.
    pub fn push_exchange(&mut self, user_input: &str, response: &str) {
        self.entries.push_back(format!("User: {}", user_input));
        self.entries.push_back(format!("Assistant: {}", response));
        while self.entries.len() > MAX_HISTORY_ENTRIES {
            self.entries.pop_front();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

//! Process-wide clipboard: one current buffer plus a bounded history.
//!
//! Every mutation funnels through [`Clipboard`]'s narrow surface so a
//! single call site can notify the parameter bus (`CLIPBOARD_CONTENT`)
//! without scattering broadcast calls across callers.

const HISTORY_CAPACITY: usize = 10;

#[derive(Debug, Default, Clone)]
pub struct Clipboard {
    current: String,
    history: Vec<String>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> &str {
        &self.current
    }

    /// Replace the buffer outright, pushing the previous content onto the
    /// bounded history stack (newest first, oldest dropped past capacity).
    pub fn set(&mut self, content: impl Into<String>) {
        let content = content.into();
        if !self.current.is_empty() {
            self.history.insert(0, std::mem::take(&mut self.current));
            self.history.truncate(HISTORY_CAPACITY);
        }
        self.current = content;
    }

    pub fn append(&mut self, content: &str) {
        self.current.push_str(content);
    }

    pub fn history(&self, index: usize) -> Option<&str> {
        self.history.get(index).map(String::as_str)
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

//! Proposed-action extraction
//!
//! The model proposes a query by wrapping it in a fenced block:
//! ~~~text
//! ```sql
//! SELECT * FROM orders LIMIT 3;
//! ```
//! ~~~
//! The routing policy uses the presence of a block to tell a proposal from a
//! plain reply, and the approval path pulls the query back out of it.

use regex::Regex;

/// Finds and extracts fenced action blocks from agent text
pub struct ActionExtractor {
    block_re: Regex,
}

impl Default for ActionExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionExtractor {
    pub fn new() -> Self {
        Self {
            // Optional `sql` language tag, non-greedy body across newlines
            block_re: Regex::new(r"(?s)```(?:sql)?(.*?)```").expect("static action block pattern"),
        }
    }

    /// Whether the text contains a fenced action block
    pub fn has_action(&self, text: &str) -> bool {
        self.block_re.is_match(text)
    }

    /// The query inside the first fenced block
    pub fn extract(&self, text: &str) -> Option<String> {
        self.block_re
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|body| body.as_str().trim().to_string())
    }
}

//! Ordered configuration command sets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered sequence of device configuration lines.
///
/// Order is significant: the session state machine replays the lines
/// verbatim and in sequence, never reordering or batching. Immutable after
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSet {
    lines: Vec<String>,
}

impl CommandSet {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Parse a raw generation-backend response into a command set.
    ///
    /// Model output arrives as free text: lines are trimmed, blank lines
    /// and Markdown code fences are dropped, everything else is kept in
    /// order.
    pub fn parse(raw: &str) -> Self {
        let lines = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with("```"))
            .map(str::to_string)
            .collect();
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether any line contains the given fragment (case-insensitive).
    pub fn contains(&self, fragment: &str) -> bool {
        let needle = fragment.to_ascii_lowercase();
        self.lines
            .iter()
            .any(|line| line.to_ascii_lowercase().contains(&needle))
    }
}

impl fmt::Display for CommandSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines.join("\n"))
    }
}

impl<'a> IntoIterator for &'a CommandSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

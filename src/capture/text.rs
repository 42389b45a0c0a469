//! Line normalization and deduplication.

use std::collections::HashSet;

/// Collapses every whitespace run to one space and trims the ends.
pub fn normalize_line(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keeps the first occurrence of each normalized line, in collection order.
#[derive(Debug, Default)]
pub struct LineCollector {
    lines: Vec<String>,
    seen: HashSet<String>,
}

impl LineCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the line was new and non-empty.
    pub fn push(&mut self, raw: &str) -> bool {
        let line = normalize_line(raw);
        if line.is_empty() || self.seen.contains(&line) {
            return false;
        }
        self.seen.insert(line.clone());
        self.lines.push(line);
        true
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

pub fn dedup_lines<I, S>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut collector = LineCollector::new();
    for line in lines {
        collector.push(line.as_ref());
    }
    collector.into_lines()
}

/// Lines with at least two alphanumeric characters; drops glyph-only chrome
/// such as "×", "•" or "|".
pub fn filter_noise(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter(|line| line.chars().filter(|c| c.is_alphanumeric()).count() >= 2)
        .cloned()
        .collect()
}

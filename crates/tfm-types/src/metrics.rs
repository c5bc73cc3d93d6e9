use std::fmt;

use serde::{Deserialize, Serialize};

/// Textual metrics computed by a single forward scan of a text object.
///
/// Values are produced once per scan and never mutated. Byte size is not part
/// of this type: it is reported by the object store, not observed by the scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    /// Number of lines, counting a final unterminated line if it has content.
    pub line_count: u64,
    /// Number of maximal non-whitespace runs across the whole stream.
    pub word_count: u64,
    /// Number of characters belonging to lines, terminators excluded.
    pub character_count: u64,
}

impl Metrics {
    /// Create metrics with explicit values.
    pub const fn new(line_count: u64, word_count: u64, character_count: u64) -> Self {
        Self {
            line_count,
            word_count,
            character_count,
        }
    }

    /// The all-zero metrics of an empty stream.
    pub const fn zero() -> Self {
        Self::new(0, 0, 0)
    }

    /// Returns `true` if no line was observed.
    pub fn is_empty(&self) -> bool {
        self.line_count == 0
    }

    /// Returns `true` if the counts are mutually consistent.
    ///
    /// Every word contributes at least one character, and words only exist
    /// inside lines.
    pub fn is_consistent(&self) -> bool {
        self.character_count >= self.word_count && (self.line_count > 0 || self.word_count == 0)
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lines={} words={} chars={}",
            self.line_count, self.word_count, self.character_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_default() {
        assert_eq!(Metrics::zero(), Metrics::default());
        assert!(Metrics::zero().is_empty());
        assert!(Metrics::zero().is_consistent());
    }

    #[test]
    fn consistency_rules() {
        assert!(Metrics::new(2, 3, 14).is_consistent());
        assert!(!Metrics::new(1, 5, 4).is_consistent());
        assert!(!Metrics::new(0, 1, 1).is_consistent());
    }

    #[test]
    fn display_format() {
        assert_eq!(
            Metrics::new(2, 3, 14).to_string(),
            "lines=2 words=3 chars=14"
        );
    }

    #[test]
    fn serde_uses_camel_case() {
        let json = serde_json::to_string(&Metrics::new(1, 2, 3)).unwrap();
        assert_eq!(json, r#"{"lineCount":1,"wordCount":2,"characterCount":3}"#);
    }
}

use serde::Deserialize;
use serde::Serialize;

/// Caret or span position in the document's linear content addressing.
///
/// Embeds count as a single position; text counts one position per `char`.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct SelectionRange {
    /// Start offset (inclusive).
    pub index: usize,
    /// Number of positions covered; `0` for a caret.
    pub length: usize,
}

impl SelectionRange {
    pub fn new(index: usize, length: usize) -> Self {
        Self { index, length }
    }

    /// A zero-length selection at `index`.
    pub fn caret(index: usize) -> Self {
        Self { index, length: 0 }
    }

    pub fn end(&self) -> usize {
        self.index + self.length
    }
}

impl From<std::ops::Range<usize>> for SelectionRange {
    fn from(range: std::ops::Range<usize>) -> Self {
        Self {
            index: range.start,
            length: range.end.saturating_sub(range.start),
        }
    }
}

/// Who a document mutation is attributed to.
///
/// Engines keep `User` mutations in their undo history like any typed edit;
/// `Api` mutations are programmatic, `Silent` ones emit no change events.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    #[default]
    User,
    Api,
    Silent,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn range_conversion_keeps_length() {
        assert_eq!(SelectionRange::from(3..7), SelectionRange::new(3, 4));
        assert_eq!(SelectionRange::from(5..5), SelectionRange::caret(5));
        assert_eq!(SelectionRange::new(3, 4).end(), 7);
    }
}

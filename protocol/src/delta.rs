//! Operation descriptors returned by document mutations.
//!
//! A [`Delta`] lists the operations a mutation applied, in document order. The
//! JSON shape matches the usual rich-text delta format
//! (`{"ops": [{"retain": 5}, {"insert": {"image": "..."}}]}`) so documents can be
//! persisted as a single insert-only delta.

use serde::Deserialize;
use serde::Serialize;

use crate::embed::Embed;
use crate::selection::SelectionRange;

/// Content produced by an insert operation.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Insertion {
    Text(String),
    Embed(Embed),
}

impl Insertion {
    /// Number of document positions this insertion occupies.
    pub fn len(&self) -> usize {
        match self {
            Insertion::Text(text) => text.chars().count(),
            Insertion::Embed(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One unit of a [`Delta`].
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeltaOp {
    Insert(Insertion),
    Retain(usize),
    Delete(usize),
}

impl DeltaOp {
    pub fn is_insert(&self) -> bool {
        matches!(self, DeltaOp::Insert(_))
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Delta {
    pub ops: Vec<DeltaOp>,
}

impl Delta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retain(mut self, count: usize) -> Self {
        if count > 0 {
            self.ops.push(DeltaOp::Retain(count));
        }
        self
    }

    pub fn insert_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.is_empty() {
            self.ops.push(DeltaOp::Insert(Insertion::Text(text)));
        }
        self
    }

    pub fn insert_embed(mut self, embed: Embed) -> Self {
        self.ops.push(DeltaOp::Insert(Insertion::Embed(embed)));
        self
    }

    pub fn delete(mut self, count: usize) -> Self {
        if count > 0 {
            self.ops.push(DeltaOp::Delete(count));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of insert operations in this delta.
    ///
    /// This is how much content must be deleted to take back an insertion
    /// whose engine split it into several units (e.g. a block embed that also
    /// inserted a line break).
    pub fn insertion_count(&self) -> usize {
        self.ops.iter().filter(|op| op.is_insert()).count()
    }

    /// Maps `position` through this delta. Content inserted at `position`
    /// pushes it right; content deleted around it pulls it back to the
    /// deletion point.
    pub fn transform_position(&self, position: usize) -> usize {
        let mut position = position;
        let mut offset = 0;
        for op in &self.ops {
            if offset > position {
                break;
            }
            match op {
                DeltaOp::Retain(count) => offset += count,
                DeltaOp::Insert(insertion) => {
                    position += insertion.len();
                    offset += insertion.len();
                }
                DeltaOp::Delete(count) => position -= (*count).min(position - offset),
            }
        }
        position
    }

    pub fn transform_range(&self, range: SelectionRange) -> SelectionRange {
        SelectionRange::from(
            self.transform_position(range.index)..self.transform_position(range.end()),
        )
    }

    pub fn insertions(&self) -> impl Iterator<Item = &Insertion> {
        self.ops.iter().filter_map(|op| match op {
            DeltaOp::Insert(insertion) => Some(insertion),
            DeltaOp::Retain(_) | DeltaOp::Delete(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::PreviewEmbedValue;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn insertion_count_ignores_retain_and_delete() {
        let delta = Delta::new()
            .retain(5)
            .insert_text("\n")
            .insert_embed(Embed::ImagePreview(PreviewEmbedValue::new("data:,")))
            .delete(2);
        assert_eq!(delta.insertion_count(), 2);
        assert_eq!(Delta::new().retain(3).insertion_count(), 0);
        assert_eq!(Delta::new().insertion_count(), 0);
    }

    #[test]
    fn transform_position_shifts_past_inserts_and_into_deletes() {
        let insert = Delta::new()
            .retain(3)
            .insert_text("\n")
            .insert_embed(Embed::Image("u".to_string()));
        assert_eq!(insert.transform_position(2), 2);
        assert_eq!(insert.transform_position(3), 5);
        assert_eq!(insert.transform_position(7), 9);

        let delete = Delta::new().retain(2).delete(3);
        assert_eq!(delete.transform_position(2), 2);
        assert_eq!(delete.transform_position(4), 2);
        assert_eq!(delete.transform_position(6), 3);
        assert_eq!(
            delete.transform_range(SelectionRange::new(1, 5)),
            SelectionRange::new(1, 2)
        );
    }

    #[test]
    fn zero_sized_ops_are_dropped() {
        let delta = Delta::new().retain(0).insert_text("").delete(0);
        assert!(delta.is_empty());
    }

    #[test]
    fn parses_rich_text_delta_json() {
        let delta: Delta = serde_json::from_value(json!({
            "ops": [
                { "insert": "hello" },
                { "insert": { "image": "https://cdn/x.png" } },
                { "retain": 2 },
                { "delete": 1 }
            ]
        }))
        .expect("parse delta");

        assert_eq!(
            delta,
            Delta::new()
                .insert_text("hello")
                .insert_embed(Embed::Image("https://cdn/x.png".to_string()))
                .retain(2)
                .delete(1)
        );
        assert_eq!(
            delta.insertions().map(Insertion::len).collect::<Vec<_>>(),
            vec![5, 1]
        );
    }
}

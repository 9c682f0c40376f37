//! In-memory [`DocumentEngine`] used by the CLI and tests.
//!
//! Content is a flat sequence of units (one per `char`, one per embed) that
//! always ends with a line break. Block embeds inserted in the middle of a
//! line first break the line, so their insertion delta carries two insert
//! operations; inline embeds carry one.

use imgdrop_protocol::Delta;
use imgdrop_protocol::DeltaOp;
use imgdrop_protocol::Embed;
use imgdrop_protocol::FormatRegistry;
use imgdrop_protocol::Insertion;
use imgdrop_protocol::PreviewEmbed;
use imgdrop_protocol::SelectionRange;
use imgdrop_protocol::Source;
use imgdrop_protocol::preview_embed::escape_html;
use thiserror::Error;

use crate::engine::DocumentEngine;
use crate::engine::PointerPosition;

/// Placeholder character used for embeds in [`MemoryDocument::text`].
pub const EMBED_CHAR: char = '\u{FFFC}';

#[derive(Debug, Clone, PartialEq, Eq)]
enum Unit {
    Char(char),
    Embed(Embed),
}

/// A change applied to the document, as an editor's history would record it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub delta: Delta,
    inverse: Delta,
    pub source: Source,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("document delta must only contain inserts, found {0:?}")]
    NotInsertOnly(DeltaOp),
}

#[derive(Debug, Clone)]
pub struct MemoryDocument {
    units: Vec<Unit>,
    registry: FormatRegistry,
    focused: bool,
    selection: SelectionRange,
    changes: Vec<Change>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// An empty document (a single line break) with the default formats.
    pub fn new() -> Self {
        Self {
            units: vec![Unit::Char('\n')],
            registry: FormatRegistry::with_defaults(),
            focused: false,
            selection: SelectionRange::default(),
            changes: Vec::new(),
        }
    }

    pub fn from_text(text: &str) -> Self {
        let mut doc = Self::new();
        doc.units = text.chars().map(Unit::Char).collect();
        doc.ensure_trailing_newline();
        doc
    }

    pub fn from_delta(delta: &Delta) -> Result<Self, DocumentError> {
        let mut doc = Self::new();
        doc.units.clear();
        for op in &delta.ops {
            match op {
                DeltaOp::Insert(insertion) => doc.units.extend(units_of(insertion)),
                other => return Err(DocumentError::NotInsertOnly(other.clone())),
            }
        }
        doc.ensure_trailing_newline();
        Ok(doc)
    }

    pub fn with_registry(mut self, registry: FormatRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry_mut(&mut self) -> &mut FormatRegistry {
        &mut self.registry
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.len() <= 1
    }

    /// Plain text view; embeds appear as [`EMBED_CHAR`].
    pub fn text(&self) -> String {
        self.units
            .iter()
            .map(|unit| match unit {
                Unit::Char(c) => *c,
                Unit::Embed(_) => EMBED_CHAR,
            })
            .collect()
    }

    pub fn embeds(&self) -> Vec<(usize, &Embed)> {
        self.units
            .iter()
            .enumerate()
            .filter_map(|(index, unit)| match unit {
                Unit::Embed(embed) => Some((index, embed)),
                Unit::Char(_) => None,
            })
            .collect()
    }

    /// The whole document as an insert-only delta.
    pub fn to_delta(&self) -> Delta {
        let mut delta = Delta::new();
        let mut text = String::new();
        for unit in &self.units {
            match unit {
                Unit::Char(c) => text.push(*c),
                Unit::Embed(embed) => {
                    delta = delta
                        .insert_text(std::mem::take(&mut text))
                        .insert_embed(embed.clone());
                }
            }
        }
        delta.insert_text(text)
    }

    pub fn to_html(&self) -> String {
        let mut html = String::new();
        let mut line = String::new();
        for unit in &self.units {
            match unit {
                Unit::Char('\n') => {
                    if line.is_empty() {
                        line.push_str("<br>");
                    }
                    html.push_str(&format!("<p>{line}</p>"));
                    line.clear();
                }
                Unit::Char(c) => line.push_str(&escape_html(c.encode_utf8(&mut [0; 4]))),
                Unit::Embed(Embed::Image(url)) => {
                    line.push_str(&format!("<img src=\"{}\">", escape_html(url)));
                }
                Unit::Embed(Embed::ImagePreview(value)) => {
                    line.push_str(&PreviewEmbed::render(value).to_html());
                }
            }
        }
        html
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Drops focus; the document then reports no selection.
    pub fn blur(&mut self) {
        self.focused = false;
    }

    /// Reverts the most recent recorded change. Silent changes are never
    /// recorded, so they cannot be undone. Returns `false` when there is
    /// nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(change) = self.changes.pop() else {
            return false;
        };
        self.apply(&change.inverse);
        true
    }

    fn ensure_trailing_newline(&mut self) {
        if self.units.last() != Some(&Unit::Char('\n')) {
            self.units.push(Unit::Char('\n'));
        }
    }

    /// Last index content may be inserted at (before the trailing newline).
    fn max_index(&self) -> usize {
        self.units.len().saturating_sub(1)
    }

    fn record(&mut self, delta: Delta, source: Source) -> Delta {
        if delta.is_empty() {
            return delta;
        }
        let inverse = self.apply(&delta);
        self.selection = delta.transform_range(self.selection);
        if source != Source::Silent {
            self.changes.push(Change {
                delta: delta.clone(),
                inverse,
                source,
            });
        }
        delta
    }

    /// Applies `delta` and returns the delta that reverts it.
    fn apply(&mut self, delta: &Delta) -> Delta {
        let mut inverse = Delta::new();
        let mut cursor = 0;
        for op in &delta.ops {
            match op {
                DeltaOp::Retain(count) => {
                    cursor += count;
                    inverse = inverse.retain(*count);
                }
                DeltaOp::Insert(insertion) => {
                    let units = units_of(insertion);
                    let inserted = units.len();
                    self.units.splice(cursor..cursor, units);
                    cursor += inserted;
                    inverse = inverse.delete(inserted);
                }
                DeltaOp::Delete(count) => {
                    let end = (cursor + count).min(self.units.len());
                    for unit in self.units.drain(cursor..end) {
                        inverse = match unit {
                            Unit::Char(c) => inverse.insert_text(c),
                            Unit::Embed(embed) => inverse.insert_embed(embed),
                        };
                    }
                }
            }
        }
        inverse
    }
}

impl DocumentEngine for MemoryDocument {
    fn focus(&mut self) {
        self.focused = true;
    }

    fn get_selection(&self) -> Option<SelectionRange> {
        self.focused.then_some(self.selection)
    }

    fn set_selection(&mut self, range: SelectionRange, _source: Source) {
        let index = range.index.min(self.max_index());
        let end = range.end().min(self.max_index());
        self.selection = SelectionRange::from(index..end);
        self.focused = true;
    }

    fn insert_embed(&mut self, index: usize, embed: Embed, source: Source) -> Delta {
        if !self.registry.accepts(&embed) {
            tracing::debug!("ignoring embed of unregistered format {}", embed.format_name());
            return Delta::new();
        }
        let index = index.min(self.max_index());
        let mut delta = Delta::new().retain(index);
        if embed.format().is_block()
            && index > 0
            && self.units.get(index - 1) != Some(&Unit::Char('\n'))
        {
            delta = delta.insert_text("\n");
        }
        self.record(delta.insert_embed(embed), source)
    }

    fn delete_text(&mut self, index: usize, length: usize, source: Source) -> Delta {
        let index = index.min(self.max_index());
        let length = length.min(self.max_index() - index);
        self.record(Delta::new().retain(index).delete(length), source)
    }

    fn index_from_point(&self, point: PointerPosition) -> Option<usize> {
        if point.x < 0.0 || point.y < 0.0 {
            return None;
        }
        let target_line = point.y.floor() as usize;
        let mut line_start = 0;
        for (line, line_end) in self
            .units
            .iter()
            .enumerate()
            .filter(|(_, unit)| **unit == Unit::Char('\n'))
            .map(|(index, _)| index)
            .enumerate()
        {
            if line == target_line {
                let column = (point.x.floor() as usize).min(line_end - line_start);
                return Some(line_start + column);
            }
            line_start = line_end + 1;
        }
        None
    }
}

fn units_of(insertion: &Insertion) -> Vec<Unit> {
    match insertion {
        Insertion::Text(text) => text.chars().map(Unit::Char).collect(),
        Insertion::Embed(embed) => vec![Unit::Embed(embed.clone())],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgdrop_protocol::EmbedFormat;
    use imgdrop_protocol::PreviewEmbedValue;
    use pretty_assertions::assert_eq;

    fn preview(src: &str) -> Embed {
        Embed::ImagePreview(PreviewEmbedValue::new(src))
    }

    fn doc_with_previews(text: &str) -> MemoryDocument {
        let mut doc = MemoryDocument::from_text(text);
        doc.registry_mut().register(EmbedFormat::ImagePreview);
        doc
    }

    #[test]
    fn from_text_appends_trailing_newline() {
        assert_eq!(MemoryDocument::from_text("abc").text(), "abc\n");
        assert_eq!(MemoryDocument::from_text("abc\n").text(), "abc\n");
        assert!(MemoryDocument::new().is_empty());
    }

    #[test]
    fn inline_embed_is_one_insert() {
        let mut doc = MemoryDocument::from_text("hello world");
        let delta = doc.insert_embed(5, Embed::Image("u".to_string()), Source::User);
        assert_eq!(
            delta,
            Delta::new()
                .retain(5)
                .insert_embed(Embed::Image("u".to_string()))
        );
        assert_eq!(doc.text(), "hello\u{FFFC} world\n");
    }

    #[test]
    fn block_embed_mid_line_breaks_the_line_first() {
        let mut doc = doc_with_previews("hello world");
        let delta = doc.insert_embed(5, preview("data:,"), Source::User);
        assert_eq!(delta.insertion_count(), 2);
        assert_eq!(doc.text(), "hello\n\u{FFFC} world\n");

        doc.delete_text(5, 2, Source::User);
        assert_eq!(doc.text(), "hello world\n");
    }

    #[test]
    fn block_embed_at_line_start_is_one_insert() {
        let mut doc = doc_with_previews("abcd\nefgh");
        let delta = doc.insert_embed(5, preview("data:,"), Source::User);
        assert_eq!(delta.insertion_count(), 1);
        assert_eq!(doc.text(), "abcd\n\u{FFFC}efgh\n");
    }

    #[test]
    fn unregistered_embed_is_rejected() {
        let mut doc = MemoryDocument::from_text("abc");
        let delta = doc.insert_embed(1, preview("data:,"), Source::User);
        assert!(delta.is_empty());
        assert_eq!(doc.text(), "abc\n");
        assert!(doc.changes().is_empty());
    }

    #[test]
    fn indices_are_clamped_before_trailing_newline() {
        let mut doc = MemoryDocument::from_text("ab");
        doc.insert_embed(99, Embed::Image("u".to_string()), Source::User);
        assert_eq!(doc.text(), "ab\u{FFFC}\n");

        doc.delete_text(1, 99, Source::User);
        assert_eq!(doc.text(), "a\n");
    }

    #[test]
    fn selection_requires_focus_and_follows_edits() {
        let mut doc = MemoryDocument::from_text("abcdef");
        assert_eq!(doc.get_selection(), None);

        doc.focus();
        assert_eq!(doc.get_selection(), Some(SelectionRange::caret(0)));

        doc.set_selection(SelectionRange::caret(4), Source::User);
        doc.insert_embed(1, Embed::Image("u".to_string()), Source::User);
        assert_eq!(doc.get_selection(), Some(SelectionRange::caret(5)));

        doc.delete_text(0, 3, Source::User);
        assert_eq!(doc.get_selection(), Some(SelectionRange::caret(2)));

        doc.blur();
        assert_eq!(doc.get_selection(), None);
    }

    #[test]
    fn undo_reverts_recorded_changes_in_reverse_order() {
        let mut doc = MemoryDocument::from_text("abc");
        doc.delete_text(2, 1, Source::Silent);
        doc.insert_embed(1, Embed::Image("u".to_string()), Source::User);
        doc.delete_text(0, 1, Source::Api);
        assert_eq!(doc.text(), "\u{FFFC}b\n");
        assert_eq!(
            doc.changes()
                .iter()
                .map(|change| change.source)
                .collect::<Vec<_>>(),
            vec![Source::User, Source::Api]
        );

        assert!(doc.undo());
        assert_eq!(doc.text(), "a\u{FFFC}b\n");
        assert!(doc.undo());
        assert_eq!(doc.text(), "ab\n");
        assert!(!doc.undo());
    }

    #[test]
    fn delta_round_trip_keeps_embeds() {
        let mut doc = doc_with_previews("ab");
        doc.insert_embed(1, Embed::Image("https://cdn/x.png".to_string()), Source::User);
        let restored = MemoryDocument::from_delta(&doc.to_delta()).expect("insert-only delta");
        assert_eq!(restored.text(), doc.text());
        assert_eq!(
            restored.embeds(),
            vec![(1, &Embed::Image("https://cdn/x.png".to_string()))]
        );

        let err = MemoryDocument::from_delta(&Delta::new().retain(1));
        assert_eq!(err.err(), Some(DocumentError::NotInsertOnly(DeltaOp::Retain(1))));
    }

    #[test]
    fn index_from_point_resolves_line_and_column() {
        let doc = MemoryDocument::from_text("abcd\nef\n\nxyz");
        assert_eq!(doc.index_from_point(PointerPosition::new(2.0, 0.0)), Some(2));
        assert_eq!(doc.index_from_point(PointerPosition::new(9.0, 1.0)), Some(7));
        assert_eq!(doc.index_from_point(PointerPosition::new(0.5, 2.0)), Some(8));
        assert_eq!(doc.index_from_point(PointerPosition::new(1.0, 3.0)), Some(10));
        assert_eq!(doc.index_from_point(PointerPosition::new(0.0, 4.0)), None);
        assert_eq!(doc.index_from_point(PointerPosition::new(-1.0, 0.0)), None);
    }

    #[test]
    fn html_renders_images_and_previews() {
        let mut doc = doc_with_previews("a<b\n");
        doc.insert_embed(0, preview("data:x"), Source::User);
        doc.insert_embed(2, Embed::Image("u".to_string()), Source::User);
        assert_eq!(
            doc.to_html(),
            "<p><span class=\"image-uploading\" data-src=\"data:x\"><img src=\"data:x\"></span>\
             a<img src=\"u\">&lt;b</p>"
        );
    }
}

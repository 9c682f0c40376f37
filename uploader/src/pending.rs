//! Per-upload bookkeeping and the preview → final embed reconciliation.
//!
//! Each upload task owns its own [`PendingUpload`]; nothing here is shared
//! between tasks, so overlapping uploads cannot clobber each other's captured
//! range or preview length.
//!
//! The preview length is the number of insert operations the engine reported
//! when the preview went in, fixed at that moment. It is not re-validated
//! against the document before deletion.

use imgdrop_protocol::Delta;
use imgdrop_protocol::Embed;
use imgdrop_protocol::PreviewEmbedValue;
use imgdrop_protocol::SelectionRange;
use imgdrop_protocol::Source;

use crate::engine::DocumentEngine;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingUpload {
    /// Selection captured when the upload was triggered; `None` when the
    /// document had no selection, in which case no document calls are made.
    pub captured_range: Option<SelectionRange>,
    /// Delta returned by the preview insertion, once it happened.
    pub preview_operations: Option<Delta>,
    /// Set once the upload settled; later preview sources are ignored.
    pub settled: bool,
}

impl PendingUpload {
    pub fn new(captured_range: Option<SelectionRange>) -> Self {
        Self {
            captured_range,
            preview_operations: None,
            settled: false,
        }
    }

    /// How many units the preview occupies (0 when it was never inserted).
    pub fn preview_len(&self) -> usize {
        self.preview_operations
            .as_ref()
            .map_or(0, Delta::insertion_count)
    }

    /// Inserts the local preview at the captured index. No-op once settled or
    /// without a captured range. Returns whether a preview was inserted.
    pub fn insert_preview<E>(&mut self, engine: &mut E, src: String) -> bool
    where
        E: DocumentEngine + ?Sized,
    {
        if self.settled {
            return false;
        }
        let Some(range) = self.captured_range else {
            return false;
        };
        let delta = engine.insert_embed(
            range.index,
            Embed::ImagePreview(PreviewEmbedValue::new(src)),
            Source::User,
        );
        self.preview_operations = Some(delta);
        true
    }

    /// Swaps the preview for the uploaded image and moves the caret past it.
    /// Returns the new selection, or `None` without a captured range.
    pub fn complete<E>(&mut self, engine: &mut E, url: String) -> Option<SelectionRange>
    where
        E: DocumentEngine + ?Sized,
    {
        self.settled = true;
        let preview_len = self.remove_preview(engine);
        let range = self.captured_range.as_mut()?;
        engine.insert_embed(range.index, Embed::Image(url), Source::User);
        range.index += 1;
        engine.set_selection(*range, Source::User);
        tracing::debug!("replaced {preview_len} preview unit(s) at {}", range.index - 1);
        Some(*range)
    }

    /// Removes whatever the preview added. Returns the number of units deleted.
    pub fn fail<E>(&mut self, engine: &mut E) -> usize
    where
        E: DocumentEngine + ?Sized,
    {
        self.settled = true;
        self.remove_preview(engine)
    }

    fn remove_preview<E>(&mut self, engine: &mut E) -> usize
    where
        E: DocumentEngine + ?Sized,
    {
        let Some(range) = self.captured_range else {
            return 0;
        };
        let preview_len = self.preview_len();
        if preview_len > 0 {
            engine.delete_text(range.index, preview_len, Source::User);
        }
        self.preview_operations = None;
        preview_len
    }
}

//! Captured ranges of the uploads still in flight.
//!
//! Every change an upload task applies is mapped through the ranges of the
//! other live tasks, so a preview or final image inserted ahead of another
//! upload's position moves that position along with the content. Edits made
//! outside the uploader are not tracked.

use std::collections::BTreeMap;

use imgdrop_protocol::Delta;
use imgdrop_protocol::Embed;
use imgdrop_protocol::SelectionRange;
use imgdrop_protocol::Source;

use crate::engine::DocumentEngine;
use crate::engine::PointerPosition;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct LiveRanges {
    ranges: BTreeMap<u64, SelectionRange>,
}

impl LiveRanges {
    pub(crate) fn insert(&mut self, task_id: u64, range: SelectionRange) {
        self.ranges.insert(task_id, range);
    }

    pub(crate) fn get(&self, task_id: u64) -> Option<SelectionRange> {
        self.ranges.get(&task_id).copied()
    }

    pub(crate) fn remove(&mut self, task_id: u64) {
        self.ranges.remove(&task_id);
    }

    /// Maps every range except `task_id`'s own through `delta`.
    pub(crate) fn shift_others(&mut self, task_id: u64, delta: &Delta) {
        if delta.is_empty() {
            return;
        }
        for (id, range) in &mut self.ranges {
            if *id != task_id {
                *range = delta.transform_range(*range);
            }
        }
    }
}

/// Engine view of one upload task: forwards every call and shifts the other
/// live ranges through each change it applies.
pub(crate) struct Tracked<'a, E: ?Sized> {
    pub(crate) engine: &'a mut E,
    pub(crate) live: &'a mut LiveRanges,
    pub(crate) task_id: u64,
}

impl<E> DocumentEngine for Tracked<'_, E>
where
    E: DocumentEngine + ?Sized,
{
    fn focus(&mut self) {
        self.engine.focus();
    }

    fn get_selection(&self) -> Option<SelectionRange> {
        self.engine.get_selection()
    }

    fn set_selection(&mut self, range: SelectionRange, source: Source) {
        self.engine.set_selection(range, source);
    }

    fn insert_embed(&mut self, index: usize, embed: Embed, source: Source) -> Delta {
        let delta = self.engine.insert_embed(index, embed, source);
        self.live.shift_others(self.task_id, &delta);
        delta
    }

    fn delete_text(&mut self, index: usize, length: usize, source: Source) -> Delta {
        let delta = self.engine.delete_text(index, length, source);
        self.live.shift_others(self.task_id, &delta);
        delta
    }

    fn index_from_point(&self, point: PointerPosition) -> Option<usize> {
        self.engine.index_from_point(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_document::MemoryDocument;
    use pretty_assertions::assert_eq;

    #[test]
    fn changes_shift_other_ranges_but_not_the_callers() {
        let mut doc = MemoryDocument::from_text("abcd\nefgh");
        let mut live = LiveRanges::default();
        live.insert(1, SelectionRange::caret(0));
        live.insert(2, SelectionRange::caret(5));
        live.insert(3, SelectionRange::caret(7));

        let mut tracked = Tracked {
            engine: &mut doc,
            live: &mut live,
            task_id: 1,
        };
        tracked.insert_embed(0, Embed::Image("a".to_string()), Source::User);
        assert_eq!(live.get(1), Some(SelectionRange::caret(0)));
        assert_eq!(live.get(2), Some(SelectionRange::caret(6)));
        assert_eq!(live.get(3), Some(SelectionRange::caret(8)));

        let mut tracked = Tracked {
            engine: &mut doc,
            live: &mut live,
            task_id: 2,
        };
        tracked.delete_text(1, 2, Source::User);
        assert_eq!(live.get(1), Some(SelectionRange::caret(0)));
        assert_eq!(live.get(2), Some(SelectionRange::caret(6)));
        assert_eq!(live.get(3), Some(SelectionRange::caret(6)));
    }

    #[test]
    fn rejected_embeds_shift_nothing() {
        let mut doc = MemoryDocument::from_text("abc");
        let mut live = LiveRanges::default();
        live.insert(2, SelectionRange::caret(2));

        let mut tracked = Tracked {
            engine: &mut doc,
            live: &mut live,
            task_id: 1,
        };
        let delta = tracked.insert_embed(
            0,
            Embed::ImagePreview(imgdrop_protocol::PreviewEmbedValue::new("data:,")),
            Source::User,
        );
        assert!(delta.is_empty());
        assert_eq!(live.get(2), Some(SelectionRange::caret(2)));

        live.remove(2);
        assert_eq!(live, LiveRanges::default());
    }
}

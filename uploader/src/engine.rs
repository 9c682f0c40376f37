use imgdrop_protocol::Delta;
use imgdrop_protocol::Embed;
use imgdrop_protocol::SelectionRange;
use imgdrop_protocol::Source;

/// Pointer coordinates carried by a drop event.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerPosition {
    pub x: f64,
    pub y: f64,
}

impl PointerPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The editable, position-addressed document the uploader writes into.
///
/// Implementations treat each call as atomic. Every mutation returns a
/// [`Delta`] describing what was applied. The uploader additionally needs
/// the engine to be `Send + 'static` so upload tasks can share it.
pub trait DocumentEngine {
    /// Gives the document input focus so a selection exists.
    fn focus(&mut self);

    fn get_selection(&self) -> Option<SelectionRange>;

    fn set_selection(&mut self, range: SelectionRange, source: Source);

    /// Inserts `embed` at `index`. Embeds of an unregistered format are
    /// rejected with an empty delta.
    fn insert_embed(&mut self, index: usize, embed: Embed, source: Source) -> Delta;

    fn delete_text(&mut self, index: usize, length: usize, source: Source) -> Delta;

    /// Resolves the document index under `point`, if any.
    fn index_from_point(&self, point: PointerPosition) -> Option<usize>;
}

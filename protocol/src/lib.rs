//! Value types shared between document engines and the image uploader.

pub mod delta;
pub mod embed;
pub mod preview_embed;
mod selection;

pub use delta::Delta;
pub use delta::DeltaOp;
pub use delta::Insertion;
pub use embed::Embed;
pub use embed::EmbedFormat;
pub use embed::FormatRegistry;
pub use embed::PreviewEmbedValue;
pub use preview_embed::PreviewEmbed;
pub use preview_embed::PreviewNode;
pub use preview_embed::PreviewSource;
pub use selection::SelectionRange;
pub use selection::Source;

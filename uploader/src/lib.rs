//! Image upload orchestration for rich-text documents.
//!
//! An [`ImageUploader`] shows a local preview of an image at the caret while
//! the image uploads, then swaps the preview for an embed that references the
//! uploaded URL. On failure the preview is removed and the document is left as
//! it was. Documents are driven through the [`DocumentEngine`] trait;
//! [`MemoryDocument`] is an in-memory implementation.

mod engine;
mod error;
mod file;
mod live_ranges;
pub mod memory_document;
mod mime;
mod options;
mod orchestrator;
mod pending;
mod triggers;

pub use engine::DocumentEngine;
pub use engine::PointerPosition;
pub use error::UploadError;
pub use file::FileSource;
pub use file::ImageFile;
pub use file::read_as_data_uri;
pub use memory_document::MemoryDocument;
pub use mime::is_pasteable_image_mime;
pub use mime::mime_for_path;
pub use mime::normalize_dropped_path;
pub use options::ImageUploaderOptions;
pub use options::UploadFn;
pub use options::UploadFuture;
pub use orchestrator::ImageUploader;
pub use orchestrator::UploadHandle;
pub use orchestrator::UploadOutcome;
pub use orchestrator::register_formats;
pub use pending::PendingUpload;
pub use triggers::ClipboardEntry;
pub use triggers::FilePicker;
pub use triggers::IMAGE_ACCEPT;
pub use triggers::NoFilePicker;
pub use triggers::PasteHandling;

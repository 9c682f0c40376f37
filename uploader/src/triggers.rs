//! Input shapes of the three ways an image reaches the uploader: a toolbar
//! file picker, a drop, and a clipboard paste. Hosts adapt their own UI events
//! into these values.

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::file::ImageFile;
use crate::mime::is_pasteable_image_mime;
use crate::orchestrator::UploadHandle;

/// `accept` filter passed to the file picker.
pub const IMAGE_ACCEPT: &str = "image/*";

/// The host's file-selection surface.
pub trait FilePicker: Send + Sync {
    /// Resolves to the chosen file, or `None` when the user dismissed the picker.
    fn pick(&self, accept: &str) -> BoxFuture<'static, Option<ImageFile>>;
}

impl<F> FilePicker for F
where
    F: Fn(&str) -> BoxFuture<'static, Option<ImageFile>> + Send + Sync,
{
    fn pick(&self, accept: &str) -> BoxFuture<'static, Option<ImageFile>> {
        self(accept)
    }
}

/// Picker for hosts without a file-selection surface; always dismissed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFilePicker;

impl FilePicker for NoFilePicker {
    fn pick(&self, _accept: &str) -> BoxFuture<'static, Option<ImageFile>> {
        futures::future::ready(None).boxed()
    }
}

/// One item of a paste event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardEntry {
    pub mime: String,
    file: Option<ImageFile>,
}

impl ClipboardEntry {
    pub fn new(mime: impl Into<String>, file: Option<ImageFile>) -> Self {
        Self {
            mime: mime.into(),
            file,
        }
    }

    /// A file-backed entry whose type is the file's own MIME type.
    pub fn from_file(file: ImageFile) -> Self {
        Self {
            mime: file.mime.clone(),
            file: Some(file),
        }
    }

    pub fn get_as_file(&self) -> Option<&ImageFile> {
        self.file.as_ref()
    }
}

/// What the host should do with a paste event.
#[derive(Debug)]
pub enum PasteHandling {
    /// Let the host's default paste handling run.
    Default,
    /// The default action was prevented; an image upload was started.
    Intercepted(UploadHandle),
}

impl PasteHandling {
    pub fn is_intercepted(&self) -> bool {
        matches!(self, PasteHandling::Intercepted(_))
    }
}

/// The first entry with a pasteable image type whose file can be read.
pub(crate) fn first_pasteable_image(entries: &[ClipboardEntry]) -> Option<ImageFile> {
    entries
        .iter()
        .filter(|entry| is_pasteable_image_mime(&entry.mime))
        .find_map(|entry| entry.get_as_file().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn first_pasteable_image_skips_text_and_fileless_entries() {
        let png = ImageFile::from_bytes("a.png", "image/png", b"png");
        let gif = ImageFile::from_bytes("b.gif", "image/gif", b"gif");
        let entries = vec![
            ClipboardEntry::new("text/plain", Some(ImageFile::from_bytes("t", "text/plain", b"t"))),
            ClipboardEntry::new("image/jpeg", None),
            ClipboardEntry::from_file(png.clone()),
            ClipboardEntry::from_file(gif),
        ];
        assert_eq!(first_pasteable_image(&entries), Some(png));
        assert_eq!(first_pasteable_image(&entries[..2]), None);
    }

    #[tokio::test]
    async fn no_file_picker_is_always_dismissed() {
        assert_eq!(NoFilePicker.pick(IMAGE_ACCEPT).await, None);
    }
}

use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::UploadError;
use crate::mime::mime_for_path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    Memory(Arc<[u8]>),
    Path(PathBuf),
}

/// A file handed to the uploader by a trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub mime: String,
    pub source: FileSource,
}

impl ImageFile {
    pub fn from_bytes(name: impl Into<String>, mime: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            source: FileSource::Memory(Arc::from(bytes)),
        }
    }

    /// A file backed by `path`; the MIME type is inferred from its extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            mime: mime_for_path(&path).to_string(),
            source: FileSource::Path(path),
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = mime.into();
        self
    }

    pub async fn read_bytes(&self) -> Result<Arc<[u8]>, UploadError> {
        match &self.source {
            FileSource::Memory(bytes) => Ok(Arc::clone(bytes)),
            FileSource::Path(path) => tokio::fs::read(path)
                .await
                .map(Arc::from)
                .map_err(|source| UploadError::Read {
                    name: self.name.clone(),
                    source,
                }),
        }
    }
}

/// Reads `file` into a `data:` URI usable as a local preview source.
pub async fn read_as_data_uri(file: &ImageFile) -> Result<String, UploadError> {
    let bytes = file.read_bytes().await?;
    Ok(format!("data:{};base64,{}", file.mime, STANDARD.encode(&bytes)))
}

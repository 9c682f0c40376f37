use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::file::ImageFile;

pub type UploadFuture = BoxFuture<'static, anyhow::Result<String>>;

/// Uploads a file and resolves to the URL the final embed should reference.
pub type UploadFn = Arc<dyn Fn(ImageFile) -> UploadFuture + Send + Sync>;

/// Construction-time configuration of an [`ImageUploader`](crate::ImageUploader).
#[derive(Clone, Default)]
pub struct ImageUploaderOptions {
    /// Without it the uploader still wires its triggers, but every upload fails.
    pub upload: Option<UploadFn>,
}

impl ImageUploaderOptions {
    pub fn with_upload<F, Fut>(upload: F) -> Self
    where
        F: Fn(ImageFile) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        Self {
            upload: Some(Arc::new(move |file| upload(file).boxed())),
        }
    }
}

impl std::fmt::Debug for ImageUploaderOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUploaderOptions")
            .field("upload", &self.upload.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    /// No upload function was configured; every intake fails at the upload step.
    #[error("[Missing config] upload function that returns a future is required")]
    MissingUploadFn,

    /// The configured upload function rejected the file.
    #[error("{0:#}")]
    Rejected(anyhow::Error),

    /// The local preview source could not be read.
    #[error("failed to read `{name}` for preview: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("upload task stopped before settling: {0}")]
    TaskAborted(String),
}

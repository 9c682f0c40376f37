//! Upload store backed by a local directory: files are copied under a fresh
//! name and exposed through a URL prefix.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use imgdrop_uploader::ImageFile;
use imgdrop_uploader::ImageUploaderOptions;
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::path_utils::display_with_tilde;
use crate::path_utils::expand_tilde;

/// Where uploads go and how they are addressed, after flags and config are merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub dir: PathBuf,
    pub base_url: String,
}

impl StoreSettings {
    /// Flags win over config; the directory defaults to `<imgdrop home>/uploads`
    /// and the base URL to the directory's `file://` URL.
    pub fn resolve(
        flag_dir: Option<&Path>,
        flag_base_url: Option<&str>,
        config: &StoreConfig,
        imgdrop_home: &Path,
    ) -> anyhow::Result<Self> {
        let dir = flag_dir
            .map(Path::to_path_buf)
            .or_else(|| config.dir.as_deref().map(PathBuf::from))
            .map(|dir| expand_tilde(&dir))
            .unwrap_or_else(|| imgdrop_home.join("uploads"));
        let dir = std::path::absolute(&dir)
            .with_context(|| format!("resolve store dir {}", dir.display()))?;

        let base_url = match flag_base_url.or(config.base_url.as_deref()) {
            Some(base_url) => base_url.to_string(),
            None => url::Url::from_directory_path(&dir)
                .map_err(|()| anyhow::anyhow!("store dir {} has no file URL", dir.display()))?
                .to_string(),
        };

        Ok(Self {
            dir,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct DirectoryStore {
    settings: StoreSettings,
    /// When set, every upload is rejected with this reason.
    failure: Option<String>,
}

impl DirectoryStore {
    pub fn new(settings: StoreSettings) -> Self {
        Self {
            settings,
            failure: None,
        }
    }

    pub fn with_failure(mut self, failure: Option<String>) -> Self {
        self.failure = failure;
        self
    }

    pub async fn upload(&self, file: ImageFile) -> anyhow::Result<String> {
        if let Some(reason) = &self.failure {
            anyhow::bail!("{reason}");
        }

        let bytes = file.read_bytes().await?;
        let name = format!("{}.{}", Uuid::now_v7(), extension_for(&file));
        tokio::fs::create_dir_all(&self.settings.dir)
            .await
            .with_context(|| format!("create {}", self.settings.dir.display()))?;
        let path = self.settings.dir.join(&name);
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("write {}", path.display()))?;

        tracing::info!("stored {} as {}", file.name, display_with_tilde(&path));
        Ok(format!("{}/{name}", self.settings.base_url))
    }

    pub fn into_options(self) -> ImageUploaderOptions {
        let store = Arc::new(self);
        ImageUploaderOptions::with_upload(move |file| {
            let store = Arc::clone(&store);
            async move { store.upload(file).await }
        })
    }
}

/// Extension for the stored copy: the file's own when it has one, otherwise
/// one derived from its MIME type.
fn extension_for(file: &ImageFile) -> String {
    if let Some(ext) = Path::new(&file.name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
    {
        return ext.to_ascii_lowercase();
    }
    match file.mime.to_ascii_lowercase().as_str() {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/gif" => "gif",
        "image/svg" | "image/svg+xml" => "svg",
        "image/webp" => "webp",
        _ => "bin",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn settings(dir: &Path) -> StoreSettings {
        StoreSettings {
            dir: dir.to_path_buf(),
            base_url: "https://cdn.example.com/img".to_string(),
        }
    }

    #[tokio::test]
    async fn upload_copies_bytes_and_returns_prefixed_url() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DirectoryStore::new(settings(&dir.path().join("uploads")));

        let url = store
            .upload(ImageFile::from_bytes("shot.PNG", "image/png", b"\x89PNG"))
            .await
            .expect("upload");

        let name = url
            .strip_prefix("https://cdn.example.com/img/")
            .expect("url uses base url");
        assert!(name.ends_with(".png"), "{name}");
        let stored = std::fs::read(dir.path().join("uploads").join(name)).expect("stored file");
        assert_eq!(stored, b"\x89PNG".to_vec());
    }

    #[tokio::test]
    async fn each_upload_gets_a_fresh_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DirectoryStore::new(settings(dir.path()));
        let file = ImageFile::from_bytes("clip", "image/webp", b"RIFF");

        let first = store.upload(file.clone()).await.expect("first upload");
        let second = store.upload(file).await.expect("second upload");
        assert_ne!(first, second);
        assert!(first.ends_with(".webp"), "{first}");
    }

    #[tokio::test]
    async fn configured_failure_rejects_without_writing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store_dir = dir.path().join("uploads");
        let store = DirectoryStore::new(settings(&store_dir))
            .with_failure(Some("network error".to_string()));

        let err = store
            .upload(ImageFile::from_bytes("a.png", "image/png", b"png"))
            .await
            .expect_err("upload should fail");
        assert_eq!(err.to_string(), "network error");
        assert!(!store_dir.exists());
    }

    #[test]
    fn flags_override_config() {
        let config = StoreConfig {
            dir: Some("/srv/config-dir".to_string()),
            base_url: Some("https://config.example.com/".to_string()),
        };
        let resolved = StoreSettings::resolve(
            Some(Path::new("/srv/flag-dir")),
            None,
            &config,
            Path::new("/home/u/.imgdrop"),
        )
        .expect("resolve");
        assert_eq!(
            resolved,
            StoreSettings {
                dir: PathBuf::from("/srv/flag-dir"),
                base_url: "https://config.example.com".to_string(),
            }
        );
    }

    #[cfg(not(windows))]
    #[test]
    fn defaults_to_file_urls_under_imgdrop_home() {
        let resolved = StoreSettings::resolve(
            None,
            None,
            &StoreConfig::default(),
            Path::new("/home/u/.imgdrop"),
        )
        .expect("resolve");
        assert_eq!(
            resolved,
            StoreSettings {
                dir: PathBuf::from("/home/u/.imgdrop/uploads"),
                base_url: "file:///home/u/.imgdrop/uploads".to_string(),
            }
        );
    }

    #[test]
    fn extension_falls_back_to_mime() {
        assert_eq!(
            extension_for(&ImageFile::from_bytes("a.JPEG", "image/jpeg", b"")),
            "jpeg"
        );
        assert_eq!(
            extension_for(&ImageFile::from_bytes("clip", "image/svg+xml", b"")),
            "svg"
        );
        assert_eq!(
            extension_for(&ImageFile::from_bytes("clip", "text/plain", b"")),
            "bin"
        );
    }
}

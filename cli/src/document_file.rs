use std::io::ErrorKind;
use std::path::Path;

use anyhow::Context;
use imgdrop_protocol::Delta;
use imgdrop_uploader::MemoryDocument;
use imgdrop_uploader::register_formats;

use crate::atomic_write::write_atomic_text;

/// Loads a JSON delta document; a missing file is an empty document.
pub fn load_document(path: &Path) -> anyhow::Result<MemoryDocument> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::debug!("{} does not exist yet; starting empty", path.display());
            return Ok(editable(MemoryDocument::new()));
        }
        Err(err) => {
            return Err(anyhow::Error::new(err).context(format!("read {}", path.display())));
        }
    };
    let delta: Delta = serde_json::from_str(&contents)
        .with_context(|| format!("parse {} as a delta", path.display()))?;
    let doc = MemoryDocument::from_delta(&delta)
        .with_context(|| format!("load {}", path.display()))?;
    Ok(editable(doc))
}

pub fn save_document(path: &Path, doc: &MemoryDocument) -> anyhow::Result<()> {
    write_atomic_text(path, &render_json(doc)?)
}

pub fn render_json(doc: &MemoryDocument) -> anyhow::Result<String> {
    serde_json::to_string_pretty(&doc.to_delta()).context("serialize document")
}

/// An empty document that accepts previews.
pub fn empty_document() -> MemoryDocument {
    editable(MemoryDocument::new())
}

fn editable(mut doc: MemoryDocument) -> MemoryDocument {
    register_formats(doc.registry_mut());
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgdrop_protocol::Embed;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_document_starts_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let doc = load_document(&dir.path().join("doc.json")).expect("load");
        assert_eq!(doc.text(), "\n");
    }

    #[test]
    fn saved_document_loads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("doc.json");
        std::fs::write(
            &path,
            r#"{"ops":[{"insert":"ab"},{"insert":{"image":"https://cdn/x.png"}},{"insert":"c\n"}]}"#,
        )
        .expect("seed");

        let doc = load_document(&path).expect("load");
        assert_eq!(doc.text(), "ab\u{FFFC}c\n");
        save_document(&path, &doc).expect("save");

        let reloaded = load_document(&path).expect("reload");
        assert_eq!(
            reloaded.embeds(),
            vec![(2, &Embed::Image("https://cdn/x.png".to_string()))]
        );
    }

    #[test]
    fn non_insert_delta_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("doc.json");
        std::fs::write(&path, r#"{"ops":[{"retain":3}]}"#).expect("seed");

        let err = load_document(&path).expect_err("retain is not a document");
        assert!(format!("{err:#}").contains("only contain inserts"), "{err:#}");
    }
}

use std::path::Path;

use anyhow::Context;
use tempfile::NamedTempFile;

/// Writes `contents` to `path` through a sibling temp file, creating parent
/// directories as needed. A trailing newline is added when missing.
pub fn write_atomic_text(path: &Path, contents: &str) -> anyhow::Result<()> {
    if contents.ends_with('\n') {
        write_atomic_bytes(path, contents.as_bytes())
    } else {
        write_atomic_bytes(path, format!("{contents}\n").as_bytes())
    }
}

pub fn write_atomic_bytes(path: &Path, contents: &[u8]) -> anyhow::Result<()> {
    let Some(parent) = path.parent() else {
        anyhow::bail!("invalid path for atomic write: {}", path.display());
    };
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };
    std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;

    let mut tmp = NamedTempFile::new_in(parent).context("create temp file")?;
    use std::io::Write as _;
    tmp.write_all(contents).context("write temp file")?;
    tmp.flush().context("flush temp file")?;

    tmp.persist(path).map_err(|err| {
        anyhow::Error::new(err.error).context(format!("persist file to {}", path.display()))
    })?;

    Ok(())
}

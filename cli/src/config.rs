use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use toml_edit::DocumentMut;
use toml_edit::Item as TomlItem;

const STORE_TABLE: &str = "store";

/// Read-only view of `~/.imgdrop/config.toml`.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

/// The `[store]` table; keys that are absent stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreConfig {
    pub dir: Option<String>,
    pub base_url: Option<String>,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn new_default() -> anyhow::Result<Self> {
        let Some(home) = dirs::home_dir() else {
            anyhow::bail!("cannot determine home directory for config path");
        };
        Ok(Self::new(default_config_path(&home)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the `[store]` table. A missing file yields an empty config; invalid
    /// TOML falls back to a line-based scan so one broken table does not hide
    /// the rest.
    pub fn store(&self) -> anyhow::Result<StoreConfig> {
        let Some(content) = read_document_string(&self.path)? else {
            return Ok(StoreConfig::default());
        };

        let doc = match content.parse::<DocumentMut>() {
            Ok(doc) => doc,
            Err(err) => {
                tracing::warn!(
                    "{} is not valid TOML, reading [store] line by line: {err}",
                    self.path.display()
                );
                return Ok(StoreConfig {
                    dir: parse_store_string_fallback(&content, "dir"),
                    base_url: parse_store_string_fallback(&content, "base_url"),
                });
            }
        };

        Ok(StoreConfig {
            dir: read_store_string(&doc, "dir"),
            base_url: read_store_string(&doc, "base_url"),
        })
    }
}

pub fn default_home_dir(home: &Path) -> PathBuf {
    home.join(".imgdrop")
}

fn default_config_path(home: &Path) -> PathBuf {
    default_home_dir(home).join("config.toml")
}

fn read_store_string(doc: &DocumentMut, key: &str) -> Option<String> {
    doc.get(STORE_TABLE)
        .and_then(TomlItem::as_table)
        .and_then(|store| store.get(key))
        .and_then(TomlItem::as_value)
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

fn parse_store_string_fallback(contents: &str, key: &str) -> Option<String> {
    let mut in_store = false;
    let mut result = None;

    for line in contents.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') {
            in_store = parse_table_header_name(trimmed) == Some(STORE_TABLE);
            continue;
        }

        if !in_store || trimmed.starts_with('#') {
            continue;
        }
        let Some((line_key, value)) = trimmed.split_once('=') else {
            continue;
        };
        if line_key.trim() != key {
            continue;
        }

        if let Some(value) = parse_quoted_string(value) {
            result = Some(value.to_string());
        }
    }

    result
}

/// The contents of a basic or literal TOML string at the start of `value`.
/// Escape sequences are not interpreted.
fn parse_quoted_string(value: &str) -> Option<&str> {
    let value = value.trim_start();
    let quote = value.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let rest = &value[1..];
    let end = rest.find(quote)?;
    Some(&rest[..end])
}

fn parse_table_header_name(line: &str) -> Option<&str> {
    let line = line.trim_start();
    if !line.starts_with('[') {
        return None;
    }
    let end = line.find(']')?;
    if end <= 1 {
        return None;
    }
    let name = line[1..end].trim();
    if name.is_empty() {
        return None;
    }
    Some(name)
}

fn read_document_string(path: &Path) -> anyhow::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(anyhow::Error::new(err).context("read config.toml")),
    }
}

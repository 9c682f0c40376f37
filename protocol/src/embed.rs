//! Embeddable (non-text) document content and the registry of embed formats.
//!
//! An [`Embed`] is a tagged variant keyed by its format name, so it serializes
//! the way rich-text deltas spell embeds: `{"image": "https://..."}` or
//! `{"imageBlot": {"src": "data:..."}}`. Document engines consult a
//! [`FormatRegistry`] and refuse to insert embeds whose format was never
//! registered.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

/// Format name of the final, uploaded image embed.
pub const IMAGE_FORMAT_NAME: &str = "image";

/// Format name of the transient local preview embed.
pub const PREVIEW_FORMAT_NAME: &str = "imageBlot";

/// Value held by a preview embed. Immutable once created.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct PreviewEmbedValue {
    /// Data URI (or opaque reference) of the image shown while uploading.
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<String>,
}

impl PreviewEmbedValue {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            custom: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum Embed {
    /// Uploaded image, referenced by URL.
    #[serde(rename = "image")]
    Image(String),
    /// Local preview shown until the upload settles.
    #[serde(rename = "imageBlot")]
    ImagePreview(PreviewEmbedValue),
}

impl Embed {
    pub fn format(&self) -> EmbedFormat {
        match self {
            Embed::Image(_) => EmbedFormat::Image,
            Embed::ImagePreview(_) => EmbedFormat::ImagePreview,
        }
    }

    pub fn format_name(&self) -> &'static str {
        self.format().name()
    }
}

/// The kinds of embeds a document can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmbedFormat {
    Image,
    ImagePreview,
}

impl EmbedFormat {
    pub fn name(self) -> &'static str {
        match self {
            EmbedFormat::Image => IMAGE_FORMAT_NAME,
            EmbedFormat::ImagePreview => PREVIEW_FORMAT_NAME,
        }
    }

    /// Block embeds occupy a line of their own; inline embeds sit inside a line.
    pub fn is_block(self) -> bool {
        matches!(self, EmbedFormat::ImagePreview)
    }
}

/// Name-keyed registry of the embed formats a document engine accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatRegistry {
    formats: BTreeMap<String, EmbedFormat>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that knows the engine's built-in formats (plain images).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(EmbedFormat::Image);
        registry
    }

    /// Registers `format` under its name. Returns `false` if it was already present.
    pub fn register(&mut self, format: EmbedFormat) -> bool {
        self.formats
            .insert(format.name().to_string(), format)
            .is_none()
    }

    pub fn lookup(&self, name: &str) -> Option<EmbedFormat> {
        self.formats.get(name).copied()
    }

    pub fn accepts(&self, embed: &Embed) -> bool {
        self.lookup(embed.format_name()) == Some(embed.format())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.formats.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn embeds_serialize_keyed_by_format_name() {
        let image = Embed::Image("https://cdn/x.png".to_string());
        assert_eq!(
            serde_json::to_value(&image).expect("serialize image"),
            json!({ "image": "https://cdn/x.png" })
        );

        let preview = Embed::ImagePreview(PreviewEmbedValue::new("data:image/png;base64,AA=="));
        assert_eq!(
            serde_json::to_value(&preview).expect("serialize preview"),
            json!({ "imageBlot": { "src": "data:image/png;base64,AA==" } })
        );
    }

    #[test]
    fn registry_only_accepts_registered_formats() {
        let mut registry = FormatRegistry::with_defaults();
        let preview = Embed::ImagePreview(PreviewEmbedValue::new("data:,"));
        assert!(registry.accepts(&Embed::Image("u".to_string())));
        assert!(!registry.accepts(&preview));

        assert!(registry.register(EmbedFormat::ImagePreview));
        assert!(!registry.register(EmbedFormat::ImagePreview));
        assert!(registry.accepts(&preview));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["image", "imageBlot"]);
    }
}

//! Value contract of the local preview embed (`imageBlot`).
//!
//! The preview is rendered as `<span class="image-uploading">` holding an
//! `<img>` with the local source. Its value is recovered from the rendered
//! node's `data-*` attributes, so `value(create(src)).src == src`.

use std::collections::BTreeMap;

use crate::embed::PREVIEW_FORMAT_NAME;
use crate::embed::PreviewEmbedValue;

pub const PREVIEW_CLASS_NAME: &str = "image-uploading";
pub const PREVIEW_TAG_NAME: &str = "span";

/// What a preview embed is created from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewSource {
    /// Empty shell with no image, used transiently.
    Placeholder,
    /// A preview image loaded from `src`.
    Src(String),
}

impl From<bool> for PreviewSource {
    fn from(_: bool) -> Self {
        PreviewSource::Placeholder
    }
}

impl From<&str> for PreviewSource {
    fn from(src: &str) -> Self {
        PreviewSource::Src(src.to_string())
    }
}

impl From<String> for PreviewSource {
    fn from(src: String) -> Self {
        PreviewSource::Src(src)
    }
}

/// Rendered form of a preview embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewNode {
    pub tag_name: &'static str,
    pub class_name: &'static str,
    /// `src` of the child `<img>`, absent for a placeholder shell.
    pub image_src: Option<String>,
    /// `data-*` attributes keyed without the `data-` prefix.
    pub dataset: BTreeMap<String, String>,
}

impl PreviewNode {
    pub fn to_html(&self) -> String {
        let mut attrs = format!(" class=\"{}\"", self.class_name);
        for (key, value) in &self.dataset {
            attrs.push_str(&format!(" data-{key}=\"{}\"", escape_html(value)));
        }
        let child = self
            .image_src
            .as_deref()
            .map(|src| format!("<img src=\"{}\">", escape_html(src)))
            .unwrap_or_default();
        format!("<{tag}{attrs}>{child}</{tag}>", tag = self.tag_name)
    }
}

pub struct PreviewEmbed;

impl PreviewEmbed {
    pub const FORMAT_NAME: &'static str = PREVIEW_FORMAT_NAME;

    pub fn create(source: impl Into<PreviewSource>) -> PreviewNode {
        let mut node = PreviewNode {
            tag_name: PREVIEW_TAG_NAME,
            class_name: PREVIEW_CLASS_NAME,
            image_src: None,
            dataset: BTreeMap::new(),
        };
        if let PreviewSource::Src(src) = source.into() {
            node.dataset.insert("src".to_string(), src.clone());
            node.image_src = Some(src);
        }
        node
    }

    /// Renders a stored value, carrying `custom` through as `data-custom`.
    pub fn render(value: &PreviewEmbedValue) -> PreviewNode {
        let mut node = Self::create(value.src.as_str());
        if let Some(custom) = &value.custom {
            node.dataset.insert("custom".to_string(), custom.clone());
        }
        node
    }

    pub fn value(node: &PreviewNode) -> PreviewEmbedValue {
        PreviewEmbedValue {
            src: node.dataset.get("src").cloned().unwrap_or_default(),
            custom: node.dataset.get("custom").cloned(),
        }
    }
}

pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

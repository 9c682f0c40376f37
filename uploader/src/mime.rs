use std::path::Path;
use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;

/// MIME types accepted from clipboard pastes.
const PASTEABLE_IMAGE_MIME_PATTERN: &str = r"(?i)^image/(jpe?g|gif|png|svg|webp)$";

fn build_pasteable_image_mime_regex() -> Regex {
    #![allow(clippy::expect_used)]
    Regex::new(PASTEABLE_IMAGE_MIME_PATTERN).expect("pasteable image MIME pattern is valid")
}

fn pasteable_image_mime_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(build_pasteable_image_mime_regex)
}

/// Whether a clipboard entry of type `mime` should be intercepted as an image.
pub fn is_pasteable_image_mime(mime: &str) -> bool {
    pasteable_image_mime_regex().is_match(mime)
}

/// Infer a MIME type from the extension of `path`.
pub fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Normalize a dropped item that may represent a filesystem path.
///
/// Supports:
/// - `file://` URLs (converted to local paths)
/// - Windows/UNC paths
/// - shell-escaped single paths (via `shlex`)
pub fn normalize_dropped_path(dropped: &str) -> Option<PathBuf> {
    let dropped = dropped.trim();

    if let Ok(url) = url::Url::parse(dropped)
        && url.scheme() == "file"
    {
        return url.to_file_path().ok();
    }

    // POSIX shlex treats backslashes as escapes, so Windows paths bypass it.
    let looks_like_windows_path = {
        let drive = dropped
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
            && dropped.get(1..2) == Some(":")
            && dropped
                .get(2..3)
                .is_some_and(|s| s == "\\" || s == "/");
        let unc = dropped.starts_with("\\\\");
        drive || unc
    };
    if looks_like_windows_path {
        return Some(PathBuf::from(dropped));
    }

    let parts: Vec<String> = shlex::Shlex::new(dropped).collect();
    if parts.len() == 1 {
        return parts.into_iter().next().map(PathBuf::from);
    }

    None
}

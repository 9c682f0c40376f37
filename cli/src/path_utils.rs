//! `~` handling for store paths given on the command line or in config.toml.

use std::path::Path;
use std::path::PathBuf;

const HOME_MARKER: &str = "~";

/// Resolves a leading `~` component against the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    expand_home_marker(path, dirs::home_dir().as_deref())
}

/// Shortens paths under the user's home directory for log output.
pub fn display_with_tilde(path: &Path) -> String {
    abbreviate_home(path, dirs::home_dir().as_deref())
}

/// Only a whole leading `~` component is replaced; `~user` forms and paths
/// without a known home are returned unchanged.
fn expand_home_marker(path: &Path, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix(HOME_MARKER), home) {
        (Ok(under_home), Some(home)) if under_home.as_os_str().is_empty() => home.to_path_buf(),
        (Ok(under_home), Some(home)) => home.join(under_home),
        _ => path.to_path_buf(),
    }
}

fn abbreviate_home(path: &Path, home: Option<&Path>) -> String {
    let under_home = home.and_then(|home| path.strip_prefix(home).ok());
    match under_home {
        Some(rest) if rest.as_os_str().is_empty() => HOME_MARKER.to_string(),
        Some(rest) => Path::new(HOME_MARKER).join(rest).display().to_string(),
        None => path.display().to_string(),
    }
}

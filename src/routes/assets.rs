use std::path::Path;

use tower_http::services::{ServeDir, ServeFile};

pub const ENTRY_DOCUMENT: &str = "index.html";

/// Serve files from `root`, answering any unmatched path with the entry
/// document so the client-side router can take over. Directories count as
/// unmatched rather than redirecting to a trailing slash. `ServeDir` refuses
/// paths that would leave `root`; those also get the entry document.
pub fn static_bundle(root: &Path) -> ServeDir<ServeFile> {
    ServeDir::new(root)
        .append_index_html_on_directories(false)
        .fallback(ServeFile::new(root.join(ENTRY_DOCUMENT)))
}

/// Warn once at startup if the bundle has no entry document.
pub fn check_bundle(root: &Path) {
    let entry = root.join(ENTRY_DOCUMENT);
    if !entry.is_file() {
        tracing::warn!(path = %entry.display(), "entry document missing, unmatched paths will 404");
    }
}

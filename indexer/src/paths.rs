/// Directory prefixes that never appear in a page's route.
pub const ROOT_PREFIXES: [&str; 3] = ["pages/", "src/pages/", "app/"];

/// Derives the canonical route for a content file from its path relative to
/// the project root. `src/pages/docs/intro/index.mdx` becomes `/docs/intro`.
///
/// Canonical paths are fixed points: feeding one back in returns it unchanged.
pub fn canonical_path<S: AsRef<str>>(relative: &str, extensions: &[S]) -> String {
    let normalized = relative.replace('\\', "/");
    let mut path = normalized.trim_start_matches('/');

    for prefix in ROOT_PREFIXES {
        if let Some(rest) = path.strip_prefix(prefix) {
            path = rest;
        }
    }

    for extension in extensions {
        let suffix = format!(".{}", extension.as_ref());
        if let Some(rest) = path.strip_suffix(suffix.as_str()) {
            path = rest;
            break;
        }
    }

    if path == "index" {
        path = "";
    } else if let Some(rest) = path.strip_suffix("/index") {
        path = rest;
    }

    format!("/{}", path.trim_end_matches('/'))
}

/// Maps a stored route onto the directory-style route the search index links
/// to: the final segment is dropped and a trailing `/` added, so
/// `/docs/test/page` is submitted as `/docs/test/`.
pub fn upsert_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => format!("{}/", &trimmed[..idx]),
    }
}

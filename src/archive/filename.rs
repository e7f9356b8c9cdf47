//! Archive entry name derivation.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Names already carrying a recognized media extension are kept as-is.
static KNOWN_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(jpe?g|png|gif|webp|bmp|tiff?)$")
        .unwrap_or_else(|_| unreachable!("static pattern compiles"))
});

/// Guesses a file extension from a `Content-Type` header value.
pub(crate) fn extension_from_content_type(content_type: &str) -> &'static str {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();

    match mime.as_str() {
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/bmp" => ".bmp",
        "image/tiff" => ".tiff",
        "image/svg+xml" => ".svg",
        // The remote store serves jpeg for most camera output; it is also
        // the safest default when the server reports nothing useful.
        _ => ".jpg",
    }
}

/// Ensures an archive entry name carries an extension, inferring one from
/// the content type when the asset name lacks it.
pub(crate) fn entry_name(name: &str, content_type: Option<&str>) -> String {
    if KNOWN_EXTENSION.is_match(name) {
        name.to_string()
    } else {
        format!(
            "{name}{}",
            extension_from_content_type(content_type.unwrap_or(""))
        )
    }
}

/// Resolves name collisions inside the archive by suffixing `_2`, `_3`, ...
/// before the extension.
pub(crate) fn unique_entry_name(name: String, used: &mut HashSet<String>) -> String {
    if used.insert(name.clone()) {
        return name;
    }
    let (stem, ext) = match name.rfind('.') {
        Some(index) => (&name[..index], &name[index..]),
        None => (name.as_str(), ""),
    };
    let mut suffix = 2usize;
    loop {
        let candidate = format!("{stem}_{suffix}{ext}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        suffix += 1;
    }
}

//! Naming rules for uploaded files.
//!
//! Stored names keep the uploader's base name readable while appending a short
//! random suffix, so two uploads of `photo.jpg` land as `photo_1a2b3c4d.jpg`
//! and `photo_9f8e7d6c.jpg`. The suffix makes collisions improbable, not
//! impossible.

use std::path::Path;

use slug::slugify;
use uuid::Uuid;

/// Number of characters in the random part of a stored filename.
pub const SUFFIX_LEN: usize = 8;

const FALLBACK_BASE: &str = "upload";

/// Generate a fresh lowercase hex suffix of [`SUFFIX_LEN`] characters.
pub fn random_suffix() -> String {
    let mut suffix = Uuid::new_v4().simple().to_string();
    suffix.truncate(SUFFIX_LEN);
    suffix
}

/// Build `{base}_{suffix}{ext}` from the client-supplied filename.
///
/// Only the final path component of `original` is considered. The base is
/// slugified so it is safe inside a URL and a filesystem path; the extension
/// is lower-cased and keeps its leading dot.
pub fn stored_filename(original: &str, suffix: &str) -> String {
    // Browsers on Windows may send the full client path.
    let last = original.rsplit(['/', '\\']).next().unwrap_or(original);
    let path = Path::new(last);

    let base = path
        .file_stem()
        .and_then(|value| value.to_str())
        .map(slugify)
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| FALLBACK_BASE.to_string());

    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .filter(|value| !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric()));

    match extension {
        Some(ext) => format!("{base}_{suffix}.{ext}"),
        None => format!("{base}_{suffix}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_base_and_extension() {
        assert_eq!(stored_filename("photo.JPG", "abcd1234"), "photo_abcd1234.jpg");
    }

    #[test]
    fn slugifies_base_name() {
        assert_eq!(
            stored_filename("Summer Trip (1).png", "abcd1234"),
            "summer-trip-1_abcd1234.png"
        );
    }

    #[test]
    fn strips_client_directories() {
        assert_eq!(
            stored_filename("C:\\Users\\me\\cat.gif", "00000000"),
            "cat_00000000.gif"
        );
        assert_eq!(stored_filename("../../etc/passwd", "00000000"), "passwd_00000000");
    }

    #[test]
    fn falls_back_when_base_is_unusable() {
        assert_eq!(stored_filename("", "abcd1234"), "upload_abcd1234");
        assert_eq!(stored_filename("???.webp", "abcd1234"), "upload_abcd1234.webp");
    }

    #[test]
    fn suffix_is_short_hex() {
        let suffix = random_suffix();
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(random_suffix(), random_suffix());
    }
}

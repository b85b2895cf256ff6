//! Filesystem-safe unit names.

use std::path::Path;
use tasksmith_core::error::LibraryError;

/// Normalize a user-facing identifier (or a `stem.ext` file name) into a
/// stem that is safe to use as a file name.
///
/// Directory components and the final extension are dropped, characters
/// outside `[A-Za-z0-9_-]` become `_`, and leading/trailing underscores
/// are trimmed.
pub fn normalize_stem(name: &str) -> Result<String, LibraryError> {
    let base = Path::new(name.trim())
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    let mapped: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let stem = mapped.trim_matches('_');
    if stem.is_empty() {
        return Err(LibraryError::InvalidName(name.to_string()));
    }
    Ok(stem.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_pass_through() {
        assert_eq!(normalize_stem("list_pdf_files").unwrap(), "list_pdf_files");
        assert_eq!(normalize_stem("open-browser").unwrap(), "open-browser");
    }

    #[test]
    fn extension_and_directories_are_dropped() {
        assert_eq!(normalize_stem("list_files.py").unwrap(), "list_files");
        assert_eq!(normalize_stem("../../etc/passwd").unwrap(), "passwd");
    }

    #[test]
    fn unsafe_characters_are_replaced() {
        assert_eq!(normalize_stem("open the browser!").unwrap(), "open_the_browser");
        assert_eq!(normalize_stem("  _spaced_ ").unwrap(), "spaced");
    }

    #[test]
    fn empty_result_is_invalid() {
        assert!(matches!(
            normalize_stem("???"),
            Err(LibraryError::InvalidName(_))
        ));
        assert!(normalize_stem("").is_err());
    }
}

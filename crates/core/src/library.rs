//! Function library domain types.
//!
//! A library entry is a generated unit persisted as two co-located
//! artifacts sharing a filesystem-safe stem: the raw source text and a
//! small metadata record naming the unit and documenting its parameters.

use serde::{Deserialize, Serialize};

/// The metadata artifact stored next to a unit's source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMetadata {
    /// The user-facing identifier the LLM chose
    pub function_name: String,

    /// One human-readable description per positional parameter
    #[serde(default)]
    pub args_doc: Vec<String>,
}

/// A fully persisted library entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryEntry {
    /// Filesystem-safe stem, unique within the library
    pub stem: String,

    /// The user-facing identifier
    pub function_name: String,

    /// Raw source text
    pub source: String,

    /// Ordered parameter documentation
    pub args_doc: Vec<String>,
}

impl LibraryEntry {
    /// The metadata half of this entry.
    pub fn metadata(&self) -> UnitMetadata {
        UnitMetadata {
            function_name: self.function_name.clone(),
            args_doc: self.args_doc.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_json_shape() {
        let meta = UnitMetadata {
            function_name: "list_pdf_files".into(),
            args_doc: vec!["1st: folder path, e.g. D:\\files".into()],
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["function_name"], "list_pdf_files");
        assert_eq!(json["args_doc"][0], "1st: folder path, e.g. D:\\files");
    }

    #[test]
    fn metadata_args_doc_defaults_empty() {
        let meta: UnitMetadata = serde_json::from_str(r#"{"function_name":"f"}"#).unwrap();
        assert!(meta.args_doc.is_empty());
    }
}

//! Library matching: reuse an existing unit when one fully covers the task.
//!
//! Matching is conservative. An empty library, a failed call, a malformed
//! verdict, or a verdict naming a unit that is not in the library all mean
//! "no match".

use std::sync::Arc;
use tasksmith_library::{normalize_stem, LibraryStore};
use tracing::{debug, info, warn};

use crate::llm::LlmClient;
use crate::prompts;
use crate::schema::{parse_structured, MatchVerdict};
use crate::synthesizer::SelectedUnit;

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Matched(SelectedUnit),
    NoMatch,
}

#[derive(Clone)]
pub struct Matcher {
    llm: Arc<LlmClient>,
    library: Arc<LibraryStore>,
}

impl Matcher {
    pub fn new(llm: Arc<LlmClient>, library: Arc<LibraryStore>) -> Self {
        Self { llm, library }
    }

    pub async fn find(&self, task_summary: &str) -> MatchOutcome {
        let index = self.library.index().await;
        if index.is_empty() {
            debug!("Library is empty, skipping match");
            return MatchOutcome::NoMatch;
        }

        let function_list = serde_json::to_string_pretty(&index).unwrap_or_default();
        let raw = match self
            .llm
            .complete(&[], &prompts::library_matching(task_summary, &function_list))
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Match call failed, treating as no match");
                return MatchOutcome::NoMatch;
            }
        };

        let verdict: MatchVerdict = match parse_structured(&raw, "match") {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, "Malformed match verdict, treating as no match");
                return MatchOutcome::NoMatch;
            }
        };

        if !verdict.matched {
            return MatchOutcome::NoMatch;
        }

        let Some(name) = verdict.matched_function.as_deref() else {
            debug!("Match verdict names no function");
            return MatchOutcome::NoMatch;
        };

        let Ok(stem) = normalize_stem(name) else {
            return MatchOutcome::NoMatch;
        };

        let key = format!("{stem}.{}", self.library.extension());
        if !index.contains_key(&key) {
            warn!(function = %name, "Match names a unit outside the library");
            return MatchOutcome::NoMatch;
        }

        match self.library.get(&stem).await {
            Some(entry) => {
                info!(unit = %entry.stem, "Reusing library unit");
                MatchOutcome::Matched(SelectedUnit {
                    stem: entry.stem,
                    function_name: entry.function_name,
                    args: verdict.args_value_list,
                })
            }
            None => MatchOutcome::NoMatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{llm_with, ScriptedProvider};

    async fn library_with_pdf_lister(dir: &std::path::Path) -> Arc<LibraryStore> {
        let library = Arc::new(LibraryStore::new(dir.join("library"), "py"));
        library
            .save(
                "list_pdf_files",
                "def main(folder):\n    return folder\n",
                &["1st: folder to search for PDF files, e.g. D:\\files".into()],
            )
            .await
            .unwrap();
        library
    }

    #[tokio::test]
    async fn empty_library_makes_no_call() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let matcher = Matcher::new(
            Arc::new(llm_with(provider.clone())),
            Arc::new(LibraryStore::new(tmp.path().join("library"), "py")),
        );
        assert_eq!(matcher.find("anything").await, MatchOutcome::NoMatch);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn matched_entry_carries_arguments() {
        let tmp = tempfile::tempdir().unwrap();
        let library = library_with_pdf_lister(tmp.path()).await;
        let provider = Arc::new(ScriptedProvider::new(vec![
            r#"{"matched": true, "matched_function": "list_pdf_files.py", "args_value_list": ["D:\\docs"]}"#,
        ]));
        let matcher = Matcher::new(Arc::new(llm_with(provider.clone())), library);

        match matcher.find("list the PDF files in D:\\docs").await {
            MatchOutcome::Matched(unit) => {
                assert_eq!(unit.stem, "list_pdf_files");
                assert_eq!(unit.args, vec![serde_json::json!("D:\\docs")]);
            }
            other => panic!("unexpected: {other:?}"),
        }

        // The index is sent in its file-name shape
        let prompt = provider.request(0).messages.last().unwrap().content.clone();
        assert!(prompt.contains("\"list_pdf_files.py\""));
    }

    #[tokio::test]
    async fn distinct_task_is_not_matched() {
        let tmp = tempfile::tempdir().unwrap();
        let library = library_with_pdf_lister(tmp.path()).await;
        let matcher = Matcher::new(
            Arc::new(llm_with(Arc::new(ScriptedProvider::new(vec![
                r#"{"matched": false, "matched_function": null, "args_value_list": []}"#,
            ])))),
            library,
        );
        assert_eq!(matcher.find("take a screenshot").await, MatchOutcome::NoMatch);
    }

    #[tokio::test]
    async fn unknown_function_is_downgraded() {
        let tmp = tempfile::tempdir().unwrap();
        let library = library_with_pdf_lister(tmp.path()).await;
        let matcher = Matcher::new(
            Arc::new(llm_with(Arc::new(ScriptedProvider::new(vec![
                r#"{"matched": true, "matched_function": "take_screenshot", "args_value_list": []}"#,
            ])))),
            library,
        );
        assert_eq!(matcher.find("take a screenshot").await, MatchOutcome::NoMatch);
    }

    #[tokio::test]
    async fn malformed_verdict_and_provider_error_are_no_match() {
        let tmp = tempfile::tempdir().unwrap();
        let library = library_with_pdf_lister(tmp.path()).await;

        let garbled = Matcher::new(
            Arc::new(llm_with(Arc::new(ScriptedProvider::new(vec!["yes, list_pdf_files"])))),
            library.clone(),
        );
        assert_eq!(garbled.find("list pdfs").await, MatchOutcome::NoMatch);

        let offline = Matcher::new(Arc::new(llm_with(Arc::new(ScriptedProvider::failing()))), library);
        assert_eq!(offline.find("list pdfs").await, MatchOutcome::NoMatch);
    }
}

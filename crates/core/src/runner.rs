//! CodeRunner trait: the abstraction over execution backends.
//!
//! A runner knows one host scripting language: how to check that source
//! text parses, whether it defines the entry point, and how to load a
//! persisted unit into a fresh, isolated context and invoke it.
//! The engine never depends on a concrete strategy (embedded interpreter,
//! subprocess, WASM sandbox), only on this trait.

use async_trait::async_trait;
use std::path::Path;
use crate::error::RunnerError;

/// The core CodeRunner trait.
#[async_trait]
pub trait CodeRunner: Send + Sync {
    /// A human-readable name for this runner (e.g., "python").
    fn name(&self) -> &str;

    /// File extension for persisted source, without the dot (e.g., "py").
    fn extension(&self) -> &str;

    /// Hard syntax check, independent of execution.
    async fn check_syntax(&self, source: &str) -> std::result::Result<(), RunnerError>;

    /// Whether `source` defines a callable named `entry`.
    fn has_entry_point(&self, source: &str, entry: &str) -> bool;

    /// Load the unit at `path` into a fresh context and call `entry` with
    /// `args` positionally. Returns the entry point's result as text.
    async fn invoke(
        &self,
        path: &Path,
        entry: &str,
        args: &[serde_json::Value],
    ) -> std::result::Result<String, RunnerError>;
}

//! Python runner: checks and runs units in a fresh interpreter process.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tasksmith_core::error::RunnerError;
use tasksmith_core::runner::CodeRunner;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::harness;

/// Runs generated Python units through an external interpreter.
pub struct PythonRunner {
    interpreter: String,
    timeout: Duration,
}

impl PythonRunner {
    pub fn new(interpreter: impl Into<String>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout,
        }
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether the configured interpreter can be started at all.
    pub async fn is_available(&self) -> bool {
        Command::new(&self.interpreter)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Run the interpreter with `args`, feed `stdin`, and collect output
    /// under the wall-clock limit. The child is killed if the limit hits.
    async fn run(&self, args: &[&str], stdin: &str) -> Result<std::process::Output, RunnerError> {
        let mut child = Command::new(&self.interpreter)
            .args(args)
            .env("PYTHONIOENCODING", "utf-8")
            .env("PYTHONDONTWRITEBYTECODE", "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RunnerError::Spawn {
                interpreter: self.interpreter.clone(),
                reason: e.to_string(),
            })?;

        let timeout_secs = self.timeout.as_secs().max(1);
        let input = stdin.to_string();
        let pipe = child.stdin.take();

        let work = async move {
            if let Some(mut pipe) = pipe {
                // A child that exits without reading stdin closes the pipe
                if let Err(e) = pipe.write_all(input.as_bytes()).await {
                    debug!(error = %e, "Interpreter closed stdin early");
                }
            }
            child.wait_with_output().await
        };

        match tokio::time::timeout(self.timeout, work).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(RunnerError::Invocation(format!("failed to collect output: {e}"))),
            Err(_) => {
                warn!(interpreter = %self.interpreter, timeout_secs, "Unit timed out, killing interpreter");
                Err(RunnerError::Timeout { timeout_secs })
            }
        }
    }
}

impl Default for PythonRunner {
    fn default() -> Self {
        Self::new("python3", Duration::from_secs(20))
    }
}

#[async_trait]
impl CodeRunner for PythonRunner {
    fn name(&self) -> &str {
        "python"
    }

    fn extension(&self) -> &str {
        "py"
    }

    async fn check_syntax(&self, source: &str) -> Result<(), RunnerError> {
        if source.trim().is_empty() {
            return Err(RunnerError::EmptySource);
        }

        let output = self.run(&["-c", harness::SYNTAX_CHECK], source).await?;
        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = harness::last_lines(&stderr, 1);
        Err(RunnerError::Syntax(if detail.is_empty() {
            "source does not compile".into()
        } else {
            detail
        }))
    }

    fn has_entry_point(&self, source: &str, entry: &str) -> bool {
        defines_top_level_function(source, entry)
    }

    async fn invoke(
        &self,
        path: &Path,
        entry: &str,
        args: &[serde_json::Value],
    ) -> Result<String, RunnerError> {
        let path_arg = path
            .to_str()
            .ok_or_else(|| RunnerError::Load(format!("non UTF-8 path: {}", path.display())))?;
        let args_json = serde_json::to_string(args)
            .map_err(|e| RunnerError::Invocation(format!("arguments are not serializable: {e}")))?;

        debug!(unit = %path.display(), entry, args = args.len(), "Invoking unit");

        let program = harness::invoke_program();
        let output = self
            .run(&["-c", &program, path_arg, entry], &args_json)
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        harness::parse_outcome(&stdout, &stderr, output.status.code())
    }
}

/// Whether `source` has an unindented `def name(` or `async def name(`,
/// with any whitespace between the keywords, the name and the parenthesis.
pub fn defines_top_level_function(source: &str, name: &str) -> bool {
    source.lines().any(|line| {
        let rest = line.strip_prefix("async").map_or(line, |after| {
            if after.starts_with(char::is_whitespace) {
                after.trim_start()
            } else {
                line
            }
        });
        let Some(rest) = rest.strip_prefix("def") else {
            return false;
        };
        if !rest.starts_with(char::is_whitespace) {
            return false;
        }
        rest.trim_start()
            .strip_prefix(name)
            .is_some_and(|after| after.trim_start().starts_with('('))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn python_available() -> bool {
        std::process::Command::new("python3")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn runner() -> PythonRunner {
        PythonRunner::new("python3", Duration::from_secs(10))
    }

    fn write_unit(dir: &Path, name: &str, source: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, source).unwrap();
        path
    }

    #[test]
    fn entry_point_must_be_top_level() {
        let r = runner();
        assert!(r.has_entry_point("import os\n\ndef main(a, b):\n    return a\n", "main"));
        assert!(r.has_entry_point("async def main():\n    return 1\n", "main"));
        assert!(!r.has_entry_point("class A:\n    def main(self):\n        pass\n", "main"));
        assert!(!r.has_entry_point("# def main():\ndef helper():\n    pass\n", "main"));
        assert!(!r.has_entry_point("def main_loop():\n    pass\n", "main"));
    }

    #[test]
    fn entry_point_allows_whitespace_before_parenthesis() {
        let r = runner();
        assert!(r.has_entry_point("def main (folder):\n    return folder\n", "main"));
        assert!(r.has_entry_point("def  main\t():\n    pass\n", "main"));
        assert!(r.has_entry_point("async  def main ():\n    pass\n", "main"));
        assert!(!r.has_entry_point("define main():\n    pass\n", "main"));
        assert!(!r.has_entry_point("asyncdef main():\n    pass\n", "main"));
        assert!(!r.has_entry_point("def main = 1\n", "main"));
    }

    #[tokio::test]
    async fn empty_source_is_rejected_without_interpreter() {
        let r = PythonRunner::new("definitely-not-an-interpreter", Duration::from_secs(1));
        assert!(matches!(r.check_syntax("  \n").await, Err(RunnerError::EmptySource)));
    }

    #[tokio::test]
    async fn missing_interpreter_is_spawn_error() {
        let r = PythonRunner::new("definitely-not-an-interpreter", Duration::from_secs(1));
        assert!(!r.is_available().await);
        assert!(matches!(
            r.check_syntax("x = 1").await,
            Err(RunnerError::Spawn { .. })
        ));
    }

    #[tokio::test]
    async fn syntax_check_accepts_and_rejects() {
        if !python_available() {
            return;
        }
        let r = runner();
        assert!(r.check_syntax("def main():\n    return 'ok'\n").await.is_ok());
        match r.check_syntax("def main(:\n    return\n").await {
            Err(RunnerError::Syntax(msg)) => assert!(msg.contains("SyntaxError")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn invoke_passes_positional_args() {
        if !python_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let path = write_unit(
            dir.path(),
            "join.py",
            "def main(a, b):\n    print('noise')\n    return f'{a}-{b}'\n",
        );
        let out = runner()
            .invoke(&path, "main", &[json!("x"), json!(2)])
            .await
            .unwrap();
        assert_eq!(out, "x-2");
    }

    #[tokio::test]
    async fn invoke_reports_exceptions() {
        if !python_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let path = write_unit(dir.path(), "boom.py", "def main():\n    return 1 / 0\n");
        match runner().invoke(&path, "main", &[]).await {
            Err(RunnerError::Invocation(msg)) => assert!(msg.contains("ZeroDivisionError")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn invoke_reports_load_failures_and_missing_entry() {
        if !python_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let bad_import = write_unit(dir.path(), "imp.py", "import no_such_module_xyz\ndef main():\n    return 1\n");
        assert!(matches!(
            runner().invoke(&bad_import, "main", &[]).await,
            Err(RunnerError::Load(_))
        ));

        let no_main = write_unit(dir.path(), "nomain.py", "def helper():\n    return 1\n");
        assert!(matches!(
            runner().invoke(&no_main, "main", &[]).await,
            Err(RunnerError::MissingEntryPoint(_))
        ));
    }

    #[tokio::test]
    async fn units_do_not_share_state() {
        if !python_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let path = write_unit(
            dir.path(),
            "counter.py",
            "COUNT = 0\ndef main():\n    global COUNT\n    COUNT += 1\n    return COUNT\n",
        );
        let r = runner();
        assert_eq!(r.invoke(&path, "main", &[]).await.unwrap(), "1");
        assert_eq!(r.invoke(&path, "main", &[]).await.unwrap(), "1");
    }

    #[tokio::test]
    async fn hung_unit_times_out() {
        if !python_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let path = write_unit(dir.path(), "hang.py", "import time\ndef main():\n    time.sleep(30)\n");
        let r = PythonRunner::new("python3", Duration::from_secs(1));
        assert!(matches!(
            r.invoke(&path, "main", &[]).await,
            Err(RunnerError::Timeout { timeout_secs: 1 })
        ));
    }
}

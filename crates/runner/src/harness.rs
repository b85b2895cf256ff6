//! The Python programs the runner drives, and the parser for their output.

use serde::Deserialize;
use tasksmith_core::error::RunnerError;

/// Prefix of the single result line the invoke harness prints.
pub const RESULT_MARKER: &str = "__TASKSMITH_RESULT__";

/// Reads source from stdin and compiles it without running anything.
pub const SYNTAX_CHECK: &str = r#"
import sys
source = sys.stdin.buffer.read().decode("utf-8")
try:
    compile(source, "<unit>", "exec")
except SyntaxError as e:
    sys.stderr.write(f"{type(e).__name__}: {e.msg} (line {e.lineno})\n")
    sys.exit(1)
"#;

/// Loads the unit at argv[1] into a fresh module, calls argv[2] with the
/// JSON argument list read from stdin, and prints one marked JSON line.
pub const INVOKE: &str = r#"
import asyncio, importlib.util, inspect, json, sys

def emit(payload):
    sys.stdout.write("\n" + MARKER + json.dumps(payload) + "\n")
    sys.stdout.flush()

def describe(e):
    return f"{type(e).__name__}: {e}"

path, entry = sys.argv[1], sys.argv[2]
try:
    args = json.loads(sys.stdin.read() or "[]")
    if not isinstance(args, list):
        args = [args]
except Exception as e:
    emit({"ok": False, "stage": "args", "error": describe(e)})
    sys.exit(0)

try:
    spec = importlib.util.spec_from_file_location("tasksmith_unit", path)
    if spec is None or spec.loader is None:
        raise ImportError(f"cannot load {path}")
    module = importlib.util.module_from_spec(spec)
    spec.loader.exec_module(module)
except BaseException as e:
    emit({"ok": False, "stage": "load", "error": describe(e)})
    sys.exit(0)

func = getattr(module, entry, None)
if not callable(func):
    emit({"ok": False, "stage": "entry", "error": entry})
    sys.exit(0)

try:
    result = func(*args)
    if inspect.isawaitable(result):
        result = asyncio.run(result)
    emit({"ok": True, "output": str(result)})
except BaseException as e:
    emit({"ok": False, "stage": "call", "error": describe(e)})
"#;

/// Full invoke program with the marker substituted in.
pub fn invoke_program() -> String {
    format!("MARKER = {RESULT_MARKER:?}\n{INVOKE}")
}

#[derive(Debug, Deserialize)]
struct HarnessResult {
    ok: bool,
    #[serde(default)]
    output: Option<String>,
    #[serde(default)]
    stage: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Turn the harness' stdout into the unit's return text or a runner error.
///
/// The last marked line wins; anything the unit printed itself is ignored.
/// `stderr` and `exit_code` are only used when no marked line exists.
pub fn parse_outcome(stdout: &str, stderr: &str, exit_code: Option<i32>) -> Result<String, RunnerError> {
    let marked = stdout
        .lines()
        .rev()
        .find_map(|line| line.strip_prefix(RESULT_MARKER));

    let Some(raw) = marked else {
        let detail = last_lines(stderr, 5);
        let code = exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string());
        return Err(RunnerError::Invocation(if detail.is_empty() {
            format!("unit exited without a result (exit code: {code})")
        } else {
            format!("unit exited without a result (exit code: {code}): {detail}")
        }));
    };

    let result: HarnessResult = serde_json::from_str(raw)
        .map_err(|e| RunnerError::Invocation(format!("unreadable harness output: {e}")))?;

    if result.ok {
        return Ok(result.output.unwrap_or_default());
    }

    let error = result.error.unwrap_or_else(|| "unknown error".into());
    Err(match result.stage.as_deref() {
        Some("load") => RunnerError::Load(error),
        Some("entry") => RunnerError::MissingEntryPoint(error),
        _ => RunnerError::Invocation(error),
    })
}

/// The last `n` non-empty lines of `text`, joined with newlines.
pub(crate) fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}

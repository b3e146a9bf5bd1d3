use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::error::PipelineError;

#[derive(Debug, Error)]
#[error("{tool}: {detail}")]
pub struct ToolError {
    pub tool: String,
    pub detail: String,
}

impl ToolError {
    fn new(tool: &str, detail: impl Into<String>) -> Self {
        Self {
            tool: tool.to_string(),
            detail: detail.into(),
        }
    }
}

impl From<ToolError> for PipelineError {
    fn from(e: ToolError) -> Self {
        PipelineError::Tool {
            tool: e.tool,
            detail: e.detail,
        }
    }
}

/// Run an external tool to completion, capturing stdout/stderr.
///
/// Non-zero exit, failure to spawn, and timeout all surface as `ToolError`;
/// a timed-out child is killed rather than left running.
pub async fn run_tool(
    tool: &str,
    args: &[&str],
    cwd: Option<&Path>,
    limit: Duration,
) -> Result<Output, ToolError> {
    let mut cmd = Command::new(tool);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    debug!("running {} {}", tool, args.join(" "));

    let output = match timeout(limit, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(ToolError::new(tool, format!("failed to start: {}", e))),
        Err(_) => {
            return Err(ToolError::new(
                tool,
                format!("timed out after {}s", limit.as_secs()),
            ));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ToolError::new(
            tool,
            format!("exited with {}: {}", output.status, tail(&stderr, 400)),
        ));
    }
    Ok(output)
}

fn tail(s: &str, max_chars: usize) -> String {
    let trimmed = s.trim();
    let count = trimmed.chars().count();
    if count <= max_chars {
        trimmed.to_string()
    } else {
        trimmed.chars().skip(count - max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_on_success() {
        let out = run_tool("sh", &["-c", "echo hello"], None, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "hello");
    }

    #[tokio::test]
    async fn nonzero_exit_is_an_error() {
        let err = run_tool("sh", &["-c", "echo boom >&2; exit 3"], None, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err.tool, "sh");
        assert!(err.detail.contains("3"), "detail: {}", err.detail);
        assert!(err.detail.contains("boom"), "detail: {}", err.detail);
    }

    #[test]
    fn tail_keeps_the_end() {
        assert_eq!(tail("abcdef", 3), "def");
        assert_eq!(tail("  short  ", 10), "short");
    }
}

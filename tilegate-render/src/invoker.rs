//! Renderer process invocation.
//!
//! The renderer is an opaque executable that speaks CGI on its output: it
//! is started as `<renderer> QUERY_STRING=<raw query>` and prints either a
//! `Content-Type` header followed by image bytes, or an HTML error page.
//! This module only runs the process and captures its output; it never
//! looks at what the output contains.

use std::path::PathBuf;
use std::process::Stdio;
use std::str::FromStr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tilegate_core::{ConfigError, RenderError, RequestQuery};
use tokio::process::Command;

/// Executes the renderer for one query.
#[async_trait]
pub trait RenderInvoker: Send + Sync {
    /// Run the renderer and return its captured output.
    ///
    /// Fails with [`RenderError::ExecutionFailed`] if the process cannot be
    /// started or exits non-zero, and [`RenderError::Timeout`] if it does not
    /// finish in time. No partial output is returned on failure.
    async fn invoke(&self, query: &RequestQuery) -> Result<Vec<u8>, RenderError>;

    /// Verify the renderer is runnable (used by readiness checks).
    async fn check(&self) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Which output channels make up the captured stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputCapture {
    /// stdout followed by stderr, so diagnostics the renderer prints on
    /// stderr are visible to the parser.
    #[default]
    Combined,
    /// stdout only; stderr is logged and dropped.
    Stdout,
}

impl FromStr for OutputCapture {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "combined" => Ok(OutputCapture::Combined),
            "stdout" => Ok(OutputCapture::Stdout),
            other => Err(ConfigError::InvalidValue {
                field: "render_output".to_string(),
                value: other.to_string(),
                reason: "expected combined or stdout".to_string(),
            }),
        }
    }
}

/// Runs the renderer as a child process.
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    program: PathBuf,
    timeout: Option<Duration>,
    capture: OutputCapture,
}

impl ProcessInvoker {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
            capture: OutputCapture::default(),
        }
    }

    /// Bound the wait on the renderer; the child is killed when it expires.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_capture(mut self, capture: OutputCapture) -> Self {
        self.capture = capture;
        self
    }

    fn command(&self, query: &RequestQuery) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg(query.cgi_argument())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

fn execution_failed(detail: impl Into<String>) -> RenderError {
    RenderError::ExecutionFailed {
        detail: detail.into(),
    }
}

#[async_trait]
impl RenderInvoker for ProcessInvoker {
    async fn invoke(&self, query: &RequestQuery) -> Result<Vec<u8>, RenderError> {
        let started = Instant::now();
        let child = self
            .command(query)
            .spawn()
            .map_err(|e| execution_failed(format!("{}: {}", self.program.display(), e)))?;

        // Dropping the pending future drops the child, and kill_on_drop reaps it.
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| {
                    tracing::warn!(
                        program = %self.program.display(),
                        timeout_ms = limit.as_millis() as u64,
                        "Renderer timed out, killing process"
                    );
                    RenderError::Timeout { after: limit }
                })?,
            None => child.wait_with_output().await,
        }
        .map_err(|e| execution_failed(e.to_string()))?;

        if !output.stderr.is_empty() {
            tracing::debug!(
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "Renderer wrote to stderr"
            );
        }

        if !output.status.success() {
            tracing::error!(status = %output.status, "Failed to render tile");
            return Err(execution_failed(output.status.to_string()));
        }

        let mut captured = output.stdout;
        if self.capture == OutputCapture::Combined {
            captured.extend_from_slice(&output.stderr);
        }

        tracing::debug!(
            bytes = captured.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Renderer finished"
        );
        Ok(captured)
    }

    async fn check(&self) -> Result<(), RenderError> {
        let metadata = tokio::fs::metadata(&self.program)
            .await
            .map_err(|e| execution_failed(format!("{}: {}", self.program.display(), e)))?;
        if !metadata.is_file() {
            return Err(execution_failed(format!(
                "{}: not a file",
                self.program.display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_capture_from_str() {
        assert_eq!("combined".parse::<OutputCapture>(), Ok(OutputCapture::Combined));
        assert_eq!("STDOUT".parse::<OutputCapture>(), Ok(OutputCapture::Stdout));
        assert!("stderr".parse::<OutputCapture>().is_err());
    }

    #[tokio::test]
    async fn test_missing_program_is_execution_failure() {
        let invoker = ProcessInvoker::new("/nonexistent/tilegate-renderer");
        let query = RequestQuery::new("LAYERS=a").expect("non-empty query");

        let result = invoker.invoke(&query).await;
        assert!(matches!(result, Err(RenderError::ExecutionFailed { .. })));
        assert!(matches!(
            invoker.check().await,
            Err(RenderError::ExecutionFailed { .. })
        ));
    }
}

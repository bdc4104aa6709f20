//! Query backends: the expensive work the cache sits in front of
//!
//! Handlers call a [`QueryBackend`] without knowing whether the cache is
//! active. [`CommandBackend`] shells out to an external program (for example
//! an LLM-driven data lookup tool); [`EchoBackend`] answers locally.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Environment variable carrying the requester id to command backends
pub const REQUESTER_ENV: &str = "QUERYMEMO_REQUESTER";

/// Answers a free-form query
#[async_trait]
pub trait QueryBackend: Send + Sync {
    async fn answer(&self, query: &str, requester: Option<&str>) -> Result<Value>;
}

/// Answers by echoing the query back with a timestamp
#[derive(Debug, Clone, Default)]
pub struct EchoBackend;

#[async_trait]
impl QueryBackend for EchoBackend {
    async fn answer(&self, query: &str, requester: Option<&str>) -> Result<Value> {
        Ok(json!({
            "query": query.trim(),
            "requester": requester,
            "answered_at": Utc::now(),
        }))
    }
}

/// Runs an external program per query
///
/// The query is passed as the last positional argument. Stdout is parsed as
/// JSON when possible, otherwise returned as a string. A non-zero exit status
/// is an error.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: PathBuf,
    args: Vec<String>,
    working_dir: PathBuf,
}

impl CommandBackend {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: PathBuf::from("."),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = dir;
        self
    }
}

#[async_trait]
impl QueryBackend for CommandBackend {
    async fn answer(&self, query: &str, requester: Option<&str>) -> Result<Value> {
        let mut cmd = Command::new(&self.program);
        cmd.current_dir(&self.working_dir);
        cmd.args(&self.args);
        if let Some(requester) = requester {
            cmd.env(REQUESTER_ENV, requester);
        }

        // Query as positional argument (must be last)
        cmd.arg(query.trim());

        // Capture output and close stdin to prevent blocking
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running query backend: {:?}", cmd);

        let output = cmd
            .output()
            .await
            .with_context(|| format!("Failed to execute {}", self.program.display()))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status.code().unwrap_or(-1),
                stderr.trim()
            );
        }

        if !stderr.is_empty() {
            tracing::warn!("query backend stderr: {}", stderr.trim());
        }

        let stdout = stdout.trim();
        Ok(serde_json::from_str(stdout).unwrap_or_else(|_| Value::String(stdout.to_string())))
    }
}

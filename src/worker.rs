//! Worker process adapter.
//!
//! Each request runs the external RAG worker exactly once, as a subprocess
//! invoked with `<key> <query>` appended to the configured command line.
//! Both output streams are captured in full; the invocation resolves when
//! the process terminates, whatever its exit code. The exit code is recorded
//! but not branched on: a worker may print a valid error payload and still
//! exit non-zero, and that output is what the caller wants.
//!
//! Stderr never reaches the client. It is logged here for operators and
//! then dropped.

use std::process::{ExitStatus, Stdio};

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::WorkerConfig;

/// Snapshot of the environment variables handed to a worker invocation.
///
/// Captured explicitly rather than inherited from ambient process state, so
/// tests can substitute a controlled environment.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot(Vec<(String, String)>);

impl EnvSnapshot {
    /// Snapshot the host process environment.
    pub fn current() -> Self {
        Self(std::env::vars().collect())
    }

    /// Build a snapshot from explicit pairs.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self(pairs.into_iter().collect())
    }

    fn apply(&self, cmd: &mut Command) {
        cmd.env_clear();
        cmd.envs(self.0.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
}

/// Captured result of one terminated worker process.
#[derive(Debug)]
#[allow(dead_code)]
pub struct WorkerOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: ExitStatus,
}

/// One end-to-end run of the worker for a single request.
///
/// Owns its argument vector and environment; nothing is shared with other
/// in-flight invocations.
pub struct WorkerInvocation {
    program: String,
    args: Vec<String>,
    env: EnvSnapshot,
}

impl WorkerInvocation {
    /// Bind an invocation to a request's key and query.
    ///
    /// The argument vector is the configured leading args followed by the
    /// two positionals: `<command> [args...] <key> <query>`.
    pub fn new(config: &WorkerConfig, key: &str, query: &str, env: EnvSnapshot) -> Self {
        let mut args = config.args.clone();
        args.push(key.to_string());
        args.push(query.to_string());
        Self {
            program: config.command.clone(),
            args,
            env,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run the worker to completion and capture both output streams.
    ///
    /// Returns an error only when the process cannot be started or waited
    /// on. A non-zero exit is not an error: captured output is returned
    /// regardless of status.
    pub async fn run(self) -> Result<WorkerOutput> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        self.env.apply(&mut cmd);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn worker process: {}", self.program))?;

        // Drain both pipes concurrently with wait(). A child blocked on a
        // full pipe would otherwise never terminate.
        let stdout_handle = child.stdout.take();
        let stderr_handle = child.stderr.take();
        let stdout_reader = tokio::spawn(read_stream(stdout_handle));
        let stderr_reader = tokio::spawn(read_stream(stderr_handle));

        let status = child
            .wait()
            .await
            .with_context(|| "Failed to wait for worker process")?;

        let stdout = stdout_reader
            .await
            .with_context(|| "Worker stdout reader task failed")??;
        let stderr = stderr_reader
            .await
            .with_context(|| "Worker stderr reader task failed")??;

        debug!(code = ?status.code(), "worker exited");
        if !stderr.trim().is_empty() {
            warn!(stderr = %stderr.trim(), "worker wrote to stderr");
        }

        Ok(WorkerOutput {
            stdout,
            stderr,
            status,
        })
    }
}

async fn read_stream<R>(stream: Option<R>) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        stream
            .read_to_end(&mut buf)
            .await
            .with_context(|| "Failed to read worker output stream")?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

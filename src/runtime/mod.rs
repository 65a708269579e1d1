//! Sandbox runtime collaborator boundary.
//!
//! This module provides the [`SandboxRuntime`] trait the orchestrator drives
//! and the [`LocalRuntime`] implementation rooted in a host directory. The
//! core's correctness depends only on the six primitives' contracts, not on
//! how a runtime isolates anything.

mod local;

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::error::{Error, Result};

pub use local::LocalRuntime;

/// A "listening port bound" event emitted by the runtime whenever any
/// process starts serving, including processes started outside the
/// orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerReady {
    pub port: u16,
    pub url: String,
}

/// Handle to a spawned sandbox process: a streamed-output receiver plus an
/// awaitable exit code.
pub struct ProcessHandle {
    output: Option<mpsc::Receiver<String>>,
    exit: oneshot::Receiver<i32>,
}

impl ProcessHandle {
    /// Creates a handle from its two channels. Runtime implementations and
    /// test fakes construct these.
    pub fn new(output: mpsc::Receiver<String>, exit: oneshot::Receiver<i32>) -> Self {
        Self {
            output: Some(output),
            exit,
        }
    }

    /// Takes the output stream, leaving the handle awaitable.
    ///
    /// Returns `None` if the stream was already taken.
    pub fn take_output(&mut self) -> Option<mpsc::Receiver<String>> {
        self.output.take()
    }

    /// Waits for the process to exit and returns its exit code.
    ///
    /// If the output stream was never taken it is drained in the background
    /// so the producer is not blocked on a full channel.
    pub async fn wait(mut self) -> Result<i32> {
        if let Some(mut output) = self.output.take() {
            tokio::spawn(async move { while output.recv().await.is_some() {} });
        }
        self.exit
            .await
            .map_err(|_| Error::RuntimeUnavailable("process supervisor dropped".to_string()))
    }
}

/// The six primitives a sandbox runtime must expose.
#[async_trait]
pub trait SandboxRuntime: Send + Sync {
    /// Writes a flat path→content map into the sandbox filesystem, creating
    /// intermediate directories from path prefixes.
    async fn mount(&self, files: &BTreeMap<String, String>) -> Result<()>;

    /// Spawns a named command inside the sandbox with streamed output.
    async fn spawn(&self, command: &str, args: &[String]) -> Result<ProcessHandle>;

    /// Reads a file from the sandbox filesystem.
    async fn read_file(&self, path: &str) -> Result<String>;

    /// Writes a single file, creating parent directories as needed.
    ///
    /// This is the incremental-save path; it does not go through `mount`.
    async fn write_file(&self, path: &str, content: &str) -> Result<()>;

    /// Subscribes to "listening port bound" events for the runtime's whole
    /// lifetime.
    fn subscribe_server_ready(&self) -> broadcast::Receiver<ServerReady>;

    /// Releases the sandbox. In-flight operations observe this best-effort;
    /// late signals from a torn-down instance are for subscribers to ignore.
    async fn teardown(&self) -> Result<()>;
}

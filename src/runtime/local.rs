//! Directory-rooted sandbox runtime.
//!
//! Mounts files into a host directory and spawns real processes there.
//! Server readiness is detected by sniffing process output for a locally
//! bound URL, the host-side analogue of a port-bind event: dev servers
//! print the address they listen on.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::error::{Error, Result};

use super::{ProcessHandle, SandboxRuntime, ServerReady};

const READY_CHANNEL_CAPACITY: usize = 16;
const OUTPUT_CHANNEL_CAPACITY: usize = 256;

/// Sandbox runtime backed by a directory on the host filesystem.
pub struct LocalRuntime {
    root: PathBuf,
    ready_tx: broadcast::Sender<ServerReady>,
    shutdown_tx: watch::Sender<bool>,
    torn_down: AtomicBool,
    owns_root: bool,
}

impl LocalRuntime {
    /// Boots a runtime in a fresh temp directory.
    pub fn boot() -> Result<Self> {
        let root = std::env::temp_dir().join(format!("treehouse-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&root)
            .map_err(|e| Error::RuntimeUnavailable(format!("failed to create sandbox: {}", e)))?;
        tracing::info!(root = %root.display(), "booted local sandbox");
        Ok(Self::with_root(root, true))
    }

    /// Boots a runtime rooted at an existing directory, which is left in
    /// place on teardown.
    pub fn boot_at(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|e| Error::RuntimeUnavailable(format!("failed to create sandbox: {}", e)))?;
        Ok(Self::with_root(root, false))
    }

    fn with_root(root: PathBuf, owns_root: bool) -> Self {
        let (ready_tx, _) = broadcast::channel(READY_CHANNEL_CAPACITY);
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            root,
            ready_tx,
            shutdown_tx,
            torn_down: AtomicBool::new(false),
            owns_root,
        }
    }

    /// The sandbox root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn check_alive(&self) -> Result<()> {
        if self.torn_down.load(Ordering::SeqCst) {
            Err(Error::RuntimeUnavailable("sandbox torn down".to_string()))
        } else {
            Ok(())
        }
    }

    /// Resolves a sandbox-relative path, rejecting escapes.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty()
            || Path::new(path).is_absolute()
            || trimmed.split('/').any(|seg| seg == "..")
        {
            return Err(Error::Mount(format!("invalid sandbox path '{}'", path)));
        }
        Ok(self.root.join(trimmed))
    }

    async fn write_one(&self, path: &str, content: &str) -> Result<()> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Mount(format!("mkdir for '{}': {}", path, e)))?;
        }
        tokio::fs::write(&target, content)
            .await
            .map_err(|e| Error::Mount(format!("write '{}': {}", path, e)))?;
        Ok(())
    }
}

#[async_trait]
impl SandboxRuntime for LocalRuntime {
    async fn mount(&self, files: &BTreeMap<String, String>) -> Result<()> {
        self.check_alive()?;
        for (path, content) in files {
            self.write_one(path, content).await?;
        }
        tracing::debug!(count = files.len(), "mounted files");
        Ok(())
    }

    async fn spawn(&self, command: &str, args: &[String]) -> Result<ProcessHandle> {
        self.check_alive()?;

        tracing::info!(command = %command, ?args, cwd = %self.root.display(), "spawning");

        let mut child = Command::new(command)
            .args(args)
            .current_dir(&self.root)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::RuntimeUnavailable(format!("failed to spawn {}: {}", command, e))
            })?;

        let stdout = child.stdout.take().expect("stdout was piped");
        let stderr = child.stderr.take().expect("stderr was piped");

        let (output_tx, output_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        let (exit_tx, exit_rx) = oneshot::channel();
        let ready_tx = self.ready_tx.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut stdout_lines = BufReader::new(stdout).lines();
            let mut stderr_lines = BufReader::new(stderr).lines();
            let mut stdout_done = false;
            let mut stderr_done = false;
            let mut announced: Option<String> = None;

            while !(stdout_done && stderr_done) {
                let line = tokio::select! {
                    line = stdout_lines.next_line(), if !stdout_done => {
                        match line {
                            Ok(Some(line)) => Some(line),
                            _ => {
                                stdout_done = true;
                                None
                            }
                        }
                    }
                    line = stderr_lines.next_line(), if !stderr_done => {
                        match line {
                            Ok(Some(line)) => Some(line),
                            _ => {
                                stderr_done = true;
                                None
                            }
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        tracing::debug!("teardown; killing child process");
                        let _ = child.kill().await;
                        None
                    }
                };

                if let Some(line) = line {
                    if let Some(ready) = sniff_server_url(&line) {
                        if announced.as_deref() != Some(ready.url.as_str()) {
                            announced = Some(ready.url.clone());
                            let _ = ready_tx.send(ready);
                        }
                    }
                    // A dropped receiver just means nobody is listening;
                    // keep draining so the child never blocks on its pipe.
                    let _ = output_tx.send(line).await;
                }
            }

            let code = match child.wait().await {
                Ok(status) => status.code().unwrap_or(-1),
                Err(e) => {
                    tracing::error!(error = %e, "failed to wait for child");
                    -1
                }
            };
            let _ = exit_tx.send(code);
        });

        Ok(ProcessHandle::new(output_rx, exit_rx))
    }

    async fn read_file(&self, path: &str) -> Result<String> {
        self.check_alive()?;
        let target = self.resolve(path)?;
        Ok(tokio::fs::read_to_string(target).await?)
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        self.check_alive()?;
        self.write_one(path, content).await
    }

    fn subscribe_server_ready(&self) -> broadcast::Receiver<ServerReady> {
        self.ready_tx.subscribe()
    }

    async fn teardown(&self) -> Result<()> {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let _ = self.shutdown_tx.send(true);
        if self.owns_root {
            if let Err(e) = tokio::fs::remove_dir_all(&self.root).await {
                tracing::warn!(error = %e, root = %self.root.display(), "sandbox cleanup incomplete");
            }
        }
        tracing::info!(root = %self.root.display(), "sandbox torn down");
        Ok(())
    }
}

/// Extracts a locally bound server URL from one line of process output.
fn sniff_server_url(line: &str) -> Option<ServerReady> {
    for host in ["http://localhost:", "http://127.0.0.1:"] {
        if let Some(idx) = line.find(host) {
            let digits: String = line[idx + host.len()..]
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if let Ok(port) = digits.parse::<u16>() {
                if port != 0 {
                    return Some(ServerReady {
                        port,
                        url: format!("{}{}", host, port),
                    });
                }
            }
        }
    }
    None
}

//! Sandbox bootstrap orchestrator.
//!
//! Drives a project tree through transform, mount, clean, install, start
//! and publishes a preview URL once the dev server announces itself. The
//! server-ready listener outlives individual bootstrap attempts: readiness
//! can arrive long after `bootstrap` returns, and may arrive more than once
//! (dev servers restart on their own).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::config::{BootstrapConfig, Validate};
use crate::error::{Error, Result};
use crate::manifest::{self, StartPlan};
use crate::relay::OutputRelay;
use crate::runtime::{ProcessHandle, SandboxRuntime, ServerReady};
use crate::transform;
use crate::tree::FolderNode;

use tokio::sync::watch;

/// Where a bootstrap attempt currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Idle,
    Transforming,
    Mounting,
    CleaningArtifacts,
    Installing,
    DetectingStartCommand,
    Building,
    Starting,
    AwaitingServerReady,
    Ready,
    Failed(String),
}

impl Phase {
    fn in_flight(&self) -> bool {
        !matches!(self, Phase::Idle | Phase::Ready | Phase::Failed(_))
    }
}

/// A published preview location. The token changes on every publication so
/// consumers reload even when the URL itself is stable.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewUpdate {
    pub url: String,
    pub token: u64,
}

struct Shared {
    phase: Phase,
    server_url: Option<String>,
    last_tree: Option<FolderNode>,
    torn_down: bool,
}

pub struct BootstrapOrchestrator<R: SandboxRuntime> {
    runtime: R,
    config: BootstrapConfig,
    relay: OutputRelay,
    shared: Mutex<Shared>,
    next_token: AtomicU64,
    preview_tx: watch::Sender<Option<PreviewUpdate>>,
}

impl<R: SandboxRuntime + 'static> BootstrapOrchestrator<R> {
    /// Builds the orchestrator and attaches the long-lived server-ready
    /// listener. The listener holds only a weak reference so dropping the
    /// orchestrator stops it.
    pub fn start(runtime: R, config: BootstrapConfig) -> Arc<Self> {
        let (preview_tx, _) = watch::channel(None);
        let mut ready_rx = runtime.subscribe_server_ready();
        let orchestrator = Arc::new(Self {
            runtime,
            config,
            relay: OutputRelay::new(),
            shared: Mutex::new(Shared {
                phase: Phase::Idle,
                server_url: None,
                last_tree: None,
                torn_down: false,
            }),
            next_token: AtomicU64::new(1),
            preview_tx,
        });

        let weak: Weak<Self> = Arc::downgrade(&orchestrator);
        tokio::spawn(async move {
            loop {
                match ready_rx.recv().await {
                    Ok(ready) => match weak.upgrade() {
                        Some(this) => this.on_server_ready(ready),
                        None => break,
                    },
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "server-ready listener lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        orchestrator
    }

    /// Runs the full bootstrap sequence for `tree`. No-op when a previous
    /// attempt is still in flight or already reached `Ready`; a `Failed`
    /// attempt may be retried.
    pub async fn bootstrap(&self, tree: &FolderNode) -> Result<()> {
        for warning in self.config.validate().into_result()? {
            tracing::warn!(%warning, "bootstrap configuration");
        }
        {
            let mut shared = self.lock();
            if shared.torn_down {
                return Err(Error::RuntimeUnavailable("sandbox torn down".to_string()));
            }
            if shared.phase == Phase::Ready || shared.phase.in_flight() {
                tracing::info!(phase = ?shared.phase, "bootstrap skipped");
                return Ok(());
            }
            shared.phase = Phase::Transforming;
            shared.last_tree = Some(tree.clone());
        }

        match self.run_phases(tree).await {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::error!(error = %err, "bootstrap failed");
                self.lock().phase = Phase::Failed(err.to_string());
                Err(err)
            }
        }
    }

    async fn run_phases(&self, tree: &FolderNode) -> Result<()> {
        let files = transform::flatten(tree);
        tracing::info!(files = files.len(), "transformed project tree");

        self.set_phase(Phase::Mounting);
        self.runtime.mount(&files).await?;

        self.set_phase(Phase::CleaningArtifacts);
        self.clean_artifacts().await;

        self.set_phase(Phase::Installing);
        let code = self.run_to_exit(&self.config.install_args).await?;
        if code != 0 {
            return Err(Error::InstallFailed(code));
        }

        self.set_phase(Phase::DetectingStartCommand);
        let manifest = self.runtime.read_file("package.json").await?;
        let plan = manifest::detect_start_plan(&manifest)?;

        if let Some(build_args) = &plan.build {
            self.set_phase(Phase::Building);
            let code = self.run_to_exit(build_args).await?;
            if code != 0 {
                return Err(Error::BuildFailed(code));
            }
        }

        self.set_phase(Phase::Starting);
        self.start_server(&plan).await?;

        self.set_phase(Phase::AwaitingServerReady);
        Ok(())
    }

    /// Removes stale dependency artifacts. Failures here are logged and
    /// swallowed; a fresh mount has nothing to clean.
    async fn clean_artifacts(&self) {
        let mut args = vec!["-rf".to_string()];
        args.extend(self.config.clean_paths.iter().cloned());
        match self.runtime.spawn("rm", &args).await {
            Ok(process) => {
                if let Err(err) = process.wait().await {
                    tracing::debug!(error = %err, "artifact cleanup did not finish");
                }
            }
            Err(err) => tracing::debug!(error = %err, "artifact cleanup unavailable"),
        }
    }

    /// Spawns the package manager with `args`, mirrors its output to the
    /// relay, and returns its exit code.
    async fn run_to_exit(&self, args: &[String]) -> Result<i32> {
        let mut process = self
            .runtime
            .spawn(&self.config.package_manager, args)
            .await?;
        if let Some(mut output) = process.take_output() {
            let relay = self.relay.clone();
            let drain = tokio::spawn(async move {
                while let Some(chunk) = output.recv().await {
                    relay.write(chunk);
                }
            });
            let code = process.wait().await?;
            let _ = drain.await;
            Ok(code)
        } else {
            process.wait().await
        }
    }

    /// Launches the dev server. Its exit is deliberately not awaited: the
    /// process runs for the life of the sandbox and readiness arrives via
    /// the server-ready channel instead.
    async fn start_server(&self, plan: &StartPlan) -> Result<()> {
        let process = self
            .runtime
            .spawn(&self.config.package_manager, &plan.start)
            .await?;
        self.detach_streaming(process);
        Ok(())
    }

    fn detach_streaming(&self, mut process: ProcessHandle) {
        let relay = self.relay.clone();
        let output = process.take_output();
        tokio::spawn(async move {
            if let Some(mut output) = output {
                while let Some(chunk) = output.recv().await {
                    relay.write(chunk);
                }
            }
            match process.wait().await {
                Ok(code) => tracing::info!(code, "dev server exited"),
                Err(err) => tracing::debug!(error = %err, "dev server supervisor gone"),
            }
        });
    }

    /// State-guarded server-ready reducer. Idempotent: a duplicate signal
    /// republishes with a fresh token but changes no state.
    fn on_server_ready(&self, ready: ServerReady) {
        let mut shared = self.lock();
        if shared.torn_down {
            tracing::debug!(url = %ready.url, "server-ready after teardown ignored");
            return;
        }
        let already_ready = shared.phase == Phase::Ready;
        shared.server_url = Some(ready.url.clone());
        shared.phase = Phase::Ready;
        drop(shared);

        if already_ready {
            tracing::debug!(url = %ready.url, "duplicate server-ready; republishing");
        } else {
            tracing::info!(url = %ready.url, port = ready.port, "server ready");
        }
        self.publish(&ready.url);
    }

    /// Records an edited tree and, when the server is already up, republishes
    /// the preview so it reloads. The dev server hot-reloads from the file
    /// writes; no re-bootstrap happens here.
    pub fn notify_tree_edited(&self, tree: &FolderNode) {
        let mut shared = self.lock();
        if shared.last_tree.as_ref() == Some(tree) {
            return;
        }
        shared.last_tree = Some(tree.clone());
        let url = match (&shared.phase, &shared.server_url) {
            (Phase::Ready, Some(url)) => url.clone(),
            _ => return,
        };
        drop(shared);
        self.publish(&url);
    }

    /// Writes one file straight into the sandbox, the incremental-save path.
    pub async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        self.runtime.write_file(path, content).await
    }

    /// Discards all bootstrap status so the next `bootstrap` call runs the
    /// full sequence again.
    pub fn force_resetup(&self) {
        let mut shared = self.lock();
        tracing::info!(phase = ?shared.phase, "forcing re-setup");
        shared.phase = Phase::Idle;
        shared.server_url = None;
        shared.last_tree = None;
        drop(shared);
        let _ = self.preview_tx.send(None);
    }

    /// Releases the runtime. Server-ready signals crossing the teardown are
    /// dropped by the reducer.
    pub async fn teardown(&self) -> Result<()> {
        self.lock().torn_down = true;
        self.runtime.teardown().await
    }

    pub fn subscribe_preview(&self) -> watch::Receiver<Option<PreviewUpdate>> {
        self.preview_tx.subscribe()
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase.clone()
    }

    pub fn relay(&self) -> &OutputRelay {
        &self.relay
    }

    fn publish(&self, url: &str) {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        let update = PreviewUpdate {
            url: bust_cache(url, token),
            token,
        };
        tracing::debug!(url = %update.url, token, "publishing preview");
        let _ = self.preview_tx.send(Some(update));
    }

    fn set_phase(&self, phase: Phase) {
        tracing::debug!(?phase, "entering phase");
        self.lock().phase = phase;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Appends a reload token to `url`, respecting an existing query string.
fn bust_cache(url: &str, token: u64) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{}{}t={}", url, sep, token)
}

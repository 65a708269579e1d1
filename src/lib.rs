//! Treehouse - virtual project trees with sandboxed live previews
//!
//! This library models a browser-style code playground: an in-memory project
//! tree with editing sessions, and an orchestrator that mounts the tree into
//! a sandbox runtime, installs dependencies, starts the dev server, and
//! publishes a cache-busted preview URL when the server comes up.

pub mod config;
pub mod error;
pub mod manifest;
pub mod orchestrator;
pub mod persist;
pub mod relay;
pub mod runtime;
pub mod session;
pub mod transform;
pub mod tree;

pub use config::{BootstrapConfig, Validate, ValidationResult};
pub use error::{Error, Result};
pub use manifest::{detect_start_plan, StartPlan};
pub use orchestrator::{BootstrapOrchestrator, Phase, PreviewUpdate};
pub use persist::{MemoryStore, Playground, TemplateSource, TreeStore};
pub use relay::OutputRelay;
pub use runtime::{LocalRuntime, ProcessHandle, SandboxRuntime, ServerReady};
pub use session::{OpenFileSession, SessionStore};
pub use transform::flatten;
pub use tree::{FileNode, FolderNode, Node};

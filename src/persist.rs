//! Persistence and template boundaries.
//!
//! The crate does not own storage. `TreeStore` and `TemplateSource` are the
//! two seams a host wires up; `MemoryStore` implements both for tests and
//! the demo binary. Failures surface verbatim, nothing here retries.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::tree::FolderNode;

/// Durable storage for playground project trees, keyed by playground id.
#[async_trait]
pub trait TreeStore: Send + Sync {
    /// Loads a previously saved tree. `Ok(None)` means the playground has
    /// never been saved, which is not an error.
    async fn load_tree(&self, playground_id: &str) -> Result<Option<FolderNode>>;

    async fn save_tree(&self, playground_id: &str, tree: &FolderNode) -> Result<()>;
}

/// Source of starter trees for new playgrounds.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn initial_tree(&self, template: &str) -> Result<FolderNode>;
}

/// In-memory store for tests and the demo binary. Templates are registered
/// up front; saved trees live in a map.
#[derive(Default)]
pub struct MemoryStore {
    trees: Mutex<HashMap<String, FolderNode>>,
    templates: Mutex<HashMap<String, FolderNode>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_template(&self, name: impl Into<String>, tree: FolderNode) {
        self.templates
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.into(), tree);
    }
}

#[async_trait]
impl TreeStore for MemoryStore {
    async fn load_tree(&self, playground_id: &str) -> Result<Option<FolderNode>> {
        let trees = self.trees.lock().unwrap_or_else(|e| e.into_inner());
        Ok(trees.get(playground_id).cloned())
    }

    async fn save_tree(&self, playground_id: &str, tree: &FolderNode) -> Result<()> {
        let mut trees = self.trees.lock().unwrap_or_else(|e| e.into_inner());
        trees.insert(playground_id.to_string(), tree.clone());
        Ok(())
    }
}

#[async_trait]
impl TemplateSource for MemoryStore {
    async fn initial_tree(&self, template: &str) -> Result<FolderNode> {
        let templates = self.templates.lock().unwrap_or_else(|e| e.into_inner());
        templates
            .get(template)
            .cloned()
            .ok_or_else(|| Error::Persistence(format!("unknown template '{}'", template)))
    }
}

#[async_trait]
impl<S: TreeStore + ?Sized> TreeStore for std::sync::Arc<S> {
    async fn load_tree(&self, playground_id: &str) -> Result<Option<FolderNode>> {
        (**self).load_tree(playground_id).await
    }

    async fn save_tree(&self, playground_id: &str, tree: &FolderNode) -> Result<()> {
        (**self).save_tree(playground_id, tree).await
    }
}

#[async_trait]
impl<T: TemplateSource + ?Sized> TemplateSource for std::sync::Arc<T> {
    async fn initial_tree(&self, template: &str) -> Result<FolderNode> {
        (**self).initial_tree(template).await
    }
}

/// Couples a playground id to its store and template source: load what was
/// saved, fall back to the template for a fresh playground.
pub struct Playground<S, T> {
    store: S,
    templates: T,
    playground_id: String,
    template: String,
}

impl<S: TreeStore, T: TemplateSource> Playground<S, T> {
    pub fn new(
        store: S,
        templates: T,
        playground_id: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            store,
            templates,
            playground_id: playground_id.into(),
            template: template.into(),
        }
    }

    pub fn playground_id(&self) -> &str {
        &self.playground_id
    }

    /// The tree to open the playground with: the saved copy when one exists,
    /// otherwise the template's starter tree.
    pub async fn load(&self) -> Result<FolderNode> {
        if let Some(saved) = self.store.load_tree(&self.playground_id).await? {
            tracing::debug!(playground = %self.playground_id, "loaded saved tree");
            return Ok(saved);
        }
        tracing::debug!(
            playground = %self.playground_id,
            template = %self.template,
            "no saved tree; using template"
        );
        self.templates.initial_tree(&self.template).await
    }

    pub async fn save(&self, tree: &FolderNode) -> Result<()> {
        self.store.save_tree(&self.playground_id, tree).await
    }
}

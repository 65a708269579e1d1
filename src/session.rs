//! Editing session on top of the tree model.
//!
//! `SessionStore` owns the tree during an editing session and keeps tab
//! state (open files, working buffers, dirty flags, active file) consistent
//! with it under arbitrary structural edits. Tree errors propagate unchanged
//! to the caller; no silent recovery happens here.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tree::{self, FileNode, FolderNode, Node};

/// Identifier of an open file: its `/`-joined path within the tree.
pub type FileId = String;

/// Per-tab state for one open file.
///
/// `content` is the working buffer and may diverge from the tree node's
/// content until the file is saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenFileSession {
    pub file_id: FileId,
    pub content: String,
    pub has_unsaved_changes: bool,
}

/// Stateful layer tracking open files over a tree.
#[derive(Debug, Clone)]
pub struct SessionStore {
    tree: FolderNode,
    open_files: Vec<OpenFileSession>,
    active: Option<FileId>,
    playground_id: Option<String>,
}

impl SessionStore {
    /// Creates a session over an initial tree with no files open.
    pub fn new(tree: FolderNode) -> Self {
        Self {
            tree,
            open_files: Vec::new(),
            active: None,
            playground_id: None,
        }
    }

    /// The current tree.
    pub fn tree(&self) -> &FolderNode {
        &self.tree
    }

    /// Open files in the order they were opened.
    pub fn open_files(&self) -> &[OpenFileSession] {
        &self.open_files
    }

    /// The active file's id, if any file is active.
    pub fn active_file_id(&self) -> Option<&FileId> {
        self.active.as_ref()
    }

    /// The active file's session, if any.
    pub fn active_file(&self) -> Option<&OpenFileSession> {
        let active = self.active.as_ref()?;
        self.open_files.iter().find(|f| &f.file_id == active)
    }

    /// Returns true if any open file has unsaved changes.
    pub fn has_unsaved_changes(&self) -> bool {
        self.open_files.iter().any(|f| f.has_unsaved_changes)
    }

    /// Switches the playground this session edits.
    ///
    /// Switching to a different id resets the whole tab session; working
    /// buffers that were never saved are discarded.
    pub fn set_playground_id(&mut self, id: impl Into<String>) {
        let id = id.into();
        if self.playground_id.as_deref() != Some(id.as_str()) {
            self.open_files.clear();
            self.active = None;
        }
        self.playground_id = Some(id);
    }

    /// Opens the file at `path`, making it active.
    ///
    /// An already-open file just becomes active; its working buffer is kept.
    /// Otherwise a new session is appended, seeded from the tree's current
    /// content.
    pub fn open_file(&mut self, path: &str) -> Result<()> {
        if self.open_files.iter().any(|f| f.file_id == path) {
            self.active = Some(path.to_string());
            return Ok(());
        }

        let node = tree::find_node(&self.tree, path).ok_or_else(|| Error::NotFound {
            path: path.to_string(),
        })?;
        let file = match node {
            Node::File(file) => file,
            Node::Folder(_) => {
                return Err(Error::TargetIsFolder {
                    path: path.to_string(),
                })
            }
        };

        self.open_files.push(OpenFileSession {
            file_id: path.to_string(),
            content: file.content.clone(),
            has_unsaved_changes: false,
        });
        self.active = Some(path.to_string());
        Ok(())
    }

    /// Closes an open file, discarding its working buffer.
    ///
    /// If it was active, activation falls to the most recently opened
    /// remaining file, or none.
    pub fn close_file(&mut self, file_id: &str) {
        self.open_files.retain(|f| f.file_id != file_id);
        if self.active.as_deref() == Some(file_id) {
            self.active = self.open_files.last().map(|f| f.file_id.clone());
        }
    }

    /// Closes every open file and clears activation.
    ///
    /// Unsaved working buffers are discarded; content already saved into the
    /// tree is unaffected.
    pub fn close_all(&mut self) {
        self.open_files.clear();
        self.active = None;
    }

    /// Sets the active file. No-op when the file is not open.
    pub fn set_active_file(&mut self, file_id: &str) {
        if self.open_files.iter().any(|f| f.file_id == file_id) {
            self.active = Some(file_id.to_string());
        }
    }

    /// Overwrites the working buffer of an open file and marks it dirty.
    ///
    /// Byte-identical writes are not special-cased: any call marks the file
    /// dirty.
    pub fn update_content(&mut self, file_id: &str, content: impl Into<String>) -> Result<()> {
        let session = self
            .open_files
            .iter_mut()
            .find(|f| f.file_id == file_id)
            .ok_or_else(|| Error::NotFound {
                path: file_id.to_string(),
            })?;
        session.content = content.into();
        session.has_unsaved_changes = true;
        Ok(())
    }

    /// Persists an open file's working buffer into the tree and clears its
    /// dirty flag.
    pub fn save_file(&mut self, file_id: &str) -> Result<()> {
        let session = self
            .open_files
            .iter()
            .find(|f| f.file_id == file_id)
            .ok_or_else(|| Error::NotFound {
                path: file_id.to_string(),
            })?;

        let updated = tree::set_content(&self.tree, file_id, &session.content)?;
        self.tree = updated;
        if let Some(session) = self.open_files.iter_mut().find(|f| f.file_id == file_id) {
            session.has_unsaved_changes = false;
        }
        Ok(())
    }

    /// Saves every dirty open file.
    ///
    /// Atomic with respect to observers: the tree and the dirty flags only
    /// change if every save succeeds.
    pub fn save_all(&mut self) -> Result<()> {
        let mut tree = self.tree.clone();
        for session in self.open_files.iter().filter(|f| f.has_unsaved_changes) {
            tree = tree::set_content(&tree, &session.file_id, &session.content)?;
        }
        self.tree = tree;
        for session in &mut self.open_files {
            session.has_unsaved_changes = false;
        }
        Ok(())
    }

    /// Creates an empty file under `parent_path`.
    pub fn add_file(&mut self, parent_path: &str, name: &str, extension: &str) -> Result<()> {
        let node = Node::File(FileNode::new(name, extension));
        self.tree = tree::insert(&self.tree, parent_path, node)?;
        Ok(())
    }

    /// Creates an empty folder under `parent_path`.
    pub fn add_folder(&mut self, parent_path: &str, name: &str) -> Result<()> {
        let node = Node::Folder(FolderNode::new(name));
        self.tree = tree::insert(&self.tree, parent_path, node)?;
        Ok(())
    }

    /// Deletes the file at `path`; if it was open, its tab is closed.
    pub fn delete_file(&mut self, path: &str) -> Result<()> {
        self.tree = tree::remove(&self.tree, path)?;
        self.close_file(path);
        Ok(())
    }

    /// Deletes the folder at `path` with its whole subtree; tabs of files
    /// underneath it are closed.
    pub fn delete_folder(&mut self, path: &str) -> Result<()> {
        self.tree = tree::remove(&self.tree, path)?;
        let prefix = format!("{}/", path);
        self.open_files.retain(|f| !f.file_id.starts_with(&prefix));
        if let Some(active) = &self.active {
            if active.starts_with(&prefix) {
                self.active = self.open_files.last().map(|f| f.file_id.clone());
            }
        }
        Ok(())
    }

    /// Renames the file at `path`. An open tab keeps its buffer and dirty
    /// state under the new identity.
    pub fn rename_file(
        &mut self,
        path: &str,
        new_name: &str,
        new_extension: Option<&str>,
    ) -> Result<()> {
        // The kept extension comes from the node itself, not the path: an
        // extensionless file may have a dot in its name (e.g. `v1.2`).
        let kept_extension = match tree::find_node(&self.tree, path) {
            Some(Node::File(file)) => file.extension.clone(),
            _ => String::new(),
        };
        self.tree = tree::rename(&self.tree, path, new_name, new_extension)?;
        let extension = new_extension.unwrap_or(&kept_extension);
        let leaf = if extension.is_empty() {
            new_name.to_string()
        } else {
            format!("{}.{}", new_name, extension)
        };
        let new_id = replace_leaf(path, &leaf);
        if let Some(session) = self.open_files.iter_mut().find(|f| f.file_id == path) {
            session.file_id = new_id.clone();
        }
        if self.active.as_deref() == Some(path) {
            self.active = Some(new_id);
        }
        Ok(())
    }

    /// Renames the folder at `path`, rewriting the path prefix of every open
    /// file underneath it without touching dirty state.
    pub fn rename_folder(&mut self, path: &str, new_name: &str) -> Result<()> {
        self.tree = tree::rename(&self.tree, path, new_name, None)?;
        let new_path = replace_leaf(path, new_name);
        let old_prefix = format!("{}/", path);
        let new_prefix = format!("{}/", new_path);
        for session in &mut self.open_files {
            if let Some(rest) = session.file_id.strip_prefix(&old_prefix) {
                session.file_id = format!("{}{}", new_prefix, rest);
            }
        }
        if let Some(active) = self.active.take() {
            self.active = Some(match active.strip_prefix(&old_prefix) {
                Some(rest) => format!("{}{}", new_prefix, rest),
                None => active,
            });
        }
        Ok(())
    }

    /// Replaces the whole tree, e.g. on initial load. Resets open files.
    pub fn replace_tree(&mut self, tree: FolderNode) {
        self.tree = tree;
        self.open_files.clear();
        self.active = None;
    }
}

/// Replaces the last segment of a path.
fn replace_leaf(path: &str, new_leaf: &str) -> String {
    match path.rsplit_once('/') {
        Some((parent, _)) => format!("{}/{}", parent, new_leaf),
        None => new_leaf.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::FileNode;

    fn sample_session() -> SessionStore {
        SessionStore::new(FolderNode {
            name: "Root".to_string(),
            children: vec![
                Node::Folder(FolderNode {
                    name: "src".to_string(),
                    children: vec![
                        Node::File(FileNode::with_content("index", "js", "original")),
                        Node::File(FileNode::new("app", "css")),
                    ],
                }),
                Node::File(FileNode::with_content("package", "json", "{}")),
            ],
        })
    }

    #[test]
    fn open_file_seeds_buffer_and_sets_active() {
        let mut session = sample_session();

        session.open_file("src/index.js").unwrap();

        let open = session.active_file().unwrap();
        assert_eq!(open.file_id, "src/index.js");
        assert_eq!(open.content, "original");
        assert!(!open.has_unsaved_changes);
    }

    #[test]
    fn opening_same_file_twice_keeps_single_session() {
        let mut session = sample_session();

        session.open_file("src/index.js").unwrap();
        session.open_file("package.json").unwrap();
        session.open_file("src/index.js").unwrap();

        assert_eq!(session.open_files().len(), 2);
        assert_eq!(session.active_file_id().unwrap(), "src/index.js");
    }

    #[test]
    fn reopening_keeps_working_buffer() {
        let mut session = sample_session();
        session.open_file("src/index.js").unwrap();
        session.update_content("src/index.js", "edited").unwrap();

        session.open_file("src/index.js").unwrap();

        assert_eq!(session.active_file().unwrap().content, "edited");
        assert!(session.active_file().unwrap().has_unsaved_changes);
    }

    #[test]
    fn open_folder_fails() {
        let mut session = sample_session();
        let err = session.open_file("src").unwrap_err();
        assert!(matches!(err, Error::TargetIsFolder { .. }));
    }

    #[test]
    fn update_content_always_marks_dirty() {
        let mut session = sample_session();
        session.open_file("src/index.js").unwrap();

        // Byte-identical write still dirties.
        session.update_content("src/index.js", "original").unwrap();

        assert!(session.active_file().unwrap().has_unsaved_changes);
    }

    #[test]
    fn update_content_of_unopened_file_fails() {
        let mut session = sample_session();
        let err = session.update_content("src/index.js", "x").unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn save_file_persists_buffer_and_clears_dirty() {
        let mut session = sample_session();
        session.open_file("src/index.js").unwrap();
        session.update_content("src/index.js", "saved body").unwrap();

        session.save_file("src/index.js").unwrap();

        assert!(!session.active_file().unwrap().has_unsaved_changes);
        match tree::find_node(session.tree(), "src/index.js").unwrap() {
            Node::File(file) => assert_eq!(file.content, "saved body"),
            _ => panic!("expected file"),
        }
    }

    #[test]
    fn save_all_clears_every_dirty_flag() {
        let mut session = sample_session();
        session.open_file("src/index.js").unwrap();
        session.open_file("src/app.css").unwrap();
        session.update_content("src/index.js", "a").unwrap();
        session.update_content("src/app.css", "b").unwrap();

        session.save_all().unwrap();

        assert!(!session.has_unsaved_changes());
        match tree::find_node(session.tree(), "src/app.css").unwrap() {
            Node::File(file) => assert_eq!(file.content, "b"),
            _ => panic!("expected file"),
        }
    }

    #[test]
    fn close_file_falls_back_to_most_recently_opened() {
        let mut session = sample_session();
        session.open_file("src/index.js").unwrap();
        session.open_file("src/app.css").unwrap();
        session.open_file("package.json").unwrap();

        session.close_file("package.json");

        assert_eq!(session.active_file_id().unwrap(), "src/app.css");

        session.close_file("src/index.js");
        assert_eq!(session.active_file_id().unwrap(), "src/app.css");
    }

    #[test]
    fn close_all_discards_unsaved_buffers_but_not_saved_content() {
        let mut session = sample_session();
        session.open_file("src/index.js").unwrap();
        session.update_content("src/index.js", "saved").unwrap();
        session.save_file("src/index.js").unwrap();
        session.update_content("src/index.js", "never saved").unwrap();

        session.close_all();

        assert!(session.open_files().is_empty());
        assert!(session.active_file_id().is_none());
        // The documented data-loss edge case: only the saved content survives.
        match tree::find_node(session.tree(), "src/index.js").unwrap() {
            Node::File(file) => assert_eq!(file.content, "saved"),
            _ => panic!("expected file"),
        }
    }

    #[test]
    fn add_file_rejects_duplicates_via_tree() {
        let mut session = sample_session();
        let err = session.add_file("src", "index", "js").unwrap_err();
        assert!(matches!(err, Error::DuplicateSibling { .. }));
    }

    #[test]
    fn delete_file_closes_its_tab() {
        let mut session = sample_session();
        session.open_file("src/index.js").unwrap();
        session.open_file("src/app.css").unwrap();

        session.delete_file("src/index.js").unwrap();

        assert_eq!(session.open_files().len(), 1);
        assert_eq!(session.active_file_id().unwrap(), "src/app.css");
        assert!(tree::find_node(session.tree(), "src/index.js").is_none());
    }

    #[test]
    fn delete_folder_closes_tabs_underneath() {
        let mut session = sample_session();
        session.open_file("src/index.js").unwrap();
        session.open_file("package.json").unwrap();
        session.open_file("src/app.css").unwrap();

        session.delete_folder("src").unwrap();

        assert_eq!(session.open_files().len(), 1);
        assert_eq!(session.open_files()[0].file_id, "package.json");
        assert_eq!(session.active_file_id().unwrap(), "package.json");
    }

    #[test]
    fn rename_file_updates_tab_identity_without_dirtying() {
        let mut session = sample_session();
        session.open_file("src/index.js").unwrap();
        session.update_content("src/index.js", "edited").unwrap();

        session.rename_file("src/index.js", "main", None).unwrap();

        let open = session.active_file().unwrap();
        assert_eq!(open.file_id, "src/main.js");
        assert_eq!(open.content, "edited");
        assert!(open.has_unsaved_changes);
    }

    #[test]
    fn rename_keeps_tab_identity_for_dotted_extensionless_file() {
        let mut session = SessionStore::new(FolderNode {
            name: "Root".to_string(),
            children: vec![Node::File(FileNode::with_content("v1.2", "", "notes"))],
        });
        session.open_file("v1.2").unwrap();
        session.update_content("v1.2", "edited").unwrap();

        session.rename_file("v1.2", "v2", None).unwrap();

        let open = session.active_file().unwrap();
        assert_eq!(open.file_id, "v2");
        session.save_file("v2").unwrap();
        assert!(!session.has_unsaved_changes());
    }

    #[test]
    fn rename_folder_rewrites_open_file_prefixes() {
        let mut session = sample_session();
        session.open_file("src/index.js").unwrap();

        session.rename_folder("src", "lib").unwrap();

        assert_eq!(session.open_files()[0].file_id, "lib/index.js");
        assert_eq!(session.active_file_id().unwrap(), "lib/index.js");
        assert!(!session.open_files()[0].has_unsaved_changes);
    }

    #[test]
    fn rename_failure_leaves_session_untouched() {
        let mut session = sample_session();
        session.open_file("src/index.js").unwrap();

        let err = session
            .rename_file("src/index.js", "app", Some("css"))
            .unwrap_err();

        assert!(matches!(err, Error::DuplicateSibling { .. }));
        assert_eq!(session.open_files()[0].file_id, "src/index.js");
        assert!(tree::find_node(session.tree(), "src/index.js").is_some());
    }

    #[test]
    fn replace_tree_resets_open_files() {
        let mut session = sample_session();
        session.open_file("src/index.js").unwrap();

        session.replace_tree(FolderNode::new("Root"));

        assert!(session.open_files().is_empty());
        assert!(session.active_file_id().is_none());
    }

    #[test]
    fn switching_playground_id_resets_session() {
        let mut session = sample_session();
        session.set_playground_id("pg-1");
        session.open_file("src/index.js").unwrap();

        session.set_playground_id("pg-1");
        assert_eq!(session.open_files().len(), 1);

        session.set_playground_id("pg-2");
        assert!(session.open_files().is_empty());
        assert!(session.active_file_id().is_none());
    }
}

//! Folder/file nodes and pure structural operations.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A node in the project tree: either a file or a folder.
///
/// Serialization is untagged so the JSON wire shape is the flat
/// `folderName`/`items` vs `filename`/`fileExtension` form stored by the
/// persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Folder(FolderNode),
    File(FileNode),
}

/// A file with mutable text content.
///
/// Identity within a parent is `(name, extension)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileNode {
    #[serde(rename = "filename")]
    pub name: String,
    #[serde(rename = "fileExtension", default)]
    pub extension: String,
    #[serde(default)]
    pub content: String,
}

/// A folder holding an ordered sequence of child nodes.
///
/// Order is insertion order and is display-significant; children are never
/// sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderNode {
    #[serde(rename = "folderName")]
    pub name: String,
    #[serde(rename = "items", default)]
    pub children: Vec<Node>,
}

impl FileNode {
    /// Creates an empty file.
    pub fn new(name: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extension: extension.into(),
            content: String::new(),
        }
    }

    /// Creates a file with initial content.
    pub fn with_content(
        name: impl Into<String>,
        extension: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            extension: extension.into(),
            content: content.into(),
        }
    }

    /// The name as displayed and used in paths; `name.extension`, or bare
    /// `name` for extensionless files such as `Dockerfile`.
    pub fn display_name(&self) -> String {
        if self.extension.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.name, self.extension)
        }
    }
}

impl FolderNode {
    /// Creates an empty folder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Looks up a direct child by display name.
    pub fn child(&self, display_name: &str) -> Option<&Node> {
        self.children
            .iter()
            .find(|c| c.display_name() == display_name)
    }

    fn child_index(&self, display_name: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|c| c.display_name() == display_name)
    }
}

impl Node {
    /// The path segment this node occupies within its parent.
    pub fn display_name(&self) -> String {
        match self {
            Node::Folder(folder) => folder.name.clone(),
            Node::File(file) => file.display_name(),
        }
    }

    /// Returns true if this node is a file.
    pub fn is_file(&self) -> bool {
        matches!(self, Node::File(_))
    }
}

/// Splits a path into `(parent_path, leaf_segment)`.
///
/// Fails with `NotFound` on an empty path; the root folder itself is not
/// addressable.
fn split_parent(path: &str) -> Result<(&str, &str)> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Err(Error::NotFound {
            path: path.to_string(),
        });
    }
    match trimmed.rsplit_once('/') {
        Some((parent, leaf)) => Ok((parent, leaf)),
        None => Ok(("", trimmed)),
    }
}

/// Resolves a folder by path within a mutable tree.
///
/// An empty path resolves to the root itself.
fn resolve_folder_mut<'a>(root: &'a mut FolderNode, path: &str) -> Result<&'a mut FolderNode> {
    let mut current = root;
    let mut walked = String::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if !walked.is_empty() {
            walked.push('/');
        }
        walked.push_str(segment);
        let idx = current
            .child_index(segment)
            .ok_or_else(|| Error::NotFound {
                path: walked.clone(),
            })?;
        current = match &mut current.children[idx] {
            Node::Folder(folder) => folder,
            Node::File(_) => {
                return Err(Error::ParentNotFolder {
                    path: walked.clone(),
                })
            }
        };
    }
    Ok(current)
}

/// Locates a node by its `/`-joined path. Returns `None` when any segment
/// is missing or an intermediate segment is a file.
pub fn find_node<'a>(root: &'a FolderNode, path: &str) -> Option<&'a Node> {
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let mut current = root.child(segments.next()?)?;
    for segment in segments {
        current = match current {
            Node::Folder(folder) => folder.child(segment)?,
            Node::File(_) => return None,
        };
    }
    Some(current)
}

/// Inserts `node` under the folder at `parent_path`, returning the new tree.
///
/// Fails with `DuplicateSibling` when the display name collides with an
/// existing child, `ParentNotFolder` when `parent_path` resolves to a file,
/// and `NotFound` when the parent path is missing.
pub fn insert(root: &FolderNode, parent_path: &str, node: Node) -> Result<FolderNode> {
    let mut tree = root.clone();
    let parent = resolve_folder_mut(&mut tree, parent_path)?;
    let display = node.display_name();
    if parent.child(&display).is_some() {
        return Err(Error::DuplicateSibling {
            path: join_path(parent_path, &display),
        });
    }
    parent.children.push(node);
    Ok(tree)
}

/// Renames the node at `path`, returning the new tree.
///
/// For files, `new_extension` replaces the extension when given and keeps
/// the existing one otherwise; it is ignored for folders.
pub fn rename(
    root: &FolderNode,
    path: &str,
    new_name: &str,
    new_extension: Option<&str>,
) -> Result<FolderNode> {
    let (parent_path, leaf) = split_parent(path)?;
    let mut tree = root.clone();
    let parent = resolve_folder_mut(&mut tree, parent_path).map_err(not_found_on_file(path))?;
    let idx = parent.child_index(leaf).ok_or_else(|| Error::NotFound {
        path: path.to_string(),
    })?;

    let renamed = match &parent.children[idx] {
        Node::Folder(folder) => Node::Folder(FolderNode {
            name: new_name.to_string(),
            children: folder.children.clone(),
        }),
        Node::File(file) => Node::File(FileNode {
            name: new_name.to_string(),
            extension: new_extension.unwrap_or(&file.extension).to_string(),
            content: file.content.clone(),
        }),
    };

    let display = renamed.display_name();
    if parent
        .children
        .iter()
        .enumerate()
        .any(|(i, c)| i != idx && c.display_name() == display)
    {
        return Err(Error::DuplicateSibling {
            path: join_path(parent_path, &display),
        });
    }

    parent.children[idx] = renamed;
    Ok(tree)
}

/// Removes the node at `path`, returning the new tree.
///
/// Removing a folder removes its entire subtree.
pub fn remove(root: &FolderNode, path: &str) -> Result<FolderNode> {
    let (parent_path, leaf) = split_parent(path)?;
    let mut tree = root.clone();
    let parent = resolve_folder_mut(&mut tree, parent_path).map_err(not_found_on_file(path))?;
    let idx = parent.child_index(leaf).ok_or_else(|| Error::NotFound {
        path: path.to_string(),
    })?;
    parent.children.remove(idx);
    Ok(tree)
}

/// Replaces the content of the file at `path`, returning the new tree.
pub fn set_content(root: &FolderNode, path: &str, content: &str) -> Result<FolderNode> {
    let (parent_path, leaf) = split_parent(path)?;
    let mut tree = root.clone();
    let parent = resolve_folder_mut(&mut tree, parent_path).map_err(not_found_on_file(path))?;
    let idx = parent.child_index(leaf).ok_or_else(|| Error::NotFound {
        path: path.to_string(),
    })?;
    match &mut parent.children[idx] {
        Node::File(file) => {
            file.content = content.to_string();
            Ok(tree)
        }
        Node::Folder(_) => Err(Error::TargetIsFolder {
            path: path.to_string(),
        }),
    }
}

/// Joins a parent path and a leaf segment.
pub(crate) fn join_path(parent: &str, leaf: &str) -> String {
    if parent.is_empty() {
        leaf.to_string()
    } else {
        format!("{}/{}", parent, leaf)
    }
}

// Operations whose contract only names NotFound report an intermediate file
// segment as the missing target path, not as ParentNotFolder.
fn not_found_on_file(path: &str) -> impl FnOnce(Error) -> Error + '_ {
    move |err| match err {
        Error::ParentNotFolder { .. } => Error::NotFound {
            path: path.to_string(),
        },
        other => other,
    }
}

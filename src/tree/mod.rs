//! Virtual project tree.
//!
//! This module provides the recursive folder/file model behind an editing
//! session, with pure structural operations that return a new tree on
//! success and leave the input untouched on failure.

mod node;
mod walk;

pub use node::{find_node, insert, remove, rename, set_content, FileNode, FolderNode, Node};
pub use walk::{walk, Walk, WalkEntry};

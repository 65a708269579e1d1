//! Depth-first traversal for rendering.

use super::node::{FolderNode, Node};

/// One step of a depth-first traversal.
#[derive(Debug)]
pub struct WalkEntry<'a> {
    /// The visited node.
    pub node: &'a Node,
    /// Depth below the root; direct children of the root are depth 0.
    pub depth: usize,
    /// Full `/`-joined path of the node.
    pub path: String,
}

/// Lazy depth-first iterator over a tree.
///
/// Stateless with respect to the tree: restart by calling [`walk`] again.
pub struct Walk<'a> {
    stack: Vec<(&'a Node, usize, String)>,
}

/// Walks the tree depth-first in insertion order, yielding
/// `(node, depth, path)` for every node below the root.
pub fn walk(root: &FolderNode) -> Walk<'_> {
    let mut stack = Vec::with_capacity(root.children.len());
    for child in root.children.iter().rev() {
        stack.push((child, 0, child.display_name()));
    }
    Walk { stack }
}

impl<'a> Iterator for Walk<'a> {
    type Item = WalkEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (node, depth, path) = self.stack.pop()?;
        if let Node::Folder(folder) = node {
            for child in folder.children.iter().rev() {
                let child_path = format!("{}/{}", path, child.display_name());
                self.stack.push((child, depth + 1, child_path));
            }
        }
        Some(WalkEntry { node, depth, path })
    }
}

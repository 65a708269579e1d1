//! Tree-to-mount-format transformer.
//!
//! The sandbox mount API takes a flat path→content map; directory creation
//! is the mount primitive's responsibility, derived from path prefixes, so
//! folders themselves contribute no entries.

use std::collections::BTreeMap;

use crate::tree::{FolderNode, Node};

/// Flattens a tree into the path→content map the mount primitive expects.
///
/// Pure and infallible; empty folders vanish from the map (their paths are
/// recreated on demand by whoever writes below them).
pub fn flatten(root: &FolderNode) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    for child in &root.children {
        flatten_into(child, "", &mut files);
    }
    files
}

fn flatten_into(node: &Node, prefix: &str, files: &mut BTreeMap<String, String>) {
    match node {
        Node::File(file) => {
            let path = join(prefix, &file.display_name());
            files.insert(path, file.content.clone());
        }
        Node::Folder(folder) => {
            let path = join(prefix, &folder.name);
            for child in &folder.children {
                flatten_into(child, &path, files);
            }
        }
    }
}

fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}/{}", prefix, segment)
    }
}

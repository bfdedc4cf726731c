use crate::file_scanner::FileNode;
use std::collections::HashMap;
use std::path::PathBuf;

/// One visible row of a flattened tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTreeItem {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
    pub level: usize,
    pub expanded: bool,
    pub selected: bool,
}

/// Pre-order walk of `node` and every expanded descendant.
///
/// A directory's children are only emitted when `expanded` maps its path to
/// `true`. `selected` is left `false`; the caller owns selection.
pub fn flatten_tree(
    node: &FileNode,
    level: usize,
    expanded: &HashMap<PathBuf, bool>,
) -> Vec<FileTreeItem> {
    let mut items = Vec::new();
    flatten_into(node, level, expanded, &mut items);
    items
}

/// Same walk, but starting from the children of `root` at level zero.
pub fn flatten_children(root: &FileNode, expanded: &HashMap<PathBuf, bool>) -> Vec<FileTreeItem> {
    root.children
        .iter()
        .flat_map(|child| flatten_tree(child, 0, expanded))
        .collect()
}

fn flatten_into(
    node: &FileNode,
    level: usize,
    expanded: &HashMap<PathBuf, bool>,
    out: &mut Vec<FileTreeItem>,
) {
    let is_expanded = node.is_dir && expanded.get(&node.path).copied().unwrap_or(false);
    out.push(FileTreeItem {
        name: node.name.clone(),
        path: node.path.clone(),
        is_dir: node.is_dir,
        level,
        expanded: is_expanded,
        selected: false,
    });
    if is_expanded {
        for child in &node.children {
            flatten_into(child, level + 1, expanded, out);
        }
    }
}

/// Marks every directory under `root`, root included, as expanded.
pub fn expand_all(root: &FileNode) -> HashMap<PathBuf, bool> {
    let mut expanded = HashMap::new();
    let mut pending = vec![root];
    while let Some(node) = pending.pop() {
        if node.is_dir {
            expanded.insert(node.path.clone(), true);
            pending.extend(node.children.iter());
        }
    }
    expanded
}

/// Plain-text outline: two spaces per level, `- ` marker, `/` after directories.
pub fn render_tree_text(items: &[FileTreeItem]) -> String {
    let mut out = String::new();
    for item in items {
        out.push_str(&"  ".repeat(item.level));
        out.push_str("- ");
        out.push_str(&item.name);
        if item.is_dir {
            out.push('/');
        }
        out.push('\n');
    }
    out
}

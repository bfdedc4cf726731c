use crate::error::{PrompterError, Result};
use crate::gitignore::GitignoreMatcher;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Names hidden from the interactive tree even without a `.gitignore`.
const EXCLUDED_NAMES: &[&str] = &[
    "node_modules",
    "vendor",
    "target",
    "build",
    "dist",
    "__pycache__",
    "Thumbs.db",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
    pub children: Vec<FileNode>,
}

impl FileNode {
    fn new(path: &Path, is_dir: bool) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            path: path.to_path_buf(),
            is_dir,
            children: Vec::new(),
        }
    }

    /// Count of every node below this one.
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| 1 + child.descendant_count())
            .sum()
    }
}

/// Decides which directory entries the scan skips. Excluded directories are
/// not descended into.
pub trait EntryFilter {
    fn is_excluded(&self, path: &Path, name: &str, is_dir: bool) -> bool;
}

/// Dot-prefixed names plus a fixed list of build and dependency folders.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExclusions;

impl EntryFilter for DefaultExclusions {
    fn is_excluded(&self, _path: &Path, name: &str, _is_dir: bool) -> bool {
        name.starts_with('.') || EXCLUDED_NAMES.contains(&name)
    }
}

impl EntryFilter for GitignoreMatcher {
    fn is_excluded(&self, path: &Path, _name: &str, is_dir: bool) -> bool {
        self.should_ignore(path, is_dir)
    }
}

pub fn scan_directory(root: &Path) -> Result<FileNode> {
    scan_directory_with(root, &DefaultExclusions)
}

/// Builds the tree under `root`, children sorted by name.
///
/// Only a failure on `root` itself is an error. Entries that cannot be
/// stat'ed or listed are logged and left out of the result.
pub fn scan_directory_with(root: &Path, filter: &dyn EntryFilter) -> Result<FileNode> {
    let metadata = fs::metadata(root).map_err(|err| PrompterError::from_io(err, root))?;
    if !metadata.is_dir() {
        return Ok(FileNode::new(root, false));
    }
    fs::read_dir(root).map_err(|err| PrompterError::from_io(err, root))?;

    // Open directories from the root down to the parent of the next entry.
    let mut stack = vec![FileNode::new(root, true)];

    let walker = WalkDir::new(root)
        .follow_links(true)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !filter.is_excluded(entry.path(), &name, entry.file_type().is_dir())
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let failed = err.path().map(Path::to_path_buf);
                warn!(
                    error = %err,
                    "{}",
                    PrompterError::PartialScanFailure(failed.clone().unwrap_or_default())
                );
                // A directory that could not be listed was already opened; drop it.
                let opened =
                    stack.len() > 1 && stack.last().map(|node| &node.path) == failed.as_ref();
                if opened {
                    stack.pop();
                }
                continue;
            }
        };

        close_until(&mut stack, entry.depth());
        let node = FileNode::new(entry.path(), entry.file_type().is_dir());
        if node.is_dir {
            stack.push(node);
        } else if let Some(parent) = stack.last_mut() {
            parent.children.push(node);
        }
    }

    close_until(&mut stack, 1);
    stack
        .pop()
        .ok_or_else(|| PrompterError::PartialScanFailure(root.to_path_buf()))
}

/// Pops finished directories into their parents until `depth` entries remain.
fn close_until(stack: &mut Vec<FileNode>, depth: usize) {
    while stack.len() > depth.max(1) {
        if let Some(done) = stack.pop() {
            if let Some(parent) = stack.last_mut() {
                parent.children.push(done);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(node: &FileNode) -> Vec<&str> {
        node.children.iter().map(|c| c.name.as_str()).collect()
    }

    fn workspace() -> TempDir {
        let dir = TempDir::new().expect("tempdir");
        fs::create_dir_all(dir.path().join("src/nested")).expect("mkdir");
        fs::create_dir_all(dir.path().join("node_modules/pkg")).expect("mkdir");
        fs::create_dir_all(dir.path().join(".git")).expect("mkdir");
        fs::write(dir.path().join("src/main.rs"), "fn main() {}").expect("write");
        fs::write(dir.path().join("src/nested/deep.rs"), "").expect("write");
        fs::write(dir.path().join("b.txt"), "b").expect("write");
        fs::write(dir.path().join("a.txt"), "a").expect("write");
        fs::write(dir.path().join(".env"), "SECRET=1").expect("write");
        fs::write(dir.path().join("node_modules/pkg/index.js"), "").expect("write");
        dir
    }

    #[test]
    fn test_scan_sorts_children_and_applies_default_exclusions() {
        // Arrange
        let dir = workspace();

        // Act
        let root = scan_directory(dir.path()).expect("scan");

        // Assert
        assert!(root.is_dir);
        assert_eq!(names(&root), vec!["a.txt", "b.txt", "src"]);
        let src = &root.children[2];
        assert_eq!(names(src), vec!["main.rs", "nested"]);
        assert_eq!(names(&src.children[1]), vec!["deep.rs"]);
        assert_eq!(root.descendant_count(), 6);
    }

    #[test]
    fn test_scan_paths_are_joined_under_root() {
        // Arrange
        let dir = workspace();

        // Act
        let root = scan_directory(dir.path()).expect("scan");

        // Assert
        let deep = &root.children[2].children[1].children[0];
        assert_eq!(deep.path, dir.path().join("src/nested/deep.rs"));
        assert!(!deep.is_dir);
    }

    #[test]
    fn test_scan_with_gitignore_matcher() {
        // Arrange
        let dir = workspace();
        let matcher = GitignoreMatcher::with_patterns(dir.path(), ["src/", "b.txt"]);

        // Act
        let root = scan_directory_with(dir.path(), &matcher).expect("scan");

        // Assert
        assert_eq!(names(&root), vec![".env", ".git", "a.txt", "node_modules"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_broken_entry_is_skipped_without_failing_scan() {
        // Arrange
        let dir = workspace();
        std::os::unix::fs::symlink(dir.path().join("missing"), dir.path().join("dangling"))
            .expect("symlink");

        // Act
        let root = scan_directory(dir.path()).expect("scan");

        // Assert
        assert_eq!(names(&root), vec!["a.txt", "b.txt", "src"]);
        assert_eq!(root.descendant_count(), 6);
    }

    #[test]
    fn test_scan_missing_root_is_not_found() {
        // Arrange
        let dir = TempDir::new().expect("tempdir");
        let missing = dir.path().join("nope");

        // Act
        let result = scan_directory(&missing);

        // Assert
        assert!(matches!(result, Err(PrompterError::NotFound(_))));
    }

    #[test]
    fn test_scan_of_file_root_returns_leaf() {
        // Arrange
        let dir = workspace();

        // Act
        let node = scan_directory(&dir.path().join("a.txt")).expect("scan");

        // Assert
        assert_eq!(node.name, "a.txt");
        assert!(!node.is_dir);
        assert!(node.children.is_empty());
    }

    #[test]
    fn test_scan_empty_directory() {
        // Arrange
        let dir = TempDir::new().expect("tempdir");

        // Act
        let node = scan_directory(dir.path()).expect("scan");

        // Assert
        assert!(node.is_dir);
        assert!(node.children.is_empty());
    }
}

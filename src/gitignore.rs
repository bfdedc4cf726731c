use crate::error::{PrompterError, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

pub const GITIGNORE_FILE: &str = ".gitignore";

/// Used whenever a workspace has no `.gitignore`, or one with nothing usable in it.
pub const DEFAULT_PATTERNS: &[&str] = &[
    ".git/",
    ".svn/",
    ".hg/",
    "node_modules/",
    "vendor/",
    "target/",
    "build/",
    "dist/",
    "__pycache__/",
    ".DS_Store",
    "Thumbs.db",
    "*.tmp",
    "*.log",
];

/// One parsed `.gitignore` line.
#[derive(Debug, Clone)]
pub struct GitignorePattern {
    pub pattern: String,
    pub is_negation: bool,
    pub is_dir_only: bool,
    regex: Regex,
}

impl GitignorePattern {
    /// Returns `None` for blanks, comments, and lines that compile to nothing.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let (is_negation, rest) = match line.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, line),
        };
        let (is_dir_only, rest) = match rest.strip_suffix('/') {
            Some(rest) => (true, rest),
            None => (false, rest),
        };
        if rest.is_empty() || rest == "/" {
            return None;
        }

        let regex = Regex::new(&glob_to_regex(rest)).ok()?;
        Some(Self {
            pattern: line.to_string(),
            is_negation,
            is_dir_only,
            regex,
        })
    }

    pub fn matches(&self, relative: &str) -> bool {
        self.regex.is_match(relative)
    }
}

/// Translates the supported glob subset into an anchored regex.
///
/// `**` crosses separators, `*` and `?` stay within one segment. A leading
/// `/` pins the match to the workspace root, otherwise any segment boundary
/// works. The trailing group lets a directory match cascade to its contents.
fn glob_to_regex(glob: &str) -> String {
    let escaped = regex::escape(glob)
        .replace(r"\*\*", ".*")
        .replace(r"\*", "[^/]*")
        .replace(r"\?", "[^/]");

    let anchored = match escaped.strip_prefix('/') {
        Some(rest) => format!("^{rest}"),
        None => format!("(^|/){escaped}"),
    };
    format!("{anchored}(/.*)?$")
}

/// Ordered pattern list for one workspace root. Later patterns win.
#[derive(Debug, Clone)]
pub struct GitignoreMatcher {
    root: PathBuf,
    patterns: Vec<GitignorePattern>,
    using_defaults: bool,
}

impl GitignoreMatcher {
    /// Loads `<root>/.gitignore`, falling back to [`DEFAULT_PATTERNS`] when the
    /// file is absent or yields no usable pattern.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let path = root.join(GITIGNORE_FILE);
        let lines = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(err) => return Err(PrompterError::from_io(err, &path)),
        };

        let patterns: Vec<GitignorePattern> =
            lines.lines().filter_map(GitignorePattern::parse).collect();
        if patterns.is_empty() {
            tracing::debug!(root = %root.display(), "no usable .gitignore, using default patterns");
            return Ok(Self::with_patterns(root, DEFAULT_PATTERNS.iter().copied()).into_defaults());
        }

        Ok(Self {
            root,
            patterns,
            using_defaults: false,
        })
    }

    /// Builds a matcher from explicit lines, without any default fallback.
    pub fn with_patterns<'a>(
        root: impl Into<PathBuf>,
        lines: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            root: root.into(),
            patterns: lines.into_iter().filter_map(GitignorePattern::parse).collect(),
            using_defaults: false,
        }
    }

    fn into_defaults(mut self) -> Self {
        self.using_defaults = true;
        self
    }

    pub fn patterns(&self) -> &[GitignorePattern] {
        &self.patterns
    }

    pub fn is_using_defaults(&self) -> bool {
        self.using_defaults
    }

    /// Decides whether `path` is ignored. The root itself never is.
    ///
    /// Every pattern is evaluated in order and the last match decides.
    /// Directory-only patterns are matched like any other, so `build/` also
    /// hides a plain file named `build`.
    pub fn should_ignore(&self, path: &Path, _is_dir: bool) -> bool {
        let relative = self.relative_path(path);
        if relative.is_empty() || relative == "." {
            return false;
        }

        let mut ignored = false;
        for pattern in self.patterns.iter().filter(|p| p.matches(&relative)) {
            ignored = !pattern.is_negation;
        }
        ignored
    }

    fn relative_path(&self, path: &Path) -> String {
        let relative = if path.is_relative() {
            path
        } else {
            match path.strip_prefix(&self.root) {
                Ok(rel) => rel,
                Err(_) => path.file_name().map(Path::new).unwrap_or(path),
            }
        };
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn matcher(lines: &[&str]) -> GitignoreMatcher {
        GitignoreMatcher::with_patterns("/ws", lines.iter().copied())
    }

    #[test]
    fn test_parse_skips_blank_and_comment_lines() {
        // Arrange
        let lines = ["", "   ", "# comment", "*.log"];

        // Act
        let parsed: Vec<_> = lines.iter().filter_map(|l| GitignorePattern::parse(l)).collect();

        // Assert
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].pattern, "*.log");
    }

    #[test]
    fn test_parse_records_negation_and_directory_flags() {
        // Arrange / Act
        let negated = GitignorePattern::parse("!important.log").expect("pattern");
        let dir_only = GitignorePattern::parse("build/").expect("pattern");

        // Assert
        assert!(negated.is_negation);
        assert!(!negated.is_dir_only);
        assert!(dir_only.is_dir_only);
        assert!(!dir_only.is_negation);
    }

    #[test]
    fn test_star_matches_within_one_segment() {
        // Arrange
        let matcher = matcher(&["*.log"]);

        // Act / Assert
        assert!(matcher.should_ignore(Path::new("/ws/app.log"), false));
        assert!(matcher.should_ignore(Path::new("/ws/logs/app.log"), false));
        assert!(!matcher.should_ignore(Path::new("/ws/app.txt"), false));
    }

    #[test]
    fn test_negation_overrides_earlier_match() {
        // Arrange
        let matcher = matcher(&["*.log", "!important.log"]);

        // Act / Assert
        assert!(matcher.should_ignore(Path::new("/ws/debug.log"), false));
        assert!(!matcher.should_ignore(Path::new("/ws/important.log"), false));
    }

    #[test]
    fn test_last_matching_pattern_wins() {
        // Arrange
        let matcher = matcher(&["!keep.txt", "*.txt"]);

        // Act / Assert
        assert!(matcher.should_ignore(Path::new("/ws/keep.txt"), false));
    }

    #[test]
    fn test_directory_pattern_cascades_to_contents() {
        // Arrange
        let matcher = matcher(&["build/"]);

        // Act / Assert
        assert!(matcher.should_ignore(Path::new("/ws/build"), true));
        assert!(matcher.should_ignore(Path::new("/ws/build/output.txt"), false));
        assert!(matcher.should_ignore(Path::new("/ws/src/build/deep/x.o"), false));
        assert!(!matcher.should_ignore(Path::new("/ws/builder.rs"), false));
    }

    #[test]
    fn test_directory_pattern_also_hides_plain_file_with_same_name() {
        // Arrange
        let matcher = matcher(&["build/", "*.d/"]);

        // Act / Assert
        assert!(matcher.should_ignore(Path::new("/ws/build"), false));
        assert!(matcher.should_ignore(Path::new("/ws/src/x.d"), false));
        assert!(!matcher.should_ignore(Path::new("/ws/x.dd"), false));
    }

    #[test]
    fn test_leading_slash_anchors_to_root() {
        // Arrange
        let matcher = matcher(&["/config.json"]);

        // Act / Assert
        assert!(matcher.should_ignore(Path::new("/ws/config.json"), false));
        assert!(!matcher.should_ignore(Path::new("/ws/sub/config.json"), false));
    }

    #[test]
    fn test_double_star_crosses_separators() {
        // Arrange
        let matcher = matcher(&["docs/**/*.md"]);

        // Act / Assert
        assert!(matcher.should_ignore(Path::new("/ws/docs/a/b/readme.md"), false));
        assert!(!matcher.should_ignore(Path::new("/ws/src/readme.md"), false));
    }

    #[test]
    fn test_question_mark_matches_single_character() {
        // Arrange
        let matcher = matcher(&["file?.txt"]);

        // Act / Assert
        assert!(matcher.should_ignore(Path::new("/ws/file1.txt"), false));
        assert!(!matcher.should_ignore(Path::new("/ws/file10.txt"), false));
    }

    #[test]
    fn test_root_is_never_ignored() {
        // Arrange
        let matcher = matcher(&["*", "**"]);

        // Act / Assert
        assert!(!matcher.should_ignore(Path::new("/ws"), true));
    }

    #[test]
    fn test_missing_gitignore_uses_defaults() {
        // Arrange
        let dir = TempDir::new().expect("tempdir");

        // Act
        let matcher = GitignoreMatcher::new(dir.path()).expect("matcher");

        // Assert
        assert!(matcher.is_using_defaults());
        assert_eq!(matcher.patterns().len(), DEFAULT_PATTERNS.len());
        assert!(matcher.should_ignore(&dir.path().join("node_modules"), true));
        assert!(matcher.should_ignore(&dir.path().join("server.log"), false));
        assert!(!matcher.should_ignore(&dir.path().join("main.rs"), false));
    }

    #[test]
    fn test_comment_only_gitignore_uses_defaults() {
        // Arrange
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join(GITIGNORE_FILE), "# nothing here\n\n").expect("write");

        // Act
        let matcher = GitignoreMatcher::new(dir.path()).expect("matcher");

        // Assert
        assert!(matcher.is_using_defaults());
    }

    #[test]
    fn test_gitignore_file_replaces_defaults() {
        // Arrange
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join(GITIGNORE_FILE), "secret.txt\n").expect("write");

        // Act
        let matcher = GitignoreMatcher::new(dir.path()).expect("matcher");

        // Assert
        assert!(!matcher.is_using_defaults());
        assert!(matcher.should_ignore(&dir.path().join("secret.txt"), false));
        assert!(!matcher.should_ignore(&dir.path().join("node_modules"), true));
    }
}

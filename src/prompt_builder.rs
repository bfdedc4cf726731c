use crate::error::{PrompterError, Result};
use crate::file_scanner::{DefaultExclusions, scan_directory_with};
use crate::gitignore::GitignoreMatcher;
use crate::persona::{DEFAULT_PERSONA, PersonaManager};
use crate::tree_builder::{expand_all, flatten_children, render_tree_text};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const FALLBACK_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Everything a prompt is assembled from.
pub struct PromptRequest<'a> {
    pub root: &'a Path,
    pub selection: &'a HashMap<PathBuf, bool>,
    pub user_prompt: &'a str,
    pub personas: &'a PersonaManager,
    pub active_personas: &'a [String],
}

/// Renders the `.gitignore`-filtered outline of the workspace. An unreadable
/// `.gitignore` falls back to the default name exclusions.
pub fn generate_file_tree(root: &Path) -> Result<String> {
    let tree = match GitignoreMatcher::new(root) {
        Ok(matcher) => {
            debug!(
                patterns = matcher.patterns().len(),
                defaults = matcher.is_using_defaults(),
                "gitignore loaded"
            );
            scan_directory_with(root, &matcher)?
        }
        Err(err) => {
            warn!(error = %err, "gitignore unusable, using default exclusions");
            scan_directory_with(root, &DefaultExclusions)?
        }
    };
    let items = flatten_children(&tree, &expand_all(&tree));
    Ok(render_tree_text(&items))
}

/// Assembles the XML prompt: tree, selected files in path order, one system
/// prompt per active persona, then the user's text.
pub fn build(request: &PromptRequest<'_>) -> Result<String> {
    let tree = generate_file_tree(request.root)?;

    let mut files: Vec<&PathBuf> = request
        .selection
        .iter()
        .filter(|(_, selected)| **selected)
        .map(|(path, _)| path)
        .collect();
    files.sort();

    let mut out = String::from("<prompt>\n");
    push_cdata_element(&mut out, "filetree", None, &tree);

    for path in files {
        let bytes = fs::read(path).map_err(|err| PrompterError::from_io(err, path))?;
        let content = String::from_utf8_lossy(&bytes);
        let name = relative_name(request.root, path);
        push_cdata_element(&mut out, "file", Some(("name", name.as_str())), &content);
    }

    let default_persona = [DEFAULT_PERSONA.to_string()];
    let active = if request.active_personas.is_empty() {
        &default_persona[..]
    } else {
        request.active_personas
    };
    for persona in active {
        let system = request.personas.read_content(persona).unwrap_or_else(|err| {
            debug!(
                persona = %persona,
                error = %err,
                "persona unreadable, using fallback system prompt"
            );
            FALLBACK_SYSTEM_PROMPT.to_string()
        });
        push_cdata_element(&mut out, "SystemPrompt", Some(("persona", persona.as_str())), &system);
    }

    push_cdata_element(&mut out, "UserPrompt", None, request.user_prompt);
    out.push_str("</prompt>");
    Ok(out)
}

fn relative_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn push_cdata_element(out: &mut String, tag: &str, attr: Option<(&str, &str)>, body: &str) {
    let _ = write!(out, "  <{tag}");
    if let Some((key, value)) = attr {
        let _ = write!(out, " {key}=\"{}\"", escape_attr(value));
    }
    let _ = writeln!(out, "><![CDATA[{}]]></{tag}>", escape_cdata(body));
}

/// A literal `]]>` would end the section early; split it across two.
fn escape_cdata(text: &str) -> String {
    text.replace("]]>", "]]]]><![CDATA[>")
}

fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gitignore::GITIGNORE_FILE;
    use tempfile::TempDir;

    fn workspace() -> TempDir {
        let dir = TempDir::new().expect("tempdir");
        fs::create_dir_all(dir.path().join("src")).expect("mkdir");
        fs::write(dir.path().join("src/lib.rs"), "pub fn hi() {}").expect("write");
        fs::write(dir.path().join("a.txt"), "alpha").expect("write");
        dir
    }

    #[test]
    fn test_generate_file_tree_respects_gitignore() {
        // Arrange
        let dir = TempDir::new().expect("tempdir");
        fs::create_dir_all(dir.path().join("subdir")).expect("mkdir");
        fs::write(dir.path().join("root-file.txt"), "r").expect("write");
        fs::write(dir.path().join("subdir/nested.txt"), "n").expect("write");
        fs::write(dir.path().join(".gitignore"), "subdir/\n").expect("write");

        // Act
        let tree = generate_file_tree(dir.path()).expect("tree");

        // Assert
        assert!(tree.lines().any(|line| line == "- root-file.txt"));
        assert!(!tree.contains("subdir"));
        assert!(!tree.contains("nested.txt"));
    }

    #[test]
    fn test_unreadable_gitignore_falls_back_to_default_exclusions() {
        // Arrange
        let dir = TempDir::new().expect("tempdir");
        fs::create_dir_all(dir.path().join(GITIGNORE_FILE)).expect("mkdir");
        fs::create_dir_all(dir.path().join("node_modules/pkg")).expect("mkdir");
        fs::write(dir.path().join("main.rs"), "fn main() {}").expect("write");

        // Act
        let tree = generate_file_tree(dir.path()).expect("tree");

        // Assert
        assert_eq!(tree, "- main.rs\n");
    }

    #[test]
    fn test_build_keeps_non_utf8_file_contents() {
        // Arrange
        let dir = workspace();
        let latin1 = dir.path().join("cafe.txt");
        fs::write(&latin1, [b'c', b'a', b'f', 0xE9]).expect("write");
        let personas = PersonaManager::new(dir.path());
        let selection = HashMap::from([(latin1, true)]);
        let request = PromptRequest {
            root: dir.path(),
            selection: &selection,
            user_prompt: "",
            personas: &personas,
            active_personas: &[],
        };

        // Act
        let xml = build(&request).expect("build");

        // Assert
        assert!(xml.contains("<file name=\"cafe.txt\"><![CDATA[caf\u{FFFD}]]></file>"));
    }

    #[test]
    fn test_build_includes_selected_files_in_path_order() {
        // Arrange
        let dir = workspace();
        let personas = PersonaManager::new(dir.path());
        let selection = HashMap::from([
            (dir.path().join("src/lib.rs"), true),
            (dir.path().join("a.txt"), true),
            (dir.path().join("unselected.txt"), false),
        ]);
        let request = PromptRequest {
            root: dir.path(),
            selection: &selection,
            user_prompt: "explain this",
            personas: &personas,
            active_personas: &[],
        };

        // Act
        let xml = build(&request).expect("build");

        // Assert
        assert!(xml.starts_with("<prompt>\n  <filetree><![CDATA["));
        let a = xml.find("<file name=\"a.txt\"><![CDATA[alpha]]></file>").expect("a.txt");
        let lib = xml.find("<file name=\"src/lib.rs\">").expect("lib.rs");
        assert!(a < lib);
        assert!(!xml.contains("unselected.txt\">"));
        assert!(xml.contains(&format!(
            "<SystemPrompt persona=\"default\"><![CDATA[{FALLBACK_SYSTEM_PROMPT}]]></SystemPrompt>"
        )));
        assert!(xml.contains("<UserPrompt><![CDATA[explain this]]></UserPrompt>"));
        assert!(xml.ends_with("</prompt>"));
    }

    #[test]
    fn test_build_emits_one_system_prompt_per_persona() {
        // Arrange
        let dir = workspace();
        fs::create_dir_all(dir.path().join("personas")).expect("mkdir");
        fs::write(dir.path().join("personas/reviewer.md"), "Review hard.").expect("write");
        let personas = PersonaManager::new(dir.path());
        let active = vec!["reviewer".to_string(), "missing".to_string()];
        let selection = HashMap::new();
        let request = PromptRequest {
            root: dir.path(),
            selection: &selection,
            user_prompt: "",
            personas: &personas,
            active_personas: &active,
        };

        // Act
        let xml = build(&request).expect("build");

        // Assert
        assert!(xml.contains(
            "<SystemPrompt persona=\"reviewer\"><![CDATA[Review hard.]]></SystemPrompt>"
        ));
        assert!(xml.contains(
            "<SystemPrompt persona=\"missing\"><![CDATA[You are a helpful AI assistant.]]>"
        ));
    }

    #[test]
    fn test_build_fails_when_selected_file_vanished() {
        // Arrange
        let dir = workspace();
        let personas = PersonaManager::new(dir.path());
        let gone = dir.path().join("gone.txt");
        let selection = HashMap::from([(gone.clone(), true)]);
        let request = PromptRequest {
            root: dir.path(),
            selection: &selection,
            user_prompt: "",
            personas: &personas,
            active_personas: &[],
        };

        // Act
        let result = build(&request);

        // Assert
        assert!(matches!(result, Err(PrompterError::NotFound(path)) if path == gone));
    }

    #[test]
    fn test_cdata_terminator_is_split() {
        // Arrange
        let mut out = String::new();

        // Act
        push_cdata_element(&mut out, "UserPrompt", None, "a]]>b");

        // Assert
        assert_eq!(out, "  <UserPrompt><![CDATA[a]]]]><![CDATA[>b]]></UserPrompt>\n");
    }

    #[test]
    fn test_attribute_values_are_escaped() {
        assert_eq!(escape_attr(r#"a&b<"c">"#), "a&amp;b&lt;&quot;c&quot;&gt;");
    }
}

use crate::error::{PrompterError, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const PERSONAS_DIR: &str = "personas";
pub const DEFAULT_PERSONA: &str = "default";
const PERSONA_EXT: &str = "md";

/// Personas are the `*.md` files in `<workspace>/personas`, named by file stem.
#[derive(Debug, Clone)]
pub struct PersonaManager {
    dir: PathBuf,
    personas: Vec<String>,
}

impl PersonaManager {
    pub fn new(root: &Path) -> Self {
        Self {
            dir: root.join(PERSONAS_DIR),
            personas: Vec::new(),
        }
    }

    /// Rescans the personas directory. On error the previous list is kept.
    pub fn discover(&mut self) -> Result<&[String]> {
        let entries =
            fs::read_dir(&self.dir).map_err(|err| PrompterError::from_io(err, &self.dir))?;

        let mut personas: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| path.extension().is_some_and(|ext| ext == PERSONA_EXT))
            .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        personas.sort();

        self.personas = personas;
        Ok(self.personas.as_slice())
    }

    pub fn available(&self) -> &[String] {
        &self.personas
    }

    pub fn persona_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{PERSONA_EXT}"))
    }

    pub fn read_content(&self, name: &str) -> Result<String> {
        let path = self.persona_path(name);
        fs::read_to_string(&path).map_err(|err| PrompterError::from_io(err, &path))
    }

    /// Keeps only known personas. When none survive, falls back to
    /// `default`, then to the first discovered persona, then to nothing.
    pub fn validate(&self, requested: &[String]) -> Vec<String> {
        let valid: Vec<String> = requested
            .iter()
            .filter(|name| self.personas.contains(*name))
            .cloned()
            .collect();
        if !valid.is_empty() {
            return valid;
        }
        if self.personas.iter().any(|p| p == DEFAULT_PERSONA) {
            return vec![DEFAULT_PERSONA.to_string()];
        }
        self.personas.first().cloned().into_iter().collect()
    }
}

/// Header line summarising the active personas.
pub fn persona_label(active: &[String]) -> String {
    match active {
        [] => format!("Persona: {DEFAULT_PERSONA}"),
        [single] => format!("Persona: {single}"),
        many => format!("Personas: {}", many.join(", ")),
    }
}

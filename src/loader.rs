use std::fs;
use std::path::PathBuf;

use crate::error::CompileError;

/// Reads template source text by name. Abstracted behind a trait so tests
/// can supply templates in-memory without touching the filesystem; the
/// driver CLI uses `FilesystemLoader` exclusively.
pub trait ResourceLoader {
    fn load(&self, name: &str) -> Result<String, CompileError>;
}

/// Resolves template and partial names against a root directory, appending
/// `.mustache` when the name carries no extension. Names are resolved one at
/// a time rather than by walking the whole directory up front, since partial
/// and parent references are only discovered as the tree is inlined.
pub struct FilesystemLoader {
    root: PathBuf,
}

impl FilesystemLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FilesystemLoader { root: root.into() }
    }

    fn resolve(&self, name: &str) -> PathBuf {
        let mut path = self.root.join(name);
        if path.extension().is_none() {
            path.set_extension("mustache");
        }
        path
    }
}

impl ResourceLoader for FilesystemLoader {
    fn load(&self, name: &str) -> Result<String, CompileError> {
        let path = self.resolve(name);
        fs::read_to_string(&path).map_err(|_| CompileError::ResourceNotFound {
            path: path.display().to_string(),
        })
    }
}

/// An in-memory loader for tests and for manifests that embed a template's
/// body directly rather than pointing at a file.
#[derive(Debug, Clone, Default)]
pub struct InlineLoader {
    templates: std::collections::HashMap<String, String>,
}

impl InlineLoader {
    pub fn new() -> Self {
        InlineLoader::default()
    }

    pub fn with(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.templates.insert(name.into(), source.into());
        self
    }
}

impl ResourceLoader for InlineLoader {
    fn load(&self, name: &str) -> Result<String, CompileError> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| CompileError::ResourceNotFound { path: name.to_string() })
    }
}

/// Rewrites a referenced partial/parent name per the manifest's path-mapping
/// rules: the first matching prefix is replaced, leaving unmatched names
/// untouched.
pub fn map_path(name: &str, rules: &[crate::annotation::PathMapping]) -> String {
    for rule in rules {
        if let Some(rest) = name.strip_prefix(rule.prefix.as_str()) {
            return format!("{}{}", rule.replacement, rest);
        }
    }
    name.to_string()
}

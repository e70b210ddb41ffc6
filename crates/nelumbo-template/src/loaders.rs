//! Template loaders.
//!
//! Template loaders are responsible for finding and reading template source files.
//! The [`TemplateLoader`] trait defines the interface, with built-in
//! implementations for filesystem and string-based loading. A template name is
//! resolved to `root/[subdirs/]name.ext`; a missing template is fatal for the
//! render that asked for it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use nelumbo_core::error::NelumboError;

/// Loads template source text by name.
///
/// Implementations resolve `name` below the optional `subdirs` path
/// components and return the file contents.
pub trait TemplateLoader: Send + Sync {
    /// Loads the template source with the given name.
    ///
    /// # Errors
    ///
    /// Returns `TemplateNotFound` if the template cannot be found.
    fn load(&self, name: &str, subdirs: &[String]) -> Result<String, NelumboError>;

    /// Loads a template and splits it into lines.
    ///
    /// # Errors
    ///
    /// Returns `TemplateNotFound` if the template cannot be found.
    fn load_lines(&self, name: &str, subdirs: &[String]) -> Result<Vec<String>, NelumboError> {
        self.load(name, subdirs).map(|source| split_lines(&source))
    }
}

/// Splits template source on newlines, dropping carriage returns.
pub fn split_lines(source: &str) -> Vec<String> {
    source.replace('\r', "").split('\n').map(str::to_string).collect()
}

/// Loads templates from a root directory on the filesystem.
pub struct FileSystemLoader {
    /// The template root directory.
    root: PathBuf,
    /// The extension appended to template names, without the dot.
    extension: String,
}

impl FileSystemLoader {
    /// Creates a new `FileSystemLoader` for `root`, appending `extension` to names.
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    /// Returns the template root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a template name to its path: `root/[subdirs/]name.ext`.
    pub fn resolve(&self, name: &str, subdirs: &[String]) -> PathBuf {
        let mut path = self.root.clone();
        for dir in subdirs {
            path.push(dir);
        }
        if self.extension.is_empty() {
            path.push(name);
        } else {
            path.push(format!("{name}.{}", self.extension));
        }
        path
    }
}

impl TemplateLoader for FileSystemLoader {
    fn load(&self, name: &str, subdirs: &[String]) -> Result<String, NelumboError> {
        let path = self.resolve(name, subdirs);
        if !path.is_file() {
            return Err(NelumboError::TemplateNotFound(format!(
                "Template \"{name}\" does not exist ({})",
                path.display()
            )));
        }

        std::fs::read_to_string(&path).map_err(|e| {
            NelumboError::TemplateNotFound(format!(
                "Error reading template '{}': {e}",
                path.display()
            ))
        })
    }
}

/// Loads templates from an in-memory map of name to source strings.
///
/// Templates below subdirectories are keyed by their slash-joined path, so
/// `("nav", ["includes"])` looks up `includes/nav`. This is useful for testing
/// and for applications that embed their templates.
pub struct StringLoader {
    templates: RwLock<HashMap<String, String>>,
}

impl StringLoader {
    /// Creates a new empty `StringLoader`.
    pub fn new() -> Self {
        Self {
            templates: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a `StringLoader` from a map of template keys to source strings.
    pub fn from_map(templates: HashMap<String, String>) -> Self {
        Self {
            templates: RwLock::new(templates),
        }
    }

    /// Adds or replaces a template.
    pub fn add(&self, key: impl Into<String>, source: impl Into<String>) {
        self.templates
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key.into(), source.into());
    }

    fn key(name: &str, subdirs: &[String]) -> String {
        subdirs
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(name))
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl Default for StringLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateLoader for StringLoader {
    fn load(&self, name: &str, subdirs: &[String]) -> Result<String, NelumboError> {
        let key = Self::key(name, subdirs);
        self.templates
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&key)
            .cloned()
            .ok_or_else(|| {
                NelumboError::TemplateNotFound(format!("Template \"{key}\" does not exist"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_lines_strips_carriage_returns() {
        assert_eq!(split_lines("a\r\nb\n\nc"), vec!["a", "b", "", "c"]);
        assert_eq!(split_lines(""), vec![""]);
    }

    #[test]
    fn test_string_loader_basic() {
        let loader = StringLoader::new();
        loader.add("hello", "Hello {{ name }}!");

        let source = loader.load("hello", &[]).unwrap();
        assert_eq!(source, "Hello {{ name }}!");
    }

    #[test]
    fn test_string_loader_subdirs() {
        let loader = StringLoader::new();
        loader.add("includes/nav", "NAV");

        assert_eq!(loader.load("nav", &["includes".to_string()]).unwrap(), "NAV");
        assert!(loader.load("nav", &[]).is_err());
    }

    #[test]
    fn test_string_loader_not_found() {
        let loader = StringLoader::new();
        let result = loader.load("missing", &[]);
        assert!(matches!(result, Err(NelumboError::TemplateNotFound(_))));
    }

    #[test]
    fn test_string_loader_from_map() {
        let mut map = HashMap::new();
        map.insert("a".to_string(), "content A".to_string());
        map.insert("b".to_string(), "content B".to_string());

        let loader = StringLoader::from_map(map);
        assert_eq!(loader.load("a", &[]).unwrap(), "content A");
        assert_eq!(loader.load_lines("b", &[]).unwrap(), vec!["content B"]);
    }

    #[test]
    fn test_filesystem_resolve() {
        let loader = FileSystemLoader::new("/srv/templates", "html");
        assert_eq!(
            loader.resolve("home", &[]),
            PathBuf::from("/srv/templates/home.html")
        );
        assert_eq!(
            loader.resolve("nav", &["includes".to_string(), "menus".to_string()]),
            PathBuf::from("/srv/templates/includes/menus/nav.html")
        );
    }

    #[test]
    fn test_filesystem_loader_not_found() {
        let loader = FileSystemLoader::new("/nonexistent/path", "html");
        let result = loader.load("missing", &[]);
        assert!(matches!(result, Err(NelumboError::TemplateNotFound(_))));
    }

    #[test]
    fn test_filesystem_loader_with_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("page.html"), "line one\r\nline two").unwrap();

        let loader = FileSystemLoader::new(dir.path(), "html");
        assert_eq!(loader.root(), dir.path());
        let lines = loader.load_lines("page", &[]).unwrap();
        assert_eq!(lines, vec!["line one", "line two"]);
    }
}

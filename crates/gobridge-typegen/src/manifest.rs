//! `go.mod` reading and project layout.
//!
//! The module path from `go.mod` is what turns an import path into a
//! directory inside the project.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Information from a go.mod file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoModule {
    /// Module path (e.g., "github.com/user/project")
    pub path: String,
    /// Go version (e.g., "1.21")
    pub go_version: Option<String>,
}

impl GoModule {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            go_version: None,
        }
    }

    /// Project-relative directory of an import path, or `None` when the
    /// import lives outside this module.
    pub fn relative_dir(&self, import_path: &str) -> Option<String> {
        let rest = import_path.strip_prefix(&self.path)?;
        if rest.is_empty() {
            return Some(String::new());
        }
        // "github.com/user/project2" is not inside "github.com/user/project"
        rest.strip_prefix('/').map(|r| r.trim_end_matches('/').to_string())
    }
}

/// Parse go.mod content string.
pub fn parse_go_mod_content(content: &str) -> Option<GoModule> {
    let mut module_path = None;
    let mut go_version = None;

    for line in content.lines() {
        let line = strip_comment(line).trim();

        if let Some(rest) = line.strip_prefix("module ") {
            module_path = Some(rest.trim().trim_matches('"').to_string());
        }

        if let Some(rest) = line.strip_prefix("go ") {
            go_version = Some(rest.trim().to_string());
        }
    }

    module_path.map(|path| GoModule { path, go_version })
}

fn strip_comment(line: &str) -> &str {
    line.split_once("//").map_or(line, |(code, _)| code)
}

/// Read and parse a go.mod file.
pub fn parse_go_mod(path: &Path) -> Result<GoModule> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::Manifest {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse_go_mod_content(&content).ok_or_else(|| Error::Manifest {
        path: path.to_path_buf(),
        message: "no module directive".to_string(),
    })
}

/// Nearest go.mod at or above a file or directory.
pub fn find_go_mod(start: &Path) -> Option<PathBuf> {
    let dir = if start.is_file() { start.parent()? } else { start };
    dir.ancestors()
        .map(|d| d.join("go.mod"))
        .find(|candidate| candidate.is_file())
}

/// Project root plus the module it declares.
///
/// Without a module every qualified type is treated as external.
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub module: Option<GoModule>,
}

impl Project {
    pub fn new(root: impl Into<PathBuf>, module: Option<GoModule>) -> Self {
        Self {
            root: root.into(),
            module,
        }
    }

    /// Load `<root>/go.mod`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let module = parse_go_mod(&root.join("go.mod"))?;
        tracing::debug!(root = %root.display(), module = %module.path, "opened project");
        Ok(Self {
            root,
            module: Some(module),
        })
    }

    /// Package key of a directory: its path relative to the root, with `/`
    /// separators. Directories outside the root keep their full path.
    pub fn package_key(&self, dir: &Path) -> String {
        let relative = dir.strip_prefix(&self.root).unwrap_or(dir);
        relative
            .components()
            .filter_map(|c| match c {
                std::path::Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Directory of a package key.
    pub fn package_dir(&self, key: &str) -> PathBuf {
        if key.is_empty() {
            self.root.clone()
        } else {
            self.root.join(key)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_go_mod() {
        let content = r#"
module github.com/user/project // main module

go 1.21

require (
    github.com/pkg/errors v0.9.1
    golang.org/x/sync v0.3.0
)
"#;
        let module = parse_go_mod_content(content).unwrap();
        assert_eq!(module.path, "github.com/user/project");
        assert_eq!(module.go_version, Some("1.21".to_string()));
    }

    #[test]
    fn test_missing_module_directive() {
        assert!(parse_go_mod_content("go 1.22\n").is_none());
    }

    #[test]
    fn test_relative_dir() {
        let module = GoModule::new("github.com/user/project");
        assert_eq!(
            module.relative_dir("github.com/user/project/pkg/utils"),
            Some("pkg/utils".to_string())
        );
        assert_eq!(module.relative_dir("github.com/user/project"), Some(String::new()));
        assert_eq!(module.relative_dir("github.com/user/project2/x"), None);
        assert_eq!(module.relative_dir("time"), None);
    }

    #[test]
    fn test_package_key() {
        let project = Project::new("/work/api", None);
        assert_eq!(project.package_key(Path::new("/work/api/models/v1")), "models/v1");
        assert_eq!(project.package_key(Path::new("/work/api")), "");
        assert_eq!(project.package_dir("models"), PathBuf::from("/work/api/models"));
        assert_eq!(project.package_dir(""), PathBuf::from("/work/api"));
    }

    #[test]
    fn test_open_and_find() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("go.mod"), "module example.com/app\n\ngo 1.22\n").unwrap();
        let nested = dir.path().join("internal").join("models");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_go_mod(&nested), Some(dir.path().join("go.mod")));

        let project = Project::open(dir.path()).unwrap();
        assert_eq!(project.module.unwrap().path, "example.com/app");
    }

    #[test]
    fn test_open_without_go_mod() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = Project::open(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Manifest { .. }));
    }
}

//! Declaration tree handed over by a source reader.
//!
//! This is the contract between the parser and the resolver: only struct
//! type declarations, their fields, and the file's imports. Anything else in
//! the source file is dropped by the reader.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

/// Error that can occur when reading source code into a [`SourceFile`].
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("unsupported syntax: {0}")]
    Unsupported(String),
}

/// A reader parses Go source text into declarations.
pub trait Reader: Send + Sync {
    fn read(&self, source: &str) -> Result<SourceFile, ReadError>;
}

/// One parsed source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFile {
    /// Name from the `package` clause.
    pub package: String,
    pub imports: Vec<ImportSpec>,
    /// Struct declarations in source order.
    pub structs: Vec<StructDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Import path without quotes.
    pub path: String,
    pub alias: Option<String>,
}

impl ImportSpec {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            alias: None,
        }
    }

    /// Name the package is referred to by inside the importing file.
    ///
    /// Without an alias this is the last path element, skipping a bare
    /// major-version element (`.../v2`) and dropping a `.vN` suffix
    /// (`gopkg.in/yaml.v3`).
    pub fn local_name(&self) -> &str {
        if let Some(alias) = &self.alias {
            return alias;
        }
        let mut segments = self.path.rsplit('/');
        let last = segments.next().unwrap_or(&self.path);
        let last = if is_major_version(last) {
            segments.next().unwrap_or(last)
        } else {
            last
        };
        match last.rsplit_once('.') {
            Some((base, version)) if is_major_version(version) => base,
            _ => last,
        }
    }
}

fn is_major_version(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// `type Name struct { ... }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDecl {
    pub name: String,
    pub fields: Vec<FieldDecl>,
}

/// One line of a struct body. Embedded fields have no names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub names: Vec<String>,
    pub ty: TypeExpr,
}

impl FieldDecl {
    pub fn named(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self {
            names: vec![name.into()],
            ty,
        }
    }

    pub fn embedded(ty: TypeExpr) -> Self {
        Self {
            names: Vec::new(),
            ty,
        }
    }
}

/// Type expression of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// `string`, `User`
    Ident(String),
    /// `pkg.Type`
    Qualified { package: String, name: String },
    /// `*T`
    Pointer(Box<TypeExpr>),
    /// `[]T`, `[N]T`, `[...]T`
    Array(Box<TypeExpr>),
    /// `map[K]V`
    Map { key: Box<TypeExpr>, value: Box<TypeExpr> },
    /// `struct { ... }`
    Struct(Vec<FieldDecl>),
    /// `(T)`
    Paren(Box<TypeExpr>),
    /// Anything else, by syntax node kind (`interface_type`, `channel_type`, ...).
    Other(String),
}

impl TypeExpr {
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Ident(name.into())
    }

    pub fn qualified(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Qualified {
            package: package.into(),
            name: name.into(),
        }
    }

    pub fn array(element: TypeExpr) -> Self {
        Self::Array(Box::new(element))
    }

    pub fn map(key: TypeExpr, value: TypeExpr) -> Self {
        Self::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn pointer(inner: TypeExpr) -> Self {
        Self::Pointer(Box::new(inner))
    }

    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Ident(name) => name.clone(),
            Self::Qualified { package, name } => format!("{package}.{name}"),
            Self::Pointer(inner) => format!("*{}", inner.describe()),
            Self::Array(inner) => format!("[]{}", inner.describe()),
            Self::Map { key, value } => format!("map[{}]{}", key.describe(), value.describe()),
            Self::Struct(_) => "struct { ... }".to_string(),
            Self::Paren(inner) => format!("({})", inner.describe()),
            Self::Other(kind) => kind.clone(),
        }
    }
}

/// Enumerates and reads the source files of one package directory.
pub trait SourceLoader {
    /// All Go sources of `dir` as `(path, contents)`, sorted by path.
    fn load_dir(&self, dir: &Path) -> io::Result<Vec<(PathBuf, String)>>;
}

/// Reads packages from disk. `_test.go` files are skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLoader;

impl SourceLoader for FsLoader {
    fn load_dir(&self, dir: &Path) -> io::Result<Vec<(PathBuf, String)>> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if is_go_source(&name) {
                paths.push(entry.path());
            }
        }
        paths.sort();

        paths
            .into_iter()
            .map(|path| {
                let content = std::fs::read_to_string(&path)?;
                Ok((path, content))
            })
            .collect()
    }
}

/// In-memory source tree, keyed by file path.
#[derive(Debug, Default, Clone)]
pub struct MemoryLoader {
    files: BTreeMap<PathBuf, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }
}

impl SourceLoader for MemoryLoader {
    fn load_dir(&self, dir: &Path) -> io::Result<Vec<(PathBuf, String)>> {
        let found: Vec<(PathBuf, String)> = self
            .files
            .iter()
            .filter(|(path, _)| path.parent() == Some(dir))
            .filter(|(path, _)| {
                path.file_name()
                    .is_some_and(|name| is_go_source(&name.to_string_lossy()))
            })
            .map(|(path, content)| (path.clone(), content.clone()))
            .collect();

        if found.is_empty() && !self.files.keys().any(|p| p.starts_with(dir)) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such directory: {}", dir.display()),
            ));
        }
        Ok(found)
    }
}

fn is_go_source(file_name: &str) -> bool {
    file_name.ends_with(".go") && !file_name.ends_with("_test.go")
}

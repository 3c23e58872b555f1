//! Struct discovery across packages.
//!
//! The collector owns the parse cache (every package directory it has read,
//! parsed exactly once) and the [`Registry`] of structs selected for output.
//! The entry package is selected wholesale; lazily loaded packages only
//! contribute the structs something actually refers to.

use crate::error::{Error, Result};
use crate::ir::{QualifiedName, Registry, StructDef};
use crate::manifest::Project;
use crate::syntax::{ImportSpec, Reader, SourceFile, SourceLoader, StructDecl};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::Path;
use std::rc::Rc;

/// A parsed package directory.
#[derive(Debug, Default)]
pub struct Package {
    /// Go package name from the `package` clause.
    pub name: String,
    structs: Vec<ParsedStruct>,
    by_name: BTreeMap<String, usize>,
}

#[derive(Debug, Clone)]
pub(crate) struct ParsedStruct {
    pub decl: StructDecl,
    /// Imports of the file the struct was declared in.
    pub imports: Rc<[ImportSpec]>,
}

impl Package {
    fn merge(&mut self, file: SourceFile) {
        if self.name.is_empty() {
            self.name = file.package;
        }
        let imports: Rc<[ImportSpec]> = file.imports.into();
        for decl in file.structs {
            if self.by_name.contains_key(&decl.name) {
                tracing::warn!(package = %self.name, name = %decl.name, "duplicate struct declaration ignored");
                continue;
            }
            self.by_name.insert(decl.name.clone(), self.structs.len());
            self.structs.push(ParsedStruct {
                decl,
                imports: Rc::clone(&imports),
            });
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Struct names in declaration order.
    pub fn struct_names(&self) -> impl Iterator<Item = &str> {
        self.structs.iter().map(|s| s.decl.name.as_str())
    }

    pub(crate) fn get(&self, name: &str) -> Option<&ParsedStruct> {
        self.by_name.get(name).map(|&i| &self.structs[i])
    }
}

/// Discovers and resolves structs, starting from an entry package.
pub struct Collector<'a> {
    pub(crate) project: &'a Project,
    loader: &'a dyn SourceLoader,
    reader: &'a dyn Reader,
    packages: BTreeMap<String, Package>,
    registry: Registry,
    queue: VecDeque<QualifiedName>,
    selected: BTreeSet<QualifiedName>,
}

impl<'a> Collector<'a> {
    pub fn new(project: &'a Project, loader: &'a dyn SourceLoader, reader: &'a dyn Reader) -> Self {
        Self {
            project,
            loader,
            reader,
            packages: BTreeMap::new(),
            registry: Registry::new(),
            queue: VecDeque::new(),
            selected: BTreeSet::new(),
        }
    }

    /// Collect every struct of the entry file's package, plus whatever they
    /// reference in other project packages.
    pub fn collect(mut self, entry: &Path) -> Result<Registry> {
        let dir = entry.parent().unwrap_or(Path::new(""));
        let key = self.project.package_key(dir);
        tracing::debug!(entry = %entry.display(), package = %key, "collecting entry package");

        if !self.packages.contains_key(&key) {
            let package = self.parse_dir(dir)?;
            self.packages.insert(key.clone(), package);
        }
        self.select_package(&key);
        self.drain()?;
        Ok(self.registry)
    }

    /// Collect already parsed files as the entry package `key`.
    pub fn collect_files(mut self, key: &str, files: Vec<SourceFile>) -> Result<Registry> {
        let package = self.packages.entry(key.to_string()).or_default();
        for file in files {
            package.merge(file);
        }
        self.select_package(key);
        self.drain()?;
        Ok(self.registry)
    }

    /// Parse the package at `key` unless it is already cached.
    pub fn load_package(&mut self, key: &str) -> Result<&Package> {
        if !self.packages.contains_key(key) {
            let dir = self.project.package_dir(key);
            tracing::debug!(package = %key, dir = %dir.display(), "loading dependency package");
            let package = self.parse_dir(&dir)?;
            self.packages.insert(key.to_string(), package);
        }
        self.packages
            .get(key)
            .ok_or_else(|| Error::Ordering(format!("package {key} vanished from the cache")))
    }

    fn parse_dir(&self, dir: &Path) -> Result<Package> {
        let sources = self.loader.load_dir(dir).map_err(|source| Error::PackageLoad {
            dir: dir.to_path_buf(),
            source,
        })?;

        let mut package = Package::default();
        for (path, content) in sources {
            let file = self.reader.read(&content).map_err(|e| Error::Parse {
                path: path.clone(),
                message: e.to_string(),
            })?;
            if !package.name.is_empty() && file.package != package.name {
                tracing::warn!(
                    file = %path.display(),
                    expected = %package.name,
                    found = %file.package,
                    "mixed package names in one directory"
                );
            }
            package.merge(file);
        }
        Ok(package)
    }

    pub(crate) fn package(&self, key: &str) -> Option<&Package> {
        self.packages.get(key)
    }

    /// Clone a parsed struct out of the cache so resolution can mutate `self`.
    pub(crate) fn parsed(&self, name: &QualifiedName) -> Option<ParsedStruct> {
        self.packages.get(&name.package)?.get(&name.name).cloned()
    }

    /// Mark a struct for output. Idempotent.
    pub(crate) fn select(&mut self, name: &QualifiedName) {
        if self.selected.insert(name.clone()) {
            tracing::debug!(name = %name, "selected struct");
            self.queue.push_back(name.clone());
        }
    }

    fn select_package(&mut self, key: &str) {
        let names: Vec<QualifiedName> = match self.packages.get(key) {
            Some(package) => package
                .struct_names()
                .map(|name| QualifiedName::new(key, name))
                .collect(),
            None => Vec::new(),
        };
        for name in &names {
            self.select(name);
        }
    }

    /// Resolve selected structs until no new ones are discovered. The queue
    /// is FIFO, so discovery order is the declaration order.
    fn drain(&mut self) -> Result<()> {
        let mut order = self.registry.len();
        while let Some(name) = self.queue.pop_front() {
            let fields = self.resolve_struct(&name)?;
            self.registry.insert(StructDef {
                name,
                order,
                fields,
            });
            order += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FieldDef, Primitive, TypeRef};
    use crate::manifest::GoModule;
    use crate::syntax::{FieldDecl, MemoryLoader, ReadError, TypeExpr};

    /// Reader for hand-built trees: the "source" is a key into a fixed table.
    struct TableReader(BTreeMap<&'static str, SourceFile>);

    impl Reader for TableReader {
        fn read(&self, source: &str) -> std::result::Result<SourceFile, ReadError> {
            self.0
                .get(source)
                .cloned()
                .ok_or_else(|| ReadError::Parse(format!("unknown source {source}")))
        }
    }

    fn file(package: &str, imports: &[&str], structs: Vec<StructDecl>) -> SourceFile {
        SourceFile {
            package: package.into(),
            imports: imports.iter().map(|p| ImportSpec::new(*p)).collect(),
            structs,
        }
    }

    fn decl(name: &str, fields: Vec<FieldDecl>) -> StructDecl {
        StructDecl {
            name: name.into(),
            fields,
        }
    }

    fn project() -> Project {
        Project::new("proj", Some(GoModule::new("example.com/proj")))
    }

    #[test]
    fn test_dependency_package_contributes_only_referenced_structs() {
        let reader = TableReader(BTreeMap::from([
            (
                "main",
                file(
                    "api",
                    &["example.com/proj/models"],
                    vec![decl(
                        "Handler",
                        vec![FieldDecl::named("User", TypeExpr::qualified("models", "User"))],
                    )],
                ),
            ),
            (
                "models",
                file(
                    "models",
                    &[],
                    vec![
                        decl("Unused", vec![FieldDecl::named("X", TypeExpr::ident("int"))]),
                        decl("User", vec![FieldDecl::named("Address", TypeExpr::ident("Address"))]),
                        decl("Address", vec![FieldDecl::named("Street", TypeExpr::ident("string"))]),
                    ],
                ),
            ),
        ]));
        let loader = MemoryLoader::new()
            .with_file("proj/api/a.go", "main")
            .with_file("proj/models/m.go", "models");
        let project = project();

        let registry = Collector::new(&project, &loader, &reader)
            .collect(Path::new("proj/api/a.go"))
            .unwrap();

        let names: Vec<String> = registry.names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, ["api.Handler", "models.User", "models.Address"]);
        assert_eq!(
            registry.get(&QualifiedName::new("api", "Handler")).unwrap().fields,
            vec![FieldDef::Basic {
                name: "User".into(),
                ty: TypeRef::Struct(QualifiedName::new("models", "User")),
            }]
        );
    }

    #[test]
    fn test_package_is_parsed_once() {
        use std::cell::Cell;

        struct CountingLoader<'l> {
            inner: MemoryLoader,
            calls: &'l Cell<usize>,
        }
        impl SourceLoader for CountingLoader<'_> {
            fn load_dir(&self, dir: &Path) -> std::io::Result<Vec<(std::path::PathBuf, String)>> {
                self.calls.set(self.calls.get() + 1);
                self.inner.load_dir(dir)
            }
        }

        let reader = TableReader(BTreeMap::from([
            (
                "main",
                file(
                    "api",
                    &["example.com/proj/models"],
                    vec![decl(
                        "Handler",
                        vec![
                            FieldDecl::named("A", TypeExpr::qualified("models", "A")),
                            FieldDecl::named("B", TypeExpr::qualified("models", "B")),
                        ],
                    )],
                ),
            ),
            (
                "models",
                file(
                    "models",
                    &[],
                    vec![
                        decl("A", vec![FieldDecl::named("X", TypeExpr::ident("bool"))]),
                        decl("B", vec![FieldDecl::named("Y", TypeExpr::ident("bool"))]),
                    ],
                ),
            ),
        ]));
        let calls = Cell::new(0);
        let loader = CountingLoader {
            inner: MemoryLoader::new()
                .with_file("proj/api/a.go", "main")
                .with_file("proj/models/m.go", "models"),
            calls: &calls,
        };
        let project = project();

        let registry = Collector::new(&project, &loader, &reader)
            .collect(Path::new("proj/api/a.go"))
            .unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_missing_dependency_directory_is_external() {
        let reader = TableReader(BTreeMap::from([(
            "main",
            file(
                "api",
                &["example.com/proj/gone"],
                vec![decl(
                    "Handler",
                    vec![FieldDecl::named("G", TypeExpr::qualified("gone", "G"))],
                )],
            ),
        )]));
        let loader = MemoryLoader::new().with_file("proj/api/a.go", "main");
        let project = project();

        let registry = Collector::new(&project, &loader, &reader)
            .collect(Path::new("proj/api/a.go"))
            .unwrap();
        assert_eq!(
            registry.get(&QualifiedName::new("api", "Handler")).unwrap().fields,
            vec![FieldDef::Unknown {
                name: "G".into(),
                description: "gone.G".into(),
            }]
        );
    }

    /// Fails every directory except the ones `inner` knows about.
    struct LockedLoader {
        inner: MemoryLoader,
        locked: &'static str,
    }

    impl SourceLoader for LockedLoader {
        fn load_dir(&self, dir: &Path) -> std::io::Result<Vec<(std::path::PathBuf, String)>> {
            if dir == Path::new(self.locked) {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "permission denied",
                ));
            }
            self.inner.load_dir(dir)
        }
    }

    #[test]
    fn test_unreadable_dependency_directory_is_fatal() {
        let reader = TableReader(BTreeMap::from([(
            "main",
            file(
                "api",
                &["example.com/proj/locked"],
                vec![decl(
                    "Handler",
                    vec![FieldDecl::named("L", TypeExpr::qualified("locked", "L"))],
                )],
            ),
        )]));
        let loader = LockedLoader {
            inner: MemoryLoader::new().with_file("proj/api/a.go", "main"),
            locked: "proj/locked",
        };
        let project = project();

        let err = Collector::new(&project, &loader, &reader)
            .collect(Path::new("proj/api/a.go"))
            .unwrap_err();
        match err {
            Error::PackageLoad { dir, source } => {
                assert_eq!(dir, Path::new("proj/locked"));
                assert_eq!(source.kind(), std::io::ErrorKind::PermissionDenied);
            }
            other => panic!("expected package load error, got {other}"),
        }
    }

    #[test]
    fn test_parse_failure_names_the_file() {
        let reader = TableReader(BTreeMap::new());
        let loader = MemoryLoader::new().with_file("proj/api/broken.go", "???");
        let project = project();

        let err = Collector::new(&project, &loader, &reader)
            .collect(Path::new("proj/api/broken.go"))
            .unwrap_err();
        match err {
            Error::Parse { path, .. } => assert_eq!(path, Path::new("proj/api/broken.go")),
            other => panic!("expected parse error, got {other}"),
        }
    }

    #[test]
    fn test_collect_files_uses_given_key() {
        let project = Project::new("", None);
        let loader = MemoryLoader::new();
        let reader = TableReader(BTreeMap::new());
        let registry = Collector::new(&project, &loader, &reader)
            .collect_files(
                "types",
                vec![file(
                    "types",
                    &[],
                    vec![decl("S", vec![FieldDecl::named("Hello", TypeExpr::ident("string"))])],
                )],
            )
            .unwrap();
        let s = registry.get(&QualifiedName::new("types", "S")).unwrap();
        assert_eq!(
            s.fields,
            vec![FieldDef::Basic {
                name: "Hello".into(),
                ty: TypeRef::Primitive(Primitive::String),
            }]
        );
    }
}

//! End-to-end entry points.

use crate::collector::Collector;
use crate::embed::expand_embeddings;
use crate::error::Result;
use crate::graph::{GraphOptions, order_structs};
use crate::ir::{Registry, StructDef};
use crate::manifest::Project;
use crate::naming::NameMap;
use crate::output::{Backend, ValibotBackend, ValibotOptions};
use crate::syntax::{Reader, SourceFile, SourceLoader};
use std::path::Path;

/// Options for a generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    pub valibot: ValibotOptions,
    pub graph: GraphOptions,
}

/// Collect, resolve, and order the structs reachable from `entry`.
pub fn resolve_with(
    entry: &Path,
    project: &Project,
    loader: &dyn SourceLoader,
    reader: &dyn Reader,
    options: &Options,
) -> Result<Vec<StructDef>> {
    let registry = Collector::new(project, loader, reader).collect(entry)?;
    finish(registry, options)
}

/// Generate Valibot code for `entry` using the given loader and reader.
pub fn generate_with(
    entry: &Path,
    project: &Project,
    loader: &dyn SourceLoader,
    reader: &dyn Reader,
    options: &Options,
) -> Result<String> {
    let structs = resolve_with(entry, project, loader, reader, options)?;
    emit(&structs, options)
}

/// Generate code for already ordered structs.
pub fn emit(structs: &[StructDef], options: &Options) -> Result<String> {
    let backend = ValibotBackend::new(options.valibot.clone());
    let names = NameMap::with_reserved(structs, backend.reserved_names());
    let output = backend.generate(structs, &names)?;
    tracing::info!(structs = structs.len(), "generated validators");
    Ok(output)
}

fn finish(mut registry: Registry, options: &Options) -> Result<Vec<StructDef>> {
    tracing::debug!(structs = registry.len(), "collected structs");
    expand_embeddings(&mut registry)?;
    order_structs(&registry, &options.graph)
}

/// Resolve one source file on its own. Its package key is the Go package
/// name, and every qualified type is treated as external.
pub fn resolve_file(file: SourceFile, reader: &dyn Reader, options: &Options) -> Result<Vec<StructDef>> {
    let project = Project::new("", None);
    let loader = crate::syntax::MemoryLoader::new();
    let key = file.package.clone();
    let registry = Collector::new(&project, &loader, reader).collect_files(&key, vec![file])?;
    finish(registry, options)
}

#[cfg(feature = "read-go")]
mod go {
    use super::*;
    use crate::error::Error;
    use crate::input::{GO_READER, read_go};
    use crate::syntax::FsLoader;
    use std::path::PathBuf;

    /// Resolve `entry` from disk.
    pub fn resolve(entry: &Path, project: &Project, options: &Options) -> Result<Vec<StructDef>> {
        resolve_with(entry, project, &FsLoader, &GO_READER, options)
    }

    /// Generate Valibot code for `entry` from disk.
    pub fn generate(entry: &Path, project: &Project, options: &Options) -> Result<String> {
        generate_with(entry, project, &FsLoader, &GO_READER, options)
    }

    /// Generate Valibot code for a single in-memory Go file.
    pub fn generate_from_source(source: &str, options: &Options) -> Result<String> {
        let file = read_go(source).map_err(|e| Error::Parse {
            path: PathBuf::from("<source>"),
            message: e.to_string(),
        })?;
        let structs = resolve_file(file, &GO_READER, options)?;
        emit(&structs, options)
    }
}

#[cfg(feature = "read-go")]
pub use go::{generate, generate_from_source, resolve};

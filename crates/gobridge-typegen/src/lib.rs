//! Valibot validator generation from Go struct declarations.
//!
//! `gobridge-typegen` reads the Go package of an entry file, follows struct
//! references into other packages of the same module, and emits one Valibot
//! `object(...)` schema per struct, declared in dependency order.
//!
//! # Architecture
//!
//! ```text
//! Go sources          Collector            Post-passes          Backend
//! ──────────     ─────────────────     ──────────────────     ──────────
//! entry pkg  ─┐  parse cache          embed (placeholders)
//! imports    ─┼─> worklist ──> Registry ──> graph (topo) ──┬─> Valibot
//! go.mod     ─┘  resolve (fields)         naming (idents) ─┘
//! ```
//!
//! Only structs of the entry package are selected up front. Packages reached
//! through imports contribute just the structs something refers to, plus
//! whatever those refer to in turn.
//!
//! # Example
//!
//! ```
//! # #[cfg(feature = "read-go")] {
//! use gobridge_typegen::{Options, generate_from_source};
//!
//! let source = "package types\n\ntype S struct {\n\tHello string\n}\n";
//! let code = generate_from_source(source, &Options::default()).unwrap();
//! assert_eq!(
//!     code,
//!     "import { object, string } from 'valibot';\n\nconst S = object({\n  Hello: string(),\n});\n"
//! );
//! # }
//! ```
//!
//! # Feature Flags
//!
//! - `read-go` (default) - tree-sitter based Go reader and the disk-backed
//!   entry points ([`generate`], [`generate_from_source`], [`resolve`])

pub mod collector;
pub mod embed;
pub mod error;
pub mod graph;
pub mod input;
pub mod ir;
pub mod manifest;
pub mod naming;
pub mod output;
pub mod pipeline;
mod resolve;
pub mod syntax;

pub use collector::Collector;
pub use error::{Error, Result};
pub use graph::{DependencyGraph, GraphOptions, order_structs};
pub use ir::{FieldDef, Primitive, QualifiedName, Registry, StructDef, TypeRef};
pub use manifest::{GoModule, Project, find_go_mod};
pub use naming::NameMap;
pub use output::{Backend, ValibotBackend, ValibotOptions, generate_valibot};
pub use pipeline::{Options, emit, generate_with, resolve_file, resolve_with};
pub use syntax::{FsLoader, MemoryLoader, Reader, SourceLoader};

#[cfg(feature = "read-go")]
pub use input::{GO_READER, read_go};
#[cfg(feature = "read-go")]
pub use pipeline::{generate, generate_from_source, resolve};

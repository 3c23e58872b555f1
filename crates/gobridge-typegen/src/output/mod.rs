//! Output backends.
//!
//! A backend receives structs already in dependency order together with the
//! [`NameMap`] that assigns each one its output identifier.

use crate::error::Result;
use crate::ir::StructDef;
use crate::naming::NameMap;

pub mod valibot;

pub use valibot::{
    Combinator, RESERVED_NAMES, VALIBOT_BACKEND, ValibotBackend, ValibotOptions, generate_valibot,
};

/// A code generation backend.
pub trait Backend: Send + Sync {
    /// Unique backend identifier (e.g. "valibot").
    fn name(&self) -> &'static str;

    /// File extension for generated code.
    fn extension(&self) -> &'static str;

    /// Identifiers the generated module binds itself. Structs never get
    /// one of these as their output name.
    fn reserved_names(&self) -> &'static [&'static str] {
        &[]
    }

    /// Generate code for `structs`, which must already be ordered so that
    /// every struct comes after the structs it references.
    fn generate(&self, structs: &[StructDef], names: &NameMap) -> Result<String>;
}

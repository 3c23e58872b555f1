//! Error type shared by every pipeline stage.

use std::path::PathBuf;

/// A fatal pipeline error. The first one aborts the run; no partial output
/// is ever produced.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("parse error in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("failed to load package {}: {source}", dir.display())]
    PackageLoad {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest {}: {message}", path.display())]
    Manifest { path: PathBuf, message: String },

    #[error("unsupported type in {context}: {message}")]
    UnsupportedType { context: String, message: String },

    #[error("embedded struct {target} not found (embedded in {context})")]
    MissingEmbeddedStruct { context: String, target: String },

    #[error("ordering error: {0}")]
    Ordering(String),
}

impl Error {
    pub(crate) fn unsupported(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnsupportedType {
            context: context.into(),
            message: message.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

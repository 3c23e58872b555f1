//! Input readers - parse source code into the declaration tree.

#[cfg(feature = "read-go")]
pub mod go;

#[cfg(feature = "read-go")]
pub use go::{GO_READER, GoReader, read_go};

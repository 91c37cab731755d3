//! Error types for the region traversal engine.

use std::io;
use thiserror::Error;

/// Errors that can occur while assembling and processing active regions.
///
/// Ordering violations and configuration errors are always fatal: once the
/// read stream is observed out of order the dead-zone proof is invalid and
/// regions would silently lose reads. Analysis errors are propagated to the
/// caller after all earlier in-order results have been reduced. Cache
/// overflow is *not* an error; it triggers reservoir downsampling and is
/// reported through [`crate::cache::ReadCache::discarded_count`].
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Out-of-order input: {0}")]
    OrderingViolation(String),

    #[error("Analysis function failed: {0}")]
    Analysis(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

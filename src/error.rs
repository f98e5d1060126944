//! Error taxonomy for pass-driving entry points.
//!
//! Every fallible public function in this crate returns [`anyhow::Result`],
//! with an [`EngineError`] as the root cause whenever the failure belongs to
//! one of the categories below. Callers that need to branch on the category
//! can recover it with [`anyhow::Error::downcast_ref`]:
//!
//! ```ignore
//! match err.downcast_ref::<EngineError>() {
//!     Some(EngineError::SampleUnderrun { missing }) => retry_with_recount(*missing),
//!     _ => return Err(err),
//! }
//! ```
//!
//! No component retries internally; all failures propagate to the caller of
//! the entry point that drove the pass.

use std::fmt;
use std::path::PathBuf;

/// Failure categories surfaced by the engine.
#[derive(Debug)]
pub enum EngineError {
    /// The underlying columnar source could not be opened or decoded.
    /// Fatal for the current pass; no partial result is produced.
    SourceRead(String),
    /// An output partition file could not be created, appended to, or
    /// finalized. Fatal for the remaining writes; files written so far are
    /// retained (the splitter makes no all-or-nothing guarantee).
    PartitionWrite {
        /// Partition file the failure relates to.
        path: PathBuf,
        /// Underlying cause.
        message: String,
    },
    /// The sampler's index pool was not empty when the stream ended, meaning
    /// the source declared a total row count larger than what it produced.
    SampleUnderrun {
        /// Number of drawn row indices that were never resolved.
        missing: usize,
    },
    /// Invalid scan or pass configuration: a zero batch size, an empty or
    /// unknown column projection, or a labeling function whose output does
    /// not line up with the batch it was given.
    Configuration(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceRead(msg) => write!(f, "source read failed: {msg}"),
            Self::PartitionWrite { path, message } => {
                write!(f, "partition write failed for {}: {message}", path.display())
            }
            Self::SampleUnderrun { missing } => write!(
                f,
                "sample underrun: {missing} drawn row indices outlived the stream \
                 (declared total row count exceeds actual rows)"
            ),
            Self::Configuration(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

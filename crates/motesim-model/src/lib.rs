//! # motesim-model
//!
//! Loading of the text inputs that describe a simulation run.
//!
//! This crate provides:
//! - Topology files: a declared node count followed by `src dst gain` links ([`Topology`])
//! - Noise files: one integer reading per line ([`NoiseTrace`])
//!
//! Blank lines are skipped in both formats. Malformed lines are reported with
//! their 1-based line number.

pub mod noise;
pub mod topology;

pub use noise::{load_noise_trace, NoiseTrace};
pub use topology::{load_topology, Link, Topology};

use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while loading model files.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Input file does not exist.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Topology input has no node count line.
    #[error("missing node count line")]
    MissingNodeCount,

    /// A line could not be parsed.
    #[error("line {line}: {message}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// What was wrong with the line.
        message: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ModelError {
    fn parse(line: usize, message: impl Into<String>) -> Self {
        ModelError::Parse {
            line,
            message: message.into(),
        }
    }
}

/// Read a whole input file, mapping a missing file to [`ModelError::FileNotFound`].
fn read_input(path: &Path) -> Result<String, ModelError> {
    std::fs::read_to_string(path).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => ModelError::FileNotFound(path.to_path_buf()),
        _ => ModelError::IoError(err),
    })
}

//! Error types for enccfg.

use thiserror::Error;

/// Main error type for encoder configuration derivation.
///
/// Every variant is a local validation failure raised before any output is
/// produced or any caller buffer is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncCfgError {
    /// GOP mode selector outside of the supported range.
    #[error("Invalid GOP mode: {0} (expected 0..=3)")]
    InvalidGopMode(i32),

    /// Destination overlay buffer cannot hold the requested region layout.
    #[error("Overlay buffer too small: {required} bytes required, {actual} available")]
    BufferTooSmall {
        /// Bytes needed for the requested layout.
        required: usize,
        /// Bytes available in the caller's buffer.
        actual: usize,
    },

    /// Overlay region count outside of the hardware region table.
    #[error("Invalid OSD region count: {0} (expected 1..=8)")]
    InvalidRegionCount(u32),

    /// A reference topology violates one of its structural invariants.
    #[error("Invalid reference topology: {0}")]
    InvalidTopology(String),

    /// Invalid input (unparsable configuration text, etc.).
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for enccfg operations.
pub type Result<T> = std::result::Result<T, EncCfgError>;

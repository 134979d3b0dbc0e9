//! HEVC-specific error types.
//!
//! [`TileRepackError`] keeps every way a tiled stream can go wrong as its own
//! variant, so a misconfigured tile count can be told apart from a corrupted
//! or desynchronized source.

use std::fmt;
use thiserror::Error;

/// HEVC-specific error type.
#[derive(Error, Debug)]
pub enum HevcError {
    /// Tile repacking error.
    #[error("Tile repack error: {0}")]
    TileRepack(#[from] TileRepackError),

    /// Malformed filter option string.
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// Unsupported feature.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Core library error.
    #[error("Core error: {0}")]
    Core(String),
}

/// Errors raised while reassembling tiles into frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TileRepackError {
    /// Tile count outside `1..=255`.
    #[error("Invalid tile count {0}, expected 1..=255")]
    InvalidTileCount(u32),

    /// Allocation failed.
    #[error("Out of memory allocating {needed} bytes")]
    OutOfMemory { needed: usize },

    /// Packet has no tile index marker.
    #[error("Packet has no tile index marker")]
    MissingTileMarker,

    /// Tile index not below the configured tile count.
    #[error("Tile index {index} exceeds maximum tile number {tile_count}")]
    TileIndexOutOfRange { index: usize, tile_count: usize },

    /// A second packet for a slot that is already filled.
    #[error("Duplicated tile index {index}")]
    DuplicateTile { index: usize },

    /// A tile's timing or stream fields disagree with the rest of the frame.
    #[error("Tile {index} {field} does not match the frame")]
    MetadataMismatch { index: usize, field: MetadataField },
}

/// Packet field compared across the tiles of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataField {
    Pts,
    Dts,
    Flags,
    StreamIndex,
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pts => write!(f, "pts"),
            Self::Dts => write!(f, "dts"),
            Self::Flags => write!(f, "flags"),
            Self::StreamIndex => write!(f, "stream index"),
        }
    }
}

impl TileRepackError {
    /// Check if the error was caused by the input stream rather than setup.
    #[must_use]
    pub fn is_stream_error(&self) -> bool {
        !matches!(self, Self::InvalidTileCount(_) | Self::OutOfMemory { .. })
    }
}

/// Result type for HEVC operations.
pub type Result<T> = std::result::Result<T, HevcError>;

impl From<transcode_core::Error> for HevcError {
    fn from(e: transcode_core::Error) -> Self {
        HevcError::Core(e.to_string())
    }
}

impl From<TileRepackError> for transcode_core::Error {
    fn from(e: TileRepackError) -> Self {
        match e {
            TileRepackError::InvalidTileCount(_) => transcode_core::Error::Config(e.to_string()),
            TileRepackError::OutOfMemory { .. } => {
                transcode_core::Error::ResourceExhausted(e.to_string())
            }
            _ => transcode_core::Error::filter(e),
        }
    }
}

impl From<HevcError> for transcode_core::Error {
    fn from(e: HevcError) -> Self {
        match e {
            HevcError::TileRepack(inner) => inner.into(),
            HevcError::InvalidOption(msg) => transcode_core::Error::InvalidParameter(msg),
            HevcError::Unsupported(msg) => transcode_core::Error::Unsupported(msg),
            HevcError::Core(msg) => transcode_core::Error::Filter(msg.into()),
        }
    }
}

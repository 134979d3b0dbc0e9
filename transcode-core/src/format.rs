//! Codec identifiers.

use std::fmt;

/// Video codec type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum VideoCodec {
    /// H.265 / HEVC.
    H265,
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::H265 => write!(f, "H.265/HEVC"),
        }
    }
}

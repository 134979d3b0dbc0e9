//! HEVC/H.265 support for the transcode library.
//!
//! This crate covers the pieces of HEVC handling that work at the NAL-unit
//! level, without decoding pictures:
//!
//! - **NAL unit types**: classification of the 6-bit `nal_unit_type` field
//!   (VCL slices, IRAP pictures, parameter sets, SEI)
//! - **Annex-B scanning**: a lazy iterator over the NAL units of a byte-stream
//!   payload, reporting byte ranges that include each unit's start code
//! - **Tile repacking**: the `hevc_tile_repack` bitstream filter, which merges the
//!   per-tile packets of a tiled hardware encoder back into one packet per frame
//!
//! # Example
//!
//! ```rust,ignore
//! use transcode_core::BsfContext;
//! use transcode_hevc::{HevcTileRepack, TileRepackConfig};
//!
//! let filter = HevcTileRepack::new(TileRepackConfig::new(4))?;
//! let mut ctx = BsfContext::new(filter);
//!
//! for tile in tiles {
//!     ctx.send_packet(Some(tile))?;
//!     while let Some(frame) = ctx.receive_packet()? {
//!         mux.write(frame)?;
//!     }
//! }
//! ```

pub mod error;
pub mod nal;
pub mod tile_repack;

pub use error::{HevcError, MetadataField, Result, TileRepackError};
pub use nal::{coded_slices, AnnexBUnits, NalUnitSpan, NalUnitType};
pub use tile_repack::{HevcTileRepack, TileRepackConfig};

use transcode_core::bsf::BitstreamFilter;

/// Names of the bitstream filters this crate provides.
pub const FILTER_NAMES: &[&str] = &[tile_repack::FILTER_NAME];

/// Build a bitstream filter by name from a `key=value[:key=value...]` option string.
pub fn filter_by_name(name: &str, options: &str) -> Result<Box<dyn BitstreamFilter>> {
    match name {
        tile_repack::FILTER_NAME => {
            let config = TileRepackConfig::from_options(options)?;
            Ok(Box::new(HevcTileRepack::new(config)?))
        }
        other => Err(HevcError::Unsupported(format!("bitstream filter '{}'", other))),
    }
}

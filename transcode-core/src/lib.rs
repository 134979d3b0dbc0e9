//! # Transcode Core
//!
//! Core types and utilities for the Transcode codec library.
//!
//! This crate provides the fundamental building blocks shared by codec crates:
//! - Error handling types
//! - Annex-B start-code search
//! - Packet, side data and timestamp types
//! - The bitstream filter trait and its push/pull driver

pub mod error;
pub mod bitstream;
pub mod packet;
pub mod timestamp;
pub mod format;
pub mod bsf;

pub use error::{Error, Result};
pub use packet::{extract_tile_index, Packet, PacketFlags, SideData, SideDataType};
pub use timestamp::{TimeBase, Timestamp};
pub use format::VideoCodec;
pub use bsf::{BitstreamFilter, BsfContext, FilterOutput, PacketSource, SourceStatus};

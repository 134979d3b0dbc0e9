//! Packet abstractions for encoded media data.
//!
//! Packets contain compressed/encoded data before decoding or after encoding.
//! The payload is a reference-counted [`Bytes`] buffer, so cloning a packet or
//! handing its payload to another stage shares the storage instead of copying it.

use crate::timestamp::Timestamp;
use bitflags::bitflags;
use bytes::Bytes;
use std::fmt;

bitflags! {
    /// Flags for packet properties.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PacketFlags: u32 {
        /// This packet contains a keyframe.
        const KEYFRAME = 0x0001;
        /// Packet data is corrupted.
        const CORRUPT = 0x0002;
        /// Packet should be discarded.
        const DISCARD = 0x0004;
        /// Packet contains a disposable frame (can be dropped).
        const DISPOSABLE = 0x0008;
    }
}

/// An encoded media packet.
#[derive(Clone, Default)]
pub struct Packet {
    /// The packet data.
    data: Bytes,
    /// Presentation timestamp.
    pub pts: Timestamp,
    /// Decode timestamp.
    pub dts: Timestamp,
    /// Stream index this packet belongs to.
    pub stream_index: u32,
    /// Packet flags.
    pub flags: PacketFlags,
    /// Position in the input stream (bytes).
    pub pos: Option<u64>,
    /// Out-of-band annotations.
    side_data: Vec<SideData>,
}

impl Packet {
    /// Create a new packet over the given payload.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            pts: Timestamp::none(),
            dts: Timestamp::none(),
            stream_index: 0,
            flags: PacketFlags::empty(),
            pos: None,
            side_data: Vec::new(),
        }
    }

    /// Create an empty packet.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Get the packet data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get a shared handle to the payload storage.
    pub fn buffer(&self) -> &Bytes {
        &self.data
    }

    /// Get the size of the packet data.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Check if this packet is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check if this is a keyframe packet.
    pub fn is_keyframe(&self) -> bool {
        self.flags.contains(PacketFlags::KEYFRAME)
    }

    /// Set the keyframe flag.
    pub fn set_keyframe(&mut self, keyframe: bool) {
        self.flags.set(PacketFlags::KEYFRAME, keyframe);
    }

    /// Add side data to the packet.
    pub fn add_side_data(&mut self, data: SideData) {
        self.side_data.push(data);
    }

    /// Get side data of a specific type.
    pub fn get_side_data(&self, data_type: SideDataType) -> Option<&SideData> {
        self.side_data.iter().find(|sd| sd.data_type == data_type)
    }

    /// All side data attached to the packet, in insertion order.
    pub fn side_data(&self) -> &[SideData] {
        &self.side_data
    }

    /// Remove every side data entry of the given type.
    pub fn remove_side_data(&mut self, data_type: SideDataType) {
        self.side_data.retain(|sd| sd.data_type != data_type);
    }

    /// Attach (or replace) the tile index marker.
    pub fn set_tile_index(&mut self, index: u8) {
        self.remove_side_data(SideDataType::SliceAddress);
        self.add_side_data(SideData::new(
            SideDataType::SliceAddress,
            Bytes::copy_from_slice(&[index]),
        ));
    }

    /// Create a new packet with the specified timestamps.
    pub fn with_timestamps(mut self, pts: Timestamp, dts: Timestamp) -> Self {
        self.pts = pts;
        self.dts = dts;
        self
    }

    /// Create a new packet with the specified stream index.
    pub fn with_stream_index(mut self, index: u32) -> Self {
        self.stream_index = index;
        self
    }

    /// Create a new packet with the specified flags.
    pub fn with_flags(mut self, flags: PacketFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Create a new packet with the specified stream position.
    pub fn with_pos(mut self, pos: u64) -> Self {
        self.pos = Some(pos);
        self
    }

    /// Create a new packet carrying the given tile index marker.
    pub fn with_tile_index(mut self, index: u8) -> Self {
        self.set_tile_index(index);
        self
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("size", &self.size())
            .field("pts", &self.pts)
            .field("dts", &self.dts)
            .field("stream_index", &self.stream_index)
            .field("flags", &self.flags)
            .field("side_data", &self.side_data.len())
            .finish()
    }
}

/// Read the tile index a hardware encoder attached to a packet.
///
/// The marker is one byte holding the index `0..=255`. Returns `None` when the
/// packet carries no marker or the marker is empty.
pub fn extract_tile_index(packet: &Packet) -> Option<u8> {
    packet
        .get_side_data(SideDataType::SliceAddress)
        .and_then(|sd| sd.data.first())
        .copied()
}

/// Types of side data that can be attached to packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SideDataType {
    /// H.264/H.265 parameter sets (SPS, PPS).
    ParameterSets,
    /// Display matrix (rotation/flip).
    DisplayMatrix,
    /// Content light level (HDR).
    ContentLightLevel,
    /// Mastering display metadata (HDR).
    MasteringDisplayMetadata,
    /// Encryption info.
    EncryptionInfo,
    /// A53 closed captions.
    A53ClosedCaptions,
    /// Tile (slice address) index set by a tiled hardware encoder.
    SliceAddress,
    /// Custom/unknown.
    Custom(u32),
}

/// Side data attached to a packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideData {
    /// Type of side data.
    pub data_type: SideDataType,
    /// The side data payload.
    pub data: Bytes,
}

impl SideData {
    /// Create new side data.
    pub fn new(data_type: SideDataType, data: impl Into<Bytes>) -> Self {
        Self {
            data_type,
            data: data.into(),
        }
    }
}

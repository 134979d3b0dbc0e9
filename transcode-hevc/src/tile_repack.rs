//! HEVC tile repack bitstream filter.
//!
//! A tiled hardware encoder emits each frame as `tile_num` separate packets,
//! one per tile, each tagged with a [`SideDataType::SliceAddress`] marker
//! holding its tile index. This filter collects the tiles of one frame in any
//! arrival order and emits a single packet:
//!
//! - tile 0's payload verbatim (it carries the frame-level VPS/SPS/PPS/SEI units),
//! - followed by only the coded-slice NAL units of tiles `1..tile_num`, in index order.
//!
//! Timing, flags and stream index must agree across all tiles of a frame. The
//! output takes its metadata and side data from tile 0, minus the tile marker.

use crate::error::{HevcError, MetadataField, Result, TileRepackError};
use crate::nal::coded_slices;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use transcode_core::bsf::{BitstreamFilter, FilterOutput, PacketSource, SourceStatus};
use transcode_core::format::VideoCodec;
use transcode_core::packet::{extract_tile_index, Packet, PacketFlags, SideData, SideDataType};
use transcode_core::timestamp::Timestamp;

/// Registered filter name.
pub const FILTER_NAME: &str = "hevc_tile_repack";

/// Largest accepted tile count.
pub const MAX_TILE_NUM: u32 = 255;

const CODECS: &[VideoCodec] = &[VideoCodec::H265];

/// Tile repack configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TileRepackConfig {
    /// Number of tiles each frame is split into.
    pub tile_num: u32,
}

impl TileRepackConfig {
    /// Create a configuration for `tile_num` tiles per frame.
    pub fn new(tile_num: u32) -> Self {
        Self { tile_num }
    }

    /// Set the number of tiles.
    pub fn with_tile_num(mut self, tile_num: u32) -> Self {
        self.tile_num = tile_num;
        self
    }

    /// Check the tile count is within `1..=255`.
    pub fn validate(&self) -> std::result::Result<(), TileRepackError> {
        if self.tile_num == 0 || self.tile_num > MAX_TILE_NUM {
            return Err(TileRepackError::InvalidTileCount(self.tile_num));
        }
        Ok(())
    }

    /// Parse a `key=value[:key=value...]` option string, e.g. `tile_num=4`.
    ///
    /// Validation of the resulting values is left to [`HevcTileRepack::new`].
    pub fn from_options(options: &str) -> Result<Self> {
        let mut config = Self::default();
        for option in options.split(':').map(str::trim).filter(|o| !o.is_empty()) {
            let (key, value) = option
                .split_once('=')
                .ok_or_else(|| HevcError::InvalidOption(format!("missing value in '{}'", option)))?;
            match key.trim() {
                "tile_num" => {
                    config.tile_num = value.trim().parse().map_err(|_| {
                        HevcError::InvalidOption(format!("tile_num: '{}' is not a valid count", value))
                    })?;
                }
                other => {
                    return Err(HevcError::InvalidOption(format!(
                        "unknown option '{}' for {}",
                        other, FILTER_NAME
                    )))
                }
            }
        }
        Ok(config)
    }
}

/// Fields every tile of a frame must agree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TileTiming {
    pts: Timestamp,
    dts: Timestamp,
    flags: PacketFlags,
    stream_index: u32,
}

impl TileTiming {
    fn of(packet: &Packet) -> Self {
        Self {
            pts: packet.pts,
            dts: packet.dts,
            flags: packet.flags,
            stream_index: packet.stream_index,
        }
    }

    fn mismatch(&self, other: &Self) -> Option<MetadataField> {
        if self.pts != other.pts {
            Some(MetadataField::Pts)
        } else if self.dts != other.dts {
            Some(MetadataField::Dts)
        } else if self.flags != other.flags {
            Some(MetadataField::Flags)
        } else if self.stream_index != other.stream_index {
            Some(MetadataField::StreamIndex)
        } else {
            None
        }
    }
}

/// Frame-level properties taken from tile 0.
#[derive(Debug, Default)]
struct FrameProps {
    pts: Timestamp,
    dts: Timestamp,
    pos: Option<u64>,
    stream_index: u32,
    flags: PacketFlags,
    side_data: Vec<SideData>,
}

impl FrameProps {
    fn from_tile(packet: &Packet) -> std::result::Result<Self, TileRepackError> {
        let extra = packet
            .side_data()
            .iter()
            .filter(|sd| sd.data_type != SideDataType::SliceAddress);

        let mut side_data = Vec::new();
        let count = extra.clone().count();
        side_data
            .try_reserve_exact(count)
            .map_err(|_| TileRepackError::OutOfMemory {
                needed: count * std::mem::size_of::<SideData>(),
            })?;
        side_data.extend(extra.cloned());

        Ok(Self {
            pts: packet.pts,
            dts: packet.dts,
            pos: packet.pos,
            stream_index: packet.stream_index,
            flags: packet.flags,
            side_data,
        })
    }

    fn into_packet(self, data: Vec<u8>) -> Packet {
        let mut packet = Packet::new(data)
            .with_timestamps(self.pts, self.dts)
            .with_stream_index(self.stream_index)
            .with_flags(self.flags);
        packet.pos = self.pos;
        for sd in self.side_data {
            packet.add_side_data(sd);
        }
        packet
    }
}

/// Reassembles per-tile packets into whole-frame packets.
///
/// Holds at most one frame's worth of tiles. Dropping the filter releases all
/// buffered tiles.
#[derive(Debug)]
pub struct HevcTileRepack {
    /// One slot per tile; a filled slot shares the input packet's storage.
    slots: Box<[Option<Bytes>]>,
    /// Number of filled slots.
    position: usize,
    /// Timing of the first tile received for the current frame.
    timing: Option<TileTiming>,
    /// Properties of tile 0, once received.
    props: Option<FrameProps>,
}

impl HevcTileRepack {
    /// Create a filter for the given configuration.
    pub fn new(config: TileRepackConfig) -> std::result::Result<Self, TileRepackError> {
        info!(tile_num = config.tile_num, codec = %VideoCodec::H265, "number of tiles");
        config.validate()?;

        let tile_count = config.tile_num as usize;
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(tile_count)
            .map_err(|_| TileRepackError::OutOfMemory {
                needed: tile_count * std::mem::size_of::<Option<Bytes>>(),
            })?;
        slots.resize(tile_count, None);

        Ok(Self {
            slots: slots.into_boxed_slice(),
            position: 0,
            timing: None,
            props: None,
        })
    }

    /// Number of tiles per frame.
    pub fn tile_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of tiles received for the frame in progress.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Check whether a given tile of the current frame has been received.
    pub fn has_tile(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(Option::is_some)
    }

    /// Pull at most one tile from `source` and emit a frame once all tiles are in.
    ///
    /// Any error discards the frame in progress; the next call starts a new one.
    pub fn try_filter(
        &mut self,
        source: &mut dyn PacketSource,
    ) -> std::result::Result<FilterOutput, TileRepackError> {
        debug!(position = self.position, tile_num = self.tile_count(), "filter");

        let result = self.step(source);
        if let Err(e) = &result {
            error!(error = %e, discarded = self.position, "dropping frame in progress");
            self.reset();
        }
        result
    }

    fn step(
        &mut self,
        source: &mut dyn PacketSource,
    ) -> std::result::Result<FilterOutput, TileRepackError> {
        if self.position < self.tile_count() {
            match source.next_packet() {
                SourceStatus::Ready(packet) => self.absorb(packet)?,
                SourceStatus::Pending => return Ok(FilterOutput::NeedMoreInput),
                SourceStatus::EndOfStream => {
                    if self.position > 0 {
                        debug!(discarded = self.position, "incomplete frame at end of stream");
                        self.reset();
                    }
                    return Ok(FilterOutput::EndOfStream);
                }
            }
        }

        if self.position == self.tile_count() {
            return self.assemble().map(FilterOutput::Packet);
        }
        Ok(FilterOutput::NeedMoreInput)
    }

    /// Validate one tile packet and move it into its slot.
    fn absorb(&mut self, packet: Packet) -> std::result::Result<(), TileRepackError> {
        let index = usize::from(
            extract_tile_index(&packet).ok_or(TileRepackError::MissingTileMarker)?,
        );
        if index >= self.tile_count() {
            return Err(TileRepackError::TileIndexOutOfRange {
                index,
                tile_count: self.tile_count(),
            });
        }

        if self.slots[index].is_some() {
            return Err(TileRepackError::DuplicateTile { index });
        }

        let timing = TileTiming::of(&packet);
        match &self.timing {
            None => self.timing = Some(timing),
            Some(reference) => {
                if let Some(field) = reference.mismatch(&timing) {
                    return Err(TileRepackError::MetadataMismatch { index, field });
                }
            }
        }

        if index == 0 {
            self.props = Some(FrameProps::from_tile(&packet)?);
        }

        debug!(tile = index, size = packet.size(), "tile received");
        self.slots[index] = Some(packet.buffer().clone());
        self.position += 1;
        Ok(())
    }

    /// Splice a complete set of tiles into one frame packet.
    fn assemble(&mut self) -> std::result::Result<Packet, TileRepackError> {
        let max_size: usize = self.slots.iter().flatten().map(Bytes::len).sum();
        let mut data = Vec::new();
        data.try_reserve_exact(max_size)
            .map_err(|_| TileRepackError::OutOfMemory { needed: max_size })?;

        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some(tile) = slot.take() else {
                continue;
            };
            if index == 0 {
                data.extend_from_slice(&tile);
                debug!(tile = 0, size = tile.len(), "leading tile copied");
            } else {
                let before = data.len();
                append_coded_slices(&tile, &mut data);
                debug!(tile = index, size = data.len() - before, "tile slices copied");
            }
        }

        let props = self.props.take().unwrap_or_default();
        self.reset();

        debug!(size = data.len(), "repacked frame");
        Ok(props.into_packet(data))
    }

    /// Release all tiles and start a fresh frame.
    fn reset(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.position = 0;
        self.timing = None;
        self.props = None;
    }
}

/// Append every coded-slice unit of `payload`, start codes included.
fn append_coded_slices(payload: &[u8], out: &mut Vec<u8>) {
    for unit in coded_slices(payload) {
        out.extend_from_slice(unit.bytes(payload));
    }
}

impl BitstreamFilter for HevcTileRepack {
    fn name(&self) -> &'static str {
        FILTER_NAME
    }

    fn codecs(&self) -> &'static [VideoCodec] {
        CODECS
    }

    fn filter(&mut self, source: &mut dyn PacketSource) -> transcode_core::Result<FilterOutput> {
        self.try_filter(source).map_err(Into::into)
    }

    fn flush(&mut self) {
        if self.position > 0 {
            debug!(discarded = self.position, "flush");
        }
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use transcode_core::timestamp::TimeBase;

    fn tile(index: u8, payload: &[u8], pts: i64) -> Packet {
        Packet::new(payload.to_vec())
            .with_timestamps(
                Timestamp::new(pts, TimeBase::MPEG),
                Timestamp::new(pts, TimeBase::MPEG),
            )
            .with_tile_index(index)
    }

    fn run(filter: &mut HevcTileRepack, packets: Vec<Packet>) -> Vec<Packet> {
        let mut queue: VecDeque<Packet> = packets.into();
        let mut out = Vec::new();
        loop {
            match filter.try_filter(&mut queue).unwrap() {
                FilterOutput::Packet(p) => out.push(p),
                FilterOutput::NeedMoreInput if queue.is_empty() => return out,
                FilterOutput::NeedMoreInput => {}
                FilterOutput::EndOfStream => return out,
            }
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(TileRepackConfig::new(1).validate().is_ok());
        assert!(TileRepackConfig::new(255).validate().is_ok());
        assert_eq!(TileRepackConfig::default().with_tile_num(4), TileRepackConfig::new(4));
        assert_eq!(
            TileRepackConfig::default().validate(),
            Err(TileRepackError::InvalidTileCount(0))
        );
        assert_eq!(
            HevcTileRepack::new(TileRepackConfig::new(256)).unwrap_err(),
            TileRepackError::InvalidTileCount(256)
        );
    }

    #[test]
    fn test_config_from_options() {
        let config = TileRepackConfig::from_options("tile_num=4").unwrap();
        assert_eq!(config.tile_num, 4);
        assert_eq!(TileRepackConfig::from_options("").unwrap().tile_num, 0);
        assert!(TileRepackConfig::from_options("tile_num").is_err());
        assert!(TileRepackConfig::from_options("tile_num=four").is_err());
        assert!(TileRepackConfig::from_options("tiles=4").is_err());
    }

    #[test]
    fn test_single_tile_passthrough() {
        let mut filter = HevcTileRepack::new(TileRepackConfig::new(1)).unwrap();
        let payload = [0x00, 0x00, 0x01, 0x40, 0x01, 0x00, 0x00, 0x01, 0x26, 0x01];
        let out = run(&mut filter, vec![tile(0, &payload, 7)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].data(), &payload);
        assert_eq!(out[0].pts, Timestamp::new(7, TimeBase::MPEG));
    }

    #[test]
    fn test_need_more_input_until_complete() {
        let mut filter = HevcTileRepack::new(TileRepackConfig::new(2)).unwrap();
        let mut queue: VecDeque<Packet> = VecDeque::new();

        assert!(matches!(filter.try_filter(&mut queue), Ok(FilterOutput::NeedMoreInput)));

        queue.push_back(tile(1, &[0x00, 0x00, 0x01, 0x02, 0xCC], 0));
        assert!(matches!(filter.try_filter(&mut queue), Ok(FilterOutput::NeedMoreInput)));
        assert_eq!(filter.position(), 1);
        assert!(filter.has_tile(1));
        assert!(!filter.has_tile(0));

        queue.push_back(tile(0, &[0x00, 0x00, 0x01, 0x26, 0xAA], 0));
        let out = filter.try_filter(&mut queue).unwrap().into_packet().unwrap();
        assert_eq!(out.size(), 10);
        assert_eq!(filter.position(), 0);
    }

    #[test]
    fn test_side_data_from_tile_zero() {
        let mut filter = HevcTileRepack::new(TileRepackConfig::new(2)).unwrap();
        let mut t0 = tile(0, &[0x00, 0x00, 0x01, 0x26, 0xAA], 0);
        t0.add_side_data(SideData::new(SideDataType::A53ClosedCaptions, vec![9u8, 9]));
        let mut t1 = tile(1, &[0x00, 0x00, 0x01, 0x02, 0xBB], 0);
        t1.add_side_data(SideData::new(SideDataType::DisplayMatrix, vec![1u8]));

        let out = run(&mut filter, vec![t0, t1]);
        let sd = out[0].side_data();
        assert_eq!(sd.len(), 1);
        assert_eq!(sd[0].data_type, SideDataType::A53ClosedCaptions);
        assert!(extract_tile_index(&out[0]).is_none());
    }

    #[test]
    fn test_high_tile_indices() {
        let mut filter = HevcTileRepack::new(TileRepackConfig::new(200)).unwrap();
        let mut queue: VecDeque<Packet> = vec![tile(199, &[0x00, 0x00, 0x01, 0x02, 0x01], 0)].into();
        assert!(matches!(filter.try_filter(&mut queue), Ok(FilterOutput::NeedMoreInput)));
        assert!(filter.has_tile(199));

        let mut queue: VecDeque<Packet> = vec![tile(200, &[0x00, 0x00, 0x01, 0x02, 0x01], 0)].into();
        assert_eq!(
            filter.try_filter(&mut queue).unwrap_err(),
            TileRepackError::TileIndexOutOfRange { index: 200, tile_count: 200 }
        );
    }

    #[test]
    fn test_error_discards_frame_in_progress() {
        let mut filter = HevcTileRepack::new(TileRepackConfig::new(3)).unwrap();
        let mut queue: VecDeque<Packet> = vec![
            tile(0, &[0x00, 0x00, 0x01, 0x26], 0),
            Packet::new(vec![0u8; 4]),
        ]
        .into();
        assert!(filter.try_filter(&mut queue).is_ok());
        assert_eq!(
            filter.try_filter(&mut queue).unwrap_err(),
            TileRepackError::MissingTileMarker
        );
        assert_eq!(filter.position(), 0);
        assert!(!filter.has_tile(0));
    }

    #[test]
    fn test_end_of_stream_drops_partial_frame() {
        struct Ended;
        impl PacketSource for Ended {
            fn next_packet(&mut self) -> SourceStatus {
                SourceStatus::EndOfStream
            }
        }

        let mut filter = HevcTileRepack::new(TileRepackConfig::new(2)).unwrap();
        let mut queue: VecDeque<Packet> = vec![tile(0, &[0x00, 0x00, 0x01, 0x26], 0)].into();
        filter.try_filter(&mut queue).unwrap();
        assert_eq!(filter.position(), 1);

        assert!(matches!(filter.try_filter(&mut Ended), Ok(FilterOutput::EndOfStream)));
        assert_eq!(filter.position(), 0);
    }

    #[test]
    fn test_append_coded_slices_skips_non_vcl() {
        let payload = [
            0x00, 0x00, 0x01, 0x44, 0x01, // PPS
            0x00, 0x00, 0x01, 0x02, 0x11, // TRAIL_R
            0x00, 0x00, 0x01, 0x50, 0x01, // SUFFIX_SEI
        ];
        let mut out = Vec::new();
        append_coded_slices(&payload, &mut out);
        assert_eq!(out, vec![0x00, 0x00, 0x01, 0x02, 0x11]);
    }

    #[test]
    fn test_filter_trait() {
        let mut filter = HevcTileRepack::new(TileRepackConfig::new(2)).unwrap();
        assert_eq!(BitstreamFilter::name(&filter), FILTER_NAME);
        assert_eq!(filter.codecs(), &[VideoCodec::H265]);

        let mut queue: VecDeque<Packet> = vec![Packet::empty()].into();
        let err = BitstreamFilter::filter(&mut filter, &mut queue).unwrap_err();
        assert_eq!(
            err.filter_error::<TileRepackError>(),
            Some(&TileRepackError::MissingTileMarker)
        );
    }
}

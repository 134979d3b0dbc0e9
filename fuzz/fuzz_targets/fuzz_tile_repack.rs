#![no_main]

//! Fuzz target for the HEVC tile repack filter.
//!
//! Feeds arbitrary tile packets (marker, payload, timestamps) through the
//! filter and checks that every emitted frame starts with tile 0's payload.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use transcode_core::{BitstreamFilter, FilterOutput, Packet, TimeBase, Timestamp};
use transcode_hevc::{HevcTileRepack, TileRepackConfig};

#[derive(Arbitrary, Debug)]
struct TileRepackInput {
    tile_num: u8,
    tiles: Vec<TileInput>,
    flush_after: Option<u8>,
}

#[derive(Arbitrary, Debug)]
struct TileInput {
    /// None leaves the tile marker off
    index: Option<u8>,
    pts: i8,
    keyframe: bool,
    data: Vec<u8>,
}

fuzz_target!(|input: TileRepackInput| {
    // Limit input size
    if input.tiles.len() > 512 || input.tiles.iter().any(|t| t.data.len() > 64 * 1024) {
        return;
    }

    let mut filter = match HevcTileRepack::new(TileRepackConfig::new(input.tile_num as u32)) {
        Ok(filter) => filter,
        Err(_) => {
            assert_eq!(input.tile_num, 0);
            return;
        }
    };

    let mut tile_zero: Option<Vec<u8>> = None;
    for (i, tile) in input.tiles.into_iter().enumerate() {
        if input.flush_after.map_or(false, |n| n as usize == i) {
            filter.flush();
            tile_zero = None;
        }

        let pts = Timestamp::new(tile.pts as i64, TimeBase::MPEG);
        let mut packet = Packet::new(tile.data.clone()).with_timestamps(pts, pts);
        packet.set_keyframe(tile.keyframe);
        if let Some(index) = tile.index {
            packet.set_tile_index(index);
        }

        let mut source = std::collections::VecDeque::from([packet]);
        match filter.try_filter(&mut source) {
            Ok(FilterOutput::Packet(frame)) => {
                let head = if tile.index == Some(0) {
                    Some(tile.data)
                } else {
                    tile_zero.take()
                };
                if let Some(head) = head {
                    assert!(frame.data().starts_with(&head));
                }
                assert_eq!(filter.position(), 0);
                tile_zero = None;
            }
            Ok(_) => {
                if tile.index == Some(0) {
                    tile_zero = Some(tile.data);
                }
            }
            Err(_) => {
                assert_eq!(filter.position(), 0);
                tile_zero = None;
            }
        }
    }
});

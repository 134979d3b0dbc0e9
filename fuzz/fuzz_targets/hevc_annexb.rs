#![no_main]

//! Fuzz target for Annex-B NAL unit scanning.

use libfuzzer_sys::fuzz_target;
use transcode_hevc::nal::{coded_slices, AnnexBUnits};

fuzz_target!(|data: &[u8]| {
    let mut prev_end: Option<usize> = None;
    for unit in AnnexBUnits::new(data) {
        // Consecutive units are contiguous
        if let Some(end) = prev_end {
            assert_eq!(unit.start, end);
        }
        assert!(unit.header < unit.end);
        assert!(unit.end <= data.len());
        assert_eq!(&data[unit.header - 3..unit.header], &[0x00, 0x00, 0x01]);
        let _ = unit.nal_type.to_string();
        prev_end = Some(unit.end);
    }
    if let Some(end) = prev_end {
        assert_eq!(end, data.len());
    }
    assert!(coded_slices(data).all(|u| u.nal_type.is_vcl()));
});

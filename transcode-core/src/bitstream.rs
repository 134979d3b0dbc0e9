//! Annex-B byte stream helpers.
//!
//! H.264 and H.265 elementary streams delimit NAL units with a start code:
//! `00 00 01`, optionally preceded by one extra zero byte (`00 00 00 01`).

/// Find the first start code in a byte slice.
///
/// Returns `(offset, length)` where `offset` points at the first byte of the
/// start code and `length` is 3 or 4. A four-byte start code is reported when
/// the three-byte pattern is preceded by a zero byte.
pub fn find_start_code(data: &[u8]) -> Option<(usize, usize)> {
    let pos = data.windows(3).position(|w| w == [0, 0, 1])?;
    if pos > 0 && data[pos - 1] == 0 {
        Some((pos - 1, 4))
    } else {
        Some((pos, 3))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_start_code() {
        let data = [0x00, 0x00, 0x01, 0x65];
        assert_eq!(find_start_code(&data), Some((0, 3)));

        let data = [0x00, 0x00, 0x00, 0x01, 0x65];
        assert_eq!(find_start_code(&data), Some((0, 4)));

        let data = [0xFF, 0x00, 0x00, 0x01, 0x65];
        assert_eq!(find_start_code(&data), Some((1, 3)));
    }

    #[test]
    fn test_find_start_code_long_zero_run() {
        // Only the zero byte adjacent to the pattern belongs to the start code.
        let data = [0x00, 0x00, 0x00, 0x00, 0x01, 0x40];
        assert_eq!(find_start_code(&data), Some((1, 4)));
    }

    #[test]
    fn test_find_start_code_none() {
        assert_eq!(find_start_code(&[]), None);
        assert_eq!(find_start_code(&[0x00, 0x00]), None);
        assert_eq!(find_start_code(&[0x00, 0x00, 0x02, 0x01]), None);
    }
}

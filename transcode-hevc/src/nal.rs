//! HEVC NAL unit types and Annex-B unit scanning.
//!
//! [`AnnexBUnits`] walks a byte-stream payload lazily and reports where each
//! NAL unit sits, without copying or unescaping anything. Byte ranges include
//! the unit's start code so they can be spliced straight into another
//! Annex-B stream.

use std::fmt;
use std::iter::FusedIterator;
use std::ops::Range;
use transcode_core::bitstream::find_start_code;

/// HEVC NAL unit types (the 6-bit `nal_unit_type` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NalUnitType {
    /// Trailing picture, non-reference.
    TrailN,
    /// Trailing picture, reference.
    TrailR,
    /// Temporal sub-layer access, non-reference.
    TsaN,
    /// Temporal sub-layer access, reference.
    TsaR,
    /// Stepwise temporal sub-layer access, non-reference.
    StsaN,
    /// Stepwise temporal sub-layer access, reference.
    StsaR,
    /// Random access decodable leading, non-reference.
    RadlN,
    /// Random access decodable leading, reference.
    RadlR,
    /// Random access skipped leading, non-reference.
    RaslN,
    /// Random access skipped leading, reference.
    RaslR,
    /// Broken link access, W leading picture.
    BlaWLp,
    /// Broken link access, W random access decodable leading.
    BlaWRadl,
    /// Broken link access, N leading picture.
    BlaNLp,
    /// Instantaneous decoder refresh, W random access decodable leading.
    IdrWRadl,
    /// Instantaneous decoder refresh, N leading picture.
    IdrNLp,
    /// Clean random access.
    CraNut,
    /// Reserved VCL types 10..=15 and 22..=31.
    RsvVcl(u8),
    /// Video Parameter Set.
    VpsNut,
    /// Sequence Parameter Set.
    SpsNut,
    /// Picture Parameter Set.
    PpsNut,
    /// Access Unit Delimiter.
    AudNut,
    /// End of Sequence.
    EosNut,
    /// End of Bitstream.
    EobNut,
    /// Filler Data.
    FdNut,
    /// Prefix Supplemental Enhancement Information.
    PrefixSeiNut,
    /// Suffix Supplemental Enhancement Information.
    SuffixSeiNut,
    /// Reserved non-VCL types 41..=47.
    RsvNvcl(u8),
    /// Unspecified, 48..=63.
    Unspecified(u8),
}

impl NalUnitType {
    /// Create from raw value; only the low 6 bits are used.
    pub fn from_raw(value: u8) -> Self {
        match value & 0x3F {
            0 => Self::TrailN,
            1 => Self::TrailR,
            2 => Self::TsaN,
            3 => Self::TsaR,
            4 => Self::StsaN,
            5 => Self::StsaR,
            6 => Self::RadlN,
            7 => Self::RadlR,
            8 => Self::RaslN,
            9 => Self::RaslR,
            16 => Self::BlaWLp,
            17 => Self::BlaWRadl,
            18 => Self::BlaNLp,
            19 => Self::IdrWRadl,
            20 => Self::IdrNLp,
            21 => Self::CraNut,
            32 => Self::VpsNut,
            33 => Self::SpsNut,
            34 => Self::PpsNut,
            35 => Self::AudNut,
            36 => Self::EosNut,
            37 => Self::EobNut,
            38 => Self::FdNut,
            39 => Self::PrefixSeiNut,
            40 => Self::SuffixSeiNut,
            v @ 0..=31 => Self::RsvVcl(v),
            v @ 41..=47 => Self::RsvNvcl(v),
            v => Self::Unspecified(v),
        }
    }

    /// Extract the type from the first NAL header byte.
    pub fn from_header_byte(byte: u8) -> Self {
        Self::from_raw(byte >> 1)
    }

    /// Get the raw value.
    pub fn to_raw(&self) -> u8 {
        match self {
            Self::TrailN => 0,
            Self::TrailR => 1,
            Self::TsaN => 2,
            Self::TsaR => 3,
            Self::StsaN => 4,
            Self::StsaR => 5,
            Self::RadlN => 6,
            Self::RadlR => 7,
            Self::RaslN => 8,
            Self::RaslR => 9,
            Self::BlaWLp => 16,
            Self::BlaWRadl => 17,
            Self::BlaNLp => 18,
            Self::IdrWRadl => 19,
            Self::IdrNLp => 20,
            Self::CraNut => 21,
            Self::VpsNut => 32,
            Self::SpsNut => 33,
            Self::PpsNut => 34,
            Self::AudNut => 35,
            Self::EosNut => 36,
            Self::EobNut => 37,
            Self::FdNut => 38,
            Self::PrefixSeiNut => 39,
            Self::SuffixSeiNut => 40,
            Self::RsvVcl(v) | Self::RsvNvcl(v) | Self::Unspecified(v) => *v,
        }
    }

    /// Check if this is a VCL (coded slice) NAL unit, types 0..=31.
    pub fn is_vcl(&self) -> bool {
        self.to_raw() <= 31
    }
}

impl fmt::Display for NalUnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RsvVcl(v) => write!(f, "RSV_VCL({})", v),
            Self::RsvNvcl(v) => write!(f, "RSV_NVCL({})", v),
            Self::Unspecified(v) => write!(f, "UNSPEC({})", v),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Location of one NAL unit inside an Annex-B payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NalUnitSpan {
    /// Unit type read from the header byte.
    pub nal_type: NalUnitType,
    /// Offset of the start code (including a leading zero byte, if any).
    pub start: usize,
    /// Offset of the first NAL header byte.
    pub header: usize,
    /// Offset one past the last byte of the unit.
    pub end: usize,
}

impl NalUnitSpan {
    /// Byte range of the unit, start code included.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Length of the unit, start code included.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if the span is empty (never true for scanned units).
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// Check if the unit carries coded picture data.
    pub fn is_coded_slice(&self) -> bool {
        self.nal_type.is_vcl()
    }

    /// Borrow the unit's bytes from the payload it was scanned from.
    pub fn bytes<'a>(&self, payload: &'a [u8]) -> &'a [u8] {
        &payload[self.range()]
    }
}

/// Lazy scanner over the NAL units of an Annex-B payload.
///
/// Bytes before the first start code belong to no unit. A start code with no
/// byte after it does not open a unit; it stays part of the preceding one.
#[derive(Debug, Clone)]
pub struct AnnexBUnits<'a> {
    data: &'a [u8],
    next: Option<(usize, usize)>,
}

impl<'a> AnnexBUnits<'a> {
    /// Start scanning `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            next: next_boundary(data, 0),
        }
    }
}

/// Next start code at or after `from` that is followed by a header byte.
fn next_boundary(data: &[u8], from: usize) -> Option<(usize, usize)> {
    let (offset, len) = find_start_code(data.get(from..)?)?;
    let start = from + offset;
    (start + len < data.len()).then_some((start, len))
}

impl Iterator for AnnexBUnits<'_> {
    type Item = NalUnitSpan;

    fn next(&mut self) -> Option<Self::Item> {
        let (start, sc_len) = self.next.take()?;
        let header = start + sc_len;
        let nal_type = NalUnitType::from_header_byte(self.data[header]);

        self.next = next_boundary(self.data, header + 1);
        let end = self.next.map_or(self.data.len(), |(next_start, _)| next_start);

        Some(NalUnitSpan {
            nal_type,
            start,
            header,
            end,
        })
    }
}

impl FusedIterator for AnnexBUnits<'_> {}

/// Iterate only the coded-slice units of a payload.
pub fn coded_slices(data: &[u8]) -> impl Iterator<Item = NalUnitSpan> + '_ {
    AnnexBUnits::new(data).filter(NalUnitSpan::is_coded_slice)
}

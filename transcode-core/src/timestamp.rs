//! Timestamp and time base handling.
//!
//! Packet timestamps are compared exactly: two timestamps are equal only when
//! both the raw value and the time base match.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A time base for interpreting timestamp values.
///
/// Common time bases:
/// - 1/90000 for MPEG-TS
/// - 1/1000 for milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeBase {
    /// Numerator.
    pub num: i32,
    /// Denominator (positive).
    pub den: i32,
}

impl TimeBase {
    /// Create a new time base from numerator and denominator.
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// Standard MPEG time base (1/90000).
    pub const MPEG: Self = Self::new(1, 90000);

    /// Millisecond time base (1/1000).
    pub const MILLISECONDS: Self = Self::new(1, 1000);

    /// Convert a value in this time base to seconds.
    pub fn to_seconds(&self, value: i64) -> f64 {
        if self.den == 0 {
            return 0.0;
        }
        value as f64 * self.num as f64 / self.den as f64
    }
}

impl Default for TimeBase {
    fn default() -> Self {
        Self::MPEG
    }
}

impl From<(i32, i32)> for TimeBase {
    fn from((num, den): (i32, i32)) -> Self {
        Self::new(num, den)
    }
}

/// A timestamp with an associated time base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    /// The raw timestamp value.
    pub value: i64,
    /// The time base for interpreting the value.
    pub time_base: TimeBase,
}

impl Timestamp {
    /// Value representing an undefined timestamp.
    pub const NONE: i64 = i64::MIN;

    /// Create a new timestamp.
    pub fn new(value: i64, time_base: TimeBase) -> Self {
        Self { value, time_base }
    }

    /// Create an undefined timestamp.
    pub fn none() -> Self {
        Self {
            value: Self::NONE,
            time_base: TimeBase::default(),
        }
    }

    /// Check if this timestamp is defined.
    pub fn is_valid(&self) -> bool {
        self.value != Self::NONE
    }

    /// Convert to seconds.
    pub fn to_seconds(&self) -> Option<f64> {
        self.is_valid().then(|| self.time_base.to_seconds(self.value))
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}@{}/{}", self.value, self.time_base.num, self.time_base.den)
        } else {
            write!(f, "NONE")
        }
    }
}

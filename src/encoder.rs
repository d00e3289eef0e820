//! Fixed 8-byte uplink payload.
//!
//! Layout, all fields big-endian two's complement:
//!
//! | bytes | field     | unit              |
//! |-------|-----------|-------------------|
//! | 0..3  | latitude  | degrees × 10 000  |
//! | 3..6  | longitude | degrees × 10 000  |
//! | 6..8  | altitude  | meters            |
//!
//! Values that don't fit their field keep only their low bits, the same
//! truncation decoders on the network side already expect. Use
//! [`EncodedPosition::encode_checked`] or [`in_range`] to catch that.

use crate::error::Error;

pub const PAYLOAD_LEN: usize = 8;
pub const COORD_SCALE: f32 = 10_000.0;

const I24_MAX: f64 = ((1 << 23) - 1) as f64;
const I24_MIN: f64 = -(1 << 23) as f64;

// From here on every f64 is a whole number
const TWO_POW_52: f64 = 4_503_599_627_370_496.0;
const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EncodedPosition([u8; PAYLOAD_LEN]);

impl EncodedPosition {
    pub fn encode(latitude: f32, longitude: f32, altitude: f32) -> Self {
        let (lat, lon, alt) = scale(latitude, longitude, altitude);

        let mut out = [0u8; PAYLOAD_LEN];
        out[0..3].copy_from_slice(&low_bits(lat, 24).to_be_bytes()[1..]);
        out[3..6].copy_from_slice(&low_bits(lon, 24).to_be_bytes()[1..]);
        out[6..8].copy_from_slice(&low_bits(alt, 16).to_be_bytes()[2..]);
        Self(out)
    }

    /// Like [`encode`](Self::encode) but refuses values that would be truncated.
    pub fn encode_checked(latitude: f32, longitude: f32, altitude: f32) -> crate::Result<Self> {
        if in_range(latitude, longitude, altitude) {
            Ok(Self::encode(latitude, longitude, altitude))
        } else {
            Err(Error::OutOfRange)
        }
    }

    pub fn as_bytes(&self) -> &[u8; PAYLOAD_LEN] {
        &self.0
    }

    /// Decodes the scaled fields back, sign-extending each one.
    pub fn fields(&self) -> (i32, i32, i16) {
        let b = &self.0;
        let lat = i32::from_be_bytes([b[0], b[1], b[2], 0]) >> 8;
        let lon = i32::from_be_bytes([b[3], b[4], b[5], 0]) >> 8;
        let alt = i16::from_be_bytes([b[6], b[7]]);
        (lat, lon, alt)
    }
}

/// True when every scaled value fits its field without truncation.
pub fn in_range(latitude: f32, longitude: f32, altitude: f32) -> bool {
    let (lat, lon, alt) = scale(latitude, longitude, altitude);
    (I24_MIN..=I24_MAX).contains(&lat)
        && (I24_MIN..=I24_MAX).contains(&lon)
        && (i16::MIN as f64..=i16::MAX as f64).contains(&alt)
}

fn scale(latitude: f32, longitude: f32, altitude: f32) -> (f64, f64, f64) {
    let factor = COORD_SCALE as f64;
    (
        round(latitude as f64 * factor),
        round(longitude as f64 * factor),
        round(altitude as f64),
    )
}

/// Rounds half away from zero without going through a narrower integer.
fn round(x: f64) -> f64 {
    if !(x > -TWO_POW_52 && x < TWO_POW_52) {
        return x;
    }
    let whole = x as i64 as f64;
    let frac = x - whole;
    if frac >= 0.5 {
        whole + 1.0
    } else if frac <= -0.5 {
        whole - 1.0
    } else {
        whole
    }
}

/// Two's complement low `bits` bits of the whole number `x`. NaN gives 0.
fn low_bits(x: f64, bits: u32) -> u32 {
    // An f32 scaled past 2^63 is a multiple of 2^30, so its low bits are all zero
    if !(x > -TWO_POW_63 && x < TWO_POW_63) {
        return 0;
    }
    (x as i64).rem_euclid(1 << bits) as u32
}

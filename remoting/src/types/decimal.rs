//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//


use std::fmt;

const SIGN_MASK: u32 = 0x8000_0000;
const SCALE_MASK: u32 = 0x00FF_0000;
const SCALE_SHIFT: u32 = 16;
const MANTISSA_LIMIT: u128 = 1 << 96;

/// A 128-bit decimal number: a 96-bit unsigned mantissa, a sign and a power
/// of ten scale between 0 and 28.
///
/// The value is `(-1)^sign * mantissa / 10^scale`. Two decimals with the same
/// value but different scales (`1.0` and `1.00`) are distinct and keep their
/// scale across the wire.
///
/// # Examples
///
/// ```rust
/// use remoting::types::Decimal;
///
/// let price = Decimal::new(-12345, 2).unwrap();
/// assert_eq!(price.to_string(), "-123.45");
/// assert_eq!(price.scale(), 2);
/// assert_eq!(Decimal::from_bits(price.to_bits()), Some(price));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Decimal {
    lo: u32,
    mid: u32,
    hi: u32,
    flags: u32,
}

impl Decimal {
    /// Largest scale a decimal may carry.
    pub const MAX_SCALE: u32 = 28;

    /// Zero with scale 0.
    pub const ZERO: Self = Self {
        lo: 0,
        mid: 0,
        hi: 0,
        flags: 0,
    };

    /// The largest representable value, `2^96 - 1`.
    pub const MAX: Self = Self {
        lo: u32::MAX,
        mid: u32::MAX,
        hi: u32::MAX,
        flags: 0,
    };

    /// The smallest representable value, `-(2^96 - 1)`.
    pub const MIN: Self = Self {
        lo: u32::MAX,
        mid: u32::MAX,
        hi: u32::MAX,
        flags: SIGN_MASK,
    };

    /// Builds `mantissa / 10^scale`. Returns `None` when the mantissa does not
    /// fit in 96 bits or the scale exceeds [`Decimal::MAX_SCALE`].
    pub fn new(mantissa: i128, scale: u32) -> Option<Self> {
        let magnitude = mantissa.unsigned_abs();
        if magnitude >= MANTISSA_LIMIT || scale > Self::MAX_SCALE {
            return None;
        }
        let sign = if mantissa < 0 { SIGN_MASK } else { 0 };
        Some(Self {
            lo: magnitude as u32,
            mid: (magnitude >> 32) as u32,
            hi: (magnitude >> 64) as u32,
            flags: sign | (scale << SCALE_SHIFT),
        })
    }

    /// Rebuilds a decimal from its four wire words `[lo, mid, hi, flags]`.
    /// Returns `None` when unused flag bits are set or the scale is invalid.
    pub fn from_bits(bits: [u32; 4]) -> Option<Self> {
        let [lo, mid, hi, flags] = bits;
        if flags & !(SIGN_MASK | SCALE_MASK) != 0 {
            return None;
        }
        if (flags & SCALE_MASK) >> SCALE_SHIFT > Self::MAX_SCALE {
            return None;
        }
        Some(Self { lo, mid, hi, flags })
    }

    /// The four wire words `[lo, mid, hi, flags]`.
    pub const fn to_bits(self) -> [u32; 4] {
        [self.lo, self.mid, self.hi, self.flags]
    }

    /// Signed mantissa.
    pub fn mantissa(self) -> i128 {
        let magnitude = self.magnitude() as i128;
        if self.is_sign_negative() {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Power of ten the mantissa is divided by.
    pub const fn scale(self) -> u32 {
        (self.flags & SCALE_MASK) >> SCALE_SHIFT
    }

    /// Whether the sign bit is set. Negative zero is preserved.
    pub const fn is_sign_negative(self) -> bool {
        self.flags & SIGN_MASK != 0
    }

    fn magnitude(self) -> u128 {
        u128::from(self.lo) | (u128::from(self.mid) << 32) | (u128::from(self.hi) << 64)
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        // Any i64 fits in 96 bits.
        let magnitude = u128::from(value.unsigned_abs());
        Self {
            lo: magnitude as u32,
            mid: (magnitude >> 32) as u32,
            hi: 0,
            flags: if value < 0 { SIGN_MASK } else { 0 },
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.magnitude().to_string();
        let scale = self.scale() as usize;
        let sign = if self.is_sign_negative() { "-" } else { "" };
        if scale == 0 {
            return write!(f, "{sign}{digits}");
        }
        let padded = format!("{digits:0>width$}", width = scale + 1);
        let (whole, fraction) = padded.split_at(padded.len() - scale);
        write!(f, "{sign}{whole}.{fraction}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Decimal::new(5, 3).unwrap().to_string(), "0.005");
        assert_eq!(Decimal::new(-150, 1).unwrap().to_string(), "-15.0");
        assert_eq!(Decimal::from(42).to_string(), "42");
        assert_eq!(Decimal::MAX.to_string(), "79228162514264337593543950335");
        assert_eq!(Decimal::MIN.to_string(), "-79228162514264337593543950335");
    }

    #[test]
    fn test_bounds() {
        assert!(Decimal::new(1, 29).is_none());
        assert!(Decimal::new(1 << 96, 0).is_none());
        assert_eq!(Decimal::new((1 << 96) - 1, 0), Some(Decimal::MAX));
        assert_eq!(Decimal::from(i64::MIN).mantissa(), i128::from(i64::MIN));
    }

    #[test]
    fn test_from_bits_rejects_garbage_flags() {
        assert!(Decimal::from_bits([0, 0, 0, 1]).is_none());
        assert!(Decimal::from_bits([0, 0, 0, 29 << 16]).is_none());
        assert_eq!(Decimal::from_bits([7, 0, 0, 2 << 16]), Decimal::new(7, 2));
    }
}

// Licensed under the Apache-2.0 license

//! Bit-range arithmetic over half-open ranges `[start, end)` of a register
//! value.

use std::ops::Range;

/// Mask with every bit of `bits` set.
///
/// ```
/// use registers_generator::bits::mask;
/// assert_eq!(mask(4..8), 0xf0);
/// assert_eq!(mask(0..64), u64::MAX);
/// ```
pub fn mask(bits: Range<u32>) -> u64 {
    let width = bits.end.saturating_sub(bits.start);
    let low = match width {
        0 => return 0,
        64.. => u64::MAX,
        w => (1u64 << w) - 1,
    };
    low.checked_shl(bits.start).unwrap_or(0)
}

/// The value stored in `bits`, shifted down to bit 0.
pub fn extract(value: u64, bits: Range<u32>) -> u64 {
    let start = bits.start;
    (value & mask(bits)).checked_shr(start).unwrap_or(0)
}

/// `value` with `bits` replaced by `field`. Bits of `field` that do not fit
/// are discarded.
pub fn insert(value: u64, bits: Range<u32>, field: u64) -> u64 {
    let start = bits.start;
    let mask = mask(bits);
    (value & !mask) | (field.checked_shl(start).unwrap_or(0) & mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask() {
        assert_eq!(mask(0..1), 1);
        assert_eq!(mask(0..32), 0xffff_ffff);
        assert_eq!(mask(63..64), 1 << 63);
        assert_eq!(mask(3..3), 0);
    }

    #[test]
    fn test_extract() {
        assert_eq!(extract(0xabcd, 4..12), 0xbc);
        assert_eq!(extract(u64::MAX, 0..64), u64::MAX);
    }

    #[test]
    fn test_insert_round_trip() {
        let widths = [8u32, 16, 32, 64];
        for width in widths {
            let original = 0xa5a5_a5a5_a5a5_a5a5u64 & mask(0..width);
            for lower in 0..width {
                for upper in lower + 1..=width {
                    let value = 0x1234_5678_9abc_def0u64;
                    let written = insert(original, lower..upper, value);
                    assert_eq!(extract(written, lower..upper), value & mask(0..upper - lower));
                    let outside = !mask(lower..upper);
                    assert_eq!(written & outside, original & outside);
                }
            }
        }
    }

    #[test]
    fn test_insert_truncates() {
        assert_eq!(insert(0, 0..4, 0xff), 0xf);
        assert_eq!(insert(0xff, 2..4, 0), 0xf3);
    }
}

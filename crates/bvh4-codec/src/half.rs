//! IEEE-754 binary16 conversion.
//!
//! Widening is exact for every bit pattern, including subnormals,
//! infinities and NaN payloads, so decoded bounds match what the GPU
//! shader's `unpack2x16float` produces. Narrowing rounds to nearest,
//! ties to even; the directed variants are used by the encoder so a
//! quantized box never shrinks below the geometry it encloses.

const SIGN: u16 = 0x8000;
const EXP_MASK: u16 = 0x7c00;
const MAN_MASK: u16 = 0x03ff;
const QUIET: u16 = 0x0200;

/// Value of one half-precision subnormal step, 2^-24.
const SUBNORMAL_UNIT: f32 = 1.0 / 16_777_216.0;

/// Positive infinity as binary16 bits.
pub const F16_INFINITY: u16 = EXP_MASK;

/// Negative infinity as binary16 bits.
pub const F16_NEG_INFINITY: u16 = SIGN | EXP_MASK;

/// Largest finite binary16 value.
pub const F16_MAX: f32 = 65504.0;

/// True if the bits encode a NaN.
#[inline]
pub fn is_nan_bits(h: u16) -> bool {
    h & EXP_MASK == EXP_MASK && h & MAN_MASK != 0
}

/// Widen binary16 bits to an `f32`.
pub fn f16_bits_to_f32(h: u16) -> f32 {
    let sign = ((h & SIGN) as u32) << 16;
    let exp = ((h & EXP_MASK) >> 10) as u32;
    let man = (h & MAN_MASK) as u32;

    let bits = match exp {
        0 if man == 0 => sign,
        // man * 2^-24 is exact in single precision.
        0 => sign | (man as f32 * SUBNORMAL_UNIT).to_bits(),
        0x1f => sign | 0x7f80_0000 | (man << 13),
        _ => sign | ((exp + 112) << 23) | (man << 13),
    };
    f32::from_bits(bits)
}

/// Narrow an `f32` to binary16 bits, rounding to nearest even.
///
/// Finite values beyond the binary16 range become infinities. NaNs stay
/// NaN; payload bits that do not fit are dropped, and a payload that
/// would vanish entirely is replaced by the quiet bit.
pub fn f32_to_f16_bits(value: f32) -> u16 {
    let x = value.to_bits();
    let sign = ((x >> 16) as u16) & SIGN;
    let exp = ((x >> 23) & 0xff) as i32;
    let man = x & 0x007f_ffff;

    if exp == 0xff {
        if man == 0 {
            return sign | EXP_MASK;
        }
        let payload = (man >> 13) as u16;
        return sign | EXP_MASK | if payload == 0 { QUIET } else { payload };
    }

    let unbiased = exp - 127;
    if unbiased > 15 {
        return sign | EXP_MASK;
    }

    if unbiased >= -14 {
        // Normal range. A carry out of the mantissa bumps the exponent,
        // which also turns 65520 and above into infinity.
        let mut h = (((unbiased + 15) as u32) << 10) | (man >> 13);
        let rest = man & 0x1fff;
        if rest > 0x1000 || (rest == 0x1000 && h & 1 == 1) {
            h += 1;
        }
        return sign | h as u16;
    }

    if unbiased < -25 {
        return sign;
    }

    // Subnormal result: count 2^-24 steps in the full significand.
    let m = man | 0x0080_0000;
    let shift = (-unbiased - 1) as u32;
    let mut q = m >> shift;
    let rest = m & ((1 << shift) - 1);
    let half = 1 << (shift - 1);
    if rest > half || (rest == half && q & 1 == 1) {
        q += 1;
    }
    sign | q as u16
}

/// Largest binary16 value that is `<= value`.
pub fn f32_to_f16_bits_down(value: f32) -> u16 {
    let h = f32_to_f16_bits(value);
    if f16_bits_to_f32(h) > value {
        next_down(h)
    } else {
        h
    }
}

/// Smallest binary16 value that is `>= value`.
pub fn f32_to_f16_bits_up(value: f32) -> u16 {
    let h = f32_to_f16_bits(value);
    if f16_bits_to_f32(h) < value {
        next_up(h)
    } else {
        h
    }
}

/// Adjacent binary16 value towards negative infinity.
fn next_down(h: u16) -> u16 {
    if is_nan_bits(h) || h == F16_NEG_INFINITY {
        return h;
    }
    match h {
        0x0000 => SIGN | 0x0001,
        _ if h & SIGN == 0 => h - 1,
        _ => h + 1,
    }
}

/// Adjacent binary16 value towards positive infinity.
fn next_up(h: u16) -> u16 {
    if is_nan_bits(h) || h == F16_INFINITY {
        return h;
    }
    match h {
        SIGN => 0x0001,
        _ if h & SIGN != 0 => h - 1,
        _ => h + 1,
    }
}

/// Split a word into two half floats, low 16 bits first.
#[inline]
pub fn unpack_2x16(word: u32) -> [f32; 2] {
    [
        f16_bits_to_f32((word & 0xffff) as u16),
        f16_bits_to_f32((word >> 16) as u16),
    ]
}

/// Join two binary16 bit patterns into a word, `lo` in the low 16 bits.
#[inline]
pub fn pack_2x16_bits(lo: u16, hi: u16) -> u32 {
    lo as u32 | (hi as u32) << 16
}

/// Pack two floats into a word, rounding each to nearest even.
#[inline]
pub fn pack_2x16(values: [f32; 2]) -> u32 {
    pack_2x16_bits(f32_to_f16_bits(values[0]), f32_to_f16_bits(values[1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Widening computed arithmetically, independent of the bit shuffling above.
    fn reference_widen(h: u16) -> f64 {
        let sign = if h & SIGN != 0 { -1.0 } else { 1.0 };
        let exp = ((h & EXP_MASK) >> 10) as i32;
        let man = (h & MAN_MASK) as f64;
        match exp {
            0 => sign * man * 2f64.powi(-24),
            0x1f if man == 0.0 => sign * f64::INFINITY,
            0x1f => f64::NAN,
            _ => sign * (1.0 + man / 1024.0) * 2f64.powi(exp - 15),
        }
    }

    #[test]
    fn test_round_trip_every_pattern() {
        for bits in 0..=u16::MAX {
            let wide = f16_bits_to_f32(bits);
            assert_eq!(f32_to_f16_bits(wide), bits, "bits {bits:#06x}");
            assert_eq!(f32_to_f16_bits_down(wide), bits, "down {bits:#06x}");
            assert_eq!(f32_to_f16_bits_up(wide), bits, "up {bits:#06x}");
        }
    }

    #[test]
    fn test_widen_matches_arithmetic() {
        for bits in 0..=u16::MAX {
            let wide = f16_bits_to_f32(bits);
            let expected = reference_widen(bits);
            if expected.is_nan() {
                assert!(wide.is_nan());
            } else {
                assert_eq!(wide as f64, expected, "bits {bits:#06x}");
                assert_eq!(wide.is_sign_negative(), bits & SIGN != 0);
            }
        }
    }

    #[test]
    fn test_known_values() {
        assert_eq!(f32_to_f16_bits(1.0), 0x3c00);
        assert_eq!(f32_to_f16_bits(-2.0), 0xc000);
        assert_eq!(f32_to_f16_bits(0.5), 0x3800);
        assert_eq!(f32_to_f16_bits(0.1), 0x2e66);
        assert_eq!(f32_to_f16_bits(F16_MAX), 0x7bff);
        assert_eq!(f32_to_f16_bits(SUBNORMAL_UNIT), 0x0001);
        assert_eq!(f32_to_f16_bits(2f32.powi(-14)), 0x0400);
        assert_eq!(f32_to_f16_bits(-0.0), 0x8000);
        assert_eq!(f16_bits_to_f32(0x3555), 0.333_251_95);
    }

    #[test]
    fn test_ties_round_to_even() {
        // Halfway between 0x3c00 and 0x3c01: even neighbour is 0x3c00.
        assert_eq!(f32_to_f16_bits(1.0 + 2f32.powi(-11)), 0x3c00);
        // Halfway between 0x3c01 and 0x3c02: even neighbour is 0x3c02.
        assert_eq!(f32_to_f16_bits(1.0 + 3.0 * 2f32.powi(-11)), 0x3c02);
        // Just above the halfway point rounds up.
        assert_eq!(f32_to_f16_bits(1.0 + 2f32.powi(-11) + 2f32.powi(-20)), 0x3c01);
        // Subnormal ties.
        assert_eq!(f32_to_f16_bits(2f32.powi(-25)), 0x0000);
        assert_eq!(f32_to_f16_bits(3.0 * 2f32.powi(-25)), 0x0002);
        assert_eq!(f32_to_f16_bits(2f32.powi(-25) * 1.5), 0x0001);
    }

    #[test]
    fn test_overflow_and_underflow() {
        assert_eq!(f32_to_f16_bits(65519.0), 0x7bff);
        assert_eq!(f32_to_f16_bits(65520.0), F16_INFINITY);
        assert_eq!(f32_to_f16_bits(1e10), F16_INFINITY);
        assert_eq!(f32_to_f16_bits(-1e10), F16_NEG_INFINITY);
        assert_eq!(f32_to_f16_bits(1e-10), 0x0000);
        assert_eq!(f32_to_f16_bits(-1e-10), 0x8000);
        assert_eq!(f32_to_f16_bits(f32::MIN_POSITIVE / 2.0), 0x0000);
    }

    #[test]
    fn test_infinity_and_nan() {
        assert_eq!(f32_to_f16_bits(f32::INFINITY), F16_INFINITY);
        assert_eq!(f32_to_f16_bits(f32::NEG_INFINITY), F16_NEG_INFINITY);
        assert_eq!(f16_bits_to_f32(F16_INFINITY), f32::INFINITY);
        assert!(is_nan_bits(f32_to_f16_bits(f32::NAN)));
        // A payload living only in the low f32 bits must not turn into infinity.
        let low_payload = f32::from_bits(0x7f80_0001);
        assert!(low_payload.is_nan());
        assert!(is_nan_bits(f32_to_f16_bits(low_payload)));
        assert!(f16_bits_to_f32(0x7e00).is_nan());
    }

    #[test]
    fn test_directed_rounding_brackets_value() {
        let mut rng = oorandom::Rand32::new(0x5eed);
        for _ in 0..20_000 {
            let x = (rng.rand_float() - 0.5) * 4.0 * 2f32.powi(rng.rand_range(0..20) as i32 - 12);
            let down = f32_to_f16_bits_down(x);
            let up = f32_to_f16_bits_up(x);
            let nearest = f32_to_f16_bits(x);
            assert!(f16_bits_to_f32(down) <= x, "{x}");
            assert!(f16_bits_to_f32(up) >= x, "{x}");
            assert!(nearest == down || nearest == up, "{x}");
            if down != up {
                assert_eq!(next_up(down), up, "{x}");
            }
        }
    }

    #[test]
    fn test_directed_rounding_saturates_at_range() {
        assert_eq!(f32_to_f16_bits_down(1e6), 0x7bff);
        assert_eq!(f32_to_f16_bits_up(1e6), F16_INFINITY);
        assert_eq!(f32_to_f16_bits_up(-1e6), 0xfbff);
        assert_eq!(f32_to_f16_bits_down(-1e6), F16_NEG_INFINITY);
        assert_eq!(f32_to_f16_bits_up(1e-10), 0x0001);
        assert_eq!(f32_to_f16_bits_down(-1e-10), 0x8001);
    }

    #[test]
    fn test_pack_unpack_order() {
        let word = pack_2x16([1.0, -2.0]);
        assert_eq!(word, 0xc000_3c00);
        assert_eq!(unpack_2x16(word), [1.0, -2.0]);
        // The same halves read straight from the little-endian bytes.
        let bytes = word.to_le_bytes();
        let lo = u16::from_le_bytes([bytes[0], bytes[1]]);
        let hi = u16::from_le_bytes([bytes[2], bytes[3]]);
        assert_eq!([f16_bits_to_f32(lo), f16_bits_to_f32(hi)], unpack_2x16(word));
    }
}

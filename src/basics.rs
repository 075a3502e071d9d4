//! Fixed-point constants and rounding helpers.
//!
//! Filter weights are stored as Q12 integers: a real weight `w` is held as
//! `w * WEIGHT_SCALE`. Every kernel accumulates `sample * weight` products,
//! adds a rounding bias and shifts back down by `WEIGHT_SHIFT`.

// ============================================================================
// Q12 weight constants
// ============================================================================

pub const WEIGHT_SHIFT: u32 = 12;
pub const WEIGHT_SCALE: i32 = 1 << WEIGHT_SHIFT; // 4096
pub const WEIGHT_ROUND: i32 = 1 << (WEIGHT_SHIFT - 1); // 2048

/// Maximum value of the "fractional 16-bit" output format.
///
/// Selecting a 2-byte destination with `dst_max_value == FRAC_1` switches the
/// vertical pass to a kernel that clamps to this value instead of `0xFFFF`.
pub const FRAC_1: u32 = 0x7FF8;

/// Width in bytes of the widest load a vectorised horizontal kernel may issue
/// from the first contributing sample of an entry.
pub const LANE_BYTES: usize = 16;

// ============================================================================
// Rounding and conversion functions
// ============================================================================

/// Floor a double to the nearest integer toward negative infinity.
#[inline]
pub fn ifloor(v: f64) -> i64 {
    v.floor() as i64
}

/// Ceiling of a double as a signed integer.
#[inline]
pub fn iceil(v: f64) -> i64 {
    v.ceil() as i64
}

/// Round half up: `floor(v + 0.5)`.
///
/// Unlike truncating `(v + 0.5) as i32`, this is symmetric in error for
/// negative values, so each rounded weight is within 0.5 of its real value.
#[inline]
pub fn round_half_up(v: f64) -> i32 {
    (v + 0.5).floor() as i32
}

/// Clamp a (possibly negative) sample index into `[0, len - 1]`.
///
/// `len` must be non-zero.
#[inline]
pub fn clamp_index(j: i64, len: u32) -> u32 {
    if j < 0 {
        0
    } else if j >= len as i64 {
        len - 1
    } else {
        j as u32
    }
}

/// Saturate an accumulated value into `[0, max]`.
#[inline]
pub fn saturate(v: i64, max: u32) -> u32 {
    v.clamp(0, max as i64) as u32
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_constants() {
        assert_eq!(WEIGHT_SCALE, 4096);
        assert_eq!(WEIGHT_ROUND, 2048);
        assert_eq!(WEIGHT_ROUND * 2, WEIGHT_SCALE);
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(2.49), 2);
        assert_eq!(round_half_up(-2.5), -2);
        assert_eq!(round_half_up(-2.6), -3);
        assert_eq!(round_half_up(-0.2), 0);
    }

    #[test]
    fn test_floor_ceil() {
        assert_eq!(ifloor(-1.5), -2);
        assert_eq!(ifloor(2.5), 2);
        assert_eq!(iceil(-1.5), -1);
        assert_eq!(iceil(2.0), 2);
    }

    #[test]
    fn test_clamp_index() {
        assert_eq!(clamp_index(-3, 10), 0);
        assert_eq!(clamp_index(4, 10), 4);
        assert_eq!(clamp_index(10, 10), 9);
        assert_eq!(clamp_index(0, 1), 0);
    }

    #[test]
    fn test_saturate() {
        assert_eq!(saturate(-5, 255), 0);
        assert_eq!(saturate(300, 255), 255);
        assert_eq!(saturate(0x8000, FRAC_1), FRAC_1);
        assert_eq!(saturate(1234, 65535), 1234);
    }
}

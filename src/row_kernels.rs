//! Per-row weighted-sum kernels.
//!
//! The horizontal kernel turns one source row into one intermediate row;
//! the vertical kernel combines a few intermediate rows from the ring into
//! one destination row. Both are single generic scalar loops, specialised
//! at compile time on sample width, channel count (1/3/4, or any) and, for
//! the vertical pass, the number of rows (2..=5, or any). A vectorised
//! backend would plug in behind the same [`ZoomXFn`] / [`ZoomYFn`] pointers.
//!
//! Buffers that are too short are a caller contract violation: indexing
//! panics rather than returning an error.

use crate::basics::{saturate, FRAC_1, LANE_BYTES, WEIGHT_ROUND, WEIGHT_SHIFT};
use crate::contrib::ContributionTable;
use crate::error::{RescaleError, RescaleResult};

// ============================================================================
// Sample trait
// ============================================================================

/// An unsigned sample stored in native byte order inside a byte row.
pub trait Sample: Copy + 'static {
    const BYTES: usize;
    const MAX: u32;

    /// Read sample `i` of `row`.
    fn read(row: &[u8], i: usize) -> i64;
    /// Write sample `i` of `row`; `v` is already saturated.
    fn write(row: &mut [u8], i: usize, v: u32);
}

impl Sample for u8 {
    const BYTES: usize = 1;
    const MAX: u32 = 0xFF;

    #[inline(always)]
    fn read(row: &[u8], i: usize) -> i64 {
        row[i] as i64
    }

    #[inline(always)]
    fn write(row: &mut [u8], i: usize, v: u32) {
        row[i] = v as u8;
    }
}

impl Sample for u16 {
    const BYTES: usize = 2;
    const MAX: u32 = 0xFFFF;

    #[inline(always)]
    fn read(row: &[u8], i: usize) -> i64 {
        u16::from_ne_bytes([row[2 * i], row[2 * i + 1]]) as i64
    }

    #[inline(always)]
    fn write(row: &mut [u8], i: usize, v: u32) {
        row[2 * i..2 * i + 2].copy_from_slice(&(v as u16).to_ne_bytes());
    }
}

/// Natural maximum of a sample `bytes` wide.
pub fn max_for_width(bytes: u32) -> u32 {
    if bytes == 2 {
        u16::MAX as u32
    } else {
        u8::MAX as u32
    }
}

// ============================================================================
// Horizontal pass
// ============================================================================

/// Horizontal kernel: scale `src` (a data row) into `tmp` (one ring row).
pub type ZoomXFn = fn(tmp: &mut [u8], src: &[u8], channels: usize, table: &ContributionTable);

/// Weighted sum of `weights.len()` samples of `row` starting at `first`,
/// `step` samples apart, plus the rounding bias.
#[inline(always)]
fn tap_sum<S: Sample>(row: &[u8], first: usize, step: usize, weights: &[i32]) -> i64 {
    let mut acc = WEIGHT_ROUND as i64;
    for (k, &w) in weights.iter().enumerate() {
        acc += S::read(row, first + k * step) * w as i64;
    }
    acc
}

/// One output pixel: every channel of `window` (which starts at the first
/// contributor) filtered into `tmp` at sample `out`.
#[inline(always)]
fn zoom_x_pixel<S: Sample>(tmp: &mut [u8], out: usize, window: &[u8], ch: usize, w: &[i32]) {
    for c in 0..ch {
        let acc = tap_sum::<S>(window, c, ch, w);
        S::write(tmp, out + c, saturate(acc >> WEIGHT_SHIFT, S::MAX));
    }
}

/// Exact-width path: the window ends at the last contributor, so it never
/// reads past the end of the row.
#[inline(never)]
fn zoom_x_exact<S: Sample>(tmp: &mut [u8], out: usize, src: &[u8], first: usize, ch: usize, w: &[i32]) {
    let start = first * S::BYTES;
    let end = start + w.len() * ch * S::BYTES;
    zoom_x_pixel::<S>(tmp, out, &src[start..end], ch, w);
}

/// Generic horizontal kernel. `C` is the channel count, or 0 for "use `channels`".
fn zoom_x<S: Sample, const C: usize>(
    tmp: &mut [u8],
    src: &[u8],
    channels: usize,
    table: &ContributionTable,
) {
    let ch = if C == 0 { channels } else { C };
    for (i, e) in table.entries().iter().enumerate() {
        let w = table.entry_weights(i);
        let first = e.first as usize;
        if e.slow || w.len() * ch * S::BYTES > LANE_BYTES {
            zoom_x_exact::<S>(tmp, i * ch, src, first, ch, w);
        } else {
            let start = first * S::BYTES;
            zoom_x_pixel::<S>(tmp, i * ch, &src[start..start + LANE_BYTES], ch, w);
        }
    }
}

// ============================================================================
// Vertical pass
// ============================================================================

/// Rounding and saturation applied to a vertical accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YOutput {
    pub shift: u32,
    pub bias: i64,
    pub max: u32,
}

impl YOutput {
    /// Output mode for `tmp_bytes` wide intermediate samples written as
    /// `dst_bytes` wide samples.
    ///
    /// 8-bit to 16-bit keeps 8 extra fractional bits; 16-bit to 8-bit drops
    /// them. The fractional mode clamps to [`FRAC_1`].
    pub fn select(tmp_bytes: u32, dst_bytes: u32, frac: bool) -> Self {
        let round = WEIGHT_ROUND as i64;
        match (tmp_bytes, dst_bytes) {
            _ if frac => Self::new(WEIGHT_SHIFT, round, FRAC_1),
            (1, 1) => Self::new(WEIGHT_SHIFT, round, 0xFF),
            (2, 1) => Self::new(WEIGHT_SHIFT + 8, round, 0xFF),
            (1, _) => Self::new(WEIGHT_SHIFT - 8, round >> 8, 0xFFFF),
            _ => Self::new(WEIGHT_SHIFT, round, 0xFFFF),
        }
    }

    fn new(shift: u32, bias: i64, max: u32) -> Self {
        Self { shift, bias, max }
    }

    #[inline(always)]
    pub fn finish(&self, acc: i64) -> u32 {
        saturate((acc + self.bias) >> self.shift, self.max)
    }
}

/// Vertical kernel: combine `weights.len()` consecutive ring rows starting
/// at `first_slot` into `dst`. Rows are `width` samples long.
pub type ZoomYFn = fn(
    dst: &mut [u8],
    ring: &[u8],
    width: usize,
    first_slot: usize,
    weights: &[i32],
    out: YOutput,
);

/// Generic vertical kernel. `N` is the number of rows, or 0 for "use
/// `weights.len()`".
fn zoom_y_rows<T: Sample, D: Sample, const N: usize>(
    dst: &mut [u8],
    ring: &[u8],
    width: usize,
    first_slot: usize,
    weights: &[i32],
    out: YOutput,
) {
    let n = if N == 0 { weights.len() } else { N };
    let w = &weights[..n];
    let base = first_slot * width;
    for x in 0..width {
        let mut acc = 0i64;
        for (k, &wk) in w.iter().enumerate() {
            acc += T::read(ring, base + k * width + x) * wk as i64;
        }
        D::write(dst, x, out.finish(acc));
    }
}

fn zoom_y<T: Sample, D: Sample>(
    dst: &mut [u8],
    ring: &[u8],
    width: usize,
    first_slot: usize,
    weights: &[i32],
    out: YOutput,
) {
    match weights.len() {
        2 => zoom_y_rows::<T, D, 2>(dst, ring, width, first_slot, weights, out),
        3 => zoom_y_rows::<T, D, 3>(dst, ring, width, first_slot, weights, out),
        4 => zoom_y_rows::<T, D, 4>(dst, ring, width, first_slot, weights, out),
        5 => zoom_y_rows::<T, D, 5>(dst, ring, width, first_slot, weights, out),
        _ => zoom_y_rows::<T, D, 0>(dst, ring, width, first_slot, weights, out),
    }
}

// ============================================================================
// RowKernels
// ============================================================================

/// The kernel pair used by one rescaler.
#[derive(Debug, Clone, Copy)]
pub struct RowKernels {
    zoom_x: ZoomXFn,
    zoom_y: ZoomYFn,
    output: YOutput,
    tmp_bytes: u32,
    dst_bytes: u32,
    channels: u32,
}

impl RowKernels {
    /// Pick kernels for `tmp_bytes` wide source/intermediate samples,
    /// `dst_bytes` wide output samples and `channels` interleaved channels.
    ///
    /// Channel counts other than 1, 3 and 4 use the any-channel variant.
    pub fn select(tmp_bytes: u32, dst_bytes: u32, channels: u32, frac: bool) -> RescaleResult<Self> {
        let zoom_x: ZoomXFn = match (tmp_bytes, channels) {
            (1, 1) => zoom_x::<u8, 1>,
            (1, 3) => zoom_x::<u8, 3>,
            (1, 4) => zoom_x::<u8, 4>,
            (1, _) => zoom_x::<u8, 0>,
            (2, 1) => zoom_x::<u16, 1>,
            (2, 3) => zoom_x::<u16, 3>,
            (2, 4) => zoom_x::<u16, 4>,
            (2, _) => zoom_x::<u16, 0>,
            (width, _) => return Err(RescaleError::UnsupportedSampleWidth { width }),
        };
        let zoom_y: ZoomYFn = match (tmp_bytes, dst_bytes) {
            (1, 1) => zoom_y::<u8, u8>,
            (1, 2) => zoom_y::<u8, u16>,
            (2, 1) => zoom_y::<u16, u8>,
            (2, 2) => zoom_y::<u16, u16>,
            (_, width) => return Err(RescaleError::UnsupportedSampleWidth { width }),
        };
        Ok(Self {
            zoom_x,
            zoom_y,
            output: YOutput::select(tmp_bytes, dst_bytes, frac && dst_bytes == 2),
            tmp_bytes,
            dst_bytes,
            channels,
        })
    }

    pub fn output(&self) -> YOutput {
        self.output
    }

    /// Horizontally scale one data row into one ring row.
    #[inline]
    pub fn scale_x(&self, tmp: &mut [u8], src: &[u8], table: &ContributionTable) {
        (self.zoom_x)(tmp, src, self.channels as usize, table);
    }

    /// Vertically combine ring rows into one destination row of `width` samples.
    #[inline]
    pub fn scale_y(&self, dst: &mut [u8], ring: &[u8], width: usize, first_slot: usize, weights: &[i32]) {
        (self.zoom_y)(dst, ring, width, first_slot, weights, self.output);
    }

    /// Variant name, e.g. `x1to1_3 y1to2_frac`.
    pub fn describe(&self) -> String {
        let ch = match self.channels {
            1 | 3 | 4 => format!("_{}", self.channels),
            _ => String::new(),
        };
        let frac = if self.output.max == FRAC_1 { "_frac" } else { "" };
        format!(
            "x{t}to{t}{ch} y{t}to{d}{frac}",
            t = self.tmp_bytes,
            d = self.dst_bytes
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contrib::ContributionPlanner;
    use crate::error::Axis;
    use crate::filters::{FilterLinear, FilterMitchell, FilterNearest};

    fn u16_bytes(v: &[u16]) -> Vec<u8> {
        v.iter().flat_map(|s| s.to_ne_bytes()).collect()
    }

    fn u16_vals(b: &[u8]) -> Vec<u16> {
        b.chunks_exact(2)
            .map(|c| u16::from_ne_bytes([c[0], c[1]]))
            .collect()
    }

    #[test]
    fn test_sample_read_write() {
        let mut row = vec![0u8; 6];
        u16::write(&mut row, 1, 0xBEEF);
        assert_eq!(u16::read(&row, 1), 0xBEEF);
        assert_eq!(u16::read(&row, 0), 0);
        u8::write(&mut row, 5, 200);
        assert_eq!(u8::read(&row, 5), 200);
        assert_eq!(max_for_width(1), 255);
        assert_eq!(max_for_width(2), 65535);
    }

    #[test]
    fn test_output_modes() {
        assert_eq!(YOutput::select(1, 1, false), YOutput::new(12, 2048, 255));
        assert_eq!(YOutput::select(2, 1, false), YOutput::new(20, 2048, 255));
        assert_eq!(YOutput::select(1, 2, false), YOutput::new(4, 8, 65535));
        assert_eq!(YOutput::select(2, 2, false), YOutput::new(12, 2048, 65535));
        assert_eq!(YOutput::select(1, 2, true), YOutput::new(12, 2048, 0x7FF8));
        assert_eq!(YOutput::select(2, 2, true), YOutput::new(12, 2048, 0x7FF8));
    }

    #[test]
    fn test_zoom_x_rgb_nearest_downscale() {
        let table = ContributionPlanner::new(Axis::X, 2, 4, 3, &FilterNearest)
            .plan()
            .unwrap();
        let k = RowKernels::select(1, 1, 3, false).unwrap();
        let src = [10, 100, 0, 20, 110, 2, 30, 120, 4, 40, 130, 6];
        let mut tmp = [0u8; 6];
        k.scale_x(&mut tmp, &src, &table);
        // Box of two pixels, (a + b) / 2 rounded half up.
        assert_eq!(tmp, [15, 105, 1, 35, 125, 5]);
    }

    #[test]
    fn test_zoom_x_any_channel_count_matches_per_channel() {
        let table = ContributionPlanner::new(Axis::X, 7, 5, 2, &FilterMitchell::THIRDS)
            .plan()
            .unwrap();
        let gray = ContributionPlanner::new(Axis::X, 7, 5, 1, &FilterMitchell::THIRDS)
            .plan()
            .unwrap();
        let src: Vec<u8> = (0..10).map(|i| (i * 23 % 256) as u8).collect();
        let mut tmp = vec![0u8; 14];
        RowKernels::select(1, 1, 2, false)
            .unwrap()
            .scale_x(&mut tmp, &src, &table);

        let k1 = RowKernels::select(1, 1, 1, false).unwrap();
        for c in 0..2 {
            let plane: Vec<u8> = src.iter().skip(c).step_by(2).copied().collect();
            let mut out = vec![0u8; 7];
            k1.scale_x(&mut out, &plane, &gray);
            let got: Vec<u8> = tmp.iter().skip(c).step_by(2).copied().collect();
            assert_eq!(got, out, "channel {c}");
        }
    }

    #[test]
    fn test_zoom_x_slow_and_fast_paths_agree() {
        // 40 samples: entries near the end are slow, early ones take the lane path.
        let table = ContributionPlanner::new(Axis::X, 40, 40, 1, &FilterMitchell::THIRDS)
            .plan()
            .unwrap();
        assert!(table.entries().iter().any(|e| e.slow));
        assert!(table.entries().iter().any(|e| !e.slow));
        let src: Vec<u8> = (0..40).map(|i| ((i * 37) % 251) as u8).collect();
        let mut tmp = vec![0u8; 40];
        zoom_x::<u8, 1>(&mut tmp, &src, 1, &table);
        for (i, e) in table.entries().iter().enumerate() {
            let mut one = vec![0u8; 1];
            zoom_x_exact::<u8>(&mut one, 0, &src, e.first as usize, 1, table.entry_weights(i));
            assert_eq!(one[0], tmp[i], "entry {i}");
        }
    }

    #[test]
    fn test_zoom_x_16bit_rescale_factor() {
        // 10-bit data in 16-bit containers expands to the full 16-bit range.
        let mut p = ContributionPlanner::new(Axis::X, 3, 3, 1, &FilterLinear);
        p.rescale_factor = 65535.0 / 1023.0;
        p.lane_samples = (LANE_BYTES / 2) as u32;
        let table = p.plan().unwrap();
        let src = u16_bytes(&[0, 512, 1023]);
        let mut tmp = vec![0u8; 6];
        RowKernels::select(2, 2, 1, false)
            .unwrap()
            .scale_x(&mut tmp, &src, &table);
        let out = u16_vals(&tmp);
        assert_eq!(out[0], 0);
        assert_eq!(out[2], 65535);
        assert!((out[1] as i32 - 32800).abs() < 16, "mid = {}", out[1]);
    }

    fn ring_of(rows: &[&[u8]]) -> Vec<u8> {
        rows.iter().flat_map(|r| r.iter().copied()).collect()
    }

    #[test]
    fn test_zoom_y_fixed_and_generic_agree() {
        let rows: Vec<Vec<u8>> = (0..7)
            .map(|r| (0..9).map(|x| ((r * 41 + x * 13) % 256) as u8).collect())
            .collect();
        let refs: Vec<&[u8]> = rows.iter().map(|r| r.as_slice()).collect();
        let ring = ring_of(&refs);
        let out = YOutput::select(1, 1, false);
        for n in 2..=5 {
            let w: Vec<i32> = (0..n).map(|k| if k == 1 { 4096 + 300 } else { -300 / (n as i32 - 1) }).collect();
            let mut fast = vec![0u8; 9];
            let mut slow = vec![0u8; 9];
            zoom_y::<u8, u8>(&mut fast, &ring, 9, 1, &w, out);
            zoom_y_rows::<u8, u8, 0>(&mut slow, &ring, 9, 1, &w, out);
            assert_eq!(fast, slow, "n={n}");
        }
    }

    #[test]
    fn test_zoom_y_saturates() {
        let ring = ring_of(&[&[255, 0, 128], &[255, 0, 128], &[0, 255, 128]]);
        // Overshooting weights: 1.5, 1.5, -2.0.
        let w = [6144, 6144, -8192];
        let mut dst = [0u8; 3];
        RowKernels::select(1, 1, 1, false)
            .unwrap()
            .scale_y(&mut dst, &ring, 3, 0, &w);
        assert_eq!(dst, [255, 0, 128]);

        let mut dst16 = [0u8; 6];
        RowKernels::select(1, 2, 1, false)
            .unwrap()
            .scale_y(&mut dst16, &ring, 3, 0, &w);
        assert_eq!(u16_vals(&dst16), vec![65535, 0, 128 << 8]);

        let mut frac = [0u8; 6];
        RowKernels::select(1, 2, 1, true)
            .unwrap()
            .scale_y(&mut frac, &ring, 3, 0, &w);
        assert_eq!(u16_vals(&frac), vec![765, 0, 128]);
    }

    #[test]
    fn test_zoom_y_frac_clamps_to_7ff8() {
        let ring = u16_bytes(&[0xFFFF, 0x4000, 0xFFFF, 0x4000]);
        let w = [2048, 2048];
        let mut dst = [0u8; 4];
        RowKernels::select(2, 2, 1, true)
            .unwrap()
            .scale_y(&mut dst, &ring, 2, 0, &w);
        assert_eq!(u16_vals(&dst), vec![0x7FF8, 0x4000]);
    }

    #[test]
    fn test_zoom_y_16_to_8() {
        let ring = u16_bytes(&[0xFFFF, 0x8000, 0x0100, 0xFFFF, 0x8000, 0x0100]);
        let w = [2048, 2048];
        let mut dst = [0u8; 3];
        RowKernels::select(2, 1, 1, false)
            .unwrap()
            .scale_y(&mut dst, &ring, 3, 0, &w);
        assert_eq!(dst, [255, 128, 1]);
    }

    #[test]
    fn test_select_rejects_bad_widths() {
        assert!(matches!(
            RowKernels::select(3, 1, 1, false),
            Err(RescaleError::UnsupportedSampleWidth { width: 3 })
        ));
        assert!(RowKernels::select(1, 4, 1, false).is_err());
    }

    #[test]
    fn test_describe() {
        assert_eq!(RowKernels::select(1, 1, 3, false).unwrap().describe(), "x1to1_3 y1to1");
        assert_eq!(RowKernels::select(2, 2, 5, true).unwrap().describe(), "x2to2 y2to2_frac");
        assert_eq!(RowKernels::select(1, 2, 1, false).unwrap().describe(), "x1to1_1 y1to2");
    }
}

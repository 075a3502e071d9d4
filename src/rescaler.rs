//! Streaming two-pass rescaler.
//!
//! [`IncrementalRescaler`] scales each incoming source row horizontally into
//! a small ring of intermediate rows, and emits a destination row as soon as
//! every source row it depends on is in the ring. Memory use is the two
//! contribution tables plus `max_support` intermediate rows; the whole image
//! is never held.
//!
//! The caller drives it with [`IncrementalRescaler::process`]:
//!
//! ```
//! use tile_rescale::{IncrementalRescaler, Progress, Quality, RescaleParams};
//!
//! let params = RescaleParams::new(4, 4, 8, 8).with_quality(Quality::Linear);
//! let mut r = IncrementalRescaler::new(params)?;
//! let src = [100u8; 16];
//! let mut dst = vec![0u8; 64];
//! let (mut y, mut out_y) = (0usize, 0usize);
//! loop {
//!     let input = src.get(y * 4..y * 4 + 4);
//!     let mut empty = [0u8; 0];
//!     let output = if out_y < 8 { &mut dst[out_y * 8..out_y * 8 + 8] } else { &mut empty[..] };
//!     match r.process(input, output) {
//!         Progress::Consumed => y += 1,
//!         Progress::Produced => out_y += 1,
//!         Progress::Done => break,
//!         Progress::NeedInput => unreachable!("all rows supplied"),
//!     }
//! }
//! assert!(dst.iter().all(|&v| v == 100));
//! # Ok::<(), tile_rescale::RescaleError>(())
//! ```

use crate::basics::{FRAC_1, LANE_BYTES};
use crate::contrib::{ContributionPlanner, ContributionTable};
use crate::error::{Axis, RescaleError, RescaleResult};
use crate::filters::Quality;
use crate::row_kernels::{max_for_width, RowKernels};
use crate::row_ring::RowRing;

// ============================================================================
// RescaleParams
// ============================================================================

/// Geometry and sample format of one rescale.
///
/// `data` is the part of the source actually supplied (rows are fed starting
/// at `data_y`, each holding `data_w * channels` samples starting at
/// `data_x`). `patch` is the part of the destination actually produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RescaleParams {
    pub src_w: u32,
    pub src_h: u32,
    pub data_x: u32,
    pub data_y: u32,
    pub data_w: u32,
    pub data_h: u32,
    pub dst_w: u32,
    pub dst_h: u32,
    pub patch_x: u32,
    pub patch_y: u32,
    pub patch_w: u32,
    pub patch_h: u32,
    pub quality: Quality,
    /// Bytes per source sample (1 or 2). Also the intermediate sample width.
    pub src_bytes: u32,
    /// Bytes per destination sample (1 or 2).
    pub dst_bytes: u32,
    pub channels: u32,
    pub src_max_value: u32,
    /// Largest destination value. With 2-byte output, [`FRAC_1`] selects the
    /// fractional output format.
    pub dst_max_value: u32,
}

impl RescaleParams {
    /// Full source to full destination, Mitchell, 8-bit gray.
    pub fn new(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> Self {
        Self {
            src_w,
            src_h,
            data_x: 0,
            data_y: 0,
            data_w: src_w,
            data_h: src_h,
            dst_w,
            dst_h,
            patch_x: 0,
            patch_y: 0,
            patch_w: dst_w,
            patch_h: dst_h,
            quality: Quality::default(),
            src_bytes: 1,
            dst_bytes: 1,
            channels: 1,
            src_max_value: 255,
            dst_max_value: 255,
        }
    }

    pub fn with_data(mut self, x: u32, y: u32, w: u32, h: u32) -> Self {
        self.data_x = x;
        self.data_y = y;
        self.data_w = w;
        self.data_h = h;
        self
    }

    pub fn with_patch(mut self, x: u32, y: u32, w: u32, h: u32) -> Self {
        self.patch_x = x;
        self.patch_y = y;
        self.patch_w = w;
        self.patch_h = h;
        self
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_channels(mut self, channels: u32) -> Self {
        self.channels = channels;
        self
    }

    /// Set sample widths and reset both max values to the natural maxima.
    pub fn with_sample_bytes(mut self, src_bytes: u32, dst_bytes: u32) -> Self {
        self.src_bytes = src_bytes;
        self.dst_bytes = dst_bytes;
        self.src_max_value = max_for_width(src_bytes);
        self.dst_max_value = max_for_width(dst_bytes);
        self
    }

    pub fn with_max_values(mut self, src_max_value: u32, dst_max_value: u32) -> Self {
        self.src_max_value = src_max_value;
        self.dst_max_value = dst_max_value;
        self
    }

    /// Bytes in one input row.
    pub fn input_row_bytes(&self) -> usize {
        self.data_w as usize * self.channels as usize * self.src_bytes as usize
    }

    /// Bytes in one output row.
    pub fn output_row_bytes(&self) -> usize {
        self.patch_w as usize * self.channels as usize * self.dst_bytes as usize
    }

    /// Check sample format and window placement.
    ///
    /// Filter coverage of the data window is checked when the axes are planned.
    pub fn validate(&self) -> RescaleResult<()> {
        for width in [self.src_bytes, self.dst_bytes] {
            if width != 1 && width != 2 {
                return Err(RescaleError::UnsupportedSampleWidth { width });
            }
        }
        if self.channels == 0 {
            return Err(RescaleError::ZeroChannels);
        }
        let checks = [
            ("source", self.src_max_value, max_for_width(self.src_bytes)),
            ("destination", self.dst_max_value, max_for_width(self.dst_bytes)),
        ];
        for (which, value, limit) in checks {
            if value == 0 || value > limit {
                return Err(RescaleError::InvalidMaxValue { which, value, limit });
            }
        }
        let windows = [
            (Axis::X, self.patch_x, self.patch_w, self.dst_w, "patch", "destination"),
            (Axis::Y, self.patch_y, self.patch_h, self.dst_h, "patch", "destination"),
            (Axis::X, self.data_x, self.data_w, self.src_w, "data", "source"),
            (Axis::Y, self.data_y, self.data_h, self.src_h, "data", "source"),
        ];
        for (axis, offset, len, total, what, of) in windows {
            if offset as u64 + len as u64 > total as u64 {
                return Err(RescaleError::geometry(
                    axis,
                    format!("{what} {offset}+{len} exceeds {of} length {total}"),
                ));
            }
        }
        Ok(())
    }

    fn is_frac(&self) -> bool {
        self.dst_bytes == 2 && self.dst_max_value == FRAC_1
    }
}

// ============================================================================
// Progress
// ============================================================================

/// Result of one [`IncrementalRescaler::process`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Progress {
    /// A source row is needed and none was supplied.
    NeedInput,
    /// The supplied source row was taken; no output yet.
    Consumed,
    /// A destination row was written. The supplied row, if any, was not taken.
    Produced,
    /// Every destination row has been produced. A supplied row is swallowed.
    Done,
}

impl Progress {
    /// Numeric status: 0 = no output, 1 = done, 2 = output row produced.
    pub fn code(self) -> u32 {
        match self {
            Progress::NeedInput | Progress::Consumed => 0,
            Progress::Done => 1,
            Progress::Produced => 2,
        }
    }

    /// The supplied input row was used (or swallowed) and the next call
    /// should get the next source row.
    pub fn consumed_input(self) -> bool {
        matches!(self, Progress::Consumed | Progress::Done)
    }

    pub fn produced_output(self) -> bool {
        self == Progress::Produced
    }
}

// ============================================================================
// IncrementalRescaler
// ============================================================================

pub struct IncrementalRescaler {
    params: RescaleParams,
    x_table: ContributionTable,
    y_table: ContributionTable,
    ring: RowRing,
    kernels: RowKernels,
    max_support: u32,
    src_patch_y: u32,
    src_patch_h: u32,
    row_samples: usize,
    src_y: u32,
    dst_y: u32,
}

impl IncrementalRescaler {
    /// Plan both axes and allocate the row ring.
    pub fn new(params: RescaleParams) -> RescaleResult<Self> {
        params.validate()?;
        let p = &params;

        let tmp_bytes = p.src_bytes;
        let tmp_max = max_for_width(tmp_bytes);
        let horiz = p.quality.axis_filter(p.dst_w, p.src_w);
        let vert = p.quality.axis_filter(p.dst_h, p.src_h);

        let x_table = ContributionPlanner {
            axis: Axis::X,
            dst_len: p.dst_w,
            src_len: p.src_w,
            patch_offset: p.patch_x,
            patch_len: p.patch_w,
            data_offset: p.data_x,
            data_len: p.data_w,
            sample_stride: p.channels,
            source_max_value: p.src_max_value,
            rescale_factor: tmp_max as f64 / p.src_max_value as f64,
            lane_samples: (LANE_BYTES / tmp_bytes as usize) as u32,
            filter: horiz,
        }
        .plan()?;

        let mut y_table = ContributionPlanner {
            axis: Axis::Y,
            dst_len: p.dst_h,
            src_len: p.src_h,
            patch_offset: p.patch_y,
            patch_len: p.patch_h,
            data_offset: p.data_y,
            data_len: p.data_h,
            sample_stride: 1,
            source_max_value: tmp_max,
            rescale_factor: p.dst_max_value as f64 / max_for_width(p.dst_bytes) as f64,
            lane_samples: 1,
            filter: vert,
        }
        .plan()?;

        let (src_patch_y, src_patch_h) = y_table.source_span();
        let max_support = vert
            .contrib_pixels(p.dst_h as f64 / p.src_h as f64)
            .max(y_table.max_count())
            .max(4);

        log::trace!("x contributions:\n{x_table}");
        log::trace!("y contributions:\n{y_table}");
        y_table.permute_for_ring(max_support)?;
        log::trace!("y contributions in ring order:\n{y_table}");

        let row_samples = p.patch_w as usize * p.channels as usize;
        let ring = RowRing::new(max_support, row_samples * tmp_bytes as usize)?;
        let kernels = RowKernels::select(tmp_bytes, p.dst_bytes, p.channels, p.is_frac())?;

        log::debug!(
            "rescaler {}x{} -> {}x{} data {},{}+{}x{} patch {},{}+{}x{} filters {}/{} ring {}x{}B source rows {}+{} kernels {}",
            p.src_w,
            p.src_h,
            p.dst_w,
            p.dst_h,
            p.data_x,
            p.data_y,
            p.data_w,
            p.data_h,
            p.patch_x,
            p.patch_y,
            p.patch_w,
            p.patch_h,
            horiz.name(),
            vert.name(),
            max_support,
            ring.stride(),
            src_patch_y,
            src_patch_h,
            kernels.describe()
        );

        Ok(Self {
            params,
            x_table,
            y_table,
            ring,
            kernels,
            max_support,
            src_patch_y,
            src_patch_h,
            row_samples,
            src_y: 0,
            dst_y: 0,
        })
    }

    /// Advance the stream by one step.
    ///
    /// `input` is the next source row (data row `src_row()`), or `None` if
    /// the caller has nothing to offer right now. `output` receives a
    /// destination row when [`Progress::Produced`] is returned and must hold
    /// at least [`output_row_bytes`](Self::output_row_bytes) bytes in that
    /// case; an input row must hold at least
    /// [`input_row_bytes`](Self::input_row_bytes).
    pub fn process(&mut self, input: Option<&[u8]>, output: &mut [u8]) -> Progress {
        if self.dst_y == self.params.patch_h {
            return Progress::Done;
        }

        let d = self.dst_y as usize;
        let entry = self.y_table.entries()[d];
        if self.src_y > entry.last {
            debug_assert!(output.len() >= self.output_row_bytes());
            log::trace!(
                "dst row {} from ring slot {} x{}",
                self.dst_y,
                entry.first,
                entry.count
            );
            self.kernels.scale_y(
                output,
                self.ring.as_bytes(),
                self.row_samples,
                entry.first as usize,
                self.y_table.entry_weights(d),
            );
            self.dst_y += 1;
            return Progress::Produced;
        }

        let Some(row) = input else {
            return Progress::NeedInput;
        };

        if self.src_y >= self.src_patch_y && self.src_y < self.src_patch_y + self.src_patch_h {
            debug_assert!(row.len() >= self.input_row_bytes());
            log::trace!(
                "src row {} into ring slot {}",
                self.src_y,
                self.ring.slot_of(self.src_y)
            );
            let tmp = self.ring.row_mut(self.src_y);
            self.kernels.scale_x(tmp, row, &self.x_table);
        }
        self.src_y += 1;
        Progress::Consumed
    }

    /// Rewind both cursors for another pass with the same geometry.
    pub fn reset(&mut self) {
        self.src_y = 0;
        self.dst_y = 0;
    }

    pub fn params(&self) -> &RescaleParams {
        &self.params
    }

    /// Number of rows in the intermediate ring.
    pub fn max_support(&self) -> u32 {
        self.max_support
    }

    /// Data-relative source rows that are actually filtered, as `(start, len)`.
    /// Rows outside are counted but not scaled.
    pub fn source_window(&self) -> (u32, u32) {
        (self.src_patch_y, self.src_patch_h)
    }

    /// Number of data rows that must be fed before the last output row.
    pub fn required_source_rows(&self) -> u32 {
        self.src_patch_y + self.src_patch_h
    }

    /// Source rows fed so far.
    pub fn src_row(&self) -> u32 {
        self.src_y
    }

    /// Destination rows produced so far.
    pub fn dst_row(&self) -> u32 {
        self.dst_y
    }

    pub fn is_done(&self) -> bool {
        self.dst_y == self.params.patch_h
    }

    pub fn input_row_bytes(&self) -> usize {
        self.params.input_row_bytes()
    }

    pub fn output_row_bytes(&self) -> usize {
        self.params.output_row_bytes()
    }

    pub fn x_table(&self) -> &ContributionTable {
        &self.x_table
    }

    /// Vertical table, in ring order.
    pub fn y_table(&self) -> &ContributionTable {
        &self.y_table
    }
}

impl std::fmt::Debug for IncrementalRescaler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncrementalRescaler")
            .field("params", &self.params)
            .field("max_support", &self.max_support)
            .field("source_window", &self.source_window())
            .field("src_y", &self.src_y)
            .field("dst_y", &self.dst_y)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

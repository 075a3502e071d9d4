//! Filter contribution planning.
//!
//! For one axis, computes which source samples feed each output sample of
//! the requested patch and with which Q12 weight. The horizontal table is
//! used as planned; the vertical table is afterwards rewritten by
//! [`ContributionTable::permute_for_ring`] so its offsets address the
//! circular row buffer instead of absolute source rows.
//!
//! Output sample centers are computed with integer rationals rather than
//! floats so that the left/right contributor bounds are identical whatever
//! the evaluation order, which keeps tiled and untiled output bit-exact.

use crate::basics::{clamp_index, iceil, ifloor, round_half_up, LANE_BYTES, WEIGHT_SCALE};
use crate::error::{Axis, RescaleError, RescaleResult};
use crate::filters::ResampleFilter;

// ============================================================================
// ContributionEntry / ContributionTable
// ============================================================================

/// Contributors for one output coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContributionEntry {
    /// Sample offset of the first contributor: `(index - data_offset) * stride`.
    /// After ring permutation, the ring slot of the first weight times stride.
    pub first: u32,
    /// Number of consecutive contributors (number of ring slots once permuted).
    pub count: u32,
    /// Start of this entry's weights in the table's weight array.
    pub weight_offset: u32,
    /// Index of the last contributor, relative to the data window.
    pub last: u32,
    /// A `LANE_BYTES` wide load at `first` would run past the data row.
    pub slow: bool,
}

impl ContributionEntry {
    /// Index of the first contributor relative to the data window.
    #[inline]
    pub fn first_index(&self, stride: u32) -> u32 {
        self.first / stride.max(1)
    }
}

/// Planned contributors and Q12 weights for every output coordinate of a patch.
#[derive(Debug, Clone, Default)]
pub struct ContributionTable {
    entries: Vec<ContributionEntry>,
    weights: Vec<i32>,
    weights_per_entry: u32,
    stride: u32,
    ring: Option<u32>,
}

impl ContributionTable {
    pub fn entries(&self) -> &[ContributionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Samples between consecutive contributors.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Size of each entry's weight slot.
    pub fn weights_per_entry(&self) -> u32 {
        self.weights_per_entry
    }

    /// Ring capacity if the table has been permuted for a row ring.
    pub fn ring_capacity(&self) -> Option<u32> {
        self.ring
    }

    pub fn weights(&self) -> &[i32] {
        &self.weights
    }

    /// The `count` weights of entry `i`.
    #[inline]
    pub fn entry_weights(&self, i: usize) -> &[i32] {
        let e = &self.entries[i];
        let start = e.weight_offset as usize;
        &self.weights[start..start + e.count as usize]
    }

    /// Largest contributor count of any entry.
    pub fn max_count(&self) -> u32 {
        self.entries.iter().map(|e| e.count).max().unwrap_or(0)
    }

    /// Minimal contiguous range of data-relative source indices the table
    /// reads, as `(start, len)`.
    ///
    /// Only meaningful before [`permute_for_ring`](Self::permute_for_ring).
    pub fn source_span(&self) -> (u32, u32) {
        let stride = self.stride.max(1);
        let mut it = self.entries.iter();
        let Some(e0) = it.next() else {
            return (0, 0);
        };
        let mut min = e0.first / stride;
        let mut max = min + e0.count;
        for e in it {
            let f = e.first / stride;
            min = min.min(f);
            max = max.max(f + e.count);
        }
        (min, max - min)
    }

    /// Rewrite the table for a ring of `capacity` rows.
    ///
    /// Row `r` lives in slot `r % capacity`. Each entry's weights move into
    /// a zero-padded, `capacity`-sized slot. An entry whose rows do not wrap
    /// keeps its count and starts at its first row's slot; an entry whose
    /// rows wrap around the end of the ring covers the whole ring from slot
    /// 0, with zero weights for the slots it does not use.
    ///
    /// Every entry's count must be at most `capacity`.
    pub fn permute_for_ring(&mut self, capacity: u32) -> RescaleResult<()> {
        let m = capacity as usize;
        let stride = self.stride.max(1);
        let mut out = try_vec::<i32>("y ring weights", self.entries.len() * m)?;

        for (i, e) in self.entries.iter_mut().enumerate() {
            debug_assert!(e.count <= capacity);
            let first = (e.first / stride) as usize;
            let n = e.count as usize;
            let src = e.weight_offset as usize;
            let base = i * m;
            let out_first = first % m;
            let out_last = (first + n - 1) % m;

            if out_first <= out_last {
                e.first = out_first as u32 * self.stride;
                out[base..base + n].copy_from_slice(&self.weights[src..src + n]);
            } else {
                // Rows first..first+n occupy slots out_first..m, then 0..=out_last.
                let head = m - out_first;
                e.first = 0;
                e.count = capacity;
                out[base..base + out_last + 1]
                    .copy_from_slice(&self.weights[src + head..src + head + out_last + 1]);
                out[base + out_first..base + m].copy_from_slice(&self.weights[src..src + head]);
            }
            e.weight_offset = base as u32;
        }

        self.weights = out;
        self.weights_per_entry = capacity;
        self.ring = Some(capacity);
        Ok(())
    }
}

impl std::fmt::Display for ContributionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stride = self.stride.max(1);
        for (i, e) in self.entries.iter().enumerate() {
            write!(
                f,
                "{}: fp={}({}) n={} lp={}{} ",
                i,
                e.first / stride,
                e.first,
                e.count,
                e.last,
                if e.slow { " slow" } else { "" }
            )?;
            let mut sum = 0;
            for w in self.entry_weights(i) {
                sum += w;
                write!(f, " {w}")?;
            }
            writeln!(f, " ({sum})")?;
        }
        Ok(())
    }
}

// ============================================================================
// ContributionPlanner
// ============================================================================

/// Inputs for planning one axis.
#[derive(Debug, Clone, Copy)]
pub struct ContributionPlanner<'f> {
    pub axis: Axis,
    /// Full destination length.
    pub dst_len: u32,
    /// Full source length.
    pub src_len: u32,
    /// Destination patch `[patch_offset, patch_offset + patch_len)`.
    pub patch_offset: u32,
    pub patch_len: u32,
    /// Source samples actually supplied, `[data_offset, data_offset + data_len)`.
    pub data_offset: u32,
    pub data_len: u32,
    /// Samples between consecutive source positions (channels for X, the
    /// intermediate row length for Y).
    pub sample_stride: u32,
    /// Largest value a source sample takes.
    pub source_max_value: u32,
    /// Multiplier folded into every weight (bit-depth conversion).
    pub rescale_factor: f64,
    /// Samples read by one wide load, for the `slow` flag.
    pub lane_samples: u32,
    pub filter: &'f dyn ResampleFilter,
}

/// Integer bounds of one output coordinate before clamping.
struct Span {
    left: i64,
    right: i64,
    center: f64,
}

impl<'f> ContributionPlanner<'f> {
    /// Planner covering the full source and destination of one axis.
    pub fn new(
        axis: Axis,
        dst_len: u32,
        src_len: u32,
        sample_stride: u32,
        filter: &'f dyn ResampleFilter,
    ) -> Self {
        Self {
            axis,
            dst_len,
            src_len,
            patch_offset: 0,
            patch_len: dst_len,
            data_offset: 0,
            data_len: src_len,
            sample_stride,
            source_max_value: 255,
            rescale_factor: 1.0,
            lane_samples: LANE_BYTES as u32,
            filter,
        }
    }

    fn validate(&self) -> RescaleResult<()> {
        let axis = self.axis;
        if self.src_len == 0 || self.dst_len == 0 {
            return Err(RescaleError::geometry(
                axis,
                format!(
                    "source length {} and destination length {} must be non-zero",
                    self.src_len, self.dst_len
                ),
            ));
        }
        if self.patch_offset as u64 + self.patch_len as u64 > self.dst_len as u64 {
            return Err(RescaleError::geometry(
                axis,
                format!(
                    "patch {}+{} exceeds destination length {}",
                    self.patch_offset, self.patch_len, self.dst_len
                ),
            ));
        }
        if self.data_offset as u64 + self.data_len as u64 > self.src_len as u64 {
            return Err(RescaleError::geometry(
                axis,
                format!(
                    "data {}+{} exceeds source length {}",
                    self.data_offset, self.data_len, self.src_len
                ),
            ));
        }
        Ok(())
    }

    /// Compute the contribution table for the patch.
    pub fn plan(&self) -> RescaleResult<ContributionTable> {
        self.validate()?;

        let filter = self.filter;
        let src_len = self.src_len;
        let scale = self.dst_len as f64 / src_len as f64;
        let squeeze = scale < 1.0;
        let (width_in, fscale) = if squeeze {
            (filter.support() / scale, 1.0 / scale)
        } else {
            (filter.support(), 1.0)
        };

        let center_denom = 2 * self.dst_len as i64;
        let spans: Vec<Span> = (0..self.patch_len)
            .map(|i| {
                let center_num = (i as i64 + self.patch_offset as i64) * src_len as i64 * 2
                    + src_len as i64
                    - self.dst_len as i64;
                let reach = width_in * center_denom as f64;
                Span {
                    left: iceil((center_num as f64 - reach) / center_denom as f64),
                    right: ifloor((center_num as f64 + reach) / center_denom as f64),
                    center: center_num as f64 / center_denom as f64,
                }
            })
            .collect();

        let weights_per_entry = spans
            .iter()
            .map(|s| (s.right - s.left + 1).max(1) as u32)
            .max()
            .unwrap_or(0)
            .max(4);

        let n = self.patch_len as usize;
        let mut entries = Vec::new();
        entries
            .try_reserve_exact(n)
            .map_err(|_| RescaleError::AllocationFailure {
                what: "contribution entries",
                bytes: n * std::mem::size_of::<ContributionEntry>(),
            })?;
        let mut weights = try_vec::<i32>("contribution weights", n * weights_per_entry as usize)?;

        let data_end = self.data_offset as u64 + self.data_len as u64;
        let row_samples = self.data_len as u64 * self.sample_stride as u64;
        let mut slot = vec![0.0f64; weights_per_entry as usize];

        for (i, s) in spans.iter().enumerate() {
            let first = clamp_index(s.left, src_len);
            let last = clamp_index(s.right, src_len);
            if first < self.data_offset || last as u64 >= data_end {
                return Err(RescaleError::geometry(
                    self.axis,
                    format!(
                        "output {} needs source {}..={} outside data {}+{}",
                        i as u32 + self.patch_offset,
                        first,
                        last,
                        self.data_offset,
                        self.data_len
                    ),
                ));
            }

            let tap = |j: i64| {
                if squeeze {
                    filter.weight((s.center - j as f64) / fscale) / fscale
                } else {
                    filter.weight(s.center - j as f64)
                }
            };
            let mut sum: f64 = (s.left..=s.right).map(tap).sum();
            if sum == 0.0 {
                sum = 1.0;
            }

            slot.iter_mut().for_each(|w| *w = 0.0);
            for j in s.left..=s.right {
                let k = (clamp_index(j, src_len) - first) as usize;
                slot[k] += tap(j) / sum;
            }

            let count = last - first + 1;
            let base = i * weights_per_entry as usize;
            for (k, w) in slot[..count as usize].iter().enumerate() {
                weights[base + k] =
                    round_half_up(w * self.rescale_factor * WEIGHT_SCALE as f64);
            }

            let first_sample = (first - self.data_offset) as u64 * self.sample_stride as u64;
            entries.push(ContributionEntry {
                first: first_sample as u32,
                count,
                weight_offset: base as u32,
                last: last - self.data_offset,
                slow: first_sample + self.lane_samples as u64 > row_samples,
            });
        }

        log::debug!(
            "planned {} axis: {} -> {} patch {}+{} data {}+{} filter={} squeeze={} max_value={} factor={:.4} taps={}",
            self.axis,
            self.src_len,
            self.dst_len,
            self.patch_offset,
            self.patch_len,
            self.data_offset,
            self.data_len,
            filter.name(),
            squeeze,
            self.source_max_value,
            self.rescale_factor,
            weights_per_entry
        );

        Ok(ContributionTable {
            entries,
            weights,
            weights_per_entry,
            stride: self.sample_stride,
            ring: None,
        })
    }
}

/// A zeroed vector of `len` elements, reserved fallibly.
pub(crate) fn try_vec<T: Clone + Default>(what: &'static str, len: usize) -> RescaleResult<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| RescaleError::AllocationFailure {
            what,
            bytes: len.saturating_mul(std::mem::size_of::<T>()),
        })?;
    v.resize(len, T::default());
    Ok(v)
}

// ============================================================================
// Tests
// ============================================================================

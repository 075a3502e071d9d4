//! Resampling filter shapes.
//!
//! Each filter is a pure function of the signed distance `t` (in source
//! samples) between an output sample's mapped center and a source sample,
//! together with its support radius and the rule for sizing the vertical
//! row ring (`contrib_pixels`).

// ============================================================================
// ResampleFilter trait
// ============================================================================

/// Filter shape used by the contribution planner.
pub trait ResampleFilter: std::fmt::Debug + Sync {
    /// Short name used in log output.
    fn name(&self) -> &'static str;
    /// Support radius in source samples; the weight is zero beyond it.
    fn support(&self) -> f64;
    /// Smallest scale the filter's contributor estimate is computed for.
    fn min_scale(&self) -> f64 {
        0.0
    }
    /// Filter weight at signed distance `t` from the center.
    fn weight(&self, t: f64) -> f64;
    /// Number of source rows one output row may depend on at `scale`
    /// (`dst_len / src_len`). Always at least 1.
    fn contrib_pixels(&self, scale: f64) -> u32 {
        if scale == 0.0 {
            return 1;
        }
        let s = if scale >= 1.0 { 1.0 } else { scale };
        (self.support() / s * 2.0 + 1.5) as u32
    }
}

// ============================================================================
// Filter shape implementations
// ============================================================================

/// Nearest neighbour: 1 within ±0.5, else 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterNearest;
impl ResampleFilter for FilterNearest {
    fn name(&self) -> &'static str {
        "nearest"
    }
    fn support(&self) -> f64 {
        1.0
    }
    fn weight(&self, t: f64) -> f64 {
        if t.abs() > 0.5 {
            0.0
        } else {
            1.0
        }
    }
    fn contrib_pixels(&self, _scale: f64) -> u32 {
        1
    }
}

/// Tent filter, `1 - |t|` inside the unit support.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterLinear;
impl ResampleFilter for FilterLinear {
    fn name(&self) -> &'static str {
        "linear"
    }
    fn support(&self) -> f64 {
        1.0
    }
    fn weight(&self, t: f64) -> f64 {
        let t = t.abs();
        if t >= 1.0 {
            return 0.0;
        }
        1.0 - t
    }
}

/// Hermite-like "dog-leg" curve, `1 + (2|t| - 3)t²` inside the unit support.
///
/// Used instead of Mitchell on minified axes: it has no negative lobes, so
/// downscaling neither rings nor blurs as much.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterDogLeg;
impl ResampleFilter for FilterDogLeg {
    fn name(&self) -> &'static str {
        "dogleg"
    }
    fn support(&self) -> f64 {
        1.0
    }
    fn weight(&self, t: f64) -> f64 {
        let t = t.abs();
        if t >= 1.0 {
            return 0.0;
        }
        1.0 + (2.0 * t - 3.0) * t * t
    }
}

const THIRD: f64 = 1.0 / 3.0;
const MITCHELL_SUPPORT: f64 = 2.0;
const MAX_ISCALE_SUPPORT: f64 = 8.0;

/// Mitchell-Netravali cubic with radius 2, parameterized by `b` and `c`.
///
/// [`FilterMitchell::THIRDS`] is the `b = c = 1/3` variant every quality
/// setting uses.
#[derive(Debug, Clone, Copy)]
pub struct FilterMitchell {
    p0: f64,
    p2: f64,
    p3: f64,
    q0: f64,
    q1: f64,
    q2: f64,
    q3: f64,
}

impl FilterMitchell {
    pub const THIRDS: FilterMitchell = FilterMitchell {
        p0: (6.0 - 2.0 * THIRD) / 6.0,
        p2: (-18.0 + 12.0 * THIRD + 6.0 * THIRD) / 6.0,
        p3: (12.0 - 9.0 * THIRD - 6.0 * THIRD) / 6.0,
        q0: (8.0 * THIRD + 24.0 * THIRD) / 6.0,
        q1: (-12.0 * THIRD - 48.0 * THIRD) / 6.0,
        q2: (6.0 * THIRD + 30.0 * THIRD) / 6.0,
        q3: (-THIRD - 6.0 * THIRD) / 6.0,
    };

    pub fn new(b: f64, c: f64) -> Self {
        Self {
            p0: (6.0 - 2.0 * b) / 6.0,
            p2: (-18.0 + 12.0 * b + 6.0 * c) / 6.0,
            p3: (12.0 - 9.0 * b - 6.0 * c) / 6.0,
            q0: (8.0 * b + 24.0 * c) / 6.0,
            q1: (-12.0 * b - 48.0 * c) / 6.0,
            q2: (6.0 * b + 30.0 * c) / 6.0,
            q3: (-b - 6.0 * c) / 6.0,
        }
    }
}

impl Default for FilterMitchell {
    fn default() -> Self {
        Self::THIRDS
    }
}

impl ResampleFilter for FilterMitchell {
    fn name(&self) -> &'static str {
        "mitchell"
    }
    fn support(&self) -> f64 {
        MITCHELL_SUPPORT
    }
    fn min_scale(&self) -> f64 {
        (MITCHELL_SUPPORT * 2.0) / (MAX_ISCALE_SUPPORT - 1.01)
    }
    fn weight(&self, t: f64) -> f64 {
        let t = t.abs();
        if t < 1.0 {
            return self.p0 + t * t * (self.p2 + t * self.p3);
        }
        if t < 2.0 {
            return self.q0 + t * (self.q1 + t * (self.q2 + t * self.q3));
        }
        0.0
    }
    fn contrib_pixels(&self, scale: f64) -> u32 {
        if scale == 0.0 {
            return 1;
        }
        let s = scale.clamp(self.min_scale(), 1.0);
        (MITCHELL_SUPPORT / s * 2.0 + 1.5) as u32
    }
}

// ============================================================================
// Quality selection
// ============================================================================

static NEAREST: FilterNearest = FilterNearest;
static LINEAR: FilterLinear = FilterLinear;
static DOGLEG: FilterDogLeg = FilterDogLeg;
static MITCHELL: FilterMitchell = FilterMitchell::THIRDS;

/// Requested resampling quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Quality {
    Nearest = 0,
    Linear = 1,
    DogLeg = 2,
    #[default]
    Mitchell = 3,
}

impl Quality {
    /// The filter this quality names.
    pub fn filter(self) -> &'static dyn ResampleFilter {
        match self {
            Quality::Nearest => &NEAREST,
            Quality::Linear => &LINEAR,
            Quality::DogLeg => &DOGLEG,
            Quality::Mitchell => &MITCHELL,
        }
    }

    /// The filter to use on one axis.
    ///
    /// Mitchell is swapped for the dog-leg curve on an axis that is being
    /// minified; the other qualities are used as requested.
    pub fn axis_filter(self, dst_len: u32, src_len: u32) -> &'static dyn ResampleFilter {
        match self {
            Quality::Mitchell if dst_len < src_len => &DOGLEG,
            q => q.filter(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

//! # tile-rescale
//!
//! Streaming, tile-oriented separable image rescaler with fixed-point
//! filter weights.
//!
//! Images are resized one row at a time: each source row is filtered
//! horizontally into a small ring of intermediate rows, and each destination
//! row is filtered vertically out of that ring as soon as its source rows
//! are present. Only a window of the source (the *data* rectangle) needs to
//! be supplied, and only a window of the destination (the *patch*) is
//! produced, so a large image can be processed as independent tiles that
//! reassemble bit-exactly.
//!
//! - Nearest, linear, dog-leg and Mitchell filters
//! - 8-bit and 16-bit samples in and out, plus a fractional 16-bit output
//! - Any number of interleaved channels (1, 3 and 4 have dedicated kernels)
//!
//! ## Layout
//!
//! 1. **Filters** ([`filters`]) - filter shapes and quality selection
//! 2. **Planning** ([`contrib`]) - per-output contributor lists and Q12 weights
//! 3. **Kernels** ([`row_kernels`]) - horizontal and vertical row passes
//! 4. **Streaming** ([`rescaler`], [`row_ring`]) - the row protocol
//! 5. **Frames** ([`frame`]) - whole-buffer driver over the row protocol

// Foundation
pub mod basics;
pub mod error;

// Planning
pub mod contrib;
pub mod filters;

// Row passes
pub mod row_kernels;
pub mod row_ring;

// Streaming
pub mod frame;
pub mod rescaler;

pub use error::{Axis, RescaleError, RescaleResult};
pub use filters::{Quality, ResampleFilter};
pub use frame::{rescale_frame, rescale_frame_with};
pub use rescaler::{IncrementalRescaler, Progress, RescaleParams};

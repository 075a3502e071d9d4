//! Whole-frame convenience driver.
//!
//! Runs the row protocol of [`IncrementalRescaler`] over a strided source
//! buffer holding the data window and writes the patch into a strided
//! destination buffer.

use crate::error::{RescaleError, RescaleResult};
use crate::rescaler::{IncrementalRescaler, Progress, RescaleParams};

/// Build a rescaler for `params` and run one frame through it.
///
/// `src` holds `data_h` rows of the data window, `src_stride` bytes apart.
/// `dst` receives `patch_h` rows, `dst_stride` bytes apart.
pub fn rescale_frame(
    params: RescaleParams,
    src: &[u8],
    src_stride: usize,
    dst: &mut [u8],
    dst_stride: usize,
) -> RescaleResult<()> {
    let mut rescaler = IncrementalRescaler::new(params)?;
    rescale_frame_with(&mut rescaler, src, src_stride, dst, dst_stride)
}

/// Run one frame through an existing rescaler, rewinding it first.
pub fn rescale_frame_with(
    rescaler: &mut IncrementalRescaler,
    src: &[u8],
    src_stride: usize,
    dst: &mut [u8],
    dst_stride: usize,
) -> RescaleResult<()> {
    let in_bytes = rescaler.input_row_bytes();
    let out_bytes = rescaler.output_row_bytes();
    let rows_in = rescaler.params().data_h as usize;
    let rows_out = rescaler.params().patch_h as usize;

    check_buffer("source", src.len(), src_stride, in_bytes, rows_in)?;
    check_buffer("destination", dst.len(), dst_stride, out_bytes, rows_out)?;

    rescaler.reset();
    let (mut y_in, mut y_out) = (0usize, 0usize);
    loop {
        let input = (y_in < rows_in).then(|| {
            let start = y_in * src_stride;
            &src[start..start + in_bytes]
        });
        let output: &mut [u8] = if y_out < rows_out {
            let start = y_out * dst_stride;
            &mut dst[start..start + out_bytes]
        } else {
            &mut []
        };

        match rescaler.process(input, output) {
            Progress::Consumed => y_in += 1,
            Progress::Produced => y_out += 1,
            Progress::Done => break,
            Progress::NeedInput => {
                return Err(RescaleError::StreamStalled {
                    fed: y_in as u32,
                    wanted: rescaler.required_source_rows(),
                });
            }
        }
    }

    log::debug!("frame done: {y_in} rows in, {y_out} rows out");
    Ok(())
}

fn check_buffer(
    what: &'static str,
    len: usize,
    stride: usize,
    row_bytes: usize,
    rows: usize,
) -> RescaleResult<()> {
    if rows == 0 {
        return Ok(());
    }
    if stride < row_bytes {
        return Err(RescaleError::BufferTooSmall {
            what,
            needed: row_bytes,
            got: stride,
        });
    }
    let needed = (rows - 1) * stride + row_bytes;
    if len < needed {
        return Err(RescaleError::BufferTooSmall {
            what,
            needed,
            got: len,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::Quality;

    #[test_log::test]
    fn test_nearest_four_to_two() {
        let mut dst = [0u8; 2];
        rescale_frame(
            RescaleParams::new(4, 1, 2, 1).with_quality(Quality::Nearest),
            &[10, 20, 30, 40],
            4,
            &mut dst,
            2,
        )
        .unwrap();
        assert_eq!(dst, [15, 35]);
    }

    #[test_log::test]
    fn test_strided_buffers() {
        // RGB, 3x2 -> 3x2 identity, rows padded to 12 and 16 bytes.
        let params = RescaleParams::new(3, 2, 3, 2)
            .with_quality(Quality::Linear)
            .with_channels(3);
        let mut src = vec![0xEEu8; 24];
        for y in 0..2 {
            for i in 0..9 {
                src[y * 12 + i] = (y * 9 + i) as u8 * 10;
            }
        }
        let mut dst = vec![0xAAu8; 32];
        rescale_frame(params, &src, 12, &mut dst, 16).unwrap();
        for y in 0..2 {
            assert_eq!(dst[y * 16..y * 16 + 9], src[y * 12..y * 12 + 9]);
            assert!(dst[y * 16 + 9..y * 16 + 16].iter().all(|&b| b == 0xAA));
        }
    }

    #[test_log::test]
    fn test_tiles_assemble_into_full_frame() {
        let (sw, sh, dw, dh) = (13u32, 9u32, 31u32, 22u32);
        let src: Vec<u8> = (0..sw * sh).map(|i| ((i * 97) % 256) as u8).collect();
        let mut whole = vec![0u8; (dw * dh) as usize];
        rescale_frame(RescaleParams::new(sw, sh, dw, dh), &src, sw as usize, &mut whole, dw as usize)
            .unwrap();

        // Render the destination as a 2x3 grid of uneven tiles into one buffer.
        let mut tiled = vec![0u8; (dw * dh) as usize];
        for (ty, th) in [(0u32, 7u32), (7, 8), (15, 7)] {
            for (tx, tw) in [(0u32, 16u32), (16, 15)] {
                let params = RescaleParams::new(sw, sh, dw, dh).with_patch(tx, ty, tw, th);
                let offset = (ty * dw + tx) as usize;
                rescale_frame(params, &src, sw as usize, &mut tiled[offset..], dw as usize)
                    .unwrap();
            }
        }
        assert_eq!(tiled, whole);
    }

    #[test]
    fn test_rescaler_reuse_across_frames() {
        let params = RescaleParams::new(6, 6, 4, 4).with_sample_bytes(2, 2);
        let mut rescaler = IncrementalRescaler::new(params).unwrap();
        let frame = |k: u16| -> Vec<u8> {
            (0..36u16).flat_map(|i| (i * 1000 + k).to_ne_bytes()).collect()
        };
        let mut first = vec![0u8; 32];
        let mut again = vec![0u8; 32];
        let mut other = vec![0u8; 32];
        rescale_frame_with(&mut rescaler, &frame(0), 12, &mut first, 8).unwrap();
        rescale_frame_with(&mut rescaler, &frame(500), 12, &mut other, 8).unwrap();
        rescale_frame_with(&mut rescaler, &frame(0), 12, &mut again, 8).unwrap();
        assert_eq!(first, again);
        assert_ne!(first, other);
    }

    #[test]
    fn test_buffer_checks() {
        let params = RescaleParams::new(4, 4, 2, 2);
        let src = [0u8; 16];
        let mut dst = [0u8; 4];

        assert_eq!(
            rescale_frame(params, &src[..15], 4, &mut dst, 2),
            Err(RescaleError::BufferTooSmall {
                what: "source",
                needed: 16,
                got: 15
            })
        );
        assert_eq!(
            rescale_frame(params, &src, 3, &mut dst, 2),
            Err(RescaleError::BufferTooSmall {
                what: "source",
                needed: 4,
                got: 3
            })
        );
        assert!(matches!(
            rescale_frame(params, &src, 4, &mut dst[..3], 2),
            Err(RescaleError::BufferTooSmall {
                what: "destination",
                ..
            })
        ));
        assert!(rescale_frame(params, &src, 4, &mut dst, 2).is_ok());
    }

    #[test]
    fn test_geometry_error_propagates() {
        let params = RescaleParams::new(4, 4, 2, 2).with_patch(1, 0, 2, 2);
        let mut dst = [0u8; 4];
        assert!(matches!(
            rescale_frame(params, &[0u8; 16], 4, &mut dst, 2),
            Err(RescaleError::InvalidGeometry { .. })
        ));
    }
}

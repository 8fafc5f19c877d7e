//! Exact-size bicubic resize.
//!
//! Separable Catmull-Rom filter. When shrinking, the kernel is stretched by the
//! scale factor so every source pixel contributes. Samples falling outside the
//! image are read from its mirrored tiling (`.. 1 0 | 0 1 .. n-1 | n-1 n-2 ..`).
use image::RgbImage;

use crate::errors::{PrepError, PrepResult};

const CHANNELS: usize = 3;

/// Round `dim` up to the next multiple of `stride`. A stride of 0 or 1 keeps
/// `dim` as is.
pub fn align_to_stride(dim: u32, stride: u32) -> u32 {
    if stride <= 1 { dim } else { dim.div_ceil(stride) * stride }
}

/// Resize to exactly `width` x `height`, aspect ratio is not preserved.
///
/// Resizing to the current size returns the image unchanged.
pub fn resize(image: &RgbImage, width: u32, height: u32) -> PrepResult<RgbImage> {
    let (src_w, src_h) = image.dimensions();
    if src_w == 0 || src_h == 0 {
        return Err(PrepError::shape(format!("cannot resize empty {src_w}x{src_h} image")));
    }
    if width == 0 || height == 0 {
        return Err(PrepError::shape(format!("invalid resize target {width}x{height}")));
    }
    if (src_w, src_h) == (width, height) {
        return Ok(image.clone());
    }
    trace!("Resizing {src_w}x{src_h} to {width}x{height}");

    let (src_w, src_h, dst_w, dst_h) =
        (src_w as usize, src_h as usize, width as usize, height as usize);
    let src = image.as_raw();

    // horizontal pass: src_h rows of dst_w pixels
    let columns = taps(src_w, dst_w);
    let mut horizontal = vec![0f32; src_h * dst_w * CHANNELS];
    for y in 0..src_h {
        let row = &src[y * src_w * CHANNELS..][..src_w * CHANNELS];
        for (x, tap) in columns.iter().enumerate() {
            let out = &mut horizontal[(y * dst_w + x) * CHANNELS..][..CHANNELS];
            for (&ix, &w) in tap.indices.iter().zip(&tap.weights) {
                for c in 0..CHANNELS {
                    out[c] += row[ix * CHANNELS + c] as f32 * w;
                }
            }
        }
    }

    // vertical pass
    let rows = taps(src_h, dst_h);
    let mut pixels = Vec::with_capacity(dst_w * dst_h * CHANNELS);
    for tap in &rows {
        for x in 0..dst_w {
            let mut acc = [0f32; CHANNELS];
            for (&iy, &w) in tap.indices.iter().zip(&tap.weights) {
                let px = &horizontal[(iy * dst_w + x) * CHANNELS..][..CHANNELS];
                for c in 0..CHANNELS {
                    acc[c] += px[c] * w;
                }
            }
            pixels.extend(acc.iter().map(|v| v.round().clamp(0.0, 255.0) as u8));
        }
    }

    RgbImage::from_raw(width, height, pixels)
        .ok_or_else(|| PrepError::shape(format!("buffer does not fit {width}x{height}")))
}

/// Source indices and normalized weights contributing to one output pixel.
#[derive(Debug)]
struct Taps {
    indices: Vec<usize>,
    weights: Vec<f32>,
}

fn taps(src_len: usize, dst_len: usize) -> Vec<Taps> {
    let ratio = src_len as f32 / dst_len as f32;
    let scale = ratio.max(1.0);
    let support = 2.0 * scale;
    (0..dst_len)
        .map(|out| {
            let center = (out as f32 + 0.5) * ratio;
            let left = (center - support).floor() as isize;
            let right = (center + support).ceil() as isize;
            let mut indices = Vec::with_capacity((right - left) as usize);
            let mut weights = Vec::with_capacity((right - left) as usize);
            for i in left..right {
                let w = catmull_rom((i as f32 + 0.5 - center) / scale);
                if w != 0.0 {
                    indices.push(mirror(i, src_len));
                    weights.push(w);
                }
            }
            let sum: f32 = weights.iter().sum();
            if sum != 0.0 {
                weights.iter_mut().for_each(|w| *w /= sum);
            }
            Taps { indices, weights }
        })
        .collect()
}

/// Cubic convolution kernel with a = -0.5.
fn catmull_rom(x: f32) -> f32 {
    const A: f32 = -0.5;
    let x = x.abs();
    if x < 1.0 {
        ((A + 2.0) * x - (A + 3.0)) * x * x + 1.0
    } else if x < 2.0 {
        ((A * x - 5.0 * A) * x + 8.0 * A) * x - 4.0 * A
    } else {
        0.0
    }
}

/// Map any integer coordinate into `0..len` through mirrored tiling.
fn mirror(i: isize, len: usize) -> usize {
    let period = 2 * len as isize;
    let i = i.rem_euclid(period);
    if i < len as isize { i as usize } else { (period - 1 - i) as usize }
}

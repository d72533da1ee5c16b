//! Physical layer: spectrum-to-frame and frame-to-spectrum transforms,
//! clipping/quantization, and cyclic prefix framing.
//!
//! Grounded in `focus.phy`.

use ndarray::Array2;
use num_complex::Complex32;

use crate::fft::{irfft2, rfft2};

/// Minimum acceptable signal-to-noise ratio (dB) after clipping, per
/// "pg. 22-23" of the original thesis this implementation descends from.
pub const MIN_SNR_DB: f64 = 45.0;

/// Binary search on the clip threshold is capped at this many
/// iterations. The original loops until `round(snr) == MIN_SNR_DB`
/// exactly, which can in principle never terminate at `f64` precision;
/// this bound keeps the search from looping forever while still
/// converging well past the precision anyone could observe.
const MAX_SEARCH_ITERATIONS: u32 = 64;

/// Signal-to-noise ratio, in dB, between a signal and a distorted copy.
pub fn snr_db(signal: &Array2<f32>, distorted: &Array2<f32>) -> f64 {
    let mut signal_power = 0.0f64;
    let mut noise_power = 0.0f64;
    let n = signal.len() as f64;
    for (&s, &d) in signal.iter().zip(distorted.iter()) {
        let noise = (s - d) as f64;
        signal_power += (s as f64) * (s as f64);
        noise_power += noise * noise;
    }
    let snr = (signal_power / n) / (noise_power / n);
    10.0 * snr.log10()
}

/// Clips `frame` at a threshold chosen (by binary search) so the
/// resulting SNR is close to [`MIN_SNR_DB`], then affine-scales the
/// result into `[0, 255]` and quantizes to 8-bit unsigned samples.
pub fn clip_and_quantize(frame: &Array2<f32>) -> Array2<u8> {
    let peak = frame.iter().cloned().fold(f32::MIN, f32::max);

    let mut lower_thresh = 0.5f64;
    let mut upper_thresh = 1.0f64;
    let mut thresh = (upper_thresh + lower_thresh) / 2.0;

    let clip_at = |t: f64| -> Array2<f32> {
        let ceiling = (t as f32) * peak;
        frame.mapv(|v| v.min(ceiling))
    };

    let mut clipped = clip_at(thresh);
    let mut current_snr = snr_db(frame, &clipped);

    for _ in 0..MAX_SEARCH_ITERATIONS {
        if current_snr.round() == MIN_SNR_DB {
            break;
        }
        if current_snr > MIN_SNR_DB {
            upper_thresh = thresh;
        } else {
            lower_thresh = thresh;
        }
        thresh = (upper_thresh + lower_thresh) / 2.0;
        clipped = clip_at(thresh);
        current_snr = snr_db(frame, &clipped);
    }

    let min = clipped.iter().cloned().fold(f32::MAX, f32::min);
    let max = clipped.iter().cloned().fold(f32::MIN, f32::max);
    let range = if max - min == 0.0 { 1.0 } else { max - min };
    clipped.mapv(|v| (((v - min) / range) * 255.0) as u8)
}

/// Produces a transmit-ready code image from a packed spectrum: inverse
/// real 2-D FFT, optionally followed by clip-and-quantize normalization.
pub fn tx(spectrum: &Array2<Complex32>, width: usize, normalize: bool) -> Array2<u8> {
    let code = irfft2(spectrum, width);
    if normalize {
        clip_and_quantize(&code)
    } else {
        code.mapv(|v| v.clamp(0.0, 255.0) as u8)
    }
}

/// Recovers a spectrum from a received (already rectified,
/// cyclic-prefix-stripped) grayscale frame.
pub fn rx(frame: &Array2<u8>) -> Array2<Complex32> {
    let as_f32 = frame.mapv(|v| v as f32);
    rfft2(&as_f32)
}

/// Adds a cyclic prefix of `pixels` on every side by 3x3-tiling `img`
/// and extracting the centered window.
pub fn add_cyclic_prefix(img: &Array2<u8>, pixels: usize) -> Array2<u8> {
    let (h, w) = (img.shape()[0], img.shape()[1]);
    let mut tiled = Array2::<u8>::zeros((3 * h, 3 * w));
    for ty in 0..3 {
        for txi in 0..3 {
            tiled
                .slice_mut(ndarray::s![ty * h..(ty + 1) * h, txi * w..(txi + 1) * w])
                .assign(img);
        }
    }
    let offset_y = h - pixels;
    let offset_x = w - pixels;
    tiled
        .slice(ndarray::s![
            offset_y..3 * h - offset_y,
            offset_x..3 * w - offset_x
        ])
        .to_owned()
}

/// Strips a cyclic prefix of `pixels` from every side.
pub fn strip_cyclic_prefix(img: &Array2<u8>, pixels: usize) -> Array2<u8> {
    let (h, w) = (img.shape()[0], img.shape()[1]);
    img.slice(ndarray::s![pixels..h - pixels, pixels..w - pixels])
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_strip_cyclic_prefix_is_identity() {
        let img = Array2::<u8>::from_shape_fn((64, 64), |(i, j)| ((i * 13 + j * 7) % 256) as u8);
        let cp = 8;
        let with_cp = add_cyclic_prefix(&img, cp);
        assert_eq!(with_cp.shape(), &[64 + 2 * cp, 64 + 2 * cp]);
        let stripped = strip_cyclic_prefix(&with_cp, cp);
        assert_eq!(stripped, img);
    }

    #[test]
    fn clip_and_quantize_produces_full_dynamic_range() {
        let frame = Array2::<f32>::from_shape_fn((32, 32), |(i, j)| {
            if i == 0 && j == 0 {
                1000.0
            } else {
                (i * j) as f32
            }
        });
        let quantized = clip_and_quantize(&frame);
        let min = *quantized.iter().min().unwrap();
        let max = *quantized.iter().max().unwrap();
        assert_eq!(min, 0);
        assert_eq!(max, 255);
    }

    #[test]
    fn snr_of_identical_signals_is_infinite() {
        let frame = Array2::<f32>::from_elem((8, 8), 5.0);
        assert!(snr_db(&frame, &frame).is_infinite());
    }

    #[test]
    fn tx_rx_round_trips_through_the_fft() {
        let shape = (16, 16);
        let spectrum = Array2::<Complex32>::from_shape_fn((shape.0, shape.1 / 2 + 1), |(r, c)| {
            Complex32::new((r + c) as f32, (r as f32 - c as f32) * 0.1)
        });
        let code = tx(&spectrum, shape.1, false);
        let recovered_spectrum = rx(&code);
        assert_eq!(recovered_spectrum.shape(), spectrum.shape());
    }
}

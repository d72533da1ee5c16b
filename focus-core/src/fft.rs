//! Real-valued 2-D FFT backend with a plan cache and "wisdom" pre-warming.
//!
//! Grounded in `focus.fft`: the original wraps `pyfftw`'s planner cache
//! and persists its measured plans ("wisdom") to a per-host file so a
//! later process can skip the expensive `FFTW_MEASURE` planning pass.
//! No Rust FFT crate exposes an equivalent opaque planner-state blob, so
//! wisdom is reinterpreted here as a small file listing shapes that have
//! been planned before; `warm()` reads it and eagerly constructs plans
//! for those shapes so the first real transform of a session is already
//! fast.
//!
//! `rfft2`/`irfft2` are NumPy's real 2-D FFT decomposed into a real FFT
//! along rows (via `realfft`) followed by a complex FFT along columns
//! (via `rustfft`), matching `np.fft.rfft2`'s own row-then-column
//! decomposition.

use std::collections::HashMap;
use std::io::{BufRead, BufWriter, Write};
use std::sync::{Arc, Mutex};

use ndarray::Array2;
use num_complex::Complex32;
use once_cell::sync::Lazy;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use rustfft::{Fft, FftPlanner};

use crate::config::Shape;

struct PlanSet {
    r2c: Arc<dyn RealToComplex<f32>>,
    c2r: Arc<dyn ComplexToReal<f32>>,
    col_fft: Arc<dyn Fft<f32>>,
    col_ifft: Arc<dyn Fft<f32>>,
}

fn build_plans(shape: Shape) -> PlanSet {
    let mut real_planner = RealFftPlanner::<f32>::new();
    let r2c = real_planner.plan_fft_forward(shape.1);
    let c2r = real_planner.plan_fft_inverse(shape.1);

    let mut fft_planner = FftPlanner::<f32>::new();
    let col_fft = fft_planner.plan_fft_forward(shape.0);
    let col_ifft = fft_planner.plan_fft_inverse(shape.0);

    PlanSet {
        r2c,
        c2r,
        col_fft,
        col_ifft,
    }
}

static PLAN_CACHE: Lazy<Mutex<HashMap<Shape, Arc<PlanSet>>>> = Lazy::new(|| Mutex::new(HashMap::new()));

fn plans_for(shape: Shape) -> Arc<PlanSet> {
    let mut cache = PLAN_CACHE.lock().expect("fft plan cache poisoned");
    cache
        .entry(shape)
        .or_insert_with(|| Arc::new(build_plans(shape)))
        .clone()
}

/// Forward real 2-D FFT: `frame[H, W]` of real samples to a
/// conjugate-symmetric-compact `spectrum[H, W/2+1]`.
pub fn rfft2(frame: &Array2<f32>) -> Array2<Complex32> {
    let shape = (frame.shape()[0], frame.shape()[1]);
    let plans = plans_for(shape);
    let half_width = shape.1 / 2 + 1;

    // Row-wise real FFT.
    let mut row_spectrum = Array2::<Complex32>::zeros((shape.0, half_width));
    let mut scratch = plans.r2c.make_scratch_vec();
    for r in 0..shape.0 {
        let mut row_in: Vec<f32> = frame.row(r).to_vec();
        let mut row_out = plans.r2c.make_output_vec();
        plans
            .r2c
            .process_with_scratch(&mut row_in, &mut row_out, &mut scratch)
            .expect("rfft2: row FFT failed");
        for c in 0..half_width {
            row_spectrum[[r, c]] = row_out[c];
        }
    }

    // Column-wise complex FFT.
    let mut spectrum = row_spectrum.clone();
    for c in 0..half_width {
        let mut col: Vec<Complex32> = (0..shape.0).map(|r| row_spectrum[[r, c]]).collect();
        plans.col_fft.process(&mut col);
        for r in 0..shape.0 {
            spectrum[[r, c]] = col[r];
        }
    }
    spectrum
}

/// Inverse real 2-D FFT: `spectrum[H, W/2+1]` back to a real
/// `frame[H, W]`. `width` must be the original row length (needed to
/// disambiguate whether `W` was even or odd).
pub fn irfft2(spectrum: &Array2<Complex32>, width: usize) -> Array2<f32> {
    let height = spectrum.shape()[0];
    let half_width = spectrum.shape()[1];
    let shape = (height, width);
    let plans = plans_for(shape);

    // Inverse column-wise complex FFT.
    let mut col_ifft_result = spectrum.clone();
    for c in 0..half_width {
        let mut col: Vec<Complex32> = (0..height).map(|r| spectrum[[r, c]]).collect();
        plans.col_ifft.process(&mut col);
        let norm = 1.0 / height as f32;
        for r in 0..height {
            col_ifft_result[[r, c]] = col[r] * norm;
        }
    }

    // Inverse row-wise real FFT.
    let mut frame = Array2::<f32>::zeros((height, width));
    let mut scratch = plans.c2r.make_scratch_vec();
    for r in 0..height {
        let mut row_in: Vec<Complex32> = (0..half_width).map(|c| col_ifft_result[[r, c]]).collect();
        let mut row_out = plans.c2r.make_output_vec();
        plans
            .c2r
            .process_with_scratch(&mut row_in, &mut row_out, &mut scratch)
            .expect("irfft2: row inverse FFT failed");
        let norm = 1.0 / width as f32;
        for (c, v) in row_out.iter().enumerate() {
            frame[[r, c]] = v * norm;
        }
    }
    frame
}

/// Path of the wisdom file for this host, following the original's
/// Android-vs-desktop split.
pub fn wisdom_filename() -> std::path::PathBuf {
    if crate::utils::is_android() {
        std::path::PathBuf::from(format!(
            "/sdcard/wisdom-{}",
            hostname().unwrap_or_else(|| "unknown".to_string())
        ))
    } else {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        std::path::PathBuf::from(format!(
            "{}/.focus-wisdom-{}",
            home,
            hostname().unwrap_or_else(|| "unknown".to_string())
        ))
    }
}

fn hostname() -> Option<String> {
    std::process::Command::new("hostname")
        .output()
        .ok()
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
}

/// Reads the wisdom file (one `HxW` shape per line) and eagerly builds
/// plans for every shape it names, so the first real transform in this
/// process doesn't pay the planning cost. Returns the number of shapes
/// warmed. A missing wisdom file is not an error -- it just means this
/// host hasn't run `fft_init` yet.
pub fn warm_from_wisdom() -> std::io::Result<usize> {
    let path = wisdom_filename();
    let file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };
    let reader = std::io::BufReader::new(file);
    let mut warmed = 0;
    for line in reader.lines() {
        let line = line?;
        if let Some((h, w)) = parse_shape_line(&line) {
            plans_for((h, w));
            warmed += 1;
        }
    }
    Ok(warmed)
}

fn parse_shape_line(line: &str) -> Option<(usize, usize)> {
    let mut parts = line.trim().split('x');
    let h = parts.next()?.parse().ok()?;
    let w = parts.next()?.parse().ok()?;
    Some((h, w))
}

/// Plans `shapes`, then writes them to the wisdom file so a future
/// process can `warm_from_wisdom()` without re-measuring.
pub fn save_wisdom(shapes: &[Shape]) -> std::io::Result<()> {
    for &shape in shapes {
        plans_for(shape);
    }
    let path = wisdom_filename();
    let file = std::fs::File::create(&path)?;
    let mut writer = BufWriter::new(file);
    for &(h, w) in shapes {
        writeln!(writer, "{}x{}", h, w)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfft2_irfft2_round_trips() {
        let shape = (16, 16);
        let frame = Array2::<f32>::from_shape_fn(shape, |(i, j)| ((i * 7 + j * 3) % 251) as f32);
        let spectrum = rfft2(&frame);
        let recovered = irfft2(&spectrum, shape.1);
        for (a, b) in frame.iter().zip(recovered.iter()) {
            assert!((a - b).abs() < 1e-2, "{} vs {}", a, b);
        }
    }

    #[test]
    fn rfft2_of_constant_frame_is_dc_only() {
        let shape = (8, 8);
        let frame = Array2::<f32>::from_elem(shape, 3.0);
        let spectrum = rfft2(&frame);
        assert!((spectrum[[0, 0]].re - 3.0 * 64.0).abs() < 1e-2);
        for r in 0..shape.0 {
            for c in 0..(shape.1 / 2 + 1) {
                if (r, c) != (0, 0) {
                    assert!(spectrum[[r, c]].norm() < 1e-2);
                }
            }
        }
    }

    #[test]
    fn parses_wisdom_shape_lines() {
        assert_eq!(parse_shape_line("512x512"), Some((512, 512)));
        assert_eq!(parse_shape_line("garbage"), None);
    }
}

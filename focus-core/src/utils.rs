//! Small helpers shared across the FOCUS pipeline.

use num_complex::Complex32;

/// Signed phase difference `arg(a) - arg(b)`, wrapped into `(-pi, pi]`.
///
/// Grounded in `focus.util.phase_diff`, used by the FFT backend's
/// cross-check tests against a reference transform.
pub fn phase_diff(a: Complex32, b: Complex32) -> f32 {
    let arg_a = a.arg();
    let arg_b = b.arg();
    (arg_a - arg_b).sin().atan2((arg_a - arg_b).cos())
}

/// Human-readable byte count, e.g. `"1.5 KiB"`.
///
/// Grounded in `focus.util.sizeof_fmt`.
pub fn sizeof_fmt(num: f64) -> String {
    let mut num = num;
    for unit in ["", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "Zi"] {
        if num.abs() < 1024.0 {
            return format!("{:.1} {}B", num, unit);
        }
        num /= 1024.0;
    }
    format!("{:.1} YiB", num)
}

/// Whether this process is running on the Android port's sandboxed
/// filesystem layout, which relocates the wisdom file and (in the
/// original) the worker binary.
pub fn is_android() -> bool {
    std::path::Path::new("/data/data/se.sics.vizpy").exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_diff_of_equal_phases_is_zero() {
        let a = Complex32::new(1.0, 1.0);
        assert!(phase_diff(a, a).abs() < 1e-6);
    }

    #[test]
    fn phase_diff_wraps_correctly() {
        let a = Complex32::new(1.0, 0.0); // phase 0
        let b = Complex32::new(-1.0, 0.0); // phase pi
        let d = phase_diff(a, b);
        assert!((d.abs() - std::f32::consts::PI).abs() < 1e-4);
    }

    #[test]
    fn sizeof_fmt_formats_small_values() {
        assert_eq!(sizeof_fmt(512.0), "512.0 B");
    }

    #[test]
    fn sizeof_fmt_formats_kibibytes() {
        assert_eq!(sizeof_fmt(1536.0), "1.5 KiB");
    }
}

//! Fresnel phase retrieval.
//!
//! Single-shot frequency-domain filter for flat-field corrected
//! projections: each projection is transformed, multiplied by the Fresnel
//! kernel `H = 1 / (2 pi lambda dist w^2 + alpha)` on a centered
//! reciprocal-space grid, and transformed back. The filter is
//! deterministic and non-iterative; `alpha` regularizes the kernel at
//! zero spatial frequency.

use ndarray::{Array2, Array3, ArrayView2, Axis};
use rayon::prelude::*;
use rustfft::FftPlanner;
use tracing::info;

use crate::error::{PreprocError, Result};
use crate::float_trait::TomoFloat;
use crate::transforms::{fft2d, fftshift2, ifft2d, ifftshift2};

// =============================================================================
// Constants
// =============================================================================

/// Reduced Planck constant in keV * s.
const PLANCK_CONSTANT: f64 = 6.58211928e-19;

/// Speed of light in cm / s.
const SPEED_OF_LIGHT: f64 = 2.99792458e10;

// =============================================================================
// Fresnel kernel
// =============================================================================

/// Centered reciprocal-space sampling for an extent of `n` detector
/// elements: `(2 pi / ((n - 1) * pixel_size)) * (k - (n - 1) / 2)`.
fn frequency_grid<F: TomoFloat>(n: usize, pixel_size: F) -> Vec<F> {
    let two = F::from_f64_c(2.0);
    let scale = two * F::PI / (F::usize_as(n - 1) * pixel_size);
    let half_span = F::usize_as(n - 1) / two;
    (0..n)
        .map(|k| scale * (F::usize_as(k) - half_span))
        .collect()
}

/// Fresnel filter over the (slice, pixel) plane, evaluated on the
/// centered squared-frequency grid.
fn fresnel_filter<F: TomoFloat>(
    n_slices: usize,
    n_pixels: usize,
    pixel_size: F,
    dist: F,
    wavelength: F,
    alpha: F,
) -> Array2<F> {
    let v = frequency_grid(n_slices, pixel_size);
    let u = frequency_grid(n_pixels, pixel_size);
    let two = F::from_f64_c(2.0);
    let gain = two * F::PI * wavelength * dist;

    Array2::from_shape_fn((n_slices, n_pixels), |(r, c)| {
        let w2 = v[r] * v[r] + u[c] * u[c];
        F::one() / (gain * w2 + alpha)
    })
}

/// Filter one projection: `1 - Re(ifft2(ifftshift(H . fftshift(fft2(1 - p)))))`.
fn retrieve_projection<F: TomoFloat>(projection: ArrayView2<F>, filter: &Array2<F>) -> Array2<F> {
    let (rows, cols) = projection.dim();
    let mut planner = FftPlanner::new();
    let fft_row = planner.plan_fft_forward(cols);
    let fft_col = planner.plan_fft_forward(rows);
    let ifft_row = planner.plan_fft_inverse(cols);
    let ifft_col = planner.plan_fft_inverse(rows);

    let inverted = projection.mapv(|v| F::one() - v);
    let spectrum = fft2d(inverted.view(), &fft_row, &fft_col);
    let mut shifted = fftshift2(&spectrum);
    shifted.zip_mut_with(filter, |z, &h| *z = *z * h);
    let unshifted = ifftshift2(&shifted);
    let real = ifft2d(&unshifted, &ifft_row, &ifft_col);

    real.mapv(|v| F::one() - v)
}

// =============================================================================
// Main Entry Point
// =============================================================================

/// Retrieve phase from a stack of flat-field corrected projections,
/// in place.
///
/// `pixel_size` is the detector pixel size in cm, `dist` the propagation
/// distance in cm, `energy` the x-ray energy in keV, and `alpha` the
/// regularization of the Fresnel kernel. Projections (axis 0) are
/// independent and processed in parallel.
///
/// # Errors
///
/// `InvalidParameter` for non-positive `pixel_size`, `dist`, `energy`, or
/// `alpha`, or when a slice/pixel extent is below 2 (the reciprocal grid
/// divides by `extent - 1`).
pub fn retrieve_phase<F: TomoFloat>(
    stack: &mut Array3<F>,
    pixel_size: F,
    dist: F,
    energy: F,
    alpha: F,
) -> Result<()> {
    if pixel_size <= F::zero() || dist <= F::zero() || energy <= F::zero() {
        return Err(PreprocError::InvalidParameter(
            "pixel_size, dist, and energy must be > 0".to_string(),
        ));
    }
    if alpha <= F::zero() {
        return Err(PreprocError::InvalidParameter(
            "alpha must be > 0".to_string(),
        ));
    }

    let (n_projections, n_slices, n_pixels) = stack.dim();
    if n_slices < 2 || n_pixels < 2 {
        return Err(PreprocError::InvalidParameter(format!(
            "projection extent ({}, {}) is too small for the reciprocal grid",
            n_slices, n_pixels
        )));
    }

    info!(
        projections = n_projections,
        dist = ?dist,
        energy = ?energy,
        "retrieving phase"
    );

    let two = F::from_f64_c(2.0);
    let wavelength = two * F::PI * F::from_f64_c(PLANCK_CONSTANT) * F::from_f64_c(SPEED_OF_LIGHT)
        / energy;
    let filter = fresnel_filter(n_slices, n_pixels, pixel_size, dist, wavelength, alpha);

    let retrieved: Vec<Array2<F>> = {
        let view = stack.view();
        (0..n_projections)
            .into_par_iter()
            .map(|p| retrieve_projection(view.index_axis(Axis(0), p), &filter))
            .collect()
    };

    for (p, plane) in retrieved.into_iter().enumerate() {
        stack.index_axis_mut(Axis(0), p).assign(&plane);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    struct SimpleLcg {
        state: u64,
    }

    impl SimpleLcg {
        fn new(seed: u64) -> Self {
            Self { state: seed }
        }

        fn next_f64(&mut self) -> f64 {
            self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
            (self.state >> 11) as f64 / (1u64 << 53) as f64
        }
    }

    // Detector pixel 1 um, 50 cm propagation, 20 keV.
    const PIXEL: f64 = 1e-4;
    const DIST: f64 = 50.0;
    const ENERGY: f64 = 20.0;

    #[test]
    fn test_rejects_nonpositive_geometry() {
        let mut stack = Array3::from_elem((2, 8, 8), 0.5f64);
        assert!(retrieve_phase(&mut stack, 0.0, DIST, ENERGY, 1.0).is_err());
        assert!(retrieve_phase(&mut stack, PIXEL, -1.0, ENERGY, 1.0).is_err());
        assert!(retrieve_phase(&mut stack, PIXEL, DIST, 0.0, 1.0).is_err());
        assert!(retrieve_phase(&mut stack, PIXEL, DIST, ENERGY, 0.0).is_err());
    }

    #[test]
    fn test_rejects_degenerate_extent() {
        let mut stack = Array3::from_elem((2, 1, 8), 0.5f64);
        assert!(matches!(
            retrieve_phase(&mut stack, PIXEL, DIST, ENERGY, 1.0),
            Err(PreprocError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_shape_preserved_and_finite() {
        let mut rng = SimpleLcg::new(271);
        let mut stack = Array3::from_shape_fn((4, 6, 9), |_| rng.next_f64());
        retrieve_phase(&mut stack, PIXEL, DIST, ENERGY, 1.0).unwrap();

        assert_eq!(stack.dim(), (4, 6, 9));
        assert!(stack.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_constant_projection_is_fixed_point() {
        // A constant projection has only a DC component; odd extents put a
        // grid point exactly at zero frequency, where the kernel is
        // 1/alpha = 1.
        let mut stack = Array3::from_elem((2, 5, 7), 0.3f64);
        retrieve_phase(&mut stack, PIXEL, DIST, ENERGY, 1.0).unwrap();

        for &v in stack.iter() {
            assert!(approx_eq(v, 0.3, 1e-10), "constant drifted to {}", v);
        }
    }

    #[test]
    fn test_high_frequency_content_attenuated() {
        // An alternating stripe along the pixel axis sits at the edge of
        // the reciprocal grid, where the kernel gain is far below 1.
        let mut stack = Array3::from_shape_fn((1, 9, 33), |(_, _, c)| {
            0.5 + if c % 2 == 0 { 0.2 } else { -0.2 }
        });
        let variance = |s: &Array3<f64>| {
            let mean = s.iter().sum::<f64>() / s.len() as f64;
            s.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / s.len() as f64
        };
        let var_before = variance(&stack);

        retrieve_phase(&mut stack, PIXEL, DIST, ENERGY, 1.0).unwrap();
        let var_after = variance(&stack);

        assert!(
            var_after < 0.5 * var_before,
            "stripe not attenuated: {} -> {}",
            var_before,
            var_after
        );
    }

    #[test]
    fn test_large_alpha_suppresses_filter() {
        // As alpha grows the kernel vanishes everywhere and the output of
        // 1 - ifft(H * fft(1 - p)) approaches 1.
        let mut rng = SimpleLcg::new(88);
        let mut stack = Array3::from_shape_fn((2, 8, 8), |_| rng.next_f64());
        retrieve_phase(&mut stack, PIXEL, DIST, ENERGY, 1e12).unwrap();

        for &v in stack.iter() {
            assert!(approx_eq(v, 1.0, 1e-6), "got {}", v);
        }
    }

    #[test]
    fn test_deterministic() {
        let mut rng = SimpleLcg::new(31);
        let stack = Array3::from_shape_fn((3, 8, 16), |_| rng.next_f64());

        let mut first = stack.clone();
        retrieve_phase(&mut first, PIXEL, DIST, ENERGY, 1.0).unwrap();
        let mut second = stack.clone();
        retrieve_phase(&mut second, PIXEL, DIST, ENERGY, 1.0).unwrap();

        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a, b);
        }
    }
}

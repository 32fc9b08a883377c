//! Rotation-center search.
//!
//! Finds the rotation center that minimizes the entropy of a reconstructed
//! slice: a well-centered reconstruction is sharp and needs few histogram
//! bins, while a mis-centered one smears mass across many bins. The search
//! couples a 1D Nelder-Mead minimizer to an entropy cost evaluated on
//! single-slice reconstructions from the external operator.
//!
//! Ported from the optimize_center.pro lineage (Mark Rivers), with a
//! Gaussian low-pass ahead of the histogram to keep edgy or phase-contrast
//! data from biasing the entropy estimate.

use ndarray::{ArrayView2, ArrayView3};
use tracing::{debug, info, warn};

use crate::error::{PreprocError, Result};
use crate::float_trait::TomoFloat;
use crate::optimize::nelder_mead_1d;
use crate::recon::ReconstructionOperator;
use crate::smoothing::gaussian_blur_isotropic;

// =============================================================================
// Constants
// =============================================================================

/// Number of histogram bins for the entropy estimate.
const HIST_BINS: usize = 64;

/// Additive floor keeping empty bins out of the log.
const HIST_EPSILON: f64 = 1e-12;

/// Nelder-Mead iteration budget for the 1D search.
const MAX_ITERATIONS: usize = 200;

/// Default desired sub-pixel accuracy on the center.
const DEFAULT_TOLERANCE: f64 = 0.5;

/// Default sigma of the low-pass applied before histogramming.
const DEFAULT_FILTER_SIGMA: f64 = 2.0;

// =============================================================================
// Types
// =============================================================================

/// Configuration for the rotation-center search.
#[derive(Debug, Clone)]
pub struct CenterSearchConfig<F: TomoFloat> {
    /// Slice used for the search. Default: the middle slice.
    pub slice_index: Option<usize>,
    /// Initial center guess. Default: half the pixel-axis extent.
    pub initial_center: Option<F>,
    /// Lower histogram bound. Default: derived from a probe
    /// reconstruction at the initial center.
    pub hist_min: Option<F>,
    /// Upper histogram bound. Default: derived from the probe.
    pub hist_max: Option<F>,
    /// Desired sub-pixel accuracy. Default: 0.5
    pub tolerance: F,
    /// Sigma of the pre-histogram low-pass. Higher values help datasets
    /// with strong high-frequency content. Default: 2.0
    pub filter_sigma: F,
}

impl<F: TomoFloat> Default for CenterSearchConfig<F> {
    fn default() -> Self {
        Self {
            slice_index: None,
            initial_center: None,
            hist_min: None,
            hist_max: None,
            tolerance: F::from_f64_c(DEFAULT_TOLERANCE),
            filter_sigma: F::from_f64_c(DEFAULT_FILTER_SIGMA),
        }
    }
}

impl<F: TomoFloat> CenterSearchConfig<F> {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration parameters.
    pub fn validate(&self) -> Result<()> {
        if self.tolerance <= F::zero() {
            return Err(PreprocError::InvalidParameter(
                "tolerance must be > 0".to_string(),
            ));
        }
        if self.filter_sigma < F::zero() {
            return Err(PreprocError::InvalidParameter(
                "filter_sigma must be >= 0".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Entropy cost
// =============================================================================

/// Shannon entropy (bits) of the 64-bin intensity histogram of a
/// reconstructed slice, smoothed with an isotropic Gaussian first.
///
/// Values outside `[hist_min, hist_max]` are clamped into the edge bins;
/// counts are normalized by the total pixel count and floored at 1e-12
/// before the log. Lower is sharper.
pub fn entropy_cost<F: TomoFloat>(
    recon_slice: ArrayView2<F>,
    hist_min: F,
    hist_max: F,
    filter_sigma: F,
) -> F {
    let smoothed = if filter_sigma > F::zero() {
        gaussian_blur_isotropic(recon_slice, filter_sigma)
    } else {
        recon_slice.to_owned()
    };

    let range = hist_max - hist_min;
    let bins_f = F::usize_as(HIST_BINS);
    let mut counts = [0usize; HIST_BINS];

    for &v in smoothed.iter() {
        let clamped = if v < hist_min {
            hist_min
        } else if v > hist_max {
            hist_max
        } else {
            v
        };
        let idx = ((clamped - hist_min) / range * bins_f)
            .to_usize()
            .unwrap_or(0)
            .min(HIST_BINS - 1);
        counts[idx] += 1;
    }

    let total = F::usize_as(smoothed.len());
    let eps = F::from_f64_c(HIST_EPSILON);
    let mut cost = F::zero();
    for &count in counts.iter() {
        let p = F::usize_as(count) / total + eps;
        cost -= p * p.log2();
    }

    cost
}

/// Cost of one candidate center: reconstruct the slice with the center
/// passed explicitly, then take the entropy of the result.
pub fn center_cost<F: TomoFloat, R: ReconstructionOperator<F>>(
    recon: &R,
    stack: ArrayView3<F>,
    slice_index: usize,
    center: F,
    hist_min: F,
    hist_max: F,
    filter_sigma: F,
) -> Result<F> {
    let slice = recon.reconstruct(stack, slice_index, center)?;
    Ok(entropy_cost(slice.view(), hist_min, hist_max, filter_sigma))
}

// =============================================================================
// Histogram range derivation
// =============================================================================

/// Widen the probe minimum outward: doubled when negative, halved toward
/// zero otherwise, so the true optimum can undershoot the probe.
fn widen_min<F: TomoFloat>(probe_min: F) -> F {
    if probe_min < F::zero() {
        F::from_f64_c(2.0) * probe_min
    } else {
        F::from_f64_c(0.5) * probe_min
    }
}

/// Widen the probe maximum outward: halved when negative, doubled
/// otherwise.
fn widen_max<F: TomoFloat>(probe_max: F) -> F {
    if probe_max < F::zero() {
        F::from_f64_c(0.5) * probe_max
    } else {
        F::from_f64_c(2.0) * probe_max
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

/// Find the rotation center that minimizes reconstruction entropy.
///
/// Performs one probe reconstruction at the initial center when histogram
/// bounds are not supplied, then drives Nelder-Mead over the entropy cost.
/// Budget exhaustion is reported as a warning and the best-found center is
/// returned; it is a quality signal, not an error.
///
/// # Errors
///
/// - `InvalidParameter` for an out-of-range slice index, a non-finite
///   initial center, or a bad configuration.
/// - `NumericDegenerate` when the histogram range (supplied or derived)
///   is empty.
/// - `Reconstruction` when the operator fails.
pub fn optimize_center<F, R>(
    stack: ArrayView3<F>,
    recon: &R,
    config: &CenterSearchConfig<F>,
) -> Result<F>
where
    F: TomoFloat,
    R: ReconstructionOperator<F>,
{
    config.validate()?;

    let (n_projections, n_slices, n_pixels) = stack.dim();
    if n_projections == 0 || n_slices == 0 || n_pixels == 0 {
        return Err(PreprocError::InvalidParameter(
            "projection stack has an empty axis".to_string(),
        ));
    }

    let slice_index = config.slice_index.unwrap_or(n_slices / 2);
    if slice_index >= n_slices {
        return Err(PreprocError::InvalidParameter(format!(
            "slice index {} exceeds the {} available slices",
            slice_index, n_slices
        )));
    }

    let initial_center = config
        .initial_center
        .unwrap_or_else(|| F::usize_as(n_pixels) / F::from_f64_c(2.0));
    if !initial_center.is_finite() {
        return Err(PreprocError::InvalidParameter(
            "initial center must be finite".to_string(),
        ));
    }

    // One probe reconstruction, only to derive missing histogram bounds.
    let (hist_min, hist_max) = match (config.hist_min, config.hist_max) {
        (Some(lo), Some(hi)) => (lo, hi),
        (lo, hi) => {
            let probe = recon.reconstruct(stack, slice_index, initial_center)?;
            let probe_min = probe
                .iter()
                .copied()
                .fold(F::infinity(), |a, b| if b < a { b } else { a });
            let probe_max = probe
                .iter()
                .copied()
                .fold(F::neg_infinity(), |a, b| if b > a { b } else { a });
            (
                lo.unwrap_or_else(|| widen_min(probe_min)),
                hi.unwrap_or_else(|| widen_max(probe_max)),
            )
        }
    };

    if !(hist_max > hist_min) {
        return Err(PreprocError::NumericDegenerate(format!(
            "histogram range [{:?}, {:?}] collapses all bins",
            hist_min, hist_max
        )));
    }

    info!(
        slice = slice_index,
        initial = ?initial_center,
        "optimizing rotation center"
    );

    let result = nelder_mead_1d(
        |center| {
            let cost = center_cost(
                recon,
                stack,
                slice_index,
                center,
                hist_min,
                hist_max,
                config.filter_sigma,
            )?;
            debug!(center = ?center, cost = ?cost, "center candidate evaluated");
            Ok(cost)
        },
        initial_center,
        config.tolerance,
        config.tolerance,
        MAX_ITERATIONS,
    )?;

    if !result.converged {
        warn!(
            iterations = result.iterations,
            evaluations = result.evaluations,
            "center search exhausted its budget; returning best-found center"
        );
    }
    info!(center = ?result.x, cost = ?result.fx, "rotation center estimated");

    Ok(result.x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

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

    // ==================== Entropy Cost Tests ====================

    #[test]
    fn test_cost_increases_with_histogram_uniformity() {
        // Constant image: one occupied bin, entropy ~ 0.
        let flat = Array2::from_elem((64, 64), 0.5f64);
        let cost_flat = entropy_cost(flat.view(), 0.0, 1.0, 0.0);

        // Two-valued image: entropy 1 bit.
        let two = Array2::from_shape_fn((64, 64), |(r, _)| if r < 32 { 0.2 } else { 0.8 });
        let cost_two = entropy_cost(two.view(), 0.0, 1.0, 0.0);

        // Every bin equally occupied: entropy log2(64) = 6 bits.
        let uniform = Array2::from_shape_fn((64, 64), |(_, c)| (c as f64 + 0.5) / 64.0);
        let cost_uniform = entropy_cost(uniform.view(), 0.0, 1.0, 0.0);

        assert!(cost_flat < cost_two && cost_two < cost_uniform);
        assert!(approx_eq(cost_flat, 0.0, 1e-6), "flat cost {}", cost_flat);
        assert!(approx_eq(cost_two, 1.0, 1e-6), "two-value cost {}", cost_two);
        assert!(
            approx_eq(cost_uniform, 6.0, 1e-6),
            "uniform cost {}",
            cost_uniform
        );
    }

    #[test]
    fn test_cost_finite_with_empty_bins() {
        let flat = Array2::from_elem((8, 8), 0.5f64);
        let cost = entropy_cost(flat.view(), 0.0, 1.0, 0.0);
        assert!(cost.is_finite());
        assert!(cost.abs() < 1e-6);
    }

    #[test]
    fn test_cost_clamps_outliers_into_edge_bins() {
        // Half far below the range, half far above: two occupied edge
        // bins, entropy 1 bit.
        let image = Array2::from_shape_fn((32, 32), |(r, _)| if r < 16 { -5.0 } else { 5.0 });
        let cost = entropy_cost(image.view(), 0.0, 1.0, 0.0);
        assert!(approx_eq(cost, 1.0, 1e-6), "cost {}", cost);
    }

    #[test]
    fn test_cost_smoothing_reduces_noise_entropy() {
        // Heavy smoothing pulls white noise toward its mean, occupying
        // fewer bins.
        let mut rng = SimpleLcg::new(17);
        let noise = Array2::from_shape_fn((64, 64), |_| rng.next_f64());
        let cost_raw = entropy_cost(noise.view(), 0.0, 1.0, 0.0);
        let cost_smooth = entropy_cost(noise.view(), 0.0, 1.0, 4.0);
        assert!(
            cost_smooth < cost_raw,
            "smoothing should reduce entropy: {} vs {}",
            cost_smooth,
            cost_raw
        );
    }

    // ==================== Histogram Range Tests ====================

    #[test]
    fn test_widen_min_rules() {
        assert_eq!(widen_min(-2.0f64), -4.0);
        assert_eq!(widen_min(2.0f64), 1.0);
        assert_eq!(widen_min(0.0f64), 0.0);
    }

    #[test]
    fn test_widen_max_rules() {
        assert_eq!(widen_max(-2.0f64), -1.0);
        assert_eq!(widen_max(3.0f64), 6.0);
        assert_eq!(widen_max(0.0f64), 0.0);
    }

    // ==================== Search Engine Tests ====================

    /// Synthetic operator whose reconstruction spreads its histogram in
    /// proportion to the centering error, so entropy is minimal at the
    /// true center.
    struct SyntheticScanner {
        true_center: f64,
    }

    impl ReconstructionOperator<f64> for SyntheticScanner {
        fn reconstruct(
            &self,
            _stack: ArrayView3<f64>,
            _slice_index: usize,
            center: f64,
        ) -> Result<Array2<f64>> {
            let err = center - self.true_center;
            let spread = 0.02 + 0.05 * err * err;
            let mut rng = SimpleLcg::new(4242);
            Ok(Array2::from_shape_fn((64, 64), |_| {
                0.5 + spread * (2.0 * rng.next_f64() - 1.0)
            }))
        }
    }

    /// Operator that always fails, for error propagation tests.
    struct BrokenScanner;

    impl ReconstructionOperator<f64> for BrokenScanner {
        fn reconstruct(
            &self,
            _stack: ArrayView3<f64>,
            _slice_index: usize,
            _center: f64,
        ) -> Result<Array2<f64>> {
            Err(PreprocError::Reconstruction("backend offline".to_string()))
        }
    }

    fn test_stack() -> Array3<f64> {
        Array3::from_elem((16, 8, 64), 1.0)
    }

    #[test]
    fn test_converges_to_known_center() {
        let stack = test_stack();
        let scanner = SyntheticScanner { true_center: 34.0 };
        let config = CenterSearchConfig {
            hist_min: Some(0.0),
            hist_max: Some(1.0),
            tolerance: 0.1,
            filter_sigma: 0.0,
            ..Default::default()
        };

        let center = optimize_center(stack.view(), &scanner, &config).unwrap();
        assert!(
            approx_eq(center, 34.0, 0.5),
            "converged to {} instead of 34.0",
            center
        );
    }

    #[test]
    fn test_converges_with_derived_histogram_range() {
        let stack = test_stack();
        let scanner = SyntheticScanner { true_center: 30.0 };
        let config = CenterSearchConfig {
            tolerance: 0.1,
            filter_sigma: 0.0,
            ..Default::default()
        };

        let center = optimize_center(stack.view(), &scanner, &config).unwrap();
        assert!(
            approx_eq(center, 30.0, 0.5),
            "converged to {} instead of 30.0",
            center
        );
    }

    #[test]
    fn test_deterministic_across_runs() {
        let stack = test_stack();
        let scanner = SyntheticScanner { true_center: 34.0 };
        let config = CenterSearchConfig {
            hist_min: Some(0.0),
            hist_max: Some(1.0),
            tolerance: 0.25,
            filter_sigma: 0.0,
            ..Default::default()
        };

        let a = optimize_center(stack.view(), &scanner, &config).unwrap();
        let b = optimize_center(stack.view(), &scanner, &config).unwrap();
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn test_slice_index_out_of_range_rejected() {
        let stack = test_stack();
        let scanner = SyntheticScanner { true_center: 32.0 };
        let config = CenterSearchConfig {
            slice_index: Some(8),
            ..Default::default()
        };

        assert!(matches!(
            optimize_center(stack.view(), &scanner, &config),
            Err(PreprocError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_non_finite_initial_center_rejected() {
        let stack = test_stack();
        let scanner = SyntheticScanner { true_center: 32.0 };
        let config = CenterSearchConfig {
            initial_center: Some(f64::NAN),
            ..Default::default()
        };

        assert!(matches!(
            optimize_center(stack.view(), &scanner, &config),
            Err(PreprocError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_degenerate_histogram_range_rejected() {
        let stack = test_stack();
        let scanner = SyntheticScanner { true_center: 32.0 };
        let config = CenterSearchConfig {
            hist_min: Some(1.0),
            hist_max: Some(1.0),
            ..Default::default()
        };

        assert!(matches!(
            optimize_center(stack.view(), &scanner, &config),
            Err(PreprocError::NumericDegenerate(_))
        ));
    }

    #[test]
    fn test_zero_tolerance_rejected() {
        let stack = test_stack();
        let scanner = SyntheticScanner { true_center: 32.0 };
        let config = CenterSearchConfig {
            tolerance: 0.0,
            ..Default::default()
        };

        assert!(optimize_center(stack.view(), &scanner, &config).is_err());
    }

    #[test]
    fn test_operator_failure_propagates() {
        let stack = test_stack();
        let config = CenterSearchConfig::default();

        assert!(matches!(
            optimize_center(stack.view(), &BrokenScanner, &config),
            Err(PreprocError::Reconstruction(_))
        ));
    }
}

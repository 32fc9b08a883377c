//! Stack-level preprocessing: flat-field normalization and median
//! filtering.
//!
//! Both stages mutate the `[projection, slice, pixel]` stack in place and
//! agree on the axis convention used by the center search and the ring
//! filter.

use ndarray::{Array2, Array3, ArrayView3, Axis};
use tracing::info;

use crate::error::{PreprocError, Result};
use crate::float_trait::TomoFloat;
use crate::smoothing::median_filter_2d;

// =============================================================================
// Axis policy
// =============================================================================

/// Plane orientation for the median filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterAxis {
    /// Filter each slices-pixels plane (iterate projections).
    SlicePixel,
    /// Filter each projections-pixels plane (iterate slices).
    ProjectionPixel,
    /// Filter each projections-slices plane (iterate pixels).
    ProjectionSlice,
}

/// Degenerate-dimension policy: a size-1 dimension forces the plane that
/// iterates over it, checked in projection, slice, pixel order. Otherwise
/// the requested axis stands.
pub fn resolve_degenerate_axis(
    shape: (usize, usize, usize),
    requested: FilterAxis,
) -> FilterAxis {
    if shape.0 == 1 {
        FilterAxis::SlicePixel
    } else if shape.1 == 1 {
        FilterAxis::ProjectionPixel
    } else if shape.2 == 1 {
        FilterAxis::ProjectionSlice
    } else {
        requested
    }
}

// =============================================================================
// Flat-field normalization
// =============================================================================

/// Normalize every projection against the average white-field frame,
/// in place.
///
/// `white` is a `[frame, slice, pixel]` stack of white-field shots; its
/// per-pixel mean over the frame axis is the reference. `cutoff`, when
/// given, clamps the normalized values from above.
///
/// # Errors
///
/// `InvalidParameter` when the white stack has no frames or its
/// slice/pixel extents disagree with the data stack.
pub fn normalize<F: TomoFloat>(
    stack: &mut Array3<F>,
    white: ArrayView3<F>,
    cutoff: Option<F>,
) -> Result<()> {
    let (n_projections, n_slices, n_pixels) = stack.dim();
    let (n_white, w_slices, w_pixels) = white.dim();

    if n_white == 0 {
        return Err(PreprocError::InvalidParameter(
            "white-field stack has no frames".to_string(),
        ));
    }
    if (w_slices, w_pixels) != (n_slices, n_pixels) {
        return Err(PreprocError::InvalidParameter(format!(
            "white-field extent ({}, {}) does not match data extent ({}, {})",
            w_slices, w_pixels, n_slices, n_pixels
        )));
    }

    info!(projections = n_projections, frames = n_white, "normalizing data");

    let frame_count = F::usize_as(n_white);
    let avg_white: Array2<F> = white.sum_axis(Axis(0)).mapv(|v| v / frame_count);

    for p in 0..n_projections {
        let mut plane = stack.index_axis_mut(Axis(0), p);
        plane.zip_mut_with(&avg_white, |v, &w| *v /= w);
    }

    if let Some(cutoff) = cutoff {
        stack.mapv_inplace(|v| if v > cutoff { cutoff } else { v });
    }

    Ok(())
}

// =============================================================================
// Median filter
// =============================================================================

/// Apply a 2D windowed median to every plane of the chosen axis, in place.
///
/// The effective axis goes through `resolve_degenerate_axis` first, so a
/// stack with a size-1 dimension is filtered in its only meaningful plane.
/// The default window used by callers is `(1, 3)`.
///
/// # Errors
///
/// `InvalidParameter` for a zero-sized window.
pub fn median_filter<F: TomoFloat>(
    stack: &mut Array3<F>,
    axis: FilterAxis,
    size: (usize, usize),
) -> Result<()> {
    if size.0 == 0 || size.1 == 0 {
        return Err(PreprocError::InvalidParameter(
            "median window must be non-empty on both axes".to_string(),
        ));
    }

    let shape = stack.dim();
    let axis = resolve_degenerate_axis(shape, axis);
    info!(?axis, window = ?size, "applying median filter");

    match axis {
        FilterAxis::SlicePixel => {
            for p in 0..shape.0 {
                let filtered = median_filter_2d(stack.index_axis(Axis(0), p), size);
                stack.index_axis_mut(Axis(0), p).assign(&filtered);
            }
        }
        FilterAxis::ProjectionPixel => {
            for s in 0..shape.1 {
                let filtered = median_filter_2d(stack.index_axis(Axis(1), s), size);
                stack.index_axis_mut(Axis(1), s).assign(&filtered);
            }
        }
        FilterAxis::ProjectionSlice => {
            for c in 0..shape.2 {
                let filtered = median_filter_2d(stack.index_axis(Axis(2), c), size);
                stack.index_axis_mut(Axis(2), c).assign(&filtered);
            }
        }
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

    // ==================== Axis Policy Tests ====================

    #[test]
    fn test_axis_policy_passthrough() {
        let shape = (8, 4, 16);
        assert_eq!(
            resolve_degenerate_axis(shape, FilterAxis::ProjectionPixel),
            FilterAxis::ProjectionPixel
        );
        assert_eq!(
            resolve_degenerate_axis(shape, FilterAxis::ProjectionSlice),
            FilterAxis::ProjectionSlice
        );
    }

    #[test]
    fn test_axis_policy_overrides_on_degenerate_dim() {
        assert_eq!(
            resolve_degenerate_axis((1, 4, 16), FilterAxis::ProjectionPixel),
            FilterAxis::SlicePixel
        );
        assert_eq!(
            resolve_degenerate_axis((8, 1, 16), FilterAxis::ProjectionSlice),
            FilterAxis::ProjectionPixel
        );
        assert_eq!(
            resolve_degenerate_axis((8, 4, 1), FilterAxis::SlicePixel),
            FilterAxis::ProjectionSlice
        );
    }

    #[test]
    fn test_axis_policy_priority_order() {
        // Projection axis wins when several dimensions are degenerate.
        assert_eq!(
            resolve_degenerate_axis((1, 1, 16), FilterAxis::ProjectionSlice),
            FilterAxis::SlicePixel
        );
    }

    // ==================== Normalize Tests ====================

    #[test]
    fn test_normalize_divides_by_average_white() {
        let mut stack = Array3::from_elem((4, 2, 3), 6.0f64);
        // Two white frames averaging to 2.0 per pixel.
        let mut white = Array3::from_elem((2, 2, 3), 1.0f64);
        white.index_axis_mut(Axis(0), 1).fill(3.0);

        normalize(&mut stack, white.view(), None).unwrap();
        for &v in stack.iter() {
            assert!(approx_eq(v, 3.0, 1e-12), "got {}", v);
        }
    }

    #[test]
    fn test_normalize_cutoff_clamps() {
        let mut stack = Array3::from_elem((2, 2, 2), 8.0f64);
        let white = Array3::from_elem((1, 2, 2), 2.0f64);

        normalize(&mut stack, white.view(), Some(1.5)).unwrap();
        for &v in stack.iter() {
            assert!(approx_eq(v, 1.5, 1e-12));
        }
    }

    #[test]
    fn test_normalize_rejects_mismatched_white() {
        let mut stack = Array3::from_elem((2, 4, 8), 1.0f64);
        let white = Array3::from_elem((1, 4, 6), 1.0f64);
        assert!(matches!(
            normalize(&mut stack, white.view(), None),
            Err(PreprocError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_normalize_rejects_empty_white() {
        let mut stack = Array3::from_elem((2, 4, 8), 1.0f64);
        let white = Array3::<f64>::zeros((0, 4, 8));
        assert!(normalize(&mut stack, white.view(), None).is_err());
    }

    // ==================== Median Filter Tests ====================

    #[test]
    fn test_median_filter_removes_outlier_in_projection_plane() {
        let mut stack = Array3::from_elem((8, 4, 8), 1.0f64);
        stack[[4, 2, 4]] = 50.0;

        median_filter(&mut stack, FilterAxis::ProjectionPixel, (3, 3)).unwrap();
        assert!(approx_eq(stack[[4, 2, 4]], 1.0, 1e-12));
    }

    #[test]
    fn test_median_filter_identity_window() {
        let mut stack = Array3::from_shape_fn((3, 4, 5), |(p, s, c)| (p * 20 + s * 5 + c) as f64);
        let original = stack.clone();

        median_filter(&mut stack, FilterAxis::SlicePixel, (1, 1)).unwrap();
        for (a, b) in original.iter().zip(stack.iter()) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_median_filter_pixel_axis_planes() {
        let mut stack = Array3::from_elem((6, 6, 3), 2.0f64);
        stack[[3, 3, 1]] = -40.0;

        median_filter(&mut stack, FilterAxis::ProjectionSlice, (3, 3)).unwrap();
        assert!(approx_eq(stack[[3, 3, 1]], 2.0, 1e-12));
    }

    #[test]
    fn test_median_filter_degenerate_stack_uses_policy() {
        // Single projection: the requested axis is overridden and the
        // filter runs in the slices-pixels plane.
        let mut stack = Array3::from_elem((1, 6, 6), 1.0f64);
        stack[[0, 3, 3]] = 9.0;

        median_filter(&mut stack, FilterAxis::ProjectionPixel, (3, 3)).unwrap();
        assert!(approx_eq(stack[[0, 3, 3]], 1.0, 1e-12));
    }

    #[test]
    fn test_median_filter_rejects_empty_window() {
        let mut stack = Array3::from_elem((2, 2, 2), 1.0f64);
        assert!(matches!(
            median_filter(&mut stack, FilterAxis::SlicePixel, (0, 3)),
            Err(PreprocError::InvalidParameter(_))
        ));
    }
}

//! Spatial-domain smoothing primitives.
//!
//! Gaussian low-pass filtering (used by the entropy cost function to keep
//! high-frequency reconstruction noise from biasing the histogram) and the
//! windowed median filter behind the stack-level `median_filter` stage.
//! Boundary handling is scipy-style reflect throughout.

use ndarray::{Array2, ArrayView2};

use crate::float_trait::TomoFloat;

/// Compute a normalized 1D Gaussian kernel with the given sigma.
/// Kernel radius is ceil(4 * sigma), matching scipy's default truncate=4.0.
fn gaussian_kernel_1d<F: TomoFloat>(sigma: F) -> Vec<F> {
    if sigma <= F::zero() {
        return vec![F::one()];
    }

    let radius = (F::GAUSSIAN_TRUNCATE * sigma)
        .ceil()
        .to_usize()
        .unwrap_or(0);
    let size = 2 * radius + 1;
    let mut kernel = vec![F::zero(); size];

    let sigma2 = sigma * sigma;
    let two = F::from_f64_c(2.0);
    let mut sum = F::zero();

    for (i, k) in kernel.iter_mut().enumerate() {
        let x = F::usize_as(i) - F::usize_as(radius);
        let val = (-(x * x) / (two * sigma2)).exp();
        *k = val;
        sum += val;
    }

    let inv_sum = F::one() / sum;
    for val in kernel.iter_mut() {
        *val *= inv_sum;
    }

    kernel
}

/// Reflect an index into [0, len) using scipy's 'reflect' boundary mode:
/// reflect(-1) = 0, reflect(-2) = 1, reflect(n) = n-1, reflect(n+1) = n-2.
/// Handles excursions of arbitrary depth (period 2*len).
#[inline]
pub(crate) fn reflect_index(idx: isize, len: usize) -> usize {
    debug_assert!(len > 0);
    let period = 2 * len as isize;
    let mut m = idx % period;
    if m < 0 {
        m += period;
    }
    if m < len as isize {
        m as usize
    } else {
        (period - 1 - m) as usize
    }
}

/// Convolve one line (row or column) against `kernel` with reflect
/// boundary, writing into `output`. `line` and `output` have equal length.
fn convolve_line_reflect<F: TomoFloat>(line: &[F], kernel: &[F], output: &mut [F]) {
    let n = line.len();
    let radius = kernel.len() / 2;

    for (i, out) in output.iter_mut().enumerate() {
        let mut sum = F::zero();
        for (k, &w) in kernel.iter().enumerate() {
            let src = i as isize + k as isize - radius as isize;
            sum += w * line[reflect_index(src, n)];
        }
        *out = sum;
    }
}

/// Apply a 1D Gaussian blur along rows (axis 1) of a 2D array.
fn blur_rows<F: TomoFloat>(input: ArrayView2<F>, sigma: F) -> Array2<F> {
    let (rows, cols) = input.dim();
    if rows == 0 || cols == 0 {
        return Array2::zeros((rows, cols));
    }

    let kernel = gaussian_kernel_1d(sigma);
    let mut output = Array2::zeros((rows, cols));
    let mut line = Vec::with_capacity(cols);

    for r in 0..rows {
        line.clear();
        line.extend(input.row(r).iter().copied());
        let out = output.row_mut(r).into_slice().expect("row is contiguous");
        convolve_line_reflect(&line, &kernel, out);
    }

    output
}

/// Apply a 1D Gaussian blur along columns (axis 0) of a 2D array.
fn blur_cols<F: TomoFloat>(input: ArrayView2<F>, sigma: F) -> Array2<F> {
    let (rows, cols) = input.dim();
    if rows == 0 || cols == 0 {
        return Array2::zeros((rows, cols));
    }

    let kernel = gaussian_kernel_1d(sigma);
    let mut output = Array2::zeros((rows, cols));
    let mut line = Vec::with_capacity(rows);
    let mut out_line = vec![F::zero(); rows];

    for c in 0..cols {
        line.clear();
        line.extend((0..rows).map(|r| input[[r, c]]));
        convolve_line_reflect(&line, &kernel, &mut out_line);
        for (r, &val) in out_line.iter().enumerate() {
            output[[r, c]] = val;
        }
    }

    output
}

/// Separable 2D Gaussian blur with one sigma per axis.
/// `sigma_y` smooths along axis 0 (rows of pixels in a column),
/// `sigma_x` along axis 1.
pub fn gaussian_blur_2d<F: TomoFloat>(input: ArrayView2<F>, sigma_y: F, sigma_x: F) -> Array2<F> {
    let blurred_x = blur_rows(input, sigma_x);
    blur_cols(blurred_x.view(), sigma_y)
}

/// Isotropic 2D Gaussian blur.
pub fn gaussian_blur_isotropic<F: TomoFloat>(input: ArrayView2<F>, sigma: F) -> Array2<F> {
    gaussian_blur_2d(input, sigma, sigma)
}

/// Median of a scratch slice via partial sorting: the `n / 2`-th order
/// statistic, so even lengths return the upper of the two middle elements
/// (rank-filter semantics).
fn median_slice<F: TomoFloat>(data: &mut [F]) -> F {
    let n = data.len();
    if n == 0 {
        return F::zero();
    }
    if n == 1 {
        return data[0];
    }

    let (_, median, _) = data.select_nth_unstable_by(n / 2, |a, b| {
        a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal)
    });
    *median
}

/// 2D windowed median filter with reflect boundary.
///
/// `size` is the (rows, cols) extent of the window; the window is centered
/// with the scipy origin convention (offsets -(w/2) .. w - w/2 - 1).
pub fn median_filter_2d<F: TomoFloat>(input: ArrayView2<F>, size: (usize, usize)) -> Array2<F> {
    let (rows, cols) = input.dim();
    let (wy, wx) = size;
    debug_assert!(wy > 0 && wx > 0);

    if rows == 0 || cols == 0 {
        return Array2::zeros((rows, cols));
    }

    let mut output = Array2::zeros((rows, cols));
    let mut window = Vec::with_capacity(wy * wx);

    for r in 0..rows {
        for c in 0..cols {
            window.clear();
            for dy in 0..wy {
                let src_r = reflect_index(r as isize + dy as isize - (wy / 2) as isize, rows);
                for dx in 0..wx {
                    let src_c = reflect_index(c as isize + dx as isize - (wx / 2) as isize, cols);
                    window.push(input[[src_r, src_c]]);
                }
            }
            output[[r, c]] = median_slice(&mut window);
        }
    }

    output
}

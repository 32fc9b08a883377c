//! Frequency-domain transform helpers.
//!
//! Thin wrappers over rustfft plans: separable 2D FFT/IFFT for the phase
//! retrieval filter, and numpy-convention fftshift/ifftshift for 2D
//! spectra and the ring engine's per-column buffers.

use ndarray::{Array2, ArrayView2};
use rustfft::{num_complex::Complex, Fft};
use std::sync::Arc;

use crate::float_trait::TomoFloat;

/// Compute the 2D FFT of a real image using pre-computed plans.
/// Returns the unnormalized spectrum.
pub fn fft2d<F: TomoFloat>(
    input: ArrayView2<F>,
    fft_row_plan: &Arc<dyn Fft<F>>,
    fft_col_plan: &Arc<dyn Fft<F>>,
) -> Array2<Complex<F>> {
    let (rows, cols) = input.dim();

    // 1. Transform rows
    let mut intermediate = Array2::<Complex<F>>::zeros((rows, cols));
    let mut row_vec = vec![Complex::new(F::zero(), F::zero()); cols];

    for r in 0..rows {
        for (c, &v) in input.row(r).iter().enumerate() {
            row_vec[c] = Complex::new(v, F::zero());
        }
        fft_row_plan.process(&mut row_vec);
        for c in 0..cols {
            intermediate[[r, c]] = row_vec[c];
        }
    }

    // 2. Transform columns
    let mut output = Array2::<Complex<F>>::zeros((rows, cols));
    let mut col_vec = vec![Complex::new(F::zero(), F::zero()); rows];

    for c in 0..cols {
        for r in 0..rows {
            col_vec[r] = intermediate[[r, c]];
        }
        fft_col_plan.process(&mut col_vec);
        for r in 0..rows {
            output[[r, c]] = col_vec[r];
        }
    }

    output
}

/// Compute the 2D inverse FFT, normalized by 1/(rows*cols).
/// Returns the real part.
pub fn ifft2d<F: TomoFloat>(
    input: &Array2<Complex<F>>,
    ifft_row_plan: &Arc<dyn Fft<F>>,
    ifft_col_plan: &Arc<dyn Fft<F>>,
) -> Array2<F> {
    let (rows, cols) = input.dim();

    // 1. Transform columns
    let mut intermediate = input.clone();
    let mut col_vec = vec![Complex::new(F::zero(), F::zero()); rows];

    for c in 0..cols {
        for r in 0..rows {
            col_vec[r] = intermediate[[r, c]];
        }
        ifft_col_plan.process(&mut col_vec);
        for r in 0..rows {
            intermediate[[r, c]] = col_vec[r];
        }
    }

    // 2. Transform rows
    let mut output = Array2::<F>::zeros((rows, cols));
    let norm_factor = F::one() / F::usize_as(rows * cols);
    let mut row_vec = vec![Complex::new(F::zero(), F::zero()); cols];

    for r in 0..rows {
        for c in 0..cols {
            row_vec[c] = intermediate[[r, c]];
        }
        ifft_row_plan.process(&mut row_vec);
        for c in 0..cols {
            output[[r, c]] = row_vec[c].re * norm_factor;
        }
    }

    output
}

/// Shift the zero-frequency component to the center of the spectrum
/// along both axes (numpy fftshift convention).
pub fn fftshift2<F: TomoFloat>(input: &Array2<Complex<F>>) -> Array2<Complex<F>> {
    let (rows, cols) = input.dim();
    let sr = rows - rows / 2;
    let sc = cols - cols / 2;
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        input[[(r + sr) % rows, (c + sc) % cols]]
    })
}

/// Undo `fftshift2`.
pub fn ifftshift2<F: TomoFloat>(input: &Array2<Complex<F>>) -> Array2<Complex<F>> {
    let (rows, cols) = input.dim();
    let sr = rows / 2;
    let sc = cols / 2;
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        input[[(r + sr) % rows, (c + sc) % cols]]
    })
}

/// In-place 1D fftshift of a complex buffer.
pub fn fftshift_inplace<F: TomoFloat>(buf: &mut [Complex<F>]) {
    let n = buf.len();
    buf.rotate_left(n - n / 2);
}

/// In-place 1D ifftshift, the inverse of `fftshift_inplace`.
pub fn ifftshift_inplace<F: TomoFloat>(buf: &mut [Complex<F>]) {
    let n = buf.len();
    buf.rotate_left(n / 2);
}

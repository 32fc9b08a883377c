//! Derivative-free 1D scalar minimization.
//!
//! Nelder-Mead with the conventional coefficients (reflection 1.0,
//! expansion 2.0, contraction 0.5, shrink 0.5) specialized to one
//! dimension, where the simplex is a point pair. Fully deterministic for a
//! fixed start.

use crate::error::Result;
use crate::float_trait::TomoFloat;

/// Relative perturbation used to seed the second simplex vertex.
const NONZERO_DELTA: f64 = 0.05;

/// Absolute perturbation used when the initial guess is exactly zero.
const ZERO_DELTA: f64 = 0.00025;

/// Outcome of a Nelder-Mead run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NelderMeadResult<F: TomoFloat> {
    /// Best argument found.
    pub x: F,
    /// Cost at `x`.
    pub fx: F,
    /// Iterations performed.
    pub iterations: usize,
    /// Cost-function evaluations performed.
    pub evaluations: usize,
    /// Whether both the simplex spread and the cost spread fell below
    /// their tolerances before the iteration budget ran out.
    pub converged: bool,
}

/// Minimize `f` starting from `x0`.
///
/// Terminates when the simplex spread is within `xatol` and the cost
/// spread within `fatol`, or after `max_iter` iterations. Running out of
/// budget is not an error; the caller decides whether the `converged`
/// flag matters.
///
/// Cost-function failures propagate immediately.
pub fn nelder_mead_1d<F, C>(
    mut f: C,
    x0: F,
    xatol: F,
    fatol: F,
    max_iter: usize,
) -> Result<NelderMeadResult<F>>
where
    F: TomoFloat,
    C: FnMut(F) -> Result<F>,
{
    let rho = F::from_f64_c(1.0);
    let chi = F::from_f64_c(2.0);
    let psi = F::from_f64_c(0.5);
    let shrink = F::from_f64_c(0.5);

    // Two-vertex simplex: best and worst.
    let x1 = if x0 == F::zero() {
        F::from_f64_c(ZERO_DELTA)
    } else {
        x0 * F::from_f64_c(1.0 + NONZERO_DELTA)
    };

    let mut evaluations = 0usize;
    let mut eval = |f: &mut C, x: F, n: &mut usize| -> Result<F> {
        *n += 1;
        f(x)
    };

    let mut best = (x0, eval(&mut f, x0, &mut evaluations)?);
    let mut worst = (x1, eval(&mut f, x1, &mut evaluations)?);
    if worst.1 < best.1 {
        std::mem::swap(&mut best, &mut worst);
    }

    let mut iterations = 0usize;
    let mut converged = false;

    loop {
        if (best.0 - worst.0).abs() <= xatol && (best.1 - worst.1).abs() <= fatol {
            converged = true;
            break;
        }
        if iterations >= max_iter {
            break;
        }
        iterations += 1;

        // Centroid of all vertices but the worst is the best vertex.
        let xbar = best.0;
        let xr = xbar + rho * (xbar - worst.0);
        let fr = eval(&mut f, xr, &mut evaluations)?;

        if fr < best.1 {
            // Try expanding past the reflection point.
            let xe = xbar + rho * chi * (xbar - worst.0);
            let fe = eval(&mut f, xe, &mut evaluations)?;
            if fe < fr {
                worst = (xe, fe);
            } else {
                worst = (xr, fr);
            }
        } else if fr < worst.1 {
            // Outside contraction.
            let xc = xbar + psi * rho * (xbar - worst.0);
            let fc = eval(&mut f, xc, &mut evaluations)?;
            if fc <= fr {
                worst = (xc, fc);
            } else {
                worst.0 = best.0 + shrink * (worst.0 - best.0);
                worst.1 = eval(&mut f, worst.0, &mut evaluations)?;
            }
        } else {
            // Inside contraction.
            let xcc = xbar - psi * (xbar - worst.0);
            let fcc = eval(&mut f, xcc, &mut evaluations)?;
            if fcc < worst.1 {
                worst = (xcc, fcc);
            } else {
                worst.0 = best.0 + shrink * (worst.0 - best.0);
                worst.1 = eval(&mut f, worst.0, &mut evaluations)?;
            }
        }

        if worst.1 < best.1 {
            std::mem::swap(&mut best, &mut worst);
        }
    }

    Ok(NelderMeadResult {
        x: best.0,
        fx: best.1,
        iterations,
        evaluations,
        converged,
    })
}

//! PyO3 Python bindings for tomographic preprocessing.
//!
//! This crate provides thin Python bindings for the tomoprep_core library.
//! All algorithm logic is in tomoprep_core; this crate only handles
//! Python/NumPy type conversions. The center search is not exposed here
//! because it needs a reconstruction backend on the Rust side.

use numpy::{PyArray3, PyReadonlyArray3, ToPyArray};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use tomoprep_core::{
    median_filter, normalize, remove_rings, retrieve_phase, FilterAxis, PreprocError,
    RingFilterConfig,
};

fn to_py_err(e: PreprocError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

/// Remove ring artifacts from a [projection, slice, pixel] stack.
#[pyfunction]
pub fn remove_rings_rust<'py>(
    py: Python<'py>,
    data: PyReadonlyArray3<f32>,
    level: usize,
    wname: &str,
    sigma: f32,
) -> PyResult<&'py PyArray3<f32>> {
    let mut stack = data.as_array().to_owned();
    let config = RingFilterConfig {
        levels: level,
        wavelet: wname.to_string(),
        sigma,
    };
    remove_rings(&mut stack, &config).map_err(to_py_err)?;
    Ok(stack.to_pyarray(py))
}

/// Normalize projections against the average white-field frame.
#[pyfunction]
pub fn normalize_rust<'py>(
    py: Python<'py>,
    data: PyReadonlyArray3<f32>,
    white: PyReadonlyArray3<f32>,
    cutoff: Option<f32>,
) -> PyResult<&'py PyArray3<f32>> {
    let mut stack = data.as_array().to_owned();
    normalize(&mut stack, white.as_array(), cutoff).map_err(to_py_err)?;
    Ok(stack.to_pyarray(py))
}

/// Median filter the stack in the plane selected by `axis`:
/// 0 = slice-pixel, 1 = projection-pixel, 2 = projection-slice.
#[pyfunction]
pub fn median_filter_rust<'py>(
    py: Python<'py>,
    data: PyReadonlyArray3<f32>,
    axis: usize,
    size: (usize, usize),
) -> PyResult<&'py PyArray3<f32>> {
    let axis = match axis {
        0 => FilterAxis::SlicePixel,
        1 => FilterAxis::ProjectionPixel,
        2 => FilterAxis::ProjectionSlice,
        other => {
            return Err(PyValueError::new_err(format!(
                "axis must be 0, 1, or 2, got {}",
                other
            )))
        }
    };
    let mut stack = data.as_array().to_owned();
    median_filter(&mut stack, axis, size).map_err(to_py_err)?;
    Ok(stack.to_pyarray(py))
}

/// Fresnel phase retrieval on flat-field corrected projections.
/// `pixel_size` and `dist` are in cm, `energy` in keV.
#[pyfunction]
pub fn retrieve_phase_rust<'py>(
    py: Python<'py>,
    data: PyReadonlyArray3<f32>,
    pixel_size: f32,
    dist: f32,
    energy: f32,
    alpha: f32,
) -> PyResult<&'py PyArray3<f32>> {
    let mut stack = data.as_array().to_owned();
    retrieve_phase(&mut stack, pixel_size, dist, energy, alpha).map_err(to_py_err)?;
    Ok(stack.to_pyarray(py))
}

/// Tomographic preprocessing Rust accelerator module
#[pymodule]
fn tomoprep_rust(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(remove_rings_rust, m)?)?;
    m.add_function(wrap_pyfunction!(normalize_rust, m)?)?;
    m.add_function(wrap_pyfunction!(median_filter_rust, m)?)?;
    m.add_function(wrap_pyfunction!(retrieve_phase_rust, m)?)?;
    Ok(())
}

//! Tomographic Preprocessing Core Library
//!
//! Pure Rust implementation of the preprocessing stages applied to
//! tomographic projection stacks ahead of reconstruction: flat-field
//! normalization, median filtering, Fresnel phase retrieval, entropy-based
//! rotation-center search, and wavelet/Fourier ring artifact suppression.
//! This crate contains all algorithm logic without Python bindings.
//!
//! The reconstruction engine itself is an external collaborator behind the
//! [`ReconstructionOperator`] trait; everything else operates directly on
//! `[projection, slice, pixel]` stacks.

pub mod center;
pub mod error;
pub mod float_trait;
pub mod optimize;
pub mod phase;
pub mod preprocess;
pub mod recon;
pub mod ring;
pub mod smoothing;
pub mod transforms;
pub mod wavelet;

// Re-export commonly used types at the crate root
pub use center::{center_cost, entropy_cost, optimize_center, CenterSearchConfig};
pub use error::{PreprocError, Result};
pub use float_trait::TomoFloat;
pub use optimize::{nelder_mead_1d, NelderMeadResult};
pub use phase::retrieve_phase;
pub use preprocess::{median_filter, normalize, resolve_degenerate_axis, FilterAxis};
pub use recon::ReconstructionOperator;
pub use ring::{remove_rings, RingFilterConfig};
pub use smoothing::{gaussian_blur_2d, gaussian_blur_isotropic, median_filter_2d};
pub use transforms::{fft2d, ifft2d};
pub use wavelet::{dwt2, idwt2, max_decomposition_level, DetailBands, Wavelet};

//! Boundary to the external reconstruction engine.

use ndarray::{Array2, ArrayView3};

use crate::error::Result;
use crate::float_trait::TomoFloat;

/// A tomographic reconstruction backend.
///
/// The center search drives this operator many times with different
/// candidate centers, so implementations should reconstruct only the
/// requested slice, not the full volume. The operator must be
/// deterministic and pure in its arguments: the rotation center arrives
/// as an explicit parameter, never through shared mutable state.
pub trait ReconstructionOperator<F: TomoFloat> {
    /// Reconstruct one slice of the projection stack
    /// (`[projection, slice, pixel]`) at the given rotation center.
    fn reconstruct(
        &self,
        stack: ArrayView3<F>,
        slice_index: usize,
        center: F,
    ) -> Result<Array2<F>>;
}

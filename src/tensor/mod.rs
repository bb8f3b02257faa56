//! Dense tensor primitives: owning matrices and vectors plus non-owning
//! views with explicit strides, shaped for the column-major BLAS ABI.

mod matrix;
mod vector;
mod view;

pub use matrix::Matrix;
pub use vector::Vector;
pub use view::{MatrixView, VectorView};

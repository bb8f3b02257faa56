//! # sparse-dg
//!
//! A sparse-grid discontinuous Galerkin engine for linear PDEs whose spatial
//! operator is a sum of separable tensor-product terms.
//!
//! The crate provides the building blocks of the discretization and its
//! time advance:
//! - Dense tensor primitives (column-major matrices/vectors and views)
//! - Legendre quadrature and the orthonormal multiwavelet transform
//! - Sparse-grid element table (multi-index enumeration and hashing)
//! - PDE descriptors with pre-assembled 1D coefficient matrices
//! - The Kronecker-product apply: memory-budgeted coupling chunks lowered
//!   to batched small-gemm schedules with shared workspaces
//! - Explicit time integration (forward Euler and SSP-RK3)

pub mod batch;
pub mod chunk;
pub mod coefficients;
pub mod element_table;
pub mod io;
pub mod lib_dispatch;
pub mod pde;
pub mod quadrature;
pub mod tensor;
pub mod time_advance;
pub mod transform;
pub mod workspace;

// Re-export the main types for convenience.
pub use batch::{
    allocate_batches, batched_gemm, batched_gemv, build_batches, kronmult_to_batch_sets, Batch,
    BatchOperandSet,
};
pub use chunk::{
    assign_elements, max_connected_in_chunk, num_chunks, num_couplings_in_chunk, ElementChunk,
    Limits,
};
pub use element_table::{idx1d, ElementTable, Grid};
pub use lib_dispatch::Scalar;
pub use pde::{
    make_pde, BoundaryCondition, CoefficientKind, ConfigError, Dimension, ExactSolution, FluxType,
    PartialTerm, Pde, Source, Term,
};
pub use tensor::{Matrix, MatrixView, Vector, VectorView};
pub use time_advance::{
    apply_operator, compute_dt, explicit_time_advance, relative_l2_error, SourceVectors,
    StepMethod,
};
pub use transform::{combine_dimensions, multiwavelet_transform, project_function};
pub use workspace::{HostWorkspace, RankWorkspace};

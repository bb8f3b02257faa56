//! Preallocated workspaces.
//!
//! `RankWorkspace` holds the scratch the batched apply runs in; it is sized
//! once from the worst chunk and reused every step. `HostWorkspace` holds
//! the solution-sized vectors of the time loop.

use crate::chunk::{max_connected_in_chunk, num_couplings_in_chunk, ElementChunk};
use crate::element_table::ElementTable;
use crate::lib_dispatch::Scalar;
use crate::pde::Pde;
use crate::tensor::Vector;

/// Scratch buffers for the chunked Kronecker apply.
#[derive(Debug)]
pub struct RankWorkspace<P> {
    /// Staged copies of the solution elements a chunk reads.
    pub batch_input: Vector<P>,
    /// Per-(coupling, term) partial outputs awaiting reduction.
    pub reduction_space: Vector<P>,
    /// Alternating intermediate buffers of the gemm chain.
    pub batch_intermediate: Vector<P>,
    /// All-ones vector the reduction gemv contracts against, sliced per
    /// row. Kept at ones; never written after construction.
    pub unit_vector: Vector<P>,
}

impl<P: Scalar> RankWorkspace<P> {
    pub fn new(pde: &Pde<P>, table: &ElementTable, chunks: &[ElementChunk]) -> Self {
        let elem_size = pde.elem_size();
        let num_workspaces = (pde.num_dims() - 1).min(2);

        let max_couplings = chunks
            .iter()
            .map(num_couplings_in_chunk)
            .max()
            .unwrap_or(0);
        let max_distinct_x = max_couplings.min(table.size());
        let max_connected = chunks
            .iter()
            .map(max_connected_in_chunk)
            .max()
            .unwrap_or(0);

        let reduction_len = elem_size * pde.num_terms() * max_couplings;
        let mut unit_vector = Vector::zeros(pde.num_terms() * max_connected);
        unit_vector.fill(P::one());

        Self {
            batch_input: Vector::zeros(elem_size * max_distinct_x),
            reduction_space: Vector::zeros(reduction_len),
            batch_intermediate: Vector::zeros(reduction_len * num_workspaces),
            unit_vector,
        }
    }
}

/// Solution-sized vectors owned by the time-advance loop.
#[derive(Debug)]
pub struct HostWorkspace<P> {
    /// Current solution.
    pub x: Vector<P>,
    /// Next solution, produced by a step.
    pub fx: Vector<P>,
    /// Runge-Kutta stage buffers.
    pub stage_1: Vector<P>,
    pub stage_2: Vector<P>,
    /// Operator and source accumulation target.
    pub apply_out: Vector<P>,
}

impl<P: Scalar> HostWorkspace<P> {
    pub fn new(pde: &Pde<P>, table: &ElementTable) -> Self {
        let len = pde.elem_size() * table.size();
        Self {
            x: Vector::zeros(len),
            fx: Vector::zeros(len),
            stage_1: Vector::zeros(len),
            stage_2: Vector::zeros(len),
            apply_out: Vector::zeros(len),
        }
    }
}

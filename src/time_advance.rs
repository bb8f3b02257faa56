//! Explicit time advance.
//!
//! One step composes the chunked Kronecker apply, the per-row reduction and
//! the scaled sources into the right-hand side, then combines stages:
//! forward Euler as the base scheme and SSP-RK3 (Shu-Osher form) on top of
//! the same right-hand side with stage times t, t + dt, t + dt/2.

use crate::batch::{batched_gemm, build_batches};
use crate::chunk::{num_couplings_in_chunk, ElementChunk};
use crate::element_table::ElementTable;
use crate::lib_dispatch::{real, Scalar};
use crate::pde::Pde;
use crate::tensor::Vector;
use crate::transform::{combine_dimensions, project_function};
use crate::workspace::{HostWorkspace, RankWorkspace};

/// Explicit stepping scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMethod {
    ForwardEuler,
    SspRk3,
}

/// Sources with the time-separable spatial parts projected once.
pub struct SourceVectors<P> {
    spatial: Vec<Vector<P>>,
    time_fns: Vec<fn(P) -> P>,
}

impl<P: Scalar> SourceVectors<P> {
    pub fn new(pde: &Pde<P>, table: &ElementTable) -> Self {
        let mut spatial = Vec::with_capacity(pde.num_sources());
        let mut time_fns = Vec::with_capacity(pde.num_sources());
        for source in pde.sources() {
            spatial.push(separable_vector(pde, table, &source.spatial, P::one()));
            time_fns.push(source.time);
        }
        Self { spatial, time_fns }
    }

    /// `out += Σ_s time_s(t) · spatial_s`.
    pub fn accumulate(&self, t: P, out: &mut Vector<P>) {
        for (sv, tf) in self.spatial.iter().zip(self.time_fns.iter()) {
            out.axpy(tf(t), sv);
        }
    }
}

/// Project per-dimension profiles and combine them over the element table.
fn separable_vector<P: Scalar>(
    pde: &Pde<P>,
    table: &ElementTable,
    profiles: &[fn(P) -> P],
    scale: P,
) -> Vector<P> {
    let per_dim: Vec<Vector<P>> = pde
        .dimensions()
        .iter()
        .zip(profiles.iter())
        .enumerate()
        .map(|(d, (dim, &f))| {
            project_function(
                f,
                dim.domain_min,
                dim.domain_max,
                dim.level,
                dim.degree,
                pde.transform_matrix(d),
            )
        })
        .collect();
    combine_dimensions(pde.degree(), table, &per_dim, scale)
}

/// Initial condition in the multiwavelet basis.
pub fn initial_condition_vector<P: Scalar>(pde: &Pde<P>, table: &ElementTable) -> Vector<P> {
    let profiles: Vec<fn(P) -> P> = pde
        .dimensions()
        .iter()
        .map(|d| d.initial_condition)
        .collect();
    separable_vector(pde, table, &profiles, P::one())
}

/// Analytic solution at time `t` in the multiwavelet basis, when the PDE
/// carries one.
pub fn exact_solution_vector<P: Scalar>(
    pde: &Pde<P>,
    table: &ElementTable,
    t: P,
) -> Option<Vector<P>> {
    pde.exact_solution()
        .map(|exact| separable_vector(pde, table, &exact.spatial, (exact.time)(t)))
}

/// Stage the solution elements a chunk's columns read into `batch_input`.
///
/// Slot s holds column `(first_column + s) mod table_size`; with the
/// row-major coupling order this is exactly where `build_batches` points
/// its x views.
fn copy_chunk_inputs<P: Scalar>(
    workspace: &mut RankWorkspace<P>,
    table_size: usize,
    elem_size: usize,
    x: &Vector<P>,
    chunk: &ElementChunk,
) {
    let couplings = num_couplings_in_chunk(chunk);
    let slots = couplings.min(table_size);
    let first_col = chunk
        .values()
        .next()
        .map(|lim| lim.start)
        .unwrap_or(0);
    for s in 0..slots {
        let col = (first_col + s) % table_size;
        let src = &x.as_slice()[col * elem_size..(col + 1) * elem_size];
        workspace.batch_input.as_mut_slice()[s * elem_size..(s + 1) * elem_size]
            .copy_from_slice(src);
    }
}

/// Contract each row's partial outputs against the unit vector,
/// accumulating into the row's slice of `fx`.
fn reduce_chunk<P: Scalar>(
    elem_size: usize,
    num_terms: usize,
    workspace: &RankWorkspace<P>,
    fx: &mut Vector<P>,
    chunk: &ElementChunk,
) {
    let mut prev_couplings = 0usize;
    for (&row, limits) in chunk.iter() {
        let connected = limits.count();
        let cols = num_terms * connected;
        assert!(workspace.unit_vector.len() >= cols);
        unsafe {
            P::gemv(
                false,
                elem_size,
                cols,
                P::one(),
                workspace
                    .reduction_space
                    .as_ptr()
                    .add(elem_size * num_terms * prev_couplings),
                elem_size,
                workspace.unit_vector.as_ptr(),
                1,
                P::one(),
                fx.as_mut_ptr().add(row * elem_size),
                1,
            );
        }
        prev_couplings += connected;
    }
}

/// `fx := A x`, chunk by chunk.
///
/// Per chunk: stage inputs, build the batch sets, fire the `num_dims`
/// dimension waves in order (each wave's outputs feed the next through the
/// work buffers), then reduce into the per-row updates. Chunks write
/// disjoint coupling contributions, accumulated per row.
pub fn apply_operator<P: Scalar>(
    pde: &Pde<P>,
    table: &ElementTable,
    chunks: &[ElementChunk],
    workspace: &mut RankWorkspace<P>,
    x: &Vector<P>,
    fx: &mut Vector<P>,
) {
    let elem_size = pde.elem_size();
    assert_eq!(x.len(), table.size() * elem_size);
    assert_eq!(fx.len(), x.len());

    fx.fill(P::zero());
    for chunk in chunks {
        copy_chunk_inputs(workspace, table.size(), elem_size, x, chunk);
        let batches = build_batches(pde, table, workspace, chunk);
        for set in &batches {
            batched_gemm(&set.a, &set.b, &set.c, P::one(), P::zero());
        }
        reduce_chunk(elem_size, pde.num_terms(), workspace, fx, chunk);
    }
}

/// `out := A x + Σ_s time_s(t) · spatial_s`.
fn right_hand_side<P: Scalar>(
    pde: &Pde<P>,
    table: &ElementTable,
    chunks: &[ElementChunk],
    workspace: &mut RankWorkspace<P>,
    sources: &SourceVectors<P>,
    x: &Vector<P>,
    t: P,
    out: &mut Vector<P>,
) {
    apply_operator(pde, table, chunks, workspace, x, out);
    sources.accumulate(t, out);
}

/// CFL-scaled default time step.
pub fn compute_dt<P: Scalar>(pde: &Pde<P>, cfl: P) -> P {
    assert!(cfl > P::zero());
    pde.get_dt() * cfl
}

/// Advance `host.x` at `time` by one step of `dt` into `host.fx`.
///
/// A non-finite result is fatal; the step is pure numerics and there is no
/// retry.
pub fn explicit_time_advance<P: Scalar>(
    pde: &Pde<P>,
    table: &ElementTable,
    sources: &SourceVectors<P>,
    host: &mut HostWorkspace<P>,
    rank: &mut RankWorkspace<P>,
    chunks: &[ElementChunk],
    time: P,
    dt: P,
    method: StepMethod,
) {
    assert!(dt > P::zero());
    match method {
        StepMethod::ForwardEuler => {
            // fx = x + dt * (A x + s(t))
            right_hand_side(
                pde,
                table,
                chunks,
                rank,
                sources,
                &host.x,
                time,
                &mut host.apply_out,
            );
            host.fx.copy_from(&host.x);
            host.fx.axpy(dt, &host.apply_out);
        }
        StepMethod::SspRk3 => {
            let third = P::one() / real::<P>(3.0);
            let quarter = real::<P>(0.25);

            // u1 = u + dt L(u, t)
            right_hand_side(
                pde,
                table,
                chunks,
                rank,
                sources,
                &host.x,
                time,
                &mut host.apply_out,
            );
            host.stage_1.copy_from(&host.x);
            host.stage_1.axpy(dt, &host.apply_out);

            // u2 = 3/4 u + 1/4 u1 + 1/4 dt L(u1, t + dt)
            right_hand_side(
                pde,
                table,
                chunks,
                rank,
                sources,
                &host.stage_1,
                time + dt,
                &mut host.apply_out,
            );
            host.stage_2.copy_from(&host.x);
            host.stage_2.scale(real::<P>(0.75));
            host.stage_2.axpy(quarter, &host.stage_1);
            host.stage_2.axpy(quarter * dt, &host.apply_out);

            // u_new = 1/3 u + 2/3 u2 + 2/3 dt L(u2, t + dt/2)
            right_hand_side(
                pde,
                table,
                chunks,
                rank,
                sources,
                &host.stage_2,
                time + dt * real::<P>(0.5),
                &mut host.apply_out,
            );
            host.fx.copy_from(&host.x);
            host.fx.scale(third);
            host.fx.axpy(real::<P>(2.0) * third, &host.stage_2);
            host.fx.axpy(real::<P>(2.0) * third * dt, &host.apply_out);
        }
    }
    assert!(host.fx.all_finite(), "non-finite solution after time step");
}

/// Relative L2 distance, falling back to the absolute norm against a zero
/// reference.
pub fn relative_l2_error<P: Scalar>(approx: &Vector<P>, exact: &Vector<P>) -> P {
    let diff = approx - exact;
    let denom = exact.norm();
    if denom == P::zero() {
        diff.norm()
    } else {
        diff.norm() / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{assign_elements, Limits};
    use crate::element_table::Grid;
    use crate::pde::make_pde;

    #[test]
    fn reduction_of_all_ones_counts_terms_times_connected() {
        // T = 2, connected = 3, elem_size = 4: each reduced entry is 6
        let elem_size = 4;
        let num_terms = 2;
        let connected = 3;

        let mut reduction = Vector::zeros(elem_size * num_terms * connected);
        reduction.fill(1.0_f64);
        let mut unit = Vector::zeros(num_terms * connected);
        unit.fill(1.0);
        let ws = RankWorkspace {
            batch_input: Vector::zeros(elem_size * connected),
            batch_intermediate: Vector::zeros(0),
            reduction_space: reduction,
            unit_vector: unit,
        };

        let mut chunk = ElementChunk::new();
        chunk.insert(
            0,
            Limits {
                start: 0,
                stop: connected - 1,
            },
        );
        let mut fx = Vector::zeros(elem_size);
        reduce_chunk(elem_size, num_terms, &ws, &mut fx, &chunk);
        for &v in fx.iter() {
            assert!((v - 6.0).abs() < 1e-14);
        }
    }

    #[test]
    fn apply_is_independent_of_chunking() {
        let pde = make_pde::<f64>("continuity_2", Some(2), Some(2)).unwrap();
        let table = ElementTable::new(2, 2, Grid::Sparse);
        let n = table.size() * pde.elem_size();

        let mut x = Vector::zeros(n);
        for i in 0..n {
            x[i] = (i as f64 * 0.37).sin();
        }

        let whole = assign_elements(&table, 1);
        let mut ws = RankWorkspace::new(&pde, &table, &whole);
        let mut fx_whole = Vector::zeros(n);
        apply_operator(&pde, &table, &whole, &mut ws, &x, &mut fx_whole);

        for num in [2, 3, 5] {
            let chunks = assign_elements(&table, num);
            let mut ws = RankWorkspace::new(&pde, &table, &chunks);
            let mut fx = Vector::zeros(n);
            apply_operator(&pde, &table, &chunks, &mut ws, &x, &mut fx);
            let err = relative_l2_error(&fx, &fx_whole);
            assert!(err < 1e-12, "chunking {num}: {err}");
        }
    }

    #[test]
    fn euler_step_scales_sources_when_state_is_zero() {
        // with x = 0, fx = dt * Σ s(t); continuity_1 at t = 0 leaves only
        // the cos(2πx) cos(t) source
        let pde = make_pde::<f64>("continuity_1", Some(2), Some(2)).unwrap();
        let table = ElementTable::new(2, 1, Grid::Sparse);
        let chunks = assign_elements(&table, 1);
        let sources = SourceVectors::new(&pde, &table);
        let mut host = HostWorkspace::new(&pde, &table);
        let mut rank = RankWorkspace::new(&pde, &table, &chunks);

        let dt = 0.01;
        explicit_time_advance(
            &pde,
            &table,
            &sources,
            &mut host,
            &mut rank,
            &chunks,
            0.0,
            dt,
            StepMethod::ForwardEuler,
        );

        // reference: dt * projection of cos(2πx)
        let fmwt = pde.transform_matrix(0);
        let proj = project_function(
            |x: f64| (2.0 * std::f64::consts::PI * x).cos(),
            -1.0,
            1.0,
            2,
            2,
            fmwt,
        );
        let expect = combine_dimensions(2, &table, &[proj], dt);
        let err = relative_l2_error(&host.fx, &expect);
        assert!(err < 1e-12, "relative error {err}");
    }
}

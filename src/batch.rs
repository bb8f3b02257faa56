//! Batched gemm scheduling for the Kronecker-product apply.
//!
//! A [`Batch`] is a fixed-shape list of raw operand pointers for one
//! batched gemm/gemv call; the list layout is exactly what a batched BLAS
//! ABI consumes. [`build_batches`] walks a chunk's couplings and lowers
//! every (row, column, term) triple into `num_dims` small gemms whose
//! operands are windows of the coefficient matrices and slices of the rank
//! workspace.

use crate::chunk::{max_connected_in_chunk, num_couplings_in_chunk, ElementChunk};
use crate::element_table::ElementTable;
use crate::lib_dispatch::Scalar;
use crate::pde::Pde;
use crate::tensor::{MatrixView, VectorView};
use crate::workspace::RankWorkspace;

/// Fixed-shape list of pointer slots for one batched gemm or gemv call.
///
/// Every slot shares `(nrows, ncols, stride, trans)`. Slots are assigned at
/// most once between clears; dispatch skips entries whose operand triple is
/// not fully assigned.
pub struct Batch<P> {
    num_entries: usize,
    nrows: usize,
    ncols: usize,
    stride: usize,
    do_trans: bool,
    entries: Vec<*mut P>,
}

impl<P: Scalar> Batch<P> {
    pub fn new(
        num_entries: usize,
        nrows: usize,
        ncols: usize,
        stride: usize,
        do_trans: bool,
    ) -> Self {
        assert!(num_entries > 0);
        assert!(nrows > 0);
        assert!(ncols > 0);
        assert!(stride > 0);
        Self {
            num_entries,
            nrows,
            ncols,
            stride,
            do_trans,
            entries: vec![std::ptr::null_mut(); num_entries],
        }
    }

    pub fn num_entries(&self) -> usize {
        self.num_entries
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn trans(&self) -> bool {
        self.do_trans
    }

    /// Record the view's data pointer at `position`.
    ///
    /// The slot must be unassigned and the view's shape must match the
    /// batch shape. Single-column batches skip the stride check; a column
    /// never strides.
    pub fn assign_entry(&mut self, a: MatrixView<'_, P>, position: usize) {
        assert_eq!(a.nrows(), self.nrows);
        assert_eq!(a.ncols(), self.ncols);
        if self.stride != 1 {
            assert_eq!(a.stride(), self.stride);
        }
        assert!(position < self.num_entries);
        assert!(
            self.entries[position].is_null(),
            "batch slot {position} assigned twice"
        );
        self.entries[position] = a.data();
    }

    /// Clear one slot; reports whether it had been assigned.
    pub fn clear_entry(&mut self, position: usize) -> bool {
        let was_assigned = !self.entries[position].is_null();
        self.entries[position] = std::ptr::null_mut();
        was_assigned
    }

    pub fn clear_all(&mut self) {
        for e in self.entries.iter_mut() {
            *e = std::ptr::null_mut();
        }
    }

    /// True when every slot has been assigned.
    pub fn is_filled(&self) -> bool {
        self.entries.iter().all(|e| !e.is_null())
    }

    fn entry(&self, position: usize) -> *mut P {
        self.entries[position]
    }

    /// Count of assigned slots.
    pub fn num_assigned(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_null()).count()
    }
}

/// One gemm per slot: `c := alpha * op(a) * op(b) + beta * c`.
///
/// Slots with any unassigned operand are skipped.
pub fn batched_gemm<P: Scalar>(a: &Batch<P>, b: &Batch<P>, c: &Batch<P>, alpha: P, beta: P) {
    assert_eq!(a.num_entries(), b.num_entries());
    assert_eq!(b.num_entries(), c.num_entries());
    // the blas interface has no transposed output
    assert!(!c.trans());

    let rows_a = if a.trans() { a.ncols() } else { a.nrows() };
    let cols_a = if a.trans() { a.nrows() } else { a.ncols() };
    let rows_b = if b.trans() { b.ncols() } else { b.nrows() };
    let cols_b = if b.trans() { b.nrows() } else { b.ncols() };

    assert_eq!(cols_a, rows_b);
    assert_eq!(c.nrows(), rows_a);
    assert_eq!(c.ncols(), cols_b);

    let (m, n, k) = (rows_a, cols_b, cols_a);
    for i in 0..a.num_entries() {
        let (pa, pb, pc) = (a.entry(i), b.entry(i), c.entry(i));
        if !pa.is_null() && !pb.is_null() && !pc.is_null() {
            unsafe {
                P::gemm(
                    a.trans(),
                    b.trans(),
                    m,
                    n,
                    k,
                    alpha,
                    pa,
                    a.stride(),
                    pb,
                    b.stride(),
                    beta,
                    pc,
                    c.stride(),
                );
            }
        }
    }
}

/// One gemv per slot; `b` and `c` are single-column batches.
pub fn batched_gemv<P: Scalar>(a: &Batch<P>, b: &Batch<P>, c: &Batch<P>, alpha: P, beta: P) {
    assert_eq!(a.num_entries(), b.num_entries());
    assert_eq!(b.num_entries(), c.num_entries());
    assert!(!b.trans() && !c.trans());

    let rows_a = if a.trans() { a.ncols() } else { a.nrows() };
    let cols_a = if a.trans() { a.nrows() } else { a.ncols() };

    assert_eq!(cols_a, b.nrows());
    assert_eq!(b.ncols(), 1);
    assert_eq!(c.ncols(), 1);
    assert_eq!(c.nrows(), rows_a);

    for i in 0..a.num_entries() {
        let (pa, pb, pc) = (a.entry(i), b.entry(i), c.entry(i));
        if !pa.is_null() && !pb.is_null() && !pc.is_null() {
            unsafe {
                P::gemv(
                    a.trans(),
                    a.nrows(),
                    a.ncols(),
                    alpha,
                    pa,
                    a.stride(),
                    pb,
                    b.stride(),
                    beta,
                    pc,
                    c.stride(),
                );
            }
        }
    }
}

/// The a/b/c operand lists of one dimension's batched gemm.
pub struct BatchOperandSet<P> {
    pub a: Batch<P>,
    pub b: Batch<P>,
    pub c: Batch<P>,
}

struct MatrixSizes {
    rows_a: usize,
    cols_a: usize,
    rows_b: usize,
    cols_b: usize,
}

/// Gemms contributed per triple at `dimension`: the first and last
/// dimension take one; intermediates take `degree^(num_dims - d - 1)`.
pub(crate) fn compute_batch_size(degree: usize, num_dims: usize, dimension: usize) -> usize {
    assert!(dimension < num_dims);
    assert!(degree > 0);
    if dimension == 0 || dimension == num_dims - 1 {
        1
    } else {
        degree.pow((num_dims - dimension - 1) as u32)
    }
}

/// Gemm operand shapes at `dimension`.
fn compute_dimensions(degree: usize, num_dims: usize, dimension: usize) -> MatrixSizes {
    assert!(dimension < num_dims);
    if dimension == 0 {
        MatrixSizes {
            rows_a: degree,
            cols_a: degree,
            rows_b: degree,
            cols_b: degree.pow((num_dims - 1) as u32),
        }
    } else {
        MatrixSizes {
            rows_a: degree.pow(dimension as u32),
            cols_a: degree,
            rows_b: degree,
            cols_b: degree,
        }
    }
}

/// Allocate the `num_dims` empty operand sets for `num_couplings` couplings.
pub fn allocate_batches<P: Scalar>(pde: &Pde<P>, num_couplings: usize) -> Vec<BatchOperandSet<P>> {
    let degree = pde.degree();
    let num_dims = pde.num_dims();
    let mut batches = Vec::with_capacity(num_dims);

    // dimension 0: one gemm per (coupling, term), operator on the left
    let num_gemms = pde.num_terms() * num_couplings;
    let sizes = compute_dimensions(degree, num_dims, 0);
    let coeff_stride = pde.coefficient(0, 0).stride();
    batches.push(BatchOperandSet {
        a: Batch::new(num_gemms, sizes.rows_a, sizes.cols_a, coeff_stride, false),
        b: Batch::new(num_gemms, sizes.rows_b, sizes.cols_b, sizes.rows_b, false),
        c: Batch::new(num_gemms, sizes.rows_a, sizes.cols_b, sizes.rows_a, false),
    });

    // remaining dimensions: workspace on the left, transposed operator on
    // the right
    for d in 1..num_dims {
        let num_gemms = compute_batch_size(degree, num_dims, d) * pde.num_terms() * num_couplings;
        let sizes = compute_dimensions(degree, num_dims, d);
        let coeff_stride = pde.coefficient(0, d).stride();
        batches.push(BatchOperandSet {
            a: Batch::new(num_gemms, sizes.rows_a, sizes.cols_a, sizes.rows_a, false),
            b: Batch::new(num_gemms, sizes.rows_b, sizes.cols_b, coeff_stride, true),
            c: Batch::new(num_gemms, sizes.rows_a, sizes.rows_b, sizes.rows_a, false),
        });
    }
    batches
}

/// Enqueue the gemms of the lowest dimension: `A * reshape(x)`.
fn kron_base<P: Scalar>(
    a: MatrixView<'_, P>,
    x: VectorView<'_, P>,
    y: VectorView<'_, P>,
    set: &mut BatchOperandSet<P>,
    batch_offset: usize,
    degree: usize,
    num_dims: usize,
) {
    set.a.assign_entry(a, batch_offset);
    let sizes = compute_dimensions(degree, num_dims, 0);
    set.b
        .assign_entry(x.as_matrix(sizes.rows_b, sizes.cols_b), batch_offset);
    set.c
        .assign_entry(y.as_matrix(sizes.rows_a, sizes.cols_b), batch_offset);
}

/// Lower one Kronecker-product apply `y = (A_{D-1} ⊗ … ⊗ A_0) x` into the
/// chunk's batch sets.
///
/// `operators[d]` is the `degree x degree` window of dimension d; dimension
/// 0 varies fastest in `x`. `work` holds the `min(num_dims - 1, 2)`
/// intermediate buffers the gemm chain alternates between; `batch_offset`
/// is the triple's ordinal, from which every slot index is derived, so
/// distinct triples touch disjoint slots.
pub fn kronmult_to_batch_sets<P: Scalar>(
    operators: &[MatrixView<'_, P>],
    x: VectorView<'_, P>,
    y: VectorView<'_, P>,
    work: &[VectorView<'_, P>],
    batches: &mut [BatchOperandSet<P>],
    batch_offset: usize,
    pde: &Pde<P>,
) {
    let degree = pde.degree();
    let num_dims = pde.num_dims();
    let elem_size = pde.elem_size();

    assert_eq!(x.len(), elem_size);
    assert_eq!(y.len(), elem_size);
    assert_eq!(work.len(), (num_dims - 1).min(2));
    for wv in work {
        assert_eq!(wv.len(), elem_size);
    }
    assert_eq!(operators.len(), num_dims);
    for op in operators {
        assert_eq!(op.nrows(), degree);
        assert_eq!(op.ncols(), degree);
    }
    assert_eq!(batches.len(), num_dims);

    // in one dimension the single gemm writes straight into y
    if num_dims == 1 {
        kron_base(
            operators[0],
            x,
            y,
            &mut batches[0],
            batch_offset,
            degree,
            num_dims,
        );
        return;
    }

    kron_base(
        operators[0],
        x,
        work[0],
        &mut batches[0],
        batch_offset,
        degree,
        num_dims,
    );

    // intermediate dimensions alternate between the two work buffers
    for dimension in 1..num_dims - 1 {
        let sizes = compute_dimensions(degree, num_dims, dimension);
        let num_gemms = compute_batch_size(degree, num_dims, dimension);
        let offset = sizes.rows_a * sizes.cols_a;
        assert_eq!(offset * num_gemms, elem_size);

        for gemm in 0..num_gemms {
            let slot = batch_offset * num_gemms + gemm;
            let input = work[(dimension - 1) % 2]
                .subvector(offset * gemm..offset * (gemm + 1))
                .as_matrix(sizes.rows_a, sizes.cols_a);
            batches[dimension].a.assign_entry(input, slot);
            batches[dimension].b.assign_entry(operators[dimension], slot);
            let output = work[dimension % 2]
                .subvector(offset * gemm..offset * (gemm + 1))
                .as_matrix(sizes.rows_a, sizes.cols_a);
            batches[dimension].c.assign_entry(output, slot);
        }
    }

    // the highest dimension reads the last work buffer and writes y
    let sizes = compute_dimensions(degree, num_dims, num_dims - 1);
    let input = work[num_dims % 2].as_matrix(sizes.rows_a, sizes.cols_a);
    batches[num_dims - 1].a.assign_entry(input, batch_offset);
    batches[num_dims - 1]
        .b
        .assign_entry(operators[num_dims - 1], batch_offset);
    let output = y.as_matrix(sizes.rows_a, sizes.cols_a);
    batches[num_dims - 1].c.assign_entry(output, batch_offset);
}

/// Build the batch sets of one chunk.
///
/// Per coupling (row i, column j) and term k the triple's ordinal is
/// `kron_index = k + total_prev_couplings * num_terms`; its output lands at
/// `elem_size * kron_index` in the reduction space, keeping the partial
/// outputs of one coupling contiguous, term-innermost.
pub fn build_batches<P: Scalar>(
    pde: &Pde<P>,
    table: &ElementTable,
    workspace: &mut RankWorkspace<P>,
    chunk: &ElementChunk,
) -> Vec<BatchOperandSet<P>> {
    let degree = pde.degree();
    let elem_size = pde.elem_size();
    let num_dims = pde.num_dims();
    let num_terms = pde.num_terms();
    let num_workspaces = (num_dims - 1).min(2);

    let couplings = num_couplings_in_chunk(chunk);
    assert!(workspace.reduction_space.len() >= elem_size * couplings * num_terms);
    assert_eq!(
        workspace.batch_intermediate.len(),
        workspace.reduction_space.len() * num_workspaces
    );
    let max_items_to_reduce = num_terms * max_connected_in_chunk(chunk);
    assert!(workspace.unit_vector.len() >= max_items_to_reduce);

    let mut batches = allocate_batches(pde, couplings);

    let input_base = workspace.batch_input.as_mut_ptr();
    let input_len = workspace.batch_input.len();
    let reduction_base = workspace.reduction_space.as_mut_ptr();
    let intermediate_base = workspace.batch_intermediate.as_mut_ptr();

    let mut prev_row_couplings = 0usize;
    for (&row, limits) in chunk.iter() {
        let row_ids = table.indices_1d(row);
        let operator_row: Vec<usize> = row_ids.iter().map(|&r| r as usize * degree).collect();

        for col in limits.start..=limits.stop {
            let col_ids = table.indices_1d(col);
            let operator_col: Vec<usize> = col_ids.iter().map(|&c| c as usize * degree).collect();

            let total_prev = prev_row_couplings + (col - limits.start);

            for term in 0..num_terms {
                let kron_index = term + total_prev * num_terms;

                // partial output of this triple
                let y_index = elem_size * kron_index;
                let y_view = unsafe {
                    VectorView::from_raw_parts(reduction_base.add(y_index), elem_size)
                };

                // intermediate buffers, two per triple at most
                let work_index = elem_size * kron_index * num_workspaces;
                let mut work_views = Vec::with_capacity(num_workspaces);
                for ws in 0..num_workspaces {
                    work_views.push(unsafe {
                        VectorView::from_raw_parts(
                            intermediate_base.add(work_index + ws * elem_size),
                            elem_size,
                        )
                    });
                }

                // operator windows selected by the coupling's 1D indices
                let operator_views: Vec<MatrixView<'_, P>> = (0..num_dims)
                    .map(|d| {
                        pde.coefficient(term, d).submatrix(
                            operator_row[d]..operator_row[d] + degree,
                            operator_col[d]..operator_col[d] + degree,
                        )
                    })
                    .collect();

                // staged input of the column element
                let x_index = (total_prev % table.size()) * elem_size;
                assert!(x_index + elem_size <= input_len);
                let x_view = unsafe {
                    VectorView::from_raw_parts(input_base.add(x_index), elem_size)
                };

                kronmult_to_batch_sets(
                    &operator_views,
                    x_view,
                    y_view,
                    &work_views,
                    &mut batches,
                    kron_index,
                    pde,
                );
            }
        }
        prev_row_couplings += limits.count();
    }

    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::assign_elements;
    use crate::element_table::Grid;
    use crate::pde::make_pde;
    use crate::tensor::{Matrix, Vector};
    use crate::workspace::RankWorkspace;

    #[test]
    fn slots_are_write_once_and_clearable() {
        let m = Matrix::<f64>::identity(2);
        let mut batch = Batch::new(2, 2, 2, 2, false);
        assert!(!batch.is_filled());
        batch.assign_entry(m.view(), 0);
        assert!(!batch.is_filled());
        batch.assign_entry(m.view(), 1);
        assert!(batch.is_filled());
        assert!(batch.clear_entry(0));
        assert!(!batch.clear_entry(0));
        batch.clear_all();
        assert_eq!(batch.num_assigned(), 0);
    }

    #[test]
    #[should_panic(expected = "assigned twice")]
    fn double_assignment_is_fatal() {
        let m = Matrix::<f64>::identity(2);
        let mut batch = Batch::new(1, 2, 2, 2, false);
        batch.assign_entry(m.view(), 0);
        batch.assign_entry(m.view(), 0);
    }

    #[test]
    fn batched_gemm_matches_the_matrix_product() {
        let a = Matrix::from_row_major(2, 2, &[1.0_f64, 2.0, 3.0, 4.0]);
        let b = Matrix::from_row_major(2, 2, &[5.0_f64, 6.0, 7.0, 8.0]);
        let c = Matrix::<f64>::zeros(2, 2);

        let mut ba = Batch::new(1, 2, 2, 2, false);
        let mut bb = Batch::new(1, 2, 2, 2, false);
        let mut bc = Batch::new(1, 2, 2, 2, false);
        ba.assign_entry(a.view(), 0);
        bb.assign_entry(b.view(), 0);
        bc.assign_entry(c.view(), 0);

        batched_gemm(&ba, &bb, &bc, 1.0, 0.0);
        assert_eq!(c, &a * &b);
    }

    #[test]
    fn unassigned_slots_are_skipped() {
        let a = Matrix::<f64>::identity(2);
        let c = Matrix::<f64>::zeros(2, 2);
        let mut ba = Batch::new(2, 2, 2, 2, false);
        let mut bb = Batch::new(2, 2, 2, 2, false);
        let mut bc = Batch::new(2, 2, 2, 2, false);
        ba.assign_entry(a.view(), 0);
        // slot 0 of b left unassigned
        bb.assign_entry(a.view(), 1);
        bc.assign_entry(c.view(), 0);
        batched_gemm(&ba, &bb, &bc, 1.0, 0.0);
        assert_eq!(c, Matrix::zeros(2, 2));
    }

    #[test]
    fn batched_gemv_contracts_columns() {
        // A (2x3) of ones times the ones vector = [3, 3]
        let a = Matrix::from_fn(2, 3, |_, _| 1.0_f64);
        let x = Vector::from(vec![1.0_f64, 1.0, 1.0]);
        let y = Vector::<f64>::zeros(2);

        let mut ba = Batch::new(1, 2, 3, 2, false);
        let mut bx = Batch::new(1, 3, 1, 1, false);
        let mut by = Batch::new(1, 2, 1, 1, false);
        ba.assign_entry(a.view(), 0);
        bx.assign_entry(x.view().as_matrix(3, 1), 0);
        by.assign_entry(y.view().as_matrix(2, 1), 0);
        batched_gemv(&ba, &bx, &by, 1.0, 0.0);
        assert_eq!(y.as_slice(), &[3.0, 3.0]);
    }

    #[test]
    fn batch_size_is_one_at_the_ends() {
        assert_eq!(compute_batch_size(4, 6, 0), 1);
        assert_eq!(compute_batch_size(4, 6, 5), 1);
        assert_eq!(compute_batch_size(4, 6, 1), 256);
        assert_eq!(compute_batch_size(4, 6, 2), 64);
        assert_eq!(compute_batch_size(4, 6, 3), 16);
        assert_eq!(compute_batch_size(4, 6, 4), 4);
    }

    #[test]
    fn one_dimensional_kronmult_is_a_single_gemm_per_coupling() {
        let pde = make_pde::<f64>("continuity_1", Some(2), Some(2)).unwrap();
        let table = ElementTable::new(2, 1, Grid::Sparse);
        let chunks = assign_elements(&table, 1);
        let mut ws = RankWorkspace::new(&pde, &table, &chunks);
        let batches = build_batches(&pde, &table, &mut ws, &chunks[0]);
        assert_eq!(batches.len(), 1);
        let expected = table.size() * table.size() * pde.num_terms();
        assert_eq!(batches[0].a.num_assigned(), expected);
        assert!(batches[0].a.is_filled());
        assert!(batches[0].c.is_filled());
    }
}

//! Non-owning windows into matrices, vectors and workspace buffers.
//!
//! A view is a raw `(ptr, shape, stride)` window whose lifetime is bound to
//! the buffer it was carved from. Reads and writes through a view alias the
//! owner's storage. The batched call sites extract the raw pointer and hand
//! it to the dispatch layer, so the orchestration must keep writer
//! exclusivity: a buffer reached through views in a live batch is not
//! otherwise accessed until the batch has fired.

use std::marker::PhantomData;
use std::ops::Range;

use crate::lib_dispatch::Scalar;
use crate::tensor::Matrix;

/// Column-major matrix window with an explicit leading dimension.
#[derive(Debug, Clone, Copy)]
pub struct MatrixView<'a, P> {
    ptr: *mut P,
    nrows: usize,
    ncols: usize,
    stride: usize,
    _owner: PhantomData<&'a P>,
}

impl<'a, P: Copy> MatrixView<'a, P> {
    /// # Safety
    ///
    /// `ptr` must stay valid for `(ncols - 1) * stride + nrows` elements for
    /// the lifetime `'a`.
    pub(crate) unsafe fn from_raw_parts(
        ptr: *mut P,
        nrows: usize,
        ncols: usize,
        stride: usize,
    ) -> Self {
        assert!(stride >= nrows.max(1));
        Self {
            ptr,
            nrows,
            ncols,
            stride,
            _owner: PhantomData,
        }
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

    /// Raw pointer to the `(0, 0)` element.
    pub fn data(&self) -> *mut P {
        self.ptr
    }

    pub fn get(&self, i: usize, j: usize) -> P {
        assert!(i < self.nrows && j < self.ncols);
        unsafe { *self.ptr.add(j * self.stride + i) }
    }

    /// Window into a window; the stride is inherited from the root owner.
    pub fn submatrix(&self, rows: Range<usize>, cols: Range<usize>) -> MatrixView<'a, P> {
        assert!(rows.end <= self.nrows && cols.end <= self.ncols);
        assert!(rows.start <= rows.end && cols.start <= cols.end);
        MatrixView {
            ptr: unsafe { self.ptr.add(cols.start * self.stride + rows.start) },
            nrows: rows.end - rows.start,
            ncols: cols.end - cols.start,
            stride: self.stride,
            _owner: PhantomData,
        }
    }
}

impl<'a, P: Scalar> MatrixView<'a, P> {
    /// Owned copy of the window.
    pub fn to_matrix(&self) -> Matrix<P> {
        let mut out = Matrix::zeros(self.nrows, self.ncols);
        for j in 0..self.ncols {
            for i in 0..self.nrows {
                out[(i, j)] = self.get(i, j);
            }
        }
        out
    }
}

/// Contiguous vector window.
#[derive(Debug, Clone, Copy)]
pub struct VectorView<'a, P> {
    ptr: *mut P,
    len: usize,
    _owner: PhantomData<&'a P>,
}

impl<'a, P: Copy> VectorView<'a, P> {
    /// # Safety
    ///
    /// `ptr` must stay valid for `len` elements for the lifetime `'a`.
    pub(crate) unsafe fn from_raw_parts(ptr: *mut P, len: usize) -> Self {
        Self {
            ptr,
            len,
            _owner: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn data(&self) -> *mut P {
        self.ptr
    }

    pub fn get(&self, i: usize) -> P {
        assert!(i < self.len);
        unsafe { *self.ptr.add(i) }
    }

    pub fn subvector(&self, range: Range<usize>) -> VectorView<'a, P> {
        assert!(range.end <= self.len && range.start <= range.end);
        VectorView {
            ptr: unsafe { self.ptr.add(range.start) },
            len: range.end - range.start,
            _owner: PhantomData,
        }
    }

    /// Overlay the window as a contiguous `nrows x ncols` column-major
    /// matrix (stride `nrows`).
    pub fn as_matrix(&self, nrows: usize, ncols: usize) -> MatrixView<'a, P> {
        assert_eq!(nrows * ncols, self.len);
        unsafe { MatrixView::from_raw_parts(self.ptr, nrows, ncols, nrows) }
    }
}

#[cfg(test)]
mod tests {
    use crate::tensor::{Matrix, Vector};

    #[test]
    fn view_aliases_owner_storage() {
        let mut m = Matrix::<f64>::zeros(3, 3);
        m[(1, 2)] = 7.0;
        let v = m.view();
        assert_eq!(v.get(1, 2), 7.0);

        let sub = v.submatrix(1..3, 1..3);
        assert_eq!(sub.nrows(), 2);
        assert_eq!(sub.stride(), 3);
        assert_eq!(sub.get(0, 1), 7.0);
    }

    #[test]
    fn vector_overlay_as_matrix() {
        let x = Vector::from(vec![1.0_f64, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let m = x.view().subvector(2..6).as_matrix(2, 2);
        assert_eq!(m.get(0, 0), 3.0);
        assert_eq!(m.get(1, 0), 4.0);
        assert_eq!(m.get(0, 1), 5.0);
        assert_eq!(m.get(1, 1), 6.0);
    }

    #[test]
    #[should_panic]
    fn out_of_range_view_panics() {
        let m = Matrix::<f64>::zeros(2, 2);
        let _ = m.view().submatrix(0..3, 0..1);
    }
}

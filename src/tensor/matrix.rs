//! Owning column-major matrix.

use std::ops::{Add, Index, IndexMut, Mul, Sub};

use crate::lib_dispatch::{self, Scalar};
use crate::tensor::{MatrixView, Vector};

/// Dense column-major matrix with `stride == nrows`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<P> {
    data: Vec<P>,
    nrows: usize,
    ncols: usize,
}

impl<P: Scalar> Matrix<P> {
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            data: vec![P::zero(); nrows * ncols],
            nrows,
            ncols,
        }
    }

    /// Identity, square.
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m[(i, i)] = P::one();
        }
        m
    }

    pub fn from_fn(nrows: usize, ncols: usize, f: impl Fn(usize, usize) -> P) -> Self {
        let mut m = Self::zeros(nrows, ncols);
        for j in 0..ncols {
            for i in 0..nrows {
                m[(i, j)] = f(i, j);
            }
        }
        m
    }

    /// Build from a row-major slice, mostly for tests and literals.
    pub fn from_row_major(nrows: usize, ncols: usize, values: &[P]) -> Self {
        assert_eq!(values.len(), nrows * ncols);
        Self::from_fn(nrows, ncols, |i, j| values[i * ncols + j])
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn size(&self) -> usize {
        self.nrows * self.ncols
    }

    /// Leading dimension of the allocation.
    pub fn stride(&self) -> usize {
        self.nrows
    }

    pub fn as_ptr(&self) -> *const P {
        self.data.as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut P {
        self.data.as_mut_ptr()
    }

    /// View of the whole matrix.
    pub fn view(&self) -> MatrixView<'_, P> {
        unsafe {
            MatrixView::from_raw_parts(
                self.data.as_ptr() as *mut P,
                self.nrows,
                self.ncols,
                self.nrows,
            )
        }
    }

    pub fn transpose(&self) -> Matrix<P> {
        Matrix::from_fn(self.ncols, self.nrows, |i, j| self[(j, i)])
    }

    /// In-place inverse via pivoted LU. Singularity is fatal.
    pub fn invert(&mut self) -> &mut Self {
        assert_eq!(self.nrows, self.ncols, "inverse of a non-square matrix");
        let n = self.nrows;
        let mut ipiv = vec![0usize; n];
        let info = lib_dispatch::getrf(n, &mut self.data, n, &mut ipiv);
        assert_eq!(info, 0, "singular matrix in invert");
        let info = lib_dispatch::getri(n, &mut self.data, n, &ipiv);
        assert_eq!(info, 0, "singular matrix in invert");
        self
    }

    /// Determinant via pivoted LU, non-destructive.
    pub fn determinant(&self) -> P {
        assert_eq!(self.nrows, self.ncols, "determinant of a non-square matrix");
        let n = self.nrows;
        let mut lu = self.data.clone();
        let mut ipiv = vec![0usize; n];
        let info = lib_dispatch::getrf(n, &mut lu, n, &mut ipiv);
        if info != 0 {
            return P::zero();
        }
        let mut det = P::one();
        for i in 0..n {
            if ipiv[i] != i {
                det = -det;
            }
            det = det * lu[i * n + i];
        }
        det
    }

    pub fn approx_eq(&self, other: &Matrix<P>, tol: P) -> bool {
        if self.nrows != other.nrows || self.ncols != other.ncols {
            return false;
        }
        self.data
            .iter()
            .zip(other.data.iter())
            .all(|(a, b)| (*a - *b).abs() <= tol)
    }

    pub fn max_abs(&self) -> P {
        self.data
            .iter()
            .fold(P::zero(), |acc, v| acc.max(v.abs()))
    }
}

impl<P: Scalar> Index<(usize, usize)> for Matrix<P> {
    type Output = P;

    fn index(&self, (i, j): (usize, usize)) -> &P {
        assert!(i < self.nrows && j < self.ncols);
        &self.data[j * self.nrows + i]
    }
}

impl<P: Scalar> IndexMut<(usize, usize)> for Matrix<P> {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut P {
        assert!(i < self.nrows && j < self.ncols);
        &mut self.data[j * self.nrows + i]
    }
}

impl<P: Scalar> Add for &Matrix<P> {
    type Output = Matrix<P>;

    fn add(self, rhs: &Matrix<P>) -> Matrix<P> {
        assert!(self.nrows == rhs.nrows && self.ncols == rhs.ncols, "shape mismatch");
        let mut out = self.clone();
        for (o, r) in out.data.iter_mut().zip(rhs.data.iter()) {
            *o = *o + *r;
        }
        out
    }
}

impl<P: Scalar> Sub for &Matrix<P> {
    type Output = Matrix<P>;

    fn sub(self, rhs: &Matrix<P>) -> Matrix<P> {
        assert!(self.nrows == rhs.nrows && self.ncols == rhs.ncols, "shape mismatch");
        let mut out = self.clone();
        for (o, r) in out.data.iter_mut().zip(rhs.data.iter()) {
            *o = *o - *r;
        }
        out
    }
}

impl<P: Scalar> Mul<P> for &Matrix<P> {
    type Output = Matrix<P>;

    fn mul(self, rhs: P) -> Matrix<P> {
        let mut out = self.clone();
        for o in out.data.iter_mut() {
            *o = *o * rhs;
        }
        out
    }
}

impl<P: Scalar> Mul for &Matrix<P> {
    type Output = Matrix<P>;

    fn mul(self, rhs: &Matrix<P>) -> Matrix<P> {
        assert_eq!(self.ncols, rhs.nrows, "shape mismatch in matrix product");
        let (m, n, k) = (self.nrows, rhs.ncols, self.ncols);
        let mut out = Matrix::zeros(m, n);
        unsafe {
            P::gemm(
                false,
                false,
                m,
                n,
                k,
                P::one(),
                self.as_ptr(),
                m.max(1),
                rhs.as_ptr(),
                k.max(1),
                P::zero(),
                out.as_mut_ptr(),
                m.max(1),
            );
        }
        out
    }
}

impl<P: Scalar> Mul<&Vector<P>> for &Matrix<P> {
    type Output = Vector<P>;

    fn mul(self, rhs: &Vector<P>) -> Vector<P> {
        assert_eq!(self.ncols, rhs.len(), "shape mismatch in matrix-vector product");
        let mut out = Vector::zeros(self.nrows);
        unsafe {
            P::gemv(
                false,
                self.nrows,
                self.ncols,
                P::one(),
                self.as_ptr(),
                self.nrows.max(1),
                rhs.as_ptr(),
                1,
                P::zero(),
                out.as_mut_ptr(),
                1,
            );
        }
        out
    }
}

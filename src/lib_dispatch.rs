//! Thin dispatch layer over the dense linear-algebra backend.
//!
//! Everything here speaks the column-major, leading-dimension convention so
//! that batched call sites can hand raw operand pointers straight through.
//! `gemm`/`gemv` route to faer's `matmul`; `getrf`/`getri` are compact
//! pivoted-LU kernels with the LAPACK-style contract.

use faer::linalg::matmul::matmul;
use faer::mat::{MatMut, MatRef};
use faer::{Accum, Par};
use num_traits::Float;

/// Numeric element type of the engine: `f32` or `f64`.
///
/// The gemm/gemv hooks operate on raw column-major operands; `lda`-style
/// arguments are leading dimensions in elements, never bytes.
pub trait Scalar:
    Float
    + Default
    + Send
    + Sync
    + std::fmt::Debug
    + std::fmt::Display
    + std::fmt::LowerExp
    + std::iter::Sum
    + 'static
{
    /// `C := alpha * op(A) * op(B) + beta * C`, with `op(A)` being `m x k`,
    /// `op(B)` being `k x n` and `C` being `m x n`.
    ///
    /// # Safety
    ///
    /// `a`, `b`, `c` must point to column-major storage large enough for the
    /// given dimensions and leading dimensions, and `c` must not alias `a`
    /// or `b`.
    unsafe fn gemm(
        trans_a: bool,
        trans_b: bool,
        m: usize,
        n: usize,
        k: usize,
        alpha: Self,
        a: *const Self,
        lda: usize,
        b: *const Self,
        ldb: usize,
        beta: Self,
        c: *mut Self,
        ldc: usize,
    );

    /// `y := alpha * op(A) * x + beta * y`, where `A` is `m x n` as stored.
    ///
    /// # Safety
    ///
    /// Same pointer contract as [`Scalar::gemm`], with `x`/`y` strided by
    /// `incx`/`incy`.
    unsafe fn gemv(
        trans: bool,
        m: usize,
        n: usize,
        alpha: Self,
        a: *const Self,
        lda: usize,
        x: *const Self,
        incx: usize,
        beta: Self,
        y: *mut Self,
        incy: usize,
    );
}

macro_rules! impl_scalar {
    ($t:ty) => {
        impl Scalar for $t {
            unsafe fn gemm(
                trans_a: bool,
                trans_b: bool,
                m: usize,
                n: usize,
                k: usize,
                alpha: Self,
                a: *const Self,
                lda: usize,
                b: *const Self,
                ldb: usize,
                beta: Self,
                c: *mut Self,
                ldc: usize,
            ) {
                if m == 0 || n == 0 || k == 0 {
                    return;
                }
                // A transposed view swaps the roles of the unit stride and
                // the leading dimension.
                let (ars, acs) = if trans_a {
                    (lda as isize, 1)
                } else {
                    (1, lda as isize)
                };
                let (brs, bcs) = if trans_b {
                    (ldb as isize, 1)
                } else {
                    (1, ldb as isize)
                };

                // faer's matmul either replaces or accumulates; a general
                // beta needs the pre-scale.
                let accum = if beta == 0.0 { Accum::Replace } else { Accum::Add };
                if beta != 0.0 && beta != 1.0 {
                    for j in 0..n {
                        for i in 0..m {
                            let p = c.add(j * ldc + i);
                            *p = beta * *p;
                        }
                    }
                }

                let a_mat: MatRef<'_, $t> = MatRef::from_raw_parts(a, m, k, ars, acs);
                let b_mat: MatRef<'_, $t> = MatRef::from_raw_parts(b, k, n, brs, bcs);
                let c_mat: MatMut<'_, $t> =
                    MatMut::from_raw_parts_mut(c, m, n, 1, ldc as isize);
                matmul(c_mat, accum, a_mat, b_mat, alpha, Par::Seq);
            }

            unsafe fn gemv(
                trans: bool,
                m: usize,
                n: usize,
                alpha: Self,
                a: *const Self,
                lda: usize,
                x: *const Self,
                incx: usize,
                beta: Self,
                y: *mut Self,
                incy: usize,
            ) {
                let (rows, cols) = if trans { (n, m) } else { (m, n) };
                if rows == 0 || cols == 0 {
                    return;
                }
                let (ars, acs) = if trans {
                    (lda as isize, 1)
                } else {
                    (1, lda as isize)
                };

                let accum = if beta == 0.0 { Accum::Replace } else { Accum::Add };
                if beta != 0.0 && beta != 1.0 {
                    for i in 0..rows {
                        let p = y.add(i * incy);
                        *p = beta * *p;
                    }
                }

                let a_mat: MatRef<'_, $t> = MatRef::from_raw_parts(a, rows, cols, ars, acs);
                let x_mat: MatRef<'_, $t> =
                    MatRef::from_raw_parts(x, cols, 1, incx as isize, 1);
                let y_mat: MatMut<'_, $t> =
                    MatMut::from_raw_parts_mut(y, rows, 1, incy as isize, 1);
                matmul(y_mat, accum, a_mat, x_mat, alpha, Par::Seq);
            }
        }
    };
}

impl_scalar!(f32);
impl_scalar!(f64);

/// `y := x` with strides (the `?copy` contract).
///
/// # Safety
///
/// `x` must be valid for `n` strided reads and `y` for `n` strided writes.
pub unsafe fn copy<P: Copy>(n: usize, x: *const P, incx: usize, y: *mut P, incy: usize) {
    for i in 0..n {
        *y.add(i * incy) = *x.add(i * incx);
    }
}

/// Partial-pivot LU factorization in place, column-major.
///
/// Returns 0 on success or the 1-based column of a zero pivot (the LAPACK
/// `info` convention).
pub fn getrf<P: Scalar>(n: usize, a: &mut [P], lda: usize, ipiv: &mut [usize]) -> i32 {
    assert!(lda >= n.max(1));
    assert!(a.len() >= lda * n);
    assert!(ipiv.len() >= n);

    for j in 0..n {
        let mut p = j;
        for i in (j + 1)..n {
            if a[j * lda + i].abs() > a[j * lda + p].abs() {
                p = i;
            }
        }
        ipiv[j] = p;
        if a[j * lda + p] == P::zero() {
            return (j + 1) as i32;
        }
        if p != j {
            for col in 0..n {
                a.swap(col * lda + j, col * lda + p);
            }
        }
        let piv = a[j * lda + j];
        for i in (j + 1)..n {
            a[j * lda + i] = a[j * lda + i] / piv;
        }
        for col in (j + 1)..n {
            let ujc = a[col * lda + j];
            if ujc != P::zero() {
                for i in (j + 1)..n {
                    let lij = a[j * lda + i];
                    a[col * lda + i] = a[col * lda + i] - lij * ujc;
                }
            }
        }
    }
    0
}

/// Matrix inverse from a [`getrf`] factorization, written back over the
/// factors. Returns 0 on success.
pub fn getri<P: Scalar>(n: usize, a: &mut [P], lda: usize, ipiv: &[usize]) -> i32 {
    assert!(lda >= n.max(1));
    assert!(a.len() >= lda * n);
    assert!(ipiv.len() >= n);

    let lu: Vec<P> = a[..lda * n].to_vec();
    let mut inv = vec![P::zero(); n * n];
    let mut b = vec![P::zero(); n];

    for col in 0..n {
        for v in b.iter_mut() {
            *v = P::zero();
        }
        b[col] = P::one();
        // row interchanges in factorization order
        for k in 0..n {
            let p = ipiv[k];
            if p != k {
                b.swap(k, p);
            }
        }
        // L y = P b, unit lower triangle
        for i in 0..n {
            let mut s = b[i];
            for k in 0..i {
                s = s - lu[k * lda + i] * b[k];
            }
            b[i] = s;
        }
        // U x = y
        for i in (0..n).rev() {
            let mut s = b[i];
            for k in (i + 1)..n {
                s = s - lu[k * lda + i] * b[k];
            }
            b[i] = s / lu[i * lda + i];
        }
        inv[col * n..(col + 1) * n].copy_from_slice(&b);
    }

    for col in 0..n {
        for i in 0..n {
            a[col * lda + i] = inv[col * n + i];
        }
    }
    0
}

/// Infallible cast from an `f64` constant to the working precision.
pub fn real<P: Scalar>(x: f64) -> P {
    P::from(x).unwrap()
}

//! Orthonormal multiwavelet transform and function projection.
//!
//! The hierarchical basis pairs global Legendre scaling functions with
//! multiwavelets: piecewise polynomials supported on dyadic cells that are
//! orthogonal to every polynomial of lower degree on their support. The
//! transform matrix maps fine-cell Legendre coefficients to hierarchical
//! coefficients; its row blocks are ordered by the 1D element index, so
//! block `idx1d(l, c)` carries the level-l wavelets of cell c.

use crate::element_table::{idx1d, ElementTable};
use crate::lib_dispatch::{real, Scalar};
use crate::quadrature::{legendre_values, legendre_weights};
use crate::tensor::{Matrix, Vector};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Quadrature size for projecting arbitrary (non-polynomial) functions.
const PROJECTION_QUAD_MIN: usize = 10;

/// Mother wavelet coefficients in the orthonormal half-interval basis.
///
/// Returns `degree` rows of `2 * degree` coefficients: entry `i` weights the
/// left-half basis function `ℓ_i(2x + 1)`, entry `degree + i` the right-half
/// `ℓ_i(2x - 1)`, where `ℓ_i = √(2i+1) P_i`. Each row is orthonormal on
/// [-1, 1] and orthogonal to all polynomials of degree < `degree`.
pub(crate) fn mother_wavelets<P: Scalar>(degree: usize) -> Vec<Vec<P>> {
    let k = degree;
    assert!(k >= 1);
    let dim = 2 * k;

    let (u, w) = legendre_weights::<P>(k, -P::one(), P::one());
    let (ell, _) = legendre_values(u.as_slice(), k);

    let half = real::<P>(0.5);
    let left_pts: Vec<P> = u.iter().map(|&q| (q - P::one()) * half).collect();
    let right_pts: Vec<P> = u.iter().map(|&q| (q + P::one()) * half).collect();
    let (ell_left, _) = legendre_values(&left_pts, k);
    let (ell_right, _) = legendre_values(&right_pts, k);

    // Global orthonormal polynomials expressed in the half-interval basis.
    // P̂_m = ℓ_m / √2 on [-1, 1]; the quadrature is exact here.
    let inv = half / real::<P>(2.0_f64.sqrt());
    let polys: Vec<Vec<P>> = (0..k)
        .map(|m| {
            let mut v = vec![P::zero(); dim];
            for i in 0..k {
                let mut l = P::zero();
                let mut r = P::zero();
                for q in 0..k {
                    l = l + w[q] * ell_left[(q, m)] * ell[(q, i)];
                    r = r + w[q] * ell_right[(q, m)] * ell[(q, i)];
                }
                v[i] = inv * l;
                v[k + i] = inv * r;
            }
            v
        })
        .collect();

    // Project the unit coefficient vectors against the polynomial space and
    // the wavelets found so far, then orthonormalize. Exactly k of the 2k
    // candidates survive.
    let tol = P::epsilon().sqrt();
    let mut wavelets: Vec<Vec<P>> = Vec::with_capacity(k);
    for j in 0..dim {
        if wavelets.len() == k {
            break;
        }
        let mut c = vec![P::zero(); dim];
        c[j] = P::one();
        // two Gram-Schmidt passes keep the complement numerically clean
        for _ in 0..2 {
            for b in polys.iter() {
                let d = dot(&c, b);
                for (ci, bi) in c.iter_mut().zip(b.iter()) {
                    *ci = *ci - d * *bi;
                }
            }
            for b in wavelets.iter() {
                let d = dot(&c, b);
                for (ci, bi) in c.iter_mut().zip(b.iter()) {
                    *ci = *ci - d * *bi;
                }
            }
        }
        let nrm = dot(&c, &c).sqrt();
        if nrm > tol {
            for ci in c.iter_mut() {
                *ci = *ci / nrm;
            }
            wavelets.push(c);
        }
    }
    assert_eq!(wavelets.len(), k, "wavelet construction lost rank");
    wavelets
}

fn dot<P: Scalar>(a: &[P], b: &[P]) -> P {
    a.iter().zip(b.iter()).map(|(&x, &y)| x * y).sum()
}

/// Evaluate one mother-wavelet half at the half-local coordinate `t`.
fn eval_wavelet_piece<P: Scalar>(coeffs: &[P], degree: usize, left: bool, t: P) -> P {
    let offset = if left { 0 } else { degree };
    let mut val = P::zero();
    for i in 0..degree {
        let norm = real::<P>((2 * i + 1) as f64).sqrt();
        val = val + coeffs[offset + i] * norm * crate::quadrature::legendre(i, t);
    }
    val
}

/// Forward multiwavelet transform matrix of side `degree · 2^level`.
///
/// Orthogonal: `F Fᵀ = I`. The matrix is domain independent; both bases
/// rescale identically under the affine map to a physical interval.
pub fn multiwavelet_transform<P: Scalar>(level: i32, degree: usize) -> Matrix<P> {
    assert!(level >= 0);
    let k = degree;
    assert!(k >= 1);
    let n_cells = 1usize << level;
    let n = k * n_cells;
    let h = P::one() / real::<P>(n_cells as f64);
    let half = real::<P>(0.5);

    let (u, w) = legendre_weights::<P>(k, -P::one(), P::one());
    let (ell, _) = legendre_values(u.as_slice(), k);

    let mut fmwt = Matrix::zeros(n, n);

    // Level-0 block: global scaling functions ℓ_m(2x - 1) on [0, 1].
    let sqrt_h = h.sqrt();
    for c in 0..n_cells {
        let x0 = real::<P>(c as f64) * h;
        for q in 0..k {
            let x = x0 + h * (u[q] + P::one()) * half;
            let t = real::<P>(2.0) * x - P::one();
            let (gl, _) = legendre_values(&[t], k);
            for m in 0..k {
                for i in 0..k {
                    let add = sqrt_h * half * w[q] * gl[(0, m)] * ell[(q, i)];
                    fmwt[(m, c * k + i)] = fmwt[(m, c * k + i)] + add;
                }
            }
        }
    }

    // Wavelet blocks, one per (level l, cell cc), scaled translates of the
    // mother wavelets.
    let wavelets = mother_wavelets::<P>(k);
    for l in 1..=level {
        let supports = 1usize << (l - 1);
        let s = P::one() / real::<P>(supports as f64);
        let scale = (real::<P>(2.0) / s).sqrt();
        let cells_per_support = n_cells / supports;
        for cc in 0..supports {
            let start = real::<P>(cc as f64) * s;
            let row0 = idx1d(l, cc as i32) as usize * k;
            for (j, coeffs) in wavelets.iter().enumerate() {
                for off in 0..cells_per_support {
                    let f = cc * cells_per_support + off;
                    let left = off < cells_per_support / 2;
                    let x0 = real::<P>(f as f64) * h;
                    for q in 0..k {
                        let x = x0 + h * (u[q] + P::one()) * half;
                        let u_supp = real::<P>(2.0) * (x - start) / s - P::one();
                        let t = if left {
                            real::<P>(2.0) * u_supp + P::one()
                        } else {
                            real::<P>(2.0) * u_supp - P::one()
                        };
                        let psi = eval_wavelet_piece(coeffs, k, left, t);
                        for i in 0..k {
                            let add = sqrt_h * half * w[q] * scale * psi * ell[(q, i)];
                            fmwt[(row0 + j, f * k + i)] = fmwt[(row0 + j, f * k + i)] + add;
                        }
                    }
                }
            }
        }
    }

    fmwt
}

/// Project a scalar function onto the multiwavelet basis of one dimension.
///
/// The function is first projected cell-by-cell onto the fine Legendre
/// basis by Gauss quadrature, then rotated into the hierarchical basis by
/// `fmwt`.
pub fn project_function<P: Scalar>(
    f: impl Fn(P) -> P + Sync,
    domain_min: P,
    domain_max: P,
    level: i32,
    degree: usize,
    fmwt: &Matrix<P>,
) -> Vector<P> {
    assert!(domain_min < domain_max);
    let k = degree;
    let n_cells = 1usize << level;
    assert_eq!(fmwt.nrows(), k * n_cells);

    let h = (domain_max - domain_min) / real::<P>(n_cells as f64);
    let half = real::<P>(0.5);
    let n_quad = k.max(PROJECTION_QUAD_MIN);
    let (u, w) = legendre_weights::<P>(n_quad, -P::one(), P::one());
    let (ell, _) = legendre_values(u.as_slice(), k);
    let sqrt_h = h.sqrt();

    let cell_block = |c: usize| -> Vec<P> {
        let x0 = domain_min + real::<P>(c as f64) * h;
        let mut block = vec![P::zero(); k];
        for q in 0..n_quad {
            let x = x0 + h * (u[q] + P::one()) * half;
            let fx = f(x);
            for (i, b) in block.iter_mut().enumerate() {
                *b = *b + sqrt_h * half * w[q] * fx * ell[(q, i)];
            }
        }
        block
    };

    #[cfg(feature = "parallel")]
    let blocks: Vec<Vec<P>> = (0..n_cells).into_par_iter().map(cell_block).collect();
    #[cfg(not(feature = "parallel"))]
    let blocks: Vec<Vec<P>> = (0..n_cells).map(cell_block).collect();

    let mut fine = Vector::zeros(k * n_cells);
    for (c, block) in blocks.iter().enumerate() {
        for (i, &v) in block.iter().enumerate() {
            fine[c * k + i] = v;
        }
    }

    fmwt * &fine
}

/// Combine per-dimension transformed vectors into the full sparse-grid
/// coefficient vector, one Kronecker block per table element.
///
/// Dimension 0 varies fastest within an element block; the batched apply
/// relies on the same layout.
pub fn combine_dimensions<P: Scalar>(
    degree: usize,
    table: &ElementTable,
    per_dim: &[Vector<P>],
    scale: P,
) -> Vector<P> {
    let num_dims = table.num_dims();
    assert_eq!(per_dim.len(), num_dims);
    let elem_size = degree.pow(num_dims as u32);
    let mut out = Vector::zeros(table.size() * elem_size);

    for e in 0..table.size() {
        let ids = table.indices_1d(e);
        for idx in 0..elem_size {
            let mut rem = idx;
            let mut prod = scale;
            for (d, &id) in ids.iter().enumerate() {
                let digit = rem % degree;
                rem /= degree;
                prod = prod * per_dim[d][id as usize * degree + digit];
            }
            out[e * elem_size + idx] = prod;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element_table::Grid;

    #[test]
    fn transform_is_orthogonal() {
        for degree in 1..=4 {
            for level in 0..=3 {
                let f = multiwavelet_transform::<f64>(level, degree);
                let prod = &f * &f.transpose();
                let n = f.nrows();
                assert!(
                    prod.approx_eq(&Matrix::identity(n), 1e-10),
                    "degree {degree} level {level}"
                );
            }
        }
    }

    #[test]
    fn transform_at_level_zero_is_identity() {
        let f = multiwavelet_transform::<f64>(0, 3);
        assert!(f.approx_eq(&Matrix::identity(3), 1e-12));
    }

    #[test]
    fn wavelets_are_orthonormal_and_kill_polynomials() {
        for degree in 1..=4 {
            let wavelets = mother_wavelets::<f64>(degree);
            assert_eq!(wavelets.len(), degree);
            for (a, wa) in wavelets.iter().enumerate() {
                for (b, wb) in wavelets.iter().enumerate() {
                    let d: f64 = wa.iter().zip(wb.iter()).map(|(x, y)| x * y).sum();
                    let expect = if a == b { 1.0 } else { 0.0 };
                    assert!((d - expect).abs() < 1e-12, "deg {degree} ({a},{b}): {d}");
                }
            }
            // vanishing moments: ∫ ψ x^m dx = 0 for m < degree
            let (u, w) = legendre_weights::<f64>(degree + 2, -1.0, 1.0);
            for wa in wavelets.iter() {
                for m in 0..degree {
                    let mut moment = 0.0;
                    for q in 0..u.len() {
                        // halves of [-1, 1]
                        let xl = (u[q] - 1.0) / 2.0;
                        let xr = (u[q] + 1.0) / 2.0;
                        moment += 0.5
                            * w[q]
                            * (eval_wavelet_piece(wa, degree, true, u[q]) * xl.powi(m as i32)
                                + eval_wavelet_piece(wa, degree, false, u[q]) * xr.powi(m as i32));
                    }
                    assert!(moment.abs() < 1e-10, "deg {degree} moment {m}: {moment}");
                }
            }
        }
    }

    #[test]
    fn projection_preserves_the_l2_norm() {
        // Parseval for f(x) = x on [-1, 1]: ∫ x² = 2/3
        let degree = 3;
        let level = 3;
        let fmwt = multiwavelet_transform::<f64>(level, degree);
        let coeffs = project_function(|x: f64| x, -1.0, 1.0, level, degree, &fmwt);
        let norm_sq = coeffs.dot(&coeffs);
        assert!((norm_sq - 2.0 / 3.0).abs() < 1e-12, "norm² {norm_sq}");
    }

    #[test]
    fn projection_of_smooth_function_converges() {
        let degree = 2;
        let f = |x: f64| (std::f64::consts::PI * x).sin();
        let exact_norm_sq = 1.0; // ∫_{-1}^{1} sin²(πx) dx
        let mut errs = Vec::new();
        for level in [2, 3, 4] {
            let fmwt = multiwavelet_transform::<f64>(level, degree);
            let coeffs = project_function(f, -1.0, 1.0, level, degree, &fmwt);
            errs.push((coeffs.dot(&coeffs) - exact_norm_sq).abs());
        }
        assert!(errs[2] < errs[1] && errs[1] < errs[0]);
    }

    #[test]
    fn combine_dimensions_builds_kron_blocks() {
        // 2D, degree 2, level 1 table; per-dim vectors with recognizable
        // entries so the fastest-varying dimension is observable.
        let table = ElementTable::new(1, 2, Grid::Sparse);
        let degree = 2;
        let v0 = Vector::from(vec![1.0_f64, 2.0, 3.0, 4.0]);
        let v1 = Vector::from(vec![10.0_f64, 20.0, 30.0, 40.0]);
        let out = combine_dimensions(degree, &table, &[v0, v1], 1.0);

        // element 0 is (levels (0,0), cells (0,0)): segment [0..2) each dim
        // block = [v0[0]·v1[0], v0[1]·v1[0], v0[0]·v1[1], v0[1]·v1[1]]
        assert_eq!(out[0], 10.0);
        assert_eq!(out[1], 20.0);
        assert_eq!(out[2], 20.0);
        assert_eq!(out[3], 40.0);
        assert_eq!(out.len(), table.size() * 4);
    }
}

//! 1D coefficient matrix assembly.
//!
//! Each (term, dimension) pair owns a matrix of side `degree * 2^level`
//! discretizing either multiplication by g (mass) or d/dx(g ·) (grad) on
//! the cell-local Legendre basis, with interface fluxes and boundary
//! handling for the grad kind. The raw cell-basis matrix is conjugated by
//! the forward multiwavelet transform so the apply path can window it by
//! 1D element indices.

use crate::lib_dispatch::{real, Scalar};
use crate::pde::{BoundaryCondition, CoefficientKind, Dimension, FluxType, PartialTerm};
use crate::quadrature::{legendre_values, legendre_weights};
use crate::tensor::Matrix;

/// Assemble the coefficient matrix of one partial term at time `t`.
pub fn generate_coefficients<P: Scalar>(
    dim: &Dimension<P>,
    pterm: &PartialTerm<P>,
    fmwt: &Matrix<P>,
    t: P,
) -> Matrix<P> {
    let k = dim.degree;
    let n_cells = 1usize << dim.level;
    let n = k * n_cells;
    let h = (dim.domain_max - dim.domain_min) / real::<P>(n_cells as f64);
    let half = real::<P>(0.5);

    let n_quad = k.max(10);
    let (u, w) = legendre_weights::<P>(n_quad, -P::one(), P::one());
    let (vals, ders) = legendre_values(u.as_slice(), k);
    // trace values at the cell edges
    let (edge, _) = legendre_values(&[-P::one(), P::one()], k);

    let mut raw = Matrix::zeros(n, n);

    for c in 0..n_cells {
        let x0 = dim.domain_min + real::<P>(c as f64) * h;

        // volume contribution
        for q in 0..n_quad {
            let x = x0 + h * (u[q] + P::one()) * half;
            let g = (pterm.g)(x, t);
            for i in 0..k {
                for j in 0..k {
                    let add = match pterm.kind {
                        // ∫ g ψ_i ψ_j over the cell
                        CoefficientKind::Mass => half * w[q] * g * vals[(q, i)] * vals[(q, j)],
                        // -∫ g ψ'_i ψ_j over the cell
                        CoefficientKind::Grad => {
                            -(w[q] * g * ders[(q, i)] * vals[(q, j)]) / h
                        }
                    };
                    raw[(c * k + i, c * k + j)] = raw[(c * k + i, c * k + j)] + add;
                }
            }
        }

        if pterm.kind == CoefficientKind::Mass {
            continue;
        }

        // interface fluxes of the grad kind: ψ_i(x_R) ĝf(x_R) - ψ_i(x_L) ĝf(x_L)
        let left_neighbor = if c > 0 {
            Some(c - 1)
        } else if pterm.left == BoundaryCondition::Periodic {
            Some(n_cells - 1)
        } else {
            None
        };
        let right_neighbor = if c + 1 < n_cells {
            Some(c + 1)
        } else if pterm.right == BoundaryCondition::Periodic {
            Some(0)
        } else {
            None
        };

        let x_left = x0;
        let x_right = x0 + h;
        let g_left = (pterm.g)(x_left, t);
        let g_right = (pterm.g)(x_right, t);

        // right interface of cell c: + (1/h) g [αL ψ_j(+1)|c + αR ψ_j(-1)|c+1] ψ_i(+1)
        {
            let (alpha_l, alpha_r) = flux_weights(pterm.flux, g_right, right_neighbor.is_some());
            for i in 0..k {
                for j in 0..k {
                    let test = edge[(1, i)];
                    let own = g_right * alpha_l * edge[(1, j)] * test / h;
                    raw[(c * k + i, c * k + j)] = raw[(c * k + i, c * k + j)] + own;
                    if let Some(cr) = right_neighbor {
                        let neigh = g_right * alpha_r * edge[(0, j)] * test / h;
                        raw[(c * k + i, cr * k + j)] = raw[(c * k + i, cr * k + j)] + neigh;
                    }
                }
            }
        }

        // left interface of cell c: - (1/h) g [αL ψ_j(+1)|c-1 + αR ψ_j(-1)|c] ψ_i(-1)
        {
            let (alpha_l, alpha_r) = flux_weights_left(pterm.flux, g_left, left_neighbor.is_some());
            for i in 0..k {
                for j in 0..k {
                    let test = edge[(0, i)];
                    let own = g_left * alpha_r * edge[(0, j)] * test / h;
                    raw[(c * k + i, c * k + j)] = raw[(c * k + i, c * k + j)] - own;
                    if let Some(cl) = left_neighbor {
                        let neigh = g_left * alpha_l * edge[(1, j)] * test / h;
                        raw[(c * k + i, cl * k + j)] = raw[(c * k + i, cl * k + j)] - neigh;
                    }
                }
            }
        }
    }

    // rotate into the multiwavelet basis: F raw Fᵀ
    let ft = fmwt.transpose();
    &(fmwt * &raw) * &ft
}

/// Interface weights (left-trace, right-trace) at a right interface.
///
/// Upwinding follows the sign of g there; `downwind` mirrors it. A missing
/// neighbor collapses the stencil onto the interior trace.
fn flux_weights<P: Scalar>(flux: FluxType, g: P, has_neighbor: bool) -> (P, P) {
    if !has_neighbor {
        return (P::one(), P::zero());
    }
    let half = real::<P>(0.5);
    match flux {
        FluxType::Central => (half, half),
        FluxType::Upwind => {
            if g >= P::zero() {
                (P::one(), P::zero())
            } else {
                (P::zero(), P::one())
            }
        }
        FluxType::Downwind => {
            if g >= P::zero() {
                (P::zero(), P::one())
            } else {
                (P::one(), P::zero())
            }
        }
    }
}

/// Interface weights at a left interface; the interior trace is the right
/// side there.
fn flux_weights_left<P: Scalar>(flux: FluxType, g: P, has_neighbor: bool) -> (P, P) {
    if !has_neighbor {
        return (P::zero(), P::one());
    }
    flux_weights(flux, g, true)
}

//! Legendre polynomials and Legendre-Gauss quadrature.
//!
//! Legendre polynomials P_n(x) are orthogonal on [-1, 1] with weight 1:
//! ∫_{-1}^{1} P_m(x) P_n(x) dx = 2/(2n+1) δ_{mn}

use crate::lib_dispatch::{real, Scalar};
use crate::tensor::{Matrix, Vector};

/// Evaluate Legendre polynomial P_n(x) using the three-term recurrence.
///
/// P_0(x) = 1,  P_1(x) = x,
/// (n+1) P_{n+1}(x) = (2n+1) x P_n(x) - n P_{n-1}(x)
pub fn legendre<P: Scalar>(n: usize, x: P) -> P {
    legendre_and_derivative(n, x).0
}

/// Evaluate the derivative P'_n(x).
pub fn legendre_derivative<P: Scalar>(n: usize, x: P) -> P {
    legendre_and_derivative(n, x).1
}

/// Evaluate both P_n(x) and P'_n(x) from one pass of the recurrence.
pub fn legendre_and_derivative<P: Scalar>(n: usize, x: P) -> (P, P) {
    if n == 0 {
        return (P::one(), P::zero());
    }
    if n == 1 {
        return (x, P::one());
    }

    let mut p_prev = P::one(); // P_{k-1}
    let mut p_curr = x; // P_k

    for k in 1..n {
        let kf = real::<P>(k as f64);
        let p_next = ((real::<P>(2.0) * kf + P::one()) * x * p_curr - kf * p_prev)
            / (kf + P::one());
        p_prev = p_curr;
        p_curr = p_next;
    }

    let boundary = real::<P>((n * (n + 1)) as f64) / real::<P>(2.0);
    let dp = if (x - P::one()).abs() < real::<P>(1e-12) {
        boundary
    } else if (x + P::one()).abs() < real::<P>(1e-12) {
        if n % 2 == 0 {
            -boundary
        } else {
            boundary
        }
    } else {
        // P'_n(x) = n (x P_n - P_{n-1}) / (x^2 - 1)
        real::<P>(n as f64) * (x * p_curr - p_prev) / (x * x - P::one())
    };

    (p_curr, dp)
}

/// Legendre-Gauss nodes and weights on `[a, b]`.
///
/// The `n` nodes are the roots of P_n, found by Newton iteration from the
/// Chebyshev-based initial guess; the rule is exact for polynomials of
/// degree 2n-1. Nodes are returned in ascending order.
pub fn legendre_weights<P: Scalar>(n: usize, a: P, b: P) -> (Vector<P>, Vector<P>) {
    assert!(n > 0);
    assert!(a < b);

    let mut nodes = Vector::zeros(n);
    let mut weights = Vector::zeros(n);
    let half = real::<P>(0.5);

    for i in 0..n {
        // x_i ≈ cos(π (i + 3/4) / (n + 1/2)), largest root first
        let theta = std::f64::consts::PI * (i as f64 + 0.75) / (n as f64 + 0.5);
        let mut x = real::<P>(theta.cos());

        let mut dp = P::one();
        for _ in 0..100 {
            let (p, d) = legendre_and_derivative(n, x);
            dp = d;
            let update = p / dp;
            x = x - update;
            if update.abs() <= P::epsilon() * x.abs().max(P::one()) {
                break;
            }
        }

        // w_i = (b - a) / ((1 - x^2) P'_n(x)^2)
        let w = (b - a) / ((P::one() - x * x) * dp * dp);
        // map from [-1, 1]; store ascending
        let mapped = (a * (P::one() - x) + b * (P::one() + x)) * half;
        nodes[n - 1 - i] = mapped;
        weights[n - 1 - i] = w;
    }

    (nodes, weights)
}

/// Normalized Legendre values and derivatives on a set of points.
///
/// Column i holds √((2i+1)/2) · P_i scaled by √2, the cell-local basis the
/// multiwavelet construction is built on. Rows whose point falls outside
/// [-1, 1] are zero.
pub fn legendre_values<P: Scalar>(points: &[P], degree: usize) -> (Matrix<P>, Matrix<P>) {
    let cols = degree.max(1);
    let mut vals = Matrix::zeros(points.len(), cols);
    let mut derivs = Matrix::zeros(points.len(), cols);

    for (r, &x) in points.iter().enumerate() {
        if x < -P::one() || x > P::one() {
            continue;
        }
        for i in 0..degree {
            // √((2i+1)/2) · √2 = √(2i+1)
            let norm = real::<P>((2 * i + 1) as f64).sqrt();
            let (p, dp) = legendre_and_derivative(i, x);
            vals[(r, i)] = norm * p;
            derivs[(r, i)] = norm * dp;
        }
    }
    (vals, derivs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legendre_values_match_closed_forms() {
        let x = 0.5_f64;
        assert!((legendre(0, x) - 1.0).abs() < 1e-14);
        assert!((legendre(1, x) - x).abs() < 1e-14);
        assert!((legendre(2, x) - (3.0 * x * x - 1.0) / 2.0).abs() < 1e-14);
        assert!((legendre(3, x) - (5.0 * x * x * x - 3.0 * x) / 2.0).abs() < 1e-14);
    }

    #[test]
    fn legendre_at_boundaries() {
        for n in 0..=6 {
            assert!((legendre(n, 1.0_f64) - 1.0).abs() < 1e-14);
            let expected = if n % 2 == 0 { 1.0 } else { -1.0 };
            assert!((legendre(n, -1.0_f64) - expected).abs() < 1e-14);
        }
    }

    #[test]
    fn derivative_at_boundaries() {
        for n in 0..=6 {
            let expected = (n * (n + 1)) as f64 / 2.0;
            assert!((legendre_derivative(n, 1.0_f64) - expected).abs() < 1e-12);
            let sign = if n % 2 == 0 { -1.0 } else { 1.0 };
            assert!((legendre_derivative(n, -1.0_f64) - sign * expected).abs() < 1e-12);
        }
    }

    #[test]
    fn weights_sum_to_interval_length() {
        // N = 5 on [-1, 1]: weights sum to 2
        let (_, w) = legendre_weights::<f64>(5, -1.0, 1.0);
        let sum: f64 = w.iter().sum();
        assert!((sum - 2.0).abs() < 1e-12, "sum {sum}");

        let (_, w) = legendre_weights::<f64>(4, 0.0, 3.0);
        let sum: f64 = w.iter().sum();
        assert!((sum - 3.0).abs() < 1e-12, "sum {sum}");
    }

    #[test]
    fn quadrature_integrates_odd_monomial_to_zero() {
        // x^{2N-1} integrates to zero on [-1, 1]
        let n = 5;
        let (x, w) = legendre_weights::<f64>(n, -1.0, 1.0);
        let integral: f64 = x
            .iter()
            .zip(w.iter())
            .map(|(&xi, &wi)| wi * xi.powi(2 * n as i32 - 1))
            .sum();
        assert!(integral.abs() < 1e-10, "integral {integral}");
    }

    #[test]
    fn quadrature_exactness_even_monomials() {
        // exact for degree <= 2N-1
        let n = 4;
        let (x, w) = legendre_weights::<f64>(n, -1.0, 1.0);
        for k in (0..2 * n).step_by(2) {
            let exact = 2.0 / (k + 1) as f64;
            let numeric: f64 = x
                .iter()
                .zip(w.iter())
                .map(|(&xi, &wi)| wi * xi.powi(k as i32))
                .sum();
            assert!((numeric - exact).abs() < 1e-12, "degree {k}: {numeric} vs {exact}");
        }
    }

    #[test]
    fn nodes_ascend_and_are_symmetric() {
        let (x, w) = legendre_weights::<f64>(6, -1.0, 1.0);
        for i in 1..6 {
            assert!(x[i] > x[i - 1]);
        }
        for i in 0..3 {
            assert!((x[i] + x[5 - i]).abs() < 1e-12);
            assert!((w[i] - w[5 - i]).abs() < 1e-12);
        }
    }

    #[test]
    fn normalized_values_vanish_outside_unit_interval() {
        let pts = [-1.5, 0.25, 2.0];
        let (vals, derivs) = legendre_values::<f64>(&pts, 3);
        for j in 0..3 {
            assert_eq!(vals[(0, j)], 0.0);
            assert_eq!(vals[(2, j)], 0.0);
            assert_eq!(derivs[(0, j)], 0.0);
        }
        // interior row carries √(2i+1) P_i(x)
        assert!((vals[(1, 0)] - 1.0).abs() < 1e-14);
        assert!((vals[(1, 1)] - 3.0_f64.sqrt() * 0.25).abs() < 1e-14);
    }

    #[test]
    fn normalized_basis_is_orthonormal_after_half_scaling() {
        // (1/2) Σ_q w_q L_i(u_q) L_j(u_q) = δ_ij for the √2-scaled basis
        let degree = 4;
        let (x, w) = legendre_weights::<f64>(degree, -1.0, 1.0);
        let (vals, _) = legendre_values::<f64>(x.as_slice(), degree);
        for i in 0..degree {
            for j in 0..degree {
                let s: f64 = (0..degree)
                    .map(|q| 0.5 * w[q] * vals[(q, i)] * vals[(q, j)])
                    .sum();
                let expect = if i == j { 1.0 } else { 0.0 };
                assert!((s - expect).abs() < 1e-12, "({i},{j}): {s}");
            }
        }
    }
}

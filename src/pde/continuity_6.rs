//! The 6D continuity equation: df/dt + v·grad(f) = sources with
//! v = {1, 1, 3, 4, 3, 2} over three spatial and three velocity-like
//! dimensions, periodic everywhere.
//!
//! Manufactured solution
//! f = cos(πx) sin(2πy) cos(2πz/3) cos(πvx/10) sin(πvy/10) cos(πvz/15) sin(2t).

use std::f64::consts::PI;

use super::{
    mass_identity, BoundaryCondition, CoefficientKind, Dimension, ExactSolution, FluxType,
    PartialTerm, Pde, Source, Term,
};
use crate::lib_dispatch::{real, Scalar};

const V: [f64; 6] = [1.0, 1.0, 3.0, 4.0, 3.0, 2.0];

fn initial_condition<P: Scalar>(_x: P) -> P {
    P::zero()
}

fn exact_dim0<P: Scalar>(x: P) -> P {
    (real::<P>(PI) * x).cos()
}

fn exact_dim1<P: Scalar>(y: P) -> P {
    (real::<P>(2.0 * PI) * y).sin()
}

fn exact_dim2<P: Scalar>(z: P) -> P {
    (real::<P>(2.0 * PI / 3.0) * z).cos()
}

fn exact_dim3<P: Scalar>(v: P) -> P {
    (real::<P>(PI / 10.0) * v).cos()
}

fn exact_dim4<P: Scalar>(v: P) -> P {
    (real::<P>(PI / 10.0) * v).sin()
}

fn exact_dim5<P: Scalar>(v: P) -> P {
    (real::<P>(PI / 15.0) * v).cos()
}

fn exact_time<P: Scalar>(t: P) -> P {
    (real::<P>(2.0) * t).sin()
}

// Derivative profiles of the per-dimension factors.

fn dx_dim0<P: Scalar>(x: P) -> P {
    (real::<P>(PI) * x).sin()
}

fn dx_dim1<P: Scalar>(y: P) -> P {
    (real::<P>(2.0 * PI) * y).cos()
}

fn dx_dim2<P: Scalar>(z: P) -> P {
    (real::<P>(2.0 * PI / 3.0) * z).sin()
}

fn dx_dim3<P: Scalar>(v: P) -> P {
    (real::<P>(PI / 10.0) * v).sin()
}

fn dx_dim4<P: Scalar>(v: P) -> P {
    (real::<P>(PI / 10.0) * v).cos()
}

fn dx_dim5<P: Scalar>(v: P) -> P {
    (real::<P>(PI / 15.0) * v).sin()
}

fn source_0_time<P: Scalar>(t: P) -> P {
    real::<P>(2.0) * (real::<P>(2.0) * t).cos()
}

// v_d times the derivative prefactor of dimension d, applied to sin(2t).
fn source_1_time<P: Scalar>(t: P) -> P {
    -real::<P>(V[0] * PI) * (real::<P>(2.0) * t).sin()
}

fn source_2_time<P: Scalar>(t: P) -> P {
    real::<P>(V[1] * 2.0 * PI) * (real::<P>(2.0) * t).sin()
}

fn source_3_time<P: Scalar>(t: P) -> P {
    -real::<P>(V[2] * 2.0 * PI / 3.0) * (real::<P>(2.0) * t).sin()
}

fn source_4_time<P: Scalar>(t: P) -> P {
    -real::<P>(V[3] * PI / 10.0) * (real::<P>(2.0) * t).sin()
}

fn source_5_time<P: Scalar>(t: P) -> P {
    real::<P>(V[4] * PI / 10.0) * (real::<P>(2.0) * t).sin()
}

fn source_6_time<P: Scalar>(t: P) -> P {
    -real::<P>(V[5] * PI / 15.0) * (real::<P>(2.0) * t).sin()
}

fn g_advect_0<P: Scalar>(_x: P, _t: P) -> P {
    -real::<P>(V[0])
}

fn g_advect_1<P: Scalar>(_x: P, _t: P) -> P {
    -real::<P>(V[1])
}

fn g_advect_2<P: Scalar>(_x: P, _t: P) -> P {
    -real::<P>(V[2])
}

fn g_advect_3<P: Scalar>(_x: P, _t: P) -> P {
    -real::<P>(V[3])
}

fn g_advect_4<P: Scalar>(_x: P, _t: P) -> P {
    -real::<P>(V[4])
}

fn g_advect_5<P: Scalar>(_x: P, _t: P) -> P {
    -real::<P>(V[5])
}

fn grad_partial<P: Scalar>(g: fn(P, P) -> P) -> PartialTerm<P> {
    PartialTerm {
        kind: CoefficientKind::Grad,
        g,
        flux: FluxType::Central,
        left: BoundaryCondition::Periodic,
        right: BoundaryCondition::Periodic,
    }
}

pub fn continuity_6<P: Scalar>(level: Option<i32>, degree: Option<usize>) -> Pde<P> {
    let lv = level.unwrap_or(2);
    let dg = degree.unwrap_or(2);

    let spans: [(f64, f64, &'static str); 6] = [
        (-1.0, 1.0, "x"),
        (-2.0, 2.0, "y"),
        (-3.0, 3.0, "z"),
        (-10.0, 10.0, "vx"),
        (-20.0, 20.0, "vy"),
        (-30.0, 30.0, "vz"),
    ];
    let dims: Vec<Dimension<P>> = spans
        .iter()
        .map(|&(lo, hi, name)| Dimension {
            domain_min: real::<P>(lo),
            domain_max: real::<P>(hi),
            level: lv,
            degree: dg,
            initial_condition: initial_condition,
            name,
        })
        .collect();

    let g_funcs: [fn(P, P) -> P; 6] = [
        g_advect_0, g_advect_1, g_advect_2, g_advect_3, g_advect_4, g_advect_5,
    ];
    let names = ["v_x.d_dx", "v_y.d_dy", "v_z.d_dz", "v_vx.d_dvx", "v_vy.d_dvy", "v_vz.d_dvz"];
    let terms: Vec<Term<P>> = (0..6)
        .map(|td| Term {
            name: names[td],
            partials: (0..6)
                .map(|d| {
                    if d == td {
                        grad_partial(g_funcs[td])
                    } else {
                        mass_identity()
                    }
                })
                .collect(),
        })
        .collect();

    let profiles: [fn(P) -> P; 6] = [
        exact_dim0, exact_dim1, exact_dim2, exact_dim3, exact_dim4, exact_dim5,
    ];
    let derivs: [fn(P) -> P; 6] = [dx_dim0, dx_dim1, dx_dim2, dx_dim3, dx_dim4, dx_dim5];
    let times: [fn(P) -> P; 7] = [
        source_0_time,
        source_1_time,
        source_2_time,
        source_3_time,
        source_4_time,
        source_5_time,
        source_6_time,
    ];

    // s_0 = f_t; s_{d+1} replaces dimension d's profile by its derivative.
    let mut sources = vec![Source {
        spatial: profiles.to_vec(),
        time: times[0],
    }];
    for d in 0..6 {
        let mut spatial = profiles.to_vec();
        spatial[d] = derivs[d];
        sources.push(Source {
            spatial,
            time: times[d + 1],
        });
    }

    let exact = ExactSolution {
        spatial: profiles.to_vec(),
        time: exact_time,
    };

    Pde::new(dims, terms, sources, Some(exact))
}

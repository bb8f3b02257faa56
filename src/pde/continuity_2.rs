//! The 2D continuity equation: df/dt = -df/dx - df/dy + sources.
//!
//! Manufactured solution f(x, y, t) = cos(πx) sin(2πy) sin(2t) on
//! [-1, 1] x [-2, 2], periodic in both directions.

use std::f64::consts::PI;

use super::{
    mass_identity, BoundaryCondition, CoefficientKind, Dimension, ExactSolution, FluxType,
    PartialTerm, Pde, Source, Term,
};
use crate::lib_dispatch::{real, Scalar};

fn initial_condition<P: Scalar>(_x: P) -> P {
    P::zero()
}

fn exact_dim0<P: Scalar>(x: P) -> P {
    (real::<P>(PI) * x).cos()
}

fn exact_dim1<P: Scalar>(y: P) -> P {
    (real::<P>(2.0 * PI) * y).sin()
}

fn exact_time<P: Scalar>(t: P) -> P {
    (real::<P>(2.0) * t).sin()
}

fn g_advect<P: Scalar>(_x: P, _t: P) -> P {
    -P::one()
}

fn grad_partial<P: Scalar>() -> PartialTerm<P> {
    PartialTerm {
        kind: CoefficientKind::Grad,
        g: g_advect,
        flux: FluxType::Central,
        left: BoundaryCondition::Periodic,
        right: BoundaryCondition::Periodic,
    }
}

// S = f_t + f_x + f_y

fn sin_pi_x<P: Scalar>(x: P) -> P {
    (real::<P>(PI) * x).sin()
}

fn cos_2pi_y<P: Scalar>(y: P) -> P {
    (real::<P>(2.0 * PI) * y).cos()
}

fn source_0_time<P: Scalar>(t: P) -> P {
    // f_t
    real::<P>(2.0) * (real::<P>(2.0) * t).cos()
}

fn source_1_time<P: Scalar>(t: P) -> P {
    // f_x carries -π sin(πx)
    -real::<P>(PI) * (real::<P>(2.0) * t).sin()
}

fn source_2_time<P: Scalar>(t: P) -> P {
    // f_y carries 2π cos(2πy)
    real::<P>(2.0 * PI) * (real::<P>(2.0) * t).sin()
}

pub fn continuity_2<P: Scalar>(level: Option<i32>, degree: Option<usize>) -> Pde<P> {
    let lv = level.unwrap_or(2);
    let dg = degree.unwrap_or(2);

    let dim0 = Dimension {
        domain_min: -P::one(),
        domain_max: P::one(),
        level: lv,
        degree: dg,
        initial_condition: initial_condition,
        name: "x",
    };
    let dim1 = Dimension {
        domain_min: real::<P>(-2.0),
        domain_max: real::<P>(2.0),
        level: lv,
        degree: dg,
        initial_condition: initial_condition,
        name: "y",
    };

    let term0 = Term {
        name: "v_x.d_dx",
        partials: vec![grad_partial(), mass_identity()],
    };
    let term1 = Term {
        name: "v_y.d_dy",
        partials: vec![mass_identity(), grad_partial()],
    };

    let sources = vec![
        Source {
            spatial: vec![exact_dim0::<P> as fn(P) -> P, exact_dim1::<P> as fn(P) -> P],
            time: source_0_time,
        },
        Source {
            spatial: vec![sin_pi_x::<P> as fn(P) -> P, exact_dim1::<P> as fn(P) -> P],
            time: source_1_time,
        },
        Source {
            spatial: vec![exact_dim0::<P> as fn(P) -> P, cos_2pi_y::<P> as fn(P) -> P],
            time: source_2_time,
        },
    ];

    let exact = ExactSolution {
        spatial: vec![exact_dim0::<P> as fn(P) -> P, exact_dim1::<P> as fn(P) -> P],
        time: exact_time,
    };

    Pde::new(vec![dim0, dim1], vec![term0, term1], sources, Some(exact))
}

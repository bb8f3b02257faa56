//! The 1D continuity equation: df/dt = -df/dx + sources.
//!
//! Manufactured solution f(x, t) = cos(2πx) sin(t) on x in [-1, 1] with
//! periodic boundaries.

use std::f64::consts::PI;

use super::{
    BoundaryCondition, CoefficientKind, Dimension, ExactSolution, FluxType, PartialTerm, Pde,
    Source, Term,
};
use crate::lib_dispatch::{real, Scalar};

fn initial_condition<P: Scalar>(_x: P) -> P {
    P::zero()
}

fn exact_dim0<P: Scalar>(x: P) -> P {
    (real::<P>(2.0 * PI) * x).cos()
}

fn exact_time<P: Scalar>(t: P) -> P {
    t.sin()
}

fn g_advect<P: Scalar>(_x: P, _t: P) -> P {
    -P::one()
}

// S = f_t + f_x = cos(2πx) cos(t) - 2π sin(2πx) sin(t)

fn source_0_dim0<P: Scalar>(x: P) -> P {
    (real::<P>(2.0 * PI) * x).cos()
}

fn source_0_time<P: Scalar>(t: P) -> P {
    t.cos()
}

fn source_1_dim0<P: Scalar>(x: P) -> P {
    (real::<P>(2.0 * PI) * x).sin()
}

fn source_1_time<P: Scalar>(t: P) -> P {
    -real::<P>(2.0 * PI) * t.sin()
}

pub fn continuity_1<P: Scalar>(level: Option<i32>, degree: Option<usize>) -> Pde<P> {
    let dim0 = Dimension {
        domain_min: -P::one(),
        domain_max: P::one(),
        level: level.unwrap_or(2),
        degree: degree.unwrap_or(2),
        initial_condition: initial_condition,
        name: "x",
    };

    let term0 = Term {
        name: "d_dx",
        partials: vec![PartialTerm {
            kind: CoefficientKind::Grad,
            g: g_advect,
            flux: FluxType::Central,
            left: BoundaryCondition::Periodic,
            right: BoundaryCondition::Periodic,
        }],
    };

    let sources = vec![
        Source {
            spatial: vec![source_0_dim0::<P> as fn(P) -> P],
            time: source_0_time,
        },
        Source {
            spatial: vec![source_1_dim0::<P> as fn(P) -> P],
            time: source_1_time,
        },
    ];

    let exact = ExactSolution {
        spatial: vec![exact_dim0::<P> as fn(P) -> P],
        time: exact_time,
    };

    Pde::new(vec![dim0], vec![term0], sources, Some(exact))
}

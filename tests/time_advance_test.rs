//! End-to-end time-advance tests against manufactured solutions.
//!
//! Errors are measured against the analytic solution projected into the
//! discrete basis, so they track the operator and time-stepping error, not
//! the projection error.

use sparse_dg::time_advance::{exact_solution_vector, initial_condition_vector};
use sparse_dg::{
    assign_elements, compute_dt, explicit_time_advance, make_pde, num_chunks, relative_l2_error,
    ElementTable, Grid, HostWorkspace, RankWorkspace, SourceVectors, StepMethod,
};

fn run_pde(
    name: &str,
    level: i32,
    degree: usize,
    dt: f64,
    num_steps: usize,
    method: StepMethod,
    force_chunks: Option<usize>,
) -> f64 {
    let pde = make_pde::<f64>(name, Some(level), Some(degree)).unwrap();
    let table = ElementTable::new(pde.max_level(), pde.num_dims(), Grid::Sparse);
    let chunk_count = force_chunks.unwrap_or_else(|| num_chunks(&table, &pde, 1024));
    let chunks = assign_elements(&table, chunk_count);

    let sources = SourceVectors::new(&pde, &table);
    let mut host = HostWorkspace::new(&pde, &table);
    let mut rank = RankWorkspace::new(&pde, &table, &chunks);
    host.x = initial_condition_vector(&pde, &table);

    let mut time = 0.0;
    for _ in 0..num_steps {
        explicit_time_advance(
            &pde, &table, &sources, &mut host, &mut rank, &chunks, time, dt, method,
        );
        std::mem::swap(&mut host.x, &mut host.fx);
        time += dt;
    }

    let exact = exact_solution_vector(&pde, &table, time).expect("analytic solution");
    relative_l2_error(&host.x, &exact)
}

#[test]
fn continuity_1_single_euler_step_tracks_the_manufactured_solution() {
    // one forward-Euler step of dt = 0.01 from the zero initial state
    let error = run_pde("continuity_1", 2, 2, 0.01, 1, StepMethod::ForwardEuler, None);
    assert!(error < 1e-3, "L2 error {error} at t = 0.01");
}

#[test]
fn continuity_1_converges_at_the_basis_order() {
    // degree 2: expect a slope of at least 1.9 across three refinements.
    // dt tracks h, so the phase error of space and time both scale as h².
    let degree = 2;
    let cfl = 0.15;
    let t_final = 0.15;

    let mut errors = Vec::new();
    for level in [4, 5, 6] {
        let h = 2.0 / f64::from(1u32 << level);
        let dt = cfl * h;
        let num_steps = (t_final / dt).round() as usize;
        let error = run_pde(
            "continuity_1",
            level,
            degree,
            dt,
            num_steps,
            StepMethod::SspRk3,
            None,
        );
        errors.push(error);
    }

    println!("continuity_1 degree-2 errors: {errors:?}");
    for window in errors.windows(2) {
        let slope = (window[0] / window[1]).log2();
        println!("observed order: {slope:.3}");
        assert!(
            slope >= degree as f64 - 0.1,
            "slope {slope} below {}",
            degree as f64 - 0.1
        );
    }
}

#[test]
fn continuity_3_sparse_table_and_ten_rk3_steps() {
    // the level-3 sparse enumeration over 3 dims has 20 level tuples
    let table = ElementTable::new(3, 3, Grid::Sparse);
    assert_eq!(table.num_level_tuples(), 20);
    assert_eq!(table.size(), 38);

    // ten RK3 steps at half the suggested dt stay finite
    let pde = make_pde::<f64>("continuity_3", Some(2), Some(3)).unwrap();
    let dt = compute_dt(&pde, 0.5);
    assert!((dt - 0.25).abs() < 1e-12); // finest cell width 0.5, cfl 0.5

    let table = ElementTable::new(pde.max_level(), pde.num_dims(), Grid::Sparse);
    let chunks = assign_elements(&table, num_chunks(&table, &pde, 1024));
    let sources = SourceVectors::new(&pde, &table);
    let mut host = HostWorkspace::new(&pde, &table);
    let mut rank = RankWorkspace::new(&pde, &table, &chunks);
    host.x = initial_condition_vector(&pde, &table);

    let mut time = 0.0;
    for _ in 0..10 {
        explicit_time_advance(
            &pde,
            &table,
            &sources,
            &mut host,
            &mut rank,
            &chunks,
            time,
            dt,
            StepMethod::SspRk3,
        );
        std::mem::swap(&mut host.x, &mut host.fx);
        time += dt;
    }
    assert!(host.x.all_finite());
    assert!(host.x.max_abs() > 0.0);
}

#[test]
fn chunked_and_unchunked_time_steps_agree() {
    let whole = run_pde("continuity_2", 2, 2, 0.01, 3, StepMethod::SspRk3, Some(1));
    let split = run_pde("continuity_2", 2, 2, 0.01, 3, StepMethod::SspRk3, Some(7));
    assert!(
        (whole - split).abs() < 1e-12,
        "chunking changed the step: {whole} vs {split}"
    );
}

//! Command-line driver: pick a PDE, discretize, advance in time, report.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, ValueEnum};

use sparse_dg::time_advance::{exact_solution_vector, initial_condition_vector};
use sparse_dg::{
    assign_elements, compute_dt, explicit_time_advance, io, make_pde, num_chunks,
    relative_l2_error, ElementTable, Grid, HostWorkspace, RankWorkspace, Scalar, SourceVectors,
    StepMethod,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GridOpt {
    Sparse,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PrecisionOpt {
    Float,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MethodOpt {
    Euler,
    Rk3,
}

#[derive(Debug, Parser)]
#[command(
    name = "sparse-dg",
    about = "Sparse-grid DG discretization and explicit time advance for separable linear PDEs."
)]
struct Opt {
    /// PDE to solve (e.g. continuity_1, continuity_2, continuity_3, continuity_6)
    #[arg(short, long, default_value = "continuity_1")]
    pde: String,

    /// Sparse-grid level; overrides every dimension's default
    #[arg(short, long)]
    level: Option<i32>,

    /// Basis functions per cell and dimension; overrides the default
    #[arg(short, long)]
    degree: Option<usize>,

    /// Grid admissibility rule
    #[arg(short, long, value_enum, default_value = "sparse")]
    grid: GridOpt,

    /// CFL factor applied to the PDE's suggested time step
    #[arg(short, long, default_value_t = 0.01)]
    cfl: f64,

    /// Number of time steps
    #[arg(short, long, default_value_t = 10)]
    num_steps: usize,

    /// Time integrator
    #[arg(short, long, value_enum, default_value = "rk3")]
    method: MethodOpt,

    /// Working precision
    #[arg(long, value_enum, default_value = "double")]
    precision: PrecisionOpt,

    /// Workspace memory budget in MB for the batched apply
    #[arg(long, default_value_t = 4096)]
    workspace_mb: usize,

    /// Directory for Octave-format solution dumps
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Dump the solution every N steps (0 disables dumps)
    #[arg(long, default_value_t = 0)]
    dump_interval: usize,
}

fn main() {
    let opt = Opt::parse();
    let result = match opt.precision {
        PrecisionOpt::Float => run::<f32>(&opt),
        PrecisionOpt::Double => run::<f64>(&opt),
    };
    if let Err(message) = result {
        eprintln!("error: {message}");
        std::process::exit(1);
    }
}

fn run<P: Scalar>(opt: &Opt) -> Result<(), String> {
    let pde = make_pde::<P>(&opt.pde, opt.level, opt.degree).map_err(|e| e.to_string())?;
    if opt.cfl <= 0.0 || opt.cfl > 1.0 {
        return Err(format!("invalid CFL {}: expected 0 < cfl <= 1", opt.cfl));
    }

    let grid = match opt.grid {
        GridOpt::Sparse => Grid::Sparse,
        GridOpt::Full => Grid::Full,
    };
    let method = match opt.method {
        MethodOpt::Euler => StepMethod::ForwardEuler,
        MethodOpt::Rk3 => StepMethod::SspRk3,
    };

    let table = ElementTable::new(pde.max_level(), pde.num_dims(), grid);
    let dof = table.size() * pde.elem_size();
    println!(
        "pde {} | dims {} terms {} | degree {} level {} | {} elements, {} dof",
        opt.pde,
        pde.num_dims(),
        pde.num_terms(),
        pde.degree(),
        pde.max_level(),
        table.size(),
        dof
    );

    let chunk_count = num_chunks(&table, &pde, opt.workspace_mb);
    let chunks = assign_elements(&table, chunk_count);
    println!("workspace budget {} MB -> {} chunk(s)", opt.workspace_mb, chunks.len());

    let sources = SourceVectors::new(&pde, &table);
    let mut host = HostWorkspace::new(&pde, &table);
    let mut rank = RankWorkspace::new(&pde, &table, &chunks);
    host.x = initial_condition_vector(&pde, &table);

    let dt = compute_dt(&pde, sparse_dg::lib_dispatch::real::<P>(opt.cfl));
    println!("dt = {dt:.6e}, {} step(s)", opt.num_steps);

    let started = Instant::now();
    let mut time = P::zero();
    for step in 0..opt.num_steps {
        explicit_time_advance(
            &pde, &table, &sources, &mut host, &mut rank, &chunks, time, dt, method,
        );
        std::mem::swap(&mut host.x, &mut host.fx);
        time = time + dt;

        if !host.x.all_finite() {
            return Err(format!("non-finite solution at step {}", step + 1));
        }

        println!(
            "step {:>4}/{} | t = {:.6e} | max |u| = {:.4e} | {} ms",
            step + 1,
            opt.num_steps,
            time,
            host.x.max_abs(),
            started.elapsed().as_millis()
        );

        if opt.dump_interval > 0 && (step + 1) % opt.dump_interval == 0 {
            if let Some(dir) = &opt.output_dir {
                let path = dir.join(format!("solution_step_{:06}.dat", step + 1));
                if let Err(e) = io::dump_vector(&host.x, &path) {
                    // dump failures are soft; the run continues
                    eprintln!("warning: could not write {}: {e}", path.display());
                }
            }
        }
    }

    if let Some(exact) = exact_solution_vector(&pde, &table, time) {
        let err = relative_l2_error(&host.x, &exact);
        println!("relative L2 error vs analytic solution at t = {time:.6e}: {err:.6e}");
    }

    if let Some(dir) = &opt.output_dir {
        let path = dir.join("solution_final.dat");
        if let Err(e) = io::dump_vector(&host.x, &path) {
            eprintln!("warning: could not write {}: {e}", path.display());
        }
    }

    Ok(())
}

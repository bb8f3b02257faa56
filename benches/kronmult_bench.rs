//! Benchmark the chunked Kronecker apply.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use sparse_dg::{
    apply_operator, assign_elements, make_pde, ElementTable, Grid, RankWorkspace, Vector,
};

fn bench_apply(c: &mut Criterion) {
    let pde = make_pde::<f64>("continuity_3", Some(3), Some(2)).unwrap();
    let table = ElementTable::new(pde.max_level(), pde.num_dims(), Grid::Sparse);
    let chunks = assign_elements(&table, 1);
    let mut ws = RankWorkspace::new(&pde, &table, &chunks);

    let n = table.size() * pde.elem_size();
    let mut x = Vector::zeros(n);
    for i in 0..n {
        x[i] = (0.1 * i as f64).sin();
    }
    let mut fx = Vector::zeros(n);

    c.bench_function("apply_continuity_3_level_3", |b| {
        b.iter(|| {
            apply_operator(&pde, &table, &chunks, &mut ws, black_box(&x), &mut fx);
            black_box(&fx);
        })
    });

    let chunked = assign_elements(&table, 8);
    let mut ws8 = RankWorkspace::new(&pde, &table, &chunked);
    c.bench_function("apply_continuity_3_level_3_8_chunks", |b| {
        b.iter(|| {
            apply_operator(&pde, &table, &chunked, &mut ws8, black_box(&x), &mut fx);
            black_box(&fx);
        })
    });
}

criterion_group!(benches, bench_apply);
criterion_main!(benches);

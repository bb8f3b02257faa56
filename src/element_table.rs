//! Sparse-grid element table.
//!
//! An element is a pair of level/cell multi-indices of length `num_dims`.
//! The table enumerates all admissible elements in a deterministic order
//! and provides the bidirectional mapping between an element's linear index
//! and its coordinates: `forward` is a hash lookup keyed on the element's
//! concatenated 1D indices, `inverse` is an ordered store.

use std::collections::HashMap;

/// Grid admissibility rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grid {
    /// Keep multi-indices with `Σ level ≤ max_level`.
    Sparse,
    /// Keep the full tensor product of per-dimension levels.
    Full,
}

/// 1D index of a (level, cell) pair within one dimension.
///
/// Level 0 holds a single cell; level l > 0 holds 2^(l-1) cells starting at
/// offset 2^(l-1).
pub fn idx1d(level: i32, cell: i32) -> i32 {
    debug_assert!(level >= 0);
    debug_assert!(cell >= 0 && cell < cells_in_level(level));
    cell + if level == 0 { 0 } else { 1 << (level - 1) }
}

/// Number of cells a single dimension holds at `level`.
pub fn cells_in_level(level: i32) -> i32 {
    if level == 0 {
        1
    } else {
        1 << (level - 1)
    }
}

#[derive(Debug, Clone)]
pub struct ElementTable {
    num_dims: usize,
    coords: Vec<(Vec<i32>, Vec<i32>)>,
    index_of: HashMap<Vec<i32>, usize>,
}

impl ElementTable {
    /// Enumerate all admissible elements.
    ///
    /// Level tuples are visited in lexicographic order (filtered by the grid
    /// rule), and within each level tuple the cell tuples are visited in
    /// lexicographic order, so the enumeration is stable across runs.
    pub fn new(max_level: i32, num_dims: usize, grid: Grid) -> Self {
        assert!(max_level >= 0);
        assert!(num_dims > 0);

        let mut coords = Vec::new();
        let mut levels = vec![0i32; num_dims];
        enumerate_levels(max_level, grid, &mut levels, 0, 0, &mut |lv| {
            let mut cells = vec![0i32; num_dims];
            enumerate_cells(lv, &mut cells, 0, &mut |cl| {
                coords.push((lv.to_vec(), cl.to_vec()));
            });
        });

        let mut index_of = HashMap::with_capacity(coords.len());
        for (i, (lv, cl)) in coords.iter().enumerate() {
            index_of.insert(hash_key(lv, cl), i);
        }

        Self {
            num_dims,
            coords,
            index_of,
        }
    }

    pub fn num_dims(&self) -> usize {
        self.num_dims
    }

    pub fn size(&self) -> usize {
        self.coords.len()
    }

    /// Linear index of an element, if admitted.
    pub fn forward(&self, levels: &[i32], cells: &[i32]) -> Option<usize> {
        assert_eq!(levels.len(), self.num_dims);
        assert_eq!(cells.len(), self.num_dims);
        self.index_of.get(&hash_key(levels, cells)).copied()
    }

    /// Level and cell coordinates of the element at `index`.
    pub fn inverse(&self, index: usize) -> (&[i32], &[i32]) {
        let (lv, cl) = &self.coords[index];
        (lv, cl)
    }

    /// Per-dimension 1D indices of the element at `index`.
    pub fn indices_1d(&self, index: usize) -> Vec<i32> {
        let (lv, cl) = self.inverse(index);
        lv.iter()
            .zip(cl.iter())
            .map(|(&l, &c)| idx1d(l, c))
            .collect()
    }

    /// Number of distinct level tuples in the table.
    pub fn num_level_tuples(&self) -> usize {
        let mut count = 0;
        let mut last: Option<&[i32]> = None;
        for (lv, _) in &self.coords {
            if last != Some(lv.as_slice()) {
                count += 1;
                last = Some(lv.as_slice());
            }
        }
        count
    }
}

fn hash_key(levels: &[i32], cells: &[i32]) -> Vec<i32> {
    levels
        .iter()
        .zip(cells.iter())
        .map(|(&l, &c)| idx1d(l, c))
        .collect()
}

fn enumerate_levels(
    max_level: i32,
    grid: Grid,
    levels: &mut [i32],
    dim: usize,
    used: i32,
    visit: &mut impl FnMut(&[i32]),
) {
    if dim == levels.len() {
        visit(levels);
        return;
    }
    let budget = match grid {
        Grid::Sparse => max_level - used,
        Grid::Full => max_level,
    };
    for l in 0..=budget {
        levels[dim] = l;
        enumerate_levels(max_level, grid, levels, dim + 1, used + l, visit);
    }
}

fn enumerate_cells(levels: &[i32], cells: &mut [i32], dim: usize, visit: &mut impl FnMut(&[i32])) {
    if dim == levels.len() {
        visit(cells);
        return;
    }
    for c in 0..cells_in_level(levels[dim]) {
        cells[dim] = c;
        enumerate_cells(levels, cells, dim + 1, visit);
    }
}

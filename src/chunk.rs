//! Work chunking for the element-coupling set.
//!
//! With full connectivity every row element couples to every column
//! element. A chunk maps a contiguous run of row elements to, per row, an
//! inclusive column range; chunks partition the row-major coupling sequence
//! so their concatenation covers every coupling exactly once. Chunk sizes
//! are driven by the workspace memory budget.

use std::collections::BTreeMap;

use crate::element_table::ElementTable;
use crate::lib_dispatch::Scalar;
use crate::pde::Pde;

/// Inclusive column range of one row inside a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub start: usize,
    pub stop: usize,
}

impl Limits {
    pub fn count(&self) -> usize {
        self.stop - self.start + 1
    }
}

/// Ordered map from row element to its column range.
pub type ElementChunk = BTreeMap<usize, Limits>;

/// Total couplings covered by a chunk.
pub fn num_couplings_in_chunk(chunk: &ElementChunk) -> usize {
    chunk.values().map(Limits::count).sum()
}

/// Widest per-row column range in a chunk.
pub fn max_connected_in_chunk(chunk: &ElementChunk) -> usize {
    chunk.values().map(Limits::count).max().unwrap_or(0)
}

/// Number of chunks needed to fit the per-chunk workspaces into
/// `rank_size_mb` megabytes.
///
/// Per coupling the workspaces hold `elem_size * num_terms` reduction
/// entries plus `min(D-1, 2)` intermediate copies of the same; the staged
/// input adds at most one copy of the solution vector.
pub fn num_chunks<P: Scalar>(table: &ElementTable, pde: &Pde<P>, rank_size_mb: usize) -> usize {
    assert!(rank_size_mb > 0);
    let elem_size = pde.elem_size();
    let num_workspaces = (pde.num_dims() - 1).min(2);
    let elem_bytes = std::mem::size_of::<P>();

    let n = table.size();
    let total_couplings = n * n;
    let per_coupling =
        elem_size * pde.num_terms() * (1 + num_workspaces) * elem_bytes;
    let input_bytes = n * elem_size * elem_bytes;
    let total = total_couplings * per_coupling + input_bytes;

    let budget = rank_size_mb * 1024 * 1024;
    let chunks = total.div_ceil(budget).max(1);
    chunks.min(total_couplings)
}

/// Split the row-major coupling sequence of the full connectivity set into
/// `num_chunks` contiguous pieces.
///
/// A split may fall inside a row, in which case the first/last rows of the
/// adjacent chunks carry partial column ranges; a single (row, column)
/// coupling is never divided.
pub fn assign_elements(table: &ElementTable, num_chunks: usize) -> Vec<ElementChunk> {
    assert!(num_chunks > 0);
    let n = table.size();
    let total = n * n;
    let per_chunk = total.div_ceil(num_chunks);

    let mut chunks = Vec::with_capacity(num_chunks);
    let mut next = 0usize;
    while next < total {
        let end = (next + per_chunk).min(total);
        let mut chunk = ElementChunk::new();
        let mut o = next;
        while o < end {
            let row = o / n;
            let start = o % n;
            let stop = (end.min((row + 1) * n) - 1) % n;
            chunk.insert(row, Limits { start, stop });
            o = row * n + stop + 1;
        }
        chunks.push(chunk);
        next = end;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element_table::Grid;
    use crate::pde::make_pde;

    fn coverage(chunks: &[ElementChunk], n: usize) -> Vec<usize> {
        let mut seen = vec![0usize; n * n];
        for chunk in chunks {
            for (&row, lim) in chunk {
                for col in lim.start..=lim.stop {
                    seen[row * n + col] += 1;
                }
            }
        }
        seen
    }

    #[test]
    fn chunks_cover_every_coupling_exactly_once() {
        let table = ElementTable::new(2, 2, Grid::Sparse);
        let n = table.size();
        for num in [1, 2, 3, 5, 7, n, 2 * n + 1] {
            let chunks = assign_elements(&table, num);
            let seen = coverage(&chunks, n);
            assert!(seen.iter().all(|&c| c == 1), "num_chunks = {num}");
        }
    }

    #[test]
    fn split_mid_row_keeps_contiguous_ranges() {
        let table = ElementTable::new(1, 1, Grid::Sparse); // 2 elements
        let chunks = assign_elements(&table, 3);
        // 4 couplings into chunks of 2: rows split across chunk boundaries
        assert_eq!(chunks.len(), 2);
        assert_eq!(num_couplings_in_chunk(&chunks[0]), 2);
        assert_eq!(num_couplings_in_chunk(&chunks[1]), 2);
    }

    #[test]
    fn chunk_count_tracks_the_budget() {
        let pde = make_pde::<f64>("continuity_2", Some(3), Some(2)).unwrap();
        let table = ElementTable::new(3, 2, Grid::Sparse);
        let one_chunk = num_chunks(&table, &pde, 4096);
        assert_eq!(one_chunk, 1);
        let many = num_chunks(&table, &pde, 1);
        assert!(many >= one_chunk);
        // never more chunks than couplings
        assert!(many <= table.size() * table.size());
    }

    #[test]
    fn max_connected_reflects_partial_rows() {
        let table = ElementTable::new(2, 1, Grid::Sparse); // 4 elements
        let chunks = assign_elements(&table, 16);
        for chunk in &chunks {
            assert_eq!(max_connected_in_chunk(chunk), 1);
        }
    }
}

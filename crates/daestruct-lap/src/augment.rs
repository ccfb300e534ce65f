use log::trace;

use crate::heap::IndexedHeap;
use crate::matrix::{Cost, CostMatrix};
use crate::solver::LapError;

/// Where a column stands in the current shortest-path search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnState {
    /// Not reached yet
    Unvisited,
    /// Has a tentative distance and an entry in the queue
    Frontier,
    /// Distance is final and equal to the current minimum; owner row not yet relaxed
    Scan,
    /// Owner row has been relaxed
    Ready,
}

/// End point of a successful search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Terminus {
    /// Unassigned column closing the path
    pub col: usize,
    /// Distance of the last frontier level that was popped
    pub min: Cost,
}

/// Scratch state for augmenting-path searches.
///
/// Allocated once per solve and [`reset`](Workspace::reset) before every
/// search from a new free row.
#[derive(Debug, Clone)]
pub(crate) struct Workspace {
    dist: Vec<Cost>,
    pred: Vec<usize>,
    state: Vec<ColumnState>,
    /// Columns whose owner row has been relaxed, in relax order
    ready: Vec<usize>,
    /// Columns at the current minimum distance, with their owner row
    scan: Vec<(usize, usize)>,
    queue: IndexedHeap,
}

impl Workspace {
    pub fn new(dimension: usize) -> Self {
        Self {
            dist: vec![0; dimension],
            pred: vec![0; dimension],
            state: vec![ColumnState::Unvisited; dimension],
            ready: Vec::with_capacity(dimension),
            scan: Vec::with_capacity(dimension),
            queue: IndexedHeap::with_capacity(dimension),
        }
    }

    pub fn reset(&mut self, start: usize) {
        self.state.fill(ColumnState::Unvisited);
        self.pred.fill(start);
        self.ready.clear();
        self.scan.clear();
        self.queue.clear();
    }

    /// Find a shortest alternating path from the free row `start` to an
    /// unassigned column, measured in reduced costs `cost(i, j) - v[j]`.
    ///
    /// On success the workspace holds the distances and predecessors needed
    /// by [`Workspace::augment`].
    pub fn find_terminus<M: CostMatrix>(
        &mut self,
        matrix: &M,
        start: usize,
        v: &[Cost],
        colsol: &[Option<usize>],
    ) -> Result<Terminus, LapError> {
        self.reset(start);

        for (j, c) in matrix.row(start) {
            self.dist[j] = c - v[j];
            self.state[j] = ColumnState::Frontier;
            self.queue.push_or_decrease(j, self.dist[j]);
        }

        let mut min: Cost = 0;
        loop {
            if self.scan.is_empty() {
                min = self.next_level().ok_or(LapError::Infeasible { row: start })?;
                if let Some(col) = self.take_level(min, colsol) {
                    return Ok(Terminus { col, min });
                }
            }

            let Some((j1, i)) = self.scan.pop() else {
                continue;
            };
            self.state[j1] = ColumnState::Ready;
            self.ready.push(j1);

            let h = matrix
                .cost(i, j1)
                .ok_or(LapError::MissingAssignedEdge { row: i, col: j1 })?
                - v[j1];

            for (j, c) in matrix.row(i) {
                let state = self.state[j];
                if matches!(state, ColumnState::Scan | ColumnState::Ready) {
                    continue;
                }

                let reduced = c - v[j] - h;
                let candidate = min + reduced;
                if state == ColumnState::Frontier && candidate >= self.dist[j] {
                    continue;
                }

                self.dist[j] = candidate;
                self.pred[j] = i;

                if reduced == 0 {
                    match colsol[j] {
                        None => return Ok(Terminus { col: j, min }),
                        Some(owner) => {
                            // Any queue entry left behind is skipped by next_level
                            self.state[j] = ColumnState::Scan;
                            self.scan.push((j, owner));
                        }
                    }
                } else {
                    self.state[j] = ColumnState::Frontier;
                    self.queue.push_or_decrease(j, candidate);
                }
            }
        }
    }

    /// Distance of the closest live frontier column, discarding stale entries
    fn next_level(&mut self) -> Option<Cost> {
        while let Some((key, j)) = self.queue.peek() {
            if self.state[j] == ColumnState::Frontier {
                return Some(key);
            }
            self.queue.pop();
        }
        None
    }

    /// Move every frontier column at distance `min` onto the scan list.
    ///
    /// Returns early with an unassigned column if one is found.
    fn take_level(&mut self, min: Cost, colsol: &[Option<usize>]) -> Option<usize> {
        while let Some((key, j)) = self.queue.peek() {
            if key != min {
                break;
            }
            self.queue.pop();
            if self.state[j] != ColumnState::Frontier {
                continue;
            }
            match colsol[j] {
                None => return Some(j),
                Some(owner) => {
                    self.state[j] = ColumnState::Scan;
                    self.scan.push((j, owner));
                }
            }
        }
        None
    }

    /// Apply the path found by [`Workspace::find_terminus`]: update the
    /// prices of relaxed columns, then flip the path back to `start`.
    pub fn augment(
        &self,
        start: usize,
        terminus: Terminus,
        v: &mut [Cost],
        rowsol: &mut [Option<usize>],
        colsol: &mut [Option<usize>],
    ) {
        for &j in &self.ready {
            v[j] += self.dist[j] - terminus.min;
        }

        let mut j = terminus.col;
        let mut length = 0;
        loop {
            let i = self.pred[j];
            colsol[j] = Some(i);
            let previous = rowsol[i].replace(j);
            length += 1;
            match previous {
                Some(next) if i != start => j = next,
                _ => break,
            }
        }

        trace!("augmented row {} to column {} along {} edges", start, terminus.col, length);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::SparseMatrix;

    #[test]
    fn test_direct_free_column() {
        // Row 0 ties between columns 0 and 1; only column 1 is free
        let m = SparseMatrix::from_dense(&[
            vec![Some(1), Some(3)],
            vec![Some(1), None],
        ])
        .unwrap();
        let mut v = vec![1, 3];
        let mut rowsol = vec![None, Some(0)];
        let mut colsol = vec![Some(1), None];

        let mut ws = Workspace::new(2);
        let terminus = ws.find_terminus(&m, 0, &v, &colsol).unwrap();
        assert_eq!(terminus.col, 1);
        ws.augment(0, terminus, &mut v, &mut rowsol, &mut colsol);

        assert_eq!(rowsol, vec![Some(1), Some(0)]);
        assert_eq!(colsol, vec![Some(1), Some(0)]);
    }

    #[test]
    fn test_path_through_assigned_row() {
        // Row 1 is free and only reaches column 0, which row 0 holds.
        // Row 0 must move over to column 1.
        let m = SparseMatrix::from_dense(&[
            vec![Some(0), Some(5)],
            vec![Some(0), None],
        ])
        .unwrap();
        let mut v = vec![0, 5];
        let mut rowsol = vec![Some(0), None];
        let mut colsol = vec![Some(0), None];

        let mut ws = Workspace::new(2);
        let terminus = ws.find_terminus(&m, 1, &v, &colsol).unwrap();
        assert_eq!(terminus.col, 1);
        ws.augment(1, terminus, &mut v, &mut rowsol, &mut colsol);

        assert_eq!(rowsol, vec![Some(1), Some(0)]);
        assert_eq!(colsol, vec![Some(1), Some(0)]);
        // Only column 0 was relaxed, at distance equal to the final minimum
        assert_eq!(v, vec![0, 5]);
    }

    #[test]
    fn test_price_update_keeps_reduced_costs_nonnegative() {
        let m = SparseMatrix::from_dense(&[
            vec![Some(2), Some(4), Some(9)],
            vec![Some(1), Some(8), Some(3)],
            vec![Some(5), Some(6), Some(7)],
        ])
        .unwrap();
        let mut v = vec![1, 4, 3];
        let mut rowsol = vec![Some(1), Some(0), None];
        let mut colsol = vec![Some(1), Some(0), None];

        let mut ws = Workspace::new(3);
        let terminus = ws.find_terminus(&m, 2, &v, &colsol).unwrap();
        ws.augment(2, terminus, &mut v, &mut rowsol, &mut colsol);

        for i in 0..3 {
            let j = rowsol[i].unwrap();
            assert_eq!(colsol[j], Some(i));
            let u = m.cost(i, j).unwrap() - v[j];
            for (k, c) in m.row(i) {
                assert!(c - u - v[k] >= 0, "negative reduced cost at ({}, {})", i, k);
            }
        }
    }

    #[test]
    fn test_exhausted_search_is_infeasible() {
        // Both rows only reach column 0
        let m = SparseMatrix::from_dense(&[
            vec![Some(1), None],
            vec![Some(2), None],
        ])
        .unwrap();
        let v = vec![1, 0];
        let colsol = vec![Some(0), None];

        let mut ws = Workspace::new(2);
        let err = ws.find_terminus(&m, 1, &v, &colsol).unwrap_err();
        assert_eq!(err, LapError::Infeasible { row: 1 });
    }

    #[test]
    fn test_workspace_is_reusable() {
        let m = SparseMatrix::from_dense(&[
            vec![Some(1), None],
            vec![Some(2), None],
        ])
        .unwrap();
        let mut ws = Workspace::new(2);
        let colsol = vec![Some(0), None];
        assert!(ws.find_terminus(&m, 1, &[1, 0], &colsol).is_err());

        // A fresh search after a failed one must not see stale state
        let colsol = vec![None, None];
        let terminus = ws.find_terminus(&m, 1, &[1, 0], &colsol).unwrap();
        assert_eq!(terminus, Terminus { col: 0, min: 1 });
    }
}

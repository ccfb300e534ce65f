use thiserror::Error;

/// Integer edge cost
pub type Cost = i64;

/// Internal stand-in for an absent edge.
///
/// Only used inside the solver where an `Option` would cost a branch in the
/// hot loop (e.g. "no second-best column yet"). Finite costs are bounded by
/// [`max_cost_magnitude`] so that no reachable path sum comes near it.
pub const UNREACHABLE: Cost = Cost::MAX / 4;

/// Largest dual magnitude accepted from a prior solution.
///
/// Path sums during re-optimization stay below [`Cost::MAX`] as long as
/// prior prices and finite costs respect their bounds.
pub const MAX_DUAL_MAGNITUDE: Cost = UNREACHABLE / 4;

/// Largest finite cost magnitude accepted for an `n`-dimensional problem.
pub fn max_cost_magnitude(dimension: usize) -> Cost {
    let n = Cost::try_from(dimension).unwrap_or(Cost::MAX / 8);
    UNREACHABLE / (4 * (n.saturating_add(1)))
}

/// Read-only view of a square, sparse cost matrix.
///
/// Absent edges have infinite cost and are reported as `None` by [`CostMatrix::cost`].
pub trait CostMatrix {
    /// Number of rows (and columns)
    fn dimension(&self) -> usize;

    /// Cost of edge `(row, col)`, or `None` if the edge is absent
    fn cost(&self, row: usize, col: usize) -> Option<Cost>;

    /// Present edges of `row` as `(column, cost)`, in a stable order
    fn row(&self, row: usize) -> impl Iterator<Item = (usize, Cost)> + '_;

    /// Row with the smallest cost in `col`, or `None` if the column is empty
    fn min_cost_row(&self, col: usize) -> Option<usize>;

    /// Rows with at least one present edge
    fn rows(&self) -> impl Iterator<Item = usize> + '_;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatrixError {
    #[error("Entry ({row}, {col}) is outside a {dimension}x{dimension} matrix")]
    OutOfBounds { row: usize, col: usize, dimension: usize },
    #[error("Duplicate entry ({row}, {col})")]
    DuplicateEntry { row: usize, col: usize },
    #[error("Dense matrix row {row} has {found} columns, expected {expected}")]
    RaggedRow { row: usize, expected: usize, found: usize },
}

/// A single present edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Entry {
    pub row: usize,
    pub col: usize,
    pub cost: Cost,
}

/// Square sparse matrix stored as row and column adjacency lists.
///
/// Rows are kept sorted by column index so that [`CostMatrix::row`] always
/// enumerates in the same order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseMatrix {
    rows: Vec<Vec<(usize, Cost)>>,
    cols: Vec<Vec<(usize, Cost)>>,
}

impl SparseMatrix {
    pub fn new(dimension: usize) -> Self {
        Self {
            rows: vec![Vec::new(); dimension],
            cols: vec![Vec::new(); dimension],
        }
    }

    /// Build from a list of edges; duplicates are rejected
    pub fn from_entries(dimension: usize, entries: impl IntoIterator<Item = Entry>) -> Result<Self, MatrixError> {
        let mut matrix = Self::new(dimension);
        for Entry { row, col, cost } in entries {
            if matrix.insert(row, col, cost)?.is_some() {
                return Err(MatrixError::DuplicateEntry { row, col });
            }
        }
        Ok(matrix)
    }

    /// Build from a dense table where `None` marks an absent edge
    pub fn from_dense(table: &[Vec<Option<Cost>>]) -> Result<Self, MatrixError> {
        let n = table.len();
        let mut matrix = Self::new(n);
        for (i, row) in table.iter().enumerate() {
            if row.len() != n {
                return Err(MatrixError::RaggedRow { row: i, expected: n, found: row.len() });
            }
            for (j, cost) in row.iter().enumerate() {
                if let Some(c) = cost {
                    matrix.insert(i, j, *c)?;
                }
            }
        }
        Ok(matrix)
    }

    /// Set the cost of `(row, col)`, returning the previous cost if the edge existed
    pub fn set(&mut self, row: usize, col: usize, cost: Cost) -> Result<Option<Cost>, MatrixError> {
        self.insert(row, col, cost)
    }

    /// Remove edge `(row, col)`, returning its cost if it existed
    pub fn remove(&mut self, row: usize, col: usize) -> Option<Cost> {
        let r = self.rows.get_mut(row)?;
        let pos = r.binary_search_by_key(&col, |&(j, _)| j).ok()?;
        let (_, cost) = r.remove(pos);
        let c = &mut self.cols[col];
        if let Ok(pos) = c.binary_search_by_key(&row, |&(i, _)| i) {
            c.remove(pos);
        }
        Some(cost)
    }

    pub fn num_entries(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    pub fn entries(&self) -> impl Iterator<Item = Entry> + '_ {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(row, r)| r.iter().map(move |&(col, cost)| Entry { row, col, cost }))
    }

    fn insert(&mut self, row: usize, col: usize, cost: Cost) -> Result<Option<Cost>, MatrixError> {
        let dimension = self.rows.len();
        if row >= dimension || col >= dimension {
            return Err(MatrixError::OutOfBounds { row, col, dimension });
        }

        let r = &mut self.rows[row];
        let previous = match r.binary_search_by_key(&col, |&(j, _)| j) {
            Ok(pos) => Some(std::mem::replace(&mut r[pos].1, cost)),
            Err(pos) => {
                r.insert(pos, (col, cost));
                None
            }
        };

        let c = &mut self.cols[col];
        match c.binary_search_by_key(&row, |&(i, _)| i) {
            Ok(pos) => c[pos].1 = cost,
            Err(pos) => c.insert(pos, (row, cost)),
        }

        Ok(previous)
    }
}

impl CostMatrix for SparseMatrix {
    fn dimension(&self) -> usize {
        self.rows.len()
    }

    fn cost(&self, row: usize, col: usize) -> Option<Cost> {
        let r = self.rows.get(row)?;
        r.binary_search_by_key(&col, |&(j, _)| j).ok().map(|pos| r[pos].1)
    }

    fn row(&self, row: usize) -> impl Iterator<Item = (usize, Cost)> + '_ {
        self.rows.get(row).into_iter().flatten().copied()
    }

    fn min_cost_row(&self, col: usize) -> Option<usize> {
        // Column lists are sorted by row, so min_by_key keeps the lowest row on ties
        self.cols
            .get(col)?
            .iter()
            .min_by_key(|&&(_, cost)| cost)
            .map(|&(row, _)| row)
    }

    fn rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.is_empty())
            .map(|(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SparseMatrix {
        SparseMatrix::from_dense(&[
            vec![Some(4), None, Some(1)],
            vec![Some(2), Some(2), None],
            vec![None, None, None],
        ])
        .unwrap()
    }

    #[test]
    fn test_cost_lookup() {
        let m = sample();
        assert_eq!(m.dimension(), 3);
        assert_eq!(m.cost(0, 0), Some(4));
        assert_eq!(m.cost(0, 1), None);
        assert_eq!(m.cost(1, 1), Some(2));
        assert_eq!(m.cost(5, 0), None);
        assert_eq!(m.num_entries(), 4);
    }

    #[test]
    fn test_row_iteration_is_sorted() {
        let mut m = SparseMatrix::new(4);
        m.set(0, 3, 7).unwrap();
        m.set(0, 1, 5).unwrap();
        m.set(0, 2, 6).unwrap();
        let row: Vec<_> = m.row(0).collect();
        assert_eq!(row, vec![(1, 5), (2, 6), (3, 7)]);
        // Restartable
        assert_eq!(m.row(0).count(), 3);
    }

    #[test]
    fn test_rows_skips_empty() {
        let m = sample();
        let rows: Vec<_> = m.rows().collect();
        assert_eq!(rows, vec![0, 1]);
    }

    #[test]
    fn test_min_cost_row_ties_take_lowest_row() {
        let m = SparseMatrix::from_dense(&[
            vec![Some(3), Some(1)],
            vec![Some(3), Some(0)],
        ])
        .unwrap();
        assert_eq!(m.min_cost_row(0), Some(0));
        assert_eq!(m.min_cost_row(1), Some(1));
    }

    #[test]
    fn test_min_cost_row_empty_column() {
        let m = sample();
        assert_eq!(m.min_cost_row(1), Some(1));
        let empty = SparseMatrix::new(2);
        assert_eq!(empty.min_cost_row(0), None);
    }

    #[test]
    fn test_set_and_remove_keep_views_in_sync() {
        let mut m = sample();
        assert_eq!(m.set(0, 0, 9).unwrap(), Some(4));
        assert_eq!(m.cost(0, 0), Some(9));
        assert_eq!(m.min_cost_row(0), Some(1));

        assert_eq!(m.remove(1, 0), Some(2));
        assert_eq!(m.remove(1, 0), None);
        assert_eq!(m.cost(1, 0), None);
        assert_eq!(m.min_cost_row(0), Some(0));
    }

    #[test]
    fn test_from_entries_rejects_bad_input() {
        let dup = SparseMatrix::from_entries(
            2,
            [Entry { row: 0, col: 0, cost: 1 }, Entry { row: 0, col: 0, cost: 2 }],
        );
        assert_eq!(dup, Err(MatrixError::DuplicateEntry { row: 0, col: 0 }));

        let oob = SparseMatrix::from_entries(2, [Entry { row: 0, col: 2, cost: 1 }]);
        assert!(matches!(oob, Err(MatrixError::OutOfBounds { col: 2, .. })));

        let ragged = SparseMatrix::from_dense(&[vec![Some(1), None], vec![Some(1)]]);
        assert!(matches!(ragged, Err(MatrixError::RaggedRow { row: 1, .. })));
    }

    #[test]
    fn test_entries_round_trip() {
        let m = sample();
        let rebuilt = SparseMatrix::from_entries(3, m.entries()).unwrap();
        assert_eq!(rebuilt, m);
    }

    #[test]
    fn test_max_cost_magnitude_has_headroom() {
        let n = 1000;
        let limit = max_cost_magnitude(n);
        assert!(limit > 0);
        // Sum of 2n worst-case terms still stays below the sentinel
        assert!(limit * 2 * (n as Cost + 1) < UNREACHABLE);
    }
}

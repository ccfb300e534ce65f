use std::fmt;

use crate::matrix::{Cost, CostMatrix};

/// The result of solving an assignment problem
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Solution {
    /// Sum of the assigned edge costs
    pub cost: Cost,
    /// Column assigned to each row
    pub rowsol: Vec<Option<usize>>,
    /// Row assigned to each column
    pub colsol: Vec<Option<usize>>,
    /// Row duals
    pub u: Vec<Cost>,
    /// Column duals
    pub v: Vec<Cost>,
}

/// A way in which a solution fails to certify optimality
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Vectors do not match the matrix dimension
    WrongDimension { expected: usize },
    /// Row has no column, or its column does not point back to it
    Unmatched { row: usize },
    /// Column is not the assignment of any row
    UnusedColumn { col: usize },
    /// Assignment uses an edge that is absent from the matrix
    AbsentEdge { row: usize, col: usize },
    /// `cost(i, j) - u[i] - v[j] < 0`
    NegativeReducedCost { row: usize, col: usize, reduced: Cost },
    /// `cost(i, j) - u[i] - v[j]` does not fit in a [`Cost`]
    DualOutOfRange { row: usize, col: usize },
    /// Assigned edge with non-zero reduced cost
    SlackAssignment { row: usize, col: usize, reduced: Cost },
    /// Reported cost differs from the sum of assigned edges
    CostMismatch { reported: Cost, actual: Cost },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::WrongDimension { expected } => write!(f, "solution vectors do not have length {}", expected),
            Violation::Unmatched { row } => write!(f, "row {} is not matched", row),
            Violation::UnusedColumn { col } => write!(f, "column {} is not matched", col),
            Violation::AbsentEdge { row, col } => write!(f, "row {} is assigned to absent edge ({}, {})", row, row, col),
            Violation::NegativeReducedCost { row, col, reduced } => {
                write!(f, "edge ({}, {}) has negative reduced cost {}", row, col, reduced)
            }
            Violation::DualOutOfRange { row, col } => {
                write!(f, "reduced cost of edge ({}, {}) overflows", row, col)
            }
            Violation::SlackAssignment { row, col, reduced } => {
                write!(f, "assigned edge ({}, {}) has reduced cost {} instead of 0", row, col, reduced)
            }
            Violation::CostMismatch { reported, actual } => {
                write!(f, "reported cost {} but assigned edges sum to {}", reported, actual)
            }
        }
    }
}

impl Solution {
    pub fn dimension(&self) -> usize {
        self.rowsol.len()
    }

    /// Assigned `(row, column)` pairs in row order
    pub fn assignment(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rowsol.iter().enumerate().filter_map(|(i, j)| j.map(|j| (i, j)))
    }

    /// `cost - u[row] - v[col]`, or `None` if the edge is absent or the
    /// difference overflows
    pub fn reduced_cost<M: CostMatrix>(&self, matrix: &M, row: usize, col: usize) -> Option<Cost> {
        matrix.cost(row, col)?.checked_sub(self.u[row])?.checked_sub(self.v[col])
    }

    /// Check that this solution is a perfect matching certified optimal by
    /// its duals. Returns every violation found; empty means optimal.
    pub fn violations<M: CostMatrix>(&self, matrix: &M) -> Vec<Violation> {
        let n = matrix.dimension();
        let mut violations = Vec::new();

        if self.dimension() != n || self.colsol.len() != n || self.u.len() != n || self.v.len() != n {
            return vec![Violation::WrongDimension { expected: n }];
        }

        let mut actual: Cost = 0;
        for i in 0..n {
            match self.rowsol[i] {
                Some(j) if j < n && self.colsol[j] == Some(i) => match matrix.cost(i, j) {
                    Some(c) => actual = actual.saturating_add(c),
                    None => violations.push(Violation::AbsentEdge { row: i, col: j }),
                },
                _ => violations.push(Violation::Unmatched { row: i }),
            }
        }
        for j in 0..n {
            let used = self.colsol[j].is_some_and(|i| i < n && self.rowsol[i] == Some(j));
            if !used {
                violations.push(Violation::UnusedColumn { col: j });
            }
        }

        for i in 0..n {
            for (j, c) in matrix.row(i) {
                let Some(reduced) = c.checked_sub(self.u[i]).and_then(|r| r.checked_sub(self.v[j])) else {
                    violations.push(Violation::DualOutOfRange { row: i, col: j });
                    continue;
                };
                if reduced < 0 {
                    violations.push(Violation::NegativeReducedCost { row: i, col: j, reduced });
                } else if reduced != 0 && self.rowsol[i] == Some(j) {
                    violations.push(Violation::SlackAssignment { row: i, col: j, reduced });
                }
            }
        }

        if actual != self.cost {
            violations.push(Violation::CostMismatch { reported: self.cost, actual });
        }

        violations
    }

    pub fn is_optimal<M: CostMatrix>(&self, matrix: &M) -> bool {
        self.violations(matrix).is_empty()
    }
}

struct Slots<'a>(&'a [Option<usize>]);

impl fmt::Display for Slots<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (k, slot) in self.0.iter().enumerate() {
            if k > 0 {
                write!(f, ", ")?;
            }
            match slot {
                Some(x) => write!(f, "{}", x)?,
                None => write!(f, "-")?,
            }
        }
        write!(f, "]")
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "solution {{ cost={}, rowsol={}, colsol={}, u={:?}, v={:?} }}",
            self.cost,
            Slots(&self.rowsol),
            Slots(&self.colsol),
            self.u,
            self.v
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::SparseMatrix;

    fn matrix() -> SparseMatrix {
        SparseMatrix::from_dense(&[
            vec![Some(4), Some(1)],
            vec![Some(2), None],
        ])
        .unwrap()
    }

    fn optimal() -> Solution {
        Solution {
            cost: 3,
            rowsol: vec![Some(1), Some(0)],
            colsol: vec![Some(1), Some(0)],
            u: vec![0, 0],
            v: vec![2, 1],
        }
    }

    #[test]
    fn test_optimal_has_no_violations() {
        let m = matrix();
        let s = optimal();
        assert!(s.violations(&m).is_empty());
        assert!(s.is_optimal(&m));
        assert_eq!(s.assignment().collect::<Vec<_>>(), vec![(0, 1), (1, 0)]);
        assert_eq!(s.reduced_cost(&m, 0, 0), Some(2));
        assert_eq!(s.reduced_cost(&m, 1, 1), None);
    }

    #[test]
    fn test_detects_negative_reduced_cost() {
        let m = matrix();
        let mut s = optimal();
        s.v[0] = 5;
        let violations = s.violations(&m);
        assert!(violations.contains(&Violation::NegativeReducedCost { row: 0, col: 0, reduced: -1 }));
        assert!(violations.contains(&Violation::NegativeReducedCost { row: 1, col: 0, reduced: -3 }));
    }

    #[test]
    fn test_detects_slack_and_cost_mismatch() {
        let m = matrix();
        let mut s = optimal();
        s.u[1] = -1;
        s.cost = 7;
        let violations = s.violations(&m);
        assert!(violations.contains(&Violation::SlackAssignment { row: 1, col: 0, reduced: 1 }));
        assert!(violations.contains(&Violation::CostMismatch { reported: 7, actual: 3 }));
    }

    #[test]
    fn test_detects_broken_matching() {
        let m = matrix();
        let mut s = optimal();
        s.colsol[0] = None;
        let violations = s.violations(&m);
        assert!(violations.contains(&Violation::Unmatched { row: 1 }));
        assert!(violations.contains(&Violation::UnusedColumn { col: 0 }));
    }

    #[test]
    fn test_detects_wrong_dimension() {
        let m = matrix();
        let mut s = optimal();
        s.u.pop();
        assert_eq!(s.violations(&m), vec![Violation::WrongDimension { expected: 2 }]);
    }

    #[test]
    fn test_detects_overflowing_duals() {
        let m = matrix();
        let mut s = optimal();
        s.u[0] = Cost::MIN;
        assert_eq!(s.dimension(), 2);
        assert_eq!(s.reduced_cost(&m, 0, 0), None);
        let violations = s.violations(&m);
        assert!(violations.contains(&Violation::DualOutOfRange { row: 0, col: 0 }));
        assert!(violations.contains(&Violation::DualOutOfRange { row: 0, col: 1 }));
        assert!(!s.is_optimal(&m));
    }

    #[test]
    fn test_display() {
        let mut s = optimal();
        s.rowsol[1] = None;
        assert_eq!(
            s.to_string(),
            "solution { cost=3, rowsol=[1, -], colsol=[1, 0], u=[0, 0], v=[2, 1] }"
        );
        assert_eq!(
            Violation::CostMismatch { reported: 1, actual: 2 }.to_string(),
            "reported cost 1 but assigned edges sum to 2"
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_value(optimal()).unwrap();
        assert_eq!(json["cost"], 3);
        assert_eq!(json["rowsol"], serde_json::json!([1, 0]));
        let back: Solution = serde_json::from_value(json).unwrap();
        assert_eq!(back, optimal());
    }
}

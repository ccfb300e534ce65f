use log::debug;
use thiserror::Error;

use crate::augment::Workspace;
use crate::matrix::{max_cost_magnitude, Cost, CostMatrix, MAX_DUAL_MAGNITUDE, UNREACHABLE};
use crate::reduction::{initial_reduction, AUGMENTING_ROW_REDUCTION_PASSES};
use crate::solution::Solution;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LapError {
    #[error("Row {row} has no finite-cost edge")]
    EmptyRow { row: usize },
    #[error("Column {col} has no finite-cost edge")]
    EmptyColumn { col: usize },
    #[error("Cost {cost} at ({row}, {col}) exceeds the supported magnitude {limit}")]
    CostOutOfRange { row: usize, col: usize, cost: Cost, limit: Cost },
    #[error("No perfect matching exists: no augmenting path from row {row}")]
    Infeasible { row: usize },
    #[error("Prior {what} has length {found}, expected {expected}")]
    DimensionMismatch { what: &'static str, expected: usize, found: usize },
    #[error("Prior {what}[{index}] = {value} exceeds the supported magnitude {limit}")]
    PriorOutOfRange { what: &'static str, index: usize, value: Cost, limit: Cost },
    #[error("Prior assignment is inconsistent at row {row}, column {col}")]
    InconsistentAssignment { row: usize, col: usize },
    #[error("Row {row} is assigned to column {col} but the edge is absent")]
    MissingAssignedEdge { row: usize, col: usize },
}

/// Mutable assignment and column prices shared by all phases of one solve
#[derive(Debug, Clone)]
pub(crate) struct State {
    pub v: Vec<Cost>,
    pub rowsol: Vec<Option<usize>>,
    pub colsol: Vec<Option<usize>>,
}

impl State {
    pub fn new(dimension: usize) -> Self {
        Self {
            v: vec![0; dimension],
            rowsol: vec![None; dimension],
            colsol: vec![None; dimension],
        }
    }
}

/// Jonker-Volgenant solver for sparse square assignment problems
#[derive(Debug, Clone)]
pub struct Solver {
    /// Augmenting row reduction passes during initial reduction
    reduction_passes: usize,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            reduction_passes: AUGMENTING_ROW_REDUCTION_PASSES,
        }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reduction_passes(mut self, passes: usize) -> Self {
        self.reduction_passes = passes;
        self
    }

    /// Find a minimum-cost perfect matching of `matrix`
    pub fn solve<M: CostMatrix>(&self, matrix: &M) -> Result<Solution, LapError> {
        validate(matrix)?;

        let n = matrix.dimension();
        let mut state = State::new(n);
        let free = initial_reduction(matrix, &mut state, self.reduction_passes)?;
        debug!("initial reduction left {} of {} rows unassigned", free.len(), n);

        augment_free_rows(matrix, &mut state, &free)?;
        assemble(matrix, state)
    }

    /// Re-optimize a prior solution after `matrix` has been perturbed.
    ///
    /// The caller unassigns every row whose edges changed (`rowsol[i] = None`
    /// together with its column). Assigned columns keep their prices; prices
    /// of unassigned columns are rebuilt from the prior row duals, and only
    /// the unassigned rows are augmented.
    pub fn solve_delta<M: CostMatrix>(
        &self,
        matrix: &M,
        u: &[Cost],
        v: &[Cost],
        rowsol: &[Option<usize>],
        colsol: &[Option<usize>],
    ) -> Result<Solution, LapError> {
        validate(matrix)?;

        let n = matrix.dimension();
        for (what, found) in [("u", u.len()), ("v", v.len()), ("rowsol", rowsol.len()), ("colsol", colsol.len())] {
            if found != n {
                return Err(LapError::DimensionMismatch { what, expected: n, found });
            }
        }
        check_prior_duals("u", u)?;
        check_prior_duals("v", v)?;
        check_prior_assignment(matrix, rowsol, colsol)?;

        let mut state = State {
            v: v.to_vec(),
            rowsol: rowsol.to_vec(),
            colsol: colsol.to_vec(),
        };
        for j in 0..n {
            if state.colsol[j].is_none() {
                state.v[j] = (0..n)
                    .filter_map(|i| matrix.cost(i, j).map(|c| c - u[i]))
                    .min()
                    .ok_or(LapError::EmptyColumn { col: j })?;
            }
        }

        let free: Vec<usize> = (0..n).filter(|&i| state.rowsol[i].is_none()).collect();
        debug!("delta re-optimization over {} of {} rows", free.len(), n);

        augment_free_rows(matrix, &mut state, &free)?;
        assemble(matrix, state)
    }

    /// [`Solver::solve_delta`] starting from a previous [`Solution`]
    pub fn resolve<M: CostMatrix>(&self, matrix: &M, prior: &Solution) -> Result<Solution, LapError> {
        self.solve_delta(matrix, &prior.u, &prior.v, &prior.rowsol, &prior.colsol)
    }
}

/// Solve with default settings
pub fn lap<M: CostMatrix>(matrix: &M) -> Result<Solution, LapError> {
    Solver::new().solve(matrix)
}

/// Delta re-optimization with default settings
pub fn delta_lap<M: CostMatrix>(
    matrix: &M,
    u: &[Cost],
    v: &[Cost],
    rowsol: &[Option<usize>],
    colsol: &[Option<usize>],
) -> Result<Solution, LapError> {
    Solver::new().solve_delta(matrix, u, v, rowsol, colsol)
}

/// Every row and column needs a finite edge, and costs must leave headroom
/// below [`UNREACHABLE`] for path sums.
fn validate<M: CostMatrix>(matrix: &M) -> Result<(), LapError> {
    let n = matrix.dimension();
    let limit = max_cost_magnitude(n);
    debug_assert!(limit < UNREACHABLE);

    let mut covered = vec![false; n];
    for i in 0..n {
        let mut empty = true;
        for (j, cost) in matrix.row(i) {
            if cost.unsigned_abs() > limit.unsigned_abs() {
                return Err(LapError::CostOutOfRange { row: i, col: j, cost, limit });
            }
            empty = false;
            if let Some(seen) = covered.get_mut(j) {
                *seen = true;
            }
        }
        if empty {
            return Err(LapError::EmptyRow { row: i });
        }
    }

    match covered.iter().position(|&seen| !seen) {
        Some(col) => Err(LapError::EmptyColumn { col }),
        None => Ok(()),
    }
}

fn check_prior_duals(what: &'static str, duals: &[Cost]) -> Result<(), LapError> {
    match duals.iter().position(|d| d.unsigned_abs() > MAX_DUAL_MAGNITUDE.unsigned_abs()) {
        Some(index) => Err(LapError::PriorOutOfRange {
            what,
            index,
            value: duals[index],
            limit: MAX_DUAL_MAGNITUDE,
        }),
        None => Ok(()),
    }
}

fn check_prior_assignment<M: CostMatrix>(
    matrix: &M,
    rowsol: &[Option<usize>],
    colsol: &[Option<usize>],
) -> Result<(), LapError> {
    for (i, &assigned) in rowsol.iter().enumerate() {
        let Some(j) = assigned else { continue };
        if colsol.get(j).copied().flatten() != Some(i) {
            return Err(LapError::InconsistentAssignment { row: i, col: j });
        }
        if matrix.cost(i, j).is_none() {
            return Err(LapError::MissingAssignedEdge { row: i, col: j });
        }
    }
    for (j, &assigned) in colsol.iter().enumerate() {
        let Some(i) = assigned else { continue };
        if rowsol.get(i).copied().flatten() != Some(j) {
            return Err(LapError::InconsistentAssignment { row: i, col: j });
        }
    }
    Ok(())
}

fn augment_free_rows<M: CostMatrix>(matrix: &M, state: &mut State, free: &[usize]) -> Result<(), LapError> {
    let mut workspace = Workspace::new(matrix.dimension());
    for &row in free {
        let terminus = workspace.find_terminus(matrix, row, &state.v, &state.colsol)?;
        workspace.augment(row, terminus, &mut state.v, &mut state.rowsol, &mut state.colsol);
    }
    Ok(())
}

/// Derive the row duals and total cost from a complete assignment
fn assemble<M: CostMatrix>(matrix: &M, state: State) -> Result<Solution, LapError> {
    let n = matrix.dimension();
    let mut u = vec![0; n];
    let mut cost = 0;

    for (i, assigned) in state.rowsol.iter().enumerate() {
        let j = assigned.ok_or(LapError::Infeasible { row: i })?;
        let c = matrix.cost(i, j).ok_or(LapError::MissingAssignedEdge { row: i, col: j })?;
        u[i] = c - state.v[j];
        cost += c;
    }

    Ok(Solution {
        cost,
        rowsol: state.rowsol,
        colsol: state.colsol,
        u,
        v: state.v,
    })
}

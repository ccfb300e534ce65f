//! Sparse linear assignment solver using the Jonker-Volgenant shortest
//! augmenting path method, with delta re-optimization for structural
//! analysis of DAE systems.

mod augment;
mod heap;
mod matrix;
mod reduction;
mod solution;
mod solver;

pub use matrix::{max_cost_magnitude, Cost, MAX_DUAL_MAGNITUDE, CostMatrix, Entry, MatrixError, SparseMatrix, UNREACHABLE};
pub use reduction::AUGMENTING_ROW_REDUCTION_PASSES;
pub use solution::{Solution, Violation};
pub use solver::{delta_lap, lap, LapError, Solver};

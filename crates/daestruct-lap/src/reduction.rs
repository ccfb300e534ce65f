//! Initial reduction: column reduction, reduction transfer and augmenting
//! row reduction. Together they assign most rows cheaply and leave a short
//! list of free rows for the augmenting path engine.

use crate::matrix::{Cost, CostMatrix, UNREACHABLE};
use crate::solver::{LapError, State};

/// Number of augmenting row reduction passes.
///
/// Heuristic value from Jonker and Volgenant (1987), not a convergence bound.
pub const AUGMENTING_ROW_REDUCTION_PASSES: usize = 2;

/// Run all three phases, returning the rows still free afterwards
pub(crate) fn initial_reduction<M: CostMatrix>(
    matrix: &M,
    state: &mut State,
    passes: usize,
) -> Result<Vec<usize>, LapError> {
    let claims = column_reduction(matrix, state)?;
    let mut free = reduction_transfer(matrix, state, &claims);
    for _ in 0..passes {
        free = augmenting_row_reduction(matrix, state, free)?;
    }
    Ok(free)
}

/// Set `v[j]` to the column minimum and tentatively assign each column to
/// its cheapest row, unless an earlier column already claimed that row.
///
/// Columns are scanned from last to first. Returns the claim count per row.
pub(crate) fn column_reduction<M: CostMatrix>(matrix: &M, state: &mut State) -> Result<Vec<u32>, LapError> {
    let mut claims = vec![0u32; matrix.dimension()];

    for j in (0..matrix.dimension()).rev() {
        let imin = matrix.min_cost_row(j).ok_or(LapError::EmptyColumn { col: j })?;
        state.v[j] = matrix.cost(imin, j).ok_or(LapError::EmptyColumn { col: j })?;

        claims[imin] += 1;
        if claims[imin] == 1 {
            state.rowsol[imin] = Some(j);
            state.colsol[j] = Some(imin);
        } else {
            state.colsol[j] = None;
        }
    }

    Ok(claims)
}

/// Move reduction from singly-claimed rows onto their column and collect
/// the unclaimed rows as the initial free list.
pub(crate) fn reduction_transfer<M: CostMatrix>(matrix: &M, state: &mut State, claims: &[u32]) -> Vec<usize> {
    let mut free = Vec::new();

    for i in matrix.rows() {
        match claims[i] {
            0 => free.push(i),
            1 => {
                let Some(j1) = state.rowsol[i] else { continue };
                let min = matrix
                    .row(i)
                    .filter(|&(j, _)| j != j1)
                    .map(|(j, c)| c - state.v[j])
                    .min()
                    .unwrap_or(UNREACHABLE);
                // A row with a single edge has nothing to transfer
                if min < UNREACHABLE {
                    state.v[j1] -= min;
                }
            }
            _ => {}
        }
    }

    free
}

/// One pass of augmenting row reduction over `free`.
///
/// Each row takes its cheapest column. If the best reduced cost is strictly
/// below the second best, the column price drops by the gap and a displaced
/// owner is retried immediately; otherwise the row tries the second-best
/// column and a displaced owner waits for the next pass. Returns the rows
/// left free.
///
/// At most `dimension` immediate retries happen per pass. Rows competing for
/// too few columns would otherwise keep outbidding each other forever; past
/// the limit a displaced owner waits for the next pass like a tie would.
pub(crate) fn augmenting_row_reduction<M: CostMatrix>(
    matrix: &M,
    state: &mut State,
    free: Vec<usize>,
) -> Result<Vec<usize>, LapError> {
    let mut still_free = Vec::new();
    let mut pending = free.into_iter();
    let mut retry = None;
    let mut retries_left = matrix.dimension();

    loop {
        let Some(i) = retry.take().or_else(|| pending.next()) else {
            break;
        };

        let (umin, j1, usubmin, j2) = two_smallest(matrix, &state.v, i)?;

        let mut target = j1;
        let mut i0 = state.colsol[j1];
        let tightened = j2.is_some() && umin < usubmin;
        if tightened {
            state.v[j1] -= usubmin - umin;
        } else if let (Some(j2), Some(_)) = (j2, i0) {
            // Tie with an assigned best column: the second best may be free
            target = j2;
            i0 = state.colsol[j2];
        }

        if let Some(prev) = i0 {
            state.rowsol[prev] = None;
        }
        state.rowsol[i] = Some(target);
        state.colsol[target] = Some(i);

        if let Some(prev) = i0 {
            if tightened && retries_left > 0 {
                retries_left -= 1;
                retry = Some(prev);
            } else {
                still_free.push(prev);
            }
        }
    }

    Ok(still_free)
}

/// Smallest and second smallest reduced cost in row `i`, as
/// `(umin, j1, usubmin, j2)`. `usubmin` is [`UNREACHABLE`] when the row has
/// a single edge.
fn two_smallest<M: CostMatrix>(
    matrix: &M,
    v: &[Cost],
    i: usize,
) -> Result<(Cost, usize, Cost, Option<usize>), LapError> {
    let mut edges = matrix.row(i);
    let (mut j1, c) = edges.next().ok_or(LapError::EmptyRow { row: i })?;
    let mut umin = c - v[j1];
    let mut usubmin = UNREACHABLE;
    let mut j2 = None;

    for (j, c) in edges {
        let h = c - v[j];
        if h < usubmin {
            if h >= umin {
                usubmin = h;
                j2 = Some(j);
            } else {
                usubmin = umin;
                umin = h;
                j2 = Some(j1);
                j1 = j;
            }
        }
    }

    Ok((umin, j1, usubmin, j2))
}

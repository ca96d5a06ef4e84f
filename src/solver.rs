//! Exact solvers for the square assignment problem.

use std::ops::{AddAssign, SubAssign};

use nalgebra::DMatrix;

use crate::permutation;
use crate::{Error, Result};

/// A perfect matching of rows to columns and its total cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Matching {
    /// `perm[i]` is the column (target) matched to row (source) `i`.
    pub perm: Vec<usize>,
    pub weight: f64,
}

impl Matching {
    /// Builds a matching from `perm`, summing its costs out of `costs`.
    pub fn from_perm(perm: Vec<usize>, costs: &DMatrix<f64>) -> Result<Self> {
        let (rows, cols) = costs.shape();
        if rows != cols {
            return Err(Error::DimensionMismatch { rows, cols });
        }
        if perm.len() != rows || !permutation::is_permutation(&perm) {
            return Err(Error::NotAPermutation { len: rows, perm });
        }
        let weight = perm
            .iter()
            .enumerate()
            .map(|(row, &col)| costs[(row, col)])
            .sum();
        Ok(Self { perm, weight })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Objective {
    Minimize,
    #[default]
    Maximize,
}

/// A strategy that finds a minimum-cost perfect matching.
pub trait Solver {
    /// Returns `perm` with `perm[row]` the column assigned to `row`.
    fn assign(&self, costs: &DMatrix<f64>) -> Result<Vec<usize>>;
}

/// Munkres' star-and-prime formulation of the Hungarian algorithm.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hungarian;

impl Solver for Hungarian {
    fn assign(&self, costs: &DMatrix<f64>) -> Result<Vec<usize>> {
        munkres(&mut costs.clone())
    }
}

/// Tries every permutation in lexicographic order, keeping the first best.
///
/// Factorial time: only sensible for tiny matrices.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exhaustive;

impl Solver for Exhaustive {
    fn assign(&self, costs: &DMatrix<f64>) -> Result<Vec<usize>> {
        let (rows, cols) = costs.shape();
        if rows != cols {
            return Err(Error::DimensionMismatch { rows, cols });
        }
        let cost_of = |perm: &[usize]| -> f64 {
            perm.iter()
                .enumerate()
                .map(|(row, &col)| costs[(row, col)])
                .sum()
        };
        let mut perm: Vec<usize> = (0..rows).collect();
        let mut best = perm.clone();
        let mut best_cost = cost_of(&perm);
        while next_permutation(&mut perm) {
            let cost = cost_of(&perm);
            if cost < best_cost {
                best_cost = cost;
                best.copy_from_slice(&perm);
            }
        }
        Ok(best)
    }
}

fn next_permutation(perm: &mut [usize]) -> bool {
    let Some(pivot) = perm.windows(2).rposition(|w| w[0] < w[1]) else {
        return false;
    };
    let successor = perm
        .iter()
        .rposition(|&v| v > perm[pivot])
        .expect("a larger element follows the pivot");
    perm.swap(pivot, successor);
    perm[pivot + 1..].reverse();
    true
}

/// Solves `costs` with `solver` towards `objective`.
///
/// The reported weight is always summed from `costs` as given, never negated.
pub fn solve<S>(solver: &S, costs: &DMatrix<f64>, objective: Objective) -> Result<Matching>
where
    S: Solver + ?Sized,
{
    let (rows, cols) = costs.shape();
    if rows != cols {
        return Err(Error::DimensionMismatch { rows, cols });
    }
    let perm = match objective {
        Objective::Minimize => solver.assign(costs)?,
        Objective::Maximize => solver.assign(&-costs)?,
    };
    Matching::from_perm(perm, costs)
}

/// Maximizes every score matrix in `batch`, returning hard permutation matrices.
pub fn batch_matching(batch: &[DMatrix<f64>]) -> Result<Vec<DMatrix<f64>>> {
    batch
        .iter()
        .map(|scores| {
            let matching = solve(&Hungarian, scores, Objective::Maximize)?;
            Ok(permutation::to_matrix(&matching.perm))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Star,
    Prime,
}

#[derive(Debug, Clone, Copy)]
struct Marked {
    row: usize,
    col: usize,
    mark: Mark,
}

/// Minimum-cost assignment on a square matrix, reducing `costs` in place.
pub fn munkres<T>(costs: &mut DMatrix<T>) -> Result<Vec<usize>>
where
    T: nalgebra::Scalar
        + Copy
        + PartialOrd
        + num_traits::Zero
        + num_traits::Bounded
        + SubAssign
        + AddAssign,
{
    let (rows, cols) = costs.shape();
    if rows != cols {
        return Err(Error::DimensionMismatch { rows, cols });
    }
    let n = rows;
    let mut covered_rows = vec![false; n];
    let mut covered_cols = vec![false; n];

    for mut row in costs.row_iter_mut() {
        let min = smallest(row.iter().copied());
        row.iter_mut().for_each(|v| *v -= min);
    }
    for mut col in costs.column_iter_mut() {
        let min = smallest(col.iter().copied());
        col.iter_mut().for_each(|v| *v -= min);
    }

    // star one zero per column, never two in the same row
    let mut marks: Vec<Marked> = Vec::with_capacity(n);
    for col in 0..n {
        for row in 0..n {
            if marks.iter().any(|m| m.row == row) {
                continue;
            }
            if costs[(row, col)].is_zero() {
                covered_cols[col] = true;
                marks.push(Marked {
                    row,
                    col,
                    mark: Mark::Star,
                });
                break;
            }
        }
    }

    loop {
        if let Some((row, col)) = uncovered_zero(costs, &covered_rows, &covered_cols) {
            let starred = marks
                .iter()
                .find(|m| m.mark == Mark::Star && m.row == row)
                .map(|m| m.col);
            match starred {
                Some(star_col) => {
                    covered_cols[star_col] = false;
                    covered_rows[row] = true;
                    marks.push(Marked {
                        row,
                        col,
                        mark: Mark::Prime,
                    });
                }
                None => {
                    augment(&mut marks, row, col);
                    covered_rows.fill(false);
                    covered_cols.fill(false);
                    for m in &marks {
                        covered_cols[m.col] = true;
                    }
                }
            }
            continue;
        }

        if marks.iter().filter(|m| m.mark == Mark::Star).count() == n {
            break;
        }

        let min = smallest(uncovered(&covered_rows, &covered_cols).map(|idx| costs[idx]));

        // net effect of lowering uncovered rows and raising covered columns
        for col in 0..n {
            for row in 0..n {
                match (covered_rows[row], covered_cols[col]) {
                    (false, false) => costs[(row, col)] -= min,
                    (true, true) => costs[(row, col)] += min,
                    _ => {}
                }
            }
        }
    }

    let mut perm = vec![0; n];
    for m in &marks {
        perm[m.row] = m.col;
    }
    Ok(perm)
}

fn smallest<T, I>(values: I) -> T
where
    T: Copy + PartialOrd + num_traits::Bounded,
    I: Iterator<Item = T>,
{
    values.fold(T::max_value(), |min, v| if v < min { v } else { min })
}

fn uncovered_zero<T>(
    costs: &DMatrix<T>,
    covered_rows: &[bool],
    covered_cols: &[bool],
) -> Option<(usize, usize)>
where
    T: nalgebra::Scalar + num_traits::Zero,
{
    uncovered(covered_rows, covered_cols).find(|&idx| costs[idx].is_zero())
}

/// Uncovered cells in column-major order.
fn uncovered<'a>(
    covered_rows: &'a [bool],
    covered_cols: &'a [bool],
) -> impl Iterator<Item = (usize, usize)> + 'a {
    (0..covered_cols.len())
        .filter(move |&col| !covered_cols[col])
        .flat_map(move |col| {
            (0..covered_rows.len())
                .filter(move |&row| !covered_rows[row])
                .map(move |row| (row, col))
        })
}

/// Flips the alternating prime/star path that starts at the prime `(row, col)`,
/// leaving one more star and no primes.
fn augment(marks: &mut Vec<Marked>, row: usize, col: usize) {
    let mut current = (row, col);
    marks.push(Marked {
        row,
        col,
        mark: Mark::Star,
    });

    while let Some(star_index) = marks
        .iter()
        .position(|m| m.mark == Mark::Star && m.col == current.1 && m.row != current.0)
    {
        let star = marks.remove(star_index);
        current.0 = star.row;

        let prime = marks
            .iter_mut()
            .find(|m| m.mark == Mark::Prime && m.row == current.0)
            .expect("a starred zero's row holds a prime");
        prime.mark = Mark::Star;
        current.1 = prime.col;
    }

    marks.retain(|m| m.mark == Mark::Star);
}

//! Point sets in the unit square and the Euclidean cost model between their halves.

use nalgebra::{DMatrix, Matrix4xX, Vector2};
use rand::Rng;

use crate::{Error, Result};

/// `N` source points and `N` target points stored as a 4×N matrix.
///
/// Rows 0 and 1 hold the source `x` and `y` coordinates, rows 2 and 3 the
/// target `x` and `y` coordinates. Column `i` therefore describes source `i`
/// and target `i` side by side.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSet {
    points: Matrix4xX<f64>,
}

impl PointSet {
    pub fn new(points: Matrix4xX<f64>) -> Self {
        Self { points }
    }

    pub fn from_halves(source: &[Vector2<f64>], target: &[Vector2<f64>]) -> Result<Self> {
        if source.len() != target.len() {
            return Err(Error::DimensionMismatch {
                rows: source.len(),
                cols: target.len(),
            });
        }
        let points = Matrix4xX::from_fn(source.len(), |row, col| match row {
            0 => source[col].x,
            1 => source[col].y,
            2 => target[col].x,
            _ => target[col].y,
        });
        Ok(Self { points })
    }

    /// Draws every coordinate uniformly from `[0, 1)`, row by row.
    pub fn random<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Self {
        let points = Matrix4xX::from_row_iterator(n, (0..4 * n).map(|_| rng.gen::<f64>()));
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.points.ncols() == 0
    }

    pub fn as_matrix(&self) -> &Matrix4xX<f64> {
        &self.points
    }

    pub fn source(&self, i: usize) -> Vector2<f64> {
        Vector2::new(self.points[(0, i)], self.points[(1, i)])
    }

    pub fn target(&self, j: usize) -> Vector2<f64> {
        Vector2::new(self.points[(2, j)], self.points[(3, j)])
    }

    /// `C[i, j]` is the distance from source `i` to target `j`.
    pub fn cost_matrix(&self) -> DMatrix<f64> {
        let n = self.len();
        DMatrix::from_fn(n, n, |i, j| (self.target(j) - self.source(i)).norm())
    }

    /// Stacks sources over targets into a 2N×2 matrix of `(x, y)` rows.
    ///
    /// Entry `(row / 2) * N + col, row % 2` receives `points[(row, col)]`.
    pub fn to_graph(&self) -> DMatrix<f64> {
        let n = self.len();
        let mut graph = DMatrix::zeros(2 * n, 2);
        for row in 0..4 {
            for col in 0..n {
                graph[((row / 2) * n + col, row % 2)] = self.points[(row, col)];
            }
        }
        graph
    }

    pub fn from_graph(graph: &DMatrix<f64>) -> Result<Self> {
        let (rows, cols) = graph.shape();
        if cols != 2 || rows % 2 != 0 {
            return Err(Error::DimensionMismatch { rows, cols });
        }
        let n = rows / 2;
        let points = Matrix4xX::from_fn(n, |row, col| graph[((row / 2) * n + col, row % 2)]);
        Ok(Self { points })
    }
}

#[cfg(test)]
mod test {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn empty_cost_matrix() {
        let points = PointSet::new(Matrix4xX::zeros(0));
        let costs = points.cost_matrix();
        assert_eq!(costs.shape(), (0, 0));
        assert!(points.is_empty());
    }

    #[test]
    fn crossed_pair() {
        let points = PointSet::from_halves(
            &[Vector2::new(0., 0.), Vector2::new(1., 1.)],
            &[Vector2::new(1., 1.), Vector2::new(0., 0.)],
        )
        .expect("equal halves");
        let costs = points.cost_matrix();
        let diag = 2f64.sqrt();
        assert!((costs[(0, 0)] - diag).abs() < 1e-12);
        assert!((costs[(1, 1)] - diag).abs() < 1e-12);
        assert_eq!(costs[(0, 1)], 0.);
        assert_eq!(costs[(1, 0)], 0.);
    }

    #[test]
    fn costs_match_coordinates() {
        let mut rng = StdRng::seed_from_u64(7);
        for n in 1..8 {
            let points = PointSet::random(n, &mut rng);
            let costs = points.cost_matrix();
            let m = points.as_matrix();
            for i in 0..n {
                for j in 0..n {
                    let dx = m[(2, j)] - m[(0, i)];
                    let dy = m[(3, j)] - m[(1, i)];
                    assert!(costs[(i, j)] >= 0.);
                    assert!((costs[(i, j)] - (dx * dx + dy * dy).sqrt()).abs() < 1e-12);
                }
            }
        }
    }

    #[test]
    fn random_points_in_unit_square() {
        let mut rng = StdRng::seed_from_u64(1);
        let points = PointSet::random(32, &mut rng);
        assert!(points.as_matrix().iter().all(|&v| (0. ..1.).contains(&v)));
    }

    #[test]
    fn graph_layout() {
        let points = PointSet::from_halves(
            &[Vector2::new(0.1, 0.2), Vector2::new(0.3, 0.4)],
            &[Vector2::new(0.5, 0.6), Vector2::new(0.7, 0.8)],
        )
        .expect("equal halves");
        let graph = points.to_graph();
        #[rustfmt::skip]
        let expected = DMatrix::from_row_slice(4, 2, &[
            0.1, 0.2,
            0.3, 0.4,
            0.5, 0.6,
            0.7, 0.8,
        ]);
        assert_eq!(graph, expected);
        assert_eq!(PointSet::from_graph(&graph).expect("2N x 2"), points);
    }

    #[test]
    fn mismatched_halves() {
        let err = PointSet::from_halves(&[Vector2::new(0., 0.)], &[]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { rows: 1, cols: 0 }));
    }
}

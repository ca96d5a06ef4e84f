//! Batched operations on soft (doubly stochastic) and hard (0/1) permutation matrices.
//!
//! A batch is a slice of matrices; every operation treats each element
//! independently unless noted otherwise.

use nalgebra::{DMatrix, DVector};
use rand::Rng;

use crate::{Error, Result};

/// Dimension a reduction runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Reduce down each column, one result per column.
    Rows,
    /// Reduce across each row, one result per row.
    Columns,
}

/// `log(sum(exp(values)))` computed around the maximum so large magnitudes
/// neither overflow nor vanish.
pub fn logsumexp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}

pub fn logsumexp_along(x: &DMatrix<f64>, axis: Axis) -> DVector<f64> {
    match axis {
        Axis::Rows => DVector::from_iterator(
            x.ncols(),
            x.column_iter()
                .map(|c| logsumexp(&c.iter().copied().collect::<Vec<_>>())),
        ),
        Axis::Columns => DVector::from_iterator(
            x.nrows(),
            x.row_iter()
                .map(|r| logsumexp(&r.iter().copied().collect::<Vec<_>>())),
        ),
    }
}

pub fn is_permutation(perm: &[usize]) -> bool {
    let mut seen = vec![false; perm.len()];
    perm.iter().all(|&p| p < seen.len() && !std::mem::replace(&mut seen[p], true))
}

/// The 0/1 matrix with `P[i, perm[i]] = 1`.
pub fn to_matrix(perm: &[usize]) -> DMatrix<f64> {
    let n = perm.len();
    let mut hard = DMatrix::zeros(n, n);
    for (row, &col) in perm.iter().enumerate() {
        hard[(row, col)] = 1.;
    }
    hard
}

/// Reads `perm` back out of a hard permutation matrix, if it is one.
pub fn from_matrix(hard: &DMatrix<f64>) -> Option<Vec<usize>> {
    if !hard.is_square() {
        return None;
    }
    if hard.iter().any(|&v| v != 0. && v != 1.) {
        return None;
    }
    let perm = hard
        .row_iter()
        .map(|row| {
            let mut ones = row.iter().enumerate().filter(|&(_, &v)| v == 1.);
            match (ones.next(), ones.next()) {
                (Some((col, _)), None) => Some(col),
                _ => None,
            }
        })
        .collect::<Option<Vec<_>>>()?;
    is_permutation(&perm).then_some(perm)
}

fn check_batches(left: &[DMatrix<f64>], right: &[DMatrix<f64>]) -> Result<()> {
    if left.len() != right.len() {
        return Err(Error::BatchMismatch {
            left: left.len(),
            right: right.len(),
        });
    }
    Ok(())
}

fn check_square(m: &DMatrix<f64>, n: usize) -> Result<()> {
    let (rows, cols) = m.shape();
    if rows != n || cols != n {
        return Err(Error::DimensionMismatch { rows, cols });
    }
    Ok(())
}

/// `seq^T * perm` for each N×d sequence, giving d×N.
///
/// Feature vector `i` lands in column `perm[i]` when `perm` is hard.
pub fn permute_sequence(
    seq: &[DMatrix<f64>],
    perm: &[DMatrix<f64>],
) -> Result<Vec<DMatrix<f64>>> {
    check_batches(seq, perm)?;
    seq.iter()
        .zip(perm)
        .map(|(s, p)| {
            check_square(p, s.nrows())?;
            Ok(s.transpose() * p)
        })
        .collect()
}

/// Keeps the first N rows of each 2N×d structure and reorders the last N by `perm`.
pub fn permute_bipartite(
    bipartite: &[DMatrix<f64>],
    perm: &[DMatrix<f64>],
) -> Result<Vec<DMatrix<f64>>> {
    check_batches(bipartite, perm)?;
    bipartite
        .iter()
        .zip(perm)
        .map(|(b, p)| {
            let (rows, cols) = b.shape();
            if rows % 2 != 0 {
                return Err(Error::DimensionMismatch { rows, cols });
            }
            let n = rows / 2;
            check_square(p, n)?;
            let targets = (b.rows(n, n).transpose() * p).transpose();
            let mut out = b.clone();
            out.rows_mut(n, n).copy_from(&targets);
            Ok(out)
        })
        .collect()
}

/// `sum(soft .* hard) / N` per batch element; 1 when `soft == hard`.
pub fn birkhoff_distance(
    soft: &[DMatrix<f64>],
    hard: &[DMatrix<f64>],
) -> Result<DVector<f64>> {
    check_batches(soft, hard)?;
    let scores = soft
        .iter()
        .zip(hard)
        .map(|(s, h)| {
            check_square(h, s.nrows())?;
            check_square(s, s.nrows())?;
            Ok(s.component_mul(h).sum() / s.nrows() as f64)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(DVector::from_vec(scores))
}

/// Swaps `k` randomly drawn row pairs, identically across every batch element
/// of both `soft` and `hard`.
///
/// Pairs are drawn with replacement; a pair naming the same row twice leaves
/// that step a no-op.
pub fn k_exchange<R: Rng + ?Sized>(
    k: usize,
    soft: &mut [DMatrix<f64>],
    hard: &mut [DMatrix<f64>],
    rng: &mut R,
) -> Result<()> {
    check_batches(soft, hard)?;
    let Some(n) = soft.first().map(|s| s.nrows()) else {
        return Ok(());
    };
    for m in soft.iter().chain(hard.iter()) {
        check_square(m, n)?;
    }
    if n == 0 {
        return Ok(());
    }
    for _ in 0..k {
        let a = rng.gen_range(0..n);
        let b = rng.gen_range(0..n);
        for m in soft.iter_mut().chain(hard.iter_mut()) {
            m.swap_rows(a, b);
        }
    }
    Ok(())
}

/// Batch mean of `sum(p * ln p - p * ln q)`.
///
/// Entries of `p` and `q` must be strictly positive; zeros yield NaN or
/// infinities rather than an error. An empty batch yields NaN.
pub fn kullback_leibler(p: &[DMatrix<f64>], q: &[DMatrix<f64>]) -> Result<f64> {
    batch_mean(p, q, |p, q| p * p.ln() - p * q.ln())
}

/// Batch mean of `-sum(p * ln q)`, with the same preconditions as
/// [`kullback_leibler`].
pub fn cross_entropy(p: &[DMatrix<f64>], q: &[DMatrix<f64>]) -> Result<f64> {
    batch_mean(p, q, |p, q| -p * q.ln())
}

fn batch_mean<F>(p: &[DMatrix<f64>], q: &[DMatrix<f64>], term: F) -> Result<f64>
where
    F: Fn(f64, f64) -> f64,
{
    check_batches(p, q)?;
    let mut total = 0.;
    for (p, q) in p.iter().zip(q) {
        if p.shape() != q.shape() {
            let (rows, cols) = q.shape();
            return Err(Error::DimensionMismatch { rows, cols });
        }
        total += p.zip_map(q, &term).sum();
    }
    Ok(total / p.len() as f64)
}

#[cfg(test)]
mod test {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn doubly_stochastic(n: usize, rng: &mut StdRng) -> DMatrix<f64> {
        let mut m = DMatrix::from_fn(n, n, |_, _| rng.gen_range(0.1..1.0));
        for _ in 0..50 {
            for mut row in m.row_iter_mut() {
                let s = row.sum();
                row /= s;
            }
            for mut col in m.column_iter_mut() {
                let s = col.sum();
                col /= s;
            }
        }
        m
    }

    #[test]
    fn logsumexp_stable() {
        assert!((logsumexp(&[1000., 1000.]) - (1000. + 2f64.ln())).abs() < 1e-9);
        assert!((logsumexp(&[-1000., -1000.]) - (-1000. + 2f64.ln())).abs() < 1e-9);
        let direct = (1f64.exp() + 2f64.exp() + 3f64.exp()).ln();
        assert!((logsumexp(&[1., 2., 3.]) - direct).abs() < 1e-12);
        assert_eq!(logsumexp(&[]), f64::NEG_INFINITY);
        assert_eq!(logsumexp(&[f64::NEG_INFINITY, f64::NEG_INFINITY]), f64::NEG_INFINITY);
    }

    #[test]
    fn logsumexp_axes() {
        #[rustfmt::skip]
        let x = DMatrix::from_row_slice(2, 3, &[
            0., 0., 0.,
            0., 0., 0.,
        ]);
        let down = logsumexp_along(&x, Axis::Rows);
        assert_eq!(down.len(), 3);
        assert!(down.iter().all(|v| (v - 2f64.ln()).abs() < 1e-12));
        let across = logsumexp_along(&x, Axis::Columns);
        assert_eq!(across.len(), 2);
        assert!(across.iter().all(|v| (v - 3f64.ln()).abs() < 1e-12));
    }

    #[test]
    fn matrix_round_trip() {
        let perm = vec![2, 0, 3, 1];
        let hard = to_matrix(&perm);
        assert_eq!(hard.row_sum().iter().sum::<f64>(), 4.);
        assert_eq!(from_matrix(&hard), Some(perm));
        assert_eq!(from_matrix(&DMatrix::from_element(2, 2, 0.5)), None);
        assert_eq!(from_matrix(&DMatrix::from_element(2, 2, 1.)), None);
        assert!(!is_permutation(&[0, 0]));
        assert!(!is_permutation(&[0, 2]));
        assert!(is_permutation(&[]));
    }

    #[test]
    fn sequence_moves_rows_to_perm_columns() {
        #[rustfmt::skip]
        let seq = DMatrix::from_row_slice(3, 2, &[
            1., 10.,
            2., 20.,
            3., 30.,
        ]);
        let p = to_matrix(&[2, 0, 1]);
        let out = permute_sequence(&[seq], &[p]).expect("shapes agree");
        #[rustfmt::skip]
        let expected = DMatrix::from_row_slice(2, 3, &[
             2.,  3.,  1.,
            20., 30., 10.,
        ]);
        assert_eq!(out[0], expected);
    }

    #[test]
    fn bipartite_keeps_sources() {
        #[rustfmt::skip]
        let bip = DMatrix::from_row_slice(4, 2, &[
            0., 0.,
            1., 1.,
            5., 5.,
            7., 7.,
        ]);
        let out = permute_bipartite(&[bip.clone()], &[to_matrix(&[1, 0])]).expect("shapes agree");
        #[rustfmt::skip]
        let expected = DMatrix::from_row_slice(4, 2, &[
            0., 0.,
            1., 1.,
            7., 7.,
            5., 5.,
        ]);
        assert_eq!(out[0], expected);

        let same = permute_bipartite(&[bip.clone()], &[to_matrix(&[0, 1])]).expect("shapes agree");
        assert_eq!(same[0], bip);
    }

    #[test]
    fn bipartite_rejects_odd_rows() {
        let bip = DMatrix::zeros(3, 2);
        assert!(matches!(
            permute_bipartite(&[bip], &[to_matrix(&[0])]),
            Err(Error::DimensionMismatch { rows: 3, cols: 2 })
        ));
    }

    #[test]
    fn birkhoff_self_alignment() {
        let hard = vec![to_matrix(&[1, 2, 0]), to_matrix(&[0, 1, 2])];
        let scores = birkhoff_distance(&hard, &hard).expect("shapes agree");
        assert_eq!(scores.len(), 2);
        assert!(scores.iter().all(|&s| (s - 1.).abs() < 1e-12));

        let uniform = vec![DMatrix::from_element(4, 4, 0.25)];
        let score = birkhoff_distance(&uniform, &[to_matrix(&[3, 2, 1, 0])]).expect("shapes agree");
        assert!((score[0] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn batch_sizes_must_agree() {
        let one = vec![to_matrix(&[0])];
        assert!(matches!(
            birkhoff_distance(&one, &[]),
            Err(Error::BatchMismatch { left: 1, right: 0 })
        ));
    }

    #[test]
    fn k_exchange_zero_steps() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut soft = vec![doubly_stochastic(4, &mut rng)];
        let mut hard = vec![to_matrix(&[3, 1, 0, 2])];
        let (soft0, hard0) = (soft.clone(), hard.clone());
        k_exchange(0, &mut soft, &mut hard, &mut rng).expect("shapes agree");
        assert_eq!(soft, soft0);
        assert_eq!(hard, hard0);
    }

    #[test]
    fn k_exchange_preserves_structure() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut soft = vec![doubly_stochastic(5, &mut rng), doubly_stochastic(5, &mut rng)];
        let mut hard = vec![to_matrix(&[0, 1, 2, 3, 4]), to_matrix(&[4, 3, 2, 1, 0])];
        let before = birkhoff_distance(&soft, &hard).expect("shapes agree");
        k_exchange(7, &mut soft, &mut hard, &mut rng).expect("shapes agree");

        for s in &soft {
            assert!(s.row_iter().all(|r| (r.sum() - 1.).abs() < 1e-9));
        }
        for h in &hard {
            assert!(from_matrix(h).is_some());
        }
        // rows move in lock-step, so alignment is unchanged
        let after = birkhoff_distance(&soft, &hard).expect("shapes agree");
        assert!((before - after).amax() < 1e-12);
    }

    #[test]
    fn kl_of_identical_is_zero() {
        let mut rng = StdRng::seed_from_u64(2);
        let p = vec![doubly_stochastic(4, &mut rng), doubly_stochastic(4, &mut rng)];
        assert!(kullback_leibler(&p, &p).expect("shapes agree").abs() < 1e-12);

        let q = vec![doubly_stochastic(4, &mut rng), doubly_stochastic(4, &mut rng)];
        assert!(kullback_leibler(&p, &q).expect("shapes agree") > 0.);
    }

    #[test]
    fn kl_with_zero_entries_is_not_finite() {
        let p = vec![to_matrix(&[0, 1])];
        let q = vec![DMatrix::from_element(2, 2, 0.5)];
        assert!(!kullback_leibler(&p, &q).expect("shapes agree").is_finite());
    }

    #[test]
    fn cross_entropy_uniform() {
        let p = vec![DMatrix::from_element(2, 2, 0.5)];
        let expected = -4. * 0.5 * 0.5f64.ln();
        assert!((cross_entropy(&p, &p).expect("shapes agree") - expected).abs() < 1e-12);

        let mut rng = StdRng::seed_from_u64(4);
        let p = vec![doubly_stochastic(3, &mut rng)];
        let q = vec![doubly_stochastic(3, &mut rng)];
        let entropy = cross_entropy(&p, &p).expect("shapes agree");
        let kl = kullback_leibler(&p, &q).expect("shapes agree");
        let cross = cross_entropy(&p, &q).expect("shapes agree");
        assert!((cross - (entropy + kl)).abs() < 1e-9);
    }
}

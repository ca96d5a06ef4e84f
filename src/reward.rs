//! Total edge length of a realized matching.

use nalgebra::{DMatrix, DVector};

use crate::{Error, Result};

/// Sum of distances between row `i` and row `i + M` of each N×d element,
/// where `M = N / 2`.
///
/// Each batch element stacks the `M` sources above the `M` targets they are
/// matched to. An odd trailing row is ignored.
pub fn matching_reward(matching: &[DMatrix<f64>]) -> DVector<f64> {
    DVector::from_iterator(
        matching.len(),
        matching.iter().map(|m| {
            let pairs = m.nrows() / 2;
            (0..pairs)
                .map(|i| (m.row(i + pairs) - m.row(i)).norm())
                .sum::<f64>()
        }),
    )
}

/// [`matching_reward`] negated, for objectives that reward short matchings.
pub fn negated_reward(matching: &[DMatrix<f64>]) -> DVector<f64> {
    -matching_reward(matching)
}

/// Rearranges a node-major list of `N` B×d matrices (row `b` of `nodes[k]`
/// is node `k` of batch element `b`) into `B` N×d matrices.
pub fn stack_nodes(nodes: &[DMatrix<f64>]) -> Result<Vec<DMatrix<f64>>> {
    let Some(first) = nodes.first() else {
        return Ok(Vec::new());
    };
    let (batch, features) = first.shape();
    if let Some(odd) = nodes.iter().find(|n| n.shape() != (batch, features)) {
        let (rows, cols) = odd.shape();
        return Err(Error::DimensionMismatch { rows, cols });
    }
    Ok((0..batch)
        .map(|b| DMatrix::from_fn(nodes.len(), features, |k, f| nodes[k][(b, f)]))
        .collect())
}

/// [`matching_reward`] over the node-major edge list layout.
pub fn edge_list_reward(nodes: &[DMatrix<f64>]) -> Result<DVector<f64>> {
    Ok(matching_reward(&stack_nodes(nodes)?))
}

//! Inter-gene correlation within a cluster.
//!
//! The mean pairwise Pearson correlation of `k` profiles is computed from their centred,
//! unit-length versions `u_i` as `(|sum u_i|^2 - k) / (k (k - 1))`, which needs one pass
//! per gene instead of one per pair.

use crate::data::{AlignedClusters, ExpressionMatrix};

/// Pearson correlation between `x` and `y`.
///
/// Returns `None` if the lengths differ, there are fewer than two observations or either
/// series is constant.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let u = standardize(x.to_vec())?;
    let v = standardize(y.to_vec())?;
    Some(u.iter().zip(v.iter()).map(|(a, b)| a * b).sum::<f64>().clamp(-1.0, 1.0))
}

/// Centre `values` and scale them to unit length. `None` for constant input.
fn standardize(mut values: Vec<f64>) -> Option<Vec<f64>> {
    let first = *values.first()?;
    if values.iter().all(|&v| v == first) {
        return None;
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let mut norm = 0.0;
    for v in values.iter_mut() {
        *v -= mean;
        norm += *v * *v;
    }
    let norm = norm.sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return None;
    }
    for v in values.iter_mut() {
        *v /= norm;
    }
    Some(values)
}

/// Expression of `gene` over the cells of `cluster`, in the cluster's member order.
pub fn cluster_profile(
    matrix: &ExpressionMatrix,
    clusters: &AlignedClusters,
    gene: usize,
    cluster: usize,
) -> Vec<f64> {
    let mut profile = vec![0.0; clusters.members(cluster).len()];
    let (cols, values) = matrix.gene_entries(gene);
    for (&col, &value) in cols.iter().zip(values) {
        if clusters.cluster_of(col) == cluster {
            profile[clusters.position_in_cluster(col)] = value;
        }
    }
    profile
}

/// Mean of all pairwise Pearson correlations between the profiles of `genes` across the
/// cells of `cluster`.
///
/// Genes that are constant within the cluster have no defined correlation and take no
/// part in any pair. With fewer than two varying genes, or fewer than two cells, the
/// result is 0.
pub fn mean_pairwise_correlation(
    matrix: &ExpressionMatrix,
    clusters: &AlignedClusters,
    genes: &[usize],
    cluster: usize,
) -> f64 {
    let n_cells = clusters.members(cluster).len();
    if genes.len() < 2 || n_cells < 2 {
        return 0.0;
    }

    let mut summed = vec![0.0; n_cells];
    let mut k = 0usize;
    for &gene in genes {
        if let Some(unit) = standardize(cluster_profile(matrix, clusters, gene, cluster)) {
            for (s, u) in summed.iter_mut().zip(unit) {
                *s += u;
            }
            k += 1;
        }
    }

    if k < 2 {
        return 0.0;
    }

    let k_f = k as f64;
    let squared_norm: f64 = summed.iter().map(|s| s * s).sum();
    ((squared_norm - k_f) / (k_f * (k_f - 1.0))).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ClusterAssignment;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn ids(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{}{}", prefix, i)).collect()
    }

    #[test]
    fn test_pearson() {
        assert_abs_diff_eq!(pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap(), -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pearson(&[1.0, -1.0, 0.0], &[1.0, 1.0, -2.0]).unwrap(), 0.0, epsilon = 1e-12);
        assert!(pearson(&[0.1, 0.1, 0.1], &[1.0, 2.0, 3.0]).is_none());
        assert!(pearson(&[1.0], &[2.0]).is_none());
        assert!(pearson(&[1.0, 2.0], &[2.0]).is_none());
    }

    #[test]
    fn test_mean_pairwise_matches_explicit_pairs() {
        // Genes × cells; cluster A = cells 0..4, cluster B = cells 4..6
        let dense = array![
            [1.0, 2.0, 0.0, 4.0, 9.0, 9.5],
            [2.0, 2.5, 0.5, 3.0, 1.0, 0.0],
            [0.0, 1.0, 3.0, 2.0, 5.0, 5.0],
            [7.0, 1.0, 4.0, 0.0, 2.0, 2.0],
        ];
        let matrix = ExpressionMatrix::from_dense(&dense, ids("g", 4), ids("c", 6)).unwrap();
        let clusters = ClusterAssignment::new(
            ids("c", 6),
            ["A", "A", "A", "A", "B", "B"].map(String::from).to_vec(),
        )
        .unwrap()
        .align(&matrix)
        .unwrap();

        let genes = [0, 1, 2, 3];
        let profiles: Vec<Vec<f64>> = genes
            .iter()
            .map(|&g| cluster_profile(&matrix, &clusters, g, 0))
            .collect();
        assert_eq!(profiles[0], vec![1.0, 2.0, 0.0, 4.0]);

        let mut total = 0.0;
        let mut pairs = 0;
        for i in 0..genes.len() {
            for j in (i + 1)..genes.len() {
                total += pearson(&profiles[i], &profiles[j]).unwrap();
                pairs += 1;
            }
        }

        let estimate = mean_pairwise_correlation(&matrix, &clusters, &genes, 0);
        assert_abs_diff_eq!(estimate, total / pairs as f64, epsilon = 1e-12);
    }

    #[test]
    fn test_constant_genes_are_excluded() {
        let dense = array![
            [1.0, 2.0, 3.0, 0.0],
            [2.0, 4.0, 6.0, 0.0],
            [5.0, 5.0, 5.0, 1.0],
        ];
        let matrix = ExpressionMatrix::from_dense(&dense, ids("g", 3), ids("c", 4)).unwrap();
        let clusters = ClusterAssignment::new(
            ids("c", 4),
            ["A", "A", "A", "B"].map(String::from).to_vec(),
        )
        .unwrap()
        .align(&matrix)
        .unwrap();

        // Gene 2 is constant in A, leaving the single perfectly correlated pair
        assert_abs_diff_eq!(mean_pairwise_correlation(&matrix, &clusters, &[0, 1, 2], 0), 1.0, epsilon = 1e-12);
        // Only one varying gene
        assert_eq!(mean_pairwise_correlation(&matrix, &clusters, &[0, 2], 0), 0.0);
        // Single-cell cluster
        assert_eq!(mean_pairwise_correlation(&matrix, &clusters, &[0, 1], 1), 0.0);
        // Single gene
        assert_eq!(mean_pairwise_correlation(&matrix, &clusters, &[0], 0), 0.0);
    }
}

//! Log fold change between each cluster and the rest of the cells.
//!
//! Expression is expected to be log-transformed already, so the fold change of a gene is
//! the difference of its mean expression inside and outside the cluster.

use log::debug;
use ndarray::parallel::prelude::*;
use ndarray::{Array2, ArrayView1, Axis};

use crate::data::{AlignedClusters, ExpressionMatrix};
use crate::error::EnrichmentError;

/// Gene × cluster table of log fold changes together with the cells of each cluster.
#[derive(Debug, Clone)]
pub struct LogFcTable {
    values: Array2<f64>,
    genes: Vec<String>,
    clusters: Vec<String>,
    members: Vec<Vec<usize>>,
}

impl LogFcTable {
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn column(&self, cluster: usize) -> ArrayView1<'_, f64> {
        self.values.column(cluster)
    }

    pub fn get(&self, gene: usize, cluster: usize) -> f64 {
        self.values[[gene, cluster]]
    }

    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    pub fn clusters(&self) -> &[String] {
        &self.clusters
    }

    /// Matrix columns of the cells in `cluster`.
    pub fn members(&self, cluster: usize) -> &[usize] {
        &self.members[cluster]
    }

    pub fn n_genes(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_clusters(&self) -> usize {
        self.values.ncols()
    }
}

/// Calculate the log fold change of one gene between two groups of cells.
///
/// # Arguments
///
/// * `matrix` - Expression matrix (genes × cells)
/// * `gene` - Row of the gene
/// * `group1_indices` - Columns of the group of interest
/// * `group2_indices` - Columns of the reference group
///
/// # Returns
///
/// `mean(group1) - mean(group2)`, or an error if a group is empty.
pub fn mean_difference(
    matrix: &ExpressionMatrix,
    gene: usize,
    group1_indices: &[usize],
    group2_indices: &[usize],
) -> anyhow::Result<f64> {
    if group1_indices.is_empty() || group2_indices.is_empty() {
        return Err(anyhow::anyhow!("Group indices cannot be empty"));
    }

    let n_cells = matrix.n_cells();
    if let Some(&col) = group1_indices
        .iter()
        .chain(group2_indices)
        .find(|&&col| col >= n_cells)
    {
        return Err(anyhow::anyhow!(
            "Cell column {} is out of range for a matrix with {} cells",
            col,
            n_cells
        ));
    }

    // 0 = neither group, 1 = group 1, 2 = group 2
    let mut membership = vec![0u8; n_cells];
    for &col in group1_indices {
        membership[col] = 1;
    }
    for &col in group2_indices {
        if membership[col] == 1 {
            return Err(anyhow::anyhow!("Cell column {} is in both groups", col));
        }
        membership[col] = 2;
    }

    let n1 = group1_indices.len() as f64;
    let n2 = group2_indices.len() as f64;
    let (cols, values) = matrix.gene_entries(gene);
    let mut mean1 = 0.0;
    let mut mean2 = 0.0;
    for (&col, &value) in cols.iter().zip(values) {
        match membership[col] {
            1 => mean1 += value / n1,
            2 => mean2 += value / n2,
            _ => {}
        }
    }

    let difference = mean1 - mean2;
    if !difference.is_finite() {
        return Err(EnrichmentError::InvalidInput(format!(
            "log fold change of gene '{}' is not representable as a finite number",
            matrix.genes()[gene]
        ))
        .into());
    }
    Ok(difference)
}

/// Calculate the log fold change of every gene for every cluster against all other cells.
///
/// Fails with [`crate::EnrichmentError::InvalidClustering`] if there are fewer than two
/// clusters or a cluster contains every cell. Genes are processed in parallel.
pub fn cluster_log_fold_change(
    matrix: &ExpressionMatrix,
    clusters: &AlignedClusters,
) -> anyhow::Result<LogFcTable> {
    clusters.validate_contrasts()?;
    if clusters.n_cells() != matrix.n_cells() {
        return Err(anyhow::anyhow!(
            "Cluster assignment covers {} cells but the matrix has {}",
            clusters.n_cells(),
            matrix.n_cells()
        ));
    }

    let n_clusters = clusters.n_clusters();
    let n_total = matrix.n_cells() as f64;
    let sizes: Vec<f64> = (0..n_clusters)
        .map(|c| clusters.members(c).len() as f64)
        .collect();

    let mut values = Array2::<f64>::zeros((matrix.n_genes(), n_clusters));
    values
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(gene, mut row)| {
            // Accumulate means directly, never raw sums
            let mut means = vec![0.0; n_clusters];
            let (cols, vals) = matrix.gene_entries(gene);
            for (&col, &value) in cols.iter().zip(vals) {
                let c = clusters.cluster_of(col);
                means[c] += value / sizes[c];
            }

            for c in 0..n_clusters {
                let rest = n_total - sizes[c];
                let outside: f64 = (0..n_clusters)
                    .filter(|&d| d != c)
                    .map(|d| means[d] * (sizes[d] / rest))
                    .sum();
                row[c] = means[c] - outside;
            }
        });

    if let Some(((gene, c), value)) = values.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(EnrichmentError::InvalidInput(format!(
            "log fold change of gene '{}' in cluster '{}' is {}",
            matrix.genes()[gene],
            clusters.labels()[c],
            value
        ))
        .into());
    }

    debug!(
        "Computed log fold changes for {} genes across {} clusters",
        matrix.n_genes(),
        n_clusters
    );

    Ok(LogFcTable {
        values,
        genes: matrix.genes().to_vec(),
        clusters: clusters.labels().to_vec(),
        members: (0..n_clusters)
            .map(|c| clusters.members(c).to_vec())
            .collect(),
    })
}

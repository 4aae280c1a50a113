//! Input containers for enrichment analysis.
//!
//! The three inputs of an analysis run are passed explicitly and never mutated:
//!
//! - [`ExpressionMatrix`]: normalized, log-transformed expression (genes × cells)
//! - [`ClusterAssignment`]: one cluster label per cell
//! - [`GeneSetCollection`]: named gene sets to test
//!
//! Construction validates the structural invariants (matching dimensions, unique
//! identifiers, finite values) so downstream code can rely on them.

use std::collections::{HashMap, HashSet};

use nalgebra_sparse::{CooMatrix, CsrMatrix};
use ndarray::Array2;
use single_utilities::traits::{FloatOps, FloatOpsTS};

use crate::error::EnrichmentError;
use crate::testing::utils::get_group_indices;

pub mod matching;

pub use matching::{GeneIndex, MatchedGeneSet};

fn ensure_unique(ids: &[String], kind: &'static str) -> anyhow::Result<()> {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(EnrichmentError::DuplicateIdentifier {
                kind,
                id: id.clone(),
            }
            .into());
        }
    }
    Ok(())
}

/// Normalized expression values with genes as rows and cells as columns.
///
/// Values are stored as a `CsrMatrix<f64>`, so the expression profile of a gene is a
/// single sparse row. Missing entries are zero expression.
#[derive(Debug, Clone)]
pub struct ExpressionMatrix {
    matrix: CsrMatrix<f64>,
    genes: Vec<String>,
    cells: Vec<String>,
}

impl ExpressionMatrix {
    /// Build an expression matrix from a sparse genes × cells matrix.
    ///
    /// # Arguments
    ///
    /// * `matrix` - Sparse expression matrix (genes × cells)
    /// * `genes` - Gene identifiers, one per row
    /// * `cells` - Cell identifiers, one per column
    ///
    /// # Returns
    ///
    /// The validated matrix, or an error if the labels do not match the dimensions, an
    /// identifier is duplicated, the matrix is empty or a value is not finite.
    pub fn from_csr<T>(
        matrix: &CsrMatrix<T>,
        genes: Vec<String>,
        cells: Vec<String>,
    ) -> anyhow::Result<Self>
    where
        T: FloatOpsTS,
    {
        Self::check_labels(matrix.nrows(), matrix.ncols(), &genes, &cells)?;

        let mut values = Vec::with_capacity(matrix.nnz());
        for (row, col, value) in matrix.triplet_iter() {
            let value = value.to_f64().filter(|v| v.is_finite()).ok_or_else(|| {
                EnrichmentError::InvalidInput(format!(
                    "non-finite expression value for gene '{}' in cell '{}'",
                    genes[row], cells[col]
                ))
            })?;
            values.push(value);
        }

        let matrix = CsrMatrix::try_from_csr_data(
            matrix.nrows(),
            matrix.ncols(),
            matrix.row_offsets().to_vec(),
            matrix.col_indices().to_vec(),
            values,
        )
        .map_err(|e| anyhow::anyhow!("Failed to rebuild expression matrix: {}", e))?;

        Ok(ExpressionMatrix {
            matrix,
            genes,
            cells,
        })
    }

    /// Build an expression matrix from a dense genes × cells array. Zeros are not stored.
    pub fn from_dense<T>(data: &Array2<T>, genes: Vec<String>, cells: Vec<String>) -> anyhow::Result<Self>
    where
        T: FloatOps,
    {
        let (n_genes, n_cells) = data.dim();
        Self::check_labels(n_genes, n_cells, &genes, &cells)?;

        let mut coo = CooMatrix::new(n_genes, n_cells);
        for ((row, col), value) in data.indexed_iter() {
            let value = value.to_f64().filter(|v| v.is_finite()).ok_or_else(|| {
                EnrichmentError::InvalidInput(format!(
                    "non-finite expression value for gene '{}' in cell '{}'",
                    genes[row], cells[col]
                ))
            })?;
            if value != 0.0 {
                coo.push(row, col, value);
            }
        }

        Ok(ExpressionMatrix {
            matrix: CsrMatrix::from(&coo),
            genes,
            cells,
        })
    }

    fn check_labels(
        n_genes: usize,
        n_cells: usize,
        genes: &[String],
        cells: &[String],
    ) -> anyhow::Result<()> {
        if n_genes == 0 || n_cells == 0 {
            return Err(EnrichmentError::InvalidInput(format!(
                "expression matrix must not be empty, got {} genes × {} cells",
                n_genes, n_cells
            ))
            .into());
        }
        if genes.len() != n_genes {
            return Err(EnrichmentError::InvalidInput(format!(
                "{} gene identifiers supplied for a matrix with {} rows",
                genes.len(),
                n_genes
            ))
            .into());
        }
        if cells.len() != n_cells {
            return Err(EnrichmentError::InvalidInput(format!(
                "{} cell identifiers supplied for a matrix with {} columns",
                cells.len(),
                n_cells
            ))
            .into());
        }
        ensure_unique(genes, "gene")?;
        ensure_unique(cells, "cell")
    }

    pub fn n_genes(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn n_cells(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    pub fn csr(&self) -> &CsrMatrix<f64> {
        &self.matrix
    }

    /// Stored entries of one gene: cell columns and their values.
    pub fn gene_entries(&self, gene: usize) -> (&[usize], &[f64]) {
        let offsets = self.matrix.row_offsets();
        let (start, end) = (offsets[gene], offsets[gene + 1]);
        (
            &self.matrix.col_indices()[start..end],
            &self.matrix.values()[start..end],
        )
    }
}

/// Cluster label per cell, keyed by cell identifier.
///
/// Clusters are ordered by first appearance, which is also the column order of all
/// downstream result tables.
#[derive(Debug, Clone)]
pub struct ClusterAssignment {
    cells: Vec<String>,
    labels: Vec<String>,
}

impl ClusterAssignment {
    pub fn new(cells: Vec<String>, labels: Vec<String>) -> anyhow::Result<Self> {
        if cells.len() != labels.len() {
            return Err(EnrichmentError::InvalidInput(format!(
                "{} cells but {} cluster labels",
                cells.len(),
                labels.len()
            ))
            .into());
        }
        ensure_unique(&cells, "cell")?;
        Ok(ClusterAssignment { cells, labels })
    }

    pub fn from_pairs<I, C, L>(pairs: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (C, L)>,
        C: Into<String>,
        L: Into<String>,
    {
        let (cells, labels) = pairs
            .into_iter()
            .map(|(c, l)| (c.into(), l.into()))
            .unzip();
        Self::new(cells, labels)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Distinct labels in order of first appearance.
    pub fn cluster_labels(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.labels
            .iter()
            .filter(|l| seen.insert(l.as_str()))
            .cloned()
            .collect()
    }

    /// Map the labels onto the columns of `matrix`.
    ///
    /// Every matrix cell must carry a label and every labelled cell must be present in
    /// the matrix, otherwise the run fails with
    /// [`EnrichmentError::MismatchedIdentifiers`].
    pub fn align(&self, matrix: &ExpressionMatrix) -> anyhow::Result<AlignedClusters> {
        let labels = self.cluster_labels();
        let label_index: HashMap<&str, usize> = labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.as_str(), i))
            .collect();
        let by_cell: HashMap<&str, usize> = self
            .cells
            .iter()
            .zip(self.labels.iter())
            .map(|(c, l)| (c.as_str(), label_index[l.as_str()]))
            .collect();

        let mut cell_cluster = Vec::with_capacity(matrix.n_cells());
        for cell in matrix.cells() {
            match by_cell.get(cell.as_str()) {
                Some(&cluster) => cell_cluster.push(cluster),
                None => {
                    return Err(EnrichmentError::MismatchedIdentifiers(format!(
                        "cell '{}' of the expression matrix has no cluster label",
                        cell
                    ))
                    .into());
                }
            }
        }

        if self.cells.len() != matrix.n_cells() {
            let known: HashSet<&str> = matrix.cells().iter().map(String::as_str).collect();
            let missing = self
                .cells
                .iter()
                .find(|c| !known.contains(c.as_str()))
                .map(String::as_str)
                .unwrap_or_default();
            return Err(EnrichmentError::MismatchedIdentifiers(format!(
                "labelled cell '{}' is not a column of the expression matrix",
                missing
            ))
            .into());
        }

        let members = get_group_indices(&cell_cluster, labels.len());

        let mut position = vec![0; cell_cluster.len()];
        for cells in &members {
            for (pos, &col) in cells.iter().enumerate() {
                position[col] = pos;
            }
        }

        Ok(AlignedClusters {
            labels,
            cell_cluster,
            members,
            position,
        })
    }
}

/// Cluster membership resolved against the columns of an [`ExpressionMatrix`].
#[derive(Debug, Clone)]
pub struct AlignedClusters {
    labels: Vec<String>,
    /// Cluster index per matrix column.
    cell_cluster: Vec<usize>,
    /// Matrix columns per cluster, ascending.
    members: Vec<Vec<usize>>,
    /// Position of each column within its own cluster's member list.
    position: Vec<usize>,
}

impl AlignedClusters {
    pub fn n_clusters(&self) -> usize {
        self.labels.len()
    }

    pub fn n_cells(&self) -> usize {
        self.cell_cluster.len()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn cluster_of(&self, col: usize) -> usize {
        self.cell_cluster[col]
    }

    pub fn members(&self, cluster: usize) -> &[usize] {
        &self.members[cluster]
    }

    pub fn position_in_cluster(&self, col: usize) -> usize {
        self.position[col]
    }

    /// Every cluster needs a contrast group: at least two clusters, none of which holds
    /// the whole population.
    pub fn validate_contrasts(&self) -> anyhow::Result<()> {
        if self.labels.len() < 2 {
            return Err(EnrichmentError::InvalidClustering(format!(
                "at least two distinct clusters are required, got {}",
                self.labels.len()
            ))
            .into());
        }
        for (label, cells) in self.labels.iter().zip(self.members.iter()) {
            if cells.len() == self.n_cells() {
                return Err(EnrichmentError::InvalidClustering(format!(
                    "cluster '{}' contains every cell, leaving no contrast group",
                    label
                ))
                .into());
            }
        }
        Ok(())
    }
}

/// A named gene set with set semantics: members are sorted and deduplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneSet {
    name: String,
    genes: Vec<String>,
}

impl GeneSet {
    pub fn new<N, I, G>(name: N, genes: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = G>,
        G: Into<String>,
    {
        let mut genes: Vec<String> = genes.into_iter().map(Into::into).collect();
        genes.sort();
        genes.dedup();
        GeneSet {
            name: name.into(),
            genes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

/// Ordered collection of uniquely named gene sets.
#[derive(Debug, Clone, Default)]
pub struct GeneSetCollection {
    sets: Vec<GeneSet>,
}

impl GeneSetCollection {
    pub fn new(sets: Vec<GeneSet>) -> anyhow::Result<Self> {
        let names: Vec<String> = sets.iter().map(|s| s.name.clone()).collect();
        ensure_unique(&names, "gene set")?;
        Ok(GeneSetCollection { sets })
    }

    pub fn from_pairs<I, N, G, S>(pairs: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (N, G)>,
        N: Into<String>,
        G: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(name, genes)| GeneSet::new(name, genes))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.sets.iter().map(|s| s.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneSet> {
        self.sets.iter()
    }
}

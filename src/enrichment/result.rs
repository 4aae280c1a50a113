//! Gene set × cluster result tables.

use ndarray::{Array2, ArrayView1};

use crate::data::MatchedGeneSet;
use crate::testing::{PairOutcome, SkipReason};

/// State of one (gene set, cluster) cell of the result tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairStatus {
    Computed,
    /// Computed after raising the variance inflation factor to the configured floor.
    VifClamped,
    NotComputed(SkipReason),
}

impl PairStatus {
    pub fn is_computed(&self) -> bool {
        !matches!(self, PairStatus::NotComputed(_))
    }
}

/// Output of testing one gene set in one cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct PairEstimate {
    pub set: usize,
    pub cluster: usize,
    /// Inter-gene correlation used for the pair, if the pair got that far
    pub correlation: Option<f64>,
    pub outcome: PairOutcome,
}

/// Statistic and p-value tables with gene sets as rows and clusters as columns.
///
/// Cells that were not computed hold `NaN` in the numeric tables; [`Self::status`] tells
/// them apart from real results.
#[derive(Debug, Clone)]
pub struct EnrichmentResult {
    gene_sets: Vec<String>,
    clusters: Vec<String>,
    statistics: Array2<f64>,
    p_values: Array2<f64>,
    correlations: Array2<f64>,
    status: Array2<PairStatus>,
    set_sizes: Vec<usize>,
    requested_sizes: Vec<usize>,
}

impl EnrichmentResult {
    /// Collect per-pair estimates into aligned tables.
    ///
    /// Rows follow the order of `gene_sets`, columns the order of `clusters`. Every pair
    /// starts out as not computed, so the shape never depends on which pairs were tested.
    pub fn assemble(
        gene_sets: &[MatchedGeneSet],
        clusters: &[String],
        estimates: Vec<PairEstimate>,
    ) -> anyhow::Result<Self> {
        let shape = (gene_sets.len(), clusters.len());
        let mut statistics = Array2::from_elem(shape, f64::NAN);
        let mut p_values = Array2::from_elem(shape, f64::NAN);
        let mut correlations = Array2::from_elem(shape, f64::NAN);
        let mut status = Array2::from_elem(shape, PairStatus::NotComputed(SkipReason::EmptyGeneSet));

        for estimate in estimates {
            if estimate.set >= shape.0 || estimate.cluster >= shape.1 {
                return Err(anyhow::anyhow!(
                    "Estimate for gene set {} / cluster {} is outside the {}×{} result",
                    estimate.set,
                    estimate.cluster,
                    shape.0,
                    shape.1
                ));
            }

            let idx = [estimate.set, estimate.cluster];
            if let Some(rho) = estimate.correlation {
                correlations[idx] = rho;
            }
            status[idx] = match estimate.outcome {
                PairOutcome::Computed(result) => {
                    statistics[idx] = result.statistic;
                    p_values[idx] = result.p_value;
                    if result.vif_clamped {
                        PairStatus::VifClamped
                    } else {
                        PairStatus::Computed
                    }
                }
                PairOutcome::NotComputed(reason) => PairStatus::NotComputed(reason),
            };
        }

        Ok(EnrichmentResult {
            gene_sets: gene_sets.iter().map(|s| s.name.clone()).collect(),
            clusters: clusters.to_vec(),
            statistics,
            p_values,
            correlations,
            status,
            set_sizes: gene_sets.iter().map(|s| s.usable_size()).collect(),
            requested_sizes: gene_sets.iter().map(|s| s.requested).collect(),
        })
    }

    pub fn gene_sets(&self) -> &[String] {
        &self.gene_sets
    }

    pub fn clusters(&self) -> &[String] {
        &self.clusters
    }

    /// z-statistics, gene sets × clusters.
    pub fn statistics(&self) -> &Array2<f64> {
        &self.statistics
    }

    /// p-values, gene sets × clusters.
    pub fn p_values(&self) -> &Array2<f64> {
        &self.p_values
    }

    /// Inter-gene correlation used per pair.
    pub fn correlations(&self) -> &Array2<f64> {
        &self.correlations
    }

    pub fn status(&self) -> &Array2<PairStatus> {
        &self.status
    }

    /// Number of genes of each set found in the expression matrix.
    pub fn set_sizes(&self) -> &[usize] {
        &self.set_sizes
    }

    /// Number of distinct genes each set asked for.
    pub fn requested_sizes(&self) -> &[usize] {
        &self.requested_sizes
    }

    pub fn shape(&self) -> (usize, usize) {
        self.statistics.dim()
    }

    pub fn is_computed(&self, set: usize, cluster: usize) -> bool {
        self.status[[set, cluster]].is_computed()
    }

    pub fn statistic(&self, set: usize, cluster: usize) -> Option<f64> {
        self.is_computed(set, cluster)
            .then(|| self.statistics[[set, cluster]])
    }

    pub fn p_value(&self, set: usize, cluster: usize) -> Option<f64> {
        self.is_computed(set, cluster)
            .then(|| self.p_values[[set, cluster]])
    }

    /// Look up a pair by gene set name and cluster label.
    pub fn get(&self, gene_set: &str, cluster: &str) -> Option<RankSumLookup> {
        let set = self.gene_sets.iter().position(|s| s == gene_set)?;
        let cluster = self.clusters.iter().position(|c| c == cluster)?;
        Some(RankSumLookup {
            status: self.status[[set, cluster]],
            statistic: self.statistic(set, cluster),
            p_value: self.p_value(set, cluster),
        })
    }

    pub fn column_p_values(&self, cluster: usize) -> ArrayView1<'_, f64> {
        self.p_values.column(cluster)
    }

    pub fn n_computed(&self) -> usize {
        self.status.iter().filter(|s| s.is_computed()).count()
    }
}

/// One cell of an [`EnrichmentResult`], looked up by name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankSumLookup {
    pub status: PairStatus,
    pub statistic: Option<f64>,
    pub p_value: Option<f64>,
}

//! Correlation-adjusted rank-sum gene set enrichment per cluster.
//!
//! For every cluster, genes are ranked by their log fold change against all other cells,
//! and each gene set is tested for a shift of its ranks. The null variance of the rank sum
//! is inflated by the mean inter-gene correlation of the set within the cluster, following
//! the CAMERA competitive test.
//!
//! ## Workflow
//!
//! 1. Align the cluster labels to the matrix columns
//! 2. Compute the log fold change table and the per-cluster ranks once
//! 3. Match every gene set against the matrix genes once
//! 4. Test all (gene set, cluster) pairs in parallel
//! 5. Assemble statistic and p-value tables
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use single_enrichment::data::{ClusterAssignment, ExpressionMatrix, GeneSetCollection};
//! use single_enrichment::enrichment::{EnrichmentConfig, GeneSetEnrichment};
//!
//! # fn run(matrix: ExpressionMatrix, clusters: ClusterAssignment, sets: GeneSetCollection) -> anyhow::Result<()> {
//! let result = matrix.camera_wilcoxon(&clusters, &sets, &EnrichmentConfig::default())?;
//! println!("{:?}", result.statistics());
//! # Ok(())
//! # }
//! ```

use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::data::matching::match_collection;
use crate::data::{AlignedClusters, ClusterAssignment, ExpressionMatrix, GeneIndex, GeneSetCollection, MatchedGeneSet};
use crate::testing::effect::{cluster_log_fold_change, LogFcTable};
use crate::testing::inference::{correlation_adjusted_rank_sum, rank_clusters, RankTable};
use crate::testing::{PairOutcome, SkipReason};

pub mod config;
pub mod correlation;
pub mod result;

pub use config::{CorrelationMode, EnrichmentConfig};
pub use result::{EnrichmentResult, PairEstimate, PairStatus, RankSumLookup};

pub trait GeneSetEnrichment {
    /// Log fold change of every gene in every cluster against the remaining cells.
    fn log_fold_change(&self, clusters: &ClusterAssignment) -> anyhow::Result<LogFcTable>;

    /// Correlation-adjusted rank-sum test of every gene set in every cluster.
    fn camera_wilcoxon(
        &self,
        clusters: &ClusterAssignment,
        gene_sets: &GeneSetCollection,
        config: &EnrichmentConfig,
    ) -> anyhow::Result<EnrichmentResult>;
}

impl GeneSetEnrichment for ExpressionMatrix {
    fn log_fold_change(&self, clusters: &ClusterAssignment) -> anyhow::Result<LogFcTable> {
        let aligned = clusters.align(self)?;
        cluster_log_fold_change(self, &aligned)
    }

    fn camera_wilcoxon(
        &self,
        clusters: &ClusterAssignment,
        gene_sets: &GeneSetCollection,
        config: &EnrichmentConfig,
    ) -> anyhow::Result<EnrichmentResult> {
        camera_wilcoxon(self, clusters, gene_sets, config)
    }
}

/// Read-only inputs shared by all pair tests.
struct PairContext<'a> {
    matrix: &'a ExpressionMatrix,
    clusters: &'a AlignedClusters,
    ranks: &'a [RankTable],
    gene_sets: &'a [MatchedGeneSet],
    config: &'a EnrichmentConfig,
}

impl PairContext<'_> {
    fn test_pair(&self, set: usize, cluster: usize) -> PairEstimate {
        let gene_set = &self.gene_sets[set];
        let ranks = &self.ranks[cluster];
        let n = ranks.len();
        let m1 = gene_set.usable_size();

        let skip = if m1 == 0 {
            Some(SkipReason::EmptyGeneSet)
        } else if m1 < self.config.min_set_size {
            Some(SkipReason::BelowMinSize)
        } else if m1 >= n {
            Some(SkipReason::FullGeneSet)
        } else {
            None
        };
        if let Some(reason) = skip {
            return PairEstimate {
                set,
                cluster,
                correlation: None,
                outcome: PairOutcome::NotComputed(reason),
            };
        }

        let rho = match self.config.correlation {
            CorrelationMode::Estimate => correlation::mean_pairwise_correlation(
                self.matrix,
                self.clusters,
                &gene_set.indices,
                cluster,
            ),
            CorrelationMode::Fixed(rho) => rho,
        };

        let outcome = correlation_adjusted_rank_sum(
            n,
            m1,
            ranks.rank_sum(&gene_set.indices),
            rho,
            self.config.vif_floor,
            self.config.alternative,
        );

        match &outcome {
            PairOutcome::Computed(r) if r.vif_clamped => warn!(
                "Variance inflation for '{}' in cluster '{}' raised to {} (correlation {:.4})",
                gene_set.name,
                self.clusters.labels()[cluster],
                r.vif,
                rho
            ),
            PairOutcome::NotComputed(reason) => debug!(
                "Skipping '{}' in cluster '{}': {:?}",
                gene_set.name,
                self.clusters.labels()[cluster],
                reason
            ),
            _ => {}
        }

        PairEstimate {
            set,
            cluster,
            correlation: Some(rho),
            outcome,
        }
    }
}

/// Run the correlation-adjusted rank-sum enrichment test for all gene sets and clusters.
///
/// # Arguments
///
/// * `matrix` - Normalized, log-transformed expression (genes × cells)
/// * `clusters` - Cluster label of every matrix cell
/// * `gene_sets` - Gene sets to test, in the same identifier namespace as the matrix genes
/// * `config` - Test parameters
///
/// # Returns
///
/// Gene set × cluster tables of z-statistics and p-values. Structural problems (invalid
/// clustering, mismatched cell identifiers, invalid configuration) abort the run; pairs
/// that cannot be tested are marked as not computed and the run continues.
pub fn camera_wilcoxon(
    matrix: &ExpressionMatrix,
    clusters: &ClusterAssignment,
    gene_sets: &GeneSetCollection,
    config: &EnrichmentConfig,
) -> anyhow::Result<EnrichmentResult> {
    config.validate()?;
    let start = Instant::now();

    let aligned = clusters.align(matrix)?;
    let log_fc = cluster_log_fold_change(matrix, &aligned)?;
    let ranks = rank_clusters(&log_fc);
    debug!("Fold changes and ranks ready in {:.2?}", start.elapsed());

    let index = GeneIndex::new(matrix);
    let matched = match_collection(gene_sets, &index);

    let n_clusters = aligned.n_clusters();
    let tasks: Vec<(usize, usize)> = (0..matched.len())
        .flat_map(|s| (0..n_clusters).map(move |c| (s, c)))
        .collect();

    let context = PairContext {
        matrix,
        clusters: &aligned,
        ranks: &ranks,
        gene_sets: &matched,
        config,
    };
    let estimates: Vec<PairEstimate> = tasks
        .into_par_iter()
        .map(|(set, cluster)| context.test_pair(set, cluster))
        .collect();

    let result = EnrichmentResult::assemble(&matched, aligned.labels(), estimates)?;
    info!(
        "Tested {} gene sets in {} clusters: {} of {} pairs computed in {:.2?}",
        matched.len(),
        n_clusters,
        result.n_computed(),
        matched.len() * n_clusters,
        start.elapsed()
    );

    Ok(result)
}

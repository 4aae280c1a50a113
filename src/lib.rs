//! # single-enrichment
//!
//! Correlation-adjusted rank-sum gene set enrichment for clustered single-cell data, part
//! of the single-rust ecosystem.
//!
//! Given a normalized expression matrix, a cluster label per cell and a collection of gene
//! sets, this crate determines which gene sets are shifted towards higher or lower
//! expression in each cluster relative to all other cells. Genes are ranked by their log
//! fold change, and the rank-sum test of each gene set has its null variance inflated by
//! the mean inter-gene correlation of the set (the CAMERA approach), so co-expressed
//! gene sets do not produce overconfident p-values.
//!
//! ## Core Features
//!
//! - **Log Fold Change**: per gene and cluster, against all remaining cells
//! - **Correlation-Adjusted Rank-Sum Test**: z-statistic and p-value per gene set and cluster
//! - **Parallel Execution**: all (gene set, cluster) pairs are tested with rayon
//! - **Multiple Testing Correction**: BH, BY, Holm and Bonferroni, applied per cluster
//!
//! ## Module Organization
//!
//! - **[`data`]**: Expression matrix, cluster assignment and gene set containers
//! - **[`testing`]**: Fold changes, ranking, the rank-sum test and p-value correction
//! - **[`enrichment`]**: Correlation estimation, the enrichment workflow and result tables

pub mod data;
pub mod enrichment;
pub mod error;
pub mod testing;

pub use error::EnrichmentError;

//! Structural errors that abort an enrichment run.
//!
//! Public functions return `anyhow::Result`; the errors raised for structural problems are
//! built from [`EnrichmentError`] so callers can recover the kind with
//! `err.downcast_ref::<EnrichmentError>()`. Per-pair degeneracies are not errors, see
//! [`crate::testing::SkipReason`].

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnrichmentError {
    /// Fewer than two clusters, or a cluster without any cells outside of it.
    #[error("invalid clustering: {0}")]
    InvalidClustering(String),

    /// Cell identifiers of the cluster assignment do not line up with the matrix columns.
    #[error("mismatched identifiers: {0}")]
    MismatchedIdentifiers(String),

    /// The same identifier appears twice where uniqueness is required.
    #[error("duplicate {kind} identifier '{id}'")]
    DuplicateIdentifier { kind: &'static str, id: String },

    /// Bad shapes, non-finite values or out-of-range parameters.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

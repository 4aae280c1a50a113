use std::collections::HashMap;

use log::warn;

use crate::data::{ExpressionMatrix, GeneSet, GeneSetCollection};

/// Lookup from gene identifier to matrix row.
#[derive(Debug, Clone)]
pub struct GeneIndex {
    rows: HashMap<String, usize>,
}

impl GeneIndex {
    pub fn new(matrix: &ExpressionMatrix) -> Self {
        let rows = matrix
            .genes()
            .iter()
            .enumerate()
            .map(|(i, g)| (g.clone(), i))
            .collect();
        GeneIndex { rows }
    }

    pub fn get(&self, gene: &str) -> Option<usize> {
        self.rows.get(gene).copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The part of a gene set that is present in the expression matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedGeneSet {
    pub name: String,
    /// Matrix rows of the usable genes, ascending.
    pub indices: Vec<usize>,
    /// Number of distinct identifiers the set asked for.
    pub requested: usize,
}

impl MatchedGeneSet {
    pub fn usable_size(&self) -> usize {
        self.indices.len()
    }
}

pub fn match_gene_set(set: &GeneSet, index: &GeneIndex) -> MatchedGeneSet {
    let mut indices: Vec<usize> = set.genes().iter().filter_map(|g| index.get(g)).collect();
    indices.sort_unstable();

    if indices.is_empty() {
        warn!(
            "Gene set '{}' shares none of its {} genes with the expression matrix",
            set.name(),
            set.len()
        );
    }

    MatchedGeneSet {
        name: set.name().to_string(),
        indices,
        requested: set.len(),
    }
}

pub fn match_collection(sets: &GeneSetCollection, index: &GeneIndex) -> Vec<MatchedGeneSet> {
    sets.iter().map(|s| match_gene_set(s, index)).collect()
}

//! Mid-rank transformation of fold changes.

use rayon::prelude::*;

use crate::testing::effect::LogFcTable;

/// Ranks of every gene within one cluster, indexed by matrix row.
#[derive(Debug, Clone, PartialEq)]
pub struct RankTable {
    ranks: Vec<f64>,
}

impl RankTable {
    pub fn new(values: &[f64]) -> Self {
        RankTable {
            ranks: rank_ascending(values),
        }
    }

    pub fn ranks(&self) -> &[f64] {
        &self.ranks
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    /// Sum of the ranks of the given rows.
    pub fn rank_sum(&self, rows: &[usize]) -> f64 {
        rows.iter().map(|&r| self.ranks[r]).sum()
    }
}

/// Rank `values` in ascending order, giving tied values the mean of the positions they
/// occupy. `-0.0` and `0.0` are tied. The ranks always add up to `n(n + 1) / 2`.
pub fn rank_ascending(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let val = values[order[i]];
        let mut j = i + 1;

        while j < n && values[order[j]] == val {
            j += 1;
        }

        // Positions i..j (0-based) share the average of ranks i+1..=j
        let rank = (i + j + 1) as f64 / 2.0;
        for &idx in &order[i..j] {
            ranks[idx] = rank;
        }

        i = j;
    }

    ranks
}

/// Expected total of `n` ranks.
pub fn rank_total(n: usize) -> f64 {
    n as f64 * (n as f64 + 1.0) / 2.0
}

/// Rank every cluster column of the fold change table.
pub fn rank_clusters(table: &LogFcTable) -> Vec<RankTable> {
    (0..table.n_clusters())
        .into_par_iter()
        .map(|c| {
            let column: Vec<f64> = table.column(c).iter().copied().collect();
            RankTable::new(&column)
        })
        .collect()
}

//! Correlation-adjusted Wilcoxon rank-sum test for gene sets.
//!
//! Genes are ranked by fold change and the rank sum of a gene set is compared with its
//! null expectation. Genes in a set are usually co-expressed, which violates the
//! independence assumption of the plain rank-sum test, so the null variance is multiplied
//! by the variance inflation factor `1 + (m - 1) * rho` of a set of `m` genes with mean
//! pairwise correlation `rho` (the CAMERA approach).

use statrs::distribution::{ContinuousCDF, Normal};

use crate::testing::{Alternative, PairOutcome, RankSumResult, SkipReason};

/// Null moments of the rank sum of `m1` out of `n` ranked items.
///
/// Returns `(expected, variance)`, i.e. `m1 (n + 1) / 2` and `m1 m2 (n + 1) / 12`.
pub fn rank_sum_null_moments(n: usize, m1: usize) -> (f64, f64) {
    let n_f = n as f64;
    let m1_f = m1 as f64;
    let m2_f = n.saturating_sub(m1) as f64;
    let expected = m1_f * (n_f + 1.0) / 2.0;
    let variance = m1_f * m2_f * (n_f + 1.0) / 12.0;
    (expected, variance)
}

/// Classical rank-sum z-score without correlation adjustment.
///
/// Returns `None` when either group is empty.
pub fn wilcoxon_rank_sum_z(n: usize, m1: usize, rank_sum: f64) -> Option<f64> {
    if m1 == 0 || m1 >= n {
        return None;
    }
    let (expected, variance) = rank_sum_null_moments(n, m1);
    Some((rank_sum - expected) / variance.sqrt())
}

/// Variance inflation factor for `m1` genes with mean pairwise correlation `correlation`,
/// raised to `floor` if it falls below it. The flag reports whether the floor was applied.
pub fn variance_inflation_factor(m1: usize, correlation: f64, floor: f64) -> (f64, bool) {
    let vif = 1.0 + (m1 as f64 - 1.0) * correlation;
    if vif < floor {
        (floor, true)
    } else {
        (vif, false)
    }
}

/// Convert a standard normal z-score into a p-value.
pub fn normal_p_value(z: f64, alternative: Alternative) -> f64 {
    let normal = match Normal::new(0.0, 1.0) {
        Ok(normal) => normal,
        Err(_) => return f64::NAN,
    };
    match alternative {
        Alternative::TwoSided => (2.0 * normal.sf(z.abs())).min(1.0),
        Alternative::Greater => normal.sf(z),
        Alternative::Less => normal.cdf(z),
    }
}

/// Perform the correlation-adjusted rank-sum test for one gene set in one cluster.
///
/// # Arguments
///
/// * `n` - Total number of ranked genes
/// * `m1` - Number of usable genes in the set
/// * `rank_sum` - Sum of the ranks of the set genes
/// * `correlation` - Mean pairwise correlation of the set genes
/// * `vif_floor` - Lowest variance inflation factor allowed, must be positive
/// * `alternative` - Direction of the test
///
/// # Returns
///
/// [`PairOutcome::Computed`] with the z-statistic and p-value, or
/// [`PairOutcome::NotComputed`] when the set is empty, covers all genes, or the variance
/// is not a positive finite number.
pub fn correlation_adjusted_rank_sum(
    n: usize,
    m1: usize,
    rank_sum: f64,
    correlation: f64,
    vif_floor: f64,
    alternative: Alternative,
) -> PairOutcome {
    if m1 == 0 {
        return PairOutcome::NotComputed(SkipReason::EmptyGeneSet);
    }
    if m1 >= n {
        return PairOutcome::NotComputed(SkipReason::FullGeneSet);
    }
    if !correlation.is_finite() || !rank_sum.is_finite() {
        return PairOutcome::NotComputed(SkipReason::DegenerateVariance);
    }

    let (expected, null_variance) = rank_sum_null_moments(n, m1);
    let (vif, clamped) = variance_inflation_factor(m1, correlation, vif_floor);
    let variance = null_variance * vif;
    if !(variance > 0.0 && variance.is_finite()) {
        return PairOutcome::NotComputed(SkipReason::DegenerateVariance);
    }

    let z = (rank_sum - expected) / variance.sqrt();
    let p_value = normal_p_value(z, alternative);

    PairOutcome::Computed(
        RankSumResult::new(z, p_value)
            .with_rank_sum(rank_sum, expected)
            .with_variance(variance, vif, clamped),
    )
}

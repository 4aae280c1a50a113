//! Multiple testing correction for enrichment p-values.
//!
//! Correction is not part of the enrichment test itself. Each cluster is its own family
//! of tests, so [`adjust_per_cluster`] adjusts every column of an
//! [`EnrichmentResult`] separately and leaves pairs that were not computed untouched.

use anyhow::{Result, anyhow};
use ndarray::Array2;
use std::cmp::Ordering;

use crate::enrichment::EnrichmentResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionMethod {
    Bonferroni,
    Holm,
    BenjaminiHochberg,
    BenjaminiYekutieli,
}

impl CorrectionMethod {
    pub fn apply(&self, p_values: &[f64]) -> Result<Vec<f64>> {
        match self {
            CorrectionMethod::Bonferroni => bonferroni_correction(p_values),
            CorrectionMethod::Holm => holm_bonferroni_correction(p_values),
            CorrectionMethod::BenjaminiHochberg => benjamini_hochberg_correction(p_values),
            CorrectionMethod::BenjaminiYekutieli => benjamini_yekutieli_correction(p_values),
        }
    }
}

fn validate_p_values(p_values: &[f64]) -> Result<()> {
    if p_values.is_empty() {
        return Err(anyhow!("Empty p-value array"));
    }
    for (i, &p) in p_values.iter().enumerate() {
        if !(0.0..=1.0).contains(&p) {
            return Err(anyhow!("Invalid p-value at index {}: {}", i, p));
        }
    }
    Ok(())
}

fn sorted_ascending(p_values: &[f64]) -> Vec<(usize, f64)> {
    let mut indexed: Vec<(usize, f64)> = p_values.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
    indexed
}

/// Apply Bonferroni correction to p-values
///
/// Multiplies each p-value by the number of tests, capped at 1.
pub fn bonferroni_correction(p_values: &[f64]) -> Result<Vec<f64>> {
    validate_p_values(p_values)?;
    let n = p_values.len() as f64;
    Ok(p_values.iter().map(|&p| (p * n).min(1.0)).collect())
}

/// Apply the Holm step-down procedure, controlling the family-wise error rate.
pub fn holm_bonferroni_correction(p_values: &[f64]) -> Result<Vec<f64>> {
    validate_p_values(p_values)?;
    let n = p_values.len();

    let mut adjusted = vec![0.0; n];
    let mut running_max: f64 = 0.0;
    for (i, (orig_idx, p)) in sorted_ascending(p_values).into_iter().enumerate() {
        running_max = running_max.max((p * (n - i) as f64).min(1.0));
        adjusted[orig_idx] = running_max;
    }
    Ok(adjusted)
}

/// Apply Benjamini-Hochberg (BH) procedure for controlling false discovery rate
///
/// # Arguments
/// * `p_values` - A slice of p-values to adjust
///
/// # Returns
/// * `Result<Vec<f64>>` - Vector of adjusted p-values
pub fn benjamini_hochberg_correction(p_values: &[f64]) -> Result<Vec<f64>> {
    step_up(p_values, 1.0)
}

/// Apply Benjamini-Yekutieli (BY) procedure, valid under arbitrary dependence between
/// tests. Gene sets overlap, so this is the conservative choice for enrichment results.
pub fn benjamini_yekutieli_correction(p_values: &[f64]) -> Result<Vec<f64>> {
    let c_n: f64 = (1..=p_values.len()).map(|i| 1.0 / i as f64).sum();
    step_up(p_values, c_n)
}

fn step_up(p_values: &[f64], factor: f64) -> Result<Vec<f64>> {
    validate_p_values(p_values)?;
    let n = p_values.len();
    let indexed = sorted_ascending(p_values);

    let mut adjusted = vec![0.0; n];
    let mut current_min: f64 = 1.0;

    // Process from largest to smallest p-value
    for i in (0..n).rev() {
        let (orig_idx, p_val) = indexed[i];
        let rank = i + 1;
        let adjustment = (p_val * factor * n as f64 / rank as f64).min(1.0);
        current_min = adjustment.min(current_min);
        adjusted[orig_idx] = current_min;
    }

    Ok(adjusted)
}

/// Adjust the p-values of every cluster column independently.
///
/// Only computed pairs take part in the correction of their column; all other cells of
/// the returned gene set × cluster table are `NaN`.
pub fn adjust_per_cluster(result: &EnrichmentResult, method: CorrectionMethod) -> Result<Array2<f64>> {
    let (n_sets, n_clusters) = result.shape();
    let mut adjusted = Array2::from_elem((n_sets, n_clusters), f64::NAN);

    for cluster in 0..n_clusters {
        let rows: Vec<usize> = (0..n_sets)
            .filter(|&set| result.is_computed(set, cluster))
            .collect();
        if rows.is_empty() {
            continue;
        }

        let column = result.column_p_values(cluster);
        let p_values: Vec<f64> = rows.iter().map(|&set| column[set]).collect();
        let corrected = method.apply(&p_values)?;
        for (&set, value) in rows.iter().zip(corrected) {
            adjusted[[set, cluster]] = value;
        }
    }

    Ok(adjusted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MatchedGeneSet;
    use crate::enrichment::PairEstimate;
    use crate::testing::{PairOutcome, RankSumResult, SkipReason};
    use approx::assert_relative_eq;

    fn assert_vec_relative_eq(a: &[f64], b: &[f64], epsilon: f64) {
        assert_eq!(a.len(), b.len(), "Vectors have different lengths");
        for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
            if (x - y).abs() > epsilon {
                panic!("Vectors differ at index {}: {} != {}", i, x, y);
            }
        }
    }

    #[test]
    fn test_bonferroni() {
        let p_values = vec![0.01, 0.02, 0.03, 0.1, 0.2];
        let expected = vec![0.05, 0.1, 0.15, 0.5, 1.0];
        let adjusted = bonferroni_correction(&p_values).unwrap();
        assert_vec_relative_eq(&adjusted, &expected, 1e-10);
    }

    #[test]
    fn test_benjamini_hochberg_empty_input() {
        let result = benjamini_hochberg_correction(&[]);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().to_string(), "Empty p-value array");
    }

    #[test]
    fn test_benjamini_hochberg_invalid_pvalues() {
        let result = benjamini_hochberg_correction(&[0.01, -0.5, 0.03]);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Invalid p-value at index 1")
        );

        // NaN marks a pair that was not computed and must never reach a correction
        assert!(benjamini_hochberg_correction(&[0.01, f64::NAN]).is_err());
    }

    #[test]
    fn test_benjamini_hochberg_unordered_pvalues() {
        let p_values = vec![0.05, 0.01, 0.1, 0.04, 0.02];
        let expected = vec![0.0625, 0.05, 0.1, 0.0625, 0.05];
        let adjusted = benjamini_hochberg_correction(&p_values).unwrap();
        assert_vec_relative_eq(&adjusted, &expected, 1e-10);
    }

    #[test]
    fn test_benjamini_hochberg_real_example() {
        let pvalues = vec![0.1, 0.2, 0.3, 0.4, 0.1];
        let expected = [0.25, 0.3333333333333333, 0.375, 0.4, 0.25];
        let adjusted = benjamini_hochberg_correction(&pvalues).unwrap();

        for (a, e) in adjusted.iter().zip(expected.iter()) {
            assert_relative_eq!(*a, *e, epsilon = 1e-3, max_relative = 1e-3);
        }
    }

    #[test]
    fn test_benjamini_yekutieli_is_more_conservative() {
        let p_values = vec![0.001, 0.01, 0.02, 0.5];
        let bh = benjamini_hochberg_correction(&p_values).unwrap();
        let by = benjamini_yekutieli_correction(&p_values).unwrap();
        for (b, y) in bh.iter().zip(by.iter()) {
            assert!(y >= b);
        }
    }

    #[test]
    fn test_holm_bonferroni() {
        let p_values = vec![0.01, 0.02, 0.03];
        let expected = vec![0.03, 0.04, 0.04];
        let adjusted = holm_bonferroni_correction(&p_values).unwrap();
        assert_vec_relative_eq(&adjusted, &expected, 1e-10);
    }

    #[test]
    fn test_adjust_per_cluster_skips_missing_pairs() {
        let sets: Vec<MatchedGeneSet> = ["s0", "s1", "s2"]
            .iter()
            .map(|name| MatchedGeneSet {
                name: name.to_string(),
                indices: vec![0],
                requested: 1,
            })
            .collect();
        let clusters = vec!["A".to_string(), "B".to_string()];
        let computed = |set, cluster, p| PairEstimate {
            set,
            cluster,
            correlation: Some(0.0),
            outcome: PairOutcome::Computed(RankSumResult::new(1.0, p)),
        };
        let estimates = vec![
            computed(0, 0, 0.01),
            computed(1, 0, 0.04),
            PairEstimate {
                set: 2,
                cluster: 0,
                correlation: None,
                outcome: PairOutcome::NotComputed(SkipReason::EmptyGeneSet),
            },
            computed(0, 1, 0.2),
        ];
        let result = EnrichmentResult::assemble(&sets, &clusters, estimates).unwrap();

        let adjusted = adjust_per_cluster(&result, CorrectionMethod::BenjaminiHochberg).unwrap();
        assert_eq!(adjusted.dim(), (3, 2));
        // Cluster A holds two tests, cluster B only one
        assert_relative_eq!(adjusted[[0, 0]], 0.02, epsilon = 1e-12);
        assert_relative_eq!(adjusted[[1, 0]], 0.04, epsilon = 1e-12);
        assert!(adjusted[[2, 0]].is_nan());
        assert_relative_eq!(adjusted[[0, 1]], 0.2, epsilon = 1e-12);
        assert!(adjusted[[1, 1]].is_nan());
    }
}

use ndarray::Array2;
use single_enrichment::data::{ClusterAssignment, ExpressionMatrix};
use single_enrichment::enrichment::GeneSetEnrichment;
use single_enrichment::enrichment::correlation::{mean_pairwise_correlation, pearson};
use single_enrichment::testing::inference::nonparametric::correlation_adjusted_rank_sum;
use single_enrichment::testing::inference::{rank_ascending, rank_clusters};
use single_enrichment::testing::{Alternative, PairOutcome};

fn ids(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{}{}", prefix, i)).collect()
}

#[cfg(test)]
mod quick_test {
    use super::*;

    #[test]
    fn check_if_rank_sum_test_works() {
        // Set of 3 genes taking the top ranks 8, 9 and 10 out of 10, no correlation
        // E[R] = 3 * 11 / 2 = 16.5, Var = 3 * 7 * 11 / 12 = 19.25
        let outcome = correlation_adjusted_rank_sum(10, 3, 27.0, 0.0, 0.01, Alternative::TwoSided);
        let result = match outcome {
            PairOutcome::Computed(r) => r,
            other => panic!("Expected a computed result, got {:?}", other),
        };

        println!("=== RANK-SUM RESULTS ===");
        println!("Rank sum: {} (expected {})", result.rank_sum, result.expected_rank_sum);
        println!("Z-statistic: {}", result.statistic);
        println!("P-value: {}", result.p_value);

        assert!(result.p_value < 0.05);
        assert!(result.statistic > 2.0);
        assert_eq!(result.expected_rank_sum, 16.5);
    }

    #[test]
    fn check_rank_totals() {
        let patterns: Vec<Vec<f64>> = vec![
            vec![3.0, 1.0, 2.0],
            vec![1.0, 1.0, 1.0, 1.0],
            vec![0.0, -0.0, 2.5, 2.5, -1.0],
            vec![5.0],
            (0..50).map(|i| ((i * 37) % 11) as f64 * 0.5).collect(),
        ];
        for values in patterns {
            let n = values.len() as f64;
            let total: f64 = rank_ascending(&values).iter().sum();
            println!("n = {}, rank total = {}", n, total);
            assert_eq!(total, n * (n + 1.0) / 2.0);
        }
    }

    #[test]
    fn check_ranks_follow_fold_changes() {
        let dense = Array2::from_shape_fn((5, 4), |(g, c)| {
            if c < 2 { g as f64 } else { 4.0 - g as f64 }
        });
        let matrix = ExpressionMatrix::from_dense(&dense, ids("g", 5), ids("c", 4)).unwrap();
        let clusters = ClusterAssignment::new(
            ids("c", 4),
            ["X", "X", "Y", "Y"].map(String::from).to_vec(),
        )
        .unwrap();

        let table = matrix.log_fold_change(&clusters).unwrap();
        let ranks = rank_clusters(&table);
        assert_eq!(ranks.len(), 2);
        // Fold change in X is 2g - 4, increasing with the gene index
        assert_eq!(ranks[0].ranks(), &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(ranks[1].ranks(), &[5.0, 4.0, 3.0, 2.0, 1.0]);
        for r in &ranks {
            assert_eq!(r.ranks().iter().sum::<f64>(), 15.0);
        }
    }

    #[test]
    fn check_coexpression_is_detected() {
        // Four genes driven by one program within cluster A, plus one unrelated gene
        let program = [0.5, 2.0, 1.0, 3.0, 1.5];
        let dense = Array2::from_shape_fn((5, 8), |(g, c)| {
            if c >= 5 {
                0.2 * g as f64
            } else if g < 4 {
                program[c] * (1.0 + g as f64) + 0.1 * g as f64
            } else {
                [1.0, 1.0, 4.0, 0.0, 2.0][c]
            }
        });
        let matrix = ExpressionMatrix::from_dense(&dense, ids("g", 5), ids("c", 8)).unwrap();
        let labels = (0..8).map(|c| (if c < 5 { "A" } else { "B" }).to_string()).collect();
        let aligned = ClusterAssignment::new(ids("c", 8), labels)
            .unwrap()
            .align(&matrix)
            .unwrap();

        let module = mean_pairwise_correlation(&matrix, &aligned, &[0, 1, 2, 3], 0);
        println!("Mean correlation of the program genes: {}", module);
        assert!((module - 1.0).abs() < 1e-9);

        let mixed = mean_pairwise_correlation(&matrix, &aligned, &[0, 4], 0);
        let direct = pearson(&program, &[1.0, 1.0, 4.0, 0.0, 2.0]).unwrap();
        assert!((mixed - direct).abs() < 1e-9);
    }

    #[test]
    fn check_inflation_never_inflates_the_statistic() {
        let base = correlation_adjusted_rank_sum(1000, 50, 30000.0, 0.0, 0.01, Alternative::TwoSided);
        let inflated = correlation_adjusted_rank_sum(1000, 50, 30000.0, 0.05, 0.01, Alternative::TwoSided);
        let (base, inflated) = match (base, inflated) {
            (PairOutcome::Computed(b), PairOutcome::Computed(i)) => (b, i),
            other => panic!("Expected computed results, got {:?}", other),
        };
        println!("z without correlation: {}, with rho = 0.05: {}", base.statistic, inflated.statistic);
        // VIF = 1 + 49 * 0.05 = 3.45
        assert!((inflated.vif - 3.45).abs() < 1e-12);
        assert!((base.statistic / inflated.statistic - 3.45f64.sqrt()).abs() < 1e-9);
        assert!(inflated.p_value > base.p_value);
    }
}

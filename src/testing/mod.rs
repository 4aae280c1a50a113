//! Statistical building blocks for cluster-level gene set testing.
//!
//! - [`effect`]: per-gene, per-cluster log fold change
//! - [`inference`]: ranking and the correlation-adjusted rank-sum test
//! - [`correction`]: multiple testing correction, applied downstream per cluster

pub mod correction;
pub mod effect;
pub mod inference;

pub mod utils;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alternative {
    #[default]
    TwoSided,
    /// Gene set ranks lower than expected (down-regulated in the cluster).
    Less,
    /// Gene set ranks higher than expected (up-regulated in the cluster).
    Greater,
}

/// Why a (gene set, cluster) pair was not tested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No gene of the set is present in the expression matrix.
    EmptyGeneSet,
    /// Fewer usable genes than the configured minimum set size.
    BelowMinSize,
    /// The set covers every measured gene, leaving nothing to compare against.
    FullGeneSet,
    /// The inflated variance is not a positive finite number.
    DegenerateVariance,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankSumResult {
    /// The z-statistic; positive when the set is shifted towards high fold changes
    pub statistic: f64,
    /// The p-value of the test
    pub p_value: f64,
    /// Observed sum of ranks of the set genes
    pub rank_sum: f64,
    /// Rank sum expected under the null hypothesis
    pub expected_rank_sum: f64,
    /// Null variance after inflation
    pub variance: f64,
    /// Variance inflation factor actually applied
    pub vif: f64,
    /// Whether the inflation factor was raised to the configured floor
    pub vif_clamped: bool,
}

impl RankSumResult {
    pub fn new(statistic: f64, p_value: f64) -> Self {
        RankSumResult {
            statistic,
            p_value,
            rank_sum: f64::NAN,
            expected_rank_sum: f64::NAN,
            variance: f64::NAN,
            vif: 1.0,
            vif_clamped: false,
        }
    }

    pub fn with_rank_sum(mut self, observed: f64, expected: f64) -> Self {
        self.rank_sum = observed;
        self.expected_rank_sum = expected;
        self
    }

    pub fn with_variance(mut self, variance: f64, vif: f64, clamped: bool) -> Self {
        self.variance = variance;
        self.vif = vif;
        self.vif_clamped = clamped;
        self
    }

    /// Check if the result is statistically significant at the given threshold
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Outcome of testing one gene set in one cluster.
#[derive(Debug, Clone, PartialEq)]
pub enum PairOutcome {
    Computed(RankSumResult),
    NotComputed(SkipReason),
}

impl PairOutcome {
    pub fn result(&self) -> Option<&RankSumResult> {
        match self {
            PairOutcome::Computed(r) => Some(r),
            PairOutcome::NotComputed(_) => None,
        }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, PairOutcome::Computed(_))
    }
}

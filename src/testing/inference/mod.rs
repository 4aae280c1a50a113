pub mod nonparametric;

pub mod ranks;

pub use nonparametric::{correlation_adjusted_rank_sum, wilcoxon_rank_sum_z};
pub use ranks::{rank_ascending, rank_clusters, RankTable};

use crate::error::EnrichmentError;
use crate::testing::Alternative;

/// Source of the inter-gene correlation used for variance inflation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CorrelationMode {
    /// Mean pairwise Pearson correlation of the set genes within each cluster.
    Estimate,
    /// The same preset correlation for every gene set and cluster.
    Fixed(f64),
}

/// Parameters of an enrichment run.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentConfig {
    /// Direction of the test
    pub alternative: Alternative,
    /// How the inter-gene correlation is obtained
    pub correlation: CorrelationMode,
    /// Lowest variance inflation factor; smaller factors are raised to it
    pub vif_floor: f64,
    /// Gene sets with fewer usable genes are not tested
    pub min_set_size: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        EnrichmentConfig {
            alternative: Alternative::TwoSided,
            correlation: CorrelationMode::Estimate,
            vif_floor: 0.01,
            min_set_size: 1,
        }
    }
}

impl EnrichmentConfig {
    pub fn with_alternative(mut self, alternative: Alternative) -> Self {
        self.alternative = alternative;
        self
    }

    pub fn with_correlation(mut self, correlation: CorrelationMode) -> Self {
        self.correlation = correlation;
        self
    }

    pub fn with_vif_floor(mut self, vif_floor: f64) -> Self {
        self.vif_floor = vif_floor;
        self
    }

    pub fn with_min_set_size(mut self, min_set_size: usize) -> Self {
        self.min_set_size = min_set_size;
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.vif_floor > 0.0 && self.vif_floor.is_finite()) {
            return Err(EnrichmentError::InvalidInput(format!(
                "vif_floor must be a positive finite number, got {}",
                self.vif_floor
            ))
            .into());
        }
        if let CorrelationMode::Fixed(rho) = self.correlation {
            if !(-1.0..=1.0).contains(&rho) {
                return Err(EnrichmentError::InvalidInput(format!(
                    "fixed inter-gene correlation must lie in [-1, 1], got {}",
                    rho
                ))
                .into());
            }
        }
        if self.min_set_size == 0 {
            return Err(EnrichmentError::InvalidInput(
                "min_set_size must be at least 1".to_string(),
            )
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EnrichmentConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_parameters() {
        let base = EnrichmentConfig::default();
        assert!(base.clone().with_vif_floor(0.0).validate().is_err());
        assert!(base.clone().with_vif_floor(f64::NAN).validate().is_err());
        assert!(base.clone().with_correlation(CorrelationMode::Fixed(1.5)).validate().is_err());
        assert!(base.clone().with_correlation(CorrelationMode::Fixed(f64::NAN)).validate().is_err());
        assert!(base.with_min_set_size(0).validate().is_err());
    }
}

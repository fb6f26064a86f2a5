//! Analysis configuration.
//!
//! There is no configuration file. The C entry points always use
//! [`AnalysisConfig::default`]; the `pitch-analyzer` binary maps its flags
//! onto the same struct.

use crate::estimator::EstimatorOptions;

/// Settings for one [`Analyzer`](crate::analysis::Analyzer).
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Autocorrelation estimator parameters.
    pub estimator: EstimatorOptions,
    /// Compute the four features as parallel tasks (default: true).
    pub parallel_features: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            estimator: EstimatorOptions::default(),
            parallel_features: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.estimator.frame_period, 5.0);
        assert_eq!(config.estimator.f0_floor, 71.0);
        assert_eq!(config.estimator.f0_ceil, 800.0);
        assert!(config.parallel_features);
    }
}

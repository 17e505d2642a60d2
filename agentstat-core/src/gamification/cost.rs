//! Token cost estimation.

use crate::config::MetricsConfig;

/// Per-1000-token USD rates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenPricing {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

impl Default for TokenPricing {
    fn default() -> Self {
        Self {
            input_per_1k: 0.003,
            output_per_1k: 0.015,
        }
    }
}

impl From<&MetricsConfig> for TokenPricing {
    fn from(config: &MetricsConfig) -> Self {
        Self {
            input_per_1k: config.input_cost_per_1k,
            output_per_1k: config.output_cost_per_1k,
        }
    }
}

impl TokenPricing {
    /// Estimated USD cost of one invocation.
    pub fn estimate(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 / 1000.0) * self.input_per_1k
            + (output_tokens as f64 / 1000.0) * self.output_per_1k
    }
}

/// Estimate cost with the default rates.
pub fn estimate_cost_usd(input_tokens: u64, output_tokens: u64) -> f64 {
    TokenPricing::default().estimate(input_tokens, output_tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rates() {
        assert!((estimate_cost_usd(1000, 500) - 0.0105).abs() < 1e-12);
        assert_eq!(estimate_cost_usd(0, 0), 0.0);
        assert!((estimate_cost_usd(1_000_000, 0) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_configured_rates() {
        let config = MetricsConfig {
            input_cost_per_1k: 0.01,
            output_cost_per_1k: 0.03,
            ..Default::default()
        };
        let pricing = TokenPricing::from(&config);
        assert!((pricing.estimate(2000, 1000) - 0.05).abs() < 1e-12);
    }
}

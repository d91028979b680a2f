use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{EngineError, Result};

/// tolerances and limits shared by every component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// largest shortfall between planned cash flow and price that still validates
    pub shortfall_tolerance: Money,
    /// largest overpayment, as a fraction of the price, that still validates
    pub overpayment_tolerance: Rate,
    /// largest gap between a payment and an installment amount for inferred linking
    pub link_tolerance: Money,
    /// gap between plan price and plot price that raises an intake warning
    pub price_divergence_tolerance: Money,
    /// longest accepted plan tenure
    pub max_tenure_months: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            shortfall_tolerance: Money::from_major(1_000),
            overpayment_tolerance: Rate::from_decimal(dec!(0.05)),
            link_tolerance: Money::from_major(1_000),
            price_divergence_tolerance: Money::from_major(1_000),
            max_tenure_months: 120,
        }
    }
}

impl EngineConfig {
    /// configuration that accepts only exact plans and exact payment matches
    pub fn strict() -> Self {
        Self {
            shortfall_tolerance: Money::ZERO,
            overpayment_tolerance: Rate::ZERO,
            link_tolerance: Money::ZERO,
            price_divergence_tolerance: Money::ZERO,
            max_tenure_months: 120,
        }
    }

    /// parse from json, missing fields fall back to defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let money_fields = [
            ("shortfall_tolerance", self.shortfall_tolerance),
            ("link_tolerance", self.link_tolerance),
            ("price_divergence_tolerance", self.price_divergence_tolerance),
        ];
        for (name, value) in money_fields {
            if value.is_negative() {
                return Err(EngineError::InvalidConfiguration {
                    message: format!("{} cannot be negative: {}", name, value),
                });
            }
        }

        if self.overpayment_tolerance < Rate::ZERO || self.overpayment_tolerance > Rate::ONE {
            return Err(EngineError::InvalidConfiguration {
                message: format!(
                    "overpayment_tolerance must be between 0% and 100%: {}",
                    self.overpayment_tolerance
                ),
            });
        }

        if self.max_tenure_months == 0 {
            return Err(EngineError::InvalidConfiguration {
                message: "max_tenure_months must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tolerances() {
        let config = EngineConfig::default();
        assert_eq!(config.shortfall_tolerance, Money::from_major(1_000));
        assert_eq!(config.overpayment_tolerance, Rate::from_percentage(5));
        assert_eq!(config.link_tolerance, Money::from_major(1_000));
        assert_eq!(config.max_tenure_months, 120);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json(r#"{ "link_tolerance": "250" }"#).unwrap();
        assert_eq!(config.link_tolerance, Money::from_major(250));
        assert_eq!(config.shortfall_tolerance, Money::from_major(1_000));
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let err = EngineConfig::from_json(r#"{ "shortfall_tolerance": "-1" }"#).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfiguration { .. }));

        let err = EngineConfig::from_json(r#"{ "overpayment_tolerance": "1.5" }"#).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfiguration { .. }));

        let err = EngineConfig::from_json(r#"{ "max_tenure_months": 0 }"#).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_malformed_json() {
        let err = EngineConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, EngineError::MalformedConfiguration(_)));
    }
}

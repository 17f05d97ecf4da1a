use serde::Deserialize;

use crate::error::ReconError;

/// Excel's sheet-name length limit.
const MAX_SHEET_NAME_LEN: usize = 31;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Formula and report constants. `Default` reproduces the standard rules;
/// a TOML file may override any subset.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconConfig {
    /// Share of an office's total margin that forms its bonus pool.
    pub pool_rate: f64,
    /// Which margin sum `pool_rate` is applied to.
    pub pool_basis: PoolBasis,
    /// Collection-ratio tiers, evaluated top-down.
    pub tiers: Vec<Tier>,
    /// Fail instead of warning when only a TOTALE margin row exists.
    pub strict_margin_row: bool,
    pub report: ReportConfig,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            pool_rate: 0.05,
            pool_basis: PoolBasis::default(),
            tiers: vec![
                Tier { min_ratio: 0.9, k: 1.0 },
                Tier { min_ratio: 0.8, k: 0.8 },
                Tier { min_ratio: 0.7, k: 0.5 },
            ],
            strict_margin_row: false,
            report: ReportConfig::default(),
        }
    }
}

/// Margin sum the pool is computed from. Allocation weights always use
/// positive margins only, and the pool is never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolBasis {
    /// Positive margins only.
    #[default]
    PositiveMargin,
    /// All finite margins, losses included; floored at zero.
    NetMargin,
}

// ---------------------------------------------------------------------------
// Tiers
// ---------------------------------------------------------------------------

/// A ratio at or above `min_ratio` earns coefficient `k`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Tier {
    pub min_ratio: f64,
    pub k: f64,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub sheet_name: String,
    pub currency_symbol: String,
    /// Collection ratios at or above this are filled green.
    pub ratio_green_threshold: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            sheet_name: "Confronto".into(),
            currency_symbol: "€".into(),
            ratio_green_threshold: 0.70,
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing + validation
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if !self.pool_rate.is_finite() || self.pool_rate < 0.0 {
            return Err(ReconError::ConfigValidation(format!(
                "pool_rate must be a non-negative number, got {}",
                self.pool_rate
            )));
        }

        if self.tiers.is_empty() {
            return Err(ReconError::ConfigValidation("at least one tier is required".into()));
        }

        for (i, tier) in self.tiers.iter().enumerate() {
            if !(0.0..=1.0).contains(&tier.min_ratio) {
                return Err(ReconError::ConfigValidation(format!(
                    "tier {}: min_ratio must be within [0, 1], got {}",
                    i + 1,
                    tier.min_ratio
                )));
            }
            if !tier.k.is_finite() || tier.k < 0.0 {
                return Err(ReconError::ConfigValidation(format!(
                    "tier {}: k must be a non-negative number, got {}",
                    i + 1,
                    tier.k
                )));
            }
        }

        // Top-down evaluation only makes sense for strictly descending thresholds
        if self.tiers.windows(2).any(|w| w[1].min_ratio >= w[0].min_ratio) {
            return Err(ReconError::ConfigValidation(
                "tiers must be listed by strictly descending min_ratio".into(),
            ));
        }

        self.report.validate()
    }

    /// Coefficient for an already-clamped ratio; 0 below the lowest tier.
    pub fn tier_coefficient(&self, ratio: f64) -> f64 {
        self.tiers
            .iter()
            .find(|tier| ratio >= tier.min_ratio)
            .map(|tier| tier.k)
            .unwrap_or(0.0)
    }
}

impl ReportConfig {
    pub fn validate(&self) -> Result<(), ReconError> {
        let name = self.sheet_name.trim();
        if name.is_empty() {
            return Err(ReconError::ConfigValidation("report.sheet_name must not be empty".into()));
        }
        if name.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(ReconError::ConfigValidation(format!(
                "report.sheet_name must be at most {MAX_SHEET_NAME_LEN} characters"
            )));
        }
        if name.contains(['[', ']', ':', '*', '?', '/', '\\']) {
            return Err(ReconError::ConfigValidation(format!(
                "report.sheet_name '{name}' contains a character Excel does not allow"
            )));
        }
        if !self.ratio_green_threshold.is_finite() {
            return Err(ReconError::ConfigValidation(
                "report.ratio_green_threshold must be a number".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_default() {
        let config = ReconConfig::from_toml("").unwrap();
        assert_eq!(config, ReconConfig::default());
    }

    #[test]
    fn default_tiers_match_table() {
        let config = ReconConfig::default();
        assert_eq!(config.tier_coefficient(0.95), 1.0);
        assert_eq!(config.tier_coefficient(0.9), 1.0);
        assert_eq!(config.tier_coefficient(0.85), 0.8);
        assert_eq!(config.tier_coefficient(0.75), 0.5);
        assert_eq!(config.tier_coefficient(0.7), 0.5);
        assert_eq!(config.tier_coefficient(0.65), 0.0);
        assert_eq!(config.tier_coefficient(0.0), 0.0);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = ReconConfig::from_toml(
            r#"
pool_rate = 0.1

[report]
currency_symbol = "EUR"
"#,
        )
        .unwrap();
        assert_eq!(config.pool_rate, 0.1);
        assert_eq!(config.tiers, ReconConfig::default().tiers);
        assert_eq!(config.report.currency_symbol, "EUR");
        assert_eq!(config.report.sheet_name, "Confronto");
    }

    #[test]
    fn custom_tiers() {
        let config = ReconConfig::from_toml(
            r#"
[[tiers]]
min_ratio = 0.5
k = 2.0
"#,
        )
        .unwrap();
        assert_eq!(config.tier_coefficient(0.6), 2.0);
        assert_eq!(config.tier_coefficient(0.4), 0.0);
    }

    #[test]
    fn rejects_unsorted_tiers() {
        let err = ReconConfig::from_toml(
            r#"
[[tiers]]
min_ratio = 0.7
k = 0.5

[[tiers]]
min_ratio = 0.9
k = 1.0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ReconError::ConfigValidation(_)), "{err}");
    }

    #[test]
    fn rejects_negative_pool_rate() {
        let err = ReconConfig::from_toml("pool_rate = -0.05").unwrap_err();
        assert!(err.to_string().contains("pool_rate"));
    }

    #[test]
    fn rejects_bad_sheet_name() {
        let err = ReconConfig::from_toml("[report]\nsheet_name = \"a/b\"").unwrap_err();
        assert!(matches!(err, ReconError::ConfigValidation(_)));
    }

    #[test]
    fn pool_basis_from_toml() {
        let config = ReconConfig::from_toml("pool_basis = \"positive_margin\"").unwrap();
        assert_eq!(config.pool_basis, PoolBasis::PositiveMargin);
        assert_eq!(ReconConfig::default().pool_basis, PoolBasis::PositiveMargin);

        let config = ReconConfig::from_toml("pool_basis = \"net_margin\"").unwrap();
        assert_eq!(config.pool_basis, PoolBasis::NetMargin);

        let err = ReconConfig::from_toml("pool_basis = \"gross\"").unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = ReconConfig::from_toml("pool = 1").unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }
}

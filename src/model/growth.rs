use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::io::population::normalize_city;

pub const DEFAULT_BASE_YEAR: i64 = 2025;
pub const DEFAULT_RATE: f64 = 0.012; // 1.2% per year
pub const DEFAULT_BASE_POPULATION: f64 = 100_000.0;

/// Compound-growth parameters. Independent of the CSV dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthConfig {
    pub base_year: i64,
    pub rate: f64,
    /// Base population for cities not in `base_population`.
    pub default_base: f64,
    /// Population at `base_year`, keyed by normalized city name.
    pub base_population: BTreeMap<String, f64>,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        let base_population = [
            ("Tirupur", 900_000.0),
            ("Chennai", 7_200_000.0),
            ("Coimbatore", 2_200_000.0),
            ("Madurai", 1_600_000.0),
        ]
        .into_iter()
        .map(|(c, p)| (c.to_string(), p))
        .collect();
        Self {
            base_year: DEFAULT_BASE_YEAR,
            rate: DEFAULT_RATE,
            default_base: DEFAULT_BASE_POPULATION,
            base_population,
        }
    }
}

impl GrowthConfig {
    pub fn check(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.rate.is_finite() && self.rate > -1.0, "rate must be finite and > -1");
        anyhow::ensure!(self.default_base >= 0.0, "default_base must be >= 0");
        anyhow::ensure!(
            self.base_population.values().all(|p| *p >= 0.0),
            "base populations must be >= 0"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct GrowthModel {
    pub cfg: GrowthConfig,
}

impl GrowthModel {
    pub fn new(cfg: GrowthConfig) -> anyhow::Result<Self> {
        cfg.check()?;
        let base_population = cfg
            .base_population
            .into_iter()
            .map(|(c, p)| (normalize_city(&c), p))
            .collect();
        Ok(Self {
            cfg: GrowthConfig {
                base_population,
                ..cfg
            },
        })
    }

    /// `base * (1 + rate)^(year - base_year)`, truncated toward zero.
    pub fn predict(&self, city: &str, year: i64) -> i64 {
        let base = self
            .cfg
            .base_population
            .get(&normalize_city(city))
            .copied()
            .unwrap_or(self.cfg.default_base);
        let exponent = year.saturating_sub(self.cfg.base_year) as f64;
        (base * (1.0 + self.cfg.rate).powf(exponent)).trunc() as i64
    }
}

/// Growth forecast with the built-in base table, 2025 base year and 1.2% rate.
pub fn predict_growth(city: &str, year: i64) -> i64 {
    GrowthModel::default().predict(city, year)
}

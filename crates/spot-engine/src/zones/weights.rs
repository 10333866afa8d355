//! Zone score weights and named presets

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Weights applied to the five 0-100 zone sub-scores.
///
/// They sum to about 1.0 by convention; nothing enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub availability: f64,
    pub capacity: f64,
    pub price: f64,
    pub stability: f64,
    pub interruption: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self::balanced()
    }
}

impl ScoreWeights {
    pub fn balanced() -> Self {
        Self {
            availability: 0.25,
            capacity: 0.25,
            price: 0.20,
            stability: 0.15,
            interruption: 0.15,
        }
    }

    /// Favour zones with spare capacity
    pub fn high_availability() -> Self {
        Self {
            availability: 0.20,
            capacity: 0.40,
            price: 0.15,
            stability: 0.10,
            interruption: 0.15,
        }
    }

    /// Favour cheap zones
    pub fn cost_optimized() -> Self {
        Self {
            availability: 0.20,
            capacity: 0.15,
            price: 0.35,
            stability: 0.15,
            interruption: 0.15,
        }
    }

    pub fn total(&self) -> f64 {
        self.availability + self.capacity + self.price + self.stability + self.interruption
    }
}

/// Named weight presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WeightPreset {
    #[default]
    Balanced,
    HighAvailability,
    CostOptimized,
}

impl WeightPreset {
    pub fn weights(&self) -> ScoreWeights {
        match self {
            WeightPreset::Balanced => ScoreWeights::balanced(),
            WeightPreset::HighAvailability => ScoreWeights::high_availability(),
            WeightPreset::CostOptimized => ScoreWeights::cost_optimized(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WeightPreset::Balanced => "balanced",
            WeightPreset::HighAvailability => "high-availability",
            WeightPreset::CostOptimized => "cost-optimized",
        }
    }
}

impl fmt::Display for WeightPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown weight preset '{0}' (expected balanced, high-availability or cost-optimized)")]
pub struct UnknownPreset(pub String);

impl FromStr for WeightPreset {
    type Err = UnknownPreset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "balanced" | "default" => Ok(WeightPreset::Balanced),
            "high-availability" | "availability" | "capacity" => Ok(WeightPreset::HighAvailability),
            "cost-optimized" | "cost" | "low-cost" => Ok(WeightPreset::CostOptimized),
            _ => Err(UnknownPreset(s.to_string())),
        }
    }
}

impl FromStr for ScoreWeights {
    type Err = UnknownPreset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<WeightPreset>().map(|p| p.weights())
    }
}

//! History-aware score adjustment
//!
//! Five secondary factors (price volatility, price trend, capacity pool
//! breadth, time-of-day consistency and popularity) are combined and blended
//! into the base score, after which the list is re-ranked. Factors come from
//! price history when the instance type has some, and are estimated from
//! instance traits otherwise. Popularity always comes from spot data.

use super::rank::rank_and_truncate;
use crate::models::{
    EnhancedFactors, EnhancedScore, InstanceAnalysis, InstanceCategory, InstanceGeneration,
    InterruptionFrequency,
};
use crate::providers::PriceAnalysis;
use std::collections::{BTreeMap, HashMap};

/// Share of the final score kept from the base score
pub const BASE_WEIGHT: f64 = 0.60;
/// Share of the final score taken from the combined factors
pub const ENHANCED_WEIGHT: f64 = 0.40;

const VOLATILITY_WEIGHT: f64 = 0.25;
const TREND_WEIGHT: f64 = 0.20;
const CAPACITY_POOL_WEIGHT: f64 = 0.20;
const TIME_PATTERN_WEIGHT: f64 = 0.20;
const POPULARITY_WEIGHT: f64 = 0.15;

/// Coefficient-of-variation ceilings for the history volatility factor
const VOLATILITY_BANDS: [(f64, f64); 4] = [(0.05, 0.95), (0.10, 0.85), (0.20, 0.70), (0.35, 0.50)];
const VOLATILE_FACTOR: f64 = 0.30;

/// Hourly coefficient-of-variation ceilings for the time pattern factor
const HOURLY_BANDS: [(f64, f64); 3] = [(0.02, 0.95), (0.05, 0.80), (0.10, 0.65)];
const HOURLY_VARIABLE_FACTOR: f64 = 0.50;
const NO_PATTERN_FACTOR: f64 = 0.60;

/// Families offered in nearly every zone of a region
const MAINSTREAM_FAMILIES: [&str; 12] = [
    "m5", "m6i", "m6a", "m7i", "c5", "c6i", "c6a", "c7i", "r5", "r6i", "r6a", "r7i",
];

/// Regions with many zones
const LARGE_REGIONS: [&str; 5] = [
    "us-east-1",
    "us-west-2",
    "eu-west-1",
    "eu-central-1",
    "ap-northeast-1",
];

const ARM64: &str = "arm64";

pub fn blend(base_score: f64, combined: f64) -> f64 {
    base_score * BASE_WEIGHT + combined * ENHANCED_WEIGHT
}

pub fn combine(f: &EnhancedFactors) -> f64 {
    f.volatility * VOLATILITY_WEIGHT
        + f.trend * TREND_WEIGHT
        + f.capacity_pool * CAPACITY_POOL_WEIGHT
        + f.time_pattern * TIME_PATTERN_WEIGHT
        + f.popularity * POPULARITY_WEIGHT
}

fn band_index(band: InterruptionFrequency) -> u8 {
    match band {
        InterruptionFrequency::VeryLow => 0,
        InterruptionFrequency::Low => 1,
        InterruptionFrequency::Medium => 2,
        InterruptionFrequency::High => 3,
        InterruptionFrequency::VeryHigh => 4,
    }
}

pub fn history_volatility_factor(volatility: f64) -> f64 {
    VOLATILITY_BANDS
        .iter()
        .find(|(ceiling, _)| volatility <= *ceiling)
        .map(|(_, factor)| *factor)
        .unwrap_or(VOLATILE_FACTOR)
}

/// Falling prices score above 0.5, rising prices below
pub fn history_trend_factor(trend_score: f64) -> f64 {
    (0.5 - trend_score * 0.4).clamp(0.0, 1.0)
}

pub fn history_time_pattern_factor(hourly: &BTreeMap<u8, f64>) -> f64 {
    if hourly.len() < 2 {
        return NO_PATTERN_FACTOR;
    }
    let n = hourly.len() as f64;
    let avg = hourly.values().sum::<f64>() / n;
    if avg <= 0.0 {
        return HOURLY_BANDS[0].1;
    }
    let variance = hourly.values().map(|p| (p - avg).powi(2)).sum::<f64>() / n;
    let cv = variance.sqrt() / avg;
    HOURLY_BANDS
        .iter()
        .find(|(ceiling, _)| cv <= *ceiling)
        .map(|(_, factor)| *factor)
        .unwrap_or(HOURLY_VARIABLE_FACTOR)
}

pub fn history_capacity_pool_factor(history: &PriceAnalysis) -> f64 {
    let mut score: f64 = 0.7;
    if !history.per_zone.is_empty() {
        score += 0.1;
    }
    score += match history.data_points {
        n if n >= 500 => 0.15,
        n if n >= 100 => 0.10,
        n if n >= 50 => 0.05,
        _ => 0.0,
    };
    score.clamp(0.0, 1.0)
}

pub fn estimated_volatility_factor(analysis: &InstanceAnalysis) -> f64 {
    let specs = &analysis.specs;
    let mut score: f64 = 0.7;
    score += match specs.generation {
        InstanceGeneration::Current => 0.2,
        InstanceGeneration::Previous => 0.1,
        InstanceGeneration::Legacy => -0.1,
        InstanceGeneration::Deprecated => -0.3,
        InstanceGeneration::Unknown => 0.0,
    };
    if specs.vcpu >= 16 {
        score += 0.1;
    } else if specs.vcpu <= 2 {
        score -= 0.1;
    }
    score += match specs.category {
        InstanceCategory::StorageOptimized => 0.1,
        InstanceCategory::MemoryOptimized => 0.05,
        _ => 0.0,
    };
    if specs.architecture == ARM64 {
        score += 0.1;
    }
    score.clamp(0.0, 1.0)
}

pub fn estimated_trend_factor(analysis: &InstanceAnalysis) -> f64 {
    let band = band_index(analysis.spot_data.interruption_frequency);
    let mut score: f64 = match analysis.specs.generation {
        InstanceGeneration::Current if band <= 1 => 0.85,
        InstanceGeneration::Current => 0.7,
        InstanceGeneration::Previous => 0.6,
        _ => 0.5,
    };
    if band >= 3 {
        score -= 0.2;
    }
    score.clamp(0.0, 1.0)
}

pub fn estimated_capacity_pool_factor(analysis: &InstanceAnalysis, region: &str) -> f64 {
    let specs = &analysis.specs;
    let family = specs
        .instance_type
        .split('.')
        .next()
        .unwrap_or(&specs.instance_type);

    let mut score: f64 = 0.7;
    if MAINSTREAM_FAMILIES.contains(&family) {
        score += 0.2;
    }
    if specs.architecture == ARM64 && specs.generation == InstanceGeneration::Current {
        score += 0.1;
    }
    if LARGE_REGIONS.contains(&region) {
        score += 0.1;
    }
    score.clamp(0.0, 1.0)
}

pub fn estimated_time_pattern_factor(band: InterruptionFrequency) -> f64 {
    match band {
        InterruptionFrequency::VeryLow => 0.95,
        InterruptionFrequency::Low => 0.85,
        InterruptionFrequency::Medium => 0.70,
        InterruptionFrequency::High => 0.50,
        InterruptionFrequency::VeryHigh => 0.30,
    }
}

/// High savings with a stable band marks under-used capacity
pub fn popularity_factor(analysis: &InstanceAnalysis) -> f64 {
    let savings = f64::from(analysis.spot_data.savings_percent) / 100.0;
    let stability = 1.0 - f64::from(band_index(analysis.spot_data.interruption_frequency)) / 4.0;
    if stability < 0.75 {
        0.5
    } else if savings >= 0.7 {
        0.95
    } else if savings >= 0.6 {
        0.85
    } else {
        0.7
    }
}

fn insights(f: &EnhancedFactors, from_history: bool) -> Vec<String> {
    let mut out = Vec::new();
    if from_history {
        out.push("Factors derived from observed price history".to_string());
    }
    if f.volatility >= 0.85 {
        out.push("Stable pricing with minimal fluctuation".to_string());
    } else if f.volatility <= 0.5 {
        out.push("Volatile pricing; consider setting a max price".to_string());
    }
    if f.popularity >= 0.9 {
        out.push("High savings with low interruption suggest under-used capacity".to_string());
    }
    if f.trend >= 0.8 {
        out.push("Availability has held steady over time".to_string());
    } else if f.trend <= 0.4 {
        out.push("Demand is rising; expect more interruptions".to_string());
    }
    if f.capacity_pool >= 0.85 {
        out.push("Widely available across zones for multi-AZ setups".to_string());
    }
    if f.time_pattern >= 0.9 {
        out.push("Consistent regardless of time of day".to_string());
    } else if f.time_pattern <= 0.5 {
        out.push("Time sensitive; prefer off-peak hours".to_string());
    }
    if f.combined >= 0.85 {
        out.push("Top pick on every secondary factor".to_string());
    } else if f.combined >= 0.7 {
        out.push("Good overall profile for spot workloads".to_string());
    } else if f.combined <= 0.5 {
        out.push("Use with caution and diversify instance types".to_string());
    }
    out
}

/// Computes secondary factors and re-ranks a scored list
#[derive(Debug, Clone, Copy, Default)]
pub struct EnhancedScorer;

impl EnhancedScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn factors(
        &self,
        analysis: &InstanceAnalysis,
        region: &str,
        history: Option<&PriceAnalysis>,
    ) -> EnhancedFactors {
        let mut f = match history {
            Some(h) => EnhancedFactors {
                volatility: history_volatility_factor(h.volatility),
                trend: history_trend_factor(h.trend_score()),
                capacity_pool: history_capacity_pool_factor(h),
                time_pattern: history_time_pattern_factor(&h.hourly_pattern),
                ..Default::default()
            },
            None => EnhancedFactors {
                volatility: estimated_volatility_factor(analysis),
                trend: estimated_trend_factor(analysis),
                capacity_pool: estimated_capacity_pool_factor(analysis, region),
                time_pattern: estimated_time_pattern_factor(analysis.spot_data.interruption_frequency),
                ..Default::default()
            },
        };
        f.popularity = popularity_factor(analysis);
        f.combined = combine(&f);
        f
    }

    /// Blend every analysis with its factors and re-rank the list
    pub fn apply(
        &self,
        analyses: Vec<InstanceAnalysis>,
        region: &str,
        history: &HashMap<String, PriceAnalysis>,
    ) -> Vec<InstanceAnalysis> {
        let len = analyses.len();
        let rescored = analyses
            .into_iter()
            .map(|mut analysis| {
                let h = history.get(&analysis.specs.instance_type);
                let factors = self.factors(&analysis, region, h);
                let base_score = analysis.score;
                analysis.score = blend(base_score, factors.combined);
                analysis.enhanced = Some(EnhancedScore {
                    base_score,
                    factors,
                    from_history: h.is_some(),
                    insights: insights(&factors, h.is_some()),
                });
                analysis
            })
            .collect();
        rank_and_truncate(rescored, len)
    }
}

//! Composite instance scorer
//!
//! Five sub-scores in [0, 1] are combined with fixed weights; the
//! generation penalty and the burstable penalty are subtracted afterwards.
//! Lookup tables are kept as ordered constants so thresholds can be
//! reviewed and tested on their own.

use crate::models::{
    InstanceGeneration, InstanceSpecs, InterruptionFrequency, ScoreBreakdown, SpotData,
    UsageRequirements,
};
use serde::{Deserialize, Serialize};

/// Stability score per interruption band
pub const STABILITY_TABLE: [(InterruptionFrequency, f64); 5] = [
    (InterruptionFrequency::VeryLow, 1.0),
    (InterruptionFrequency::Low, 0.8),
    (InterruptionFrequency::Medium, 0.6),
    (InterruptionFrequency::High, 0.4),
    (InterruptionFrequency::VeryHigh, 0.2),
];

/// Fraction of the maximum generation penalty per generation
pub const GENERATION_PENALTY_TABLE: [(InstanceGeneration, f64); 5] = [
    (InstanceGeneration::Current, 0.0),
    (InstanceGeneration::Previous, 0.3),
    (InstanceGeneration::Legacy, 0.7),
    (InstanceGeneration::Deprecated, 1.0),
    (InstanceGeneration::Unknown, 1.0),
];

/// Savings percent treated as the realistic ceiling
const SAVINGS_CEILING: f64 = 90.0;

/// Weights and thresholds of the composite score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub savings_weight: f64,
    pub stability_weight: f64,
    pub fitness_weight: f64,
    pub value_weight: f64,
    pub generation_penalty_max: f64,
    pub burstable_penalty: f64,
    /// Instances scoring below this are dropped before ranking
    pub min_viable_score: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            savings_weight: 0.30,
            stability_weight: 0.25,
            fitness_weight: 0.25,
            value_weight: 0.20,
            generation_penalty_max: 0.15,
            burstable_penalty: 0.10,
            min_viable_score: 0.3,
        }
    }
}

impl ScoringPolicy {
    pub fn with_min_viable_score(mut self, threshold: f64) -> Self {
        self.min_viable_score = threshold;
        self
    }
}

/// Computes composite scores under a [`ScoringPolicy`]
#[derive(Debug, Clone, Copy, Default)]
pub struct Scorer {
    policy: ScoringPolicy,
}

impl Scorer {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    pub fn is_viable(&self, score: f64) -> bool {
        score >= self.policy.min_viable_score
    }

    /// Score one instance, returning the clamped total and its components
    pub fn score_instance(
        &self,
        specs: &InstanceSpecs,
        spot: &SpotData,
        req: &UsageRequirements,
    ) -> (f64, ScoreBreakdown) {
        let p = &self.policy;
        let breakdown = ScoreBreakdown {
            savings_score: savings_score(spot.savings_percent),
            stability_score: stability_score(spot.interruption_frequency),
            fitness_score: fitness_score(specs, req),
            value_score: value_score(specs, spot, req),
            generation_penalty: generation_penalty(specs.generation, p.generation_penalty_max),
        };

        let mut total = breakdown.savings_score * p.savings_weight
            + breakdown.stability_score * p.stability_weight
            + breakdown.fitness_score * p.fitness_weight
            + breakdown.value_score * p.value_weight
            - breakdown.generation_penalty;

        if specs.is_burstable && !req.allow_burstable {
            total -= p.burstable_penalty;
        }

        (total.clamp(0.0, 1.0), breakdown)
    }
}

pub fn savings_score(savings_percent: u8) -> f64 {
    (f64::from(savings_percent) / SAVINGS_CEILING).min(1.0)
}

pub fn stability_score(band: InterruptionFrequency) -> f64 {
    STABILITY_TABLE
        .iter()
        .find(|(b, _)| *b == band)
        .map(|(_, v)| *v)
        .unwrap_or(0.0)
}

pub fn generation_penalty(generation: InstanceGeneration, max: f64) -> f64 {
    let fraction = GENERATION_PENALTY_TABLE
        .iter()
        .find(|(g, _)| *g == generation)
        .map(|(_, f)| *f)
        .unwrap_or(1.0);
    max * fraction
}

/// How closely capacity matches the request
pub fn fitness_score(specs: &InstanceSpecs, req: &UsageRequirements) -> f64 {
    let mut score = 1.0;

    if req.min_vcpu > 0 {
        let ratio = f64::from(specs.vcpu) / f64::from(req.min_vcpu);
        score *= if ratio < 1.0 {
            ratio * 0.5
        } else if ratio <= 1.5 {
            1.0
        } else if ratio <= 2.0 {
            0.9
        } else {
            0.8 / ratio.log2()
        };
    }

    if req.max_vcpu > 0 && i64::from(specs.vcpu) > i64::from(req.max_vcpu) {
        score *= 0.5;
    }

    if req.min_memory_gb > 0.0 {
        let ratio = specs.memory_gb / req.min_memory_gb;
        score *= if ratio < 1.0 {
            ratio * 0.5
        } else if ratio <= 2.0 {
            1.0
        } else {
            0.9
        };
    }

    if req.preferred_category == Some(specs.category) {
        score *= 1.1;
    }

    if let Some(arch) = req.architecture.as_deref().filter(|a| !a.is_empty()) {
        if specs.architecture != arch {
            score *= 0.7;
        }
    }

    if req.requires_gpu {
        if !specs.has_gpu {
            return 0.0;
        }
        if req.min_gpu_count > 0 && specs.gpu_count < req.min_gpu_count {
            score *= f64::from(specs.gpu_count) / f64::from(req.min_gpu_count);
        }
    }

    score.clamp(0.0, 1.0)
}

/// Compute scale and savings per unit of request
pub fn value_score(specs: &InstanceSpecs, spot: &SpotData, req: &UsageRequirements) -> f64 {
    let min_vcpu = f64::from(req.min_vcpu.max(1));
    let vcpu_factor = (f64::from(specs.vcpu) + 1.0).log2() / (min_vcpu + 1.0).log2();
    let savings_factor = f64::from(spot.savings_percent) / 100.0;
    let mem_factor = if req.min_memory_gb > 0.0 {
        (specs.memory_gb / req.min_memory_gb).min(2.0) / 2.0
    } else {
        1.0
    };

    (vcpu_factor * 0.4 + savings_factor * 0.4 + mem_factor * 0.2).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::tests::{spec, spot};
    use crate::models::InstanceCategory;

    const EPS: f64 = 1e-9;

    fn req(min_vcpu: i32) -> UsageRequirements {
        UsageRequirements {
            min_vcpu,
            ..Default::default()
        }
    }

    #[test]
    fn test_tables_are_ordered() {
        for window in STABILITY_TABLE.windows(2) {
            assert!(window[0].0 < window[1].0);
            assert!(window[0].1 > window[1].1);
        }
        assert_eq!(stability_score(InterruptionFrequency::Medium), 0.6);
        assert!((generation_penalty(InstanceGeneration::Previous, 0.15) - 0.045).abs() < EPS);
        assert!((generation_penalty(InstanceGeneration::Legacy, 0.15) - 0.105).abs() < EPS);
        assert_eq!(generation_penalty(InstanceGeneration::Unknown, 0.15), 0.15);
        assert_eq!(generation_penalty(InstanceGeneration::Current, 0.15), 0.0);
    }

    #[test]
    fn test_savings_score_caps_at_ceiling() {
        assert!((savings_score(45) - 0.5).abs() < EPS);
        assert_eq!(savings_score(90), 1.0);
        assert_eq!(savings_score(100), 1.0);
        assert_eq!(savings_score(0), 0.0);
    }

    #[test]
    fn test_fitness_vcpu_tiers() {
        let r = req(4);
        assert!((fitness_score(&spec("m5.large", 2), &r) - 0.25).abs() < EPS);
        assert_eq!(fitness_score(&spec("m5.xlarge", 4), &r), 1.0);
        assert!((fitness_score(&spec("x", 8), &r) - 0.9).abs() < EPS);
        // 16 / 4 = 4x -> 0.8 / log2(4)
        assert!((fitness_score(&spec("x", 16), &r) - 0.4).abs() < EPS);
    }

    #[test]
    fn test_fitness_modifiers() {
        let mut r = req(2);
        r.max_vcpu = 2;
        assert!((fitness_score(&spec("m5.xlarge", 4), &r) - 0.45).abs() < EPS);

        let mut r = req(2);
        r.min_memory_gb = 16.0;
        // spec memory is 4 GB per vCPU
        assert!((fitness_score(&spec("m5.large", 2), &r) - 0.25).abs() < EPS);

        let mut r = req(2);
        r.architecture = Some("arm64".to_string());
        assert!((fitness_score(&spec("m5.large", 2), &r) - 0.7).abs() < EPS);

        let mut r = req(4);
        r.preferred_category = Some(InstanceCategory::GeneralPurpose);
        // 8 vCPU for 4 requested is 0.9, bonus brings it to 0.99
        assert!((fitness_score(&spec("x", 8), &r) - 0.99).abs() < EPS);
        // bonus never lifts above 1
        assert_eq!(fitness_score(&spec("x", 4), &r), 1.0);
    }

    #[test]
    fn test_fitness_gpu_paths() {
        let mut r = req(2);
        r.requires_gpu = true;
        assert_eq!(fitness_score(&spec("m5.large", 2), &r), 0.0);

        let mut gpu = spec("p3.8xlarge", 2);
        gpu.has_gpu = true;
        gpu.gpu_count = 2;
        r.min_gpu_count = 4;
        assert!((fitness_score(&gpu, &r) - 0.5).abs() < EPS);
    }

    #[test]
    fn test_value_score() {
        let r = req(2);
        // log2(3)/log2(3) * 0.4 + 0.6 * 0.4 + 1.0 * 0.2 = 0.84
        let v = value_score(&spec("m5.large", 2), &spot("m5.large", 60), &r);
        assert!((v - 0.84).abs() < EPS);

        let mut r = req(2);
        r.min_memory_gb = 16.0;
        // memory factor 8/16/2 = 0.25
        let v = value_score(&spec("m5.large", 2), &spot("m5.large", 60), &r);
        assert!((v - (0.4 + 0.24 + 0.05)).abs() < EPS);

        let v = value_score(&spec("x", 64), &spot("x", 90), &req(2));
        assert_eq!(v, 1.0);
    }

    #[test]
    fn test_composite_score() {
        let scorer = Scorer::default();
        let r = req(2);
        let (score, breakdown) =
            scorer.score_instance(&spec("m5.large", 2), &spot("m5.large", 60), &r);

        let expected = 0.30 * (60.0 / 90.0) + 0.25 * 0.8 + 0.25 * 1.0 + 0.20 * 0.84;
        assert!((score - expected).abs() < EPS);
        assert_eq!(breakdown.stability_score, 0.8);
        assert_eq!(breakdown.generation_penalty, 0.0);
        assert!(scorer.is_viable(score));
    }

    #[test]
    fn test_burstable_and_generation_penalties() {
        let scorer = Scorer::default();
        let r = req(2);
        let data = spot("t2.large", 60);
        let (base, _) = scorer.score_instance(&spec("t2.large", 2), &data, &r);

        let mut burst = spec("t2.large", 2);
        burst.is_burstable = true;
        let (penalized, _) = scorer.score_instance(&burst, &data, &r);
        assert!((base - penalized - 0.10).abs() < EPS);

        let allowed = UsageRequirements {
            allow_burstable: true,
            ..r.clone()
        };
        let (unpenalized, _) = scorer.score_instance(&burst, &data, &allowed);
        assert!((unpenalized - base).abs() < EPS);

        let mut legacy = spec("t2.large", 2);
        legacy.generation = InstanceGeneration::Legacy;
        let (older, breakdown) = scorer.score_instance(&legacy, &data, &r);
        assert!((base - older - breakdown.generation_penalty).abs() < EPS);
    }

    #[test]
    fn test_min_viable_threshold_is_configurable() {
        let scorer = Scorer::new(ScoringPolicy::default().with_min_viable_score(0.9));
        assert!(!scorer.is_viable(0.85));
        assert!(Scorer::default().is_viable(0.3));
        assert!(!Scorer::default().is_viable(0.2999));
    }
}

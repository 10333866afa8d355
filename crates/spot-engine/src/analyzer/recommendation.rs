//! Recommendation text and warnings for scored instances
//!
//! Everything here is advisory. None of it feeds back into ranking.

use crate::models::{
    InstanceAnalysis, InstanceGeneration, InterruptionFrequency, UsageRequirements,
};

/// Qualitative label per score threshold, highest first
pub const RECOMMENDATION_LABELS: [(f64, &str); 4] = [
    (0.85, "Excellent choice"),
    (0.70, "Good choice"),
    (0.55, "Reasonable choice"),
    (0.40, "Acceptable"),
];

const FALLBACK_LABEL: &str = "Consider alternatives";

const ARM64: &str = "arm64";

pub fn label_for_score(score: f64) -> &'static str {
    RECOMMENDATION_LABELS
        .iter()
        .find(|(threshold, _)| score >= *threshold)
        .map(|(_, label)| *label)
        .unwrap_or(FALLBACK_LABEL)
}

/// Builds recommendation strings and warning lists
#[derive(Debug, Clone, Copy, Default)]
pub struct RecommendationEngine;

impl RecommendationEngine {
    pub fn new() -> Self {
        Self
    }

    /// `label` or `label - insight; insight; ...`
    pub fn recommendation(&self, analysis: &InstanceAnalysis, req: &UsageRequirements) -> String {
        let label = label_for_score(analysis.score);
        let insights = self.insights(analysis, req);
        if insights.is_empty() {
            label.to_string()
        } else {
            format!("{} - {}", label, insights.join("; "))
        }
    }

    fn insights(&self, analysis: &InstanceAnalysis, req: &UsageRequirements) -> Vec<String> {
        let mut insights = Vec::new();
        let savings = analysis.spot_data.savings_percent;
        let specs = &analysis.specs;

        if savings >= 80 {
            insights.push(format!("exceptional savings of {}%", savings));
        } else if savings >= 60 {
            insights.push(format!("good savings of {}%", savings));
        }

        match analysis.spot_data.interruption_frequency {
            InterruptionFrequency::VeryLow => insights.push("very stable (<5% interruption)".into()),
            InterruptionFrequency::Low => insights.push("stable (5-10% interruption)".into()),
            InterruptionFrequency::Medium => {
                insights.push("moderate stability (10-15% interruption)".into())
            }
            _ => {}
        }

        if specs.generation == InstanceGeneration::Current {
            insights.push("current generation hardware".into());
        }

        if specs.architecture == ARM64 {
            insights.push("ARM-based (Graviton) - excellent price/performance".into());
        }

        if req.preferred_category == Some(specs.category) {
            insights.push("matches preferred category".into());
        }

        if analysis.score_breakdown.value_score >= 0.8 {
            insights.push("excellent value proposition".into());
        }

        if let Some(ratio) = vcpu_ratio(analysis, req) {
            if (1.0..=1.25).contains(&ratio) {
                insights.push("optimal sizing".into());
            } else if ratio > 2.0 {
                insights.push("over-provisioned (consider smaller)".into());
            }
        }

        insights
    }

    pub fn warnings(&self, analysis: &InstanceAnalysis, req: &UsageRequirements) -> Vec<String> {
        let mut warnings = Vec::new();
        let specs = &analysis.specs;
        let spot = &analysis.spot_data;

        if spot.interruption_frequency >= InterruptionFrequency::High {
            warnings.push(format!(
                "High interruption frequency ({}) - ensure fault-tolerant workload design",
                spot.interruption_frequency
            ));
        }

        if spot.savings_percent < 30 {
            warnings.push(format!(
                "Low savings ({}%) - consider on-demand for more predictable workloads",
                spot.savings_percent
            ));
        }

        match specs.generation {
            InstanceGeneration::Previous => warnings.push(
                "Previous generation instance - newer options may offer better performance".into(),
            ),
            InstanceGeneration::Legacy => warnings.push(
                "Legacy generation instance - consider upgrading to current generation".into(),
            ),
            _ => {}
        }

        if specs.is_burstable {
            warnings
                .push("Burstable instance - performance may be throttled under sustained load".into());
        }

        if let Some(ratio) = vcpu_ratio(analysis, req) {
            if ratio > 3.0 {
                warnings.push(format!(
                    "Significantly over-provisioned ({:.1}x required vCPU) - consider smaller instance",
                    ratio
                ));
            }
        }

        if req.min_memory_gb > 0.0 {
            let ratio = specs.memory_gb / req.min_memory_gb;
            if ratio > 4.0 {
                warnings.push("Significant memory over-provisioning".into());
            } else if (1.0..1.5).contains(&ratio) {
                warnings.push(
                    "Memory headroom is tight - consider next size up for safety margin".into(),
                );
            }
        }

        let arch_requested = req.architecture.as_deref().is_some_and(|a| !a.is_empty());
        if specs.architecture == ARM64 && !arch_requested {
            warnings.push(
                "ARM64 architecture - verify application compatibility before deployment".into(),
            );
        }

        if specs.is_bare_metal {
            warnings.push(
                "Bare metal instance - longer provisioning time, verify use case requires it"
                    .into(),
            );
        }

        warnings
    }

    /// Attach recommendation text and warnings in place
    pub fn annotate(&self, analysis: &mut InstanceAnalysis, req: &UsageRequirements) {
        analysis.recommendation = self.recommendation(analysis, req);
        analysis.warnings = self.warnings(analysis, req);
    }
}

fn vcpu_ratio(analysis: &InstanceAnalysis, req: &UsageRequirements) -> Option<f64> {
    if req.min_vcpu <= 0 {
        return None;
    }
    Some(f64::from(analysis.specs.vcpu) / f64::from(req.min_vcpu))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::tests::{analysis, spec, spot};
    use crate::models::InstanceCategory;

    fn req(min_vcpu: i32) -> UsageRequirements {
        UsageRequirements {
            min_vcpu,
            ..Default::default()
        }
    }

    #[test]
    fn test_labels_by_threshold() {
        assert_eq!(label_for_score(0.9), "Excellent choice");
        assert_eq!(label_for_score(0.85), "Excellent choice");
        assert_eq!(label_for_score(0.7), "Good choice");
        assert_eq!(label_for_score(0.6), "Reasonable choice");
        assert_eq!(label_for_score(0.4), "Acceptable");
        assert_eq!(label_for_score(0.39), "Consider alternatives");
    }

    #[test]
    fn test_recommendation_insights() {
        let engine = RecommendationEngine::new();
        let mut a = analysis(spec("m6g.large", 2), spot("m6g.large", 85), 0.9);
        a.specs.architecture = "arm64".to_string();
        a.score_breakdown.value_score = 0.85;
        let r = UsageRequirements {
            preferred_category: Some(InstanceCategory::GeneralPurpose),
            ..req(2)
        };

        let text = engine.recommendation(&a, &r);
        assert_eq!(
            text,
            "Excellent choice - exceptional savings of 85%; stable (5-10% interruption); \
             current generation hardware; ARM-based (Graviton) - excellent price/performance; \
             matches preferred category; excellent value proposition; optimal sizing"
        );
    }

    #[test]
    fn test_recommendation_without_insights() {
        let engine = RecommendationEngine::new();
        let mut a = analysis(spec("m4.large", 3), spot("m4.large", 40), 0.45);
        a.specs.generation = InstanceGeneration::Previous;
        a.spot_data.interruption_frequency = InterruptionFrequency::High;
        assert_eq!(engine.recommendation(&a, &req(2)), "Acceptable");
    }

    #[test]
    fn test_warnings() {
        let engine = RecommendationEngine::new();
        let mut a = analysis(spec("a1.metal", 16), spot("a1.metal", 20), 0.5);
        a.specs.architecture = "arm64".to_string();
        a.specs.is_bare_metal = true;
        a.specs.is_burstable = true;
        a.specs.generation = InstanceGeneration::Legacy;
        a.spot_data.interruption_frequency = InterruptionFrequency::VeryHigh;
        let r = UsageRequirements {
            min_memory_gb: 8.0,
            ..req(4)
        };

        let warnings = engine.warnings(&a, &r);
        assert_eq!(
            warnings,
            vec![
                "High interruption frequency (>20%) - ensure fault-tolerant workload design",
                "Low savings (20%) - consider on-demand for more predictable workloads",
                "Legacy generation instance - consider upgrading to current generation",
                "Burstable instance - performance may be throttled under sustained load",
                "Significantly over-provisioned (4.0x required vCPU) - consider smaller instance",
                "Significant memory over-provisioning",
                "ARM64 architecture - verify application compatibility before deployment",
                "Bare metal instance - longer provisioning time, verify use case requires it",
            ]
        );
    }

    #[test]
    fn test_tight_memory_warning() {
        let engine = RecommendationEngine::new();
        let a = analysis(spec("m5.large", 2), spot("m5.large", 60), 0.7);
        let r = UsageRequirements {
            min_memory_gb: 6.0,
            ..req(2)
        };
        assert_eq!(
            engine.warnings(&a, &r),
            vec!["Memory headroom is tight - consider next size up for safety margin"]
        );
    }
}

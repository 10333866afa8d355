//! Hard-constraint eligibility filter
//!
//! Rules run in a fixed order and stop at the first violation, so at most
//! one reason is reported per instance.

use crate::family::{extract_family, family_allowed};
use crate::models::{CloudProvider, InstanceSpecs, SpotData, UsageRequirements};
use std::collections::HashMap;
use tracing::debug;

/// Outcome of an eligibility check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Eligibility {
    pub eligible: bool,
    pub reasons: Vec<String>,
}

impl Eligibility {
    fn pass() -> Self {
        Self {
            eligible: true,
            reasons: Vec::new(),
        }
    }

    fn reject(reason: &str) -> Self {
        Self {
            eligible: false,
            reasons: vec![reason.to_string()],
        }
    }
}

/// Filters instance specs against workload requirements
#[derive(Debug, Clone, Copy)]
pub struct EligibilityFilter {
    cloud: CloudProvider,
}

impl Default for EligibilityFilter {
    fn default() -> Self {
        Self::new(CloudProvider::Aws)
    }
}

impl EligibilityFilter {
    /// `cloud` selects the family naming convention
    pub fn new(cloud: CloudProvider) -> Self {
        Self { cloud }
    }

    /// Keep the instances that have spot data and pass every rule
    pub fn filter(
        &self,
        instances: &[InstanceSpecs],
        spot_by_type: &HashMap<String, SpotData>,
        requirements: &UsageRequirements,
    ) -> Vec<InstanceSpecs> {
        instances
            .iter()
            .filter(|spec| match spot_by_type.get(&spec.instance_type) {
                None => false,
                Some(spot) => {
                    let outcome = self.is_eligible(spec, Some(spot), requirements);
                    if !outcome.eligible {
                        debug!(
                            instance_type = %spec.instance_type,
                            reason = ?outcome.reasons.first(),
                            "Instance filtered out"
                        );
                    }
                    outcome.eligible
                }
            })
            .cloned()
            .collect()
    }

    /// Check one instance. Spot-dependent rules are skipped when `spot` is absent.
    pub fn is_eligible(
        &self,
        spec: &InstanceSpecs,
        spot: Option<&SpotData>,
        req: &UsageRequirements,
    ) -> Eligibility {
        if spec.is_deprecated {
            return Eligibility::reject("instance type is deprecated");
        }

        let vcpu = i64::from(spec.vcpu);
        if vcpu < i64::from(req.min_vcpu) {
            return Eligibility::reject("insufficient vCPU");
        }
        if req.max_vcpu > 0 && vcpu > i64::from(req.max_vcpu) {
            return Eligibility::reject("exceeds maximum vCPU");
        }

        if req.min_memory_gb > 0.0 && spec.memory_gb < req.min_memory_gb {
            return Eligibility::reject("insufficient memory");
        }
        if req.max_memory_gb > 0.0 && spec.memory_gb > req.max_memory_gb {
            return Eligibility::reject("exceeds maximum memory");
        }

        if !req.requires_gpu && spec.has_gpu {
            return Eligibility::reject("GPU instance not needed for non-GPU workload");
        }
        if req.requires_gpu {
            if !spec.has_gpu {
                return Eligibility::reject("GPU required but instance has no GPU");
            }
            if req.min_gpu_count > 0 && spec.gpu_count < req.min_gpu_count {
                return Eligibility::reject("insufficient GPU count");
            }
            if let Some(wanted) = req.gpu_type.as_deref().filter(|t| !t.is_empty()) {
                let actual = spec.gpu_type.as_deref().unwrap_or_default().to_lowercase();
                if !actual.contains(&wanted.to_lowercase()) {
                    return Eligibility::reject("GPU type mismatch");
                }
            }
        }

        if spec.is_burstable && !req.allow_burstable {
            return Eligibility::reject("burstable instances not allowed");
        }
        if spec.is_bare_metal && !req.allow_bare_metal {
            return Eligibility::reject("bare metal instances not allowed");
        }

        if !req.families.is_empty() {
            let family = extract_family(&spec.instance_type, self.cloud);
            if !family_allowed(&req.families, &family) {
                return Eligibility::reject("instance family not in allowed list");
            }
        }

        if let Some(arch) = req.architecture.as_deref().filter(|a| !a.is_empty()) {
            if spec.architecture != arch {
                return Eligibility::reject("architecture mismatch");
            }
        }

        if req.min_storage_gb > 0.0 && spec.storage_gb < req.min_storage_gb {
            return Eligibility::reject("insufficient storage");
        }

        if let Some(spot) = spot {
            if spot.interruption_frequency > req.max_interruption {
                return Eligibility::reject("interruption frequency too high");
            }
            if req.min_savings_percent > 0 && spot.savings_percent < req.min_savings_percent {
                return Eligibility::reject("savings below minimum threshold");
            }
            if spot.savings_percent == 0 {
                return Eligibility::reject("no savings data available (likely unavailable)");
            }
        }

        Eligibility::pass()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::tests::{spec, spot};
    use crate::models::{InterruptionFrequency, UsageRequirements};

    fn req(min_vcpu: i32) -> UsageRequirements {
        UsageRequirements {
            min_vcpu,
            ..Default::default()
        }
    }

    fn reason(outcome: Eligibility) -> String {
        assert!(!outcome.eligible);
        assert_eq!(outcome.reasons.len(), 1);
        outcome.reasons[0].clone()
    }

    #[test]
    fn test_deprecated_checked_first() {
        let filter = EligibilityFilter::default();
        let mut s = spec("m1.large", 1);
        s.is_deprecated = true;
        s.has_gpu = true;
        let outcome = filter.is_eligible(&s, Some(&spot("m1.large", 0)), &req(2));
        assert_eq!(reason(outcome), "instance type is deprecated");
    }

    #[test]
    fn test_vcpu_and_memory_bounds() {
        let filter = EligibilityFilter::default();
        let data = spot("m5.xlarge", 60);

        let outcome = filter.is_eligible(&spec("m5.xlarge", 4), Some(&data), &req(8));
        assert_eq!(reason(outcome), "insufficient vCPU");

        let r = UsageRequirements {
            max_vcpu: 2,
            ..req(2)
        };
        let outcome = filter.is_eligible(&spec("m5.xlarge", 4), Some(&data), &r);
        assert_eq!(reason(outcome), "exceeds maximum vCPU");

        let r = UsageRequirements {
            min_memory_gb: 32.0,
            ..req(2)
        };
        let outcome = filter.is_eligible(&spec("m5.xlarge", 4), Some(&data), &r);
        assert_eq!(reason(outcome), "insufficient memory");

        let r = UsageRequirements {
            max_memory_gb: 8.0,
            ..req(2)
        };
        let outcome = filter.is_eligible(&spec("m5.xlarge", 4), Some(&data), &r);
        assert_eq!(reason(outcome), "exceeds maximum memory");
    }

    #[test]
    fn test_gpu_policy_is_symmetric() {
        let filter = EligibilityFilter::default();
        let mut gpu = spec("p3.2xlarge", 8);
        gpu.has_gpu = true;
        gpu.gpu_count = 1;
        gpu.gpu_type = Some("NVIDIA V100".to_string());
        let data = spot("p3.2xlarge", 70);

        let outcome = filter.is_eligible(&gpu, Some(&data), &req(2));
        assert_eq!(reason(outcome), "GPU instance not needed for non-GPU workload");

        let r = UsageRequirements {
            requires_gpu: true,
            ..req(2)
        };
        let outcome = filter.is_eligible(&spec("m5.2xlarge", 8), Some(&data), &r);
        assert_eq!(reason(outcome), "GPU required but instance has no GPU");

        let r = UsageRequirements {
            requires_gpu: true,
            min_gpu_count: 4,
            ..req(2)
        };
        assert_eq!(
            reason(filter.is_eligible(&gpu, Some(&data), &r)),
            "insufficient GPU count"
        );

        let r = UsageRequirements {
            requires_gpu: true,
            gpu_type: Some("a100".to_string()),
            ..req(2)
        };
        assert_eq!(
            reason(filter.is_eligible(&gpu, Some(&data), &r)),
            "GPU type mismatch"
        );

        let r = UsageRequirements {
            requires_gpu: true,
            gpu_type: Some("v100".to_string()),
            ..req(2)
        };
        assert!(filter.is_eligible(&gpu, Some(&data), &r).eligible);
    }

    #[test]
    fn test_burstable_bare_metal_and_family() {
        let filter = EligibilityFilter::default();
        let mut t3 = spec("t3.large", 2);
        t3.is_burstable = true;
        let data = spot("t3.large", 60);
        assert_eq!(
            reason(filter.is_eligible(&t3, Some(&data), &req(2))),
            "burstable instances not allowed"
        );
        let r = UsageRequirements {
            allow_burstable: true,
            ..req(2)
        };
        assert!(filter.is_eligible(&t3, Some(&data), &r).eligible);

        let mut metal = spec("m5.metal", 96);
        metal.is_bare_metal = true;
        assert_eq!(
            reason(filter.is_eligible(&metal, Some(&data), &req(2))),
            "bare metal instances not allowed"
        );

        let r = UsageRequirements {
            families: vec!["C".to_string(), "r".to_string()],
            ..req(2)
        };
        assert_eq!(
            reason(filter.is_eligible(&spec("m5.large", 2), Some(&data), &r)),
            "instance family not in allowed list"
        );
        assert!(filter
            .is_eligible(&spec("c5.large", 2), Some(&data), &r)
            .eligible);
    }

    #[test]
    fn test_azure_family_convention() {
        let filter = EligibilityFilter::new(CloudProvider::Azure);
        let r = UsageRequirements {
            families: vec!["d".to_string()],
            ..req(2)
        };
        let data = spot("Standard_D4s_v5", 60);
        assert!(filter
            .is_eligible(&spec("Standard_D4s_v5", 4), Some(&data), &r)
            .eligible);
        assert!(!filter
            .is_eligible(&spec("Standard_E4s_v5", 4), Some(&data), &r)
            .eligible);
    }

    #[test]
    fn test_architecture_storage_and_spot_rules() {
        let filter = EligibilityFilter::default();
        let data = spot("m5.large", 60);

        let r = UsageRequirements {
            architecture: Some("arm64".to_string()),
            ..req(2)
        };
        assert_eq!(
            reason(filter.is_eligible(&spec("m5.large", 2), Some(&data), &r)),
            "architecture mismatch"
        );

        let r = UsageRequirements {
            min_storage_gb: 100.0,
            ..req(2)
        };
        assert_eq!(
            reason(filter.is_eligible(&spec("m5.large", 2), Some(&data), &r)),
            "insufficient storage"
        );

        let mut volatile = spot("m5.large", 60);
        volatile.interruption_frequency = InterruptionFrequency::High;
        assert_eq!(
            reason(filter.is_eligible(&spec("m5.large", 2), Some(&volatile), &req(2))),
            "interruption frequency too high"
        );

        let r = UsageRequirements {
            min_savings_percent: 70,
            ..req(2)
        };
        assert_eq!(
            reason(filter.is_eligible(&spec("m5.large", 2), Some(&data), &r)),
            "savings below minimum threshold"
        );

        let unpriced = spot("m5.large", 0);
        assert_eq!(
            reason(filter.is_eligible(&spec("m5.large", 2), Some(&unpriced), &req(2))),
            "no savings data available (likely unavailable)"
        );

        // Without spot data the spot rules are not evaluated
        assert!(filter.is_eligible(&spec("m5.large", 2), None, &req(2)).eligible);
    }

    #[test]
    fn test_filter_skips_instances_without_spot_data() {
        let filter = EligibilityFilter::default();
        let specs = vec![spec("m5.large", 2), spec("c5.large", 2)];
        let mut spots = HashMap::new();
        spots.insert("m5.large".to_string(), spot("m5.large", 60));

        let eligible = filter.filter(&specs, &spots, &req(2));
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].instance_type, "m5.large");
    }
}

//! Instance family extraction per vendor naming convention
//!
//! - AWS: `{family}{generation}{modifiers}.{size}` e.g. `c6i.xlarge` -> `c`
//! - Azure: `Standard_{series}{vcpu}{modifiers}_v{n}` e.g. `Standard_D4s_v5` -> `D`
//! - GCP: `{family}-{type}-{vcpu}` e.g. `n2-standard-4` -> `n2`

use crate::models::CloudProvider;

const AZURE_PREFIX: &str = "Standard_";

/// Extract the family of an instance type using the vendor's convention
pub fn extract_family(instance_type: &str, cloud: CloudProvider) -> String {
    match cloud {
        CloudProvider::Aws => prefix_before_digit(instance_type).to_string(),
        CloudProvider::Azure => {
            let name = instance_type
                .strip_prefix(AZURE_PREFIX)
                .unwrap_or(instance_type);
            prefix_before_digit(name).to_ascii_uppercase()
        }
        CloudProvider::Gcp => instance_type
            .split('-')
            .next()
            .unwrap_or(instance_type)
            .to_ascii_lowercase(),
    }
}

/// Case-insensitive membership test against an allow-list
pub fn family_allowed(families: &[String], family: &str) -> bool {
    families.iter().any(|f| f.eq_ignore_ascii_case(family))
}

fn prefix_before_digit(name: &str) -> &str {
    match name.find(|c: char| c.is_ascii_digit()) {
        Some(idx) => &name[..idx],
        None => name,
    }
}

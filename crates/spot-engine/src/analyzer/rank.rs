//! Deterministic ranking of scored instances

use crate::models::InstanceAnalysis;
use std::cmp::Ordering;

/// Total order: score descending, then lower spot price (unpriced last),
/// then instance type ascending.
pub fn compare_analyses(a: &InstanceAnalysis, b: &InstanceAnalysis) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| compare_price(a.spot_data.spot_price, b.spot_data.spot_price))
        .then_with(|| a.specs.instance_type.cmp(&b.specs.instance_type))
}

fn compare_price(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sort, assign 1-based ranks and keep the first `top_n`
pub fn rank_and_truncate(mut analyses: Vec<InstanceAnalysis>, top_n: usize) -> Vec<InstanceAnalysis> {
    analyses.sort_by(compare_analyses);
    for (idx, analysis) in analyses.iter_mut().enumerate() {
        analysis.rank = idx + 1;
    }
    analyses.truncate(top_n);
    analyses
}

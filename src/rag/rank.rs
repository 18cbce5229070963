//! Tag-aware hybrid re-ranking.

use crate::vector_store::SearchHit;
use std::collections::HashSet;
use tracing::debug;

/// Jaccard overlap between two tag sets. Two empty sets overlap not at all.
pub fn jaccard(a: &[String], b: &[String]) -> f32 {
    let sa: HashSet<&str> = a.iter().map(String::as_str).collect();
    let sb: HashSet<&str> = b.iter().map(String::as_str).collect();
    if sa.is_empty() && sb.is_empty() {
        return 0.0;
    }

    let inter = sa.intersection(&sb).count();
    let union = sa.union(&sb).count();
    if union == 0 {
        return 0.0;
    }
    inter as f32 / union as f32
}

/// Combined score for one hit against a reference tag set.
pub fn combined_score(hit: &SearchHit, ref_tags: &[String], alpha: f32, beta: f32) -> f32 {
    alpha * hit.score + beta * jaccard(&hit.fragment.tag_set, ref_tags)
}

/// Re-rank hits by `alpha * similarity + beta * tag overlap`, descending.
///
/// The sort is stable: hits with equal combined scores keep their input
/// order. Callers that disable re-ranking simply skip this call.
pub fn rerank(hits: &mut [SearchHit], ref_tags: &[String], alpha: f32, beta: f32) {
    let mut scored: Vec<(f32, SearchHit)> = hits
        .iter()
        .map(|hit| (combined_score(hit, ref_tags, alpha, beta), hit.clone()))
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    for (slot, (_, hit)) in hits.iter_mut().zip(scored) {
        *slot = hit;
    }

    debug!(alpha, beta, ref_tags = ref_tags.len(), "reranked hits");
}

//! Rank canned responses by how close their titles are to the conversation.

use crate::model::CannedResponse;
use crate::similarity;

pub const DEFAULT_TOP_N: usize = 50;

/// Candidates ordered by descending title similarity, truncated to `top_n`. Ties keep input order.
pub fn rank(text: &str, candidates: &[CannedResponse], top_n: usize) -> Vec<CannedResponse> {
    let mut scored: Vec<(f64, &CannedResponse)> = candidates
        .iter()
        .map(|c| (similarity::score(text, &c.title), c))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored
        .into_iter()
        .take(top_n)
        .map(|(_, c)| c.clone())
        .collect()
}

use crate::models::{Chunk, SearchResult};

/// Cosine of the angle between two equal-length vectors.
///
/// Returns 0.0 when the lengths differ, either vector has zero magnitude, or
/// the arithmetic overflows to a non-finite value.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0f64;
    let mut norm_a = 0f64;
    let mut norm_b = 0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if !(dot.is_finite() && norm_a.is_finite() && norm_b.is_finite()) {
        return 0.0;
    }

    if norm_a > 0.0 && norm_b > 0.0 {
        (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0) as f32
    } else {
        0.0
    }
}

/// Scores every candidate against `query` and keeps the `top_k` best.
///
/// Candidates with an empty embedding, a non-finite component, or a length
/// that differs from the query are skipped. Equal scores keep the order in which candidates were
/// read.
pub fn rank<I>(query: &[f32], candidates: I, top_k: usize) -> Vec<SearchResult>
where
    I: IntoIterator<Item = Chunk>,
{
    if top_k == 0 || query.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<SearchResult> = candidates
        .into_iter()
        .filter(|chunk| is_well_formed(&chunk.embedding, query.len()))
        .map(|chunk| {
            let score = cosine_similarity(query, &chunk.embedding);
            SearchResult {
                chunk: chunk.into_summary(),
                score,
            }
        })
        .collect();

    // `sort_by` is stable, which gives the read-order tie-break.
    scored.sort_by(|left, right| right.score.total_cmp(&left.score));
    scored.truncate(top_k);
    scored
}

fn is_well_formed(embedding: &[f32], dimensions: usize) -> bool {
    !embedding.is_empty()
        && embedding.len() == dimensions
        && embedding.iter().all(|value| value.is_finite())
}

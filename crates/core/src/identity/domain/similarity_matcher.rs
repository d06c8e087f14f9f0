//! Nearest-neighbour identity lookup by cosine similarity.
//!
//! A linear scan over every enrolled record. Enrollment counts are small
//! enough that an index would not pay for itself.

use thiserror::Error;

use super::identity_record::IdentityRecord;

/// Score reported when there is nothing to compare against.
pub const NO_MATCH_SCORE: f32 = -1.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("embedding has zero norm or non-finite values")]
    DegenerateVector,
}

/// Best candidate for a query embedding.
///
/// `score` is always the best similarity seen, even when `name` is `None`
/// because it fell below the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub name: Option<String>,
    pub score: f32,
}

impl MatchOutcome {
    pub fn is_match(&self) -> bool {
        self.name.is_some()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SimilarityMatcher {
    threshold: f32,
}

impl SimilarityMatcher {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Finds the record most similar to `query`.
    ///
    /// Ties keep the earliest record in store order. An empty store yields
    /// `(None, -1.0)` without inspecting the query.
    pub fn find_match(
        &self,
        query: &[f32],
        records: &[IdentityRecord],
    ) -> Result<MatchOutcome, MatchError> {
        let mut best: Option<(&IdentityRecord, f32)> = None;
        for record in records {
            let score = cosine_similarity(record.embedding(), query)?;
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((record, score));
            }
        }

        let Some((record, score)) = best else {
            return Ok(MatchOutcome {
                name: None,
                score: NO_MATCH_SCORE,
            });
        };

        let name = (score >= self.threshold).then(|| record.name().to_string());
        Ok(MatchOutcome { name, score })
    }
}

/// Dot product over the product of Euclidean norms, in `[-1, 1]`.
///
/// Computed in `f32` throughout. `a` is taken as the reference length when
/// reporting a dimension mismatch.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, MatchError> {
    if a.len() != b.len() {
        return Err(MatchError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return Err(MatchError::DegenerateVector);
    }
    let score = dot / denom;
    if score.is_nan() {
        return Err(MatchError::DegenerateVector);
    }
    Ok(score.clamp(-1.0, 1.0))
}

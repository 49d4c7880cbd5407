//! Weighted score fusion of lexical and semantic rankings

use ahash::AHashMap;
use thiserror::Error;

use crate::index::ChunkRef;

#[derive(Error, Debug)]
pub enum FusionError {
    #[error("Invalid weight configuration: weights must be non-negative and sum to a positive value")]
    InvalidWeights,
}

/// Fusion weights, normalized so `lexical + semantic == 1`
#[derive(Debug, Clone, Copy)]
pub struct FusionWeights {
    pub lexical: f32,
    pub semantic: f32,
}

impl FusionWeights {
    /// Build normalized weights from caller-supplied values on any scale
    pub fn new(lexical: f32, semantic: f32) -> Result<Self, FusionError> {
        if lexical < 0.0 || semantic < 0.0 {
            return Err(FusionError::InvalidWeights);
        }
        let total = lexical + semantic;
        if total <= 0.0 {
            return Err(FusionError::InvalidWeights);
        }

        Ok(Self {
            lexical: lexical / total,
            semantic: semantic / total,
        })
    }
}

/// Combine the two rankings into one list of fused scores.
///
/// The fused score of a chunk is `w_lex * lexical + w_sem * semantic`, with
/// a side contributing zero when it did not return the chunk; a chunk strong
/// in only one signal still surfaces. Lexical results are folded in first,
/// and equal fused scores keep first-encounter order. Returns at most `k`
/// pairs, highest score first.
pub fn fuse_scores(
    lexical: &[(ChunkRef, f32)],
    semantic: &[(ChunkRef, f32)],
    weights: &FusionWeights,
    k: usize,
) -> Vec<(ChunkRef, f32)> {
    let mut order: Vec<ChunkRef> = Vec::with_capacity(lexical.len() + semantic.len());
    let mut scores: AHashMap<ChunkRef, f32> = AHashMap::with_capacity(order.capacity());

    for (id, score) in lexical {
        scores
            .entry(*id)
            .and_modify(|s| *s += weights.lexical * score)
            .or_insert_with(|| {
                order.push(*id);
                weights.lexical * score
            });
    }
    for (id, score) in semantic {
        scores
            .entry(*id)
            .and_modify(|s| *s += weights.semantic * score)
            .or_insert_with(|| {
                order.push(*id);
                weights.semantic * score
            });
    }

    let mut fused: Vec<(ChunkRef, f32)> = order
        .into_iter()
        .map(|id| (id, scores.get(&id).copied().unwrap_or(0.0)))
        .collect();
    fused.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    fused.truncate(k);
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> ChunkRef {
        ChunkRef::new(0, n)
    }

    #[test]
    fn test_weights_normalize() {
        let w = FusionWeights::new(2.0, 3.0).unwrap();
        assert!((w.lexical - 0.4).abs() < 1e-6);
        assert!((w.semantic - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_negative_or_zero_weights_rejected() {
        assert!(FusionWeights::new(-0.1, 0.5).is_err());
        assert!(FusionWeights::new(0.0, 0.0).is_err());
    }

    #[test]
    fn test_single_sided_chunk_keeps_weighted_score() {
        let w = FusionWeights::new(0.4, 0.6).unwrap();
        let lexical = vec![(id(1), 1.0)];
        let semantic = vec![(id(2), 1.0)];

        let fused = fuse_scores(&lexical, &semantic, &w, 10);
        assert_eq!(fused.len(), 2);
        // Semantic-only chunk wins: 0.6 > 0.4
        assert_eq!(fused[0], (id(2), 0.6));
        assert!((fused[1].1 - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_overlapping_chunk_sums_contributions() {
        let w = FusionWeights::new(0.5, 0.5).unwrap();
        let lexical = vec![(id(1), 0.8), (id(2), 0.4)];
        let semantic = vec![(id(1), 0.6)];

        let fused = fuse_scores(&lexical, &semantic, &w, 10);
        assert_eq!(fused[0].0, id(1));
        assert!((fused[0].1 - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_ties_keep_lexical_first_encounter_order() {
        let w = FusionWeights::new(0.5, 0.5).unwrap();
        let lexical = vec![(id(7), 1.0)];
        let semantic = vec![(id(3), 1.0)];

        let fused = fuse_scores(&lexical, &semantic, &w, 10);
        // Equal fused scores: the lexically-encountered chunk comes first
        assert_eq!(fused[0].0, id(7));
        assert_eq!(fused[1].0, id(3));
    }

    #[test]
    fn test_truncates_to_k() {
        let w = FusionWeights::new(1.0, 1.0).unwrap();
        let lexical: Vec<_> = (0..10).map(|n| (id(n), n as f32)).collect();
        let fused = fuse_scores(&lexical, &[], &w, 3);
        assert_eq!(fused.len(), 3);
        assert_eq!(fused[0].0, id(9));
    }
}

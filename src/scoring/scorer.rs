use crate::core::config::{FieldWeights, ScoringConfig};
use crate::core::types::Field;

/// How one record field matched a query
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMatch {
    pub field: Field,
    pub matched_tokens: usize,
    pub phrase: bool,
}

impl FieldMatch {
    pub fn is_match(&self) -> bool {
        self.matched_tokens > 0 || self.phrase
    }
}

/// Scorer trait
pub trait Scorer: Send + Sync {
    fn score(&self, matches: &[FieldMatch]) -> f32;

    fn name(&self) -> &str;
}

/// Sum of field weights per matched (field, token), plus a flat bonus for
/// every field holding the whole query phrase.
#[derive(Debug, Clone)]
pub struct WeightedFieldScorer {
    pub weights: FieldWeights,
    pub phrase_bonus: f32,
}

impl WeightedFieldScorer {
    pub fn new(config: &ScoringConfig) -> Self {
        WeightedFieldScorer {
            weights: config.weights.clone(),
            phrase_bonus: config.phrase_bonus,
        }
    }
}

impl Default for WeightedFieldScorer {
    fn default() -> Self {
        Self::new(&ScoringConfig::default())
    }
}

impl Scorer for WeightedFieldScorer {
    fn score(&self, matches: &[FieldMatch]) -> f32 {
        matches
            .iter()
            .map(|m| {
                let tokens = self.weights.weight(m.field) * m.matched_tokens as f32;
                if m.phrase { tokens + self.phrase_bonus } else { tokens }
            })
            .sum()
    }

    fn name(&self) -> &str {
        "weighted_field"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(field: Field, matched_tokens: usize, phrase: bool) -> FieldMatch {
        FieldMatch { field, matched_tokens, phrase }
    }

    #[test]
    fn title_outweighs_when() {
        let scorer = WeightedFieldScorer::default();
        let title = scorer.score(&[hit(Field::Title, 1, false)]);
        let when = scorer.score(&[hit(Field::When, 1, false)]);
        assert!(title > when);
        assert_eq!(title, 10.0);
    }

    #[test]
    fn phrase_bonus_applies_per_field() {
        let scorer = WeightedFieldScorer::default();
        let score = scorer.score(&[hit(Field::Title, 2, true), hit(Field::Who, 0, true)]);
        assert_eq!(score, 10.0 * 2.0 + 10.0 + 10.0);
    }

    #[test]
    fn configured_weights_are_used() {
        let mut config = ScoringConfig::default();
        config.weights.key = 1.0;
        config.phrase_bonus = 0.0;
        let scorer = WeightedFieldScorer::new(&config);
        assert_eq!(scorer.score(&[hit(Field::Key, 3, true)]), 3.0);
        assert_eq!(scorer.score(&[]), 0.0);
    }
}

use lexrag_core::config::ConfidenceSettings;
use lexrag_core::types::ScoredSource;

/// Maps the sources an answer was grounded on to a confidence in `[0, 1]`.
pub trait ConfidencePolicy: Send + Sync {
    fn score(&self, sources: &[ScoredSource]) -> f32;
}

/// `floor + weight * top_score` with sources, `baseline` without.
#[derive(Debug, Clone, PartialEq)]
pub struct HeuristicConfidence { pub baseline: f32, pub floor: f32, pub weight: f32 }

impl HeuristicConfidence {
    pub fn from_settings(settings: &ConfidenceSettings) -> Self {
        Self { baseline: settings.baseline, floor: settings.floor, weight: settings.weight }
    }
}

impl Default for HeuristicConfidence {
    fn default() -> Self { Self::from_settings(&ConfidenceSettings::default()) }
}

impl ConfidencePolicy for HeuristicConfidence {
    fn score(&self, sources: &[ScoredSource]) -> f32 {
        let top = sources.iter().map(|s| s.score).filter(|s| !s.is_nan()).reduce(f32::max);
        match top {
            Some(top) => (self.floor + self.weight * top).clamp(0.0, 1.0),
            None => self.baseline.clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_scores(scores: &[f32]) -> Vec<ScoredSource> {
        scores.iter().enumerate().map(|(i, &score)| ScoredSource {
            chunk_id: format!("d:{i}"), source_name: "d".into(), page: None, preview: String::new(), score,
        }).collect()
    }

    #[test]
    fn baseline_without_sources() {
        assert!((HeuristicConfidence::default().score(&[]) - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn uses_top_score() {
        let c = HeuristicConfidence::default().score(&with_scores(&[0.4, 0.92, 0.5]));
        assert!((c - 0.96).abs() < 1e-6);
    }

    #[test]
    fn clamps_to_unit_interval() {
        let policy = HeuristicConfidence { baseline: 0.8, floor: 0.9, weight: 0.5 };
        assert_eq!(policy.score(&with_scores(&[1.0])), 1.0);
    }
}

use serde::{Deserialize, Serialize};

use crate::structural::StructuralEvaluation;

/// Score assumed when an evaluator returns something that is not a number.
pub const DEFAULT_REASONING_SCORE: f64 = 70.0;
/// Neutral score used when no qualitative assessment could be obtained.
pub const FALLBACK_REASONING_SCORE: f64 = 50.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
pub struct Weights {
    pub structural: f64,
    pub reasoning: f64,
}

/// Fixed for every question so scores stay comparable across sessions.
pub const WEIGHTS: Weights = Weights {
    structural: 0.6,
    reasoning: 0.4,
};

/// Qualitative assessment produced outside the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
pub struct ReasoningEvaluation {
    pub score: f64,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl ReasoningEvaluation {
    /// Bring an evaluator's answer into contract: non-finite scores become
    /// [`DEFAULT_REASONING_SCORE`], everything else is clamped to 0..=100.
    pub fn normalized(mut self) -> Self {
        if !self.score.is_finite() {
            self.score = DEFAULT_REASONING_SCORE;
        }
        self.score = self.score.clamp(0.0, 100.0);
        self
    }

    /// Stand-in when the external evaluator is unavailable.
    pub fn fallback() -> Self {
        Self {
            score: FALLBACK_REASONING_SCORE,
            strengths: vec!["Basic structure present".to_string()],
            weaknesses: vec!["AI feedback unavailable at this time".to_string()],
            suggestions: vec![
                "Please review your design against functional requirements manually".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinalEvaluation {
    pub structural: StructuralEvaluation,
    pub reasoning: ReasoningEvaluation,
    pub final_score: i64,
    pub weights: Weights,
}

/// Merge both reports into the record handed back for persistence.
///
/// Inputs are trusted; callers normalize the reasoning report first.
pub fn combine_evaluations(
    structural: StructuralEvaluation,
    reasoning: ReasoningEvaluation,
) -> FinalEvaluation {
    let final_score = (f64::from(structural.score) * WEIGHTS.structural
        + reasoning.score * WEIGHTS.reasoning)
        .round() as i64;

    FinalEvaluation {
        structural,
        reasoning,
        final_score,
        weights: WEIGHTS,
    }
}

pub mod engine;
mod parse;
mod prompt;

use async_trait::async_trait;

use systemcraft_core::{
    combine_evaluations, evaluate_structure, AiSettings, Connection, Design, FinalEvaluation,
    Node, Question, ReasoningEvaluation, RuleResult,
};

pub use parse::{parse_llm_output, review_from_value};
pub use prompt::serialize_design;

#[derive(Debug, thiserror::Error)]
pub enum ReasonError {
    #[error("AI provider is not configured")]
    NotConfigured,
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("AI API key is invalid: {0}")]
    Auth(String),
    #[error("AI billing issue: {0}")]
    Billing(String),
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("LLM returned no text")]
    EmptyResponse,
    #[error("could not parse evaluation: {0}")]
    Parse(String),
}

impl ReasonError {
    /// Configuration, auth and billing problems won't fix themselves; everything
    /// else, including a malformed answer, gets another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReasonError::Generation(_) | ReasonError::EmptyResponse | ReasonError::Parse(_)
        )
    }
}

/// What a qualitative evaluator gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct ReasoningRequest<'a> {
    pub question: &'a Question,
    pub nodes: &'a [Node],
    pub connections: &'a [Connection],
    /// Deterministic rule outcomes, so commentary can refer to them.
    pub structural: &'a [RuleResult],
}

#[async_trait]
pub trait ReasoningEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        request: &ReasoningRequest<'_>,
    ) -> Result<ReasoningEvaluation, ReasonError>;
}

/// Evaluator backed by a chat model from the configured provider.
#[derive(Debug, Clone)]
pub struct LlmEvaluator {
    settings: AiSettings,
}

impl LlmEvaluator {
    pub fn new(settings: AiSettings) -> Self {
        Self { settings }
    }

    /// Uses the settings file plus environment overrides.
    pub fn from_settings() -> Self {
        Self::new(systemcraft_core::read_settings())
    }
}

#[async_trait]
impl ReasoningEvaluator for LlmEvaluator {
    async fn evaluate(
        &self,
        request: &ReasoningRequest<'_>,
    ) -> Result<ReasoningEvaluation, ReasonError> {
        if !systemcraft_core::ai_configured(&self.settings) {
            return Err(ReasonError::NotConfigured);
        }
        let system = prompt::system_prompt();
        let user_msg = prompt::user_message(request);

        tracing::info!(
            provider = %self.settings.provider,
            model = %self.settings.model,
            "requesting reasoning evaluation"
        );

        engine::generate_review(&self.settings, &system, &user_msg).await
    }
}

/// Ask `evaluator` for a qualitative review. Never fails: any error is logged and
/// replaced by [`ReasoningEvaluation::fallback`].
pub async fn evaluate_reasoning(
    evaluator: &dyn ReasoningEvaluator,
    request: &ReasoningRequest<'_>,
) -> ReasoningEvaluation {
    match evaluator.evaluate(request).await {
        Ok(review) => review.normalized(),
        Err(e) => {
            tracing::warn!(error = %e, "reasoning evaluation unavailable, using fallback");
            ReasoningEvaluation::fallback()
        }
    }
}

/// Full grading pass: structural rules, then the qualitative review with the
/// rule outcomes as context, then the weighted combination.
pub async fn grade(
    evaluator: &dyn ReasoningEvaluator,
    question: &Question,
    design: &Design,
) -> FinalEvaluation {
    let structural = evaluate_structure(
        &design.nodes,
        &design.connections,
        &question.requirements,
        &question.constraints,
    );
    tracing::info!(
        nodes = design.nodes.len(),
        connections = design.connections.len(),
        structural_score = structural.score,
        "structural evaluation complete"
    );

    let request = ReasoningRequest {
        question,
        nodes: &design.nodes,
        connections: &design.connections,
        structural: &structural.details,
    };
    let reasoning = evaluate_reasoning(evaluator, &request).await;

    let result = combine_evaluations(structural, reasoning);
    tracing::info!(final_score = result.final_score, "grading complete");
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_llm_evaluator_refuses_without_network() {
        let evaluator = LlmEvaluator::new(AiSettings::default());
        let question = Question::default();
        let request = ReasoningRequest {
            question: &question,
            nodes: &[],
            connections: &[],
            structural: &[],
        };
        assert!(matches!(
            evaluator.evaluate(&request).await,
            Err(ReasonError::NotConfigured)
        ));
        assert_eq!(
            evaluate_reasoning(&evaluator, &request).await,
            ReasoningEvaluation::fallback()
        );
    }

    #[test]
    fn retryability() {
        assert!(ReasonError::Generation("503".into()).is_retryable());
        assert!(ReasonError::EmptyResponse.is_retryable());
        assert!(!ReasonError::Auth("401".into()).is_retryable());
        assert!(!ReasonError::Billing("402".into()).is_retryable());
        assert!(ReasonError::Parse("bad".into()).is_retryable());
        assert!(!ReasonError::NotConfigured.is_retryable());
        assert!(!ReasonError::UnknownProvider("x".into()).is_retryable());
    }
}

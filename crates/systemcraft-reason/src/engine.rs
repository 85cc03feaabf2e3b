use std::time::Duration;

use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::ChatMessage;

use systemcraft_core::{AiSettings, ReasoningEvaluation};

use crate::parse::parse_llm_output;
use crate::ReasonError;

const BACKOFF_STEP: Duration = Duration::from_millis(500);

fn map_backend(provider: &str) -> Result<LLMBackend, ReasonError> {
    match provider {
        "openai" => Ok(LLMBackend::OpenAI),
        "anthropic" => Ok(LLMBackend::Anthropic),
        "google" => Ok(LLMBackend::Google),
        "ollama" => Ok(LLMBackend::Ollama),
        "groq" => Ok(LLMBackend::Groq),
        "mistral" => Ok(LLMBackend::Mistral),
        "deepseek" => Ok(LLMBackend::DeepSeek),
        other => Err(ReasonError::UnknownProvider(other.to_string())),
    }
}

/// Sort a provider failure into auth, billing or (retryable) generation errors.
pub(crate) fn classify(message: String) -> ReasonError {
    let lower = message.to_lowercase();
    if lower.contains("401") || lower.contains("invalid api key") || lower.contains("unauthorized")
    {
        ReasonError::Auth(message)
    } else if lower.contains("402") || lower.contains("insufficient credits") {
        ReasonError::Billing(message)
    } else {
        ReasonError::Generation(message)
    }
}

async fn generate_once(
    settings: &AiSettings,
    system: &str,
    user_msg: &str,
) -> Result<String, ReasonError> {
    let backend = map_backend(&settings.provider)?;

    let mut builder = LLMBuilder::new()
        .backend(backend)
        .model(&settings.model)
        .system(system)
        .temperature(settings.temperature)
        .max_tokens(settings.max_tokens);

    if !settings.api_key.is_empty() {
        builder = builder.api_key(&settings.api_key);
    }

    let llm = builder
        .build()
        .map_err(|e| ReasonError::Generation(format!("build LLM: {e}")))?;

    let messages = vec![ChatMessage::user().content(user_msg).build()];

    let response = llm
        .chat(&messages)
        .await
        .map_err(|e| classify(format!("chat: {e}")))?;

    match response.text() {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(ReasonError::EmptyResponse),
    }
}

/// Ask the model for a review and parse it. A failed call or an unparseable
/// answer is retried with linear backoff; auth and billing errors are final.
pub async fn generate_review(
    settings: &AiSettings,
    system: &str,
    user_msg: &str,
) -> Result<ReasoningEvaluation, ReasonError> {
    retry(settings.retries, move || async move {
        let raw = generate_once(settings, system, user_msg).await?;
        tracing::debug!(raw = %raw, "raw LLM output");
        parse_llm_output(&raw)
    })
    .await
}

/// Run `attempt` up to `retries + 1` times. Non-retryable errors stop early.
pub(crate) async fn retry<T, F, Fut>(retries: u32, mut attempt: F) -> Result<T, ReasonError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, ReasonError>>,
{
    let mut n = 0;
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() || n >= retries => {
                tracing::warn!(attempts = n + 1, error = %e, "generation failed");
                return Err(e);
            }
            Err(e) => {
                n += 1;
                let delay = BACKOFF_STEP * n;
                tracing::warn!(attempt = n, ?delay, error = %e, "retrying generation");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::RunContext;
use crate::error::{PipelineError, PipelineResult};

/// What the text provider actually sent back, reduced to one tagged shape.
#[derive(Debug, PartialEq)]
pub enum DraftOutcome {
    Text(String),
    ProviderError(String),
    UnexpectedShape(String),
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

#[derive(Debug, Deserialize)]
struct ProviderFailure {
    error: String,
}

// The inference API answers with a bare string, a list of generated-text
// objects, a single such object, or an error object, depending on model and
// load state.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProviderPayload {
    Plain(String),
    Batch(Vec<GeneratedText>),
    Single(GeneratedText),
    Failure(ProviderFailure),
}

pub fn classify_payload(body: &str) -> DraftOutcome {
    match serde_json::from_str::<ProviderPayload>(body) {
        Ok(ProviderPayload::Plain(text)) => DraftOutcome::Text(text),
        Ok(ProviderPayload::Batch(items)) => match items.into_iter().next() {
            Some(item) => DraftOutcome::Text(item.generated_text),
            None => DraftOutcome::UnexpectedShape("empty batch".into()),
        },
        Ok(ProviderPayload::Single(item)) => DraftOutcome::Text(item.generated_text),
        Ok(ProviderPayload::Failure(f)) => DraftOutcome::ProviderError(f.error),
        Err(e) => DraftOutcome::UnexpectedShape(e.to_string()),
    }
}

/// Ask the text model for a narration draft. Every failure mode is absorbed
/// here; the caller falls back to the templated script on `None`.
pub async fn request_draft(ctx: &RunContext) -> Option<String> {
    let prompt = format!(
        "Write a short narration script for a vertical news video about: {}",
        ctx.cfg.subject
    );
    match fetch_draft(ctx, &prompt).await {
        Ok(DraftOutcome::Text(text)) => {
            debug!("Text provider returned {} chars", text.len());
            Some(text)
        }
        Ok(DraftOutcome::ProviderError(e)) => {
            warn!("Text provider reported an error ({}); using the templated script", e);
            None
        }
        Ok(DraftOutcome::UnexpectedShape(detail)) => {
            warn!(
                "Text provider sent an unexpected payload ({}); using the templated script",
                detail
            );
            None
        }
        Err(e) => {
            warn!("Text generation failed ({}); using the templated script", e);
            None
        }
    }
}

async fn fetch_draft(ctx: &RunContext, prompt: &str) -> PipelineResult<DraftOutcome> {
    let url = format!(
        "https://api-inference.huggingface.co/models/{}",
        ctx.cfg.text_model
    );
    let res = ctx
        .client
        .post(&url)
        .bearer_auth(&ctx.cfg.hf_token)
        .json(&json!({ "inputs": prompt }))
        .send()
        .await
        .map_err(|e| PipelineError::upstream("text generation", e.to_string()))?;

    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|e| PipelineError::upstream("text generation", e.to_string()))?;
    if !status.is_success() {
        return Err(PipelineError::upstream(
            "text generation",
            format!("status {}: {}", status, body),
        ));
    }
    Ok(classify_payload(&body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_string_payload() {
        assert_eq!(
            classify_payload("\"a short script\""),
            DraftOutcome::Text("a short script".into())
        );
    }

    #[test]
    fn batch_payload() {
        assert_eq!(
            classify_payload(r#"[{"generated_text": "from the batch"}]"#),
            DraftOutcome::Text("from the batch".into())
        );
    }

    #[test]
    fn single_object_payload() {
        assert_eq!(
            classify_payload(r#"{"generated_text": "just one"}"#),
            DraftOutcome::Text("just one".into())
        );
    }

    #[test]
    fn error_payload() {
        assert_eq!(
            classify_payload(r#"{"error": "model is loading"}"#),
            DraftOutcome::ProviderError("model is loading".into())
        );
    }

    #[test]
    fn unknown_shapes_are_flagged() {
        assert!(matches!(
            classify_payload(r#"{"tokens": 12}"#),
            DraftOutcome::UnexpectedShape(_)
        ));
        assert!(matches!(
            classify_payload("not json at all"),
            DraftOutcome::UnexpectedShape(_)
        ));
        assert!(matches!(
            classify_payload("[]"),
            DraftOutcome::UnexpectedShape(_)
        ));
    }
}

use regex::Regex;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct NarrationScript {
    pub full_text: String,
    pub sentences: Vec<String>,
}

/// Build the final narration from the subject and an optional generated
/// draft. A missing or unusable draft is never an error; the templated
/// script takes over.
pub fn compose(subject: &str, draft: Option<String>) -> NarrationScript {
    let full_text = draft
        .as_deref()
        .and_then(normalize_draft)
        .unwrap_or_else(|| template_script(subject));
    let sentences = split_sentences(&full_text);
    NarrationScript {
        full_text,
        sentences,
    }
}

/// Keep only the first non-empty paragraph of a generated draft and collapse
/// its internal whitespace. The provider tends to echo the prompt or append
/// trailing noise in later paragraphs.
fn normalize_draft(draft: &str) -> Option<String> {
    let cleaned = draft.replace("\r\n", "\n");
    cleaned
        .split("\n\n")
        .map(str::trim)
        .find(|p| !p.is_empty())
        .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Deterministic fallback script: hook, context, tension, question and
/// call-to-action, all anchored on the subject.
fn template_script(subject: &str) -> String {
    format!(
        "{subject}. In this video: what happened, why it matters, and what could come next. \
         {subject} has been drawing attention for days, and the background explains a lot about where things stand. \
         Observers disagree on how serious the consequences are and who stands to gain. \
         The big question: is this a turning point, or just another headline? \
         Subscribe for short, factual explainers on the news that matters."
    )
}

pub fn split_sentences(text: &str) -> Vec<String> {
    let re = Regex::new(r"(?s)([^.!?]+[.!?]+)|([^.!?]+$)").unwrap();
    let mut sentences = Vec::new();
    for cap in re.captures_iter(text) {
        let s = cap.get(0).unwrap().as_str().trim();
        if !s.is_empty() {
            sentences.push(s.to_string());
        }
    }
    if sentences.is_empty() {
        warn!("No sentence breaks found; treating the whole text as one sentence");
        return vec![text.trim().to_string()];
    }
    sentences
}

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors raised by the generation pipeline.
///
/// Recoverable cases (a failed script draft, a failed per-asset image
/// generation, an unavailable duration probe) are absorbed at the component
/// boundary and never reach the orchestrator; everything that does reach it
/// is fatal for the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{service} error: {detail}")]
    Upstream { service: &'static str, detail: String },

    #[error("duration probe unavailable: {0}")]
    ProbeUnavailable(String),

    #[error("{tool} failed: {detail}")]
    Tool { tool: String, detail: String },

    #[error("assembly failed during {step}: {detail}")]
    Assembly { step: &'static str, detail: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn upstream(service: &'static str, detail: impl Into<String>) -> Self {
        Self::Upstream {
            service,
            detail: detail.into(),
        }
    }

    pub fn assembly(step: &'static str, detail: impl Into<String>) -> Self {
        Self::Assembly {
            step,
            detail: detail.into(),
        }
    }
}

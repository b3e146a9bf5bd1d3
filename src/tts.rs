use std::time::Duration;

use tracing::{info, warn};

use crate::audio::{self, AudioTrack, DEFAULT_AUDIO_DURATION_SECS};
use crate::config::RunContext;
use crate::error::{PipelineError, PipelineResult};
use crate::exec::run_tool;

const TTS_TIMEOUT: Duration = Duration::from_secs(120);

/// Synthesize the narration with edge-tts. Synthesis failure is fatal; a
/// failed duration probe only degrades the track to the default duration.
pub async fn synthesize(ctx: &RunContext, text: &str) -> PipelineResult<AudioTrack> {
    let path = ctx.paths.audio();
    let path_s = path.display().to_string();
    info!("Synthesizing narration with voice {}", ctx.cfg.voice);

    let args = [
        "--voice",
        &ctx.cfg.voice,
        "--text",
        text,
        "--write-media",
        &path_s,
    ];
    run_tool("edge-tts", &args, None, TTS_TIMEOUT)
        .await
        .map_err(|e| PipelineError::upstream("edge-tts", e.detail))?;

    if !path.exists() {
        return Err(PipelineError::upstream(
            "edge-tts",
            format!("no audio written to {}", path.display()),
        ));
    }

    let duration_seconds = resolve_duration(audio::probe_duration(&path).await);

    Ok(AudioTrack {
        path,
        duration_seconds,
    })
}

/// Probe failures degrade to the fixed default instead of aborting.
fn resolve_duration(probed: PipelineResult<f64>) -> f64 {
    match probed {
        Ok(seconds) => seconds,
        Err(e) => {
            warn!(
                "Duration probe failed ({}); assuming {}s",
                e, DEFAULT_AUDIO_DURATION_SECS
            );
            DEFAULT_AUDIO_DURATION_SECS
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probed_duration_is_used_as_is() {
        assert_eq!(resolve_duration(Ok(12.0)), 12.0);
    }

    #[test]
    fn probe_failure_degrades_to_the_default() {
        let failed = Err(PipelineError::ProbeUnavailable("no ffprobe".into()));
        assert_eq!(resolve_duration(failed), DEFAULT_AUDIO_DURATION_SECS);
    }
}

use std::path::{Path, PathBuf};
use std::time::Duration;

use hound::WavReader;

use crate::error::{PipelineError, PipelineResult};
use crate::exec::run_tool;

/// Substituted when the duration probe is unavailable. Matches the target
/// length the pipeline aims for, so a degraded run still produces a usable
/// timeline.
pub const DEFAULT_AUDIO_DURATION_SECS: f64 = 55.0;

const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct AudioTrack {
    pub path: PathBuf,
    pub duration_seconds: f64,
}

/// Measure the duration of an audio or video file. WAV files are read
/// natively; everything else goes through ffprobe.
pub async fn probe_duration(path: &Path) -> PipelineResult<f64> {
    let is_wav = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("wav"))
        .unwrap_or(false);
    if is_wav {
        wav_duration_seconds(path)
    } else {
        ffprobe_duration(path).await
    }
}

fn wav_duration_seconds(path: &Path) -> PipelineResult<f64> {
    let reader =
        WavReader::open(path).map_err(|e| PipelineError::ProbeUnavailable(e.to_string()))?;
    let spec = reader.spec();
    let samples = reader.len();
    let frames = samples as f64 / spec.channels as f64;
    Ok(frames / spec.sample_rate as f64)
}

async fn ffprobe_duration(path: &Path) -> PipelineResult<f64> {
    let path_s = path.display().to_string();
    let args = [
        "-v",
        "error",
        "-show_entries",
        "format=duration",
        "-of",
        "default=noprint_wrappers=1:nokey=1",
        &path_s,
    ];
    let output = run_tool("ffprobe", &args, None, PROBE_TIMEOUT)
        .await
        .map_err(|e| PipelineError::ProbeUnavailable(e.to_string()))?;
    let text = String::from_utf8_lossy(&output.stdout);
    let seconds: f64 = text
        .trim()
        .parse()
        .map_err(|_| PipelineError::ProbeUnavailable(format!("unparsable duration {:?}", text.trim())))?;
    if seconds <= 0.0 {
        return Err(PipelineError::ProbeUnavailable(format!(
            "nonpositive duration {}",
            seconds
        )));
    }
    Ok(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};

    fn write_wav(path: &Path, sample_rate: u32, samples: u32) {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for _ in 0..samples {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[tokio::test]
    async fn wav_probe_reads_duration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, 44100, 44100);
        let dur = probe_duration(&path).await.unwrap();
        assert!((dur - 1.0).abs() < 1e-6, "got {}", dur);
    }

    #[tokio::test]
    async fn missing_wav_is_probe_unavailable() {
        let err = probe_duration(Path::new("does_not_exist.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ProbeUnavailable(_)));
    }
}

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use crate::audio::{self, AudioTrack};
use crate::config::{
    AUDIO_FILE, CONCAT_LIST_FILE, FINAL_VIDEO_FILE, RunContext, SILENT_VIDEO_FILE,
};
use crate::error::{PipelineError, PipelineResult};
use crate::exec::run_tool;
use crate::images::ImageAsset;

pub const FRAME_RATE: u32 = 30;
pub const FRAME_INTERVAL_SECS: f64 = 1.0 / FRAME_RATE as f64;

const ENCODE_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug)]
pub struct ScheduleEntry<'a> {
    pub asset: &'a ImageAsset,
    pub seconds: f64,
}

#[derive(Debug, Clone)]
pub struct VideoArtifact {
    pub path: PathBuf,
    pub has_audio: bool,
    pub duration_seconds: f64,
}

/// Split the audio duration evenly across the assets. The last entry takes
/// the remainder so the schedule total matches the track exactly.
pub fn build_schedule<'a>(assets: &'a [ImageAsset], total_seconds: f64) -> Vec<ScheduleEntry<'a>> {
    let count = assets.len();
    let per = total_seconds / count as f64;
    assets
        .iter()
        .enumerate()
        .map(|(i, asset)| {
            let seconds = if i + 1 == count {
                total_seconds - per * (count as f64 - 1.0)
            } else {
                per
            };
            ScheduleEntry { asset, seconds }
        })
        .collect()
}

fn write_concat_list(path: &Path, schedule: &[ScheduleEntry<'_>]) -> PipelineResult<()> {
    let mut f = File::create(path)?;
    for entry in schedule {
        writeln!(f, "file '{}'", asset_file_name(entry.asset)?)?;
        writeln!(f, "duration {:.3}", entry.seconds)?;
    }
    // the concat demuxer ignores the trailing duration unless the final
    // frame is listed once more
    if let Some(last) = schedule.last() {
        writeln!(f, "file '{}'", asset_file_name(last.asset)?)?;
    }
    Ok(())
}

fn asset_file_name(asset: &ImageAsset) -> PipelineResult<&str> {
    asset
        .path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| PipelineError::assembly("schedule", "asset path has no usable file name"))
}

/// Lay the assets out over the narration, composite them into a silent clip
/// and mux the audio in. Both backend invocations are fatal on failure and
/// no partial final file survives.
pub async fn assemble(
    ctx: &RunContext,
    audio_track: &AudioTrack,
    assets: &[ImageAsset],
) -> PipelineResult<VideoArtifact> {
    if assets.is_empty() {
        return Err(PipelineError::assembly(
            "schedule",
            "no visual assets to lay out",
        ));
    }

    let schedule = build_schedule(assets, audio_track.duration_seconds);
    write_concat_list(&ctx.paths.concat_list(), &schedule)?;
    info!(
        "Compositing {} assets over {:.2}s of narration",
        schedule.len(),
        audio_track.duration_seconds
    );

    let out_dir = ctx.cfg.out_dir.as_path();
    let rate = FRAME_RATE.to_string();
    let composite_args = [
        "-y",
        "-f",
        "concat",
        "-safe",
        "0",
        "-i",
        CONCAT_LIST_FILE,
        "-c:v",
        "libx264",
        "-r",
        &rate,
        "-pix_fmt",
        "yuv420p",
        SILENT_VIDEO_FILE,
    ];
    run_tool("ffmpeg", &composite_args, Some(out_dir), ENCODE_TIMEOUT)
        .await
        .map_err(|e| PipelineError::assembly("composite", e.to_string()))?;
    require_output(&ctx.paths.silent_video(), "composite")?;

    let final_path = ctx.paths.final_video();
    let mux_args = [
        "-y",
        "-i",
        SILENT_VIDEO_FILE,
        "-i",
        AUDIO_FILE,
        "-map",
        "0:v:0",
        "-map",
        "1:a:0",
        "-c:v",
        "copy",
        "-c:a",
        "aac",
        "-b:a",
        "192k",
        "-shortest",
        FINAL_VIDEO_FILE,
    ];
    if let Err(e) = run_tool("ffmpeg", &mux_args, Some(out_dir), ENCODE_TIMEOUT).await {
        // never leave a half-written final file behind
        let _ = std::fs::remove_file(&final_path);
        return Err(PipelineError::assembly("mux", e.to_string()));
    }
    require_output(&final_path, "mux")?;

    let duration_seconds = match audio::probe_duration(&final_path).await {
        Ok(seconds) => seconds,
        Err(e) => {
            warn!(
                "Could not probe the final video ({}); reporting the audio duration",
                e
            );
            audio_track.duration_seconds
        }
    };

    Ok(VideoArtifact {
        path: final_path,
        has_audio: true,
        duration_seconds,
    })
}

fn require_output(path: &Path, step: &'static str) -> PipelineResult<()> {
    let meta = std::fs::metadata(path)
        .map_err(|_| PipelineError::assembly(step, format!("{} was not produced", path.display())))?;
    if meta.len() == 0 {
        return Err(PipelineError::assembly(
            step,
            format!("{} is empty", path.display()),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::AssetSource;

    fn assets(count: usize) -> Vec<ImageAsset> {
        (0..count)
            .map(|ordinal| ImageAsset {
                ordinal,
                source: AssetSource::Generated,
                path: PathBuf::from(format!("img_{:02}.jpg", ordinal)),
            })
            .collect()
    }

    #[test]
    fn schedule_conserves_the_audio_duration() {
        let assets = assets(5);
        let schedule = build_schedule(&assets, 12.0);
        assert_eq!(schedule.len(), 5);
        let total: f64 = schedule.iter().map(|e| e.seconds).sum();
        assert!((total - 12.0).abs() < FRAME_INTERVAL_SECS);
    }

    #[test]
    fn single_asset_takes_the_whole_track() {
        let assets = assets(1);
        let schedule = build_schedule(&assets, 12.0);
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].seconds, 12.0);
    }

    #[test]
    fn last_entry_absorbs_the_remainder() {
        let assets = assets(3);
        let schedule = build_schedule(&assets, 10.0);
        assert_eq!(schedule[0].seconds, schedule[1].seconds);
        let total: f64 = schedule.iter().map(|e| e.seconds).sum();
        assert_eq!(total, 10.0);
    }

    #[test]
    fn concat_list_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.txt");
        let assets = assets(2);
        let schedule = build_schedule(&assets, 12.0);
        write_concat_list(&path, &schedule).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "file 'img_00.jpg'\nduration 6.000\nfile 'img_01.jpg'\nduration 6.000\nfile 'img_01.jpg'\n"
        );
    }
}

mod args;
mod assembly;
mod audio;
mod captions;
mod config;
mod error;
mod exec;
mod images;
mod script;
mod textgen;
mod tts;

use std::fmt;
use std::fs;

use clap::Parser;
use tracing::{error, info};

use crate::args::Args;
use crate::assembly::VideoArtifact;
use crate::config::RunContext;
use crate::error::PipelineResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Init,
    ScriptReady,
    AudioReady,
    ImagesReady,
    Assembled,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::ScriptReady => "script ready",
            Stage::AudioReady => "audio ready",
            Stage::ImagesReady => "images ready",
            Stage::Assembled => "assembled",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info") // set to "debug" for more logs
        .init();

    let args = Args::parse();
    let ctx = RunContext::prepare(args)?;
    info!("Starting short video generation for subject: {}", ctx.cfg.subject);

    let mut stage = Stage::Init;
    match run_pipeline(&ctx, &mut stage).await {
        Ok(video) => {
            info!(
                "Final video written to {} ({:.1}s, audio: {})",
                video.path.display(),
                video.duration_seconds,
                video.has_audio
            );
            Ok(())
        }
        Err(e) => {
            let completed = stage;
            stage = Stage::Failed;
            error!(
                "Pipeline {} (last completed stage '{}'): {}",
                stage, completed, e
            );
            std::process::exit(1);
        }
    }
}

async fn run_pipeline(ctx: &RunContext, stage: &mut Stage) -> PipelineResult<VideoArtifact> {
    let draft = if ctx.cfg.use_generated_script {
        textgen::request_draft(ctx).await
    } else {
        None
    };
    let narration = script::compose(&ctx.cfg.subject, draft);
    fs::write(ctx.paths.script(), format!("{}\n", narration.full_text))?;
    info!("Narration script ready ({} sentences)", narration.sentences.len());
    *stage = Stage::ScriptReady;

    // No data dependency between synthesis and asset generation; the first
    // fatal failure cancels the other side.
    let (audio_track, assets) = tokio::try_join!(
        tts::synthesize(ctx, &narration.full_text),
        images::provide_assets(ctx),
    )?;
    info!(
        "Narration audio ready: {} ({:.2}s)",
        audio_track.path.display(),
        audio_track.duration_seconds
    );
    *stage = Stage::AudioReady;
    info!("{} visual assets in display order", assets.len());
    *stage = Stage::ImagesReady;

    // Captions are timed against the probed audio duration, not the target
    // length the script was written for.
    let blocks = captions::build_timeline(&narration.sentences, audio_track.duration_seconds);
    captions::write_srt(&ctx.paths.subtitles(), &blocks)?;
    info!("Wrote {} caption blocks to {}", blocks.len(), ctx.paths.subtitles().display());

    let video = assembly::assemble(ctx, &audio_track, &assets).await?;
    *stage = Stage::Assembled;

    *stage = Stage::Done;
    Ok(video)
}

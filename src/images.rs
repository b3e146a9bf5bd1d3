use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde_json::json;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::RunContext;
use crate::error::{PipelineError, PipelineResult};
use crate::exec::run_tool;

pub const TARGET_WIDTH: u32 = 1080;
pub const TARGET_HEIGHT: u32 = 1920;

const STOCK_BASE_URL: &str = "https://picsum.photos";
const MAX_PARALLEL_FETCHES: usize = 3;
const NORMALIZE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetSource {
    Generated,
    FallbackStock,
}

#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub ordinal: usize,
    pub source: AssetSource,
    pub path: PathBuf,
}

/// Fetch one image per scene prompt, at most `MAX_PARALLEL_FETCHES` at a
/// time, and return them in ordinal order. A failed primary generation
/// degrades that asset to stock imagery; a failed stock fetch aborts the run.
pub async fn provide_assets(ctx: &RunContext) -> PipelineResult<Vec<ImageAsset>> {
    let prompts = &ctx.cfg.scene_prompts;
    info!("Fetching {} visual assets", prompts.len());

    let semaphore = Arc::new(Semaphore::new(MAX_PARALLEL_FETCHES));
    let mut jobs = JoinSet::new();
    for (ordinal, prompt) in prompts.iter().enumerate() {
        let client = ctx.client.clone();
        let token = ctx.cfg.hf_token.clone();
        let model = ctx.cfg.image_model.clone();
        let prompt = prompt.clone();
        let raw_path = ctx.paths.raw_image(ordinal);
        let final_path = ctx.paths.image(ordinal);
        let semaphore = semaphore.clone();
        jobs.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
            provide_one(&client, &token, &model, &prompt, ordinal, &raw_path, &final_path).await
        });
    }

    let mut assets = Vec::with_capacity(prompts.len());
    while let Some(joined) = jobs.join_next().await {
        // an early return drops the set, which aborts in-flight fetches
        let asset = match joined {
            Ok(Ok(asset)) => asset,
            Ok(Err(e)) => return Err(e),
            Err(e) => {
                return Err(PipelineError::upstream(
                    "image generation",
                    format!("worker task failed: {}", e),
                ));
            }
        };
        assets.push(asset);
    }
    assets.sort_by_key(|a| a.ordinal);

    let stock = assets
        .iter()
        .filter(|a| a.source == AssetSource::FallbackStock)
        .count();
    info!(
        "Visual assets ready: {} generated, {} stock",
        assets.len() - stock,
        stock
    );
    Ok(assets)
}

async fn provide_one(
    client: &reqwest::Client,
    token: &str,
    model: &str,
    prompt: &str,
    ordinal: usize,
    raw_path: &Path,
    final_path: &Path,
) -> PipelineResult<ImageAsset> {
    let (bytes, source) = match fetch_generated(client, token, model, prompt).await {
        Ok(bytes) => (bytes, AssetSource::Generated),
        Err(e) => {
            warn!(
                "Asset {}: primary generation failed ({}); falling back to stock imagery",
                ordinal, e
            );
            (fetch_stock(client).await?, AssetSource::FallbackStock)
        }
    };

    tokio::fs::write(raw_path, &bytes).await?;
    normalize(raw_path, final_path).await?;
    tokio::fs::remove_file(raw_path).await.ok();

    Ok(ImageAsset {
        ordinal,
        source,
        path: final_path.to_path_buf(),
    })
}

/// A usable primary response must be a success carrying image bytes; the
/// provider signals errors and cold models with JSON bodies instead.
pub fn is_image_response(status: StatusCode, content_type: Option<&str>) -> bool {
    status.is_success() && content_type.is_some_and(|ct| ct.starts_with("image/"))
}

async fn fetch_generated(
    client: &reqwest::Client,
    token: &str,
    model: &str,
    prompt: &str,
) -> PipelineResult<Vec<u8>> {
    let url = format!("https://api-inference.huggingface.co/models/{}", model);
    let res = client
        .post(&url)
        .bearer_auth(token)
        .json(&json!({ "inputs": prompt }))
        .send()
        .await
        .map_err(|e| PipelineError::upstream("image generation", e.to_string()))?;

    let status = res.status();
    let content_type = res
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    if !is_image_response(status, content_type.as_deref()) {
        let body = res.text().await.unwrap_or_default();
        return Err(PipelineError::upstream(
            "image generation",
            format!(
                "status {}, content type {}: {:.200}",
                status,
                content_type.as_deref().unwrap_or("unknown"),
                body
            ),
        ));
    }
    let bytes = res
        .bytes()
        .await
        .map_err(|e| PipelineError::upstream("image generation", e.to_string()))?;
    Ok(bytes.to_vec())
}

async fn fetch_stock(client: &reqwest::Client) -> PipelineResult<Vec<u8>> {
    let url = format!("{}/{}/{}", STOCK_BASE_URL, TARGET_WIDTH, TARGET_HEIGHT);
    let res = client
        .get(&url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| PipelineError::upstream("stock imagery", e.to_string()))?;
    let bytes = res
        .bytes()
        .await
        .map_err(|e| PipelineError::upstream("stock imagery", e.to_string()))?;
    Ok(bytes.to_vec())
}

/// Scale whatever the provider sent to the fixed vertical frame, so the
/// assembly step never sees heterogeneous dimensions.
async fn normalize(input: &Path, output: &Path) -> PipelineResult<()> {
    let input_s = input.display().to_string();
    let output_s = output.display().to_string();
    let scale = format!("scale={}:{}", TARGET_WIDTH, TARGET_HEIGHT);
    let args = [
        "-y",
        "-i",
        &input_s,
        "-vf",
        &scale,
        "-frames:v",
        "1",
        &output_s,
    ];
    run_tool("ffmpeg", &args, None, NORMALIZE_TIMEOUT).await?;
    Ok(())
}

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::args::Args;
use crate::error::{PipelineError, PipelineResult};

pub const SCRIPT_FILE: &str = "script.txt";
pub const SUBTITLE_FILE: &str = "subtitles.srt";
pub const AUDIO_FILE: &str = "voice.mp3";
pub const CONCAT_LIST_FILE: &str = "list.txt";
pub const SILENT_VIDEO_FILE: &str = "video_tmp.mp4";
pub const FINAL_VIDEO_FILE: &str = "final_video.mp4";

pub fn image_file(ordinal: usize) -> String {
    format!("img_{:02}.jpg", ordinal)
}

pub fn raw_image_file(ordinal: usize) -> String {
    format!("raw_{:02}", ordinal)
}

/// Every remote call shares this request budget.
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct Config {
    pub subject: String,
    pub out_dir: PathBuf,
    pub scene_prompts: Vec<String>,
    pub use_generated_script: bool,
    pub voice: String,
    pub image_model: String,
    pub text_model: String,
    pub hf_token: String,
}

/// Output locations for one run. All artifacts land in a single directory
/// so the media backend can be driven with bare file names from there.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    out_dir: PathBuf,
}

impl OutputPaths {
    pub fn script(&self) -> PathBuf {
        self.out_dir.join(SCRIPT_FILE)
    }

    pub fn subtitles(&self) -> PathBuf {
        self.out_dir.join(SUBTITLE_FILE)
    }

    pub fn audio(&self) -> PathBuf {
        self.out_dir.join(AUDIO_FILE)
    }

    pub fn concat_list(&self) -> PathBuf {
        self.out_dir.join(CONCAT_LIST_FILE)
    }

    pub fn silent_video(&self) -> PathBuf {
        self.out_dir.join(SILENT_VIDEO_FILE)
    }

    pub fn final_video(&self) -> PathBuf {
        self.out_dir.join(FINAL_VIDEO_FILE)
    }

    pub fn image(&self, ordinal: usize) -> PathBuf {
        self.out_dir.join(image_file(ordinal))
    }

    pub fn raw_image(&self, ordinal: usize) -> PathBuf {
        self.out_dir.join(raw_image_file(ordinal))
    }
}

/// Context handed to every pipeline component: resolved configuration,
/// output locations and the shared HTTP client. One per run, never shared
/// across runs.
pub struct RunContext {
    pub cfg: Config,
    pub paths: OutputPaths,
    pub client: reqwest::Client,
}

impl RunContext {
    /// Resolve the CLI/env configuration and fail fast on anything that
    /// would doom the run, before the first network call.
    pub fn prepare(args: Args) -> PipelineResult<Self> {
        let subject = args
            .subject
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| {
                std::env::var("SUBJECT")
                    .ok()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
            })
            .ok_or_else(|| {
                PipelineError::Configuration(
                    "no subject given (pass one as an argument or set SUBJECT)".into(),
                )
            })?;

        let hf_token = std::env::var("HF_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PipelineError::Configuration("HF_TOKEN env var missing".into()))?;

        if args.image_count == 0 {
            return Err(PipelineError::Configuration(
                "--image-count must be at least 1".into(),
            ));
        }

        let scene_prompts = match &args.prompts {
            Some(path) => load_prompts(Path::new(path))?,
            None => derived_prompts(&subject, args.image_count),
        };

        let out_dir = PathBuf::from(args.out_dir);
        fs::create_dir_all(&out_dir)?;

        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| PipelineError::Configuration(format!("http client: {}", e)))?;

        Ok(Self {
            cfg: Config {
                subject,
                out_dir: out_dir.clone(),
                scene_prompts,
                use_generated_script: args.generated_script,
                voice: args.voice,
                image_model: args.image_model,
                text_model: args.text_model,
                hf_token,
            },
            paths: OutputPaths { out_dir },
            client,
        })
    }
}

fn load_prompts(path: &Path) -> PipelineResult<Vec<String>> {
    let raw = fs::read_to_string(path).map_err(|e| {
        PipelineError::Configuration(format!("cannot read prompts file {}: {}", path.display(), e))
    })?;
    let prompts: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    if prompts.is_empty() {
        return Err(PipelineError::Configuration(format!(
            "prompts file {} has no usable lines",
            path.display()
        )));
    }
    Ok(prompts)
}

pub fn derived_prompts(subject: &str, count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            format!(
                "{}, dramatic news illustration, vertical composition, scene {}",
                subject,
                i + 1
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn derived_prompts_cover_every_scene() {
        let prompts = derived_prompts("Harbor strike", 3);
        assert_eq!(prompts.len(), 3);
        assert!(prompts.iter().all(|p| p.contains("Harbor strike")));
        assert_ne!(prompts[0], prompts[2]);
    }

    #[test]
    fn prompts_file_keeps_nonempty_lines() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "a stormy port\n\n  crowds at dawn  \n").unwrap();
        let prompts = load_prompts(f.path()).unwrap();
        assert_eq!(prompts, vec!["a stormy port", "crowds at dawn"]);
    }

    #[test]
    fn empty_prompts_file_is_a_config_error() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let err = load_prompts(f.path()).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn output_paths_share_one_directory() {
        let paths = OutputPaths {
            out_dir: PathBuf::from("out"),
        };
        assert_eq!(paths.audio(), PathBuf::from("out").join(AUDIO_FILE));
        assert_eq!(paths.image(3), PathBuf::from("out").join("img_03.jpg"));
    }
}

use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "Turn a subject line into a short vertical news video")]
pub struct Args {
    /// Subject of the video; falls back to the SUBJECT env var
    pub subject: Option<String>,

    #[clap(long, default_value = "output")]
    pub out_dir: String,

    /// Number of illustration images when no prompts file is given
    #[clap(long, default_value_t = 5)]
    pub image_count: usize,

    /// Draft the narration with the text model instead of the template
    #[clap(long)]
    pub generated_script: bool,

    /// File with one image prompt per line (overrides --image-count)
    #[clap(long)]
    pub prompts: Option<String>,

    #[clap(long, default_value = "en-US-ChristopherNeural")]
    pub voice: String,

    #[clap(long, default_value = "stabilityai/stable-diffusion-2")]
    pub image_model: String,

    #[clap(long, default_value = "mistralai/Mistral-7B-Instruct-v0.2")]
    pub text_model: String,
}

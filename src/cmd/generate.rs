use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};

use vidmaker::{ApiKey, ImageSource, VideoGenerator, VidmakerConfig};

/// Where the prompt text comes from.
pub enum PromptSource {
    Text(String),
    File(PathBuf),
    Url(String),
}

impl PromptSource {
    pub fn from_args(
        prompt: Option<String>,
        prompt_file: Option<PathBuf>,
        url: Option<String>,
    ) -> Result<Self> {
        match (prompt, prompt_file, url) {
            (Some(text), None, None) => Ok(Self::Text(text)),
            (None, Some(path), None) => Ok(Self::File(path)),
            (None, None, Some(url)) => Ok(Self::Url(url)),
            _ => bail!("exactly one of --prompt, --prompt-file or --url is required"),
        }
    }
}

/// Parse `INDEX=SOURCE` into a segment index and image source.
fn parse_image_arg(arg: &str) -> Result<(usize, ImageSource)> {
    let (index, source) = arg
        .split_once('=')
        .with_context(|| format!("invalid --image {arg:?}: expected INDEX=SOURCE"))?;
    let index: usize = index
        .trim()
        .parse()
        .with_context(|| format!("invalid --image {arg:?}: {index:?} is not a segment index"))?;
    let source = source.trim();
    if source.is_empty() {
        bail!("invalid --image {arg:?}: empty source");
    }
    Ok((index, ImageSource::parse(source)))
}

pub async fn cmd_generate(
    mut config: VidmakerConfig,
    source: PromptSource,
    age: Option<u32>,
    api_key: Option<&str>,
    images: &[String],
    output: Option<PathBuf>,
    retry_delay: Option<f64>,
) -> Result<()> {
    let images = images
        .iter()
        .map(|arg| parse_image_arg(arg))
        .collect::<Result<Vec<_>>>()?;

    let Some(credential) = api_key.and_then(ApiKey::new) else {
        bail!("no API key: pass --api-key or set OPENAI_API_KEY");
    };

    if let Some(delay) = retry_delay {
        config.retry.delay_secs = delay;
    }

    let generator = VideoGenerator::from_config(&config)?;
    let mut run = generator.create_run(Some(credential), age);
    for (index, image) in images {
        run.set_image_source(index, image);
    }
    if let Some(path) = output {
        run = run.with_output(path);
    }

    println!("🎬 Run {}", run.id());
    match source {
        PromptSource::Text(text) => run.set_prompt(text)?,
        PromptSource::File(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            run.set_prompt(text)?;
        }
        PromptSource::Url(url) => {
            println!("🌐 Fetching prompt from {url}");
            run.set_prompt_from_url(&url).await?;
        }
    }

    let start = Instant::now();
    let path = run.run().await?;

    println!(
        "✅ {} segments → {} ({:.1}s)",
        run.segments().len(),
        path.display(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

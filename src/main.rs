//! `vidmaker` CLI - Turn a prompt or web page into a narrated video

mod cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgGroup, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "vidmaker")]
#[command(about = "Generate narrated, illustrated videos from text prompts")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/vidmaker/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a video from a prompt
    #[command(group(ArgGroup::new("source").required(true).multiple(false)))]
    Generate {
        /// Prompt text; paragraphs are separated by blank lines
        #[arg(short, long, group = "source")]
        prompt: Option<String>,

        /// Read the prompt from a file
        #[arg(long, group = "source")]
        prompt_file: Option<PathBuf>,

        /// Use the visible text of a web page as the prompt
        #[arg(short, long, group = "source")]
        url: Option<String>,

        /// Audience age used when rewriting the text
        #[arg(short, long)]
        age: Option<u32>,

        /// API key (default: $OPENAI_API_KEY)
        #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Image for a segment instead of a generated one: INDEX=URL_OR_PATH
        #[arg(long = "image", value_name = "INDEX=SOURCE")]
        images: Vec<String>,

        /// Where to write the final video
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Seconds to wait between retries of a remote call
        #[arg(long)]
        retry_delay: Option<f64>,
    },

    /// Print the prompt text extracted from a web page
    Extract {
        /// URL to fetch
        url: String,
    },

    /// Check that ffmpeg and ffprobe are available
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = cmd::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Generate {
            prompt,
            prompt_file,
            url,
            age,
            api_key,
            images,
            output,
            retry_delay,
        } => {
            let source = cmd::generate::PromptSource::from_args(prompt, prompt_file, url)?;
            cmd::generate::cmd_generate(
                config,
                source,
                age,
                api_key.as_deref(),
                &images,
                output,
                retry_delay,
            )
            .await?;
        }
        Commands::Extract { url } => {
            cmd::extract::cmd_extract(&url).await?;
        }
        Commands::Check => {
            cmd::check::cmd_check(&config).await?;
        }
    }

    Ok(())
}

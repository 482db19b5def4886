use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use stockcard::{AttributeRecord, CardConfig, Compositor};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "stockcard", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a card from a photo and an attribute record.
    Render(RenderArgs),
    /// Print the default configuration as JSON.
    Config,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Product photo (any common raster format).
    #[arg(long)]
    photo: PathBuf,

    /// Attribute record JSON.
    #[arg(long)]
    record: PathBuf,

    /// Output JPEG path.
    #[arg(long)]
    out: PathBuf,

    /// Card configuration JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Outline font; overrides the configured font path.
    #[arg(long, env = "STOCKCARD_FONT")]
    font: Option<PathBuf>,

    /// Treat the record file as a free-form model reply containing JSON.
    #[arg(long)]
    model_reply: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => render(args),
        Command::Config => {
            println!("{}", CardConfig::default().to_json_pretty()?);
            Ok(())
        }
    }
}

fn render(args: RenderArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => CardConfig::from_path(path)
            .with_context(|| format!("read config {}", path.display()))?,
        None => CardConfig::default(),
    };
    if let Some(font) = args.font {
        config.font_path = Some(font);
    }

    let reply = std::fs::read_to_string(&args.record)
        .with_context(|| format!("read record {}", args.record.display()))?;
    let record = if args.model_reply {
        AttributeRecord::from_model_reply(&reply)
    } else {
        AttributeRecord::from_json(&reply)
    }
    .with_context(|| format!("parse record {}", args.record.display()))?;

    let photo = std::fs::read(&args.photo)
        .with_context(|| format!("read photo {}", args.photo.display()))?;

    let jpeg = Compositor::new(config).composite(&photo, &record)?;
    std::fs::write(&args.out, &jpeg).with_context(|| format!("write {}", args.out.display()))?;

    tracing::info!(out = %args.out.display(), bytes = jpeg.len(), "card written");
    Ok(())
}

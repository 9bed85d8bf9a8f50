use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use easel_core::{
    create_exposer, llm::create_llm_client, load_config, validate_config, BatchSummary, Config,
    GenerationParams, GraphApiPublisher, ImageGenerator, LlmCaptionProvider, OpenAiImageGenerator,
    PublishingOrchestrator, SanitizedConfig, SqlitePublishJournal,
};

#[derive(Parser)]
#[command(name = "easel")]
#[command(about = "Generate AI artwork and publish it to Instagram")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(long, env = "EASEL_CONFIG", default_value = "easel.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Publish every unprocessed image, oldest first
    Publish {
        /// Images directory (overrides pipeline.images_dir)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Generate an image from a prompt into the images directory
    Generate(GenerateArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// Text prompt
    #[arg(long)]
    prompt: String,
    /// Image model (dall-e-2, dall-e-3)
    #[arg(long)]
    model: Option<String>,
    /// Output size, e.g. 1024x1024
    #[arg(long)]
    size: Option<String>,
    /// vivid or natural (dall-e-3 only)
    #[arg(long)]
    style: Option<String>,
    /// standard or hd (dall-e-3 only)
    #[arg(long)]
    quality: Option<String>,
    /// Images directory (overrides pipeline.images_dir)
    #[arg(long)]
    dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    info!("Loading configuration from {:?}", cli.config);
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    validate_config(&config).context("Configuration validation failed")?;

    let sanitized = SanitizedConfig::from(&config);
    info!(
        "Configuration loaded: {}",
        serde_json::to_string(&sanitized).unwrap_or_default()
    );

    match cli.command {
        Command::Publish { dir } => {
            let dir = dir.unwrap_or_else(|| config.pipeline.images_dir.clone());
            let summary = publish(&config, &dir).await?;
            print_summary(&summary);
        }
        Command::Generate(args) => {
            let path = generate(&config, args).await?;
            println!("Saved {}", path.display());
        }
    }

    Ok(())
}

async fn publish(config: &Config, dir: &Path) -> Result<BatchSummary> {
    let llm = create_llm_client(&config.caption).context("Failed to create caption client")?;
    info!("Using caption model: {} ({})", llm.model(), llm.provider());
    let captions = Arc::new(LlmCaptionProvider::new(
        Arc::from(llm),
        config.pipeline.marker.clone(),
    ));

    let publisher = Arc::new(GraphApiPublisher::new(config.publisher.clone()));
    let exposer =
        Arc::new(create_exposer(&config.exposure).context("Failed to configure exposure")?);

    let mut orchestrator = PublishingOrchestrator::new(
        config.pipeline.clone(),
        captions,
        publisher,
        exposer,
        config.caption.fallback.clone(),
    );

    if let Some(path) = &config.journal.path {
        let journal = SqlitePublishJournal::new(path)
            .with_context(|| format!("Failed to open publish journal {:?}", path))?;
        info!("Publish journal: {:?}", path);
        orchestrator = orchestrator.with_journal(Arc::new(journal));
    }

    let summary = orchestrator
        .run(dir)
        .await
        .with_context(|| format!("Publishing batch over {:?} failed", dir))?;
    Ok(summary)
}

async fn generate(config: &Config, args: GenerateArgs) -> Result<PathBuf> {
    let mut params = GenerationParams::from_defaults(args.prompt, &config.generator);
    if let Some(model) = args.model {
        params.model = model;
    }
    if let Some(size) = args.size {
        params.size = size;
    }
    if let Some(style) = args.style {
        params.style = style;
    }
    if let Some(quality) = args.quality {
        params.quality = quality;
    }

    let dir = args
        .dir
        .unwrap_or_else(|| config.pipeline.images_dir.clone());
    let generator =
        OpenAiImageGenerator::from_config(&config.generator, dir, config.pipeline.marker.clone())
            .context("Failed to create image generator")?;

    generator
        .generate(&params)
        .await
        .context("Image generation failed")
}

fn print_summary(summary: &BatchSummary) {
    println!(
        "Successfully uploaded: {}/{}",
        summary.succeeded, summary.attempted
    );
    if !summary.failures.is_empty() {
        println!("Failed uploads:");
        for failure in &summary.failures {
            println!("  {} ({}): {}", failure.filename, failure.outcome, failure.error);
        }
    }
}

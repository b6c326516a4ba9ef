mod args;
mod display;

use anyhow::Context;
use clap::Parser;
use sentibox_ai::SentimentPipeline;
use sentibox_core::{PipelineConfig, PredictResponse, Strategy};
use sentibox_fetch::ArtifactFetcher;
use sentibox_server::{AppState, ServeOptions};
use tracing::{error, info};

use crate::args::{Cli, Command};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    tracing::info!("sentibox v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => {
            let config = args.pipeline.to_config(!args.allow_missing_artifacts);
            let state = state_for(prepare(&config).await, config.require_artifacts)?;
            sentibox_server::serve(
                state,
                ServeOptions {
                    host: args.host,
                    port: args.port,
                    workers: args.workers,
                },
            )
            .await
        }
        Command::Predict(args) => {
            let config = args.pipeline.to_config(true);
            let pipeline = prepare(&config).await?;
            let prediction = pipeline.predict(&args.text)?;
            if args.json {
                let body = PredictResponse::ok(prediction.label, prediction.probability);
                println!("{}", serde_json::to_string(&body)?);
            } else {
                print!("{}", display::prediction_card(&args.text, &prediction, pipeline.policy()));
            }
            Ok(())
        }
        Command::Fetch(args) => {
            let config = args.pipeline.to_config(true);
            let fetched = fetch_word_vectors(&config).await?;
            if fetched {
                info!(path = %config.word_vectors_path.display(), "word vectors downloaded");
            } else {
                info!(path = %config.word_vectors_path.display(), "word vectors already present");
            }
            Ok(())
        }
    }
}

/// Decide what to serve after loading. A failed load aborts startup unless
/// artifacts are optional, in which case the server starts without a model.
fn state_for(
    loaded: anyhow::Result<SentimentPipeline>,
    require_artifacts: bool,
) -> anyhow::Result<AppState> {
    match loaded {
        Ok(pipeline) => Ok(AppState::new(pipeline)),
        Err(e) if !require_artifacts => {
            error!(error = %format!("{e:#}"), "artifacts failed to load, serving without a model");
            Ok(AppState::unloaded())
        }
        Err(e) => Err(e),
    }
}

/// Fetch anything missing, then load every artifact off the async runtime.
async fn prepare(config: &PipelineConfig) -> anyhow::Result<SentimentPipeline> {
    info!(config = %serde_json::to_string(config)?, "loading pipeline");
    if config.strategy == Strategy::EmbeddingAverage {
        fetch_word_vectors(config).await?;
    }

    let owned = config.clone();
    let pipeline = tokio::task::spawn_blocking(move || sentibox_ai::load_pipeline(&owned))
        .await
        .context("pipeline loader panicked")??;
    info!(
        strategy = %config.strategy,
        policy = %pipeline.policy(),
        width = pipeline.vectorizer().width(),
        "pipeline ready"
    );
    Ok(pipeline)
}

async fn fetch_word_vectors(config: &PipelineConfig) -> anyhow::Result<bool> {
    ArtifactFetcher::new()
        .ensure_file(&config.word_vectors_path, &config.word_vectors_url)
        .await
        .with_context(|| {
            format!(
                "fetching word vectors into {}",
                config.word_vectors_path.display()
            )
        })
}

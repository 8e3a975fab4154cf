use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use log::info;
use moodlens::server::{self, ServerConfig};
use moodlens::{ArtifactInfo, ArtifactManager, RuntimeConfig, SentimentClassifier};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct ArtifactArgs {
    /// Directory containing vocabulary.json and model.safetensors
    #[arg(short, long, env = "MOODLENS_ARTIFACTS", default_value = "lib/ml-models")]
    artifacts: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Serve POST /analyze over HTTP
    Serve {
        #[command(flatten)]
        artifacts: ArtifactArgs,
        #[arg(long, env = "MOODLENS_HOST", default_value = "127.0.0.1")]
        host: String,
        #[arg(short, long, env = "MOODLENS_PORT", default_value_t = 5000)]
        port: u16,
        /// Tokio worker threads (0 lets tokio decide)
        #[arg(long, default_value_t = 0)]
        worker_threads: usize,
        /// Upper bound on concurrently running predictions (0 lets tokio decide)
        #[arg(long, default_value_t = 0)]
        max_blocking_threads: usize,
    },
    /// Classify a single text and print the JSON response
    Predict {
        #[command(flatten)]
        artifacts: ArtifactArgs,
        text: String,
    },
    /// Print the classifier's shape and categories
    Info {
        #[command(flatten)]
        artifacts: ArtifactArgs,
    },
    /// Download an artifact set into the local cache
    Fetch {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long)]
        vocabulary_url: String,
        #[arg(long)]
        weights_url: String,
        /// Force a fresh download of the artifact files
        #[arg(short, long)]
        fresh: bool,
    },
    /// Check cached artifacts against their SHA-256 digests
    Verify {
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Args)]
struct SourceArgs {
    #[arg(long, default_value = "default")]
    name: String,
    #[arg(long)]
    vocabulary_sha256: String,
    #[arg(long)]
    weights_sha256: String,
}

fn load_classifier(args: &ArtifactArgs) -> anyhow::Result<SentimentClassifier> {
    let start_time = Instant::now();
    info!("Loading artifacts from {:?}", args.artifacts);
    let classifier = SentimentClassifier::builder()
        .with_artifacts(&args.artifacts)?
        .build()
        .context("failed to build classifier")?;
    info!("Classifier built (took {:.2?})", start_time.elapsed());
    Ok(classifier)
}

fn artifact_info(source: &SourceArgs, vocabulary_url: String, weights_url: String) -> ArtifactInfo {
    ArtifactInfo {
        name: source.name.clone(),
        vocabulary_url,
        weights_url,
        vocabulary_hash: source.vocabulary_sha256.clone(),
        weights_hash: source.weights_sha256.clone(),
    }
}

fn main() -> anyhow::Result<()> {
    moodlens::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            artifacts,
            host,
            port,
            worker_threads,
            max_blocking_threads,
        } => {
            // Fail before binding if the artifacts are unusable.
            let classifier = Arc::new(load_classifier(&artifacts)?);
            let runtime = moodlens::create_runtime(&RuntimeConfig {
                worker_threads,
                max_blocking_threads,
            })?;
            runtime.block_on(server::serve(&ServerConfig { host, port }, classifier))
        }
        Command::Predict { artifacts, text } => {
            let classifier = load_classifier(&artifacts)?;
            match classifier.predict(&text) {
                Ok(prediction) => println!("{}", serde_json::to_string_pretty(&prediction)?),
                Err(failure) => {
                    println!("{}", serde_json::json!({ "error": failure.message }));
                    std::process::exit(1);
                }
            }
            Ok(())
        }
        Command::Info { artifacts } => {
            let classifier = load_classifier(&artifacts)?;
            println!("{}", serde_json::to_string_pretty(&classifier.info())?);
            Ok(())
        }
        Command::Fetch {
            source,
            vocabulary_url,
            weights_url,
            fresh,
        } => {
            let manager = ArtifactManager::new_default()?;
            let info = artifact_info(&source, vocabulary_url, weights_url);
            let runtime = moodlens::create_runtime(&RuntimeConfig::default())?;
            runtime.block_on(async {
                if fresh {
                    info!("Fresh download requested - removing any existing artifact files...");
                    manager.remove_download(&info.name)?;
                }
                manager.ensure_downloaded(&info).await
            })?;
            println!("{}", manager.get_artifact_dir(&info.name).display());
            Ok(())
        }
        Command::Verify { source } => {
            let manager = ArtifactManager::new_default()?;
            let info = artifact_info(&source, String::new(), String::new());
            if manager.verify(&info)? {
                println!("{}: ok", info.name);
                Ok(())
            } else {
                anyhow::bail!("artifacts '{}' are missing or corrupted", info.name)
            }
        }
    }
}

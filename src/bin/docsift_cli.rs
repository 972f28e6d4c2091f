//! Offline command line front end for the docsift pipeline.
//!
//! Runs extraction, summarization, keywords, and clustering against local files without the
//! database or HTTP server. Results are printed to stdout as JSON; logs go to stderr.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use docsift::{
    clustering::{DEFAULT_MAX_ITER, DEFAULT_SEED, kmeans, label_clusters},
    config::Config,
    embedding::{EmbeddingClient, build_embedding_client},
    extraction::{ExtractedText, TextExtractor, is_supported_extension},
    logging,
    metrics::PipelineMetrics,
    processing::Summarizer,
    text::extract_keywords,
};
use serde_json::{Value, json};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(
    name = "docsift-cli",
    version,
    about = "Summarize, tag, and cluster local documents"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the normalized text of a document.
    Extract { file: PathBuf },
    /// Summarize a document with the configured provider.
    Summarize { file: PathBuf },
    /// Print the most frequent content words of a document.
    Keywords {
        file: PathBuf,
        #[arg(long)]
        top_n: Option<usize>,
    },
    /// Summarize every supported document under a directory and cluster them by topic.
    Cluster {
        dir: PathBuf,
        #[arg(long)]
        clusters: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init_cli_tracing();
    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;
    let extractor = TextExtractor::new()
        .with_ocr(config.ocr_enabled)
        .with_language(&config.ocr_language);

    let output = match cli.command {
        Command::Extract { file } => {
            let extracted = extract(&extractor, &file)?;
            json!({
                "file": file.display().to_string(),
                "method": extracted.method,
                "text": extracted.text,
            })
        }
        Command::Summarize { file } => {
            let text = extract(&extractor, &file)?.text;
            let summarizer = Summarizer::from_config(&config)
                .context("failed to configure summarization provider")?;
            let metrics = PipelineMetrics::new();
            let summary = summarizer.summarize(&text, &metrics).await?;
            json!({
                "file": file.display().to_string(),
                "summary": summary,
                "keywords": extract_keywords(&text, config.keywords_top_n),
            })
        }
        Command::Keywords { file, top_n } => {
            let text = extract(&extractor, &file)?.text;
            let top_n = top_n.unwrap_or(config.keywords_top_n);
            if top_n == 0 {
                bail!("--top-n must be at least 1");
            }
            json!({
                "file": file.display().to_string(),
                "keywords": extract_keywords(&text, top_n),
            })
        }
        Command::Cluster { dir, clusters } => {
            cluster_directory(&config, &extractor, &dir, clusters).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn extract(extractor: &TextExtractor, file: &Path) -> Result<ExtractedText> {
    extractor
        .extract(file)
        .with_context(|| format!("failed to extract text from {}", file.display()))
}

async fn cluster_directory(
    config: &Config,
    extractor: &TextExtractor,
    dir: &Path,
    clusters: Option<usize>,
) -> Result<Value> {
    let k = clusters.unwrap_or(config.cluster_default_count);
    if k == 0 {
        bail!("--clusters must be at least 1");
    }

    let summarizer =
        Summarizer::from_config(config).context("failed to configure summarization provider")?;
    let embedder =
        build_embedding_client(config).context("failed to configure embedding provider")?;
    let metrics = PipelineMetrics::new();

    let mut files = Vec::new();
    let mut summaries = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !is_supported_extension(&name) {
            continue;
        }
        let path = entry.path();
        let text = match extractor.extract(path) {
            Ok(extracted) => extracted.text,
            Err(err) => {
                tracing::warn!(file = %path.display(), error = %err, "Skipping unreadable document");
                continue;
            }
        };
        let summary = summarizer.summarize(&text, &metrics).await?;
        tracing::info!(file = %path.display(), strategy = ?summary.strategy, "Summarized");
        files.push(path.display().to_string());
        summaries.push(summary.text);
    }

    if summaries.is_empty() {
        bail!("no supported documents found under {}", dir.display());
    }

    let vectors = embedder
        .generate_embeddings(summaries.clone())
        .await
        .context("failed to embed summaries")?;
    let result = kmeans(&vectors, k, DEFAULT_SEED, DEFAULT_MAX_ITER)?;
    let topics = label_clusters(&summaries, &result.labels, config.cluster_top_terms)?;

    let cluster_list: Vec<Value> = (0..result.cluster_count())
        .map(|cluster| {
            let members: Vec<&str> = result
                .members(cluster)
                .into_iter()
                .map(|index| files[index].as_str())
                .collect();
            json!({
                "cluster_id": cluster,
                "topics": topics.get(cluster).cloned().unwrap_or_default(),
                "files": members,
            })
        })
        .collect();
    let documents: Vec<Value> = files
        .iter()
        .zip(&summaries)
        .zip(&result.labels)
        .map(|((file, summary), cluster)| {
            json!({ "file": file, "cluster_id": cluster, "summary": summary })
        })
        .collect();

    Ok(json!({
        "clusters": cluster_list,
        "documents": documents,
        "metrics": metrics.snapshot(),
    }))
}

use chorus_embed::{EmbeddingProvider, FastEmbedProvider, HashEmbedProvider};
use chorus_retriever::{
    DocumentRegistry, EmbeddingIndex, IngestionPipeline, RagConfig, RetrievalService,
    check_consistency,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

/// A CLI tool to manage the chorus document index and query it.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base directory containing the chorus.db database file
    #[arg(short, long, default_value = ".")]
    base_dir: PathBuf,

    /// Use the deterministic hashing embedder instead of the ONNX model
    /// (no model download; lexical rather than semantic matching)
    #[arg(long)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest a document into the index
    Ingest {
        /// Path to the file to ingest
        file: PathBuf,
        /// Override the source name stored with the chunks (defaults to the
        /// file's name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Search the index by similarity
    Search {
        /// Query text
        query: String,
        /// Maximum number of results
        #[arg(short, long)]
        top_k: Option<usize>,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Delete a document's chunks and its registry record
    Delete {
        /// Filename the document was ingested under
        filename: String,
    },
    /// List registered documents
    List {
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Show index statistics
    Stats {
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Compare index chunk counts against document records
    Reconcile {
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum OutputFormat {
    Summary,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(OutputFormat::Summary),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {s}")),
        }
    }
}

/// Everything the commands need, constructed once at startup.
struct AppContext {
    config: RagConfig,
    index: EmbeddingIndex,
    registry: DocumentRegistry,
    pipeline: IngestionPipeline,
    service: RetrievalService,
}

impl AppContext {
    async fn init(base_dir: PathBuf, offline: bool) -> anyhow::Result<Self> {
        let config = RagConfig::new(base_dir);

        let provider: Arc<dyn EmbeddingProvider> = if offline {
            Arc::new(HashEmbedProvider::default())
        } else {
            Arc::new(FastEmbedProvider::create().await?)
        };

        // An unopenable index is fatal: nothing below can work without it.
        let index = EmbeddingIndex::open(&config.db_path(), provider).await?;
        let registry = DocumentRegistry::open(index.pool().clone()).await?;
        let pipeline = IngestionPipeline::new(index.clone(), registry.clone(), config.clone())?;
        let service = RetrievalService::new(index.clone(), config.top_k);

        Ok(Self {
            config,
            index,
            registry,
            pipeline,
            service,
        })
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chorus_retriever=info".into()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let app = AppContext::init(args.base_dir, args.offline).await?;

    match args.command {
        Commands::Ingest { file, name } => {
            let bytes = tokio::fs::read(&file).await?;
            let filename = match name {
                Some(name) => name,
                None => file
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .ok_or_else(|| anyhow::anyhow!("cannot derive a filename from {file:?}"))?,
            };

            let report = app.pipeline.ingest(&bytes, &filename).await?;
            println!(
                "Ingested {} ({} bytes) into {} chunks",
                report.filename, report.file_size, report.chunks_created
            );
            Ok(())
        }
        Commands::Search {
            query,
            top_k,
            format,
        } => {
            let results = app.service.retrieve(&query, top_k).await;

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&results)?);
                }
                OutputFormat::Summary => {
                    println!("Found {} results:", results.len());
                    for result in results {
                        println!(
                            "  Score: {:.3} | {} [{}/{}]",
                            result.similarity_score,
                            result.metadata.source,
                            result.metadata.chunk_index + 1,
                            result.metadata.total_chunks
                        );
                        println!(
                            "    {}",
                            result.content.chars().take(100).collect::<String>()
                        );
                    }
                }
            }
            Ok(())
        }
        Commands::Delete { filename } => {
            let removed = app.pipeline.delete_document(&filename).await?;
            println!("Deleted {removed} chunks for {filename}");
            Ok(())
        }
        Commands::List { format } => {
            let documents = app.registry.list().await?;

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&documents)?);
                }
                OutputFormat::Summary => {
                    println!("{} documents:", documents.len());
                    for doc in documents {
                        println!(
                            "  {} | {} chunks | {} bytes | {}",
                            doc.filename, doc.chunk_count, doc.file_size, doc.upload_time
                        );
                    }
                }
            }
            Ok(())
        }
        Commands::Stats { format } => {
            let stats = app.index.stats().await?;

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                }
                OutputFormat::Summary => {
                    println!("Index statistics:");
                    println!("  Chunks: {}", stats.chunks_count);
                    println!("  With embeddings: {}", stats.embedded_count);
                    println!("  Sources: {}", stats.sources_count);
                    println!("  Absorbed search errors: {}", stats.search_errors);
                    println!("  Database: {}", app.config.db_path().display());
                }
            }
            Ok(())
        }
        Commands::Reconcile { format } => {
            let report = check_consistency(&app.index, &app.registry).await?;

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                OutputFormat::Summary => {
                    println!(
                        "Reconciliation: {:?} ({} sources checked)",
                        report.status, report.sources_checked
                    );
                    for drift in &report.drifts {
                        match drift.recorded_chunks {
                            Some(recorded) => println!(
                                "  {}: index has {} chunks, record claims {}",
                                drift.source, drift.indexed_chunks, recorded
                            ),
                            None => println!(
                                "  {}: {} orphaned chunks with no document record",
                                drift.source, drift.indexed_chunks
                            ),
                        }
                    }
                }
            }

            if !report.is_healthy() {
                process::exit(2);
            }
            Ok(())
        }
    }
}

//! One-shot grounded question: builds a minimal conversation, runs the
//! turn-context injector against the local document index, and prints the
//! resulting message list.

use chorus_agent::{ChatContext, ChatMessage, PromptStore, TurnContextInjector};
use chorus_embed::{EmbeddingProvider, FastEmbedProvider, HashEmbedProvider};
use chorus_retriever::{EmbeddingIndex, RagConfig, RetrievalService};
use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

/// Ask a question against the local document index and show the grounded
/// conversation that would be sent to the model.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base directory containing the chorus.db database file
    #[arg(short, long, default_value = ".")]
    base_dir: PathBuf,

    /// Use the deterministic hashing embedder instead of the ONNX model
    #[arg(long)]
    offline: bool,

    /// Maximum number of grounding documents
    #[arg(short, long)]
    top_k: Option<usize>,

    /// The question to ask
    query: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chorus_agent=info".into()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = RagConfig::new(args.base_dir);

    let provider: Arc<dyn EmbeddingProvider> = if args.offline {
        Arc::new(HashEmbedProvider::default())
    } else {
        Arc::new(FastEmbedProvider::create().await?)
    };
    let index = EmbeddingIndex::open(&config.db_path(), provider).await?;
    let service = RetrievalService::new(index, config.top_k);

    let mut injector =
        TurnContextInjector::new(Arc::new(service), config.retrieval_timeout);
    if let Some(top_k) = args.top_k {
        injector = injector.with_top_k(top_k);
    }

    let prompts = PromptStore::default();
    let mut context = ChatContext::new();
    context.push(ChatMessage::system(prompts.get().await));
    context.push(ChatMessage::user(args.query));

    let outcome = injector.inject(&mut context).await;

    eprintln!("Grounding outcome: {outcome:?}");
    println!("{}", serde_json::to_string_pretty(context.messages())?);
    Ok(())
}

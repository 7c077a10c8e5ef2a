use chorus_context::{TextSplitter, tag_chunks};
use clap::Parser;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

/// Split a document into overlapping chunks and print them as JSON.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input text file. If not provided, reads from stdin.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Source name attached to each chunk's metadata. Defaults to the input
    /// filename, or "stdin".
    #[arg(short, long)]
    source: Option<String>,

    /// Maximum size of each chunk, in bytes.
    #[arg(long, default_value_t = 500)]
    chunk_size: usize,

    /// Bytes of overlap carried between consecutive chunks.
    #[arg(long, default_value_t = 100)]
    chunk_overlap: usize,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let text = match &args.input {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let source = args.source.unwrap_or_else(|| {
        args.input
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "stdin".to_string())
    });

    let splitter = TextSplitter::new(args.chunk_size, args.chunk_overlap)?;
    let chunks = tag_chunks(&source, splitter.split(&text));

    println!("{}", serde_json::to_string_pretty(&chunks)?);
    Ok(())
}

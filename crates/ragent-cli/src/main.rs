//! RAGent CLI - Command-line interface
//!
//! Usage:
//!   ragent chunk <path>
//!   ragent ask <question> --file <path> [--file <path> ...]
//!
//! `ask` runs the full pipeline in-process: parse, chunk, embed, index,
//! then answer the question grounded in the given files. It needs the
//! embedding/LLM provider configured via environment variables.

use anyhow::Context;
use clap::{Parser, Subcommand};
use ragent_core::config::AppConfig;
use ragent_core::{Document, RetrievalQuery};
use ragent_parser::{Chunker, ParserRegistry};
use ragent_rag::{create_llm_client, AnswerAssembler, Retriever};
use ragent_vector::{create_embedding_client, EmbeddingClient, InMemoryIndex};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "ragent")]
#[command(about = "Retrieval-augmented question answering over your documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a document and show how it would be chunked
    Chunk {
        /// Path to the document
        path: PathBuf,

        /// Window size in characters
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Overlap between windows in characters
        #[arg(long)]
        overlap: Option<usize>,
    },
    /// Ingest documents and answer a question grounded in them
    Ask {
        /// Question to ask
        question: String,

        /// Document to ingest (repeatable)
        #[arg(long = "file", required = true)]
        files: Vec<PathBuf>,

        /// Number of chunks to retrieve
        #[arg(long)]
        top_k: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    match cli.command {
        Commands::Chunk {
            path,
            chunk_size,
            overlap,
        } => {
            let chunker = Chunker::new(
                chunk_size.unwrap_or(config.retrieval.chunk_size),
                overlap.unwrap_or(config.retrieval.chunk_overlap),
            )?;
            let parsed = ParserRegistry::with_defaults().parse(&path)?;
            let document = Document::new(parsed.content);
            let chunks = chunker.split(&document);

            println!(
                "{}: {} chars, {} chunks (size {}, overlap {})",
                path.display(),
                document.text.chars().count(),
                chunks.len(),
                chunker.chunk_size(),
                chunker.overlap()
            );
            for chunk in &chunks {
                let preview: String = chunk.text.chars().take(60).collect();
                println!(
                    "  [{}] chars {}..{}  {}",
                    chunk.index,
                    chunk.start_offset,
                    chunk.end_offset,
                    preview.replace('\n', " ")
                );
            }
        }
        Commands::Ask {
            question,
            files,
            top_k,
        } => {
            let embedder: Arc<dyn EmbeddingClient> =
                Arc::from(create_embedding_client(&config.llm)?);
            let llm = Arc::from(create_llm_client(&config.llm)?);
            let retriever =
                Retriever::new(&config.retrieval, embedder, Arc::new(InMemoryIndex::new()))?;
            let assembler = AnswerAssembler::new(llm, config.retrieval.max_context_length);

            let parsers = ParserRegistry::with_defaults();
            for path in &files {
                let parsed = parsers
                    .parse(path)
                    .with_context(|| format!("failed to parse {}", path.display()))?;
                let filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());

                let document = Document::new(parsed.content).with_metadata("filename", filename);
                let receipt = retriever
                    .ingest(document, CancellationToken::new())
                    .await
                    .with_context(|| format!("failed to ingest {}", path.display()))?;
                eprintln!("ingested {} ({} chunks)", path.display(), receipt.chunk_count);
            }

            let query = RetrievalQuery::new(question.clone())
                .with_top_k(top_k.unwrap_or(config.retrieval.top_k));
            let context = retriever.query(&query).await?;
            let answer = assembler.answer(&question, &context).await?;

            println!("{}", answer.answer);
            if !answer.sources.is_empty() {
                println!("\nSources: {}", answer.sources.join(", "));
            }
        }
    }

    Ok(())
}

//! # docqa CLI
//!
//! ```bash
//! docqa --config ./config/docqa.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa init` | Create the index database and the empty collection |
//! | `docqa ingest <file.pdf>` | Structure, chunk, embed, and index a PDF |
//! | `docqa search "<query>"` | One retrieval pass, no reasoning loop |
//! | `docqa ask "<question>"` | Answer with the reasoning loop |
//! | `docqa wipe` | Delete everything in the collection |
//! | `docqa serve` | Start the HTTP service |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use docqa::config;
use docqa::logging;
use docqa::pdf::PdfReader;
use docqa::server;
use docqa::service::Harness;
use docqa::sqlite_index::SqliteIndex;

/// Question answering over your PDFs, with page-level citations.
#[derive(Parser)]
#[command(name = "docqa", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the index database and collection. Safe to re-run.
    Init,

    /// Ingest a PDF synchronously.
    Ingest {
        /// Path to the PDF.
        file: PathBuf,

        /// Document id to store chunks under (default: a new UUID).
        #[arg(long)]
        doc_id: Option<String>,
    },

    /// Retrieve and synthesize an answer without the reasoning loop.
    Search {
        query: String,

        /// Restrict to these documents (repeatable).
        #[arg(long = "doc-id")]
        doc_ids: Vec<String>,

        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Ask a question.
    Ask {
        question: String,

        /// Print the stop reason and step count to stderr.
        #[arg(long)]
        verbose: bool,
    },

    /// Wipe and reset the collection.
    Wipe,

    /// Start the HTTP service on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    logging::init(&cfg.logging);

    match cli.command {
        Commands::Init => {
            let index = SqliteIndex::open(&cfg.index.path, &cfg.index.collection).await?;
            println!(
                "initialized {} (collection '{}', {} chunks)",
                cfg.index.path.display(),
                index.collection(),
                index.count().await?
            );
            index.close().await;
        }
        Commands::Ingest { file, doc_id } => {
            let harness = Harness::from_config(&cfg).await?;
            let doc_id = doc_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let report = harness.ingest(&doc_id, PdfReader::open(file)).await?;
            println!("ingested {}", report.doc_id);
            println!("  pages:    {}", report.pages);
            println!("  sections: {}", report.sections);
            println!("  chunks:   {}", report.chunks);
        }
        Commands::Search {
            query,
            doc_ids,
            top_k,
        } => {
            let harness = Harness::from_config(&cfg).await?;
            let filter = (!doc_ids.is_empty()).then_some(doc_ids.as_slice());
            let result = harness.search(&query, filter, top_k).await?;
            println!("{}", result);
        }
        Commands::Ask { question, verbose } => {
            let harness = Harness::from_config(&cfg).await?;
            let answer = harness.ask(&question).await?;
            if verbose {
                eprintln!("stop: {:?}, steps: {}", answer.stop_reason, answer.steps);
            }
            println!("{}", answer.answer);
        }
        Commands::Wipe => {
            let harness = Harness::from_config(&cfg).await?;
            harness.wipe().await?;
            println!("{}", docqa::agent::WIPED_ANSWER);
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

//! # Lectern CLI
//!
//! The `lectern` binary is the primary interface for the course-materials
//! question answering engine.
//!
//! ## Usage
//!
//! ```bash
//! lectern --config ./config/lectern.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lectern init` | Create the SQLite database and run schema migrations |
//! | `lectern ingest [path]` | Parse, chunk, embed, and index course documents |
//! | `lectern courses` | Show the indexed course catalog |
//! | `lectern search "<query>"` | Inspect raw content retrieval (no model) |
//! | `lectern ask "<question>"` | Answer one question via the tool-calling loop |
//! | `lectern serve` | Start the JSON HTTP server |
//!
//! Embedding calls require the configured provider (`OPENAI_API_KEY` for
//! OpenAI, a running instance for Ollama); `ask` and `serve` additionally
//! require `ANTHROPIC_API_KEY` for the generative model.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use lectern::assistant::Assistant;
use lectern::config;
use lectern::courses;
use lectern::db;
use lectern::embedding::create_embedder;
use lectern::generator::ClaudeModel;
use lectern::ingest;
use lectern::migrate;
use lectern::search;
use lectern::server;
use lectern::store::VectorStore;

/// Lectern — a retrieval-augmented question answering engine for course
/// materials.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/lectern.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "lectern",
    about = "Lectern — retrieval-augmented question answering over course materials",
    version,
    long_about = "Lectern ingests structured course documents into a vector index and \
    answers natural-language questions by driving a tool-calling generative model \
    through a bounded retrieval loop."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/lectern.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the catalog and chunk tables.
    /// Idempotent — running it multiple times is safe.
    Init,

    /// Ingest course documents from a directory.
    ///
    /// Parses each matching document, chunks the lesson text, embeds the
    /// chunks, and stores everything. Documents whose course title is
    /// already indexed are skipped.
    Ingest {
        /// Directory of course documents. Defaults to `[ingest] root`
        /// from the config file.
        path: Option<PathBuf>,
    },

    /// Show the indexed course catalog.
    Courses,

    /// Inspect raw content retrieval for a query (no generative model).
    Search {
        /// The search query string.
        query: String,

        /// Restrict to an exact course title.
        #[arg(long)]
        course: Option<String>,

        /// Restrict to a lesson number.
        #[arg(long)]
        lesson: Option<i64>,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Answer one question through the tool-calling loop.
    Ask {
        /// The question to answer.
        question: String,

        /// Continue an existing session (keeps conversation context).
        #[arg(long)]
        session: Option<String>,
    },

    /// Start the JSON HTTP server.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { path } => {
            ingest::run_ingest(&cfg, path).await?;
        }
        Commands::Courses => {
            courses::run_courses(&cfg).await?;
        }
        Commands::Search {
            query,
            course,
            lesson,
            limit,
        } => {
            search::run_search(&cfg, &query, course, lesson, limit).await?;
        }
        Commands::Ask { question, session } => {
            let embedder = create_embedder(&cfg.embedding)?;
            let model = Arc::new(ClaudeModel::new(&cfg.generator)?);
            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;
            let store = Arc::new(VectorStore::new(pool, embedder));
            let assistant = Assistant::new(cfg.clone(), store, model);

            let outcome = assistant.query(&question, session).await?;

            println!("{}", outcome.answer);
            if !outcome.sources.is_empty() {
                println!();
                println!("Sources:");
                for source in &outcome.sources {
                    match &source.link {
                        Some(link) => println!("  - {} <{}>", source.label, link),
                        None => println!("  - {}", source.label),
                    }
                }
            }
            println!();
            println!("session: {}", outcome.session_id);
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

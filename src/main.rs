//! # ragchat CLI
//!
//! Upload PDFs, build a vector index over their sentences, and ask
//! questions answered with page-level citations.
//!
//! ## Usage
//!
//! ```bash
//! ragchat --config ./config/ragchat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ragchat upload <files>...` | Copy PDFs into the docs directory and extract chunks |
//! | `ragchat extract` | Re-extract the docs directory into the chunk artifact |
//! | `ragchat chunks` | Preview chunks from the artifact |
//! | `ragchat build` | Extract the docs directory and build the index |
//! | `ragchat ask "<question>"` | One-shot question with citations |
//! | `ragchat chat` | Interactive session, newest turn first |
//! | `ragchat status` | Show what each pipeline stage has produced |

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ragchat::progress::ProgressMode;
use ragchat::{artifact, build_cmd, chat_cmd, config, embedding, llm, status, upload};

/// ragchat: retrieval-augmented chat over your PDFs, with citations.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the file does not exist, built-in defaults are used.
#[derive(Parser)]
#[command(
    name = "ragchat",
    about = "Retrieval-augmented chat over uploaded PDF documents, with citations",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ragchat.toml")]
    config: PathBuf,

    /// Log pipeline activity to stderr. `RUST_LOG` takes precedence.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy PDF files into the docs directory, then re-extract it.
    ///
    /// Overwrites the chunk artifact. The index is not rebuilt; run
    /// `ragchat build` afterwards.
    Upload {
        /// PDF files to upload.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Re-extract every PDF in the docs directory into the chunk artifact.
    Extract,

    /// Print chunks from the artifact.
    Chunks {
        /// Only chunks from this file name.
        #[arg(long)]
        file: Option<String>,

        /// Only chunks from this page (1-based).
        #[arg(long)]
        page: Option<u32>,

        /// Maximum number of chunks to print.
        #[arg(long, default_value = "1")]
        limit: usize,
    },

    /// Extract the docs directory and build the vector index.
    ///
    /// Merges with an existing index: chunks at the same address are
    /// replaced, unchanged text is not re-embedded.
    Build {
        /// Progress output on stderr: `human`, `json` or `off`.
        /// Defaults to `human` on a terminal, otherwise `off`.
        #[arg(long, value_parser = parse_progress)]
        progress: Option<ProgressMode>,
    },

    /// Ask one question and print the answer with its citations.
    Ask {
        /// The question.
        question: String,
    },

    /// Start an interactive chat session on stdin.
    Chat,

    /// Show documents, artifact and index state.
    Status,
}

fn parse_progress(s: &str) -> Result<ProgressMode, String> {
    ProgressMode::parse(s)
        .ok_or_else(|| format!("invalid progress mode '{}': use human, json or off", s))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "ragchat=info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Upload { files } => {
            upload::run_upload(&cfg, &files)?;
        }
        Commands::Extract => {
            upload::run_extract(&cfg)?;
        }
        Commands::Chunks { file, page, limit } => {
            artifact::run_chunks(&cfg, file.as_deref(), page, Some(limit))?;
        }
        Commands::Build { progress } => {
            let embedder = embedding::create_provider(&cfg.embedding)?;
            let mode = progress.unwrap_or_else(ProgressMode::default_for_tty);
            build_cmd::run_build(&cfg, embedder.as_ref(), mode).await?;
        }
        Commands::Ask { question } => {
            chat_cmd::ensure_index(&cfg)?;
            let embedder = embedding::create_provider(&cfg.embedding)?;
            let model = llm::create_model(&cfg.llm)?;
            chat_cmd::run_ask(&cfg, embedder.as_ref(), model.as_ref(), &question).await?;
        }
        Commands::Chat => {
            chat_cmd::ensure_index(&cfg)?;
            let embedder = embedding::create_provider(&cfg.embedding)?;
            let model = llm::create_model(&cfg.llm)?;
            chat_cmd::run_chat(&cfg, embedder.as_ref(), model.as_ref()).await?;
        }
        Commands::Status => {
            status::run_status(&cfg).await?;
        }
    }

    Ok(())
}

//! juris CLI entry point

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use juris::config::{Config, ConfigValidator};
use juris::embedding::HashedEmbedder;
use juris::llm::ExtractiveGenerator;
use juris::memory::InMemoryBackend;
use juris::pipeline::RagPipeline;
use juris::Result;

#[derive(Parser)]
#[command(name = "juris")]
#[command(about = "Retrieval-augmented legal question answering", version)]
struct Cli {
    /// Path to the configuration file (defaults to the platform config dir)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },
    /// Validate the configuration file
    Validate,
    /// Run the built-in sample corpus through the pipeline
    Demo,
}

fn config_path(cli: &Cli) -> Result<std::path::PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => Config::default_path(),
    }
}

fn cmd_init(cli: &Cli, force: bool) -> Result<()> {
    let path = config_path(cli)?;

    if path.exists() && !force {
        println!(
            "Configuration already exists at {} (use --force to overwrite)",
            path.display()
        );
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| juris::JurisError::Io {
            source: e,
            context: format!("Failed to create config directory: {:?}", parent),
        })?;
    }

    Config::default().save(&path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn cmd_validate(cli: &Cli) -> Result<()> {
    let path = config_path(cli)?;
    let config = Config::load(&path)?;
    ConfigValidator::validate(&config)?;
    println!("Configuration at {} is valid", path.display());
    Ok(())
}

const SAMPLE_DOCUMENTS: &[&str] = &[
    "Indian Penal Code - Section 420 (Cheating and Dishonestly Inducing Delivery of Property): \
     Whoever cheats and thereby dishonestly induces the person deceived to deliver any property \
     to any person, or to make, alter or destroy the whole or any part of a valuable security, \
     shall be punished with imprisonment of either description for a term which may extend to \
     seven years, and shall also be liable to fine.",
    "Criminal Procedure Code - Section 154 (Registration of FIR): Any person can lodge a First \
     Information Report regarding any cognizable offence at the nearest police station. The FIR \
     must contain the basic facts and details of the alleged crime and names of the accused if \
     known. If the police refuse to register an FIR, the person can approach the Magistrate.",
    "Indian Penal Code - Section 302 (Punishment for Murder): Whoever commits murder shall be \
     punished with imprisonment for life, or with rigorous imprisonment for a term which may \
     extend to ten years, and shall also be liable to fine.",
];

const SAMPLE_QUERIES: &[&str] = &[
    "What is the penalty for cheating under Section 420?",
    "How do I file an FIR under the Criminal Procedure Code?",
    "What is the legal punishment for murder under Section 302?",
];

async fn cmd_demo(cli: &Cli) -> Result<()> {
    let path = config_path(cli)?;
    let config = if path.exists() {
        Config::load(&path)?
    } else {
        Config::default()
    };

    let embedder = Arc::new(HashedEmbedder::new(config.indexing.vector_dim));
    let generator = Arc::new(ExtractiveGenerator::default());
    let pipeline = RagPipeline::new(
        config,
        embedder,
        generator,
        Box::<InMemoryBackend>::default(),
    )?;

    println!("Ingesting {} sample documents...", SAMPLE_DOCUMENTS.len());
    let documents: Vec<String> = SAMPLE_DOCUMENTS.iter().map(|d| d.to_string()).collect();
    let chunks = pipeline.ingest_documents(&documents, None).await?;
    println!("Indexed {} chunks\n", chunks);

    let session_id = "demo-session";
    for query in SAMPLE_QUERIES {
        let outcome = pipeline.process_query(query, Some(session_id)).await?;
        println!("Q: {}", query);
        println!("   category: {}", outcome.category);
        println!(
            "   confidence: {:.2}{}",
            outcome.confidence,
            if outcome.served_from_cache {
                " (cached)"
            } else {
                ""
            }
        );
        println!("A: {}\n", outcome.response);
    }

    let stats = pipeline.stats().await?;
    println!(
        "chunks={} cached_responses={} document_records={} sessions={}",
        stats.indexed_chunks,
        stats.cached_responses,
        stats.document_records,
        stats.active_sessions
    );

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    info!("juris starting");

    match &cli.command {
        Commands::Init { force } => cmd_init(&cli, *force),
        Commands::Validate => cmd_validate(&cli),
        Commands::Demo => cmd_demo(&cli).await,
    }
}

//! Refinery CLI
//!
//! Runs the refinement pipeline against a configured input directory, or
//! seals/opens individual artifacts with the configured passphrase.
//!
//! # Usage
//! ```bash
//! refinery refine [--input-dir DIR] [--output-dir DIR]
//! refinery schema
//! refinery encrypt <FILE> [--output FILE]
//! refinery decrypt <FILE> [--output FILE]
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use refinery_core::{envelope, schema, Refinery, RefineryConfig, SchemaDescriptor};

/// Refinery - Deterministic refinement of coding-assistant training data
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: ingest, materialize, seal, publish
    Refine {
        /// Directory scanned for the input JSON document
        #[arg(long, value_name = "DIR")]
        input_dir: Option<PathBuf>,

        /// Directory where the artifacts are written
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Print the schema descriptor without writing a store
    Schema,

    /// Seal an artifact with the configured encryption key
    Encrypt {
        /// File to seal
        file: PathBuf,

        /// Output path (default: <FILE>.enc)
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Open a sealed artifact with the configured encryption key
    Decrypt {
        /// Sealed file to open
        file: PathBuf,

        /// Output path (default: <FILE> without its .enc suffix)
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_target(false)
            .init();
    }

    let mut config = RefineryConfig::from_env();

    match cli.command {
        Commands::Refine {
            input_dir,
            output_dir,
        } => {
            if let Some(dir) = input_dir {
                config = config.with_input_dir(dir);
            }
            if let Some(dir) = output_dir {
                config = config.with_output_dir(dir);
            }
            let output = Refinery::new(config).run()?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Schema => {
            let descriptor = SchemaDescriptor::from_config(&config, schema::DDL);
            println!("{}", serde_json::to_string_pretty(&descriptor)?);
        }
        Commands::Encrypt { file, output } => {
            let key = require_key(&config)?;
            let sealed = envelope::seal_file(&key, &file, output.as_deref())?;
            println!("Sealed artifact written to {}", sealed.display());
        }
        Commands::Decrypt { file, output } => {
            let key = require_key(&config)?;
            let opened = envelope::open_file(&key, &file, output.as_deref())?;
            println!("Decrypted artifact written to {}", opened.display());
        }
    }

    Ok(())
}

fn require_key(config: &RefineryConfig) -> anyhow::Result<String> {
    config
        .encryption_key
        .clone()
        .ok_or_else(|| anyhow::anyhow!("REFINEMENT_ENCRYPTION_KEY is not set"))
}

mod discover;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use engine::draft::write_draft;
use engine::transcript::load_transcript;
use engine::{ConformError, ConformSettings, InputPaths};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// File written by `draft` when no output is given.
const DRAFT_FILE_NAME: &str = "TRANSCRIPT_DRAFT.txt";

/// Rebuild an edit from a quoted-line script and a word-level transcript
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Conform the source timeline to the script and write the new sequence
    Run {
        /// Source timeline (xmeml)
        #[arg(long)]
        timeline: Option<PathBuf>,
        /// Word-level transcript (JSON)
        #[arg(long)]
        transcript: Option<PathBuf>,
        /// Edited script (JSON)
        #[arg(long)]
        script: Option<PathBuf>,
        /// Directory searched for inputs not given explicitly
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
        /// Output document (defaults to the configured file name inside --dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a readable draft of a transcript to build the script from
    Draft {
        /// Word-level transcript (JSON)
        #[arg(long)]
        transcript: Option<PathBuf>,
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn load_settings(path: Option<&Path>) -> Result<ConformSettings> {
    match path {
        Some(path) => ConformSettings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => Ok(ConformSettings::default()),
    }
}

fn init_logging(level: &str, verbose: bool) {
    let level = if verbose { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref())?;
    init_logging(&settings.logging.level, cli.verbose);

    match cli.command {
        Commands::Run {
            timeline,
            transcript,
            script,
            dir,
            output,
        } => {
            let explicit = InputPaths {
                timeline,
                transcript,
                script,
            };
            let inputs = discover::discover(&dir, explicit, &settings.discovery)?;
            let output = output.unwrap_or_else(|| dir.join(&settings.output.file_name));

            let report = engine::run(&inputs, &output, &settings).map_err(|e| match e {
                ConformError::MissingInput(role) => anyhow::anyhow!(
                    "No {} found: pass --{} or place it in {}",
                    role,
                    role.as_str(),
                    dir.display()
                ),
                other => anyhow::Error::new(other).context("Conform run failed"),
            })?;

            println!("Output: {}", output.display());
            println!("Duration: {}", report.duration_label());
        }
        Commands::Draft {
            transcript,
            dir,
            output,
        } => {
            let transcript = match transcript {
                Some(path) => path,
                None => discover::discover_transcript(&dir, &settings.discovery)?
                    .with_context(|| format!("No transcript found in {}", dir.display()))?,
            };
            let output = output.unwrap_or_else(|| dir.join(DRAFT_FILE_NAME));

            let doc = load_transcript(&transcript);
            write_draft(&doc, &settings.transcript, &output)
                .with_context(|| format!("Failed to write draft {}", output.display()))?;
            info!("Draft written from {}", transcript.display());
            println!("Output: {}", output.display());
        }
    }

    Ok(())
}

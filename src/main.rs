use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use tracing::{info, Level};

use gwsumm_core::utils::conf_helper::load_config;
use gwsumm_core::{read_data_archive, write_data_archive, ArchiveContents, SummaryContext};

#[derive(Parser)]
#[command(name = "gwsumm-core")]
#[command(about = "Resolve channels and inspect summary archives")]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, default_value = "gwsumm.json")]
    config: PathBuf,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve channel names and print their records as JSON
    Channels {
        /// Channel names, e.g. `L1:GDS-CALIB_STRAIN` or `L1:X.mean,m-trend`
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Read an archive and summarise its contents
    Archive {
        /// Path to a GWSA archive; defaults to `archive.path` from the configuration
        path: Option<PathBuf>,

        /// Write the archive back using the configured compression
        #[arg(long)]
        rewrite: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli.config).await?;
    let ctx = SummaryContext::new(config);
    info!("Running in {:?} mode", ctx.config.mode);

    match cli.command {
        Commands::Channels { names } => {
            let channels = ctx.resolver.resolve_all(&names).await?;
            println!("{}", serde_json::to_string_pretty(&channels)?);
        }
        Commands::Archive { path, rewrite } => {
            let Some(path) = path.or_else(|| ctx.config.archive.path.clone()) else {
                bail!("No archive given and no archive.path configured");
            };
            if !path.exists() {
                bail!("Archive not found: {}", path.display());
            }
            let counts = read_data_archive(&ctx.resolver, &ctx.data, &path).await?;
            let summary = json!({
                "timeseries": counts.timeseries,
                "spectrograms": counts.spectrograms,
                "flags": counts.flags,
                "channels": ctx.registry().names(),
                "timeseries_keys": ctx.data.timeseries_keys(),
                "spectrogram_keys": ctx.data.spectrogram_keys(),
                "flag_names": ctx.data.flag_names(),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);

            if rewrite {
                let compression = ctx.config.archive.compression;
                write_data_archive(&ctx.data, &path, ArchiveContents::default(), compression)?;
                info!("Rewrote {} with {:?} compression", path.display(), compression);
            }
        }
    }

    Ok(())
}

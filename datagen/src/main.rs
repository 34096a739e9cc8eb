use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use datagen::{build, logos, sources};

#[derive(Parser)]
#[command(name = "memewar-datagen")]
#[command(version)]
#[command(about = "Builds the meme board data payload and caches station/team logos")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write data.json from the division and station YAML listings
    Build {
        /// Directory holding the YAML files and `public/`
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Output file (defaults to `<root>/public/data.json`)
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,

        /// Keep running and rebuild whenever a listing changes
        #[arg(long)]
        watch: bool,
    },
    /// Download every referenced SVG logo into `public/logos/`
    FetchLogos {
        /// Directory holding the YAML files and `public/`
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Re-download logos that are already cached
        #[arg(long)]
        refresh: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match Cli::parse().command {
        Command::Build { root, out, watch } => {
            let out = out.unwrap_or_else(|| build::default_out(&root));
            if watch {
                build::watch(&root, &out, Duration::from_millis(500))
            } else {
                build::run_build(&root, &out)
            }
        }
        Command::FetchLogos { root, refresh } => {
            let sources = sources::load_sources(&root)?;
            let fetcher = logos::HttpFetcher::new()?;
            let report = logos::fetch_logos(&root, &sources, refresh, &fetcher)?;
            println!("{report}");
            Ok(())
        }
    }
}

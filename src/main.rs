//! CLI entry point for affidavit-engine

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use affidavit_engine::{commands, Affidavit};

#[derive(Parser)]
#[command(name = "affidavit")]
#[command(version)]
#[command(about = "Render and paginate affidavit templates", long_about = None)]
struct Cli {
    /// Render configuration (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template against a JSON data file
    #[command(alias = "r")]
    Render {
        /// Template file
        #[arg(short, long)]
        template: PathBuf,

        /// JSON data context
        #[arg(short = 'D', long)]
        data: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Split a resolved HTML document into page files
    #[command(alias = "p")]
    Paginate {
        /// Resolved HTML document
        #[arg(short, long)]
        input: PathBuf,

        /// Page width, e.g. 8.5in or 816px (defaults to the configured width)
        #[arg(short, long)]
        width: Option<String>,

        /// Directory for page files
        #[arg(short, long, default_value = "pages")]
        out_dir: PathBuf,
    },

    /// Render then paginate, one HTML file per page
    Preview {
        /// Template file
        #[arg(short, long)]
        template: PathBuf,

        /// JSON data context
        #[arg(short = 'D', long)]
        data: PathBuf,

        /// Directory for page files
        #[arg(short, long, default_value = "preview")]
        out_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "affidavit_engine=debug,info"
    } else {
        "affidavit_engine=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let app = Affidavit::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Render {
            template,
            data,
            out,
        } => {
            commands::render::run(&app, &template, &data, out.as_deref())?;
        }

        Commands::Paginate {
            input,
            width,
            out_dir,
        } => {
            commands::paginate::run(&app, &input, width.as_deref(), &out_dir)?;
        }

        Commands::Preview {
            template,
            data,
            out_dir,
        } => {
            let count = commands::preview::run(&app, &template, &data, &out_dir)?;
            println!("Wrote {} pages to {:?}", count, out_dir);
        }
    }

    Ok(())
}

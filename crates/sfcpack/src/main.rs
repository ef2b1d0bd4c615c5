//! sfcpack CLI - compiles single-file components into self-registering modules.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "sfcpack")]
#[command(about = "Single-file component compiler and localization exporter")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to sfcpack.toml config file
    #[arg(short, long, default_value = "sfcpack.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a config file and an example component
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },

    /// Compile every component into a module
    Build {
        /// Compile templates to render functions (overrides config)
        #[arg(long)]
        release: bool,

        /// Also write minified stylesheets
        #[arg(long)]
        minify: bool,

        /// Component directory (defaults to config or "website/vue")
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Export consolidated language files
    I18n {
        /// Component directory (defaults to config or "website/vue")
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    match cli.command {
        Commands::Init { yes } => {
            commands::init::run(&cli.config, yes).await?;
        }
        Commands::Build {
            release,
            minify,
            dir,
        } => {
            let overrides = commands::config::Overrides {
                release,
                minify,
                dir,
            };
            commands::build::run(&cli.config, overrides).await?;
        }
        Commands::I18n { dir } => {
            commands::i18n::run(&cli.config, dir).await?;
        }
    }

    Ok(())
}

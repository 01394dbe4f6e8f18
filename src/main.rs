use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use matchspec::ParallelFilter;
use matchspec::cli;
use matchspec::config::Config;

#[derive(Parser)]
#[command(name = "matchspec")]
#[command(version, about = "Match and filter conda packages against specifiers")]
struct Cli {
    /// Config file (defaults to $XDG_CONFIG_HOME/matchspec/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Worker threads for parallel filtering (0 = all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the canonical form of each specifier
    Parse {
        #[arg(required = true)]
        specs: Vec<String>,
    },
    /// Check a single package name and version against a specifier
    Check {
        spec: String,
        name: String,
        version: String,
    },
    /// Print catalog records matching every specifier as a JSON array
    Filter {
        catalog: PathBuf,
        #[arg(required = true)]
        specs: Vec<String>,
        /// Partition the catalog across a worker pool
        #[arg(long)]
        parallel: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(threads) = args.threads {
        config.filter.threads = threads;
    }
    if let Some(log_file) = args.log_file {
        config.log.file = Some(log_file);
    }
    config.log.json |= args.json_logs;

    let _guard = cli::logging::init(&config.log)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match args.command {
        Command::Parse { specs } => cli::parse(&specs, &mut out)?,
        Command::Check {
            spec,
            name,
            version,
        } => {
            cli::check(&spec, &name, &version, &mut out)?;
        }
        Command::Filter {
            catalog,
            specs,
            parallel,
        } => {
            let pool = if parallel {
                Some(ParallelFilter::new(&config.filter).context("failed to start worker pool")?)
            } else {
                None
            };
            cli::filter(&catalog, &specs, pool.as_ref(), &mut out)?;
        }
    }
    out.flush()?;
    Ok(())
}

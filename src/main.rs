use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use zync::replicate::{self, Plan};
use zync::zfs::{create_snapshot, Zfs};
use zync::{Config, Location};

#[derive(Parser, Debug)]
#[command(name = "zync")]
#[command(about = "Replicate ZFS snapshots incrementally, locally or over SSH", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: <config dir>/zync/config.toml)
    #[arg(long, global = true, env = "ZYNC_CONFIG")]
    config: Option<PathBuf>,

    /// zfs executable to run
    #[arg(long, global = true, value_name = "PATH")]
    zfs: Option<String>,

    /// Run zfs without sudo
    #[arg(long, global = true)]
    no_sudo: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a snapshot named after the current time
    #[command(group(ArgGroup::new("target").required(true).args(["location", "dataset"])))]
    Snapshot {
        /// Dataset to snapshot, as [host:]path
        location: Option<Location>,

        /// Same as LOCATION
        #[arg(long, value_name = "LOCATION")]
        dataset: Option<Location>,
    },

    /// Bring DST up to date with the snapshots of SRC
    #[command(group(ArgGroup::new("source").required(true).args(["src_pos", "src"])))]
    #[command(group(ArgGroup::new("destination").required(true).args(["dst_pos", "dst"])))]
    Sync {
        /// Source dataset, as [host:]path
        #[arg(value_name = "SRC")]
        src_pos: Option<Location>,

        /// Destination dataset, as [host:]path
        #[arg(value_name = "DST")]
        dst_pos: Option<Location>,

        /// Same as SRC
        #[arg(long, value_name = "LOCATION")]
        src: Option<Location>,

        /// Same as DST
        #[arg(long, value_name = "LOCATION")]
        dst: Option<Location>,

        /// Print the increments that would be sent and exit
        #[arg(long)]
        dry_run: bool,
    },
}

fn init_logging(verbose: u8, quiet: bool) {
    let default = match (quiet, verbose) {
        (true, _) => "zync=warn",
        (false, 0) => "zync=info",
        (false, 1) => "zync=debug",
        (false, _) => "zync=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_zfs(cli: &Cli) -> Result<Zfs> {
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(binary) = &cli.zfs {
        config.zfs.binary = binary.clone();
    }
    if cli.no_sudo {
        config.zfs.sudo = false;
    }
    Ok(Zfs::new(config.zfs, config.ssh))
}

/// Cancel everything in flight on Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, stopping");
            token.cancel();
        }
    });
    cancel
}

fn print_plan(src: &Location, dst: &Location, plan: &Plan) {
    if plan.is_empty() {
        println!("{} is up to date with {}", dst, src);
        return;
    }
    println!("{} increment(s) from {} to {}:", plan.len(), src, dst);
    for (i, increment) in plan.iter().enumerate() {
        println!("  {:>3}. {}", i + 1, increment);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let zfs = load_zfs(&cli)?;
    let cancel = cancel_on_ctrl_c();

    match cli.command {
        Commands::Snapshot { location, dataset } => {
            let location = location.or(dataset).context("No dataset given")?;
            let name = create_snapshot(&cancel, &zfs, &location)
                .await
                .context("Failed to create a snapshot")?;
            println!("{}", location.snapshot(&name));
        }
        Commands::Sync {
            src_pos,
            dst_pos,
            src,
            dst,
            dry_run,
        } => {
            let src = src_pos.or(src).context("No source given")?;
            let dst = dst_pos.or(dst).context("No destination given")?;

            if dry_run {
                let plan = replicate::plan_sync(&cancel, &zfs, &src, &dst)
                    .await
                    .context("Failed to plan sync")?;
                print_plan(&src, &dst, &plan);
                return Ok(());
            }

            let plan = replicate::sync(&cancel, &zfs, &src, &dst)
                .await
                .with_context(|| format!("Failed to sync {} to {}", src, dst))?;
            if plan.is_empty() {
                println!("{} is up to date with {}", dst, src);
            } else {
                println!(
                    "{} {} increment(s) from {} to {}",
                    "Sent".green(),
                    plan.len(),
                    src,
                    dst
                );
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

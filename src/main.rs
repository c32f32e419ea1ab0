use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use corowatch::app::{self, Format};
use corowatch::duration::parse_duration;
use corowatch::Settings;
use corowatch_sdk::Scheduler;

#[derive(Parser, Debug)]
#[command(name = "corowatch", version)]
#[command(about = "Collects corosync quorum and link health and exports it as metrics")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run a single collection cycle, print the batch and exit
    #[arg(long)]
    once: bool,

    /// Output format for --once
    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Collection interval, overriding the configuration (e.g., "10s", "1m")
    #[arg(short, long, value_parser = parse_duration, conflicts_with = "once")]
    interval: Option<Duration>,

    /// Run the corosync tools directly instead of through sudo
    #[arg(long)]
    no_sudo: bool,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(interval) = self.interval {
            settings.interval = interval;
        }
        if self.no_sudo {
            settings.use_sudo = false;
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings =
        Settings::load(args.config.as_deref()).context("failed to load configuration")?;
    args.apply(&mut settings);
    if settings.interval.is_zero() {
        anyhow::bail!("interval must be greater than zero");
    }

    init_logging(&settings.log_level);
    debug!(?settings, "loaded configuration");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(args, settings))
}

/// Logs go to stderr so `--once` output on stdout stays machine-readable.
fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args, settings: Settings) -> Result<()> {
    let collector = app::build_collector(&settings).context("failed to locate corosync tools")?;

    let namespace = settings.prometheus.as_ref().and_then(|p| p.namespace.clone());

    if args.once {
        // A single cycle goes to stdout only; long-running outputs are skipped
        let scheduler = Scheduler::builder(collector).build();
        let rendered = app::run_once(&scheduler, args.format, namespace.as_deref()).await?;
        println!("{rendered}");
        return Ok(());
    }

    let mut builder = Scheduler::builder(collector).interval(settings.interval);
    for output in app::build_outputs(&settings)? {
        builder = builder.output(output);
    }
    app::run_until_interrupted(&builder.build()).await
}

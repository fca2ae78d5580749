use anyhow::{bail, Context, Result};
use clap::Parser;
use pf141_core::{
    Calculator, KeyPort, ListingEngine, MachineConfig, OverflowPolicy, TraceScript,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    /// Full key/printer port: host pops read the printer FIFO.
    Calculator,
    /// Bare key port: host pops read the key FIFO.
    KeyPort,
}

#[derive(Parser, Debug)]
#[command(
    name = "keyprt",
    about = "Replay a host command script against the 141-PF key/printer port."
)]
struct Args {
    /// Command script (reset/cmd/wait/expect lines).
    trace: PathBuf,

    #[arg(long, value_enum, default_value_t = Target::Calculator)]
    target: Target,

    /// JSON config file; flags below override its values.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Ticks a key must be held before it counts as pressed.
    #[arg(long)]
    press_threshold: Option<u16>,

    /// Ticks per printer drum sector.
    #[arg(long)]
    sector_ticks: Option<u32>,

    #[arg(long, value_enum)]
    key_overflow: Option<OverflowPolicy>,

    #[arg(long, value_enum)]
    print_overflow: Option<OverflowPolicy>,

    /// Write a JSON state snapshot here after the run.
    #[arg(long, value_name = "PATH")]
    snapshot: Option<PathBuf>,

    /// Print the report as JSON instead of text.
    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn load_config(args: &Args) -> Result<MachineConfig> {
    let mut config = match &args.config {
        Some(path) => MachineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => MachineConfig::default(),
    };
    if let Some(threshold) = args.press_threshold {
        config.port.press_threshold = threshold;
    }
    if let Some(ticks) = args.sector_ticks {
        config.sector_ticks = ticks;
    }
    if let Some(policy) = args.key_overflow {
        config.port.key_overflow = policy;
    }
    if let Some(policy) = args.print_overflow {
        config.print_overflow = policy;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn write_snapshot<S: Serialize>(path: &Path, snapshot: &S) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot)?;
    fs::write(path, json).with_context(|| format!("writing snapshot {}", path.display()))?;
    info!("snapshot written to {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(&args)?;
    let text = fs::read_to_string(&args.trace)
        .with_context(|| format!("reading trace {}", args.trace.display()))?;
    let script: TraceScript = text
        .parse()
        .with_context(|| format!("parsing trace {}", args.trace.display()))?;
    info!(steps = script.len(), target = ?args.target, "running trace");

    let report = match args.target {
        Target::Calculator => {
            let mut calc = Calculator::new(config, ListingEngine::new());
            let report = script.run(&mut calc);
            if let Some(path) = &args.snapshot {
                write_snapshot(path, &calc.snapshot())?;
            }
            for line in calc.tape() {
                info!("tape: {line}");
            }
            report
        }
        Target::KeyPort => {
            let mut port = KeyPort::new(config.port);
            let report = script.run(&mut port);
            if let Some(path) = &args.snapshot {
                write_snapshot(path, &port.snapshot())?;
            }
            report
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for check in &report.checks {
            println!(
                "line {:>4} tick {:>8}: expected {} got {} {}",
                check.line,
                check.tick,
                check.expected,
                check.actual,
                if check.passed() { "ok" } else { "MISMATCH" }
            );
        }
        println!(
            "{} ticks, {} checks, {} mismatches",
            report.ticks,
            report.checks.len(),
            report.failures().count()
        );
    }

    if !report.passed() {
        bail!("{} expectation(s) failed", report.failures().count());
    }
    Ok(())
}

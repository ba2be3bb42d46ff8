use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use one_brc_chunked::{aggregate_file, Config};

#[derive(Parser, Debug)]
#[command(version, about = "Per-station min/mean/max over a measurements file")]
struct Args {
    /// Input file of `station;value` lines
    #[arg(default_value = "measurements.txt")]
    path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    let args = Args::parse();
    let config = Config::from_env().context("invalid configuration")?;

    let report = aggregate_file(&args.path, &config)
        .with_context(|| format!("failed to aggregate {}", args.path.display()))?;

    let stdout = io::stdout().lock();
    let mut writer = BufWriter::new(stdout);
    report.write_to(&mut writer)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

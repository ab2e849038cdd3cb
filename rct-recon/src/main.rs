//! rct-recon - batch reconciliation entry point
//!
//! Reads a JSON array of source batches on stdin and writes the reconciled
//! records plus a run summary as JSON on stdout. Logs go to stderr.
//!
//! Configuration is resolved by `rct_common::config::ConfigResolver`
//! (`RCT_RECON_CONFIG`, then the user and system config directories).

use anyhow::{Context, Result};
use rct_common::config::ConfigResolver;
use rct_common::logging::init_logging;
use rct_recon::{ReconConfig, Reconciler, SourceBatch};
use std::io::{Read, Write};
use tracing::info;

fn main() -> Result<()> {
    let config = ReconConfig::load(&ConfigResolver::default()).context("Failed to load configuration")?;
    init_logging(&config.logging);

    info!("Starting rct-recon v{}", env!("CARGO_PKG_VERSION"));

    let reconciler = Reconciler::from_config(&config).context("Failed to initialise reconciler")?;

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read source batches from stdin")?;
    let batches: Vec<SourceBatch> =
        serde_json::from_str(&input).context("Input is not a JSON array of source batches")?;
    info!("Read {} source batch(es)", batches.len());

    let output = reconciler.reconcile(&batches);

    let stdout = std::io::stdout();
    let mut writer = stdout.lock();
    serde_json::to_writer_pretty(&mut writer, &output).context("Failed to write output")?;
    writeln!(writer).context("Failed to write output")?;
    Ok(())
}

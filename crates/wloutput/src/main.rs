//! wloutput
//!
//! Prints the names of the outputs advertised by the running Wayland
//! compositor, one per line.

mod outputs;

use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use outputs::OutputInfo;

#[derive(Parser, Debug)]
#[command(name = "wloutput")]
#[command(about = "Print the names of the Wayland compositor's outputs")]
#[command(version)]
struct Args {
    /// Print every detail the compositor reports, as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let outputs = outputs::discover().context("Failed to query Wayland outputs")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if args.json {
        serde_json::to_writer_pretty(&mut out, &outputs).context("Failed to encode outputs")?;
        writeln!(out).context("Failed to write outputs")?;
    } else {
        write_names(&outputs, &mut out).context("Failed to write outputs")?;
    }

    Ok(())
}

/// Write one output name per line, skipping outputs that reported none
fn write_names<W: Write>(outputs: &[OutputInfo], out: &mut W) -> std::io::Result<()> {
    for output in outputs {
        match &output.name {
            Some(name) => writeln!(out, "{}", name)?,
            None => tracing::warn!(
                global = output.global,
                "Output has no name (compositor offers wl_output below version 4)"
            ),
        }
    }
    Ok(())
}

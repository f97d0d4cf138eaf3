use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dot_render::driver::DEFAULT_OUTPUT;
use dot_render::CAUSAL_GRAPH_DOT;

#[derive(Parser)]
#[command(name = "dot-render")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Parse the causal graph DOT description and render it to PNG")]
struct Cli {
    /// DOT file to render instead of the built-in causal graph
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// PNG file to write
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let source = match &cli.input {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
        }
        None => CAUSAL_GRAPH_DOT.to_string(),
    };

    // failures are already reported by the driver
    dot_render::run(&source, &cli.output);
    Ok(())
}

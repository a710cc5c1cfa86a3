use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

/// Replays an annotation script onto a PDF and writes `annotated_<name>`.
#[derive(Debug, Parser)]
#[command(name = "docsigner", version, about)]
struct Cli {
    /// PDF to annotate.
    input: PathBuf,
    /// JSON interaction script to replay.
    script: PathBuf,
    /// Output directory; defaults to the input's directory.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let options = docsigner::RunOptions {
        input: cli.input,
        script: cli.script,
        output_dir: cli.output_dir,
    };
    let summary = docsigner::run(&options)
        .with_context(|| format!("failed to annotate {}", options.input.display()))?;

    println!(
        "{} ({} markups, {} placements{})",
        summary.output.display(),
        summary.markups,
        summary.placements,
        if summary.skipped > 0 {
            format!(", {} skipped", summary.skipped)
        } else {
            String::new()
        }
    );
    Ok(())
}

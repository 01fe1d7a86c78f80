//! Command-line entry point for zipstrip.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;

use zipstrip::extract::path::stripped_relative_path;
use zipstrip::{Cli, LocalFileReader, ZipArchive, extract};

/// Extraction runs entry by entry, so a single-threaded runtime is enough.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if cli.list {
        return list_entries(&cli).await;
    }

    let report = extract(&cli.file, cli.options()).await?;

    if !cli.quiet {
        println!(
            "{}: {} files, {} directories extracted, {} entries skipped",
            cli.file, report.files, report.directories, report.skipped
        );
    }

    Ok(())
}

/// Print every entry next to the path it would be written to.
async fn list_entries(cli: &Cli) -> Result<()> {
    let config = cli.options().resolve(&cli.file);
    let reader = LocalFileReader::new(Path::new(&cli.file))?;
    let archive = ZipArchive::open(Arc::new(reader))
        .await
        .with_context(|| format!("Cannot read {}", cli.file))?;

    for entry in archive.entries() {
        match stripped_relative_path(&entry.name, config.strip_components()) {
            Ok(Some(relative)) => println!(
                "{}  ->  {}",
                entry.name,
                config.destination().join(relative).display()
            ),
            Ok(None) => println!("{}  (skipped)", entry.name),
            Err(err) => println!("{}  (rejected: {err})", entry.name),
        }
    }

    Ok(())
}

//! Archive walker: opens the archive, prepares the destination and hands
//! every entry to [`extract_entry`] in central directory order.

mod entry;
pub mod path;

pub use entry::{EntryOutcome, extract_entry};

use std::path::Path;
use std::sync::Arc;

use tokio::fs;
use tracing::{debug, info};

use crate::error::{ExtractError, Result};
use crate::io::{LocalFileReader, ReadAt};
use crate::options::{ExtractConfig, ExtractOptions};
use crate::zip::ZipArchive;

/// Counts of what an extraction produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractReport {
    pub files: usize,
    pub directories: usize,
    pub skipped: usize,
}

impl ExtractReport {
    fn record(&mut self, outcome: &EntryOutcome) {
        match outcome {
            EntryOutcome::File(_) => self.files += 1,
            EntryOutcome::Directory(_) => self.directories += 1,
            EntryOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// Extract the ZIP archive at `source` according to `options`.
///
/// Entries are written one at a time. The first failing entry aborts the run
/// and is returned; anything already written stays. With
/// `delete_source` set, the archive is removed only after every entry
/// succeeded.
///
/// ```no_run
/// use zipstrip::{ExtractOptions, extract};
///
/// # async fn run() -> Result<(), zipstrip::ExtractError> {
/// let report = extract(
///     "downloads/tool-1.2.zip",
///     ExtractOptions::default().destination("opt/tool").strip_components(1),
/// )
/// .await?;
/// println!("{} files", report.files);
/// # Ok(())
/// # }
/// ```
pub async fn extract(source: impl AsRef<Path>, options: ExtractOptions) -> Result<ExtractReport> {
    let source = source.as_ref();
    let config = options.resolve(source);

    let reader = LocalFileReader::new(source).map_err(|source_err| ExtractError::Open {
        path: source.to_path_buf(),
        source: source_err,
    })?;

    let report = {
        let archive = open_archive(Arc::new(reader), source).await?;
        extract_entries(&archive, &config, source).await?
        // archive, and with it the file handle, is released here
    };

    if config.delete_source() {
        fs::remove_file(source)
            .await
            .map_err(|err| ExtractError::RemoveSource {
                path: source.to_path_buf(),
                source: err,
            })?;
        debug!(archive = %source.display(), "removed source archive");
    }

    Ok(report)
}

async fn open_archive<R: ReadAt>(reader: Arc<R>, label: &Path) -> Result<ZipArchive<R>> {
    ZipArchive::open(reader)
        .await
        .map_err(|source| ExtractError::Open {
            path: label.to_path_buf(),
            source,
        })
}

async fn extract_entries<R: ReadAt>(
    archive: &ZipArchive<R>,
    config: &ExtractConfig,
    label: &Path,
) -> Result<ExtractReport> {
    let destination = config.destination();
    fs::create_dir_all(destination)
        .await
        .map_err(|source| ExtractError::CreateDir {
            path: destination.to_path_buf(),
            source,
        })?;

    info!(
        archive = %label.display(),
        destination = %destination.display(),
        entries = archive.entries().len(),
        strip_components = config.strip_components(),
        "extracting archive"
    );

    let mut report = ExtractReport::default();
    for entry in archive.entries() {
        let outcome = extract_entry(archive, entry, destination, config.strip_components()).await?;
        report.record(&outcome);
    }

    info!(
        archive = %label.display(),
        files = report.files,
        directories = report.directories,
        skipped = report.skipped,
        "extraction finished"
    );
    Ok(report)
}

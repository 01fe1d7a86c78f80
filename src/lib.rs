//! # zipstrip
//!
//! Extract ZIP archives into a directory, optionally dropping leading path
//! segments from every entry (like `tar --strip-components`) and removing the
//! archive afterwards.
//!
//! ## Features
//!
//! - STORED and DEFLATE entries, ZIP64 archives
//! - Unix permission bits restored on extracted files
//! - Entries that would land outside the destination are rejected
//! - Entries are streamed to disk one after another, never buffered whole
//!
//! ## Example
//!
//! ```no_run
//! use zipstrip::{ExtractOptions, extract};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // `project-v1/file.zip` holding `proj/a.txt` lands as `out/a.txt`
//!     let options = ExtractOptions::default()
//!         .destination("out")
//!         .strip_components(1)
//!         .delete_source(true);
//!     extract("project-v1/file.zip", options).await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod extract;
pub mod io;
pub mod options;
pub mod zip;

pub use cli::Cli;
pub use error::ExtractError;
pub use extract::{EntryOutcome, ExtractReport, extract, extract_entry};
pub use io::{LocalFileReader, ReadAt};
pub use options::{ExtractConfig, ExtractOptions};
pub use crate::zip::{ZipArchive, ZipEntry};

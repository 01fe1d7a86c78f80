//! ZIP archive reading.
//!
//! - [`structures`]: fixed records of the container (EOCD, ZIP64, header signatures)
//! - [`archive`]: central directory parsing and entry lookup
//! - [`entry`]: per-entry metadata, including directory and permission detection
//! - [`reader`]: streaming STORED/DEFLATE decoding of one entry
//!
//! Not supported: encryption, multi-disk archives, methods other than
//! STORED and DEFLATE.

mod archive;
mod entry;
mod reader;
mod structures;

pub use archive::ZipArchive;
pub use entry::ZipEntry;
pub use reader::EntryReader;
pub use structures::CompressionMethod;

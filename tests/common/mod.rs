//! Fixture archives for the integration tests.

#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub enum Item<'a> {
    Dir(&'a str),
    DirWithMode(&'a str, u32),
    File(&'a str, &'a [u8]),
    FileWithMode(&'a str, &'a [u8], u32),
}

pub struct Fixture {
    pub dir: TempDir,
    pub archive: PathBuf,
}

impl Fixture {
    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }
}

pub fn write_zip(path: &Path, items: &[Item], method: CompressionMethod) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut writer = ZipWriter::new(fs::File::create(path).unwrap());
    let options = SimpleFileOptions::default().compression_method(method);

    for item in items {
        match item {
            Item::Dir(name) => writer
                .add_directory(*name, options.unix_permissions(0o755))
                .unwrap(),
            Item::DirWithMode(name, mode) => writer
                .add_directory(*name, options.unix_permissions(*mode))
                .unwrap(),
            Item::File(name, content) => {
                writer
                    .start_file(*name, options.unix_permissions(0o644))
                    .unwrap();
                writer.write_all(content).unwrap();
            }
            Item::FileWithMode(name, content, mode) => {
                writer
                    .start_file(*name, options.unix_permissions(*mode))
                    .unwrap();
                writer.write_all(content).unwrap();
            }
        }
    }
    writer.finish().unwrap();
}

/// `project-v1/file.zip` holding `proj/`, `proj/a.txt` and `proj/sub/b.txt`
pub fn project_archive() -> Fixture {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let archive = dir.path().join("project-v1").join("file.zip");
    write_zip(
        &archive,
        &[
            Item::Dir("proj/"),
            Item::File("proj/a.txt", b"alpha\n"),
            Item::File("proj/sub/b.txt", b"bravo\n"),
        ],
        CompressionMethod::Deflated,
    );
    Fixture { dir, archive }
}

/// Replace every occurrence of `from` with the same-length `to`, patching the
/// local header and the central directory copy of a name alike.
pub fn patch_bytes(path: &Path, from: &[u8], to: &[u8]) {
    assert_eq!(from.len(), to.len());
    let mut data = fs::read(path).unwrap();
    let mut patched = 0;
    let mut i = 0;
    while i + from.len() <= data.len() {
        if &data[i..i + from.len()] == from {
            data[i..i + from.len()].copy_from_slice(to);
            patched += 1;
            i += from.len();
        } else {
            i += 1;
        }
    }
    assert!(patched > 0, "pattern not found in archive");
    fs::write(path, data).unwrap();
}

/// Overwrite the compression method of every header in the archive.
pub fn set_compression_method(path: &Path, method: u16) {
    let mut data = fs::read(path).unwrap();
    // (signature, offset of the method field)
    for (signature, field) in [(b"PK\x03\x04", 8usize), (b"PK\x01\x02", 10usize)] {
        let positions: Vec<usize> = data
            .windows(4)
            .enumerate()
            .filter(|(_, window)| *window == &signature[..])
            .map(|(i, _)| i)
            .collect();
        for pos in positions {
            data[pos + field..pos + field + 2].copy_from_slice(&method.to_le_bytes());
        }
    }
    fs::write(path, data).unwrap();
}

/// Rewrite every central directory header as made by MS-DOS with the given
/// attribute byte, as Windows archivers record entries.
pub fn set_dos_attributes(path: &Path, attrs: u8) {
    let mut data = fs::read(path).unwrap();
    let positions: Vec<usize> = data
        .windows(4)
        .enumerate()
        .filter(|(_, window)| *window == &b"PK\x01\x02"[..])
        .map(|(i, _)| i)
        .collect();
    assert!(!positions.is_empty(), "no central directory headers");
    for pos in positions {
        // upper byte of "version made by" is the host system
        data[pos + 5] = 0;
        data[pos + 38..pos + 42].copy_from_slice(&u32::from(attrs).to_le_bytes());
    }
    fs::write(path, data).unwrap();
}

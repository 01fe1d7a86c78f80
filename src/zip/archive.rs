//! Central directory parsing.
//!
//! ZIP files are read from the end:
//! 1. Find the End of Central Directory (EOCD) at the file's end
//! 2. If ZIP64, follow the locator to the ZIP64 EOCD
//! 3. Read the Central Directory to get metadata for all entries
//! 4. When an entry is opened, read its Local File Header to find the data

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use std::sync::Arc;

use crate::io::ReadAt;
use anyhow::{Context, Result, bail};

use super::entry::ZipEntry;
use super::reader::EntryReader;
use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = u16::MAX as u64;

/// A read-only view over a ZIP archive and its entry list.
///
/// Dropping the archive drops its reader, which closes the source.
pub struct ZipArchive<R: ReadAt> {
    reader: Arc<R>,
    entries: Vec<ZipEntry>,
}

impl<R: ReadAt> ZipArchive<R> {
    /// Parse the central directory of `reader`.
    ///
    /// Fails if the source is not a ZIP archive or its directory is damaged.
    pub async fn open(reader: Arc<R>) -> Result<Self> {
        let size = reader.size();
        let (eocd, eocd_offset) = find_eocd(reader.as_ref(), size).await?;

        let (cd_offset, cd_size, total_entries) = if eocd.needs_zip64() {
            let eocd64 = read_zip64_eocd(reader.as_ref(), eocd_offset).await?;
            (eocd64.cd_offset, eocd64.cd_size, eocd64.total_entries)
        } else {
            (
                eocd.cd_offset as u64,
                eocd.cd_size as u64,
                eocd.total_entries as u64,
            )
        };

        if cd_offset.checked_add(cd_size).is_none_or(|end| end > eocd_offset) {
            bail!("Central directory lies outside the archive");
        }

        // One read for the whole directory
        let mut cd_data = vec![0u8; cd_size as usize];
        reader.read_exact_at(cd_offset, &mut cd_data).await?;

        // Each header is at least CDFH_MIN_SIZE bytes, which caps a bogus count
        let capacity = total_entries.min(cd_size / CDFH_MIN_SIZE as u64) as usize;
        let mut entries = Vec::with_capacity(capacity);
        let mut cursor = Cursor::new(cd_data.as_slice());
        for index in 0..total_entries {
            let entry = parse_cdfh(&mut cursor)
                .with_context(|| format!("Corrupt central directory header #{index}"))?;
            entries.push(entry);
        }

        Ok(Self { reader, entries })
    }

    /// Entries in central directory order
    pub fn entries(&self) -> &[ZipEntry] {
        &self.entries
    }

    /// Open a streaming reader over the uncompressed content of `entry`.
    pub async fn open_entry(&self, entry: &ZipEntry) -> Result<EntryReader<'_, R>> {
        if entry.is_encrypted() {
            bail!("Encrypted entries are not supported");
        }
        let data_offset = self.data_offset(entry).await?;
        if data_offset
            .checked_add(entry.compressed_size)
            .is_none_or(|end| end > self.reader.size())
        {
            bail!("Entry data runs past the end of the archive");
        }
        EntryReader::new(
            self.reader.as_ref(),
            entry.compression_method,
            data_offset,
            entry.compressed_size,
        )
    }

    /// The Local File Header repeats name and extra fields with possibly
    /// different lengths, so the data offset has to be read from it.
    async fn data_offset(&self, entry: &ZipEntry) -> Result<u64> {
        let mut lfh = [0u8; LFH_SIZE];
        self.reader.read_exact_at(entry.lfh_offset, &mut lfh).await?;

        if &lfh[0..4] != LFH_SIGNATURE {
            bail!("Invalid Local File Header");
        }

        let mut cursor = Cursor::new(&lfh[26..]);
        let file_name_length = cursor.read_u16::<LittleEndian>()? as u64;
        let extra_field_length = cursor.read_u16::<LittleEndian>()? as u64;

        Ok(entry.lfh_offset + LFH_SIZE as u64 + file_name_length + extra_field_length)
    }
}

/// Find the End of Central Directory record and its offset.
///
/// The common case has no archive comment, so the record sits exactly at the
/// end. Otherwise search backwards across the largest possible comment.
async fn find_eocd<R: ReadAt + ?Sized>(reader: &R, size: u64) -> Result<(EndOfCentralDirectory, u64)> {
    let eocd_size = EndOfCentralDirectory::SIZE as u64;
    if size < eocd_size {
        bail!("Not a valid ZIP file: too small");
    }

    let offset = size - eocd_size;
    let mut buf = [0u8; EndOfCentralDirectory::SIZE];
    reader.read_exact_at(offset, &mut buf).await?;
    if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && buf[20..22] == [0, 0] {
        return Ok((EndOfCentralDirectory::parse(&buf)?, offset));
    }

    let search_size = (MAX_COMMENT_SIZE + eocd_size).min(size);
    let search_start = size - search_size;
    let mut buf = vec![0u8; search_size as usize];
    reader.read_exact_at(search_start, &mut buf).await?;

    let found = scan_for_eocd(&buf).context("Not a valid ZIP file")?;
    let eocd = EndOfCentralDirectory::parse(&buf[found..])?;
    Ok((eocd, search_start + found as u64))
}

/// Locate the last EOCD signature whose comment length matches the bytes
/// that follow it.
fn scan_for_eocd(buf: &[u8]) -> Option<usize> {
    let eocd_size = EndOfCentralDirectory::SIZE;
    if buf.len() < eocd_size {
        return None;
    }
    (0..=buf.len() - eocd_size).rev().find_map(|i| {
        if &buf[i..i + 4] != EndOfCentralDirectory::SIGNATURE {
            return None;
        }
        let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;
        (comment_len == buf.len() - i - eocd_size).then_some(i)
    })
}

/// The ZIP64 locator sits immediately before the regular EOCD.
async fn read_zip64_eocd<R: ReadAt + ?Sized>(
    reader: &R,
    eocd_offset: u64,
) -> Result<Zip64EndOfCentralDirectory> {
    let locator_offset = eocd_offset
        .checked_sub(Zip64Locator::SIZE as u64)
        .context("Missing ZIP64 locator")?;
    let mut locator_buf = [0u8; Zip64Locator::SIZE];
    reader.read_exact_at(locator_offset, &mut locator_buf).await?;
    let locator = Zip64Locator::parse(&locator_buf)?;

    let mut eocd64_buf = [0u8; Zip64EndOfCentralDirectory::MIN_SIZE];
    reader
        .read_exact_at(locator.eocd64_offset, &mut eocd64_buf)
        .await?;
    Zip64EndOfCentralDirectory::parse(&eocd64_buf)
}

fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> Result<ZipEntry> {
    let mut sig = [0u8; 4];
    cursor.read_exact(&mut sig)?;
    if sig != CDFH_SIGNATURE {
        bail!("Invalid Central Directory File Header");
    }

    let version_made_by = cursor.read_u16::<LittleEndian>()?;
    let _version_needed = cursor.read_u16::<LittleEndian>()?;
    let flags = cursor.read_u16::<LittleEndian>()?;
    let compression_method = cursor.read_u16::<LittleEndian>()?;
    let _last_mod_time = cursor.read_u16::<LittleEndian>()?;
    let _last_mod_date = cursor.read_u16::<LittleEndian>()?;
    let _crc32 = cursor.read_u32::<LittleEndian>()?;
    let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let mut uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let file_name_length = cursor.read_u16::<LittleEndian>()?;
    let extra_field_length = cursor.read_u16::<LittleEndian>()?;
    let file_comment_length = cursor.read_u16::<LittleEndian>()?;
    let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
    let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
    let external_attrs = cursor.read_u32::<LittleEndian>()?;
    let mut lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

    let mut file_name_bytes = vec![0u8; file_name_length as usize];
    cursor.read_exact(&mut file_name_bytes)?;
    // Non-UTF8 names are kept lossily rather than rejected
    let name = String::from_utf8_lossy(&file_name_bytes).into_owned();

    let mut extra = vec![0u8; extra_field_length as usize];
    cursor.read_exact(&mut extra)?;
    apply_zip64_extra(
        &extra,
        &mut uncompressed_size,
        &mut compressed_size,
        &mut lfh_offset,
    )?;

    let mut comment = vec![0u8; file_comment_length as usize];
    cursor.read_exact(&mut comment)?;

    Ok(ZipEntry {
        name,
        version_made_by,
        flags,
        compression_method: CompressionMethod::from(compression_method),
        compressed_size,
        uncompressed_size,
        external_attrs,
        lfh_offset,
    })
}

/// ZIP64 values are present only for header fields saturated at 0xFFFFFFFF,
/// in the fixed order uncompressed size, compressed size, offset.
fn apply_zip64_extra(
    extra: &[u8],
    uncompressed_size: &mut u64,
    compressed_size: &mut u64,
    lfh_offset: &mut u64,
) -> Result<()> {
    let mut cursor = Cursor::new(extra);
    while cursor.position() + 4 <= extra.len() as u64 {
        let header_id = cursor.read_u16::<LittleEndian>()?;
        let field_size = cursor.read_u16::<LittleEndian>()? as u64;
        let field_end = cursor.position() + field_size;

        if header_id == ZIP64_EXTRA_ID {
            for value in [uncompressed_size, compressed_size, lfh_offset] {
                if *value == u32::MAX as u64 && cursor.position() + 8 <= field_end {
                    *value = cursor.read_u64::<LittleEndian>()?;
                }
            }
            return Ok(());
        }
        cursor.set_position(field_end);
    }
    Ok(())
}

use anyhow::{Context, Result, bail};
use flate2::{Decompress, FlushDecompress, Status};

use crate::io::ReadAt;

use super::structures::CompressionMethod;

/// Compressed bytes fetched from the source per read
const INPUT_CHUNK: usize = 64 * 1024;

/// Streaming reader over one entry's uncompressed content.
///
/// Compressed data is pulled from the archive in bounded chunks, so large
/// entries are never held in memory whole.
pub struct EntryReader<'a, R: ReadAt> {
    reader: &'a R,
    /// Next compressed byte to fetch
    offset: u64,
    /// Compressed bytes not yet fetched
    remaining: u64,
    inflater: Option<Inflater>,
    finished: bool,
}

struct Inflater {
    state: Decompress,
    input: Vec<u8>,
    pos: usize,
    len: usize,
}

impl<'a, R: ReadAt> EntryReader<'a, R> {
    pub(crate) fn new(
        reader: &'a R,
        method: CompressionMethod,
        offset: u64,
        compressed_size: u64,
    ) -> Result<Self> {
        let inflater = match method {
            CompressionMethod::Stored => None,
            CompressionMethod::Deflate => Some(Inflater {
                // ZIP stores raw deflate, without the zlib header
                state: Decompress::new(false),
                input: vec![0u8; INPUT_CHUNK],
                pos: 0,
                len: 0,
            }),
            CompressionMethod::Unsupported(method) => {
                bail!("Unsupported compression method: {method} (only STORED and DEFLATE are supported)")
            }
        };

        Ok(Self {
            reader,
            offset,
            remaining: compressed_size,
            inflater,
            finished: false,
        })
    }

    /// Read the next piece of uncompressed data into `out`.
    ///
    /// Returns `Ok(0)` once the entry is exhausted.
    pub async fn read(&mut self, out: &mut [u8]) -> Result<usize> {
        if self.finished || out.is_empty() {
            return Ok(0);
        }

        let Some(inflater) = self.inflater.as_mut() else {
            let n = (out.len() as u64).min(self.remaining) as usize;
            if n == 0 {
                self.finished = true;
                return Ok(0);
            }
            self.reader.read_exact_at(self.offset, &mut out[..n]).await?;
            self.offset += n as u64;
            self.remaining -= n as u64;
            return Ok(n);
        };

        loop {
            if inflater.pos == inflater.len && self.remaining > 0 {
                let n = (inflater.input.len() as u64).min(self.remaining) as usize;
                self.reader
                    .read_exact_at(self.offset, &mut inflater.input[..n])
                    .await?;
                self.offset += n as u64;
                self.remaining -= n as u64;
                inflater.pos = 0;
                inflater.len = n;
            }

            let in_before = inflater.state.total_in();
            let out_before = inflater.state.total_out();
            let status = inflater
                .state
                .decompress(
                    &inflater.input[inflater.pos..inflater.len],
                    out,
                    FlushDecompress::None,
                )
                .context("Corrupt deflate stream")?;
            let consumed = (inflater.state.total_in() - in_before) as usize;
            let produced = (inflater.state.total_out() - out_before) as usize;
            inflater.pos += consumed;

            if status == Status::StreamEnd {
                self.finished = true;
                return Ok(produced);
            }
            if produced > 0 {
                return Ok(produced);
            }
            if inflater.pos == inflater.len && self.remaining == 0 {
                bail!("Deflate stream ended before its end marker");
            }
            if consumed == 0 && inflater.pos < inflater.len {
                bail!("Corrupt deflate stream: no progress");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use flate2::{Compress, Compression, FlushCompress};

    struct MemoryReader(Vec<u8>);

    #[async_trait]
    impl ReadAt for MemoryReader {
        async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
            let start = (offset as usize).min(self.0.len());
            // short reads exercise the read_exact_at loop
            let n = buf.len().min(self.0.len() - start).min(4096);
            buf[..n].copy_from_slice(&self.0[start..start + n]);
            Ok(n)
        }

        fn size(&self) -> u64 {
            self.0.len() as u64
        }
    }

    fn raw_deflate(data: &[u8]) -> Vec<u8> {
        let mut compress = Compress::new(Compression::default(), false);
        let mut out = Vec::with_capacity(data.len() + 1024);
        compress
            .compress_vec(data, &mut out, FlushCompress::Finish)
            .unwrap();
        out
    }

    async fn read_all<R: ReadAt>(mut reader: EntryReader<'_, R>, chunk: usize) -> Result<Vec<u8>> {
        let mut content = Vec::new();
        let mut buf = vec![0u8; chunk];
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                return Ok(content);
            }
            content.extend_from_slice(&buf[..n]);
        }
    }

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8 ^ (i / 997) as u8).collect()
    }

    #[tokio::test]
    async fn stored_entry_is_copied_from_its_offset() {
        let mut archive = b"HEADER".to_vec();
        archive.extend_from_slice(b"stored payload");
        archive.extend_from_slice(b"TRAILER");
        let source = MemoryReader(archive);

        let reader = EntryReader::new(&source, CompressionMethod::Stored, 6, 14).unwrap();
        assert_eq!(read_all(reader, 5).await.unwrap(), b"stored payload");
    }

    #[tokio::test]
    async fn deflate_entry_spanning_several_input_chunks() {
        let content = sample(3 * INPUT_CHUNK + 17);
        let compressed = raw_deflate(&content);
        let size = compressed.len() as u64;
        let source = MemoryReader(compressed);

        let reader = EntryReader::new(&source, CompressionMethod::Deflate, 0, size).unwrap();
        assert_eq!(read_all(reader, 8192).await.unwrap(), content);
    }

    #[tokio::test]
    async fn truncated_deflate_stream_is_an_error() {
        let compressed = raw_deflate(&sample(100_000));
        let half = compressed.len() as u64 / 2;
        let source = MemoryReader(compressed);

        let reader = EntryReader::new(&source, CompressionMethod::Deflate, 0, half).unwrap();
        assert!(read_all(reader, 8192).await.is_err());
    }

    #[test]
    fn unsupported_method_is_rejected_up_front() {
        let source = MemoryReader(Vec::new());
        let err = EntryReader::new(&source, CompressionMethod::Unsupported(14), 0, 0)
            .err()
            .unwrap();
        assert!(err.to_string().contains("14"));
    }
}

//! Per-bucket spill files used to fan fragments out to (contig, haplotype)
//! pairs and to reassemble deterministic output.
//!
//! A bucket set lives inside an owned temporary directory; dropping the set
//! removes the files, on the normal exit path and on errors alike. Writing
//! and reading are distinct phases: `into_readers` flushes every writer,
//! rewinds the files, and hands back buffered readers.

use anyhow::{bail, Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use tempfile::TempDir;

/// Append-only per-bucket files, write phase.
pub struct BucketWriter {
    dir: TempDir,
    writers: Vec<BufWriter<File>>,
}

impl BucketWriter {
    /// Creates `num_buckets` files inside a fresh temp directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or a file cannot be created.
    pub fn create(num_buckets: usize, label: &str) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("fgsim-{label}-"))
            .tempdir()
            .context("Failed to create spill directory")?;
        let mut writers = Vec::with_capacity(num_buckets);
        for i in 0..num_buckets {
            let path = dir.path().join(format!("bucket_{i}"));
            let file = OpenOptions::new()
                .create(true)
                .truncate(true)
                .read(true)
                .write(true)
                .open(&path)
                .with_context(|| format!("Failed to create spill file {}", path.display()))?;
            writers.push(BufWriter::new(file));
        }
        Ok(Self { dir, writers })
    }

    /// Number of buckets.
    #[must_use]
    pub fn num_buckets(&self) -> usize {
        self.writers.len()
    }

    /// The writer for one bucket.
    pub fn writer(&mut self, bucket: usize) -> &mut BufWriter<File> {
        &mut self.writers[bucket]
    }

    /// Flushes all buckets and rewinds them for sequential readback.
    ///
    /// # Errors
    ///
    /// Returns an error on flush or seek failure.
    pub fn into_readers(self) -> Result<BucketReader> {
        let mut readers = Vec::with_capacity(self.writers.len());
        for writer in self.writers {
            let mut file =
                writer.into_inner().context("Failed to flush spill file")?;
            file.seek(SeekFrom::Start(0))?;
            readers.push(BufReader::new(file));
        }
        Ok(BucketReader { _dir: self.dir, readers })
    }
}

/// Per-bucket files, read phase. Files are deleted on drop.
pub struct BucketReader {
    _dir: TempDir,
    readers: Vec<BufReader<File>>,
}

impl BucketReader {
    /// Number of buckets.
    #[must_use]
    pub fn num_buckets(&self) -> usize {
        self.readers.len()
    }

    /// The reader for one bucket.
    pub fn reader(&mut self, bucket: usize) -> &mut BufReader<File> {
        &mut self.readers[bucket]
    }
}

/// Fan-out of fragment ordinals into per-bucket binary files.
pub struct IdSplitter {
    inner: BucketWriter,
}

impl IdSplitter {
    /// Opens one binary spill file per bucket.
    ///
    /// # Errors
    ///
    /// Returns an error if the spill files cannot be created.
    pub fn create(num_buckets: usize) -> Result<Self> {
        Ok(Self { inner: BucketWriter::create(num_buckets, "ids")? })
    }

    /// Appends one ordinal to a bucket.
    ///
    /// # Errors
    ///
    /// Returns an error on write failure.
    pub fn write_id(&mut self, bucket: usize, id: i32) -> Result<()> {
        self.inner.writer(bucket).write_all(&id.to_le_bytes())?;
        Ok(())
    }

    /// Finishes the distribution phase and switches to readback.
    ///
    /// # Errors
    ///
    /// Returns an error on flush or seek failure.
    pub fn into_readers(self) -> Result<IdReader> {
        Ok(IdReader { inner: self.inner.into_readers()? })
    }
}

/// Sequential fixed-width readback of fragment ordinals.
pub struct IdReader {
    inner: BucketReader,
}

impl IdReader {
    /// Reads up to `max` ordinals from a bucket into `out`.
    ///
    /// Returns the number of ordinals read; zero at end of bucket.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or a truncated file.
    pub fn read_chunk(&mut self, bucket: usize, out: &mut Vec<i32>, max: usize) -> Result<usize> {
        out.clear();
        let reader = self.inner.reader(bucket);
        let mut bytes = vec![0u8; max * 4];
        let mut filled = 0;
        while filled < bytes.len() {
            let n = reader.read(&mut bytes[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled % 4 != 0 {
            bail!("Truncated ordinal spill file (read {filled} bytes)");
        }
        for chunk in bytes[..filled].chunks_exact(4) {
            out.push(i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        }
        Ok(out.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_id_roundtrip() {
        let mut splitter = IdSplitter::create(3).unwrap();
        for i in 0..100 {
            splitter.write_id((i % 3) as usize, i).unwrap();
        }
        let mut reader = splitter.into_readers().unwrap();

        let mut out = Vec::new();
        let n = reader.read_chunk(1, &mut out, 1000).unwrap();
        assert_eq!(n, 33);
        assert_eq!(out[0], 1);
        assert_eq!(out[1], 4);
        assert_eq!(*out.last().unwrap(), 97);
    }

    #[test]
    fn test_chunked_readback_preserves_order() {
        let mut splitter = IdSplitter::create(1).unwrap();
        for i in 0..10 {
            splitter.write_id(0, i).unwrap();
        }
        let mut reader = splitter.into_readers().unwrap();

        let mut out = Vec::new();
        let mut seen = Vec::new();
        loop {
            let n = reader.read_chunk(0, &mut out, 3).unwrap();
            if n == 0 {
                break;
            }
            seen.extend_from_slice(&out);
        }
        assert_eq!(seen, (0..10).collect::<Vec<i32>>());
    }

    #[test]
    fn test_empty_bucket_reads_zero() {
        let splitter = IdSplitter::create(2).unwrap();
        let mut reader = splitter.into_readers().unwrap();
        let mut out = Vec::new();
        assert_eq!(reader.read_chunk(0, &mut out, 16).unwrap(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_spill_files_deleted_on_drop() {
        let dir_path: PathBuf;
        {
            let mut writer = BucketWriter::create(2, "test").unwrap();
            dir_path = writer.dir.path().to_path_buf();
            writer.writer(0).write_all(b"hello").unwrap();
            assert!(dir_path.exists());
        }
        assert!(!dir_path.exists());
    }

    #[test]
    fn test_text_roundtrip_through_buckets() {
        let mut writer = BucketWriter::create(2, "fastq").unwrap();
        writer.writer(0).write_all(b"@r1\nACGT\n+\nIIII\n").unwrap();
        writer.writer(1).write_all(b"@r2\nTT\n+\nII\n").unwrap();

        let mut reader = writer.into_readers().unwrap();
        let mut content = String::new();
        reader.reader(0).read_to_string(&mut content).unwrap();
        assert_eq!(content, "@r1\nACGT\n+\nIIII\n");
        content.clear();
        reader.reader(1).read_to_string(&mut content).unwrap();
        assert_eq!(content, "@r2\nTT\n+\nII\n");
    }
}

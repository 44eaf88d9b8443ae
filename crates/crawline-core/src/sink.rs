//! Shard writers with byte-ceiling rotation and atomic tmp→rename
//!
//! One [`ShardWriter`] owns the single open shard for a partition key; the
//! [`WriterPool`] owns one writer per key. Shard files are written under a
//! temporary name and renamed only after the compressor is finished and
//! flushed, so a file visible under its final name is always complete.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use zstd::stream::write::Encoder as ZstdEncoder;

/// Output compression codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Zstd { level: i32, threads: u32 },
    Gzip,
    Plain,
}

impl Codec {
    /// Shard filename extension for a given payload format stem, e.g.
    /// `jsonl` + zstd → `jsonl.zst`.
    pub fn extension(&self, stem: &str) -> String {
        match self {
            Self::Zstd { .. } => format!("{stem}.zst"),
            Self::Gzip => format!("{stem}.gz"),
            Self::Plain => stem.to_string(),
        }
    }
}

enum ShardEncoder {
    Zstd(ZstdEncoder<'static, BufWriter<File>>),
    Gzip(GzEncoder<BufWriter<File>>),
    Plain(BufWriter<File>),
}

impl ShardEncoder {
    fn create(path: &Path, codec: Codec) -> io::Result<Self> {
        let writer = BufWriter::new(File::create(path)?);
        Ok(match codec {
            Codec::Zstd { level, threads } => {
                let mut enc = ZstdEncoder::new(writer, level)?;
                if threads > 1 {
                    enc.multithread(threads)?;
                }
                Self::Zstd(enc)
            }
            Codec::Gzip => Self::Gzip(GzEncoder::new(writer, flate2::Compression::default())),
            Codec::Plain => Self::Plain(writer),
        })
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            Self::Zstd(w) => w.write_all(buf),
            Self::Gzip(w) => w.write_all(buf),
            Self::Plain(w) => w.write_all(buf),
        }
    }

    /// Finish the compression frame and flush everything to disk.
    fn finish(self) -> io::Result<()> {
        match self {
            Self::Zstd(enc) => enc.finish()?.flush(),
            Self::Gzip(enc) => enc.finish()?.flush(),
            Self::Plain(mut w) => w.flush(),
        }
    }
}

/// Writer for one partition key: at most one shard open at a time,
/// sequence numbers strictly increasing from 1.
pub struct ShardWriter {
    dir: PathBuf,
    key: String,
    ext: String,
    codec: Codec,
    ceiling: u64,
    seq: usize,
    bytes_written: u64,
    records: u64,
    open: Option<(ShardEncoder, PathBuf, PathBuf)>,
    // lifetime totals, across rotations
    shards_closed: usize,
    records_total: u64,
    bytes_total: u64,
}

impl ShardWriter {
    fn new(output_dir: &Path, key: &str, ext: &str, codec: Codec, ceiling: u64) -> io::Result<Self> {
        let dir = output_dir.join(key);
        fs::create_dir_all(&dir)?;
        cleanup_tmp_files(&dir)?;
        Ok(Self {
            dir,
            key: key.to_string(),
            ext: ext.to_string(),
            codec,
            ceiling,
            seq: 0,
            bytes_written: 0,
            records: 0,
            open: None,
            shards_closed: 0,
            records_total: 0,
            bytes_total: 0,
        })
    }

    fn shard_path(&self, seq: usize) -> PathBuf {
        self.dir.join(format!("batch.{seq}.{}", self.ext))
    }

    fn open_next(&mut self) -> io::Result<()> {
        self.seq += 1;
        let final_path = self.shard_path(self.seq);
        let tmp_path = self.dir.join(format!("batch.{}.{}.tmp", self.seq, self.ext));
        let encoder = ShardEncoder::create(&tmp_path, self.codec)?;
        log::debug!("{}: opened shard {}", self.key, self.seq);
        self.open = Some((encoder, tmp_path, final_path));
        self.bytes_written = 0;
        self.records = 0;
        Ok(())
    }

    /// Append one record (payload plus terminator) to the current shard,
    /// rotating first if the record would reach the byte ceiling.
    ///
    /// The ceiling is checked against uncompressed payload bytes and is a
    /// soft bound: a record larger than the ceiling is written alone, so a
    /// shard may exceed the ceiling by at most one record's worth.
    pub fn write(&mut self, payload: &[u8]) -> io::Result<()> {
        let incoming = payload.len() as u64 + 1;
        match &self.open {
            None => self.open_next()?,
            Some(_) => {
                if self.records > 0 && self.bytes_written + incoming >= self.ceiling {
                    self.rotate()?;
                }
            }
        }
        let (encoder, _, _) = self.open.as_mut().expect("shard open");
        encoder.write_all(payload)?;
        encoder.write_all(b"\n")?;
        self.bytes_written += incoming;
        self.records += 1;
        self.records_total += 1;
        self.bytes_total += incoming;
        Ok(())
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.finalize_open()?;
        self.open_next()
    }

    fn finalize_open(&mut self) -> io::Result<()> {
        if let Some((encoder, tmp_path, final_path)) = self.open.take() {
            encoder.finish()?;
            fs::rename(&tmp_path, &final_path)?;
            self.shards_closed += 1;
            log::debug!(
                "{}: finalized {} ({} records, {} bytes)",
                self.key,
                final_path.display(),
                self.records,
                self.bytes_written
            );
        }
        Ok(())
    }

    /// Close and finalize the current shard, if any.
    pub fn close(&mut self) -> io::Result<()> {
        self.finalize_open()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Sequence number of the currently open shard (0 before first write).
    pub fn sequence(&self) -> usize {
        self.seq
    }
}

/// Per-key totals reported by [`WriterPool::close_all`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PoolSummary {
    pub partitions: usize,
    pub shards: usize,
    pub records: u64,
    pub bytes: u64,
}

/// Open-shard table: exclusive owner of all shard file handles.
///
/// Mutated only from the single driving thread; one writer per key keeps
/// record writes atomic and rotation ordered without locking.
pub struct WriterPool {
    output_dir: PathBuf,
    codec: Codec,
    ext: String,
    ceiling: u64,
    writers: BTreeMap<String, ShardWriter>,
}

impl WriterPool {
    /// `format_stem` names the payload format (`jsonl`, `tsv`); the shard
    /// extension is derived from it and the codec.
    pub fn new(output_dir: &Path, codec: Codec, format_stem: &str, ceiling: u64) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            codec,
            ext: codec.extension(format_stem),
            ceiling,
            writers: BTreeMap::new(),
        }
    }

    /// Pre-create partition directories (and purge stale tmp files) for a
    /// known fixed key set. Shard files still open lazily on first write,
    /// so keys that never occur produce no empty shards.
    pub fn declare_keys<I, S>(&mut self, keys: I) -> io::Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for key in keys {
            self.writer_for(key.as_ref())?;
        }
        Ok(())
    }

    fn writer_for(&mut self, key: &str) -> io::Result<&mut ShardWriter> {
        if !self.writers.contains_key(key) {
            let writer =
                ShardWriter::new(&self.output_dir, key, &self.ext, self.codec, self.ceiling)?;
            self.writers.insert(key.to_string(), writer);
        }
        Ok(self.writers.get_mut(key).expect("just inserted"))
    }

    /// Append one record to the shard currently open for `key`, creating
    /// the partition lazily for keys outside any declared set.
    pub fn write(&mut self, key: &str, payload: &[u8]) -> io::Result<()> {
        self.writer_for(key)?.write(payload)
    }

    /// Number of partitions with a writer (open or not yet opened).
    pub fn partitions(&self) -> usize {
        self.writers.len()
    }

    /// Flush, finish and rename every open shard.
    ///
    /// Best-effort: a failure on one shard does not stop finalization of
    /// the others; the first error is returned after all were attempted.
    /// Must run on normal drain and on fatal abort alike.
    pub fn close_all(&mut self) -> Result<PoolSummary, io::Error> {
        let mut first_err: Option<io::Error> = None;
        let mut summary = PoolSummary::default();
        for writer in self.writers.values_mut() {
            if let Err(e) = writer.close() {
                log::error!("failed to finalize shard for '{}': {e}", writer.key());
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        for writer in self.writers.values() {
            if writer.records_total > 0 {
                summary.partitions += 1;
            }
            summary.shards += writer.shards_closed;
            summary.records += writer.records_total;
            summary.bytes += writer.bytes_total;
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }
}

/// Remove stale `.tmp` shards left behind by a crashed run.
pub fn cleanup_tmp_files(dir: &Path) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "tmp") {
            log::warn!("Removing stale tmp file: {}", path.display());
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RawLines;
    use tempfile::TempDir;

    fn read_shard(path: &Path) -> Vec<String> {
        RawLines::open(path)
            .unwrap()
            .map(|l| String::from_utf8(l.unwrap()).unwrap())
            .collect()
    }

    fn shard_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn rotation_scenario_five_records_two_shards() {
        // ceiling 100, five records of 29 payload bytes (30 with the
        // terminator): records 1-3 fill shard 1 to 90, record 4 would reach
        // 120 so the shard rotates first
        let dir = TempDir::new().unwrap();
        let mut pool = WriterPool::new(dir.path(), Codec::Plain, "tsv", 100);
        let payload = [b'x'; 29];
        for _ in 0..5 {
            pool.write("fi", &payload).unwrap();
        }
        let summary = pool.close_all().unwrap();

        assert_eq!(summary.shards, 2);
        assert_eq!(summary.records, 5);
        let files = shard_files(&dir.path().join("fi"));
        assert_eq!(files, vec!["batch.1.tsv", "batch.2.tsv"]);
        assert_eq!(read_shard(&dir.path().join("fi/batch.1.tsv")).len(), 3);
        assert_eq!(read_shard(&dir.path().join("fi/batch.2.tsv")).len(), 2);
    }

    #[test]
    fn oversized_record_is_written_alone() {
        let dir = TempDir::new().unwrap();
        let mut pool = WriterPool::new(dir.path(), Codec::Plain, "jsonl", 10);
        pool.write("fi", &[b'a'; 50]).unwrap();
        pool.write("fi", &[b'b'; 50]).unwrap();
        pool.close_all().unwrap();

        let files = shard_files(&dir.path().join("fi"));
        assert_eq!(files, vec!["batch.1.jsonl", "batch.2.jsonl"]);
        assert_eq!(read_shard(&dir.path().join("fi/batch.1.jsonl")).len(), 1);
    }

    #[test]
    fn no_tmp_files_after_close() {
        let dir = TempDir::new().unwrap();
        let mut pool = WriterPool::new(dir.path(), Codec::Zstd { level: 3, threads: 1 }, "jsonl", 1000);
        pool.write("fi", b"{\"text\":\"a\"}").unwrap();
        pool.write("sv", b"{\"text\":\"b\"}").unwrap();
        pool.close_all().unwrap();

        for key in ["fi", "sv"] {
            let files = shard_files(&dir.path().join(key));
            assert_eq!(files, vec!["batch.1.jsonl.zst"]);
        }
    }

    #[test]
    fn open_shard_is_only_visible_as_tmp() {
        let dir = TempDir::new().unwrap();
        let mut pool = WriterPool::new(dir.path(), Codec::Plain, "jsonl", 1000);
        pool.write("fi", b"record").unwrap();

        let files = shard_files(&dir.path().join("fi"));
        assert_eq!(files, vec!["batch.1.jsonl.tmp"]);
        pool.close_all().unwrap();
        assert_eq!(shard_files(&dir.path().join("fi")), vec!["batch.1.jsonl"]);
    }

    #[test]
    fn zstd_shard_roundtrips() {
        let dir = TempDir::new().unwrap();
        let mut pool = WriterPool::new(dir.path(), Codec::Zstd { level: 3, threads: 2 }, "jsonl", 1000);
        pool.write("fi", br#"{"text":"ensimmainen"}"#).unwrap();
        pool.write("fi", br#"{"text":"toinen"}"#).unwrap();
        pool.close_all().unwrap();

        let lines = read_shard(&dir.path().join("fi/batch.1.jsonl.zst"));
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("ensimmainen"));
    }

    #[test]
    fn gzip_shard_roundtrips() {
        let dir = TempDir::new().unwrap();
        let mut pool = WriterPool::new(dir.path(), Codec::Gzip, "tsv", 1000);
        pool.write("fi", b"http://a\tteksti\twide1").unwrap();
        pool.close_all().unwrap();

        let lines = read_shard(&dir.path().join("fi/batch.1.tsv.gz"));
        assert_eq!(lines, vec!["http://a\tteksti\twide1"]);
    }

    #[test]
    fn sequence_is_monotonic_per_key() {
        let dir = TempDir::new().unwrap();
        let mut pool = WriterPool::new(dir.path(), Codec::Plain, "jsonl", 8);
        for i in 0..6 {
            pool.write("fi", format!("rec{i}").as_bytes()).unwrap();
        }
        let summary = pool.close_all().unwrap();
        assert_eq!(summary.shards, 6);
        let files = shard_files(&dir.path().join("fi"));
        assert_eq!(
            files,
            vec![
                "batch.1.jsonl",
                "batch.2.jsonl",
                "batch.3.jsonl",
                "batch.4.jsonl",
                "batch.5.jsonl",
                "batch.6.jsonl"
            ]
        );
    }

    #[test]
    fn declared_keys_precreate_directories_without_shards() {
        let dir = TempDir::new().unwrap();
        let mut pool = WriterPool::new(dir.path(), Codec::Plain, "jsonl", 100);
        pool.declare_keys(["fi", "sv", "unk"]).unwrap();

        for key in ["fi", "sv", "unk"] {
            assert!(dir.path().join(key).is_dir());
            assert!(shard_files(&dir.path().join(key)).is_empty());
        }
        pool.write("fi", b"only fi gets data").unwrap();
        let summary = pool.close_all().unwrap();
        assert_eq!(summary.partitions, 1);
        assert!(shard_files(&dir.path().join("sv")).is_empty());
    }

    #[test]
    fn stale_tmp_files_are_cleaned_on_declare() {
        let dir = TempDir::new().unwrap();
        let partition = dir.path().join("fi");
        fs::create_dir_all(&partition).unwrap();
        fs::write(partition.join("batch.1.jsonl.tmp"), b"crashed run").unwrap();
        fs::write(partition.join("batch.1.jsonl"), b"completed\n").unwrap();

        let mut pool = WriterPool::new(dir.path(), Codec::Plain, "jsonl", 100);
        pool.declare_keys(["fi"]).unwrap();

        let files = shard_files(&partition);
        assert_eq!(files, vec!["batch.1.jsonl"]);
    }

    #[test]
    fn lazy_key_creates_new_partition() {
        let dir = TempDir::new().unwrap();
        let mut pool = WriterPool::new(dir.path(), Codec::Plain, "jsonl", 100);
        pool.write("new_lang", b"first ever").unwrap();
        pool.close_all().unwrap();
        assert_eq!(
            shard_files(&dir.path().join("new_lang")),
            vec!["batch.1.jsonl"]
        );
    }
}

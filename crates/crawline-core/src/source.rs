//! Input sources: transparently decompressed line streams, lockstep readers
//!
//! Decompression is chosen by file extension (`.zst`, `.gz`, plain) and is
//! fully streaming; a payload is never materialized in memory.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use flate2::read::MultiGzDecoder;

use crate::decode::DecodeError;
use crate::error::PipelineError;

/// Buffer size for decompressed line readers
const READ_BUF_SIZE: usize = 256 * 1024;

/// Shared byte counter for progress tracking
pub type ByteCounter = Arc<AtomicU64>;

/// Fail fast on a missing declared input, before any output is produced.
pub fn ensure_exists(path: &Path) -> Result<(), PipelineError> {
    if path.exists() {
        Ok(())
    } else {
        Err(PipelineError::MissingInput {
            path: path.to_path_buf(),
        })
    }
}

/// Open a buffered reader over a possibly-compressed file.
///
/// `.gz` uses the multi-member decoder, since crawl extractors concatenate
/// gzip members into one file.
pub fn open_reader(path: &Path) -> Result<Box<dyn BufRead + Send>, PipelineError> {
    let (reader, _) = open_reader_inner(path, None)?;
    Ok(reader)
}

/// Open a reader that additionally counts compressed bytes consumed.
///
/// Returns (reader, counter, total compressed bytes) so callers can drive a
/// progress bar while decompressing.
pub fn open_reader_counted(
    path: &Path,
) -> Result<(Box<dyn BufRead + Send>, ByteCounter, u64), PipelineError> {
    let counter: ByteCounter = Arc::new(AtomicU64::new(0));
    let total = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    let (reader, counter) = open_reader_inner(path, Some(counter))?;
    Ok((reader, counter.expect("counter requested"), total))
}

fn open_reader_inner(
    path: &Path,
    counter: Option<ByteCounter>,
) -> Result<(Box<dyn BufRead + Send>, Option<ByteCounter>), PipelineError> {
    ensure_exists(path)?;
    let file = File::open(path)?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    macro_rules! boxed {
        ($inner:expr) => {
            Box::new(BufReader::with_capacity(READ_BUF_SIZE, $inner)) as Box<dyn BufRead + Send>
        };
    }

    let reader = match (ext, counter.clone()) {
        ("zst", Some(c)) => boxed!(zstd::stream::read::Decoder::new(CountingReader {
            inner: file,
            count: c,
        })?),
        ("zst", None) => boxed!(zstd::stream::read::Decoder::new(file)?),
        ("gz", Some(c)) => boxed!(MultiGzDecoder::new(CountingReader {
            inner: file,
            count: c,
        })),
        ("gz", None) => boxed!(MultiGzDecoder::new(file)),
        (_, Some(c)) => boxed!(CountingReader {
            inner: file,
            count: c,
        }),
        (_, None) => boxed!(file),
    };
    Ok((reader, counter))
}

/// Reader wrapper that tracks bytes read
pub struct CountingReader<R> {
    inner: R,
    count: ByteCounter,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

/// Iterator over raw record lines, without the trailing terminator.
///
/// Works on bytes so that routing can happen without UTF-8 validation; the
/// decoder validates strictly where text is actually needed.
pub struct RawLines {
    reader: Box<dyn BufRead + Send>,
    buf: Vec<u8>,
    line: usize,
}

impl RawLines {
    pub fn new(reader: Box<dyn BufRead + Send>) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(4096),
            line: 0,
        }
    }

    pub fn open(path: &Path) -> Result<Self, PipelineError> {
        Ok(Self::new(open_reader(path)?))
    }

    /// 1-based number of the last yielded line.
    pub fn line(&self) -> usize {
        self.line
    }

    fn read_one(&mut self) -> io::Result<Option<Vec<u8>>> {
        self.buf.clear();
        let n = self.reader.read_until(b'\n', &mut self.buf)?;
        if n == 0 {
            return Ok(None);
        }
        self.line += 1;
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }
        Ok(Some(self.buf.clone()))
    }
}

impl Iterator for RawLines {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_one().transpose()
    }
}

/// Line-aligned reader over N companion streams.
///
/// Yields one row of raw lines per record, one line from every stream. All
/// streams ending together ends the sequence cleanly; one stream ending
/// before the others is a fatal [`DecodeError::Misalignment`] — continuing
/// would pair unrelated lines.
pub struct Lockstep {
    streams: Vec<(String, RawLines)>,
    line: usize,
}

impl Lockstep {
    pub fn new(streams: Vec<(String, Box<dyn BufRead + Send>)>) -> Self {
        Self {
            streams: streams
                .into_iter()
                .map(|(name, r)| (name, RawLines::new(r)))
                .collect(),
            line: 0,
        }
    }

    /// Open companion files, validating that every path exists before any
    /// of them is read.
    pub fn from_paths(paths: &[&Path]) -> Result<Self, PipelineError> {
        for p in paths {
            ensure_exists(p)?;
        }
        let mut streams = Vec::with_capacity(paths.len());
        for p in paths {
            let name = p
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| p.display().to_string());
            streams.push((name, open_reader(p)?));
        }
        Ok(Self::new(streams))
    }

    /// 1-based number of the last yielded record.
    pub fn line(&self) -> usize {
        self.line
    }

    fn read_row(&mut self) -> Result<Option<Vec<Vec<u8>>>, PipelineError> {
        let mut row = Vec::with_capacity(self.streams.len());
        let mut exhausted: Option<&str> = None;
        let mut live = false;
        for (name, lines) in &mut self.streams {
            match lines.read_one()? {
                Some(line) => {
                    live = true;
                    row.push(line);
                }
                None => {
                    if exhausted.is_none() {
                        exhausted = Some(name.as_str());
                    }
                }
            }
        }
        if !live {
            return Ok(None);
        }
        if let Some(stream) = exhausted {
            return Err(DecodeError::Misalignment {
                stream: stream.to_string(),
                line: self.line + 1,
            }
            .into());
        }
        self.line += 1;
        Ok(Some(row))
    }
}

impl Iterator for Lockstep {
    type Item = Result<Vec<Vec<u8>>, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_row().transpose()
    }
}

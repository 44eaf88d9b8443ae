//! Record decoding: base64 payloads and single-line JSON documents

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::record::DocumentRecord;

/// Per-record decode failure.
///
/// All variants except `Misalignment` are recoverable: the driver counts
/// them, logs a warning and continues with the next record. Misalignment
/// between line-aligned companion streams is fatal, since the pipeline
/// cannot safely keep pairing unrelated lines.
#[derive(Debug)]
pub enum DecodeError {
    /// Payload is not strictly valid UTF-8. No silent replacement.
    Encoding { line: usize, detail: String },
    /// Payload is not valid base64.
    Base64 { line: usize, detail: String },
    /// Payload is not a valid JSON document.
    Json { line: usize, detail: String },
    /// One companion stream ended before the others.
    Misalignment { stream: String, line: usize },
}

impl DecodeError {
    /// Misalignment aborts the run, everything else is a skip.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Misalignment { .. })
    }
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encoding { line, detail } => {
                write!(f, "encoding error in record {line}: {detail}")
            }
            Self::Base64 { line, detail } => {
                write!(f, "base64 error in record {line}: {detail}")
            }
            Self::Json { line, detail } => {
                write!(f, "JSON error in record {line}: {detail}")
            }
            Self::Misalignment { stream, line } => {
                write!(f, "stream '{stream}' ended at record {line} before its companions")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Strictly validate UTF-8, surfacing an `Encoding` error on failure.
pub fn decode_utf8(bytes: &[u8], line: usize) -> Result<String, DecodeError> {
    String::from_utf8(bytes.to_vec()).map_err(|e| DecodeError::Encoding {
        line,
        detail: e.utf8_error().to_string(),
    })
}

/// Decode one base64-encoded document payload into its non-empty segments.
///
/// The payload is one whole document: base64 over UTF-8 text whose inner
/// newlines separate paragraph segments. Empty segments are dropped, as the
/// producers emit trailing separators.
pub fn decode_base64_segments(payload: &[u8], line: usize) -> Result<Vec<String>, DecodeError> {
    let trimmed = trim_ascii(payload);
    let raw = BASE64.decode(trimmed).map_err(|e| DecodeError::Base64 {
        line,
        detail: e.to_string(),
    })?;
    let text = decode_utf8(&raw, line)?;
    Ok(text
        .split('\n')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect())
}

/// Decode one single-line JSON document.
pub fn decode_json(raw: &[u8], line: usize) -> Result<DocumentRecord, DecodeError> {
    serde_json::from_slice(raw).map_err(|e| {
        if e.is_data() || e.is_syntax() || e.is_eof() {
            // serde_json reports invalid UTF-8 as a syntax error; keep the
            // classes separate for the skip counters
            if std::str::from_utf8(raw).is_err() {
                return DecodeError::Encoding {
                    line,
                    detail: "invalid UTF-8 in JSON record".to_string(),
                };
            }
            DecodeError::Json {
                line,
                detail: e.to_string(),
            }
        } else {
            DecodeError::Json {
                line,
                detail: e.to_string(),
            }
        }
    })
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |p| p + 1);
    &bytes[start..end]
}

//! TSV → JSONL conversion
//!
//! Two modes: named columns (one JSON object per row) and document
//! grouping, which reconstructs documents from consecutive segment rows
//! sharing a URL (`url \t segment \t collection \t seg_lang \t score`).

use std::io::{BufRead, Write};

use serde::Serialize;
use serde_json::{Map, Value};

use crawline_core::PipelineError;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConvertSummary {
    pub rows: u64,
    pub written: u64,
    pub skipped: u64,
}

/// Map each TSV row to a JSON object using the given column names, in the
/// order they appear in the file.
pub fn columns(
    names: &[String],
    input: impl BufRead,
    out: &mut impl Write,
) -> Result<ConvertSummary, PipelineError> {
    let mut summary = ConvertSummary::default();
    for (i, line) in input.lines().enumerate() {
        let line = line?;
        summary.rows += 1;

        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() < names.len() {
            log::warn!(
                "skipping row {}: {} columns, expected {}",
                i + 1,
                parts.len(),
                names.len()
            );
            summary.skipped += 1;
            continue;
        }

        let mut obj = Map::with_capacity(names.len());
        for (name, part) in names.iter().zip(&parts) {
            obj.insert(name.clone(), Value::from(*part));
        }
        serde_json::to_writer(&mut *out, &obj).map_err(|e| PipelineError::Io(e.into()))?;
        out.write_all(b"\n")?;
        summary.written += 1;
    }
    Ok(summary)
}

/// A document reconstructed from consecutive same-URL segment rows.
#[derive(Debug, Serialize)]
struct GroupedDocument {
    id: u64,
    document_lang: String,
    scores: Vec<f32>,
    langs: Vec<String>,
    text: String,
    url: String,
    collection: String,
}

impl GroupedDocument {
    fn new(lang: &str) -> Self {
        Self {
            id: 0,
            document_lang: lang.to_string(),
            scores: Vec::new(),
            langs: Vec::new(),
            text: String::new(),
            url: String::new(),
            collection: String::new(),
        }
    }

    fn clear(&mut self) {
        self.scores.clear();
        self.langs.clear();
        self.text.clear();
        self.url.clear();
        self.collection.clear();
    }

    fn push_row(&mut self, row: &SegmentRow<'_>) {
        // concatenate paragraphs with the segment delimiter to reconstruct
        // the document
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        self.text.push_str(row.segment);
        if self.url.is_empty() {
            self.url = row.url.to_string();
        }
        if self.collection.is_empty() {
            self.collection = row.collection.to_string();
        }
        self.langs.push(row.seg_lang.to_string());
        self.scores.push(row.score);
    }
}

struct SegmentRow<'a> {
    url: &'a str,
    segment: &'a str,
    collection: &'a str,
    seg_lang: &'a str,
    score: f32,
}

fn parse_row(line: &str) -> Result<SegmentRow<'_>, String> {
    let mut parts = line.split('\t');
    let mut field = || {
        parts
            .next()
            .ok_or_else(|| "expected 5 tab-separated columns".to_string())
    };
    let url = field()?;
    let segment = field()?;
    let collection = field()?;
    let seg_lang = field()?;
    let raw_score = field()?;
    let score = raw_score
        .parse::<f32>()
        .map_err(|_| format!("cannot parse score '{raw_score}'"))?;
    Ok(SegmentRow {
        url,
        segment,
        collection,
        seg_lang,
        score,
    })
}

/// Reconstruct documents from consecutive same-URL segment rows, assigning
/// sequential ids in input order.
pub fn group_docs(
    lang: &str,
    input: impl BufRead,
    out: &mut impl Write,
) -> Result<ConvertSummary, PipelineError> {
    let mut summary = ConvertSummary::default();
    let mut document = GroupedDocument::new(lang);
    let mut prev_url = String::new();
    let mut next_id = 0u64;

    let mut emit = |doc: &GroupedDocument, out: &mut dyn Write| -> Result<(), PipelineError> {
        serde_json::to_writer(&mut *out, doc).map_err(|e| PipelineError::Io(e.into()))?;
        out.write_all(b"\n")?;
        Ok(())
    };

    for (i, line) in input.lines().enumerate() {
        let line = line?;
        summary.rows += 1;

        let row = match parse_row(&line) {
            Ok(row) => row,
            Err(e) => {
                log::warn!("skipping row {}: {e}", i + 1);
                summary.skipped += 1;
                continue;
            }
        };

        // url changed: the current line opens a new document
        if !prev_url.is_empty() && prev_url != row.url {
            emit(&document, out)?;
            summary.written += 1;
            next_id += 1;
            document.clear();
            document.id = next_id;
        }
        document.push_row(&row);
        prev_url.clear();
        prev_url.push_str(row.url);
    }

    if !document.text.is_empty() {
        emit(&document, out)?;
        summary.written += 1;
    }
    Ok(summary)
}

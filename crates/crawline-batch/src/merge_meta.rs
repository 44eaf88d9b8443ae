//! Join lockstep text/metadata/lang streams into JSONL documents
//!
//! A processed collection stores one document per line across three
//! line-aligned zstd streams: `text.zst` (`{"t": ..., "x"?: ..., "htmllang"?: ...}`),
//! `metadata.zst` (the open document metadata) and `lang.zst`
//! (`{"lang": [...], "prob": [...]}`). One output document merges all
//! three, with the text inserted last.

use std::io::Write;
use std::path::Path;

use serde_json::{Map, Value};

use crawline_core::{DecodeError, Lockstep, PipelineError, decode_utf8};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeMetaSummary {
    pub docs: u64,
    pub written: u64,
    pub skipped: u64,
    pub dropped: u64,
}

/// Merge one collection directory to JSONL on `out`.
pub fn run(
    collection: &str,
    input_dir: &Path,
    out: &mut impl Write,
) -> Result<MergeMetaSummary, PipelineError> {
    let mut rows = Lockstep::from_paths(&[
        &input_dir.join("text.zst"),
        &input_dir.join("metadata.zst"),
        &input_dir.join("lang.zst"),
    ])?;

    let mut summary = MergeMetaSummary::default();
    while let Some(row) = rows.next() {
        let row = row?;
        summary.docs += 1;
        match merge_row(collection, &row, rows.line()) {
            Ok(Some(doc)) => {
                serde_json::to_writer(&mut *out, &doc)
                    .map_err(|e| PipelineError::Io(e.into()))?;
                out.write_all(b"\n")?;
                summary.written += 1;
            }
            Ok(None) => {
                // empty text/lang or low document confidence
                summary.dropped += 1;
            }
            Err(e) => {
                log::warn!("discarding document {}: {e}", rows.line());
                summary.skipped += 1;
            }
        }
    }
    Ok(summary)
}

/// Merge one row of the three streams, or `None` when the document is to be
/// dropped (empty text, empty lang, or top confidence at or below 0.5).
fn merge_row(
    collection: &str,
    row: &[Vec<u8>],
    line: usize,
) -> Result<Option<Map<String, Value>>, DecodeError> {
    let text: Map<String, Value> = parse_json(&row[0], line)?;
    let mut doc: Map<String, Value> = parse_json(&row[1], line)?;
    let lang: Map<String, Value> = parse_json(&row[2], line)?;

    let body = text.get("t").and_then(Value::as_str).unwrap_or("");
    let langs_empty = lang
        .get("lang")
        .and_then(Value::as_array)
        .is_none_or(|l| l.is_empty());
    let top_prob = lang
        .get("prob")
        .and_then(Value::as_array)
        .and_then(|p| p.first())
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    if body.is_empty() || langs_empty || top_prob <= 0.5 {
        return Ok(None);
    }

    doc.insert("crawl_id".to_string(), Value::from(collection));
    for (key, value) in lang {
        doc.insert(key, value);
    }
    // text goes in last so it serializes at the end of the line
    doc.insert("text".to_string(), Value::from(body));
    if let Some(xml) = text.get("x") {
        doc.insert("xml".to_string(), xml.clone());
    }
    if let Some(html_lang) = text.get("htmllang") {
        doc.insert("html_lang".to_string(), html_lang.clone());
    }
    Ok(Some(doc))
}

fn parse_json(raw: &[u8], line: usize) -> Result<Map<String, Value>, DecodeError> {
    let text = decode_utf8(raw, line)?;
    serde_json::from_str(&text).map_err(|e| DecodeError::Json {
        line,
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(text: &str, meta: &str, lang: &str) -> Vec<Vec<u8>> {
        vec![
            text.as_bytes().to_vec(),
            meta.as_bytes().to_vec(),
            lang.as_bytes().to_vec(),
        ]
    }

    #[test]
    fn merges_all_three_streams() {
        let doc = merge_row(
            "wide17",
            &row(
                r#"{"t": "body text", "x": "<p>body</p>", "htmllang": "fi"}"#,
                r#"{"u": "http://a.fi", "ts": "2024-01-01"}"#,
                r#"{"lang": ["fin_Latn"], "prob": [0.93]}"#,
            ),
            1,
        )
        .unwrap()
        .unwrap();

        assert_eq!(doc["crawl_id"], "wide17");
        assert_eq!(doc["text"], "body text");
        assert_eq!(doc["xml"], "<p>body</p>");
        assert_eq!(doc["html_lang"], "fi");
        assert_eq!(doc["lang"][0], "fin_Latn");
        assert_eq!(doc["u"], "http://a.fi");
    }

    #[test]
    fn low_confidence_is_dropped() {
        let result = merge_row(
            "wide17",
            &row(
                r#"{"t": "body"}"#,
                r#"{}"#,
                r#"{"lang": ["fin_Latn"], "prob": [0.5]}"#,
            ),
            1,
        )
        .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn empty_text_or_lang_is_dropped() {
        for (text, lang) in [
            (r#"{"t": ""}"#, r#"{"lang": ["fin_Latn"], "prob": [0.9]}"#),
            (r#"{"t": "body"}"#, r#"{"lang": [], "prob": [0.9]}"#),
        ] {
            assert!(merge_row("c", &row(text, "{}", lang), 1).unwrap().is_none());
        }
    }

    #[test]
    fn bad_metadata_is_an_error() {
        let err = merge_row(
            "c",
            &row(r#"{"t": "body"}"#, "{broken", r#"{"lang": ["x"], "prob": [0.9]}"#),
            4,
        )
        .unwrap_err();
        assert!(matches!(err, DecodeError::Json { line: 4, .. }));
    }
}

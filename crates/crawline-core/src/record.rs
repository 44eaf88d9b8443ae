//! Document record model shared by all pipeline variants

use serde::{Deserialize, Serialize};

/// Delimiter joining paragraph segments inside `text`.
///
/// Line framing downstream depends on this character never appearing inside
/// a segment; [`sanitize_segment`] enforces that on emission.
pub const SEGMENT_DELIMITER: char = '\n';

/// One unit of crawled text plus its metadata.
///
/// Wire forms use both long and short field names (`url`/`u`, `text`/`t`);
/// unrecognized fields survive a decode/encode round trip via `metadata`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentRecord {
    #[serde(default, alias = "u", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, alias = "t")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    /// Document-level language candidates, best first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<Vec<String>>,
    /// Confidences aligned with `lang`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prob: Option<Vec<f64>>,
    /// Per-segment language tags, aligned with `segments()`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seg_langs: Option<Vec<String>>,
    /// Advisory filter verdict, recorded but never enforced here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl DocumentRecord {
    /// Build a record from decoded segments, joined with the segment
    /// delimiter. Collection is assigned here once and never overwritten.
    pub fn from_segments<S: AsRef<str>>(
        url: Option<String>,
        segments: &[S],
        collection: Option<String>,
    ) -> Self {
        let text = segments
            .iter()
            .map(|s| s.as_ref())
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            url,
            text,
            collection,
            ..Self::default()
        }
    }

    /// Paragraph-level view of `text`.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.text.split(SEGMENT_DELIMITER)
    }

    /// Best document-level language tag, if any.
    pub fn document_lang(&self) -> Option<&str> {
        self.lang.as_ref()?.first().map(String::as_str)
    }

    /// Confidence of the best language candidate.
    pub fn top_prob(&self) -> Option<f64> {
        self.prob.as_ref()?.first().copied()
    }

    pub fn set_verdict(&mut self, reason: &str) {
        self.filter = Some(reason.to_string());
    }
}

/// Remove framing characters from a segment before re-emission.
///
/// Tabs and carriage returns would corrupt TSV fields, embedded newlines
/// would corrupt line framing. Returns a borrowed slice when clean.
pub fn sanitize_segment(segment: &str) -> std::borrow::Cow<'_, str> {
    if segment.contains(['\t', '\n', '\r']) {
        std::borrow::Cow::Owned(
            segment
                .chars()
                .filter(|c| !matches!(c, '\t' | '\n' | '\r'))
                .collect(),
        )
    } else {
        std::borrow::Cow::Borrowed(segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_segments_joins_with_delimiter() {
        let rec = DocumentRecord::from_segments(
            Some("http://example.com".to_string()),
            &["first", "second"],
            Some("wide00001".to_string()),
        );
        assert_eq!(rec.text, "first\nsecond");
        assert_eq!(rec.segments().count(), 2);
    }

    #[test]
    fn json_short_aliases() {
        let rec: DocumentRecord =
            serde_json::from_str(r#"{"u":"http://a.fi","t":"hello","f":"file1"}"#).unwrap();
        assert_eq!(rec.url.as_deref(), Some("http://a.fi"));
        assert_eq!(rec.text, "hello");
        assert_eq!(rec.metadata.get("f").unwrap(), "file1");
    }

    #[test]
    fn metadata_survives_roundtrip() {
        let rec: DocumentRecord =
            serde_json::from_str(r#"{"url":"x","text":"t","pii":[[0,4]]}"#).unwrap();
        let out = serde_json::to_string(&rec).unwrap();
        let back: DocumentRecord = serde_json::from_str(&out).unwrap();
        assert!(back.metadata.contains_key("pii"));
    }

    #[test]
    fn document_lang_and_prob() {
        let rec: DocumentRecord = serde_json::from_str(
            r#"{"text":"t","lang":["fin_Latn","swe_Latn"],"prob":[0.93,0.04]}"#,
        )
        .unwrap();
        assert_eq!(rec.document_lang(), Some("fin_Latn"));
        assert_eq!(rec.top_prob(), Some(0.93));
    }

    #[test]
    fn sanitize_removes_framing_chars() {
        assert_eq!(sanitize_segment("a\tb\r\nc"), "abc");
    }

    #[test]
    fn sanitize_borrows_clean_segment() {
        let seg = "clean segment";
        assert!(matches!(
            sanitize_segment(seg),
            std::borrow::Cow::Borrowed(_)
        ));
    }
}

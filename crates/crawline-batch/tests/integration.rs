//! End-to-end tests for the batching pipeline over synthetic warc2text trees

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use crawline_core::RawLines;
use crawline_core::progress::ProgressContext;
use tempfile::TempDir;

fn write_gz(path: &Path, content: &str) {
    let mut enc =
        flate2::write::GzEncoder::new(File::create(path).unwrap(), flate2::Compression::default());
    enc.write_all(content.as_bytes()).unwrap();
    enc.finish().unwrap();
}

fn write_zst(path: &Path, content: &str) {
    let mut enc = zstd::stream::write::Encoder::new(File::create(path).unwrap(), 3)
        .unwrap()
        .auto_finish();
    enc.write_all(content.as_bytes()).unwrap();
}

/// Build `{root}/{coll}/{dirnum}/{lang}` with paired text/url streams.
fn write_batch_dir(root: &Path, coll: &str, dirnum: &str, lang: &str, docs: &[(&str, &str)]) {
    let dir = root.join(coll).join(dirnum).join(lang);
    fs::create_dir_all(&dir).unwrap();
    let mut text = String::new();
    let mut urls = String::new();
    for (url, body) in docs {
        text.push_str(&BASE64.encode(body));
        text.push('\n');
        urls.push_str(url);
        urls.push('\n');
    }
    write_gz(&dir.join("text.gz"), &text);
    write_gz(&dir.join("url.gz"), &urls);
}

fn read_shard(path: &Path) -> Vec<String> {
    RawLines::open(path)
        .unwrap()
        .map(|l| String::from_utf8(l.unwrap()).unwrap())
        .collect()
}

#[test]
fn batch_run_emits_tsv_lines_per_segment() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_batch_dir(
        input.path(),
        "wide17",
        "1",
        "fi",
        &[
            ("http://a.fi", "ensimmainen kappale\ntoinen kappale\n"),
            ("http://b.fi", "yksi kappale\n"),
        ],
    );

    let config = crawline_batch::Config {
        directory: input.path().to_path_buf(),
        output_dir: output.path().to_path_buf(),
        lang: "fi".to_string(),
        ..Default::default()
    };
    let summary = crawline_batch::run(&config, &ProgressContext::new()).unwrap();

    assert_eq!(summary.counters.seen, 2);
    assert_eq!(summary.counters.routed, 3); // one line per segment
    assert_eq!(summary.counters.skipped(), 0);

    let lines = read_shard(&output.path().join("fi/batch.1.tsv.zst"));
    assert_eq!(
        lines,
        vec![
            "http://a.fi\tensimmainen kappale\twide17",
            "http://a.fi\ttoinen kappale\twide17",
            "http://b.fi\tyksi kappale\twide17",
        ]
    );
}

#[test]
fn batch_rotates_at_byte_ceiling() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let docs: Vec<(String, String)> = (0..6)
        .map(|i| (format!("http://doc{i}.fi"), format!("sisalto {i}\n")))
        .collect();
    let docs_ref: Vec<(&str, &str)> = docs
        .iter()
        .map(|(u, b)| (u.as_str(), b.as_str()))
        .collect();
    write_batch_dir(input.path(), "wide17", "1", "fi", &docs_ref);

    let config = crawline_batch::Config {
        directory: input.path().to_path_buf(),
        output_dir: output.path().to_path_buf(),
        lang: "fi".to_string(),
        size: 70, // two ~30-byte lines per shard
        ..Default::default()
    };
    let summary = crawline_batch::run(&config, &ProgressContext::new()).unwrap();
    assert_eq!(summary.pool.records, 6);
    assert!(summary.pool.shards >= 2, "expected rotation to happen");

    // every record lands in exactly one finalized shard
    let mut total = 0;
    for entry in fs::read_dir(output.path().join("fi")).unwrap() {
        let path = entry.unwrap().path();
        assert!(!path.to_string_lossy().ends_with(".tmp"));
        total += read_shard(&path).len();
    }
    assert_eq!(total, 6);
}

#[test]
fn batch_skips_undecodable_documents() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let dir = input.path().join("wide17").join("1").join("fi");
    fs::create_dir_all(&dir).unwrap();
    let good = BASE64.encode("kelvollinen kappale\n");
    write_gz(&dir.join("text.gz"), &format!("{good}\nnot!!base64\n{good}\n"));
    write_gz(
        &dir.join("url.gz"),
        "http://a.fi\nhttp://bad.fi\nhttp://c.fi\n",
    );

    let config = crawline_batch::Config {
        directory: input.path().to_path_buf(),
        output_dir: output.path().to_path_buf(),
        lang: "fi".to_string(),
        ..Default::default()
    };
    let summary = crawline_batch::run(&config, &ProgressContext::new()).unwrap();
    assert_eq!(summary.counters.seen, 3);
    assert_eq!(summary.counters.skipped(), 1);
    assert_eq!(read_shard(&output.path().join("fi/batch.1.tsv.zst")).len(), 2);
}

#[test]
fn batch_misaligned_streams_abort() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let dir = input.path().join("wide17").join("1").join("fi");
    fs::create_dir_all(&dir).unwrap();
    let doc = BASE64.encode("kappale\n");
    write_gz(&dir.join("text.gz"), &format!("{doc}\n{doc}\n{doc}\n"));
    write_gz(&dir.join("url.gz"), "http://only-one.fi\n");

    let config = crawline_batch::Config {
        directory: input.path().to_path_buf(),
        output_dir: output.path().to_path_buf(),
        lang: "fi".to_string(),
        ..Default::default()
    };
    let err = crawline_batch::run(&config, &ProgressContext::new()).unwrap_err();
    assert!(err.to_string().contains("url.gz"), "{err}");

    // the shard completed before the fault is finalized, not orphaned
    for entry in fs::read_dir(output.path().join("fi")).unwrap() {
        let path = entry.unwrap().path();
        assert!(!path.to_string_lossy().ends_with(".tmp"), "{path:?}");
    }
}

#[test]
fn batch_missing_companion_fails_fast() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let dir = input.path().join("wide17").join("1").join("fi");
    fs::create_dir_all(&dir).unwrap();
    write_gz(&dir.join("text.gz"), "aGVsbG8K\n");
    // no url.gz companion

    let config = crawline_batch::Config {
        directory: input.path().to_path_buf(),
        output_dir: output.path().to_path_buf(),
        lang: "fi".to_string(),
        ..Default::default()
    };
    let err = crawline_batch::run(&config, &ProgressContext::new()).unwrap_err();
    assert!(err.to_string().contains("missing input"), "{err}");
}

#[test]
fn merge_meta_joins_three_streams() {
    let input = TempDir::new().unwrap();
    write_zst(
        &input.path().join("text.zst"),
        concat!(
            r#"{"t": "hyva dokumentti"}"#,
            "\n",
            r#"{"t": ""}"#,
            "\n",
            r#"{"t": "toinen dokumentti", "htmllang": "fi"}"#,
            "\n",
        ),
    );
    write_zst(
        &input.path().join("metadata.zst"),
        concat!(
            r#"{"u": "http://a.fi"}"#,
            "\n",
            r#"{"u": "http://empty.fi"}"#,
            "\n",
            r#"{"u": "http://b.fi"}"#,
            "\n",
        ),
    );
    write_zst(
        &input.path().join("lang.zst"),
        concat!(
            r#"{"lang": ["fin_Latn"], "prob": [0.95]}"#,
            "\n",
            r#"{"lang": ["fin_Latn"], "prob": [0.95]}"#,
            "\n",
            r#"{"lang": ["fin_Latn"], "prob": [0.88]}"#,
            "\n",
        ),
    );

    let mut out = Vec::new();
    let summary = crawline_batch::merge_meta::run("wide17", input.path(), &mut out).unwrap();
    assert_eq!(summary.docs, 3);
    assert_eq!(summary.written, 2);
    assert_eq!(summary.dropped, 1);

    let lines: Vec<&str> = std::str::from_utf8(&out).unwrap().lines().collect();
    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["crawl_id"], "wide17");
    assert_eq!(first["text"], "hyva dokumentti");
    let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(second["html_lang"], "fi");
}

#[test]
fn merge_meta_misalignment_is_fatal() {
    let input = TempDir::new().unwrap();
    write_zst(&input.path().join("text.zst"), "{\"t\": \"a\"}\n{\"t\": \"b\"}\n");
    write_zst(&input.path().join("metadata.zst"), "{}\n");
    write_zst(
        &input.path().join("lang.zst"),
        concat!(
            r#"{"lang": ["fin_Latn"], "prob": [0.9]}"#,
            "\n",
            r#"{"lang": ["fin_Latn"], "prob": [0.9]}"#,
            "\n",
        ),
    );

    let mut out = Vec::new();
    let err = crawline_batch::merge_meta::run("w", input.path(), &mut out).unwrap_err();
    assert!(err.to_string().contains("metadata.zst"), "{err}");
}

#[test]
fn merge_emits_tsv_through_zcat() {
    // requires zcat on PATH, as the deployment environments have
    let input = TempDir::new().unwrap();
    let dir = input.path().join("wide17").join("3").join("fi");
    fs::create_dir_all(&dir).unwrap();
    let doc = BASE64.encode("kappale yksi\nkappale kaksi\n");
    write_gz(&dir.join("text.gz"), &format!("{doc}\n"));
    write_gz(&dir.join("url.gz"), "http://a.fi\n");

    let mut out = Vec::new();
    let summary = crawline_batch::merge::run(&dir, &mut out).unwrap();
    assert_eq!(summary.docs, 1);
    assert_eq!(summary.lines, 2);

    let text = String::from_utf8(out).unwrap();
    assert_eq!(
        text,
        "http://a.fi\tkappale yksi\twide17\nhttp://a.fi\tkappale kaksi\twide17\n"
    );
}

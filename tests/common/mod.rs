#![allow(dead_code)]

use std::io::{Cursor, Write};

use docsift::config::Config;
use tempfile::TempDir;

/// Configuration rooted in a fresh temporary directory, using the extractive summarizer and
/// the hash embedder so no provider is contacted.
pub fn temp_config() -> (TempDir, Config) {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Config {
        database_path: dir.path().join("docsift.db"),
        upload_dir: dir.path().join("uploads"),
        max_upload_bytes: 256 * 1024,
        embedding_dimension: 128,
        summary_sentences: 3,
        keywords_top_n: 5,
        cluster_default_count: 2,
        cluster_top_terms: 4,
        ..Config::default()
    };
    (dir, config)
}

/// Build a minimal Word document with one paragraph per entry.
pub fn docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|paragraph| format!("<w:p><w:r><w:t>{paragraph}</w:t></w:r></w:p>"))
        .collect();
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><w:document><w:body>{body}</w:body></w:document>"
    );

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
        .expect("start docx part");
    writer.write_all(xml.as_bytes()).expect("write docx part");
    writer.finish().expect("finish docx").into_inner()
}

pub const ROCKETS: [&str; 3] = [
    "The rocket engine burns liquid oxygen and kerosene during launch.",
    "Rocket launch windows depend on orbit timing and engine readiness.",
    "Engineers test every rocket engine before the orbit launch campaign.",
];

pub const ROCKETS_AGAIN: [&str; 3] = [
    "A reusable rocket returns to the launch pad after reaching orbit.",
    "The engine restarts so the rocket can land after launch.",
    "Orbit insertion requires precise engine burns from the rocket.",
];

pub const BAKING: [&str; 3] = [
    "Sourdough bread needs flour, water, salt, and a lively starter.",
    "Bakers fold the bread dough and let the flour ferment overnight.",
    "The oven must be hot so the bread crust browns and the dough rises.",
];

pub const BAKING_AGAIN: [&str; 3] = [
    "Whole wheat flour makes a denser bread dough than white flour.",
    "Proofing the dough in a warm kitchen helps the bread rise in the oven.",
    "Bakers score the bread before the oven so steam escapes from the dough.",
];

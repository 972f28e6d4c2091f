use std::io::{Cursor, Read};
use std::sync::OnceLock;

use regex::Regex;

use super::ExtractionError;

const DOCUMENT_PART: &str = "word/document.xml";

fn paragraph_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)<w:p(?:\s[^>]*[^/>]|\s)?>(.*?)</w:p>").expect("paragraph pattern compiles")
    })
}

fn run_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)<w:t(?:\s[^>]*[^/>]|\s)?>(.*?)</w:t>").expect("run pattern compiles")
    })
}

fn entity_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"&(lt|gt|quot|apos|amp|#[0-9]+|#x[0-9A-Fa-f]+);")
            .expect("entity pattern compiles")
    })
}

/// Read the paragraphs of a Word document, one line per non-blank paragraph.
pub(super) fn extract_docx_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|error| ExtractionError::Docx(format!("not a docx archive: {error}")))?;
    let mut part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|error| ExtractionError::Docx(format!("missing {DOCUMENT_PART}: {error}")))?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)?;

    Ok(paragraphs_from_xml(&xml).join("\n"))
}

fn paragraphs_from_xml(xml: &str) -> Vec<String> {
    paragraph_pattern()
        .captures_iter(xml)
        .filter_map(|paragraph| {
            let body = paragraph.get(1)?.as_str();
            let text: String = run_pattern()
                .captures_iter(body)
                .filter_map(|run| run.get(1))
                .map(|run| decode_entities(run.as_str()))
                .collect();
            (!text.trim().is_empty()).then_some(text)
        })
        .collect()
}

fn decode_entities(value: &str) -> String {
    entity_pattern()
        .replace_all(value, |caps: &regex::Captures<'_>| {
            let entity = &caps[1];
            let decoded = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "amp" => Some('&'),
                _ => numeric_reference(entity),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

/// `#8217` or `#x2019` to the character it names.
fn numeric_reference(entity: &str) -> Option<char> {
    let digits = entity.strip_prefix('#')?;
    let code = match digits.strip_prefix('x') {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code)
}

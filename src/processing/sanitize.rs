//! Helpers for normalizing caller-supplied upload metadata.

/// Longest file name kept after sanitizing.
const MAX_FILENAME_CHARS: usize = 120;
/// Hex characters of the content hash prefixed to stored file names.
const HASH_PREFIX_CHARS: usize = 12;

/// Sanitize arbitrary string input by trimming whitespace and dropping empties.
pub(crate) fn sanitize_string(value: Option<String>) -> Option<String> {
    value.and_then(|input| {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Reduce an uploaded file name to a safe final path component.
///
/// Directory components are dropped and anything outside `[A-Za-z0-9._-]` becomes `_`. Leading
/// dots are removed so the result can never be hidden or a parent reference. Falls back to
/// `document` when nothing usable remains.
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = base
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.trim_matches('_').is_empty() {
        return "document".to_string();
    }

    if cleaned.chars().count() <= MAX_FILENAME_CHARS {
        return cleaned.to_string();
    }

    // Keep the extension when truncating.
    match cleaned.rsplit_once('.') {
        Some((stem, extension)) if extension.len() < MAX_FILENAME_CHARS / 2 => {
            let keep = MAX_FILENAME_CHARS - extension.len() - 1;
            format!("{}.{extension}", stem.chars().take(keep).collect::<String>())
        }
        _ => cleaned.chars().take(MAX_FILENAME_CHARS).collect(),
    }
}

/// Name under which an upload is stored: a content-hash prefix plus the sanitized file name.
pub fn stored_file_name(content_hash: &str, original_name: &str) -> String {
    let prefix: String = content_hash.chars().take(HASH_PREFIX_CHARS).collect();
    format!("{prefix}-{}", sanitize_filename(original_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_strings_become_none() {
        assert_eq!(sanitize_string(Some("  ".into())), None);
        assert_eq!(sanitize_string(Some(" ana ".into())), Some("ana".into()));
        assert_eq!(sanitize_string(None), None);
    }

    #[test]
    fn directory_components_are_dropped() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\report.pdf"), "report.pdf");
    }

    #[test]
    fn unsafe_characters_are_replaced() {
        assert_eq!(sanitize_filename("Q3 report (final).docx"), "Q3_report__final_.docx");
        assert_eq!(sanitize_filename(".hidden.pdf"), "hidden.pdf");
    }

    #[test]
    fn unusable_names_fall_back() {
        assert_eq!(sanitize_filename(""), "document");
        assert_eq!(sanitize_filename("..."), "document");
        assert_eq!(sanitize_filename("/"), "document");
    }

    #[test]
    fn long_names_keep_their_extension() {
        let name = format!("{}.pdf", "a".repeat(300));
        let sanitized = sanitize_filename(&name);
        assert_eq!(sanitized.chars().count(), MAX_FILENAME_CHARS);
        assert!(sanitized.ends_with(".pdf"));
    }

    #[test]
    fn stored_name_is_prefixed_with_hash() {
        let name = stored_file_name("0123456789abcdef0123", "My File.pdf");
        assert_eq!(name, "0123456789ab-My_File.pdf");
    }
}

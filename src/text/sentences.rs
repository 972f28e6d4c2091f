/// Split text after `.`, `!`, or `?` when the terminator is followed by whitespace.
///
/// The whitespace run between sentences is consumed and empty pieces are dropped. Terminators
/// not followed by whitespace (decimals, abbreviations inside tokens, URLs) do not split.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((index, ch)) = chars.next() {
        if !matches!(ch, '.' | '!' | '?') {
            continue;
        }
        let Some(&(next_index, next)) = chars.peek() else {
            continue;
        };
        if !next.is_whitespace() {
            continue;
        }

        let end = index + ch.len_utf8();
        push_sentence(&mut sentences, &text[start..end]);

        let mut resume = next_index;
        while let Some(&(ws_index, ws)) = chars.peek() {
            if !ws.is_whitespace() {
                break;
            }
            resume = ws_index + ws.len_utf8();
            chars.next();
        }
        start = resume;
    }

    if start < text.len() {
        push_sentence(&mut sentences, &text[start..]);
    }

    sentences
}

fn push_sentence(sentences: &mut Vec<String>, candidate: &str) {
    let trimmed = candidate.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
}

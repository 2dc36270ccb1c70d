/// Characters kept after a marker, and from the end when no marker is found.
pub const SNIPPET_LENGTH: usize = 200;
const LEAD_IN: usize = 20;

/// Picks the part of a node output most likely to explain its decision.
///
/// The first marker (in `markers` order) found in the content anchors a window
/// starting 20 characters before it. Without any marker the tail of the content
/// is used. Newlines are flattened and the window never splits a character.
pub fn key_snippet(content: &str, markers: &[String]) -> String {
    for marker in markers {
        if let Some(idx) = content.find(marker.as_str()) {
            let start = content[..idx]
                .char_indices()
                .rev()
                .nth(LEAD_IN - 1)
                .map_or(0, |(i, _)| i);
            let end = content[idx..]
                .char_indices()
                .nth(SNIPPET_LENGTH)
                .map_or(content.len(), |(i, _)| idx + i);
            return format!("...{}...", flatten(&content[start..end]));
        }
    }

    if content.chars().count() > SNIPPET_LENGTH {
        let start = content
            .char_indices()
            .rev()
            .nth(SNIPPET_LENGTH - 1)
            .map_or(0, |(i, _)| i);
        return format!("...{}", flatten(&content[start..]));
    }
    flatten(content)
}

/// Truncates to at most `limit` characters.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn flatten(text: &str) -> String {
    text.replace('\n', " ").trim().to_string()
}

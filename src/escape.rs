// 🔒 Literal escaping for the generated script
//
// Produces text that can sit between single quotes in a MySQL statement
// without a live connection. Every input has an escaped form.

/// Escape `raw` for embedding inside a single-quoted MySQL string literal.
///
/// Handles NUL, newline, carriage return, backslash, both quote characters
/// and the Ctrl-Z (0x1A) byte that Windows clients read as end-of-file.
pub fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len() + 8);

    for c in raw.chars() {
        match c {
            '\0' => escaped.push_str("\\0"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '"' => escaped.push_str("\\\""),
            '\x1a' => escaped.push_str("\\Z"),
            other => escaped.push(other),
        }
    }

    escaped
}

/// Escape and wrap in single quotes.
pub fn quote(raw: &str) -> String {
    format!("'{}'", escape(raw))
}

#[cfg(test)]
pub(crate) fn unescape(escaped: &str) -> String {
    let mut raw = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            raw.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => raw.push('\0'),
            Some('n') => raw.push('\n'),
            Some('r') => raw.push('\r'),
            Some('Z') => raw.push('\x1a'),
            Some(other) => raw.push(other),
            None => raw.push('\\'),
        }
    }

    raw
}

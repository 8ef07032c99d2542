//! Graphviz DOT helpers used by the graph dumps.

/// Escapes `s` for use inside a quoted DOT label.
///
/// Instruction listings contain quotes (string literals), braces and newlines;
/// newlines become left-justified `\l` breaks so multi-line blocks render as listings.
#[must_use]
pub fn escape_dot(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\l"),
            '\r' => {}
            '{' | '}' | '<' | '>' | '|' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

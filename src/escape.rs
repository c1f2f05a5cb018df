//! HTML escaping for generated pages and reference line excerpts.

/// Escape for attribute values and general code content.
///
/// Escapes: `& < > " '`
pub fn escape_html(s: &str) -> String {
    return s
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;");
}

/// Escape for element content, where quotes are safe.
///
/// Escapes: `& < >`
pub fn escape_html_text(s: &str) -> String {
    return s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;");
}

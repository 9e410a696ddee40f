//! HTML and XML escaping for rendered charts.

/// Escape HTML special characters for safe rendering.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Escape text for SVG documents, where `'` must be escaped too.
pub fn xml_escape(s: &str) -> String {
    html_escape(s).replace('\'', "&apos;")
}

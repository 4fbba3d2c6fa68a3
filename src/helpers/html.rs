//! HTML text helpers

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Visible block reporting a template problem inside the rendered document
pub fn error_block(message: &str) -> String {
    format!(
        r#"<div class="template-error" style="border: 1px solid #c00; color: #c00; padding: 8px; font-family: monospace;"><strong>Template error:</strong> {}</div>"#,
        html_escape(message)
    )
}

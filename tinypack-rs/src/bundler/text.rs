//! Text utilities for module sources and emitted bundles.

/// Strips the UTF-8 BOM (byte order mark) from the beginning of text if present.
pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{FEFF}').unwrap_or(text)
}

/// Wraps JSON source as a module body that exports the parsed value.
///
/// ```ignore
/// // Input: {"key": "value"}
/// // Output: module.exports = JSON.parse("{\"key\": \"value\"}");
/// ```
pub fn json_module_source(source: &str) -> String {
    format!("module.exports = JSON.parse(\"{}\");", escape_js_string(source))
}

/// Escapes a string for safe embedding in a double-quoted JavaScript string
/// literal.
pub fn escape_js_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\u{2028}' => result.push_str("\\u2028"),
            '\u{2029}' => result.push_str("\\u2029"),
            // Control characters (U+0000 to U+001F)
            c if c < '\x20' => {
                result.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => result.push(c),
        }
    }
    result
}

/// Makes serialized JSON safe to splice into a script.
///
/// `</` could close an enclosing `<script>` element and the two line
/// separators are invalid inside string literals on older engines. All three
/// only ever occur inside JSON strings, where the escaped forms decode to the
/// same characters.
pub fn escape_json_for_script(json: &str) -> String {
    json.replace("</", "<\\/")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

/// Encodes `value` as a double-quoted JSON string literal.
pub fn quote(value: &str) -> String {
    format!("\"{}\"", escape_js_string(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_bom_with_bom() {
        let with_bom = "\u{FEFF}hello";
        assert_eq!(strip_bom(with_bom), "hello");
    }

    #[test]
    fn test_strip_bom_without_bom() {
        let without_bom = "hello";
        assert_eq!(strip_bom(without_bom), "hello");
    }

    #[test]
    fn test_json_module_source() {
        let json = r#"{"key": "value"}"#;
        let result = json_module_source(json);
        assert!(result.starts_with("module.exports = JSON.parse(\""));
        assert!(result.contains("\\\"key\\\""));
    }

    #[test]
    fn test_escape_js_string() {
        assert_eq!(escape_js_string("hello"), "hello");
        assert_eq!(escape_js_string("\"quoted\""), "\\\"quoted\\\"");
        assert_eq!(escape_js_string("line\nbreak"), "line\\nbreak");
        assert_eq!(escape_js_string("\u{1}"), "\\u0001");
    }

    #[test]
    fn test_escape_json_for_script() {
        let json = serde_json::to_string("</script>\u{2028}").unwrap();
        let escaped = escape_json_for_script(&json);
        assert_eq!(escaped, "\"<\\/script>\\u2028\"");
        let decoded: String = serde_json::from_str(&escaped).unwrap();
        assert_eq!(decoded, "</script>\u{2028}");
    }
}

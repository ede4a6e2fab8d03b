//! Post-processing: deterministic cleanup of model text before JSON parsing.
//!
//! With `responseMimeType: application/json` the model almost always returns
//! bare JSON, but a few quirks still show up in practice:
//!
//! - the object wrapped in ` ```json ... ``` ` fences
//! - a byte-order mark or zero-width characters before the opening brace
//! - a sentence of chatter before or after the object
//!
//! Each rule is a pure `&str → String` pass, applied in a fixed order:
//! invisible characters go first so fence detection sees clean input, and
//! object extraction runs last as the fallback.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to the raw model text.
///
/// 1. Strip invisible Unicode (BOM, zero-width spaces, soft hyphens)
/// 2. Normalise line endings (CRLF → LF)
/// 3. Strip outer code fences (` ```json ` or bare ` ``` `)
/// 4. Cut surrounding chatter down to the outermost `{ … }`
pub fn clean_json_text(input: &str) -> String {
    let s = remove_invisible_chars(input);
    let s = normalise_line_endings(&s);
    let s = strip_code_fences(&s);
    extract_object(&s)
}

// ── Rule 1: Strip invisible Unicode ──────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*\n(.*?)\n?```\s*$").unwrap());

fn strip_code_fences(input: &str) -> String {
    let trimmed = input.trim();
    if let Some(caps) = RE_OUTER_FENCES.captures(trimmed) {
        caps[1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

// ── Rule 4: Extract the outermost object ─────────────────────────────────────

fn extract_object(input: &str) -> String {
    if input.starts_with('{') && input.ends_with('}') {
        return input.to_string();
    }
    match (input.find('{'), input.rfind('}')) {
        (Some(start), Some(end)) if start < end => input[start..=end].to_string(),
        _ => input.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_json_passthrough() {
        let input = r#"{"description":"Party","matchedPassions":[]}"#;
        assert_eq!(clean_json_text(input), input);
    }

    #[test]
    fn strips_json_fences() {
        let input = "```json\n{\"description\":\"x\"}\n```";
        assert_eq!(clean_json_text(input), "{\"description\":\"x\"}");
    }

    #[test]
    fn strips_bare_fences_and_crlf() {
        let input = "```\r\n{\"a\":1}\r\n```\r\n";
        assert_eq!(clean_json_text(input), "{\"a\":1}");
    }

    #[test]
    fn removes_bom() {
        assert_eq!(clean_json_text("\u{FEFF}{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn cuts_surrounding_chatter() {
        let input = "Sure! Here is the JSON:\n{\"a\":{\"b\":2}}\nHope this helps.";
        assert_eq!(clean_json_text(input), "{\"a\":{\"b\":2}}");
    }

    #[test]
    fn non_json_left_alone() {
        assert_eq!(
            clean_json_text("  I cannot help with that.  "),
            "I cannot help with that."
        );
    }
}

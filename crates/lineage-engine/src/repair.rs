//! Best-effort recovery of truncated model output
//!
//! Targets the damage truncated generation actually produces: a missing
//! closing quote, raw control bytes and unclosed objects or arrays. Wrong
//! quoting and trailing commas are left alone.

use serde_json::Value;

/// Try to turn `text` into parseable JSON
///
/// Returns `text` unchanged when it already parses or when no repair
/// candidate parses; callers still have to handle the parse failure.
pub fn repair_json(text: &str) -> String {
    if parses(text) {
        return text.to_string();
    }

    let mut candidate = text.to_string();
    let first = scan(&candidate);
    if first.in_string {
        if first.escape_pending {
            candidate.pop();
        }
        candidate.push('"');
    }

    let candidate = replace_control_chars(&candidate);
    let closing = scan(&candidate);

    let mut grouped = candidate.clone();
    grouped.extend(std::iter::repeat('}').take(closing.open_braces));
    grouped.extend(std::iter::repeat(']').take(closing.open_brackets));
    if parses(&grouped) {
        return grouped;
    }

    let mut nested = candidate;
    nested.extend(closing.unclosed.iter().rev().map(|opener| match opener {
        '{' => '}',
        _ => ']',
    }));
    if parses(&nested) {
        return nested;
    }

    text.to_string()
}

fn parses(text: &str) -> bool {
    serde_json::from_str::<Value>(text).is_ok()
}

/// Replace each run of control characters with a single space
fn replace_control_chars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if (c as u32) < 0x20 {
            if !in_run {
                out.push(' ');
                in_run = true;
            }
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

#[derive(Debug, Default)]
struct Scan {
    in_string: bool,
    escape_pending: bool,
    open_braces: usize,
    open_brackets: usize,
    unclosed: Vec<char>,
}

/// Walk the structural characters of `text`, skipping string contents
fn scan(text: &str) -> Scan {
    let mut state = Scan::default();
    let mut braces: isize = 0;
    let mut brackets: isize = 0;

    for c in text.chars() {
        if state.in_string {
            if state.escape_pending {
                state.escape_pending = false;
            } else if c == '\\' {
                state.escape_pending = true;
            } else if c == '"' {
                state.in_string = false;
            }
            continue;
        }

        match c {
            '"' => state.in_string = true,
            '{' => {
                braces += 1;
                state.unclosed.push('{');
            }
            '[' => {
                brackets += 1;
                state.unclosed.push('[');
            }
            '}' => {
                braces -= 1;
                if state.unclosed.last() == Some(&'{') {
                    state.unclosed.pop();
                }
            }
            ']' => {
                brackets -= 1;
                if state.unclosed.last() == Some(&'[') {
                    state.unclosed.pop();
                }
            }
            _ => {}
        }
    }

    state.open_braces = braces.max(0) as usize;
    state.open_brackets = brackets.max(0) as usize;
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parsed(text: &str) -> Value {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn test_valid_json_untouched() {
        let text = r#"{"a": [1, 2], "b": "x"}"#;
        assert_eq!(repair_json(text), text);
    }

    #[test]
    fn test_missing_bracket_and_brace() {
        let repaired = repair_json(r#"{"a": 1, "b": [1,2"#);
        assert_eq!(parsed(&repaired), json!({"a": 1, "b": [1, 2]}));
    }

    #[test]
    fn test_braces_before_brackets() {
        let repaired = repair_json(r#"[{"a": 1"#);
        assert_eq!(repaired, r#"[{"a": 1}]"#);
    }

    #[test]
    fn test_unterminated_string() {
        let repaired = repair_json(r#"{"lineageNodes": [{"nodeName": "sales_ord"#);
        assert_eq!(
            parsed(&repaired),
            json!({"lineageNodes": [{"nodeName": "sales_ord"}]})
        );
    }

    #[test]
    fn test_unterminated_string_after_escape() {
        let repaired = repair_json("{\"a\": \"quote \\\" inside");
        assert_eq!(parsed(&repaired), json!({"a": "quote \" inside"}));
    }

    #[test]
    fn test_control_characters_replaced() {
        let repaired = repair_json("{\"a\": \"line1\n\r\nline2\"}");
        assert_eq!(parsed(&repaired), json!({"a": "line1 line2"}));
    }

    #[test]
    fn test_braces_inside_strings_ignored() {
        let repaired = repair_json(r#"{"rule": "use {curly} and [square]", "n": [1"#);
        assert_eq!(
            parsed(&repaired),
            json!({"rule": "use {curly} and [square]", "n": [1]})
        );
    }

    #[test]
    fn test_unrepairable_returns_original() {
        let text = r#"{"a": 1,, "b": 2}"#;
        assert_eq!(repair_json(text), text);

        let text = "{'single': 'quotes'}";
        assert_eq!(repair_json(text), text);
    }
}

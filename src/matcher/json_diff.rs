// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Structural JSON diff rendered as annotated, pretty-printed JSON

use serde_json::Value;

use crate::body::pretty_json;

const INDENT: usize = 2;

/// Annotated lines for `actual` compared with `expected`, or `None` if equal
pub fn diff_json(actual: &Value, expected: &Value) -> Option<Vec<String>> {
    if actual == expected {
        return None;
    }
    let mut out = Vec::new();
    node(actual, expected, 0, "", false, &mut out);
    Some(out)
}

fn node(actual: &Value, expected: &Value, indent: usize, prefix: &str, comma: bool, out: &mut Vec<String>) {
    let pad = " ".repeat(indent);
    let sep = if comma { "," } else { "" };

    match (actual, expected) {
        (Value::Object(a), Value::Object(e)) if a != e => {
            out.push(format!("{}{}{{", pad, prefix));
            let last = a.len().saturating_sub(1);
            for (i, (key, value)) in a.iter().enumerate() {
                let child = format!("{}: ", Value::String(key.clone()));
                match e.get(key) {
                    Some(exp) => node(value, exp, indent + INDENT, &child, i < last, out),
                    None => annotated(value, indent + INDENT, &child, i < last, "should be removed", out),
                }
            }
            for (key, value) in e.iter().filter(|(k, _)| !a.contains_key(*k)) {
                out.push(format!(
                    "{}// missing {}: {}",
                    " ".repeat(indent + INDENT),
                    Value::String(key.clone()),
                    value
                ));
            }
            out.push(format!("{}}}{}", pad, sep));
        }
        (Value::Array(a), Value::Array(e)) if a != e => {
            out.push(format!("{}{}[", pad, prefix));
            let last = a.len().saturating_sub(1);
            for (i, value) in a.iter().enumerate() {
                match e.get(i) {
                    Some(exp) => node(value, exp, indent + INDENT, "", i < last, out),
                    None => annotated(value, indent + INDENT, "", i < last, "should be removed", out),
                }
            }
            for value in e.iter().skip(a.len()) {
                out.push(format!("{}// missing {}", " ".repeat(indent + INDENT), value));
            }
            out.push(format!("{}]{}", pad, sep));
        }
        _ if actual == expected => plain(actual, indent, prefix, comma, out),
        _ => annotated(
            actual,
            indent,
            prefix,
            comma,
            &format!("should equal {}", expected),
            out,
        ),
    }
}

fn plain(value: &Value, indent: usize, prefix: &str, comma: bool, out: &mut Vec<String>) {
    let pad = " ".repeat(indent);
    let lines = pretty_json(value);
    let last = lines.len().saturating_sub(1);
    for (i, line) in lines.iter().enumerate() {
        let lead = if i == 0 { prefix } else { "" };
        let sep = if comma && i == last { "," } else { "" };
        out.push(format!("{}{}{}{}", pad, lead, line, sep));
    }
}

fn annotated(value: &Value, indent: usize, prefix: &str, comma: bool, note: &str, out: &mut Vec<String>) {
    plain(value, indent, prefix, comma, out);
    if let Some(last) = out.last_mut() {
        last.push_str(" // ");
        last.push_str(note);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_equal_values() {
        assert!(diff_json(&json!({"a": [1, 2]}), &json!({"a": [1, 2]})).is_none());
    }

    #[test]
    fn test_scalar_field_diff() {
        let lines = diff_json(&json!({"foo": 123}), &json!({"foo": 456})).unwrap();
        assert_eq!(lines, vec!["{", "  \"foo\": 123 // should equal 456", "}"]);
    }

    #[test]
    fn test_extra_and_missing_keys() {
        let lines = diff_json(
            &json!({"keep": true, "extra": 1}),
            &json!({"keep": true, "wanted": "x"}),
        )
        .unwrap();
        assert_eq!(
            lines,
            vec![
                "{",
                "  \"keep\": true,",
                "  \"extra\": 1 // should be removed",
                "  // missing \"wanted\": \"x\"",
                "}",
            ]
        );
    }

    #[test]
    fn test_nested_array_diff() {
        let lines = diff_json(&json!({"a": [1, 2, 3]}), &json!({"a": [1, 5]})).unwrap();
        assert_eq!(
            lines,
            vec![
                "{",
                "  \"a\": [",
                "    1,",
                "    2, // should equal 5",
                "    3 // should be removed",
                "  ]",
                "}",
            ]
        );
    }
}

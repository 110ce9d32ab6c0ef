use serde_json::Value;

/// Best-effort JSON recovery for model replies: strict parse first, then
/// with markdown code fencing stripped, then the first balanced bracketed
/// region. Returns `None` instead of erroring; callers log and drop.
pub fn parse_json_lenient(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }
    if let Some(inner) = strip_code_fence(trimmed) {
        if let Ok(value) = serde_json::from_str(inner.trim()) {
            return Some(value);
        }
    }
    extract_bracketed(trimmed).and_then(|region| serde_json::from_str(region).ok())
}

fn strip_code_fence(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let rest = &text[start + 3..];
    let rest = rest
        .strip_prefix("json")
        .or_else(|| rest.strip_prefix("JSON"))
        .unwrap_or(rest);
    let end = rest.rfind("```")?;
    (end > 0).then_some(&rest[..end])
}

/// Slice out the first balanced `[...]` or `{...}` region, respecting JSON
/// string escapes.
fn extract_bracketed(text: &str) -> Option<&str> {
    let start = text.find(['[', '{'])?;
    let bytes = text.as_bytes();
    let open = bytes[start];
    let close = if open == b'[' { b']' } else { b'}' };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &byte) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        if byte == b'"' {
            in_string = true;
        } else if byte == open {
            depth += 1;
        } else if byte == close {
            depth -= 1;
            if depth == 0 {
                return Some(&text[start..=i]);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_json_parses() {
        let value = parse_json_lenient(r#"[{"a": 1}]"#).expect("parse");
        assert!(value.is_array());
    }

    #[test]
    fn fenced_json_parses() {
        let raw = "```json\n[{\"nodes\": [], \"edges\": []}]\n```";
        let value = parse_json_lenient(raw).expect("parse");
        assert_eq!(value.as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn prose_wrapped_array_parses() {
        let raw = "Here is the graph you asked for:\n[{\"id\": \"a]b\"}] hope it helps";
        let value = parse_json_lenient(raw).expect("parse");
        assert_eq!(value[0]["id"], "a]b");
    }

    #[test]
    fn garbage_is_none() {
        assert!(parse_json_lenient("no json here").is_none());
        assert!(parse_json_lenient("[1, 2").is_none());
    }
}

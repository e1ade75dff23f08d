//! Pandoc attribute syntax: the `{ .class key=val }` block shared by
//! fenced divs and attribute spans, plus small style-string helpers.

use std::collections::HashMap;

/// Read a `{...}` attribute block starting at `start`. Returns the raw
/// inner text and the byte offset just past the closing brace. Quoted
/// values may contain braces; the block must close on the same line.
pub(crate) fn read_attr_block(line: &[u8], start: usize) -> Option<(String, usize)> {
    if start >= line.len() || line[start] != b'{' {
        return None;
    }

    let mut quote = 0u8;
    let mut escaped = false;
    for index in start + 1..line.len() {
        let ch = line[index];
        if quote != 0 {
            if escaped {
                escaped = false;
                continue;
            }
            if ch == b'\\' {
                escaped = true;
                continue;
            }
            if ch == quote {
                quote = 0;
            }
            continue;
        }
        match ch {
            b'"' | b'\'' => quote = ch,
            b'}' => {
                let raw = String::from_utf8_lossy(&line[start + 1..index]).into_owned();
                return Some((raw, index + 1));
            }
            b'\n' | b'\r' => return None,
            _ => {}
        }
    }

    None
}

/// Split raw attribute text into `.class` names and `key=value` pairs.
/// Values may be bare words or quoted strings with backslash escapes.
pub(crate) fn parse_attributes(raw: &str) -> (Vec<String>, HashMap<String, String>) {
    let bytes = raw.as_bytes();
    let mut classes = Vec::new();
    let mut attrs = HashMap::new();

    let mut index = 0;
    while index < bytes.len() {
        while index < bytes.len() && is_attr_space(bytes[index]) {
            index += 1;
        }
        if index >= bytes.len() {
            break;
        }

        if bytes[index] == b'.' {
            index += 1;
            let start = index;
            while index < bytes.len() && !is_attr_space(bytes[index]) {
                index += 1;
            }
            let class_name = raw[start..index].trim();
            if !class_name.is_empty() {
                classes.push(class_name.to_string());
            }
            continue;
        }

        let key_start = index;
        while index < bytes.len() && !is_attr_space(bytes[index]) && bytes[index] != b'=' {
            index += 1;
        }
        let key = raw[key_start..index].trim().to_string();
        if key.is_empty() {
            index += 1;
            continue;
        }

        while index < bytes.len() && is_attr_space(bytes[index]) {
            index += 1;
        }
        if index >= bytes.len() || bytes[index] != b'=' {
            // Bare word without a value; skip it.
            while index < bytes.len() && !is_attr_space(bytes[index]) {
                index += 1;
            }
            continue;
        }

        index += 1;
        while index < bytes.len() && is_attr_space(bytes[index]) {
            index += 1;
        }
        if index >= bytes.len() {
            attrs.insert(key, String::new());
            break;
        }

        if bytes[index] == b'"' || bytes[index] == b'\'' {
            let quote = bytes[index];
            index += 1;
            let mut value = String::new();
            while index < bytes.len() {
                let ch = bytes[index];
                if ch == b'\\' && index + 1 < bytes.len() {
                    let next = bytes[index + 1];
                    if next == quote || next == b'\\' {
                        value.push(next as char);
                        index += 2;
                        continue;
                    }
                }
                if ch == quote {
                    index += 1;
                    break;
                }
                value.push(ch as char);
                index += 1;
            }
            attrs.insert(key, value);
            continue;
        }

        let value_start = index;
        while index < bytes.len() && !is_attr_space(bytes[index]) {
            index += 1;
        }
        attrs.insert(key, raw[value_start..index].to_string());
    }

    (classes, attrs)
}

fn is_attr_space(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\n' | b'\r')
}

/// Pull a left/center/right value out of a `text-align:` style property.
pub(crate) fn extract_text_align(style: &str) -> Option<String> {
    for part in style.split(';') {
        let part = part.trim();
        if let Some(value) = strip_prefix_ignore_case(part, "text-align:") {
            let value = value.trim().to_lowercase();
            if matches!(value.as_str(), "left" | "center" | "right") {
                return Some(value);
            }
        }
    }
    None
}

/// Pull the value of a named property out of an inline style string.
pub(crate) fn extract_style_color(style: &str, property: &str) -> Option<String> {
    let prefix = format!("{property}:");
    for part in style.split(';') {
        let part = part.trim();
        if let Some(value) = strip_prefix_ignore_case(part, &prefix) {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    if value.len() >= prefix.len() && value[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&value[prefix.len()..])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attr_block_respects_quotes() {
        let line = br#"{ .details summary="a } b" } trailing"#;
        let (raw, end) = read_attr_block(line, 0).unwrap();
        assert_eq!(raw, r#" .details summary="a } b" "#);
        assert_eq!(&line[end..], b" trailing");
    }

    #[test]
    fn attr_block_requires_closing_brace() {
        assert!(read_attr_block(b"{ .open", 0).is_none());
        assert!(read_attr_block(b"no brace", 0).is_none());
    }

    #[test]
    fn attributes_split_classes_and_pairs() {
        let (classes, attrs) =
            parse_attributes(r#".adf-extension key="chart" width=50% style="color: red;""#);
        assert_eq!(classes, vec!["adf-extension"]);
        assert_eq!(attrs.get("key").unwrap(), "chart");
        assert_eq!(attrs.get("width").unwrap(), "50%");
        assert_eq!(attrs.get("style").unwrap(), "color: red;");
    }

    #[test]
    fn quoted_values_unescape() {
        let (_, attrs) = parse_attributes(r#"summary="He said \"hi\" \\ bye""#);
        assert_eq!(attrs.get("summary").unwrap(), r#"He said "hi" \ bye"#);
    }

    #[test]
    fn text_align_extraction() {
        assert_eq!(
            extract_text_align("text-align: center;").as_deref(),
            Some("center")
        );
        assert_eq!(
            extract_text_align("color: red; TEXT-ALIGN: right").as_deref(),
            Some("right")
        );
        assert_eq!(extract_text_align("text-align: justify"), None);
    }

    #[test]
    fn style_color_extraction() {
        assert_eq!(
            extract_style_color("color: #ff0000; font-weight: bold", "color").as_deref(),
            Some("#ff0000")
        );
        assert_eq!(
            extract_style_color("background-color: blue", "background-color").as_deref(),
            Some("blue")
        );
        assert_eq!(extract_style_color("font: serif", "color"), None);
    }
}

//! Tag structure checks for XML input.
//!
//! The XML tree builder closes elements still open at end of input and
//! accepts unquoted attribute values, reporting neither.

use super::error::ParseError;

/// Markup skipped by the check, with its terminator. `<!` covers the
/// document type declaration once its internal subset is cut out.
const SKIPPED: [(&str, &str); 4] = [
    ("<!--", "-->"),
    ("<![CDATA[", "]]>"),
    ("<?", "?>"),
    ("<!", ">"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Start,
    End,
    Empty,
}

struct Tag<'a> {
    name: &'a str,
    kind: TagKind,
    length: usize,
}

fn malformed(first: String) -> ParseError {
    ParseError::Malformed { first, count: 1 }
}

/// Checks that every element is closed, end tags match, and attribute
/// values are quoted.
pub(crate) fn check_tags(text: &str) -> Result<(), ParseError> {
    let mut open: Vec<&str> = Vec::new();
    let mut rest = text;

    while let Some(at) = rest.find('<') {
        rest = &rest[at..];
        if let Some((start, close)) = SKIPPED.iter().find(|(start, _)| rest.starts_with(start)) {
            let end = rest[start.len()..]
                .find(close)
                .ok_or_else(|| malformed(format!("unterminated {start}")))?;
            rest = &rest[start.len() + end + close.len()..];
            continue;
        }

        let tag = scan_tag(rest)?;
        match tag.kind {
            TagKind::Start => open.push(tag.name),
            TagKind::Empty => {}
            TagKind::End => match open.pop() {
                Some(name) if name == tag.name => {}
                Some(name) => {
                    return Err(malformed(format!(
                        "end tag </{}> does not match <{name}>",
                        tag.name
                    )));
                }
                None => return Err(malformed(format!("unexpected end tag </{}>", tag.name))),
            },
        }
        rest = &rest[tag.length..];
    }

    match open.last() {
        Some(name) => Err(malformed(format!("element <{name}> is not closed"))),
        None => Ok(()),
    }
}

/// Reads the tag at the start of `text`, which begins with `<`.
fn scan_tag(text: &str) -> Result<Tag<'_>, ParseError> {
    let name_start = if text[1..].starts_with('/') { 2 } else { 1 };
    let name_len = text[name_start..]
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .unwrap_or(text.len() - name_start);
    let name = &text[name_start..name_start + name_len];
    if name.is_empty() {
        return Err(malformed("missing tag name".to_string()));
    }

    let body_start = name_start + name_len;
    let mut quote = None;
    let mut awaiting_value = false;
    for (offset, c) in text[body_start..].char_indices() {
        if let Some(open) = quote {
            if c == open {
                quote = None;
            }
            continue;
        }
        if awaiting_value && !c.is_whitespace() {
            if c != '"' && c != '\'' {
                return Err(malformed(format!("unquoted attribute value in <{name}>")));
            }
            awaiting_value = false;
            quote = Some(c);
            continue;
        }
        match c {
            '=' => awaiting_value = true,
            '"' | '\'' => quote = Some(c),
            '>' => {
                let length = body_start + offset + 1;
                let kind = if name_start == 2 {
                    TagKind::End
                } else if text[..length - 1].ends_with('/') {
                    TagKind::Empty
                } else {
                    TagKind::Start
                };
                return Ok(Tag { name, kind, length });
            }
            _ => {}
        }
    }
    Err(malformed(format!("unexpected end of input in <{name}>")))
}

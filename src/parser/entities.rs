//! Named entity resolution for XML documents.
//!
//! XML only predefines five entities. Every other named reference is
//! rewritten before parsing: general entities declared in the internal
//! subset expand to their replacement text, names an [`EntityResolver`]
//! knows become numeric character references, and the rest are escaped so
//! they survive as literal text. The internal subset itself is cut out of
//! the document type declaration, which the XML tokenizer cannot read.

use std::borrow::Cow;
use std::collections::HashMap;

use markup5ever::data::NAMED_ENTITIES;

/// The document type declared by a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DtdIdentifier {
    /// Root element name of the declaration.
    pub name: String,
    /// Public identifier, if declared.
    pub public_id: Option<String>,
    /// System identifier, if declared.
    pub system_id: Option<String>,
}

/// Resolves named entity references in XML documents.
pub trait EntityResolver: Send + Sync + std::fmt::Debug {
    /// Returns the replacement text of entity `name` under `dtd`, or `None`
    /// if the entity is unknown.
    fn resolve_entity(&self, dtd: Option<&DtdIdentifier>, name: &str) -> Option<String>;
}

/// Public identifiers of the XHTML document types.
const XHTML_PUBLIC_IDS: &[&str] = &[
    "-//W3C//DTD XHTML 1.0 Strict//EN",
    "-//W3C//DTD XHTML 1.0 Transitional//EN",
    "-//W3C//DTD XHTML 1.0 Frameset//EN",
    "-//W3C//DTD XHTML 1.1//EN",
    "-//W3C//DTD XHTML Basic 1.1//EN",
    "-//W3C//DTD XHTML 1.1 plus MathML 2.0//EN",
    "-//W3C//DTD XHTML 1.1 plus MathML 2.0 plus SVG 1.1//EN",
];

/// Resolver that knows the HTML named character references.
///
/// Entities resolve only for documents declaring one of the XHTML public
/// identifiers, or a bare `<!DOCTYPE html>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEntityResolver;

impl DefaultEntityResolver {
    fn is_xhtml(dtd: &DtdIdentifier) -> bool {
        match (&dtd.public_id, &dtd.system_id) {
            (Some(public_id), _) => XHTML_PUBLIC_IDS.contains(&public_id.as_str()),
            (None, None) => dtd.name.eq_ignore_ascii_case("html"),
            (None, Some(_)) => false,
        }
    }
}

impl EntityResolver for DefaultEntityResolver {
    fn resolve_entity(&self, dtd: Option<&DtdIdentifier>, name: &str) -> Option<String> {
        if !Self::is_xhtml(dtd?) {
            return None;
        }
        let &(first, second) = NAMED_ENTITIES.get(format!("{name};").as_str())?;
        // Proper prefixes of longer names map to zero.
        if first == 0 {
            return None;
        }
        let mut text = String::new();
        text.push(char::from_u32(first)?);
        if second != 0 {
            text.push(char::from_u32(second)?);
        }
        Some(text)
    }
}

/// Reads the document type declaration preceding the root element.
#[must_use]
pub fn read_doctype(text: &str) -> Option<DtdIdentifier> {
    let start = text.find("<!DOCTYPE")?;
    // A declaration after the first element does not count.
    if prolog_ends_before(text, start) {
        return None;
    }
    let rest = &text[start + "<!DOCTYPE".len()..];
    let end = rest.find(['>', '['])?;
    let mut tokens = DeclTokens::new(&rest[..end]);

    let name = tokens.next_token()?.to_string();
    let (public_id, system_id) = match tokens.next_token() {
        Some("PUBLIC") => {
            let public_id = tokens.next_quoted();
            (public_id, tokens.next_quoted())
        }
        Some("SYSTEM") => (None, tokens.next_quoted()),
        _ => (None, None),
    };
    Some(DtdIdentifier {
        name,
        public_id,
        system_id,
    })
}

fn prolog_ends_before(text: &str, position: usize) -> bool {
    let mut search = 0;
    while let Some(offset) = text[search..position].find('<') {
        let at = search + offset;
        let next = text[at + 1..].chars().next();
        if next.is_some_and(|c| c.is_alphabetic() || c == '_' || c == ':') {
            return true;
        }
        search = at + 1;
    }
    false
}

struct DeclTokens<'a> {
    rest: &'a str,
}

impl<'a> DeclTokens<'a> {
    fn new(text: &'a str) -> Self {
        Self { rest: text }
    }

    fn next_token(&mut self) -> Option<&'a str> {
        let trimmed = self.rest.trim_start();
        let end = trimmed
            .find(|c: char| c.is_whitespace() || c == '"' || c == '\'')
            .unwrap_or(trimmed.len());
        if end == 0 {
            return None;
        }
        self.rest = &trimmed[end..];
        Some(&trimmed[..end])
    }

    fn next_quoted(&mut self) -> Option<String> {
        let trimmed = self.rest.trim_start();
        let quote = trimmed.chars().next().filter(|&c| c == '"' || c == '\'')?;
        let body = &trimmed[1..];
        let end = body.find(quote)?;
        self.rest = &body[end + 1..];
        Some(body[..end].to_string())
    }
}

const PREDEFINED: [&str; 5] = ["lt", "gt", "amp", "apos", "quot"];

/// Sections copied through untouched.
const VERBATIM: [(&str, &str); 3] = [("<!--", "-->"), ("<![CDATA[", "]]>"), ("<?", "?>")];

/// Rewrites named entity references so the XML tree builder sees only
/// predefined and numeric references.
///
/// Comments, CDATA sections and processing instructions are copied
/// verbatim. The document type declaration is kept without its internal
/// subset.
#[must_use]
pub fn expand_entities<'a>(text: &'a str, resolver: &dyn EntityResolver) -> Cow<'a, str> {
    if !text.contains('&') && !text.contains("<!DOCTYPE") {
        return Cow::Borrowed(text);
    }
    let mut expander = Expander {
        dtd: read_doctype(text),
        declared: HashMap::new(),
        resolver,
    };
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(index) = rest.find(['<', '&']) {
        out.push_str(&rest[..index]);
        rest = &rest[index..];

        if rest.starts_with("<!DOCTYPE") {
            let (declaration, subset, consumed) = split_doctype(rest);
            out.push_str(&declaration);
            if let Some(subset) = subset {
                expander.declare(subset);
            }
            rest = &rest[consumed..];
            continue;
        }
        let verbatim_end = VERBATIM
            .iter()
            .find(|(open, _)| rest.starts_with(open))
            .map(|(open, close)| {
                rest[open.len()..]
                    .find(close)
                    .map_or(rest.len(), |at| open.len() + at + close.len())
            });
        if let Some(end) = verbatim_end {
            out.push_str(&rest[..end]);
            rest = &rest[end..];
            continue;
        }
        if let Some(consumed) = expander.reference(rest, &mut out, false) {
            rest = &rest[consumed..];
            continue;
        }

        let first = rest.chars().next().map_or(1, char::len_utf8);
        out.push_str(&rest[..first]);
        rest = &rest[first..];
    }
    out.push_str(rest);

    if out == text { Cow::Borrowed(text) } else { Cow::Owned(out) }
}

struct Expander<'r> {
    dtd: Option<DtdIdentifier>,
    declared: HashMap<String, String>,
    resolver: &'r dyn EntityResolver,
}

impl Expander<'_> {
    /// Records the general entities with literal values declared in an
    /// internal subset. The first declaration of a name wins.
    fn declare(&mut self, subset: &str) {
        let mut rest = subset;
        while let Some(at) = rest.find("<!ENTITY") {
            let mut tokens = DeclTokens::new(&rest[at + "<!ENTITY".len()..]);
            if let Some(name) = tokens.next_token()
                && name != "%"
                && let Some(value) = tokens.next_quoted()
            {
                self.declared.entry(name.to_string()).or_insert(value);
            }
            rest = &rest[at + 1..];
        }
    }

    /// Rewrites the named reference at the start of `text` into `out`.
    /// Returns the bytes consumed, or `None` if `text` does not start with
    /// a named reference.
    ///
    /// Inside replacement text (`nested`), declared entities are not
    /// expanded again.
    fn reference(&self, text: &str, out: &mut String, nested: bool) -> Option<usize> {
        let body = text.strip_prefix('&')?;
        let semi = body.find(';')?;
        let name = &body[..semi];
        let is_name = name.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_')
            && name
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ':'));
        if !is_name {
            return None;
        }

        if PREDEFINED.contains(&name) {
            out.push_str(&text[..=semi + 1]);
        } else if let Some(value) = self.declared.get(name).filter(|_| !nested) {
            self.replacement(value, out);
        } else if let Some(replacement) = self.resolver.resolve_entity(self.dtd.as_ref(), name) {
            for c in replacement.chars() {
                out.push_str(&format!("&#x{:X};", u32::from(c)));
            }
        } else {
            out.push_str("&amp;");
            out.push_str(name);
            out.push(';');
        }
        Some(semi + 2)
    }

    fn replacement(&self, value: &str, out: &mut String) {
        let mut rest = value;
        while let Some(index) = rest.find('&') {
            out.push_str(&rest[..index]);
            rest = &rest[index..];
            match self.reference(rest, out, true) {
                Some(consumed) => rest = &rest[consumed..],
                None => {
                    out.push('&');
                    rest = &rest[1..];
                }
            }
        }
        out.push_str(rest);
    }
}

/// Splits the `<!DOCTYPE ...>` declaration at the start of `text`.
///
/// Returns the declaration without its internal subset, the subset, and
/// the number of bytes the declaration spans. An unterminated declaration
/// spans the rest of the input and is left for the tokenizer to report.
fn split_doctype(text: &str) -> (Cow<'_, str>, Option<&str>, usize) {
    let mut quote = None;
    let mut subset: Option<(usize, Option<usize>)> = None;
    for (at, c) in text.char_indices() {
        if let Some(open) = quote {
            if c == open {
                quote = None;
            }
            continue;
        }
        match (c, subset) {
            ('"' | '\'', _) => quote = Some(c),
            ('[', None) => subset = Some((at, None)),
            (']', Some((start, None))) => subset = Some((start, Some(at))),
            ('>', None) => return (Cow::Borrowed(&text[..=at]), None, at + 1),
            ('>', Some((start, Some(end)))) => {
                let declaration = format!("{}>", text[..start].trim_end());
                return (Cow::Owned(declaration), Some(&text[start + 1..end]), at + 1);
            }
            _ => {}
        }
    }
    (Cow::Borrowed(text), None, text.len())
}

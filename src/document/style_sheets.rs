//! Style sheet sets declared by a document.
//!
//! A titled style sheet belongs to the set named by its title. Sheets come
//! from `<link rel="stylesheet">`, `<link rel="alternate stylesheet">`,
//! `<style>` and, in XML documents, `<?xml-stylesheet?>` processing
//! instructions. The preferred set is the title of the first titled sheet
//! that is not an alternate.

use crate::parser::{ElementData, NodeData, NodeTree};

/// One titled style sheet found in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TitledSheet {
    title: String,
    alternate: bool,
}

/// The named style sheet sets of a document and which one is selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleSheetSets {
    names: Vec<String>,
    preferred: Option<String>,
    selected: Option<String>,
}

impl StyleSheetSets {
    /// Collects the sets declared in `tree`.
    ///
    /// `ignore_case` controls element-name matching and is set for HTML.
    #[must_use]
    pub fn from_tree(tree: &NodeTree, ignore_case: bool) -> Self {
        let mut sheets = Vec::new();
        for id in tree.descendants(tree.document()) {
            let Some(node) = tree.get(id) else { continue };
            match &node.data {
                NodeData::Element(element) => {
                    if let Some(sheet) = element_sheet(element, ignore_case) {
                        sheets.push(sheet);
                    }
                }
                NodeData::ProcessingInstruction { target, data } if target == "xml-stylesheet" => {
                    if let Some(sheet) = pi_sheet(data) {
                        sheets.push(sheet);
                    }
                }
                _ => {}
            }
        }
        Self::from_sheets(sheets)
    }

    fn from_sheets(sheets: Vec<TitledSheet>) -> Self {
        let preferred = sheets
            .iter()
            .find(|sheet| !sheet.alternate)
            .map(|sheet| sheet.title.clone());
        let mut names: Vec<String> = Vec::new();
        for sheet in sheets {
            if !names.contains(&sheet.title) {
                names.push(sheet.title);
            }
        }
        Self {
            names,
            preferred,
            selected: None,
        }
    }

    /// Distinct set names in document order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The preferred set, if any titled non-alternate sheet exists.
    #[must_use]
    pub fn preferred(&self) -> Option<&str> {
        self.preferred.as_deref()
    }

    /// The selected set, defaulting to the preferred set.
    #[must_use]
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref().or(self.preferred())
    }

    /// Selects set `name`. Unknown names leave the selection unchanged.
    ///
    /// Returns true if `name` is a known set.
    pub fn select(&mut self, name: &str) -> bool {
        if self.names.iter().any(|known| known == name) {
            self.selected = Some(name.to_string());
            true
        } else {
            false
        }
    }
}

fn element_sheet(element: &ElementData, ignore_case: bool) -> Option<TitledSheet> {
    let name_is = |expected: &str| {
        if ignore_case {
            element.local_name().eq_ignore_ascii_case(expected)
        } else {
            element.local_name() == expected
        }
    };
    let title = element.attr("title").map(str::trim).filter(|t| !t.is_empty())?;

    if name_is("style") {
        return Some(TitledSheet {
            title: title.to_string(),
            alternate: false,
        });
    }
    if !name_is("link") {
        return None;
    }
    let rel = element.attr("rel")?.to_ascii_lowercase();
    let tokens: Vec<&str> = rel.split_ascii_whitespace().collect();
    if !tokens.contains(&"stylesheet") {
        return None;
    }
    Some(TitledSheet {
        title: title.to_string(),
        alternate: tokens.contains(&"alternate"),
    })
}

fn pi_sheet(data: &str) -> Option<TitledSheet> {
    let title = pseudo_attribute(data, "title").filter(|t| !t.is_empty())?;
    let alternate = pseudo_attribute(data, "alternate").is_some_and(|v| v == "yes");
    Some(TitledSheet { title, alternate })
}

/// Reads a `name="value"` pseudo-attribute from processing instruction data.
fn pseudo_attribute(data: &str, name: &str) -> Option<String> {
    let mut rest = data;
    loop {
        rest = rest.trim_start();
        let eq = rest.find('=')?;
        let key = rest[..eq].trim();
        let after = rest[eq + 1..].trim_start();
        let quote = after.chars().next().filter(|&c| c == '"' || c == '\'')?;
        let body = &after[1..];
        let end = body.find(quote)?;
        if key == name {
            return Some(body[..end].to_string());
        }
        rest = &body[end + 1..];
    }
}

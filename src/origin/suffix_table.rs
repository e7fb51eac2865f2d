//! Public suffix table parsing.
//!
//! The table format is line oriented, one rule per line:
//!
//! - blank lines and lines starting with `//` are ignored
//! - `!host` is an exception to a wildcard rule
//! - `*.suffix` is a wildcard rule: any single label followed by `suffix`
//!   is itself a public suffix
//! - anything else is an exact public suffix

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, instrument};

use super::error::SuffixListError;

/// Rules bundled with the crate, used by the process-wide default policy.
pub(crate) const BUNDLED_SUFFIX_LIST: &str = include_str!("public_suffix_list.dat");

/// Immutable set of public suffix rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuffixTable {
    exact: HashSet<String>,
    wildcards: HashSet<String>,
    exceptions: HashSet<String>,
}

impl SuffixTable {
    /// Parses a table from its textual form.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut table = Self::default();
        for line in text.lines() {
            table.add_rule(line);
        }
        table
    }

    /// Reads a table line by line from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`SuffixListError::Read`] if any line cannot be read. A
    /// partially read table is never returned.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, SuffixListError> {
        let mut table = Self::default();
        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| SuffixListError::Read {
                line: index + 1,
                source,
            })?;
            table.add_rule(&line);
        }
        Ok(table)
    }

    /// Loads a table from a file on disk.
    ///
    /// # Errors
    ///
    /// Returns [`SuffixListError`] if the file cannot be opened or read.
    #[instrument(level = "debug", fields(path = %path.display()))]
    pub fn from_path(path: &Path) -> Result<Self, SuffixListError> {
        let file = File::open(path).map_err(|e| SuffixListError::io(path, e))?;
        let table = Self::from_reader(BufReader::new(file))?;
        debug!(
            exact = table.exact.len(),
            wildcards = table.wildcards.len(),
            exceptions = table.exceptions.len(),
            "loaded public suffix list"
        );
        Ok(table)
    }

    fn add_rule(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            return;
        }
        // Only the first whitespace-delimited token is the rule.
        let Some(rule) = line.split_whitespace().next() else {
            return;
        };
        let rule = rule.to_ascii_lowercase();
        if let Some(exception) = rule.strip_prefix('!') {
            if !exception.is_empty() {
                self.exceptions.insert(exception.to_string());
            }
        } else if let Some(wildcard) = rule.strip_prefix('*') {
            let suffix = wildcard.trim_start_matches('.');
            if !suffix.is_empty() {
                self.wildcards.insert(suffix.to_string());
            }
        } else {
            self.exact.insert(rule);
        }
    }

    /// Returns true if `candidate` is listed verbatim.
    #[must_use]
    pub fn is_exact(&self, candidate: &str) -> bool {
        self.exact.contains(candidate)
    }

    /// Returns true if `suffix` governs a wildcard rule.
    #[must_use]
    pub fn is_wildcard(&self, suffix: &str) -> bool {
        self.wildcards.contains(suffix)
    }

    /// Returns true if `host` is carved out of a wildcard rule.
    #[must_use]
    pub fn is_exception(&self, host: &str) -> bool {
        self.exceptions.contains(host)
    }

    /// Total number of rules in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.exact.len() + self.wildcards.len() + self.exceptions.len()
    }

    /// Returns true if the table holds no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

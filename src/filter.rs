// src/filter.rs

//! Package selection for batch removal

use crate::error::{Error, Result};
use regex::Regex;

/// Which installed packages a batch operates on
#[derive(Debug, Clone)]
pub enum PackageSelector {
    /// Exact identifiers
    Ids(Vec<String>),
    /// Identifiers matching an expression anywhere
    Pattern(Regex),
}

impl PackageSelector {
    /// Build a selector from command-line input
    ///
    /// Exactly one of `ids` (non-empty) or `pattern` must be given. An
    /// invalid expression is rejected here, before any filesystem access.
    pub fn from_args(ids: &[String], pattern: Option<&str>) -> Result<Self> {
        let pattern = pattern.filter(|p| !p.is_empty());
        match (ids.is_empty(), pattern) {
            (false, Some(_)) => Err(Error::ConflictingSelectors),
            (false, None) => Ok(PackageSelector::Ids(ids.to_vec())),
            (true, Some(pattern)) => Regex::new(pattern)
                .map(PackageSelector::Pattern)
                .map_err(|source| Error::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                }),
            (true, None) => Err(Error::NoSelector),
        }
    }

    pub fn matches(&self, id: &str) -> bool {
        match self {
            PackageSelector::Ids(ids) => ids.iter().any(|wanted| wanted == id),
            PackageSelector::Pattern(regex) => regex.is_match(id),
        }
    }

    /// Subset of `installed` this selector picks, in `installed` order
    pub fn filter(&self, installed: &[String]) -> Vec<String> {
        installed
            .iter()
            .filter(|id| self.matches(id))
            .cloned()
            .collect()
    }
}

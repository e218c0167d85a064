use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

use thiserror::Error;

use crate::types::{Code, CodeRange};

/// A referenced code is absent from the active nomenclature.
///
/// Never conflated with an empty expansion: a missing prefix is an error,
/// an existing prefix always has at least one leaf beneath it.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("code '{code}' not found in HS nomenclature {version}")]
    NotFound { code: String, version: String },
}

/// One version of the Harmonized System nomenclature, indexed for prefix and
/// range expansion down to the six-digit leaf level.
///
/// Built once per nomenclature version and read-only afterwards. Leaves are
/// held in nomenclature (string) order, and every 2-, 4-, and 6-digit prefix
/// maps to the contiguous slice of leaves beneath it, so lookups are hash
/// probes plus a slice borrow.
#[derive(Debug, Clone)]
pub struct CodeIndex {
    version: String,
    leaves: Vec<Code>,
    spans: HashMap<String, Range<usize>>,
}

impl CodeIndex {
    /// Build an index from the leaf codes of a nomenclature table. The input
    /// is sorted and deduplicated; callers feed it the six-digit leaf rows
    /// (already filtered of national 99-chapter extensions where the source
    /// table carries them).
    pub fn new<I>(version: impl Into<String>, leaves: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Code>,
    {
        let mut leaves: Vec<Code> = leaves.into_iter().map(Into::into).collect();
        leaves.sort();
        leaves.dedup();

        let mut spans: HashMap<String, Range<usize>> = HashMap::new();
        for (i, leaf) in leaves.iter().enumerate() {
            for digits in [2, 4, 6] {
                spans
                    .entry(leaf.prefix(digits).to_owned())
                    .and_modify(|span| span.end = i + 1)
                    .or_insert(i..i + 1);
            }
        }

        Self {
            version: version.into(),
            leaves,
            spans,
        }
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// All leaves in nomenclature order.
    #[must_use]
    pub fn all_leaves(&self) -> &[Code] {
        &self.leaves
    }

    /// All leaves under a prefix of any granularity. Dots in the query are
    /// ignored, like everywhere codes are normalized.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::NotFound`] if the prefix is absent.
    pub fn lookup(&self, code: &str) -> Result<&[Code], LookupError> {
        let span = self.span(code)?;
        Ok(&self.leaves[span])
    }

    /// Contiguous inclusive slice of leaves from `low`'s first leaf through
    /// `high`'s last. Equal endpoints reduce to [`lookup`](Self::lookup);
    /// a reversed pair yields the empty slice.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::NotFound`] if either endpoint is absent.
    pub fn lookup_range(&self, low: &str, high: &str) -> Result<&[Code], LookupError> {
        let lo = self.span(low)?;
        let hi = self.span(high)?;
        if lo.start > hi.end {
            return Ok(&[]);
        }
        Ok(&self.leaves[lo.start..hi.end])
    }

    /// Expand a [`CodeRange`] to its leaf codes.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::NotFound`] if an endpoint is absent.
    pub fn expand(&self, range: &CodeRange) -> Result<&[Code], LookupError> {
        let (low, high) = range.endpoints();
        self.lookup_range(low.as_str(), high.as_str())
    }

    fn span(&self, code: &str) -> Result<Range<usize>, LookupError> {
        let key: String = code.chars().filter(|c| *c != '.').collect();
        self.spans
            .get(&key)
            .cloned()
            .ok_or_else(|| LookupError::NotFound {
                code: key,
                version: self.version.clone(),
            })
    }
}

impl fmt::Display for CodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CodeIndex({}, {} leaves)", self.version, self.leaves.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> CodeIndex {
        CodeIndex::new(
            "2017",
            [
                "010121", "010129", "010130", "010221", "020110", "020120", "290110", "290124",
                "290211", "290220", "290311", "290319", "850110", "850120",
            ],
        )
    }

    #[test]
    fn lookup_by_chapter_heading_subheading() {
        let idx = index();
        assert_eq!(idx.lookup("01").unwrap().len(), 4);
        assert_eq!(idx.lookup("0101").unwrap().len(), 3);
        assert_eq!(
            idx.lookup("0101.30").unwrap(),
            &[Code::new("010130")]
        );
    }

    #[test]
    fn lookup_missing_code() {
        let err = index().lookup("9999").unwrap_err();
        assert_eq!(
            err.to_string(),
            "code '9999' not found in HS nomenclature 2017"
        );
    }

    #[test]
    fn range_is_contiguous_slice() {
        let idx = index();
        let slice = idx.lookup_range("29.01", "29.02").unwrap();
        assert_eq!(
            slice,
            &[
                Code::new("290110"),
                Code::new("290124"),
                Code::new("290211"),
                Code::new("290220"),
            ]
        );
    }

    #[test]
    fn range_with_equal_endpoints_is_plain_lookup() {
        let idx = index();
        assert_eq!(
            idx.lookup_range("0101", "0101").unwrap(),
            idx.lookup("0101").unwrap()
        );
    }

    #[test]
    fn reversed_range_is_empty() {
        assert!(index().lookup_range("85", "01").unwrap().is_empty());
    }

    #[test]
    fn range_with_missing_endpoint_fails() {
        assert!(index().lookup_range("0101", "7777").is_err());
    }

    #[test]
    fn leaves_are_sorted_and_deduplicated() {
        let idx = CodeIndex::new("t", ["020110", "010121", "020110"]);
        assert_eq!(
            idx.all_leaves(),
            &[Code::new("010121"), Code::new("020110")]
        );
    }

    #[test]
    fn expand_code_range() {
        let idx = index();
        let range = CodeRange::parse("0101-0102").unwrap();
        assert_eq!(idx.expand(&range).unwrap().len(), 4);
    }
}

use std::collections::BTreeMap;
use std::fmt;

/// Leaf-code and rule counts attributed to one template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TemplateTally {
    pub leaf_codes: usize,
    pub rules: usize,
}

/// Aggregate coverage of one classified legal text.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CoverageReport {
    /// Clauses no template matched.
    pub uncaptured: usize,
    /// Clauses more than one template matched (catalog defects).
    pub ambiguous: usize,
    /// Clauses skipped because a referenced code was absent from the index.
    pub skipped: usize,
    /// All rules seen, captured or not.
    pub total_rules: usize,
    /// Distinct leaf output codes governed by any rule, captured or not.
    pub total_leaf_codes: usize,
    pub index_version: String,
    pub index_size: usize,
    pub per_template: BTreeMap<String, TemplateTally>,
}

impl CoverageReport {
    /// Leaf output codes attributed to a matching template.
    #[must_use]
    pub fn covered_leaf_codes(&self) -> usize {
        self.per_template.values().map(|t| t.leaf_codes).sum()
    }

    /// Covered fraction of governed leaf codes, in [0, 1].
    #[must_use]
    pub fn coverage(&self) -> f64 {
        if self.total_leaf_codes == 0 {
            0.0
        } else {
            self.covered_leaf_codes() as f64 / self.total_leaf_codes as f64
        }
    }
}

impl fmt::Display for CoverageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} leaf codes ({:.2}%), {} rules, {} uncaptured, {} ambiguous, {} skipped [HS {} / {} leaves]",
            self.covered_leaf_codes(),
            self.total_leaf_codes,
            self.coverage() * 100.0,
            self.total_rules,
            self.uncaptured,
            self.ambiguous,
            self.skipped,
            self.index_version,
            self.index_size,
        )
    }
}

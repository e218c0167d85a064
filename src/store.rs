//! The accumulated artifact of classifying a legal text, and the drivers
//! that build it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::{debug, warn};

use crate::catalog::{AmbiguousTemplateError, RuleTemplate, TemplateRegistry};
use crate::classify::ClassifyError;
use crate::error::RooError;
use crate::index::{CodeIndex, LookupError};
use crate::segment::RawRule;
use crate::types::{
    ClassificationResult, Code, CoverageReport, RestrictionMap, TemplateTally, ValueContentFlags,
};

/// Output code → restricted inputs, value-content flags, and the
/// diagnostics a coverage report is derived from. Built once per legal
/// text by [`TemplateRegistry::classify_all`].
#[derive(Debug)]
pub struct RestrictionStore {
    restrictions: BTreeMap<Code, RestrictionMap>,
    value_content: BTreeMap<Code, ValueContentFlags>,
    tallies: BTreeMap<String, TemplateTally>,
    uncaptured: Vec<String>,
    ambiguous: Vec<AmbiguousTemplateError>,
    skipped: Vec<(String, LookupError)>,
    total_rules: usize,
    governed: BTreeSet<Code>,
    index_version: String,
    index_size: usize,
}

impl RestrictionStore {
    fn new(index: &CodeIndex) -> Self {
        Self {
            restrictions: BTreeMap::new(),
            value_content: BTreeMap::new(),
            tallies: BTreeMap::new(),
            uncaptured: Vec::new(),
            ambiguous: Vec::new(),
            skipped: Vec::new(),
            total_rules: 0,
            governed: BTreeSet::new(),
            index_version: index.version().to_owned(),
            index_size: index.len(),
        }
    }

    /// Output codes with a recorded rule, in nomenclature order.
    pub fn outputs(&self) -> impl Iterator<Item = &Code> {
        self.restrictions.keys()
    }

    /// The full restriction map for a finished-product code; `None` is the
    /// no-rule condition.
    #[must_use]
    pub fn restrictions_for(&self, output: &str) -> Option<&RestrictionMap> {
        self.restrictions.get(output)
    }

    /// Sorted inputs carrying a binding restriction for a finished-product
    /// code (multi-source alternatives are admitted, not restricted, and are
    /// filtered out). `None` is the no-rule condition.
    #[must_use]
    pub fn restricted_inputs(&self, output: &str) -> Option<Vec<&Code>> {
        self.restrictions.get(output).map(|map| {
            map.iter()
                .filter(|(_, level)| level.is_binding())
                .map(|(code, _)| code)
                .collect()
        })
    }

    /// Value-content flags recorded for a finished-product code.
    #[must_use]
    pub fn value_content_flags(&self, output: &str) -> Option<ValueContentFlags> {
        self.value_content.get(output).copied()
    }

    /// Clauses no template matched, retained for manual review.
    #[must_use]
    pub fn uncaptured(&self) -> &[String] {
        &self.uncaptured
    }

    /// Clauses more than one template matched: catalog defects collected
    /// in batch mode.
    #[must_use]
    pub fn ambiguous(&self) -> &[AmbiguousTemplateError] {
        &self.ambiguous
    }

    /// Rules skipped in batch mode because a code was absent from the
    /// index, with the failing range.
    #[must_use]
    pub fn skipped(&self) -> &[(String, LookupError)] {
        &self.skipped
    }

    /// Derive the aggregate coverage report.
    #[must_use]
    pub fn report(&self) -> CoverageReport {
        CoverageReport {
            uncaptured: self.uncaptured.len(),
            ambiguous: self.ambiguous.len(),
            skipped: self.skipped.len(),
            total_rules: self.total_rules,
            total_leaf_codes: self.governed.len(),
            index_version: self.index_version.clone(),
            index_size: self.index_size,
            per_template: self.tallies.clone(),
        }
    }

    /// Merge one output's finalized map. Rule ranges are disjoint in
    /// well-formed texts; when they overlap, entries overwrite last-write-
    /// wins. Undefined input, not a supported merge.
    fn record(&mut self, output: &Code, map: RestrictionMap, flags: ValueContentFlags) {
        self.restrictions.entry(output.clone()).or_default().extend(map);
        let recorded = self.value_content.entry(output.clone()).or_default();
        recorded.complementary |= flags.complementary;
        recorded.alternative |= flags.alternative;
    }
}

impl fmt::Display for RestrictionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RestrictionStore({} outputs, {} rules, {} uncaptured)",
            self.restrictions.len(),
            self.total_rules,
            self.uncaptured.len(),
        )
    }
}

impl TemplateRegistry {
    /// Classify a whole legal text in batch mode.
    ///
    /// The batch completes even when individual clauses fail: rules whose
    /// codes are absent from the index are skipped and counted, ambiguous
    /// clauses are collected as catalog defects, uncaptured clauses are
    /// retained for review. Only a tier-keyword defect aborts, since it
    /// invalidates the catalog itself.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::UnclassifiedTier`] on a grammar defect.
    pub fn classify_all(
        &self,
        index: &CodeIndex,
        rules: &[RawRule],
    ) -> Result<RestrictionStore, ClassifyError> {
        let mut store = RestrictionStore::new(index);

        for rule in rules {
            store.total_rules += 1;

            let outputs = match index.expand(&rule.range) {
                Ok(outputs) => outputs,
                Err(err) => {
                    warn!(range = %rule.range, error = %err, "skipping rule with unknown range");
                    store.skipped.push((rule.range.to_string(), err));
                    continue;
                }
            };
            store.governed.extend(outputs.iter().cloned());

            let template = match self.find(&rule.clause) {
                Ok(Some(template)) => template,
                Ok(None) => {
                    debug!(range = %rule.range, "uncaptured clause");
                    store.uncaptured.push(rule.clause.clone());
                    continue;
                }
                Err(ambiguous) => {
                    warn!(error = %ambiguous, "ambiguous clause, catalog defect");
                    store.ambiguous.push(ambiguous);
                    continue;
                }
            };

            let result = match template.classify(&rule.clause, outputs, index) {
                Ok(Some(result)) => result,
                Ok(None) => {
                    store.uncaptured.push(rule.clause.clone());
                    continue;
                }
                Err(ClassifyError::Lookup(err)) => {
                    warn!(range = %rule.range, error = %err, "skipping rule with unknown code");
                    store.skipped.push((rule.range.to_string(), err));
                    continue;
                }
                Err(err) => return Err(err),
            };

            // finalize every output before touching the store, so a lookup
            // failure skips the whole clause
            let finalized: Result<Vec<(&Code, RestrictionMap)>, LookupError> = outputs
                .iter()
                .map(|output| {
                    template
                        .finalize(output, &result, index)
                        .map(|map| (output, map))
                })
                .collect();
            let finalized = match finalized {
                Ok(finalized) => finalized,
                Err(err) => {
                    warn!(range = %rule.range, error = %err, "skipping rule at finalize");
                    store.skipped.push((rule.range.to_string(), err));
                    continue;
                }
            };

            let flags = ValueContentFlags {
                complementary: template.flags().complementary_va,
                alternative: template.flags().is_alternative_shape(),
            };
            for (output, map) in finalized {
                store.record(output, map, flags);
            }

            let tally = store.tallies.entry(template.name().to_owned()).or_default();
            tally.rules += 1;
            tally.leaf_codes += outputs.len();
        }

        Ok(store)
    }

    /// Strict single-clause classification, for tooling that needs hard
    /// guarantees: ambiguity and unknown codes fail immediately. `Ok(None)`
    /// is the uncaptured outcome, which is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`RooError`] on an ambiguous clause, an unknown code, or a
    /// grammar defect.
    pub fn classify_clause<'a>(
        &'a self,
        index: &CodeIndex,
        clause: &str,
        outputs: &[Code],
    ) -> Result<Option<(&'a RuleTemplate, ClassificationResult)>, RooError> {
        let Some(template) = self.find(clause)? else {
            return Ok(None);
        };
        let result = template.classify(clause, outputs, index)?;
        Ok(result.map(|result| (template, result)))
    }
}

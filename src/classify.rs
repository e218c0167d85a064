//! Clause classification: extract the restriction components of a matched
//! clause into an immediate restriction set plus deferred per-output work.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use thiserror::Error;

use crate::catalog::RuleTemplate;
use crate::index::{CodeIndex, LookupError};
use crate::scan;
use crate::types::{ClassificationResult, Code, Deferred, RestrictionMap, Restrictiveness, Tier};

/// Errors raised while extracting components from a matched clause.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// The tier keyword is outside the fixed enumeration: a grammar defect,
    /// fatal in every mode.
    #[error("tier keyword '{keyword}' is not chapter, heading, subheading, or tariff item")]
    UnclassifiedTier { keyword: String },

    #[error("exemption scope '{fragment}' names no code span")]
    MissingExemptionScope { fragment: String },

    #[error("value-content clause captured no percentage")]
    MissingThreshold,
}

/// "... or any other subheading within that group" inside a source list:
/// widens the exemption to the whole six-digit group of every governed
/// output.
static GROUP_SELF_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("any other (?:[Cc]hapter|heading|subheading|tariff item)s? within that group")
        .unwrap()
});

/// "any other <tier> within ..." inside a source list: the finalized
/// output's own group is excluded from the exemption again, at the named
/// tier's granularity.
static SELF_EXCLUSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("any other (?P<tier>[Cc]hapter|heading|subheading|tariff item)s? within").unwrap()
});

impl RuleTemplate {
    /// Classify `clause` against this template and extract the restriction
    /// components for the `outputs` it governs. `Ok(None)` when the clause
    /// does not have this template's shape.
    ///
    /// Restrictions that do not depend on the individual output code (the
    /// non-outside-group change requirement and every exception span) are
    /// resolved here, against the whole output set. Everything else becomes
    /// a [`Deferred`] record for [`finalize`](Self::finalize).
    ///
    /// # Errors
    ///
    /// [`ClassifyError::Lookup`] when the clause references a code absent
    /// from the index; [`ClassifyError::UnclassifiedTier`] on a tier keyword
    /// outside the fixed enumeration.
    pub fn classify(
        &self,
        clause: &str,
        outputs: &[Code],
        index: &CodeIndex,
    ) -> Result<Option<ClassificationResult>, ClassifyError> {
        let Some(caps) = self.captures(clause) else {
            return Ok(None);
        };
        let flags = self.flags();
        let mut result = ClassificationResult::default();

        if flags.change {
            let keyword = &caps["ctc"];
            let tier = Tier::from_keyword(keyword).ok_or_else(|| {
                ClassifyError::UnclassifiedTier {
                    keyword: keyword.to_owned(),
                }
            })?;
            if flags.outside_group {
                result.deferred.push(Deferred::OutsideGroup {
                    digits: tier.digits(),
                });
            } else {
                restrict_groups(&mut result.restrictions, outputs, tier.digits(), index)?;
            }
        }

        if flags.exception {
            for span in scan::scan_spans(&caps["ect"]) {
                for leaf in index.expand(&span)? {
                    result
                        .restrictions
                        .insert(leaf.clone(), Restrictiveness::Change);
                }
            }
        }

        if flags.exemption {
            let fraction = minimum_threshold(&caps)?;
            let scope_text = &caps["exm_to"];
            let scope_span = scan::target_span(scope_text).ok_or_else(|| {
                ClassifyError::MissingExemptionScope {
                    fragment: scope_text.to_owned(),
                }
            })?;
            let scope: BTreeSet<Code> = index.expand(&scope_span)?.iter().cloned().collect();

            let source_text = &caps["exm_fr"];
            let sources = source_map(
                source_text,
                Restrictiveness::ValueContent(fraction),
                outputs,
                index,
            )?;
            let self_exempt = SELF_EXCLUSION
                .captures(source_text)
                .map(|c| {
                    let keyword = &c["tier"];
                    Tier::from_keyword(keyword)
                        .map(Tier::digits)
                        .ok_or_else(|| ClassifyError::UnclassifiedTier {
                            keyword: keyword.to_owned(),
                        })
                })
                .transpose()?;

            result.deferred.push(Deferred::Exemption {
                scope,
                sources,
                self_exempt,
            });
        } else if self.has_value_content() {
            result.deferred.push(Deferred::ValueContent {
                fraction: minimum_threshold(&caps)?,
            });
        }

        if flags.multi_before || flags.multi_after {
            result.deferred.push(Deferred::MultiSource {
                inputs: source_map(&caps["mul"], Restrictiveness::Unrestricted, outputs, index)?,
            });
        }

        Ok(Some(result))
    }
}

/// Restrict every leaf reachable from each output's prefix at `digits`
/// granularity.
pub(crate) fn restrict_groups(
    restrictions: &mut RestrictionMap,
    outputs: &[Code],
    digits: usize,
    index: &CodeIndex,
) -> Result<(), LookupError> {
    let prefixes: BTreeSet<&str> = outputs.iter().map(|code| code.prefix(digits)).collect();
    for prefix in prefixes {
        for leaf in index.lookup(prefix)? {
            restrictions.insert(leaf.clone(), Restrictiveness::Change);
        }
    }
    Ok(())
}

/// Expand a source range list at the given restrictiveness. A group
/// self-reference pulls in the whole six-digit group of every governed
/// output (per-output narrowing happens at finalize time).
fn source_map(
    fragment: &str,
    level: Restrictiveness,
    outputs: &[Code],
    index: &CodeIndex,
) -> Result<RestrictionMap, ClassifyError> {
    let mut sources = RestrictionMap::new();
    for span in scan::scan_spans(fragment) {
        for leaf in index.expand(&span)? {
            sources.insert(leaf.clone(), level);
        }
    }
    if GROUP_SELF_REFERENCE.is_match(fragment) {
        let prefixes: BTreeSet<&str> = outputs.iter().map(|code| code.prefix(6)).collect();
        for prefix in prefixes {
            for leaf in index.lookup(prefix)? {
                sources.insert(leaf.clone(), level);
            }
        }
    }
    Ok(sources)
}

/// Up to three thresholds are equally acceptable compliance paths; keep the
/// minimum, as a fraction.
fn minimum_threshold(caps: &Captures<'_>) -> Result<f64, ClassifyError> {
    let mut minimum: Option<u32> = None;
    for role in ["rvc1", "rvc2", "rvc3"] {
        if let Some(capture) = caps.name(role) {
            let percent: u32 = capture
                .as_str()
                .parse()
                .map_err(|_| ClassifyError::MissingThreshold)?;
            minimum = Some(minimum.map_or(percent, |m| m.min(percent)));
        }
    }
    minimum
        .map(|percent| f64::from(percent) / 100.0)
        .ok_or(ClassifyError::MissingThreshold)
}

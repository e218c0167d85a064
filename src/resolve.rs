//! Per-output finalization: turn a clause's partial result into the
//! restriction map of one specific leaf output code.

use crate::catalog::RuleTemplate;
use crate::classify::restrict_groups;
use crate::index::{CodeIndex, LookupError};
use crate::types::{ClassificationResult, Code, Deferred, RestrictionMap, Restrictiveness};

impl RuleTemplate {
    /// Finalize the restriction set for one leaf output code.
    ///
    /// Merge order matters and is fixed: the immediate restrictions come
    /// first, an outside-group deferral expands this output's own group,
    /// an exemption in scope replaces conflicting entries (minus the
    /// output's own group when a self-exclusion was recorded), multi-source
    /// inputs merge last, and an alternative value-content test finally
    /// rewrites every entry to the retained fraction.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] when a deferred expansion references a code
    /// absent from the index.
    pub fn finalize(
        &self,
        output: &Code,
        result: &ClassificationResult,
        index: &CodeIndex,
    ) -> Result<RestrictionMap, LookupError> {
        let mut restrictions = result.restrictions.clone();

        for deferred in &result.deferred {
            match deferred {
                Deferred::OutsideGroup { digits } => {
                    // "outside that group" is defined relative to this
                    // code's own group, not the whole governed batch
                    restrict_groups(
                        &mut restrictions,
                        std::slice::from_ref(output),
                        *digits,
                        index,
                    )?;
                }
                Deferred::Exemption {
                    scope,
                    sources,
                    self_exempt,
                } => {
                    if scope.contains(output) {
                        let mut sources = sources.clone();
                        if let Some(digits) = self_exempt {
                            // the rule cannot exempt the product from itself
                            for leaf in index.lookup(output.prefix(*digits))? {
                                sources.remove(leaf.as_str());
                            }
                        }
                        restrictions.extend(sources);
                    }
                }
                Deferred::MultiSource { inputs } => {
                    restrictions.extend(inputs.iter().map(|(code, level)| (code.clone(), *level)));
                }
                Deferred::ValueContent { .. } => {}
            }
        }

        if self.flags().alternative_va {
            if let Some(fraction) = result.value_content_fraction() {
                for level in restrictions.values_mut() {
                    *level = Restrictiveness::ValueContent(fraction);
                }
            }
        }

        Ok(restrictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TemplateRegistry;
    use crate::types::CodeRange;

    fn index() -> CodeIndex {
        CodeIndex::new(
            "fixture",
            [
                "290110", "290121", "290211", "290220", "690210", "690220", "690290", "851810",
                "851821", "851822", "851830", "852290", "853931", "853932", "853939", "854411",
            ],
        )
    }

    fn finalize_all(clause: &str, range: &str) -> Vec<(Code, RestrictionMap)> {
        let registry = TemplateRegistry::compile().unwrap();
        let index = index();
        let outputs: Vec<Code> = index
            .expand(&CodeRange::parse(range).unwrap())
            .unwrap()
            .to_vec();
        let template = registry.find(clause).unwrap().expect("clause captured");
        let result = template
            .classify(clause, &outputs, &index)
            .unwrap()
            .expect("template extracts");
        outputs
            .into_iter()
            .map(|output| {
                let map = template.finalize(&output, &result, &index).unwrap();
                (output, map)
            })
            .collect()
    }

    #[test]
    fn outside_group_resolves_each_output_to_its_own_group() {
        let finalized = finalize_all(
            "A change to subheadings 8539.31 through 8539.39 from any subheading outside that group.",
            "8539.31-8539.39",
        );
        for (output, map) in &finalized {
            let restricted: Vec<&str> = map.keys().map(Code::as_str).collect();
            assert_eq!(restricted, vec![output.as_str()]);
        }
    }

    #[test]
    fn base_change_is_identical_across_outputs() {
        let finalized = finalize_all("A change to heading 2901 from any other heading.", "2901");
        let (_, first) = &finalized[0];
        for (_, map) in &finalized {
            assert_eq!(map, first);
        }
    }

    #[test]
    fn exemption_overrides_within_scope_only() {
        let clause = "A change to subheadings 8518.10 through 8518.22 from any other subheading; or A change to subheadings 8518.10 through 8518.21 from 8522.90, provided there is a regional value content of not less than 50 percent under the net cost method.";
        let finalized = finalize_all(clause, "8518.10-8518.22");
        for (output, map) in &finalized {
            match output.as_str() {
                // in scope: the exemption replaces the restriction set
                "851810" | "851821" => {
                    assert_eq!(
                        map.get("852290"),
                        Some(&Restrictiveness::ValueContent(0.5)),
                        "{output}"
                    );
                }
                // out of scope: classification change only
                _ => {
                    assert_eq!(map.get("852290"), None, "{output}");
                    assert_eq!(map.get(output.as_str()), Some(&Restrictiveness::Change));
                }
            }
        }
    }

    #[test]
    fn self_exclusion_removes_only_own_group() {
        let clause = "A change to subheadings 8518.10 through 8518.30 from any other subheading; or A change to a good of subheadings 8518.10 through 8518.30 from 8522.90 or any other subheading within that group, provided there is a regional value content of not less than 50 percent under the net cost method.";
        let finalized = finalize_all(clause, "8518.10-8518.30");
        for (output, map) in &finalized {
            // every other output's group stays exempted at the rate...
            for (other, _) in &finalized {
                if other != output {
                    assert_eq!(
                        map.get(other.as_str()),
                        Some(&Restrictiveness::ValueContent(0.5)),
                        "{output} should keep {other} exempted"
                    );
                }
            }
            // ...while the output itself falls out of the exemption and
            // keeps its plain classification-change entry
            assert_eq!(
                map.get(output.as_str()),
                Some(&Restrictiveness::Change),
                "{output}"
            );
        }
    }

    #[test]
    fn multi_source_inputs_survive_as_unrestricted() {
        let finalized = finalize_all(
            "A change to heading 2902 from 2901.10 or any other heading.",
            "2902",
        );
        for (_, map) in &finalized {
            assert_eq!(map.get("290110"), Some(&Restrictiveness::Unrestricted));
            assert_eq!(map.get("290211"), Some(&Restrictiveness::Change));
        }
    }

    #[test]
    fn alternative_value_content_rewrites_every_entry() {
        let finalized = finalize_all(
            "A change to heading 6902 from any other heading; or No change in tariff classification is required, provided there is a qualifying value content of not less than 50 per cent under the build-up method.",
            "6902",
        );
        for (_, map) in &finalized {
            assert!(!map.is_empty());
            for level in map.values() {
                assert_eq!(*level, Restrictiveness::ValueContent(0.5));
            }
        }
    }

    #[test]
    fn finalize_is_idempotent() {
        let registry = TemplateRegistry::compile().unwrap();
        let index = index();
        let clause = "A change to heading 2901 from any other heading.";
        let outputs = index.lookup("2901").unwrap().to_vec();
        let template = registry.find(clause).unwrap().unwrap();
        let result = template.classify(clause, &outputs, &index).unwrap().unwrap();
        let first = template.finalize(&outputs[0], &result, &index).unwrap();
        let second = template.finalize(&outputs[0], &result, &index).unwrap();
        assert_eq!(first, second);
    }
}

use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Which grammar fragments a template is built from.
///
/// The flags drive extraction and resolution: `change` and `outside_group`
/// pick between immediate and per-output restriction of the target group,
/// `exception` adds immediate carve-ins, `exemption` defers a scoped
/// source-list override, the `multi_*` pair records which side of "any
/// other <tier>" the alternative source list sits on, and the VA pair
/// distinguishes a value-content test that complements the change test from
/// one that independently satisfies the rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TemplateFlags {
    pub change: bool,
    pub outside_group: bool,
    pub exception: bool,
    pub exemption: bool,
    pub multi_before: bool,
    pub multi_after: bool,
    pub complementary_va: bool,
    pub alternative_va: bool,
}

impl TemplateFlags {
    /// Whether the rule offers some alternative compliance path through an
    /// "or" combinator, the shape that marks an output's value-content
    /// test as alternative rather than complementary.
    #[must_use]
    pub fn is_alternative_shape(&self) -> bool {
        self.alternative_va || self.exemption
    }
}

/// Free-text captures must never swallow a following clause; any of these
/// phrases inside one marks such an overrun and voids the match.
static TEMPERED_GUARD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("provided th|except from|A change").unwrap());

/// A technical condition is a proviso that is neither a value-content test
/// nor a chained rule.
static TECHNICAL_GUARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("(?:qualifying|regional) value content|; or (?:A change|No)").unwrap()
});

/// One compiled clause shape: an anchored pattern with named captures plus
/// the fragment flags. Immutable once built by
/// [`TemplateRegistry::compile`](crate::TemplateRegistry::compile).
#[derive(Debug, Clone)]
pub struct RuleTemplate {
    name: String,
    pattern: Regex,
    flags: TemplateFlags,
    has_value_content: bool,
}

impl RuleTemplate {
    pub(crate) fn new(
        name: String,
        pattern: Regex,
        flags: TemplateFlags,
        has_value_content: bool,
    ) -> Self {
        Self {
            name,
            pattern,
            flags,
            has_value_content,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn flags(&self) -> TemplateFlags {
        self.flags
    }

    /// Whether the grammar carries value-content thresholds (wider than the
    /// VA flags: exemption rates and the no-change rule parse them too).
    #[must_use]
    pub fn has_value_content(&self) -> bool {
        self.has_value_content
    }

    /// Pattern-match-only predicate: does the clause have this shape?
    /// At most one template in a well-formed catalog answers yes for any
    /// clause.
    #[must_use]
    pub fn check(&self, clause: &str) -> bool {
        self.captures(clause).is_some()
    }

    /// Match and return the named captures, or `None` when the clause does
    /// not have this shape. A match whose free-text captures overran into a
    /// following clause is no match.
    pub(crate) fn captures<'t>(&self, clause: &'t str) -> Option<Captures<'t>> {
        let caps = self.pattern.captures(clause)?;
        for role in ["mul", "ect", "exm_fr"] {
            if let Some(capture) = caps.name(role) {
                if TEMPERED_GUARD.is_match(capture.as_str()) {
                    return None;
                }
            }
        }
        if let Some(capture) = caps.name("mft") {
            if TECHNICAL_GUARD.is_match(capture.as_str()) {
                return None;
            }
        }
        Some(caps)
    }
}

impl fmt::Display for RuleTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::TemplateRegistry;

    fn registry() -> TemplateRegistry {
        TemplateRegistry::compile().unwrap()
    }

    fn assert_matches(name: &str, clause: &str) {
        let registry = registry();
        let template = registry.get(name).unwrap();
        assert!(template.check(clause), "{name} should match: {clause}");
    }

    fn assert_not(name: &str, clause: &str) {
        let registry = registry();
        let template = registry.get(name).unwrap();
        assert!(!template.check(clause), "{name} must not match: {clause}");
    }

    #[test]
    fn base_change() {
        assert_matches("CTC", "A change to heading 8501 from any other heading.");
        assert_matches(
            "CTC",
            "A change to subheadings 2903.10 through 2903.69 from any other subheading.",
        );
        assert_matches(
            "CTC",
            "A change to a good of subheading 2915.11 from any other subheading, including another subheading within that group.",
        );
    }

    #[test]
    fn outside_group() {
        assert_matches(
            "CTCo",
            "A change to subheadings 8539.31 through 8539.39 from any subheading outside that group.",
        );
        assert_not(
            "CTC",
            "A change to subheadings 8539.31 through 8539.39 from any subheading outside that group.",
        );
    }

    #[test]
    fn change_with_exception() {
        assert_matches(
            "CTCe",
            "A change to subheading 2903.10 through 2903.69 from any other subheading, except from heading 29.01 through 29.02.",
        );
    }

    #[test]
    fn multi_source_orders() {
        assert_matches(
            "CTCm1",
            "A change to heading 3920 from 3921.90 or any other heading.",
        );
        assert_matches(
            "CTCm2",
            "A change to heading 4009 from any other heading or from subheading 4017.00.",
        );
    }

    #[test]
    fn no_change_rule() {
        assert_matches(
            "RVC",
            "No change in tariff classification is required, provided there is a regional value content of not less than 60 percent under the net cost method.",
        );
    }

    #[test]
    fn complementary_value_content() {
        assert_matches(
            "CTC+RVC",
            "A change to heading 8501 from any other heading, provided there is a regional value content of not less than: (a) 60 percent where the transaction value method is used, or (b) 50 percent where the net cost method is used.",
        );
    }

    #[test]
    fn alternative_value_content() {
        assert_matches(
            "CTC_or_RVC",
            "A change to heading 6902 from any other heading; or No change in tariff classification is required, provided there is a qualifying value content of not less than 50 per cent under the build-up method.",
        );
    }

    #[test]
    fn exemption_shape() {
        assert_matches(
            "CTC1_or_CTC2m+RVC",
            "A change to subheading 8519.81 from any other subheading; or A change to subheading 8519.81 from 8522.90, whether or not there is also a change from any other subheading, provided there is a regional value content of not less than 60 percent under the net cost method.",
        );
    }

    #[test]
    fn technical_condition() {
        assert_matches(
            "CTC+MFT",
            "A change to heading 1806 from any other heading, provided that the good is made from cocoa paste of domestic origin.",
        );
    }

    #[test]
    fn technical_guard_rejects_value_content() {
        // the RVC proviso also starts with "provided th" -- the guard keeps
        // CTC+MFT away from it
        assert_not(
            "CTC+MFT",
            "A change to heading 8501 from any other heading, provided there is a regional value content of not less than 60 percent under the net cost method.",
        );
    }

    #[test]
    fn tempered_guard_rejects_overrun_captures() {
        // without the guard, CTCe's exception capture would swallow the
        // value-content proviso
        assert_not(
            "CTCe",
            "A change to heading 8501 from any other heading, except from heading 8503, provided there is a regional value content of not less than 60 percent.",
        );
        // and CTCm2's source capture would swallow the exception
        assert_not(
            "CTCm2",
            "A change to heading 4009 from any other heading or from subheading 4017.00, except from heading 4010.",
        );
    }
}

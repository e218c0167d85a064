//! Grammar fragments and the template catalog they compose.
//!
//! Each fragment mirrors one surface shape a rules-of-origin sentence can
//! take; a template is an anchored concatenation of fragments. Captures are
//! named, so extraction never leans on positional group arithmetic, and the
//! registry can check a compiled pattern's captures against the roles its
//! fragments imply.

use crate::catalog::template::TemplateFlags;

/// Dotted or plain code token; a sub-item tail is consumed with the token.
const HS_CODE: &str = r"\d{2,4}\.?\d{2}(?:\.\w+)?";

/// Tier keywords, with the sentence-initial capital.
const TIER: &str = "[Cc]hapter|heading|subheading|tariff item";

/// Free text bounded by the clause. It can never cross a semicolon; the
/// tempered guard in [`RuleTemplate::check`](crate::RuleTemplate::check)
/// keeps it from swallowing a following clause.
const FREE_TEXT: &str = "[^;]+?";

/// `heading 8501`, `subheadings 2903.10 through 2903.69`: the tier-prefixed
/// span a change clause targets.
fn target_range() -> String {
    format!("(?:heading|subheading|tariff item)s? {HS_CODE}(?: through {HS_CODE})?")
}

/// Optional `", including [from] another <tier> within that group/<range>"`
/// refinement on a plain change clause.
fn include_refinement() -> String {
    format!(
        "(?:, including(?: from)? another (?:{TIER})s? within (?:that group|{}))?",
        target_range()
    )
}

/// The four classification-change surface shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChangeShape {
    /// "A change to X from any other <tier>"
    Plain,
    /// "A change to X from any <tier> outside that group"
    OutsideGroup,
    /// "A change to X from <sources> or any other <tier>"
    MultiBefore,
    /// "A change to X from any other <tier> or from <sources>"
    MultiAfter,
}

/// What follows the change clause (or stands alone, for the no-change rule).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tail {
    /// Nothing: the change test alone.
    Bare,
    /// ", provided there is a ... value content ...": both tests required.
    Complementary,
    /// "; or No change ..., provided ... value content ...": either test
    /// satisfies the rule.
    Alternative,
    /// "; or A change to <scope> from <sources> ..., provided ...": a
    /// value-content exemption for named sources.
    Exemption,
    /// ", provided th...": a technical condition that is not a value test.
    Technical,
}

/// One row of the catalog: a change base (shape + exception) and a tail.
/// `base: None` is the degenerate no-change rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TemplateSpec {
    pub(crate) base: Option<(ChangeShape, bool)>,
    pub(crate) tail: Tail,
}

impl TemplateSpec {
    /// The full catalog, in report order: the bare change family, the
    /// no-change rule, then the complementary, alternative, exemption, and
    /// technical families over every base.
    pub(crate) fn catalog() -> Vec<TemplateSpec> {
        fn family(specs: &mut Vec<TemplateSpec>, tail: Tail) {
            let shapes = [
                ChangeShape::Plain,
                ChangeShape::OutsideGroup,
                ChangeShape::MultiBefore,
                ChangeShape::MultiAfter,
            ];
            for shape in shapes {
                for exception in [false, true] {
                    specs.push(TemplateSpec {
                        base: Some((shape, exception)),
                        tail,
                    });
                }
            }
        }

        let mut specs = Vec::new();
        family(&mut specs, Tail::Bare);
        specs.push(TemplateSpec {
            base: None,
            tail: Tail::Bare,
        });
        family(&mut specs, Tail::Complementary);
        family(&mut specs, Tail::Alternative);
        family(&mut specs, Tail::Exemption);
        family(&mut specs, Tail::Technical);
        specs
    }

    /// Short type name, used in reports ("CTC", "CTCm1e+RVC", "RVC", ...).
    pub(crate) fn name(&self) -> String {
        let Some((shape, exception)) = self.base else {
            return "RVC".to_owned();
        };
        let mut suffix = String::new();
        match shape {
            ChangeShape::Plain => {}
            ChangeShape::OutsideGroup => suffix.push('o'),
            ChangeShape::MultiBefore => suffix.push_str("m1"),
            ChangeShape::MultiAfter => suffix.push_str("m2"),
        }
        if exception {
            suffix.push('e');
        }
        match self.tail {
            Tail::Bare => format!("CTC{suffix}"),
            Tail::Complementary => format!("CTC{suffix}+RVC"),
            Tail::Alternative => format!("CTC{suffix}_or_RVC"),
            Tail::Exemption => format!("CTC1{suffix}_or_CTC2m+RVC"),
            Tail::Technical => format!("CTC{suffix}+MFT"),
        }
    }

    /// The anchored pattern text.
    pub(crate) fn pattern(&self) -> String {
        let Some((shape, exception)) = self.base else {
            return format!("^{},? {}\\.$", no_change_clause(), value_content_clause());
        };
        let mut body = change_clause(shape);
        if exception {
            body.push_str(&format!(",? except from (?P<ect>{FREE_TEXT})"));
        }
        match self.tail {
            Tail::Bare => format!("^{body}\\.$"),
            Tail::Complementary => format!("^{body},? {}\\.$", value_content_clause()),
            Tail::Alternative => format!(
                "^{body}[;,] or {},? {}\\.$",
                no_change_clause(),
                value_content_clause()
            ),
            Tail::Exemption => format!(
                "^{body}; or {},? {}\\.$",
                alternative_change_clause(),
                value_content_clause()
            ),
            Tail::Technical => format!("^{body},? (?P<mft>provided th[\\w\\W]+?)\\.$"),
        }
    }

    pub(crate) fn flags(&self) -> TemplateFlags {
        let Some((shape, exception)) = self.base else {
            return TemplateFlags::default();
        };
        TemplateFlags {
            change: true,
            outside_group: shape == ChangeShape::OutsideGroup,
            exception,
            exemption: self.tail == Tail::Exemption,
            multi_before: shape == ChangeShape::MultiBefore,
            multi_after: shape == ChangeShape::MultiAfter,
            complementary_va: self.tail == Tail::Complementary,
            alternative_va: self.tail == Tail::Alternative,
        }
    }

    /// Whether the grammar carries a value-content fragment at all. Wider
    /// than the VA flags: the exemption tail uses the thresholds for its
    /// exempted rate, and the no-change rule parses them despite producing
    /// no restrictions.
    pub(crate) fn has_value_content(&self) -> bool {
        self.base.is_none()
            || matches!(
                self.tail,
                Tail::Complementary | Tail::Alternative | Tail::Exemption
            )
    }

    /// The named captures these fragments imply, sorted.
    pub(crate) fn expected_captures(&self) -> Vec<&'static str> {
        let mut roles = Vec::new();
        if let Some((shape, exception)) = self.base {
            roles.push("ctc");
            if matches!(shape, ChangeShape::MultiBefore | ChangeShape::MultiAfter) {
                roles.push("mul");
            }
            if exception {
                roles.push("ect");
            }
            if self.tail == Tail::Exemption {
                roles.push("exm_to");
                roles.push("exm_fr");
            }
            if self.tail == Tail::Technical {
                roles.push("mft");
            }
        }
        if self.has_value_content() {
            roles.extend(["rvc1", "rvc2", "rvc3"]);
        }
        roles.sort_unstable();
        roles
    }
}

fn change_clause(shape: ChangeShape) -> String {
    let target = target_range();
    match shape {
        ChangeShape::Plain => format!(
            "A change to(?: a good of)? {target} from any other (?P<ctc>{TIER})s?{}",
            include_refinement()
        ),
        ChangeShape::OutsideGroup => format!(
            "A change to(?: a good of)? {target} from any(?: other)? (?P<ctc>{TIER})s? outside that group"
        ),
        ChangeShape::MultiBefore => format!(
            "A change to(?: a good of)? {target} from (?P<mul>{FREE_TEXT}) or any other (?P<ctc>{TIER})s?"
        ),
        ChangeShape::MultiAfter => format!(
            "A change to(?: a good of)? {target} from any other (?P<ctc>{TIER})s? or from (?P<mul>{FREE_TEXT})"
        ),
    }
}

/// "No [required] change in tariff classification [to <range>] [is required]".
fn no_change_clause() -> String {
    format!(
        "No(?: required)? change in tariff classification(?: (?:to(?: any of)?|required for a good of)? {})?(?: is required)?",
        target_range()
    )
}

/// The second clause of an exemption rule: an alternative change whose
/// target is the exemption scope and whose source list is exempted at the
/// value-content rate.
fn alternative_change_clause() -> String {
    format!(
        "A change to(?: a good of)? (?P<exm_to>{}) from (?P<exm_fr>{FREE_TEXT})(?:, whether or not {FREE_TEXT})?",
        target_range()
    )
}

/// "provided there is a qualifying/regional value content of not less than
/// N percent [method] [...]": up to three alternative thresholds, each with
/// an optional calculation-method clause.
fn value_content_clause() -> String {
    const METHOD_NAME: &str =
        "(?:[Bb]uild-?down|[Bb]uild-?up|transaction value|[Nn]et [Cc]ost|focused value)";
    let method = format!(
        r"(?: (?:under|based on) the {METHOD_NAME} method(?: taking into account [\w\W]+?)?| (?:when|where) the {METHOD_NAME} method is used)?"
    );
    format!(
        r"provided(?: that)? there is(?: also)?(?: a)? (?:qualifying|regional) value content of not less than(?:: (?:[Aa]\.|\([Aa]\)))? (?P<rvc1>\d\d?) per\s?cent{method}(?:[;,]?(?: or)?(?: [Bb]\.| \([Bb]\)| of not less than)? (?P<rvc2>\d\d?) per\s?cent{method})?(?:[;,] or (?:[Cc]\.|\([Cc]\)) (?P<rvc3>\d\d?) per\s?cent{method})?"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_forty_one_templates() {
        assert_eq!(TemplateSpec::catalog().len(), 41);
    }

    #[test]
    fn names_are_unique() {
        let specs = TemplateSpec::catalog();
        let names: std::collections::BTreeSet<String> =
            specs.iter().map(TemplateSpec::name).collect();
        assert_eq!(names.len(), specs.len());
    }

    #[test]
    fn base_family_names() {
        let spec = TemplateSpec {
            base: Some((ChangeShape::Plain, false)),
            tail: Tail::Bare,
        };
        assert_eq!(spec.name(), "CTC");
        let spec = TemplateSpec {
            base: Some((ChangeShape::MultiBefore, true)),
            tail: Tail::Complementary,
        };
        assert_eq!(spec.name(), "CTCm1e+RVC");
        let spec = TemplateSpec {
            base: Some((ChangeShape::OutsideGroup, false)),
            tail: Tail::Exemption,
        };
        assert_eq!(spec.name(), "CTC1o_or_CTC2m+RVC");
        let spec = TemplateSpec {
            base: None,
            tail: Tail::Bare,
        };
        assert_eq!(spec.name(), "RVC");
    }

    #[test]
    fn no_change_spec_has_no_flags_but_parses_thresholds() {
        let spec = TemplateSpec {
            base: None,
            tail: Tail::Bare,
        };
        assert_eq!(spec.flags(), TemplateFlags::default());
        assert!(spec.has_value_content());
        assert_eq!(spec.expected_captures(), vec!["rvc1", "rvc2", "rvc3"]);
    }

    #[test]
    fn exemption_spec_expects_scope_and_source_captures() {
        let spec = TemplateSpec {
            base: Some((ChangeShape::Plain, false)),
            tail: Tail::Exemption,
        };
        let roles = spec.expected_captures();
        assert!(roles.contains(&"exm_to"));
        assert!(roles.contains(&"exm_fr"));
        assert!(roles.contains(&"rvc1"));
    }

    #[test]
    fn patterns_are_anchored() {
        for spec in TemplateSpec::catalog() {
            let pattern = spec.pattern();
            assert!(pattern.starts_with('^'), "{}", spec.name());
            assert!(pattern.ends_with('$'), "{}", spec.name());
        }
    }
}

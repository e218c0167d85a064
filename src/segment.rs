//! Raw legal text to ordered (code range, clause) pairs.
//!
//! Product-specific-rules annexes lay rules out as a code-range column
//! followed by the rule sentence. A rule starts at a standalone range token
//! followed by a capitalized clause and runs to the period before the next
//! one; section and chapter headings between rules fall away with the
//! trailing truncation.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::types::{Code, CodeRange};

/// One rule as extracted from a legal text: the code range it governs and
/// its normalized clause.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawRule {
    pub range: CodeRange,
    pub clause: String,
}

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static DASH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s?[–\-]\s?").unwrap());

static RANGE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{2,4}\.?\d{2}(?:\.\w+)?)(?:-(\d{2,4}\.?\d{2}(?:\.\w+)?))?").unwrap()
});

/// Collapse whitespace runs to single spaces and unify en dashes and spaced
/// hyphens into a bare hyphen, so every range reads `2903.10-2903.69`.
/// Applied before any matching; the grammar templates assume it.
#[must_use]
pub fn normalize(raw: &str) -> String {
    DASH.replace_all(&WHITESPACE.replace_all(raw, " "), "-")
        .into_owned()
}

/// Extract ordered (range, clause) pairs from a product-specific-rules
/// text. Ranges finer than the six-digit leaf level are dropped.
#[must_use]
pub fn extract_rules(raw: &str) -> Vec<RawRule> {
    let text = normalize(raw);

    struct Boundary<'t> {
        start: usize,
        end: usize,
        low: &'t str,
        high: Option<&'t str>,
    }

    let mut boundaries: Vec<Boundary<'_>> = Vec::new();
    for caps in RANGE_TOKEN.captures_iter(&text) {
        let token = caps.get(0).expect("group 0 always participates");
        // a rule boundary is a standalone token followed by a capitalized
        // clause; code tokens inside clause text never are
        let standalone = token.start() == 0 || text[..token.start()].ends_with(' ');
        let mut after = text[token.end()..].chars();
        let opens_clause =
            after.next() == Some(' ') && after.next().is_some_and(|c| c.is_ascii_uppercase());
        if standalone && opens_clause {
            boundaries.push(Boundary {
                start: token.start(),
                end: token.end(),
                low: caps.get(1).expect("low endpoint always captured").as_str(),
                high: caps.get(2).map(|m| m.as_str()),
            });
        }
    }

    let mut rules = Vec::new();
    for (i, boundary) in boundaries.iter().enumerate() {
        let clause_end = boundaries
            .get(i + 1)
            .map_or(text.len(), |next| next.start);
        let region = text[boundary.end..clause_end].trim();
        // the clause runs to its last period; headings trailing it fall away
        let Some(stop) = region.rfind('.') else {
            continue;
        };
        let clause = &region[..=stop];

        let low = Code::new(boundary.low);
        let high = boundary.high.map(Code::new);
        if low.digits() > 6 || high.as_ref().is_some_and(|h| h.digits() > 6) {
            let token = &text[boundary.start..boundary.end];
            debug!(range = %token, "dropping tariff-item rule");
            continue;
        }

        rules.push(RawRule {
            range: match high {
                Some(high) => CodeRange::span(low, high),
                None => CodeRange::single(low),
            },
            clause: clause.to_owned(),
        });
    }

    debug!(rules = rules.len(), "extracted rules");
    rules
}

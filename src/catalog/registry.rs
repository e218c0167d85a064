use std::collections::HashSet;
use std::fmt;

use regex::Regex;

use super::error::{AmbiguousTemplateError, CatalogError};
use super::fragments::TemplateSpec;
use super::template::RuleTemplate;

/// The compiled template catalog. Built once at startup, immutable and
/// thread-safe afterwards.
///
/// Templates are mutually exclusive by construction: for any clause, at most
/// one template matches. Zero matches is the uncaptured outcome; more than
/// one is a catalog defect surfaced as [`AmbiguousTemplateError`].
#[derive(Debug)]
pub struct TemplateRegistry {
    templates: Vec<RuleTemplate>,
}

impl TemplateRegistry {
    /// Compile the full catalog.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when a pattern does not compile, when a
    /// compiled pattern's named captures disagree with the roles its
    /// fragments imply, or when two templates share a name. All are
    /// build-time defects.
    pub fn compile() -> Result<Self, CatalogError> {
        let mut templates = Vec::new();
        let mut seen = HashSet::new();
        for spec in TemplateSpec::catalog() {
            let name = spec.name();
            if !seen.insert(name.clone()) {
                return Err(CatalogError::DuplicateTemplate { name });
            }
            let pattern = Regex::new(&spec.pattern()).map_err(|source| CatalogError::Pattern {
                name: name.clone(),
                source,
            })?;
            validate_captures(&name, &pattern, &spec.expected_captures())?;
            templates.push(RuleTemplate::new(
                name,
                pattern,
                spec.flags(),
                spec.has_value_content(),
            ));
        }
        Ok(Self { templates })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// All templates, in report order.
    #[must_use]
    pub fn templates(&self) -> &[RuleTemplate] {
        &self.templates
    }

    /// Look a template up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RuleTemplate> {
        self.templates.iter().find(|t| t.name() == name)
    }

    /// Find the single template matching `clause`. `Ok(None)` is the
    /// uncaptured outcome.
    ///
    /// # Errors
    ///
    /// Returns [`AmbiguousTemplateError`] when more than one template
    /// matches: a catalog defect, never silently resolved.
    pub fn find(&self, clause: &str) -> Result<Option<&RuleTemplate>, AmbiguousTemplateError> {
        let mut matched: Vec<&RuleTemplate> = Vec::new();
        for template in &self.templates {
            if template.check(clause) {
                matched.push(template);
            }
        }
        match matched.as_slice() {
            [] => Ok(None),
            [template] => Ok(Some(template)),
            many => Err(AmbiguousTemplateError {
                clause: clause.to_owned(),
                matched: many.iter().map(|t| t.name().to_owned()).collect(),
            }),
        }
    }
}

impl fmt::Display for TemplateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TemplateRegistry({} templates)", self.templates.len())
    }
}

/// Assert that a compiled pattern's capture groups are exactly the named
/// roles its fragments imply: no positional groups, nothing missing,
/// nothing extra.
fn validate_captures(
    name: &str,
    pattern: &Regex,
    expected: &[&'static str],
) -> Result<(), CatalogError> {
    let mut found: Vec<String> = pattern
        .capture_names()
        .flatten()
        .map(str::to_owned)
        .collect();
    // groups beyond the named ones are positional: surface them too
    let positional = pattern.captures_len() - 1 - found.len();
    found.extend((0..positional).map(|_| "<positional>".to_owned()));
    found.sort_unstable();

    let mut expected: Vec<String> = expected.iter().map(|role| (*role).to_owned()).collect();
    expected.sort_unstable();

    if found == expected {
        Ok(())
    } else {
        Err(CatalogError::CaptureMismatch {
            name: name.to_owned(),
            expected,
            found,
        })
    }
}

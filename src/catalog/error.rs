use thiserror::Error;

/// Defects in the template catalog itself, caught while building the
/// registry. These are build-time failures, never runtime classification
/// outcomes.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("template '{name}': {source}")]
    Pattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error(
        "template '{name}' captures [{}] but its fragments call for [{}]",
        found.join(", "),
        expected.join(", ")
    )]
    CaptureMismatch {
        name: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("duplicate template name '{name}'")]
    DuplicateTemplate { name: String },
}

/// More than one template matched a single clause: a catalog defect,
/// surfaced with the clause and every matching template, never resolved by
/// picking one.
#[derive(Debug, Clone, Error)]
#[error("clause matches templates [{}]: {clause}", matched.join(", "))]
pub struct AmbiguousTemplateError {
    pub clause: String,
    pub matched: Vec<String>,
}

//! Rules-of-origin restriction mapping.
//!
//! `roomap` turns the free-form legal clauses of a preferential trade
//! agreement's product-specific rules of origin into a structured mapping
//! from finished-product tariff codes to the intermediate-product codes that
//! are restricted (or value-content constrained) in qualifying for
//! preferential treatment.
//!
//! The pipeline: [`segment::extract_rules`] splits raw text into (code
//! range, clause) pairs; [`TemplateRegistry::classify_all`] matches each
//! clause against the compiled template catalog, expands code ranges
//! through a [`CodeIndex`], finalizes a restriction map per leaf output
//! code, and accumulates everything into a [`RestrictionStore`].
//!
//! # Example
//!
//! ```
//! use roomap::{CodeIndex, CodeRange, RawRule, TemplateRegistry};
//!
//! let index = CodeIndex::new("2017", ["850110", "850120", "850211", "850212"]);
//! let registry = TemplateRegistry::compile().unwrap();
//! let rules = vec![RawRule {
//!     range: CodeRange::parse("8501").unwrap(),
//!     clause: "A change to heading 8501 from any other heading.".to_owned(),
//! }];
//!
//! let store = registry.classify_all(&index, &rules).unwrap();
//! // inputs from the good's own heading are the restricted ones
//! let restricted = store.restricted_inputs("850110").unwrap();
//! assert_eq!(restricted.len(), 2);
//! ```

mod catalog;
mod classify;
mod error;
mod index;
mod resolve;
mod scan;
pub mod segment;
mod store;
mod types;

pub use catalog::{
    AmbiguousTemplateError, CatalogError, RuleTemplate, TemplateFlags, TemplateRegistry,
};
pub use classify::ClassifyError;
pub use error::RooError;
pub use index::{CodeIndex, LookupError};
pub use segment::RawRule;
pub use store::RestrictionStore;
pub use types::{
    ClassificationResult, Code, CodeRange, CoverageReport, Deferred, RestrictionMap,
    Restrictiveness, TemplateTally, Tier, ValueContentFlags,
};

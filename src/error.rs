use thiserror::Error;

use crate::catalog::{AmbiguousTemplateError, CatalogError};
use crate::classify::ClassifyError;
use crate::index::LookupError;

/// Unified error type covering catalog construction, code lookup, and
/// classification.
///
/// Returned by the strict driver
/// [`TemplateRegistry::classify_clause()`](crate::TemplateRegistry::classify_clause);
/// the batch driver handles lookup failures and ambiguity itself and only
/// surfaces catalog-level defects.
#[derive(Debug, Error)]
pub enum RooError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Ambiguous(#[from] AmbiguousTemplateError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Classify(#[from] ClassifyError),
}

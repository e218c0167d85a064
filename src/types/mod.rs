mod code;
mod report;
mod restriction;

pub use code::{Code, CodeRange, Tier};
pub use report::{CoverageReport, TemplateTally};
pub use restriction::{
    ClassificationResult, Deferred, RestrictionMap, Restrictiveness, ValueContentFlags,
};

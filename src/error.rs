//! Main Crate Error

/// Returned by the average accessors before any content lookup has been
/// recorded, when the ratio they compute is undefined.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("no content lookups recorded yet")]
pub struct NoLookups;

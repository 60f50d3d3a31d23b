//! Soft-fail results for best-effort sub-operations.
//!
//! Hashtag, image-suggestion and image lookups never abort the operation that
//! asked for them. Instead of swallowing the error inside a log call, they
//! return an `Outcome` so callers can see which values are fallbacks.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum Outcome<T> {
    Ok(T),
    /// The sub-operation failed and this is the default value used instead.
    Degraded(T),
}

impl<T> Outcome<T> {
    pub fn into_inner(self) -> T {
        match self {
            Outcome::Ok(v) | Outcome::Degraded(v) => v,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded(_))
    }
}

//! The desired-state contract.
//!
//! An info request is the caller-settable subset of a resource. It is
//! validated first, then defaulted, and only then compared against or
//! submitted to a backend.

use std::fmt::Debug;

use crate::error::Result;
use crate::validation::ValidationErrors;

/// A struct describing desired state for a resource.
pub trait InfoRequest: Clone + PartialEq + Debug + Send + Sync + 'static {
    /// Check explicitly set fields and required fields.
    fn validate_info(&self) -> std::result::Result<(), ValidationErrors>;

    /// Field-by-field comparison, `None`-ness included.
    fn equals(&self, other: &Self) -> bool {
        self == other
    }
}

/// An info request whose unset optional fields have fixed defaults.
pub trait DefaultedInfoRequest: InfoRequest {
    /// Fill unset optional fields. Never overwrites a set field, so applying
    /// it twice is the same as applying it once.
    fn apply_defaults(&mut self);
}

/// Validate `req`, then default it. On failure nothing is defaulted.
pub fn validate_and_default_info<T: DefaultedInfoRequest>(mut req: T) -> Result<T> {
    req.validate_info()?;
    req.apply_defaults();
    Ok(req)
}

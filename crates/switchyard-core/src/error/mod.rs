//! Error types for Switchyard
//!
//! A single error enum is shared by the ledger, the storage layer and the
//! router. Backend handles report provider failures through
//! [`SwitchyardError::Backend`], which carries enough structure (status code,
//! provider error code) for [`classify_failure`] to decide whether the router
//! may fail over to another backend.

mod classifiers;
mod constructors;
mod conversions;
mod types;

pub use classifiers::{FailureClass, classify_failure};
pub use types::{SwitchyardError, SwitchyardResult};

pub(crate) use constructors::ALL_UNAVAILABLE_MESSAGE;

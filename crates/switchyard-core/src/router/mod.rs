//! Quota-aware fallback router
//!
//! Fronts several interchangeable backends, keeps one of them active, and
//! steers requests away from backends that are over quota, cooling down
//! after a failure, or unresolvable. Selection is sticky: the active backend
//! is kept for as long as it stays eligible, even if a higher-priority
//! backend becomes available again.

mod builder;
mod manager;
mod operations;
mod stream;
mod types;

#[cfg(test)]
mod tests;

pub use builder::FallbackRouterBuilder;
pub use manager::FallbackRouter;
pub use types::{BackendStatus, InitError, SwitchEvent};

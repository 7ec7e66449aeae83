//! Usage ledger
//!
//! Records request and token consumption per backend and answers
//! sliding-window usage queries over the last minute, hour and day. Also
//! tracks per-backend cooldowns. All state lives in a [`KvStore`], so it
//! survives restarts and is shared by every router using the same store.
//!
//! [`KvStore`]: crate::storage::KvStore

mod manager;
mod types;


pub use manager::UsageLedger;
pub use types::{CooldownEntry, UsageEvent, UsageKind, UsageReport, UsageSnapshot, UsageWindow};

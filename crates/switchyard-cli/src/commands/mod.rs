//! CLI command implementations

pub mod check;
pub mod clear;
pub mod cooldown;
pub mod usage;

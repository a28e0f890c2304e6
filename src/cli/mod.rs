//! Command implementations for the `booster` binary.

pub mod commands;

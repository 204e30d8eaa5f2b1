//! Command modules for the Branch Warden CLI.
//!
//! - `reconcile_cmd`: Drives every project of a group to the configured branch policy

pub mod reconcile_cmd;

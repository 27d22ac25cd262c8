//! Live updates for the results view.
//!
//! This module provides the push notification hub and the follow loop
//! that keeps analytics current as responses arrive.

pub mod follow;
pub mod hub;

pub use follow::{follow, LiveResults};

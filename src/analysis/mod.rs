//! Analytics modules.
//!
//! `answer` types the raw answer values, `number` holds the numeric
//! coercion and formatting rules, and `aggregator` builds the summaries.

pub mod aggregator;
pub mod answer;
pub mod number;

pub use aggregator::*;

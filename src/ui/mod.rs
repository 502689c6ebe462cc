//! Terminal presentation helpers

pub mod progress;

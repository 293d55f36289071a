//! Backend of a data-center operations dashboard.
//!
//! Keeps a simulated server fleet and traffic history in memory, refreshes
//! them on a fixed cadence, and forwards operator log excerpts to a
//! generative model for a structured severity and root-cause assessment.

pub mod config;
pub mod core;

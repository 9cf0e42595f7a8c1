//! Demand-based price adjustment.
//!
//! Reads committed order history to recompute a bounded pricing multiplier
//! per master product (family of interchangeable product variants). Runs on
//! a fixed schedule, independent of checkout; it never locks product or
//! order rows.

pub mod adjustment;
pub mod job;
pub mod repository;

//! Test helpers module
//!
//! Catalog and order doubles plus a test context that runs conversations
//! through the public message entry points.

#![allow(dead_code)]

pub mod test_context;
pub mod test_data;

pub use test_context::*;
pub use test_data::*;

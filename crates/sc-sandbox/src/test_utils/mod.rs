//! Test utilities for the sandbox.

mod fixtures;
mod heap;

pub use fixtures::*;
pub use heap::*;

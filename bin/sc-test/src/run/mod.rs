//! Run module for compiling and running contract tests
//!
//! Each unit of sources runs in its own fresh sandbox; prints and events are reported on stdout.

mod cmd;

pub use cmd::*;

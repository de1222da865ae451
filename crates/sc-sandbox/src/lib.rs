//! A mocked execution sandbox for AssemblyScript smart contracts.
//!
//! Guest modules run against an in-memory [`Ledger`], a scripted [`CallContext`] and a host
//! import table that marshals values through the guest's own heap. Nothing is persisted and no
//! real chain is involved; every run starts from a fresh [`Sandbox`].
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod codec;
pub mod constants;
pub mod crypto;
pub mod memory;

mod config;
pub use config::*;

mod context;
pub use context::*;

mod driver;
pub use driver::*;

mod error;
pub use error::*;

mod host;
pub use host::*;

mod ledger;
pub use ledger::*;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

//! The host import table.
//!
//! [`HostImports`] enumerates every function a guest may import, in host-native types.
//! [`Sandbox`] implements it over a [`Ledger`](crate::ledger::Ledger) and a
//! [`CallContext`](crate::context::CallContext), and [`register`] wires the trait into a
//! `wasmi::Linker`, marshaling pointers through the [memory bridge](crate::memory).

mod imports;
mod linker;
mod sandbox;

pub use imports::*;
pub use linker::*;
pub use sandbox::*;

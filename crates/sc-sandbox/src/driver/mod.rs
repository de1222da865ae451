//! Module loader and run driver.
//!
//! A run goes through three stages:
//!
//! 1. **Load**: sources become [`Artifacts`], either through a [`Compiler`] or by reading a
//!    prebuilt `.wasm` file.
//! 2. **Instantiate**: the binary is linked against the host import table and a fixed-size linear
//!    memory, producing a [`GuestModule`] that owns a fresh [`Sandbox`](crate::host::Sandbox).
//! 3. **Call**: the entry export runs to completion. A guest abort ends the run and is returned
//!    to the caller unchanged; it is never retried.
//!
//! There is no timeout: a guest that loops forever blocks the driver.

mod artifacts;
mod compiler;
mod module;
mod runner;

pub use artifacts::*;
pub use compiler::*;
pub use module::*;
pub use runner::*;

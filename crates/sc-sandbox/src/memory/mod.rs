//! Memory marshaling bridge between guest linear memory and host values.
//!
//! # Layout
//!
//! Every heap object the guest hands to the host is addressed by its data pointer. The object's
//! byte length is a 4-byte little-endian integer stored at `ptr - 4`:
//!
//! ```text
//!   ptr - 4        ptr
//!   +--------------+---------------------------+
//!   | len (u32 LE) | payload (len bytes)       |
//!   +--------------+---------------------------+
//! ```
//!
//! - Strings are UTF-16LE, so the character count is `len / 2`.
//! - Binary buffers are raw bytes and `len` is the byte count.
//!
//! Reads go through [`MemoryView`], which rejects any pointer whose header or payload falls
//! outside the region with [`SandboxError::CorruptMemory`](crate::SandboxError::CorruptMemory).
//! Writes allocate through the guest's exported allocator via [`GuestHeap`].

mod bridge;
mod view;

pub use bridge::*;
pub use view::*;

//! Error types for the sandbox.

use std::fmt;

/// Errors raised while loading, linking or running a guest module.
///
/// Every variant is fail-fast: none is retried or recovered inside the sandbox. Errors raised by a
/// host import travel through the guest as a trap and are recovered verbatim by the driver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SandboxError {
    /// The external compiler rejected the sources or could not be run.
    #[error("compile error:\n{diagnostics}")]
    Compile {
        /// Captured compiler output.
        diagnostics: String,
    },

    /// The binary module could not be parsed, validated or linked.
    #[error("instantiate error: {0}")]
    Instantiate(String),

    /// The compiler succeeded but produced no binary module.
    #[error("no binary artifact produced:\n{diagnostics}")]
    NoArtifactProduced {
        /// Captured compiler output, surfaced verbatim.
        diagnostics: String,
    },

    /// The guest raised an unrecoverable fault through `env.abort`.
    #[error("abort: {message} at {file}:{line}:{column}")]
    Abort {
        /// The abort message.
        message: String,
        /// The source file reported by the guest.
        file: String,
        /// The source line.
        line: u32,
        /// The source column.
        column: u32,
    },

    /// No storage entry exists for the key.
    #[error("key not found: {}", Printable(.key))]
    KeyNotFound {
        /// The account queried.
        address: String,
        /// The missing key.
        key: Vec<u8>,
    },

    /// The source account cannot cover the transfer.
    #[error("insufficient balance on {address}: has {balance}, needs {amount}")]
    InsufficientBalance {
        /// The debited account.
        address: String,
        /// Its current balance.
        balance: u64,
        /// The requested amount.
        amount: u64,
    },

    /// The address has no account in the ledger.
    #[error("unknown address: {0}")]
    UnknownAddress(String),

    /// A simulated cross-contract call found the mock queue empty.
    #[error("no mock defined for call to {address}::{function}")]
    NoMockDefined {
        /// The called address.
        address: String,
        /// The called function.
        function: String,
    },

    /// A guest pointer or object header violates the memory contract.
    #[error("corrupt memory at {ptr:#x}: {reason}")]
    CorruptMemory {
        /// The offending pointer.
        ptr: u32,
        /// What was wrong with it.
        reason: String,
    },

    /// A storage key does not fit the one-byte length prefix of the key-list format.
    #[error("storage key of {0} bytes exceeds 255 bytes")]
    KeyTooLong(usize),

    /// Crediting the destination would overflow its balance.
    #[error("balance overflow on {0}")]
    BalanceOverflow(String),

    /// A public key is neither 33, 64 nor 65 bytes, or is not a point on secp256k1.
    #[error("invalid public key of {0} bytes")]
    InvalidPublicKey(usize),

    /// No public key could be recovered from a signature and digest.
    #[error("cannot recover public key from a {signature_len}-byte signature over a {digest_len}-byte digest")]
    SignatureRecovery {
        /// Length of the supplied signature.
        signature_len: usize,
        /// Length of the supplied digest.
        digest_len: usize,
    },

    /// A call stack must hold at least one address.
    #[error("call stack cannot be empty")]
    EmptyCallStack,

    /// The guest trapped on its own (unreachable, out of bounds, stack overflow, ...).
    #[error("guest trap: {0}")]
    GuestTrap(String),

    /// Filesystem error while reading sources or writing artifacts.
    #[error("io error: {0}")]
    Io(String),

    /// The configuration could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),
}

impl SandboxError {
    /// A short label used in logs to tell error classes apart.
    ///
    /// `corrupt-memory` means the memory contract between host and guest was violated, which is a
    /// sandbox or guest-runtime bug, never a contract logic failure.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Abort { .. } => "guest-abort",
            Self::CorruptMemory { .. } => "corrupt-memory",
            Self::GuestTrap(_) => "guest-trap",
            Self::KeyNotFound { .. } |
            Self::InsufficientBalance { .. } |
            Self::UnknownAddress(_) |
            Self::NoMockDefined { .. } |
            Self::KeyTooLong(_) |
            Self::BalanceOverflow(_) |
            Self::InvalidPublicKey(_) |
            Self::SignatureRecovery { .. } |
            Self::EmptyCallStack => "domain",
            Self::Compile { .. } |
            Self::Instantiate(_) |
            Self::NoArtifactProduced { .. } |
            Self::Io(_) |
            Self::Config(_) => "load",
        }
    }

    /// Builds a [`SandboxError::CorruptMemory`].
    pub fn corrupt(ptr: u32, reason: impl Into<String>) -> Self {
        Self::CorruptMemory { ptr, reason: reason.into() }
    }
}

impl wasmi::core::HostError for SandboxError {}

impl From<std::io::Error> for SandboxError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Converts a wasmi error surfaced by a guest call back into a [`SandboxError`].
///
/// Host errors raised by the import table are recovered as-is; anything else is a trap the guest
/// raised on its own.
pub fn from_guest_error(err: wasmi::Error) -> SandboxError {
    match err.downcast_ref::<SandboxError>() {
        Some(host) => host.clone(),
        None => SandboxError::GuestTrap(err.to_string()),
    }
}

/// Renders a storage key as text when it is printable, hex otherwise.
struct Printable<'a>(&'a [u8]);

impl fmt::Display for Printable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(self.0) {
            Ok(s) if s.chars().all(|c| !c.is_control()) => write!(f, "{s:?}"),
            _ => write!(f, "0x{}", alloy_primitives::hex::encode(self.0)),
        }
    }
}

/// Result type for sandbox operations.
pub type Result<T, E = SandboxError> = std::result::Result<T, E>;

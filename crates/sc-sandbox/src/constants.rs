//! Constants for the sandbox.
//!
//! It groups the constants by the component that owns them.

/// Constants of the guest memory layout.
pub mod memory {
    /// Offset of the 4-byte little-endian length header, relative to an object's data pointer.
    pub const HEADER_OFFSET: u32 = 4;
    /// Size of the length header in bytes.
    pub const HEADER_SIZE: usize = 4;
    /// Class id passed to the guest allocator for binary buffers.
    pub const BUFFER_CLASS_ID: u32 = 1;
    /// Class id passed to the guest allocator for strings.
    pub const STRING_CLASS_ID: u32 = 2;
    /// Name of the guest's exported allocator, `__new(size, class_id) -> ptr`.
    pub const ALLOCATOR_EXPORT: &str = "__new";
    /// Name of the linear memory export and import.
    pub const MEMORY_EXPORT: &str = "memory";
    /// Size of one wasm page.
    pub const PAGE_SIZE: usize = 64 * 1024;
    /// Largest page count a 32-bit linear memory can hold.
    pub const MAX_PAGES: u32 = 65_536;
}

/// Constants of the ledger and the call context.
pub mod ledger {
    /// The default transaction originator and caller.
    pub const DEFAULT_CALLER: &str = "AU12UBnqTHDQALpocVBnkPNy7y5CndUJQTLutaVDDFgMJcq5kQiKq";
    /// The default executing contract.
    pub const DEFAULT_CALLEE: &str = "AS12BqZEQ6sByhRLyEuf0YbQmcF2PsDdkNNG1akBJu9XcjZA1eT";
    /// The balance each bootstrap account starts with.
    pub const BOOTSTRAP_BALANCE: u64 = 100_000;
    /// Returned as the caller when the call stack has a single element.
    pub const INVALID_ADDRESS: &str = "";
    /// Prefix of addresses synthesized for fresh user accounts.
    pub const SYNTHETIC_USER_PREFIX: &str = "AU12mock";
    /// Prefix of addresses synthesized for contracts created at runtime.
    pub const SYNTHETIC_CONTRACT_PREFIX: &str = "AS12mock";
    /// The default chain identifier.
    pub const DEFAULT_CHAIN_ID: u64 = 77_658_377;
    /// Maximum storage key length, bounded by the one-byte prefix of the key-list wire format.
    pub const MAX_KEY_LEN: usize = u8::MAX as usize;
}

/// Constants of the host import table.
pub mod imports {
    /// Default module name for the sandbox imports.
    pub const DEFAULT_MODULE: &str = "massa";
    /// Default prefix prepended to every sandbox import name.
    pub const DEFAULT_PREFIX: &str = "assembly_script_";
    /// Module name for the guest runtime imports (`abort`, `seed`, `trace`).
    pub const ENV_MODULE: &str = "env";
    /// Rendering of a null message or file pointer passed to `abort`.
    pub const UNKNOWN_LOCATION: &str = "<unknown>";
}

/// Constants of the module loader.
pub mod driver {
    /// Suffix of the binary module artifact.
    pub const BINARY_SUFFIX: &str = ".wasm";
    /// Suffix of the textual module artifact.
    pub const TEXT_SUFFIX: &str = ".wat";
    /// Default entry export.
    pub const DEFAULT_ENTRY: &str = "_start";
    /// Default size of the fixed linear memory, in pages (16 MiB).
    pub const DEFAULT_MEMORY_PAGES: u32 = 256;
    /// Default external compiler program.
    pub const DEFAULT_COMPILER: &str = "asc";
}

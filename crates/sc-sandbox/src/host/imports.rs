use crate::Result;

/// The complete set of functions a guest module may import, in host-native types.
///
/// Pointer arguments have already been decoded by the bridge when these methods run, and
/// reference results are encoded back by the bridge afterwards; see
/// [`register`](super::register) for the wasm-level signatures. Errors returned here become
/// guest traps that end the current run.
pub trait HostImports {
    // ---------------------------------------------------------------------------------------------
    // Storage
    // ---------------------------------------------------------------------------------------------

    /// Reads `key` from the callee's storage.
    fn get_data(&self, key: &[u8]) -> Result<Vec<u8>>;
    /// Reads `key` from `address`'s storage.
    fn get_data_for(&self, address: &str, key: &[u8]) -> Result<Vec<u8>>;
    /// Upserts `key` in the callee's storage.
    fn set_data(&mut self, key: &[u8], value: &[u8]) -> Result<()>;
    /// Upserts `key` in `address`'s storage.
    fn set_data_for(&mut self, address: &str, key: &[u8], value: &[u8]) -> Result<()>;
    /// Whether the callee's storage holds `key`.
    fn has_data(&self, key: &[u8]) -> Result<bool>;
    /// Whether `address`'s storage holds `key`.
    fn has_data_for(&self, address: &str, key: &[u8]) -> Result<bool>;
    /// Removes `key` from the callee's storage.
    fn delete_data(&mut self, key: &[u8]) -> Result<()>;
    /// Removes `key` from `address`'s storage.
    fn delete_data_for(&mut self, address: &str, key: &[u8]) -> Result<()>;
    /// Appends to an existing value in the callee's storage.
    fn append_data(&mut self, key: &[u8], suffix: &[u8]) -> Result<()>;
    /// Appends to an existing value in `address`'s storage.
    fn append_data_for(&mut self, address: &str, key: &[u8], suffix: &[u8]) -> Result<()>;
    /// Keys of the callee's storage starting with `prefix`.
    fn get_keys(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>>;
    /// Keys of `address`'s storage starting with `prefix`.
    fn get_keys_for(&self, address: &str, prefix: &[u8]) -> Result<Vec<Vec<u8>>>;

    // ---------------------------------------------------------------------------------------------
    // Coins
    // ---------------------------------------------------------------------------------------------

    /// The callee's balance.
    fn get_balance(&self) -> Result<u64>;
    /// `address`'s balance.
    fn get_balance_for(&self, address: &str) -> Result<u64>;
    /// Transfers from the callee to `to`.
    fn transfer_coins(&mut self, to: &str, amount: u64) -> Result<()>;
    /// Transfers from `from` to `to`.
    fn transfer_coins_for(&mut self, from: &str, to: &str, amount: u64) -> Result<()>;
    /// Coins attached to the current call.
    fn get_call_coins(&self) -> Result<u64>;

    // ---------------------------------------------------------------------------------------------
    // Bytecode
    // ---------------------------------------------------------------------------------------------

    /// The callee's bytecode.
    fn get_bytecode(&self) -> Result<Vec<u8>>;
    /// `address`'s bytecode.
    fn get_bytecode_for(&self, address: &str) -> Result<Vec<u8>>;
    /// Replaces the callee's bytecode.
    fn set_bytecode(&mut self, bytecode: &[u8]) -> Result<()>;
    /// Replaces `address`'s bytecode.
    fn set_bytecode_for(&mut self, address: &str, bytecode: &[u8]) -> Result<()>;
    /// Creates a contract at a fresh address and returns the address.
    fn create_sc(&mut self, bytecode: &[u8]) -> Result<String>;
    /// Whether `address` is a contract that may export `function`.
    fn function_exists(&self, address: &str, function: &str) -> Result<bool>;

    // ---------------------------------------------------------------------------------------------
    // Context
    // ---------------------------------------------------------------------------------------------

    /// The current call stack, bottom first.
    fn get_call_stack(&self) -> Result<Vec<String>>;
    /// Whether the caller has write access to the callee.
    fn caller_has_write_access(&self) -> Result<bool>;
    /// The chain identifier.
    fn get_chain_id(&self) -> Result<u64>;
    /// Wall-clock time in milliseconds since the Unix epoch.
    fn get_time(&self) -> Result<u64>;
    /// A non-cryptographic random number.
    fn unsafe_random(&mut self) -> Result<i64>;

    // ---------------------------------------------------------------------------------------------
    // Crypto
    // ---------------------------------------------------------------------------------------------

    /// SHA-256 digest.
    fn hash_sha256(&self, data: &[u8]) -> Result<Vec<u8>>;
    /// Keccak-256 digest.
    fn hash_keccak256(&self, data: &[u8]) -> Result<Vec<u8>>;
    /// Generic signature check.
    fn signature_verify(&self, data: &[u8], signature: &[u8], pubkey: &[u8]) -> Result<bool>;
    /// secp256k1 signature check over a 32-byte digest.
    fn evm_signature_verify(&self, digest: &[u8], signature: &[u8], pubkey: &[u8])
        -> Result<bool>;
    /// The 20-byte EVM address of a secp256k1 public key.
    fn evm_get_address_from_pubkey(&self, pubkey: &[u8]) -> Result<Vec<u8>>;
    /// The uncompressed public key recovered from a signature over `digest`.
    fn evm_get_pubkey_from_signature(&self, digest: &[u8], signature: &[u8]) -> Result<Vec<u8>>;

    // ---------------------------------------------------------------------------------------------
    // Cross-contract calls
    // ---------------------------------------------------------------------------------------------

    /// Simulated call of `function` on `address` with `coins` attached.
    fn call(&mut self, address: &str, function: &str, args: &[u8], coins: u64)
        -> Result<Vec<u8>>;
    /// Simulated call of `function` on `address` in the caller's own context.
    fn local_call(&mut self, address: &str, function: &str, args: &[u8]) -> Result<Vec<u8>>;

    // ---------------------------------------------------------------------------------------------
    // Output
    // ---------------------------------------------------------------------------------------------

    /// Debug output from the guest.
    fn print(&mut self, message: &str) -> Result<()>;
    /// Emits an event.
    fn generate_event(&mut self, event: &str) -> Result<()>;

    // ---------------------------------------------------------------------------------------------
    // Mocks
    // ---------------------------------------------------------------------------------------------

    /// Queues the result of the next simulated call.
    fn mock_call(&mut self, payload: &[u8]) -> Result<()>;
    /// Switches to a deployment context.
    fn set_deploy_context(&mut self, caller: Option<&str>) -> Result<()>;
    /// Switches to a self-call context.
    fn set_local_context(&mut self, address: Option<&str>) -> Result<()>;
    /// Replaces the call stack.
    fn set_call_stack(&mut self, addresses: Vec<String>) -> Result<()>;
    /// Forces the write-access flag.
    fn mock_admin_context(&mut self, write_access: bool) -> Result<()>;
    /// Drops a forced write-access flag.
    fn unmock_admin_context(&mut self) -> Result<()>;
    /// Overrides a balance.
    fn mock_balance(&mut self, address: &str, amount: u64) -> Result<()>;
    /// Sets the coins attached to the current call.
    fn mock_call_coins(&mut self, coins: u64) -> Result<()>;
    /// Sets the chain identifier.
    fn set_chain_id(&mut self, chain_id: u64) -> Result<()>;
    /// Resets ledger and context to the bootstrap state.
    fn reset_storage(&mut self) -> Result<()>;

    // ---------------------------------------------------------------------------------------------
    // Guest runtime
    // ---------------------------------------------------------------------------------------------

    /// Unrecoverable guest fault. Implementations must return [`SandboxError::Abort`].
    ///
    /// [`SandboxError::Abort`]: crate::SandboxError::Abort
    fn abort(&mut self, message: &str, file: &str, line: u32, column: u32) -> Result<()>;
    /// Seed for the guest's pseudo-random generator.
    fn seed(&mut self) -> Result<f64>;
    /// Trace output from the guest runtime.
    fn trace(&mut self, message: &str, args: &[f64]) -> Result<()>;
}

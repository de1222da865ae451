use std::time::{SystemTime, UNIX_EPOCH};

use delegate::delegate;
use tracing::{debug, info, trace};

use super::HostImports;
use crate::{
    context::CallContext,
    crypto,
    ledger::{Account, Ledger},
    Result, SandboxConfig, SandboxError,
};

/// An event emitted by the guest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedEvent {
    /// The callee at emission time.
    pub emitter: String,
    /// The event payload.
    pub data: String,
}

/// All mutable state of one mocked execution environment.
///
/// A sandbox owns its ledger, call context and mock queue outright; nothing is shared between
/// sandboxes, so independent runs never observe each other's state.
#[derive(Debug)]
pub struct Sandbox {
    config: SandboxConfig,
    ledger: Ledger,
    context: CallContext,
    events: Vec<GeneratedEvent>,
    printed: Vec<String>,
}

impl Sandbox {
    /// Creates a sandbox in its bootstrap state.
    pub fn new(config: SandboxConfig) -> Self {
        let ledger = Ledger::with_accounts(bootstrap_accounts(&config));
        let context =
            CallContext::new(&*config.default_caller, &*config.default_callee, config.chain_id);
        Self { config, ledger, context, events: Vec::new(), printed: Vec::new() }
    }

    /// Restores the bootstrap ledger and the default call context, and drops queued mocks and
    /// emitted events.
    pub fn reset_to_default(&mut self) {
        debug!("Resetting sandbox");
        self.ledger.reset(bootstrap_accounts(&self.config));
        self.context.reset_to_default();
        self.events.clear();
    }

    /// The configuration this sandbox was built from.
    pub const fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// The ledger.
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// The ledger, writable.
    pub fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }

    /// The call context.
    pub const fn context(&self) -> &CallContext {
        &self.context
    }

    /// The call context, writable.
    pub fn context_mut(&mut self) -> &mut CallContext {
        &mut self.context
    }

    /// Events emitted since the last reset.
    pub fn events(&self) -> &[GeneratedEvent] {
        &self.events
    }

    /// Lines printed by the guest.
    pub fn printed(&self) -> &[String] {
        &self.printed
    }

    delegate! {
        to self.context {
            /// The address below the callee.
            pub fn caller(&self) -> &str;
            /// The currently executing address.
            pub fn callee(&self) -> &str;
            /// Whether the caller has write access to the callee.
            pub fn has_write_access(&self) -> bool;
        }
    }

    fn callee_owned(&self) -> String {
        self.context.callee().to_string()
    }
}

fn bootstrap_accounts(config: &SandboxConfig) -> [(String, u64); 2] {
    [
        (config.default_caller.clone(), config.bootstrap_balance),
        (config.default_callee.clone(), config.bootstrap_balance),
    ]
}

impl HostImports for Sandbox {
    fn get_data(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.get_data_for(self.callee(), key)
    }

    fn get_data_for(&self, address: &str, key: &[u8]) -> Result<Vec<u8>> {
        self.ledger.get(address, key).map(<[u8]>::to_vec)
    }

    fn set_data(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let callee = self.callee_owned();
        self.ledger.set(&callee, key, value)
    }

    fn set_data_for(&mut self, address: &str, key: &[u8], value: &[u8]) -> Result<()> {
        self.ledger.set(address, key, value)
    }

    fn has_data(&self, key: &[u8]) -> Result<bool> {
        Ok(self.ledger.has(self.callee(), key))
    }

    fn has_data_for(&self, address: &str, key: &[u8]) -> Result<bool> {
        Ok(self.ledger.has(address, key))
    }

    fn delete_data(&mut self, key: &[u8]) -> Result<()> {
        let callee = self.callee_owned();
        self.ledger.delete(&callee, key)
    }

    fn delete_data_for(&mut self, address: &str, key: &[u8]) -> Result<()> {
        self.ledger.delete(address, key)
    }

    fn append_data(&mut self, key: &[u8], suffix: &[u8]) -> Result<()> {
        let callee = self.callee_owned();
        self.ledger.append(&callee, key, suffix)
    }

    fn append_data_for(&mut self, address: &str, key: &[u8], suffix: &[u8]) -> Result<()> {
        self.ledger.append(address, key, suffix)
    }

    fn get_keys(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.ledger.list_keys(self.callee(), prefix)
    }

    fn get_keys_for(&self, address: &str, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.ledger.list_keys(address, prefix)
    }

    fn get_balance(&self) -> Result<u64> {
        self.ledger.balance(self.callee())
    }

    fn get_balance_for(&self, address: &str) -> Result<u64> {
        self.ledger.balance(address)
    }

    fn transfer_coins(&mut self, to: &str, amount: u64) -> Result<()> {
        let callee = self.callee_owned();
        self.ledger.transfer(&callee, to, amount)
    }

    fn transfer_coins_for(&mut self, from: &str, to: &str, amount: u64) -> Result<()> {
        self.ledger.transfer(from, to, amount)
    }

    fn get_call_coins(&self) -> Result<u64> {
        Ok(self.context.execution().call_coins)
    }

    fn get_bytecode(&self) -> Result<Vec<u8>> {
        self.get_bytecode_for(self.callee())
    }

    fn get_bytecode_for(&self, address: &str) -> Result<Vec<u8>> {
        self.ledger.get_bytecode(address).map(<[u8]>::to_vec)
    }

    fn set_bytecode(&mut self, bytecode: &[u8]) -> Result<()> {
        let callee = self.callee_owned();
        self.ledger.set_bytecode(&callee, bytecode);
        Ok(())
    }

    fn set_bytecode_for(&mut self, address: &str, bytecode: &[u8]) -> Result<()> {
        self.ledger.set_bytecode(address, bytecode);
        Ok(())
    }

    fn create_sc(&mut self, bytecode: &[u8]) -> Result<String> {
        let address = self.ledger.create_contract(bytecode);
        debug!(%address, size = bytecode.len(), "Created contract");
        Ok(address)
    }

    fn function_exists(&self, address: &str, function: &str) -> Result<bool> {
        // Exports are not inspected; any deployed contract is assumed to have the function.
        trace!(address, function, "Function lookup");
        self.ledger
            .account(address)
            .map(Account::is_contract)
            .ok_or_else(|| SandboxError::UnknownAddress(address.to_string()))
    }

    fn get_call_stack(&self) -> Result<Vec<String>> {
        Ok(self.context.call_stack().to_vec())
    }

    fn caller_has_write_access(&self) -> Result<bool> {
        Ok(self.context.has_write_access())
    }

    fn get_chain_id(&self) -> Result<u64> {
        Ok(self.context.execution().chain_id)
    }

    fn get_time(&self) -> Result<u64> {
        let elapsed = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        Ok(elapsed.as_millis() as u64)
    }

    fn unsafe_random(&mut self) -> Result<i64> {
        Ok(rand::random())
    }

    fn hash_sha256(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(crypto::sha256(data).to_vec())
    }

    fn hash_keccak256(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(crypto::keccak(data).to_vec())
    }

    fn signature_verify(&self, _data: &[u8], _signature: &[u8], _pubkey: &[u8]) -> Result<bool> {
        Ok(true)
    }

    fn evm_signature_verify(
        &self,
        digest: &[u8],
        signature: &[u8],
        pubkey: &[u8],
    ) -> Result<bool> {
        Ok(crypto::evm_signature_valid(digest, signature, pubkey))
    }

    fn evm_get_address_from_pubkey(&self, pubkey: &[u8]) -> Result<Vec<u8>> {
        crypto::evm_address_from_pubkey(pubkey)
            .map(|address| address.to_vec())
            .ok_or(SandboxError::InvalidPublicKey(pubkey.len()))
    }

    fn evm_get_pubkey_from_signature(&self, digest: &[u8], signature: &[u8]) -> Result<Vec<u8>> {
        crypto::recover_pubkey(digest, signature).map(|key| key.to_vec()).ok_or(
            SandboxError::SignatureRecovery {
                signature_len: signature.len(),
                digest_len: digest.len(),
            },
        )
    }

    fn call(
        &mut self,
        address: &str,
        function: &str,
        args: &[u8],
        coins: u64,
    ) -> Result<Vec<u8>> {
        trace!(address, function, args = args.len(), coins, "Simulated call");
        let result = self.context.dequeue_mock_return(address, function)?;
        if coins > 0 {
            let callee = self.callee_owned();
            self.ledger.transfer(&callee, address, coins)?;
        }
        Ok(result)
    }

    fn local_call(&mut self, address: &str, function: &str, args: &[u8]) -> Result<Vec<u8>> {
        trace!(address, function, args = args.len(), "Simulated local call");
        self.context.dequeue_mock_return(address, function)
    }

    fn print(&mut self, message: &str) -> Result<()> {
        info!(target: "sc_sandbox::guest", "{message}");
        self.printed.push(message.to_string());
        Ok(())
    }

    fn generate_event(&mut self, event: &str) -> Result<()> {
        debug!(event, "Event generated");
        let emitter = self.callee_owned();
        self.events.push(GeneratedEvent { emitter, data: event.to_string() });
        Ok(())
    }

    fn mock_call(&mut self, payload: &[u8]) -> Result<()> {
        self.context.enqueue_mock_return(payload.to_vec());
        Ok(())
    }

    fn set_deploy_context(&mut self, caller: Option<&str>) -> Result<()> {
        let ledger = &self.ledger;
        let caller = self.context.push_deploy_context(caller, |address| ledger.contains(address));
        if !self.ledger.contains(&caller) {
            self.ledger.register(caller, 0);
        }
        Ok(())
    }

    fn set_local_context(&mut self, address: Option<&str>) -> Result<()> {
        self.context.push_local_context(address);
        Ok(())
    }

    fn set_call_stack(&mut self, addresses: Vec<String>) -> Result<()> {
        self.context.set_call_stack(addresses)
    }

    fn mock_admin_context(&mut self, write_access: bool) -> Result<()> {
        self.context.set_admin_override(write_access);
        Ok(())
    }

    fn unmock_admin_context(&mut self) -> Result<()> {
        self.context.clear_admin_override();
        Ok(())
    }

    fn mock_balance(&mut self, address: &str, amount: u64) -> Result<()> {
        self.ledger.set_balance(address, amount);
        Ok(())
    }

    fn mock_call_coins(&mut self, coins: u64) -> Result<()> {
        self.context.set_call_coins(coins);
        Ok(())
    }

    fn set_chain_id(&mut self, chain_id: u64) -> Result<()> {
        self.context.set_chain_id(chain_id);
        Ok(())
    }

    fn reset_storage(&mut self) -> Result<()> {
        self.reset_to_default();
        Ok(())
    }

    fn abort(&mut self, message: &str, file: &str, line: u32, column: u32) -> Result<()> {
        Err(SandboxError::Abort {
            message: message.to_string(),
            file: file.to_string(),
            line,
            column,
        })
    }

    fn seed(&mut self) -> Result<f64> {
        Ok(rand::random())
    }

    fn trace(&mut self, message: &str, args: &[f64]) -> Result<()> {
        debug!(target: "sc_sandbox::guest", ?args, "{message}");
        Ok(())
    }
}

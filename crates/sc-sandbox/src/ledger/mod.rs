//! In-memory ledger backing the sandbox.
//!
//! The ledger maps addresses to [`Account`]s. It is the single source of truth for every state
//! change made during a run. Accounts are created lazily (as transfer destinations, by writes,
//! or explicitly) and are never removed except by [`Ledger::reset`].

mod account;

use std::collections::BTreeMap;

pub use account::*;
use tracing::trace;

use crate::{
    constants::ledger::{MAX_KEY_LEN, SYNTHETIC_CONTRACT_PREFIX},
    Result, SandboxError,
};

/// Address to account mapping for one sandbox.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    accounts: BTreeMap<String, Account>,
    /// Counter for addresses synthesized by [`Ledger::create_contract`].
    next_contract: u64,
}

impl Ledger {
    /// Creates a ledger holding the given bootstrap accounts.
    pub fn with_accounts<I, A>(accounts: I) -> Self
    where
        I: IntoIterator<Item = (A, u64)>,
        A: Into<String>,
    {
        let mut ledger = Self::default();
        for (address, balance) in accounts {
            ledger.register(address, balance);
        }
        ledger
    }

    /// Replaces the whole ledger with the given bootstrap accounts.
    ///
    /// The contract address counter is kept, so addresses synthesized after a reset never repeat
    /// earlier ones.
    pub fn reset<I, A>(&mut self, accounts: I)
    where
        I: IntoIterator<Item = (A, u64)>,
        A: Into<String>,
    {
        self.accounts.clear();
        for (address, balance) in accounts {
            self.register(address, balance);
        }
    }

    /// Creates `address` with the given balance, replacing any existing account.
    pub fn register(&mut self, address: impl Into<String>, balance: u64) {
        self.accounts.insert(address.into(), Account::with_balance(balance));
    }

    /// Whether the address has an account.
    pub fn contains(&self, address: &str) -> bool {
        self.accounts.contains_key(address)
    }

    /// The account at `address`, if any.
    pub fn account(&self, address: &str) -> Option<&Account> {
        self.accounts.get(address)
    }

    /// Iterates over all accounts in address order.
    pub fn accounts(&self) -> impl Iterator<Item = (&str, &Account)> {
        self.accounts.iter().map(|(address, account)| (address.as_str(), account))
    }

    fn existing(&self, address: &str) -> Result<&Account> {
        self.accounts.get(address).ok_or_else(|| SandboxError::UnknownAddress(address.to_string()))
    }

    fn existing_mut(&mut self, address: &str) -> Result<&mut Account> {
        self.accounts
            .get_mut(address)
            .ok_or_else(|| SandboxError::UnknownAddress(address.to_string()))
    }

    fn vivify(&mut self, address: &str) -> &mut Account {
        if !self.accounts.contains_key(address) {
            trace!(address, "Auto-vivifying account");
        }
        self.accounts.entry(address.to_string()).or_default()
    }

    /// Reads a storage value.
    pub fn get(&self, address: &str, key: &[u8]) -> Result<&[u8]> {
        self.existing(address)?.storage.get(key).map(Vec::as_slice).ok_or_else(|| {
            SandboxError::KeyNotFound { address: address.to_string(), key: key.to_vec() }
        })
    }

    /// Upserts a storage value, creating the account if needed.
    pub fn set(&mut self, address: &str, key: &[u8], value: &[u8]) -> Result<()> {
        if key.len() > MAX_KEY_LEN {
            return Err(SandboxError::KeyTooLong(key.len()));
        }
        self.vivify(address).storage.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    /// Whether a storage entry exists. An unknown address simply has no entries.
    pub fn has(&self, address: &str, key: &[u8]) -> bool {
        self.accounts.get(address).is_some_and(|account| account.storage.contains_key(key))
    }

    /// Removes a storage entry.
    pub fn delete(&mut self, address: &str, key: &[u8]) -> Result<()> {
        self.existing_mut(address)?.storage.remove(key).map(drop).ok_or_else(|| {
            SandboxError::KeyNotFound { address: address.to_string(), key: key.to_vec() }
        })
    }

    /// Appends `suffix` to an existing storage value. Never creates the entry.
    pub fn append(&mut self, address: &str, key: &[u8], suffix: &[u8]) -> Result<()> {
        let value = self.existing_mut(address)?.storage.get_mut(key).ok_or_else(|| {
            SandboxError::KeyNotFound { address: address.to_string(), key: key.to_vec() }
        })?;
        value.extend_from_slice(suffix);
        Ok(())
    }

    /// All storage keys of `address` starting with `prefix`. An empty prefix lists every key.
    pub fn list_keys(&self, address: &str, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        let account = self.existing(address)?;
        Ok(account.storage.keys().filter(|key| key.starts_with(prefix)).cloned().collect())
    }

    /// The balance of `address`.
    pub fn balance(&self, address: &str) -> Result<u64> {
        Ok(self.existing(address)?.balance)
    }

    /// Overrides the balance of `address`, creating the account if needed.
    pub fn set_balance(&mut self, address: &str, amount: u64) {
        self.vivify(address).balance = amount;
    }

    /// Moves `amount` coins from `from` to `to`, creating `to` if needed.
    ///
    /// Both balances are checked before either is written, so a failed transfer leaves no partial
    /// state behind.
    pub fn transfer(&mut self, from: &str, to: &str, amount: u64) -> Result<()> {
        let balance = self.balance(from)?;
        if balance < amount {
            return Err(SandboxError::InsufficientBalance {
                address: from.to_string(),
                balance,
                amount,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .accounts
            .get(to)
            .map_or(Some(amount), |account| account.balance.checked_add(amount))
            .ok_or_else(|| SandboxError::BalanceOverflow(to.to_string()))?;

        self.vivify(to).balance = credited;
        self.existing_mut(from)?.balance = balance - amount;
        trace!(from, to, amount, "Transferred coins");
        Ok(())
    }

    /// The bytecode stored at `address`.
    pub fn get_bytecode(&self, address: &str) -> Result<&[u8]> {
        Ok(&self.existing(address)?.bytecode)
    }

    /// Stores bytecode at `address`, creating the account if needed.
    pub fn set_bytecode(&mut self, address: &str, bytecode: &[u8]) {
        self.vivify(address).bytecode = bytecode.to_vec();
    }

    /// Creates a contract account at a fresh address and returns that address.
    pub fn create_contract(&mut self, bytecode: &[u8]) -> String {
        let address = loop {
            self.next_contract += 1;
            let candidate = format!("{SYNTHETIC_CONTRACT_PREFIX}{}", self.next_contract);
            if !self.accounts.contains_key(&candidate) {
                break candidate;
            }
        };
        self.set_bytecode(&address, bytecode);
        address
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "A";
    const B: &str = "B";

    fn bootstrap() -> Ledger {
        Ledger::with_accounts([(A, 100_000), (B, 100_000)])
    }

    #[test]
    fn test_transfer_between_bootstrap_accounts() {
        let mut ledger = bootstrap();
        ledger.transfer(A, B, 100).unwrap();
        assert_eq!(ledger.balance(A).unwrap(), 99_900);
        assert_eq!(ledger.balance(B).unwrap(), 100_100);
    }

    #[test]
    fn test_transfer_insufficient_balance_leaves_state() {
        let mut ledger = bootstrap();
        let err = ledger.transfer(A, B, 100_001).unwrap_err();
        assert!(matches!(err, SandboxError::InsufficientBalance { amount: 100_001, .. }));
        assert_eq!(ledger.balance(A).unwrap(), 100_000);
        assert_eq!(ledger.balance(B).unwrap(), 100_000);
    }

    #[test]
    fn test_transfer_vivifies_destination() {
        let mut ledger = bootstrap();
        ledger.transfer(A, "C", 5).unwrap();
        assert_eq!(ledger.balance("C").unwrap(), 5);
        assert!(ledger.account("C").unwrap().storage.is_empty());
    }

    #[test]
    fn test_transfer_conserves_total() {
        let mut ledger = bootstrap();
        for (amount, to) in [(1, B), (70_000, "C"), (29_999, B)] {
            let before: u64 = ledger.accounts().map(|(_, a)| a.balance).sum();
            ledger.transfer(A, to, amount).unwrap();
            let after: u64 = ledger.accounts().map(|(_, a)| a.balance).sum();
            assert_eq!(before, after);
        }
        assert_eq!(ledger.balance(A).unwrap(), 0);
    }

    #[test]
    fn test_transfer_to_self_is_noop() {
        let mut ledger = bootstrap();
        ledger.transfer(A, A, 10).unwrap();
        assert_eq!(ledger.balance(A).unwrap(), 100_000);
    }

    #[test]
    fn test_transfer_overflow_is_rejected_before_debit() {
        let mut ledger = bootstrap();
        ledger.set_balance(B, u64::MAX);
        let err = ledger.transfer(A, B, 1).unwrap_err();
        assert_eq!(err, SandboxError::BalanceOverflow(B.to_string()));
        assert_eq!(ledger.balance(A).unwrap(), 100_000);
    }

    #[test]
    fn test_transfer_from_unknown_address() {
        let mut ledger = bootstrap();
        let err = ledger.transfer("nobody", A, 0).unwrap_err();
        assert_eq!(err, SandboxError::UnknownAddress("nobody".into()));
    }

    #[test]
    fn test_storage_lifecycle() {
        let mut ledger = bootstrap();
        assert!(!ledger.has(A, b"missing"));
        ledger.set(A, b"k", b"v").unwrap();
        assert!(ledger.has(A, b"k"));
        ledger.delete(A, b"k").unwrap();
        assert!(matches!(ledger.get(A, b"k"), Err(SandboxError::KeyNotFound { .. })));
        assert!(matches!(ledger.delete(A, b"k"), Err(SandboxError::KeyNotFound { .. })));
    }

    #[test]
    fn test_append_requires_existing_key() {
        let mut ledger = bootstrap();
        assert!(matches!(ledger.append(A, b"k", b"2"), Err(SandboxError::KeyNotFound { .. })));
        ledger.set(A, b"k", b"1").unwrap();
        ledger.append(A, b"k", b"2").unwrap();
        assert_eq!(ledger.get(A, b"k").unwrap(), b"12");
    }

    #[test]
    fn test_storage_is_scoped_per_account() {
        let mut ledger = bootstrap();
        ledger.set(A, b"k", b"a").unwrap();
        assert!(!ledger.has(B, b"k"));
        ledger.set(B, b"k", b"b").unwrap();
        assert_eq!(ledger.get(A, b"k").unwrap(), b"a");
        ledger.delete(B, b"k").unwrap();
        assert_eq!(ledger.get(A, b"k").unwrap(), b"a");
    }

    #[test]
    fn test_has_on_unknown_address_is_false() {
        let ledger = bootstrap();
        assert!(!ledger.has("nobody", b"k"));
        assert!(matches!(ledger.get("nobody", b"k"), Err(SandboxError::UnknownAddress(_))));
    }

    #[test]
    fn test_list_keys_by_prefix() {
        let mut ledger = bootstrap();
        for key in [&b"owner"[..], &b"balance:x"[..], &b"balance:y"[..]] {
            ledger.set(A, key, b"").unwrap();
        }
        assert_eq!(ledger.list_keys(A, b"").unwrap().len(), 3);
        assert_eq!(
            ledger.list_keys(A, b"balance:").unwrap(),
            vec![b"balance:x".to_vec(), b"balance:y".to_vec()]
        );
        assert!(ledger.list_keys(A, b"zzz").unwrap().is_empty());
    }

    #[test]
    fn test_set_rejects_long_key() {
        let mut ledger = bootstrap();
        assert_eq!(ledger.set(A, &[0; 256], b"").unwrap_err(), SandboxError::KeyTooLong(256));
        ledger.set(A, &[0; 255], b"").unwrap();
    }

    #[test]
    fn test_bytecode_marks_contract() {
        let mut ledger = bootstrap();
        assert!(!ledger.account(B).unwrap().is_contract());
        ledger.set_bytecode(B, b"\0asm");
        assert_eq!(ledger.get_bytecode(B).unwrap(), b"\0asm");
        assert!(ledger.account(B).unwrap().is_contract());
    }

    #[test]
    fn test_create_contract_uses_fresh_addresses() {
        let mut ledger = bootstrap();
        let first = ledger.create_contract(b"one");
        ledger.reset([(A, 1)]);
        let second = ledger.create_contract(b"two");
        assert_ne!(first, second);
        assert_eq!(ledger.get_bytecode(&second).unwrap(), b"two");
        assert!(!ledger.contains(&first));
    }
}

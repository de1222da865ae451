use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A ledger entry: storage, bytecode and balance of one address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Key/value storage, scoped to this account.
    pub storage: BTreeMap<Vec<u8>, Vec<u8>>,
    /// Contract bytecode. Empty means the account is not a contract.
    pub bytecode: Vec<u8>,
    /// Coin balance.
    pub balance: u64,
}

impl Account {
    /// Creates an account holding only a balance.
    pub fn with_balance(balance: u64) -> Self {
        Self { balance, ..Default::default() }
    }

    /// Whether this account carries bytecode.
    pub fn is_contract(&self) -> bool {
        !self.bytecode.is_empty()
    }
}

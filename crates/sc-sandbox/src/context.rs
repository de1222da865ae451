//! Call-context state machine.
//!
//! Tracks who is executing, the privilege flags of the current call, and the queue of canned
//! results for simulated cross-contract calls. This is a mock: the call stack is replaced
//! wholesale by explicit transitions and is never pushed or popped by ordinary host calls.

use std::collections::VecDeque;

use tracing::debug;

use crate::{
    codec::encode_call_stack,
    constants::ledger::{INVALID_ADDRESS, SYNTHETIC_USER_PREFIX},
    Result, SandboxError,
};

/// Ordered addresses modeling nested execution. Bottom is the originator, top the callee.
///
/// Always holds at least one address.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Deref)]
pub struct CallStack(Vec<String>);

impl CallStack {
    /// Creates a call stack, rejecting an empty list.
    pub fn new(addresses: Vec<String>) -> Result<Self> {
        if addresses.is_empty() {
            return Err(SandboxError::EmptyCallStack);
        }
        Ok(Self(addresses))
    }

    /// The currently executing address.
    pub fn callee(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or(INVALID_ADDRESS)
    }

    /// The address right below the callee, or [`INVALID_ADDRESS`] at depth 1.
    pub fn caller(&self) -> &str {
        match self.0.len() {
            0 | 1 => INVALID_ADDRESS,
            n => &self.0[n - 2],
        }
    }

    /// The bottom-most address.
    pub fn originator(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or(INVALID_ADDRESS)
    }
}

impl std::fmt::Display for CallStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&encode_call_stack(&self.0))
    }
}

/// Privilege flags and chain data shared by every host call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionContext {
    /// Whether the caller may write to the callee (constructor / admin calls).
    pub write_access: bool,
    /// Whether the current call deploys the callee.
    pub is_deploy: bool,
    /// Chain identifier reported to the guest.
    pub chain_id: u64,
    /// Coins attached to the current call.
    pub call_coins: u64,
}

/// The call-context state machine of one sandbox.
#[derive(Debug, Clone)]
pub struct CallContext {
    stack: CallStack,
    execution: ExecutionContext,
    mocks: VecDeque<Vec<u8>>,
    default_caller: String,
    default_callee: String,
    default_chain_id: u64,
    /// Counter for addresses synthesized by the deploy transition.
    next_user: u64,
}

impl CallContext {
    /// Creates a context in its default state.
    pub fn new(
        default_caller: impl Into<String>,
        default_callee: impl Into<String>,
        chain_id: u64,
    ) -> Self {
        let default_caller = default_caller.into();
        let default_callee = default_callee.into();
        Self {
            stack: CallStack(vec![default_caller.clone(), default_callee.clone()]),
            execution: ExecutionContext {
                write_access: false,
                is_deploy: false,
                chain_id,
                call_coins: 0,
            },
            mocks: VecDeque::new(),
            default_caller,
            default_callee,
            default_chain_id: chain_id,
            next_user: 0,
        }
    }

    /// Returns to `[default caller, default callee]` with no privileges and an empty mock queue.
    pub fn reset_to_default(&mut self) {
        debug!("Resetting call context");
        self.stack = CallStack(vec![self.default_caller.clone(), self.default_callee.clone()]);
        self.execution = ExecutionContext {
            write_access: false,
            is_deploy: false,
            chain_id: self.default_chain_id,
            call_coins: 0,
        };
        self.mocks.clear();
    }

    /// Emulates a deployment: grants write access, marks the call as a deploy and installs
    /// `[caller, callee]`.
    ///
    /// When `caller` is omitted or equal to the current callee, a fresh address is synthesized so
    /// that caller and callee always differ afterwards. A synthesized address is never one for
    /// which `in_use` holds. Returns the caller actually installed; the owner of the ledger is
    /// responsible for creating its account.
    pub fn push_deploy_context(
        &mut self,
        caller: Option<&str>,
        in_use: impl Fn(&str) -> bool,
    ) -> String {
        let callee = self.callee().to_string();
        let caller = match caller {
            Some(caller) if caller != callee && caller != INVALID_ADDRESS => caller.to_string(),
            _ => self.fresh_user_address(|candidate| candidate == callee || in_use(candidate)),
        };
        self.execution.write_access = true;
        self.execution.is_deploy = true;
        self.stack = CallStack(vec![caller.clone(), callee]);
        debug!(stack = %self.stack, "Switched to deploy context");
        caller
    }

    /// Emulates an account calling into itself: grants write access and collapses caller and
    /// callee to `address`, or to the current callee when omitted.
    pub fn push_local_context(&mut self, address: Option<&str>) {
        let address = match address {
            Some(address) if address != INVALID_ADDRESS => address.to_string(),
            _ => self.callee().to_string(),
        };
        self.execution.write_access = true;
        self.stack = CallStack(vec![address.clone(), address]);
        debug!(stack = %self.stack, "Switched to local context");
    }

    /// Replaces the call stack verbatim.
    pub fn set_call_stack(&mut self, addresses: Vec<String>) -> Result<()> {
        self.stack = CallStack::new(addresses)?;
        debug!(stack = %self.stack, "Call stack replaced");
        Ok(())
    }

    /// Forces the write-access flag, independently of the deploy and local transitions.
    pub fn set_admin_override(&mut self, write_access: bool) {
        self.execution.write_access = write_access;
    }

    /// Drops a forced write-access flag.
    pub fn clear_admin_override(&mut self) {
        self.execution.write_access = false;
    }

    /// Sets the chain identifier reported to the guest.
    pub fn set_chain_id(&mut self, chain_id: u64) {
        self.execution.chain_id = chain_id;
    }

    /// Sets the coins attached to the current call.
    pub fn set_call_coins(&mut self, coins: u64) {
        self.execution.call_coins = coins;
    }

    /// The current call stack.
    pub const fn call_stack(&self) -> &CallStack {
        &self.stack
    }

    /// The current privilege flags and chain data.
    pub const fn execution(&self) -> &ExecutionContext {
        &self.execution
    }

    /// The address below the callee, or [`INVALID_ADDRESS`].
    pub fn caller(&self) -> &str {
        self.stack.caller()
    }

    /// The currently executing address.
    pub fn callee(&self) -> &str {
        self.stack.callee()
    }

    /// Whether the caller has write access to the callee.
    pub const fn has_write_access(&self) -> bool {
        self.execution.write_access
    }

    /// Whether the current call is a deployment.
    pub const fn is_deploy(&self) -> bool {
        self.execution.is_deploy
    }

    /// Queues the result of the next simulated cross-contract call.
    pub fn enqueue_mock_return(&mut self, payload: Vec<u8>) {
        self.mocks.push_back(payload);
    }

    /// Takes the oldest queued result for a call to `address::function`.
    pub fn dequeue_mock_return(&mut self, address: &str, function: &str) -> Result<Vec<u8>> {
        self.mocks.pop_front().ok_or_else(|| SandboxError::NoMockDefined {
            address: address.to_string(),
            function: function.to_string(),
        })
    }

    /// Number of queued mock results.
    pub fn pending_mocks(&self) -> usize {
        self.mocks.len()
    }

    fn fresh_user_address(&mut self, taken: impl Fn(&str) -> bool) -> String {
        loop {
            self.next_user += 1;
            let candidate = format!("{SYNTHETIC_USER_PREFIX}{}", self.next_user);
            if !taken(&candidate) {
                return candidate;
            }
        }
    }
}

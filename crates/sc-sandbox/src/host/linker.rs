use tracing::trace;
use wasmi::{Caller, Extern, Linker, Memory};

use super::HostImports;
use crate::{
    codec::{decode_call_stack, encode_call_stack, encode_key_list},
    constants::{
        imports::{ENV_MODULE, UNKNOWN_LOCATION},
        memory::{ALLOCATOR_EXPORT, MEMORY_EXPORT},
    },
    memory::{new_bytes, new_string, ptr_to_bytes, ptr_to_opt_string, ptr_to_string, GuestHeap},
    Result, SandboxConfig, SandboxError,
};

/// One in-flight host call: the wasmi caller plus the memory objects are read from and written
/// to.
///
/// The guest's own exported `memory` wins over the host-provided fallback, since modules built
/// without `--importMemory` never see the fallback.
struct GuestCall<'a, T> {
    caller: Caller<'a, T>,
    memory: Memory,
}

impl<'a, T> GuestCall<'a, T> {
    fn new(caller: Caller<'a, T>, fallback: Memory) -> Self {
        let memory =
            caller.get_export(MEMORY_EXPORT).and_then(Extern::into_memory).unwrap_or(fallback);
        Self { caller, memory }
    }

    /// The host state behind the store.
    fn host(&mut self) -> &mut T {
        self.caller.data_mut()
    }

    /// Decodes a string argument.
    fn string(&self, ptr: i32) -> Result<String> {
        ptr_to_string(self, ptr as u32)
    }

    /// Decodes a string argument where the empty string or null means "omitted".
    fn opt_string(&self, ptr: i32) -> Result<Option<String>> {
        Ok(ptr_to_opt_string(self, ptr as u32)?.filter(|s| !s.is_empty()))
    }

    /// Decodes an abort argument, rendering null as `<unknown>`.
    fn located(&self, ptr: i32) -> Result<String> {
        Ok(ptr_to_opt_string(self, ptr as u32)?.unwrap_or_else(|| UNKNOWN_LOCATION.to_string()))
    }

    /// Decodes a buffer argument.
    fn bytes(&self, ptr: i32) -> Result<Vec<u8>> {
        ptr_to_bytes(self, ptr as u32)
    }

    /// Encodes a string result.
    fn new_string(&mut self, value: &str) -> Result<i32> {
        new_string(self, value).map(|ptr| ptr as i32)
    }

    /// Encodes a buffer result.
    fn new_bytes(&mut self, value: &[u8]) -> Result<i32> {
        new_bytes(self, value).map(|ptr| ptr as i32)
    }
}

impl<T> GuestHeap for GuestCall<'_, T> {
    fn memory(&self) -> &[u8] {
        self.memory.data(&self.caller)
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        self.memory.data_mut(&mut self.caller)
    }

    fn allocate(&mut self, size: u32, class_id: u32) -> Result<u32> {
        let allocator = self
            .caller
            .get_export(ALLOCATOR_EXPORT)
            .and_then(Extern::into_func)
            .ok_or_else(|| SandboxError::corrupt(0, "guest does not export `__new`"))?
            .typed::<(i32, i32), i32>(&self.caller)
            .map_err(|e| SandboxError::corrupt(0, format!("`__new` has the wrong type: {e}")))?;
        let ptr = allocator
            .call(&mut self.caller, (size as i32, class_id as i32))
            .map_err(crate::from_guest_error)?;
        Ok(ptr as u32)
    }
}

/// Runs one import body and turns its error into a guest trap carrying the [`SandboxError`].
fn dispatch<T, R>(
    caller: Caller<'_, T>,
    memory: Memory,
    import: &'static str,
    body: impl FnOnce(&mut GuestCall<'_, T>) -> Result<R>,
) -> Result<R, wasmi::Error> {
    trace!(import, "Host call");
    let mut call = GuestCall::new(caller, memory);
    body(&mut call).map_err(|err| {
        trace!(import, kind = err.kind(), %err, "Host call failed");
        wasmi::Error::host(err)
    })
}

fn link_error(err: impl std::fmt::Display) -> SandboxError {
    SandboxError::Instantiate(err.to_string())
}

fn flag(value: bool) -> i32 {
    i32::from(value)
}

/// Registers the fixed linear memory and every sandbox import in `linker`.
///
/// Sandbox imports are registered under `config.import_module` with `config.import_prefix`
/// prepended to their names; `abort`, `seed` and `trace` are registered under `env`. Pointers
/// travel as `i32`, coin amounts and other 64-bit values as `i64`, booleans as `i32`.
pub fn register<T: HostImports + 'static>(
    linker: &mut Linker<T>,
    memory: Memory,
    config: &SandboxConfig,
) -> Result<()> {
    let module = config.import_module.as_str();

    macro_rules! import {
        ($name:literal, |$call:ident $(, $arg:ident : $ty:ty)*| -> $ret:ty $body:block) => {
            linker
                .func_wrap(
                    module,
                    &config.import_name($name),
                    move |caller: Caller<'_, T>, $($arg: $ty),*| -> Result<$ret, wasmi::Error> {
                        dispatch(caller, memory, $name, |$call: &mut GuestCall<'_, T>| -> Result<$ret> { $body })
                    },
                )
                .map_err(link_error)?;
        };
    }

    linker.define(ENV_MODULE, MEMORY_EXPORT, memory).map_err(link_error)?;

    // Storage
    import!("get_data", |call, key: i32| -> i32 {
        let key = call.bytes(key)?;
        let value = call.host().get_data(&key)?;
        call.new_bytes(&value)
    });
    import!("get_data_for", |call, address: i32, key: i32| -> i32 {
        let (address, key) = (call.string(address)?, call.bytes(key)?);
        let value = call.host().get_data_for(&address, &key)?;
        call.new_bytes(&value)
    });
    import!("set_data", |call, key: i32, value: i32| -> () {
        let (key, value) = (call.bytes(key)?, call.bytes(value)?);
        call.host().set_data(&key, &value)
    });
    import!("set_data_for", |call, address: i32, key: i32, value: i32| -> () {
        let (address, key, value) = (call.string(address)?, call.bytes(key)?, call.bytes(value)?);
        call.host().set_data_for(&address, &key, &value)
    });
    import!("has_data", |call, key: i32| -> i32 {
        let key = call.bytes(key)?;
        call.host().has_data(&key).map(flag)
    });
    import!("has_data_for", |call, address: i32, key: i32| -> i32 {
        let (address, key) = (call.string(address)?, call.bytes(key)?);
        call.host().has_data_for(&address, &key).map(flag)
    });
    import!("delete_data", |call, key: i32| -> () {
        let key = call.bytes(key)?;
        call.host().delete_data(&key)
    });
    import!("delete_data_for", |call, address: i32, key: i32| -> () {
        let (address, key) = (call.string(address)?, call.bytes(key)?);
        call.host().delete_data_for(&address, &key)
    });
    import!("append_data", |call, key: i32, suffix: i32| -> () {
        let (key, suffix) = (call.bytes(key)?, call.bytes(suffix)?);
        call.host().append_data(&key, &suffix)
    });
    import!("append_data_for", |call, address: i32, key: i32, suffix: i32| -> () {
        let (address, key, suffix) = (call.string(address)?, call.bytes(key)?, call.bytes(suffix)?);
        call.host().append_data_for(&address, &key, &suffix)
    });
    import!("get_keys", |call, prefix: i32| -> i32 {
        let prefix = call.bytes(prefix)?;
        let keys = call.host().get_keys(&prefix)?;
        call.new_bytes(&encode_key_list(&keys)?)
    });
    import!("get_keys_for", |call, address: i32, prefix: i32| -> i32 {
        let (address, prefix) = (call.string(address)?, call.bytes(prefix)?);
        let keys = call.host().get_keys_for(&address, &prefix)?;
        call.new_bytes(&encode_key_list(&keys)?)
    });

    // Coins
    import!("get_balance", |call| -> i64 { call.host().get_balance().map(|b| b as i64) });
    import!("get_balance_for", |call, address: i32| -> i64 {
        let address = call.string(address)?;
        call.host().get_balance_for(&address).map(|b| b as i64)
    });
    import!("transfer_coins", |call, to: i32, amount: i64| -> () {
        let to = call.string(to)?;
        call.host().transfer_coins(&to, amount as u64)
    });
    import!("transfer_coins_for", |call, from: i32, to: i32, amount: i64| -> () {
        let (from, to) = (call.string(from)?, call.string(to)?);
        call.host().transfer_coins_for(&from, &to, amount as u64)
    });
    import!("get_call_coins", |call| -> i64 { call.host().get_call_coins().map(|c| c as i64) });

    // Bytecode
    import!("get_bytecode", |call| -> i32 {
        let bytecode = call.host().get_bytecode()?;
        call.new_bytes(&bytecode)
    });
    import!("get_bytecode_for", |call, address: i32| -> i32 {
        let address = call.string(address)?;
        let bytecode = call.host().get_bytecode_for(&address)?;
        call.new_bytes(&bytecode)
    });
    import!("set_bytecode", |call, bytecode: i32| -> () {
        let bytecode = call.bytes(bytecode)?;
        call.host().set_bytecode(&bytecode)
    });
    import!("set_bytecode_for", |call, address: i32, bytecode: i32| -> () {
        let (address, bytecode) = (call.string(address)?, call.bytes(bytecode)?);
        call.host().set_bytecode_for(&address, &bytecode)
    });
    import!("create_sc", |call, bytecode: i32| -> i32 {
        let bytecode = call.bytes(bytecode)?;
        let address = call.host().create_sc(&bytecode)?;
        call.new_string(&address)
    });
    import!("function_exists", |call, address: i32, function: i32| -> i32 {
        let (address, function) = (call.string(address)?, call.string(function)?);
        call.host().function_exists(&address, &function).map(flag)
    });

    // Context
    import!("get_call_stack", |call| -> i32 {
        let stack = call.host().get_call_stack()?;
        call.new_string(&encode_call_stack(&stack))
    });
    import!("caller_has_write_access", |call| -> i32 {
        call.host().caller_has_write_access().map(flag)
    });
    import!("get_chain_id", |call| -> i64 { call.host().get_chain_id().map(|id| id as i64) });
    import!("get_time", |call| -> i64 { call.host().get_time().map(|t| t as i64) });
    import!("unsafe_random", |call| -> i64 { call.host().unsafe_random() });

    // Crypto
    import!("hash_sha256", |call, data: i32| -> i32 {
        let data = call.bytes(data)?;
        let digest = call.host().hash_sha256(&data)?;
        call.new_bytes(&digest)
    });
    import!("hash_keccak256", |call, data: i32| -> i32 {
        let data = call.bytes(data)?;
        let digest = call.host().hash_keccak256(&data)?;
        call.new_bytes(&digest)
    });
    import!("signature_verify", |call, data: i32, signature: i32, pubkey: i32| -> i32 {
        let (data, signature, pubkey) = (call.bytes(data)?, call.bytes(signature)?, call.bytes(pubkey)?);
        call.host().signature_verify(&data, &signature, &pubkey).map(flag)
    });
    import!("evm_signature_verify", |call, digest: i32, signature: i32, pubkey: i32| -> i32 {
        let (digest, signature, pubkey) =
            (call.bytes(digest)?, call.bytes(signature)?, call.bytes(pubkey)?);
        call.host().evm_signature_verify(&digest, &signature, &pubkey).map(flag)
    });
    import!("evm_get_address_from_pubkey", |call, pubkey: i32| -> i32 {
        let pubkey = call.bytes(pubkey)?;
        let address = call.host().evm_get_address_from_pubkey(&pubkey)?;
        call.new_bytes(&address)
    });
    import!("evm_get_pubkey_from_signature", |call, digest: i32, signature: i32| -> i32 {
        let (digest, signature) = (call.bytes(digest)?, call.bytes(signature)?);
        let pubkey = call.host().evm_get_pubkey_from_signature(&digest, &signature)?;
        call.new_bytes(&pubkey)
    });

    // Cross-contract calls
    import!("call", |call, address: i32, function: i32, args: i32, coins: i64| -> i32 {
        let (address, function, args) =
            (call.string(address)?, call.string(function)?, call.bytes(args)?);
        let result = call.host().call(&address, &function, &args, coins as u64)?;
        call.new_bytes(&result)
    });
    import!("local_call", |call, address: i32, function: i32, args: i32| -> i32 {
        let (address, function, args) =
            (call.string(address)?, call.string(function)?, call.bytes(args)?);
        let result = call.host().local_call(&address, &function, &args)?;
        call.new_bytes(&result)
    });

    // Output
    import!("print", |call, message: i32| -> () {
        let message = call.string(message)?;
        call.host().print(&message)
    });
    import!("generate_event", |call, event: i32| -> () {
        let event = call.string(event)?;
        call.host().generate_event(&event)
    });

    // Mocks
    import!("mock_call", |call, payload: i32| -> () {
        let payload = call.bytes(payload)?;
        call.host().mock_call(&payload)
    });
    import!("set_deploy_context", |call, caller: i32| -> () {
        let caller = call.opt_string(caller)?;
        call.host().set_deploy_context(caller.as_deref())
    });
    import!("set_local_context", |call, address: i32| -> () {
        let address = call.opt_string(address)?;
        call.host().set_local_context(address.as_deref())
    });
    import!("set_call_stack", |call, stack: i32| -> () {
        let stack = decode_call_stack(&call.string(stack)?);
        call.host().set_call_stack(stack)
    });
    import!("mock_admin_context", |call, write_access: i32| -> () {
        call.host().mock_admin_context(write_access != 0)
    });
    import!("unmock_admin_context", |call| -> () { call.host().unmock_admin_context() });
    import!("mock_balance", |call, address: i32, amount: i64| -> () {
        let address = call.string(address)?;
        call.host().mock_balance(&address, amount as u64)
    });
    import!("mock_call_coins", |call, coins: i64| -> () {
        call.host().mock_call_coins(coins as u64)
    });
    import!("set_chain_id", |call, chain_id: i64| -> () {
        call.host().set_chain_id(chain_id as u64)
    });
    import!("reset_storage", |call| -> () { call.host().reset_storage() });

    register_env(linker, memory)
}

/// Registers the guest-runtime imports every AssemblyScript module expects from `env`.
fn register_env<T: HostImports + 'static>(linker: &mut Linker<T>, memory: Memory) -> Result<()> {
    linker
        .func_wrap(
            ENV_MODULE,
            "abort",
            move |caller: Caller<'_, T>,
                  message: i32,
                  file: i32,
                  line: i32,
                  column: i32|
                  -> Result<(), wasmi::Error> {
                dispatch(caller, memory, "abort", |call| {
                    let message = call.located(message)?;
                    let file = call.located(file)?;
                    call.host().abort(&message, &file, line as u32, column as u32)
                })
            },
        )
        .map_err(link_error)?;
    linker
        .func_wrap(ENV_MODULE, "seed", move |caller: Caller<'_, T>| -> Result<f64, wasmi::Error> {
            dispatch(caller, memory, "seed", |call| call.host().seed())
        })
        .map_err(link_error)?;
    linker
        .func_wrap(
            ENV_MODULE,
            "trace",
            move |caller: Caller<'_, T>,
                  message: i32,
                  n: i32,
                  a0: f64,
                  a1: f64,
                  a2: f64,
                  a3: f64,
                  a4: f64|
                  -> Result<(), wasmi::Error> {
                dispatch(caller, memory, "trace", |call| {
                    let message = call.opt_string(message)?.unwrap_or_default();
                    let args = [a0, a1, a2, a3, a4];
                    let count = (n.max(0) as usize).min(args.len());
                    call.host().trace(&message, &args[..count])
                })
            },
        )
        .map_err(link_error)?;
    Ok(())
}

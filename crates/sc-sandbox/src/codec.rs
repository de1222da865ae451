//! Wire formats exchanged with the guest at the import boundary.
//!
//! Internally keys and call stacks are structured values; they are flattened here only because
//! existing guest binaries expect these exact layouts.

use crate::{constants::ledger::MAX_KEY_LEN, Result, SandboxError};

/// Serializes a key list: a `u32` little-endian count, then per key a one-byte length followed by
/// the raw key bytes.
pub fn encode_key_list<K: AsRef<[u8]>>(keys: &[K]) -> Result<Vec<u8>> {
    let payload: usize = keys.iter().map(|k| 1 + k.as_ref().len()).sum();
    let mut out = Vec::with_capacity(4 + payload);
    out.extend_from_slice(&(keys.len() as u32).to_le_bytes());
    for key in keys {
        let key = key.as_ref();
        if key.len() > MAX_KEY_LEN {
            return Err(SandboxError::KeyTooLong(key.len()));
        }
        out.push(key.len() as u8);
        out.extend_from_slice(key);
    }
    Ok(out)
}

/// Parses a key list produced by [`encode_key_list`]. Returns `None` on truncated input.
pub fn decode_key_list(mut data: &[u8]) -> Option<Vec<Vec<u8>>> {
    let (count, rest) = data.split_first_chunk::<4>()?;
    data = rest;
    let count = u32::from_le_bytes(*count);
    // Each key takes at least its length byte.
    let mut keys = Vec::with_capacity((count as usize).min(data.len()));
    for _ in 0..count {
        let (&len, rest) = data.split_first()?;
        let key = rest.get(..len as usize)?;
        keys.push(key.to_vec());
        data = &rest[len as usize..];
    }
    data.is_empty().then_some(keys)
}

/// Renders a call stack as `[ A , B , C ]`.
pub fn encode_call_stack<S: AsRef<str>>(stack: &[S]) -> String {
    let joined = stack.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(" , ");
    format!("[ {joined} ]")
}

/// Parses a call stack rendered by [`encode_call_stack`].
///
/// Brackets are optional, tokens are trimmed and empty tokens skipped, so `"A,B"` parses too.
pub fn decode_call_stack(text: &str) -> Vec<String> {
    let text = text.trim();
    let text = text.strip_prefix('[').unwrap_or(text);
    let text = text.strip_suffix(']').unwrap_or(text);
    text.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}

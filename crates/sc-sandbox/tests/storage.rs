//! Storage imports driven from a guest module.

use sc_sandbox::{
    codec::decode_key_list,
    constants::ledger::{DEFAULT_CALLEE, DEFAULT_CALLER},
    test_utils::GuestFixture,
    CommandCompiler, RunOutcome, Runner, SandboxConfig, SandboxError,
};

fn run(wasm: &[u8]) -> Result<RunOutcome, SandboxError> {
    Runner::new(SandboxConfig::default(), CommandCompiler::default()).run(wasm)
}

fn storage_fixture() -> GuestFixture {
    GuestFixture::new()
        .import("set_data", "i32 i32", "")
        .import("get_data", "i32", "i32")
        .import("has_data", "i32", "i32")
        .import("delete_data", "i32", "")
        .import("append_data", "i32 i32", "")
        .import("get_keys", "i32", "i32")
        .import("set_data_for", "i32 i32 i32", "")
        .import("get_data_for", "i32 i32", "i32")
}

#[test]
fn test_set_then_get_through_guest_allocator() {
    let mut fixture = storage_fixture();
    let key = fixture.bytes(b"counter");
    let value = fixture.bytes(b"42");
    let copy = fixture.bytes(b"copy");
    let wasm = fixture
        .start(&format!(
            "(call $set_data (i32.const {key}) (i32.const {value}))
             (call $set_data (i32.const {copy}) (call $get_data (i32.const {key})))"
        ))
        .build();

    let outcome = run(&wasm).unwrap();
    let ledger = outcome.sandbox.ledger();
    assert_eq!(ledger.get(DEFAULT_CALLEE, b"counter").unwrap(), b"42");
    assert_eq!(ledger.get(DEFAULT_CALLEE, b"copy").unwrap(), b"42");
    assert!(!ledger.has(DEFAULT_CALLER, b"counter"));
}

#[test]
fn test_has_set_has_delete_get() {
    let mut fixture = storage_fixture();
    let key = fixture.bytes(b"k");
    let value = fixture.bytes(b"v");
    let wasm = fixture
        .start(&format!(
            "(if (call $has_data (i32.const {key})) (then unreachable))
             (call $set_data (i32.const {key}) (i32.const {value}))
             (if (i32.eqz (call $has_data (i32.const {key}))) (then unreachable))
             (call $delete_data (i32.const {key}))
             (drop (call $get_data (i32.const {key})))"
        ))
        .build();

    assert_eq!(
        run(&wasm).unwrap_err(),
        SandboxError::KeyNotFound { address: DEFAULT_CALLEE.into(), key: b"k".to_vec() }
    );
}

#[test]
fn test_append_requires_existing_value() {
    let mut fixture = storage_fixture();
    let key = fixture.bytes(b"log");
    let head = fixture.bytes(b"ab");
    let tail = fixture.bytes(b"cd");
    let wasm = fixture
        .clone()
        .start(&format!(
            "(call $set_data (i32.const {key}) (i32.const {head}))
             (call $append_data (i32.const {key}) (i32.const {tail}))"
        ))
        .build();
    let outcome = run(&wasm).unwrap();
    assert_eq!(outcome.sandbox.ledger().get(DEFAULT_CALLEE, b"log").unwrap(), b"abcd");

    let wasm = fixture
        .start(&format!("(call $append_data (i32.const {key}) (i32.const {tail}))"))
        .build();
    assert!(matches!(run(&wasm), Err(SandboxError::KeyNotFound { .. })));
}

#[test]
fn test_get_keys_wire_format() {
    let mut fixture = storage_fixture();
    let alpha = fixture.bytes(b"user:alice");
    let beta = fixture.bytes(b"user:bob");
    let other = fixture.bytes(b"total");
    let prefix = fixture.bytes(b"user:");
    let out = fixture.bytes(b"keys");
    let wasm = fixture
        .start(&format!(
            "(call $set_data (i32.const {alpha}) (i32.const {other}))
             (call $set_data (i32.const {beta}) (i32.const {other}))
             (call $set_data (i32.const {other}) (i32.const {other}))
             (call $set_data (i32.const {out}) (call $get_keys (i32.const {prefix})))"
        ))
        .build();

    let outcome = run(&wasm).unwrap();
    let encoded = outcome.sandbox.ledger().get(DEFAULT_CALLEE, b"keys").unwrap();
    assert_eq!(&encoded[..4], &2u32.to_le_bytes());
    let mut keys = decode_key_list(encoded).unwrap();
    keys.sort();
    assert_eq!(keys, vec![b"user:alice".to_vec(), b"user:bob".to_vec()]);
}

#[test]
fn test_cross_address_storage() {
    let mut fixture = storage_fixture();
    let target = fixture.string("AS1target");
    let key = fixture.bytes(b"owner");
    let value = fixture.bytes(b"me");
    let wasm = fixture
        .start(&format!(
            "(call $set_data_for (i32.const {target}) (i32.const {key}) (i32.const {value}))
             (call $set_data (i32.const {key})
               (call $get_data_for (i32.const {target}) (i32.const {key})))"
        ))
        .build();

    let outcome = run(&wasm).unwrap();
    let ledger = outcome.sandbox.ledger();
    assert_eq!(ledger.get("AS1target", b"owner").unwrap(), b"me");
    assert_eq!(ledger.get(DEFAULT_CALLEE, b"owner").unwrap(), b"me");
}

#[test]
fn test_read_from_unknown_address() {
    let mut fixture = storage_fixture();
    let target = fixture.string("AS1nobody");
    let key = fixture.bytes(b"k");
    let wasm = fixture
        .start(&format!("(drop (call $get_data_for (i32.const {target}) (i32.const {key})))"))
        .build();
    assert_eq!(run(&wasm).unwrap_err(), SandboxError::UnknownAddress("AS1nobody".into()));
}

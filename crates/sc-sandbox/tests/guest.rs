//! Guest runtime behavior: aborts, traps, memory handling and instantiation failures.

use rstest::rstest;
use sc_sandbox::{
    constants::ledger::DEFAULT_CALLEE, test_utils::GuestFixture, CommandCompiler, GeneratedEvent,
    RunOutcome, Runner, SandboxConfig, SandboxError,
};

fn run(wasm: &[u8]) -> Result<RunOutcome, SandboxError> {
    Runner::new(SandboxConfig::default(), CommandCompiler::default()).run(wasm)
}

#[test]
fn test_abort_surfaces_location() {
    let mut fixture = GuestFixture::new();
    let message = fixture.string("Not enough allowance");
    let file = fixture.string("assembly/__tests__/token.spec.ts");
    let wasm = fixture
        .start(&format!(
            "(call $abort (i32.const {message}) (i32.const {file}) (i32.const 42) (i32.const 7))"
        ))
        .build();

    let err = run(&wasm).unwrap_err();
    assert_eq!(
        err.to_string(),
        "abort: Not enough allowance at assembly/__tests__/token.spec.ts:42:7"
    );
    assert_eq!(err.kind(), "guest-abort");
}

#[test]
fn test_abort_with_null_pointers() {
    let wasm = GuestFixture::new()
        .start("(call $abort (i32.const 0) (i32.const 0) (i32.const 1) (i32.const 2))")
        .build();
    assert_eq!(
        run(&wasm).unwrap_err(),
        SandboxError::Abort {
            message: "<unknown>".into(),
            file: "<unknown>".into(),
            line: 1,
            column: 2,
        }
    );
}

#[test]
fn test_abort_in_start_function() {
    let mut fixture = GuestFixture::new();
    let message = fixture.string("init failed");
    let wasm = fixture
        .func(&format!(
            "(func $init (call $abort (i32.const {message}) (i32.const 0) (i32.const 3) (i32.const 1)))"
        ))
        .func("(start $init)")
        .start("")
        .build();
    assert!(matches!(run(&wasm), Err(SandboxError::Abort { line: 3, .. })));
}

#[rstest]
#[case::below_header(2)]
#[case::past_end(100_000)]
fn test_bad_pointer_is_corrupt_memory(#[case] ptr: u32) {
    let wasm = GuestFixture::new()
        .import("print", "i32", "")
        .start(&format!("(call $print (i32.const {ptr}))"))
        .build();

    let err = run(&wasm).unwrap_err();
    assert!(matches!(err, SandboxError::CorruptMemory { .. }), "{err}");
    assert_eq!(err.kind(), "corrupt-memory");
}

#[rstest]
#[case::past_end("(i32.const 100000)")]
#[case::wrapping("(i32.const -2)")]
fn test_allocation_outside_memory_is_corrupt_memory(#[case] body: &str) {
    let mut fixture = GuestFixture::new().allocator(body).import("hash_sha256", "i32", "i32");
    let data = fixture.bytes(b"abc");
    let wasm = fixture.start(&format!("(drop (call $hash_sha256 (i32.const {data})))")).build();

    let err = run(&wasm).unwrap_err();
    assert!(matches!(err, SandboxError::CorruptMemory { .. }), "{err}");
}

#[test]
fn test_malformed_public_key_is_an_error() {
    let mut fixture = GuestFixture::new().import("evm_get_address_from_pubkey", "i32", "i32");
    let pubkey = fixture.bytes(&[1, 2, 3]);
    let wasm = fixture
        .start(&format!("(drop (call $evm_get_address_from_pubkey (i32.const {pubkey})))"))
        .build();

    let err = run(&wasm).unwrap_err();
    assert_eq!(err, SandboxError::InvalidPublicKey(3));
    assert_eq!(err.kind(), "domain");
}

#[test]
fn test_unrecoverable_signature_is_an_error() {
    let mut fixture =
        GuestFixture::new().import("evm_get_pubkey_from_signature", "i32 i32", "i32");
    let digest = fixture.bytes(&[0; 5]);
    let signature = fixture.bytes(&[0; 7]);
    let wasm = fixture
        .start(&format!(
            "(drop (call $evm_get_pubkey_from_signature (i32.const {digest}) (i32.const {signature})))"
        ))
        .build();

    assert_eq!(
        run(&wasm).unwrap_err(),
        SandboxError::SignatureRecovery { signature_len: 7, digest_len: 5 }
    );
}

#[test]
fn test_guest_trap() {
    let wasm = GuestFixture::new().start("unreachable").build();
    let err = run(&wasm).unwrap_err();
    assert!(matches!(err, SandboxError::GuestTrap(_)));
    assert_eq!(err.kind(), "guest-trap");
}

#[test]
fn test_imported_memory_is_used_when_not_exported() {
    let mut fixture = GuestFixture::new()
        .importing_memory()
        .import("print", "i32", "")
        .import("set_data", "i32 i32", "")
        .import("hash_sha256", "i32", "i32");
    let line = fixture.string("hello from env.memory");
    let key = fixture.bytes(b"digest");
    let data = fixture.bytes(b"abc");
    let wasm = fixture
        .start(&format!(
            "(call $print (i32.const {line}))
             (call $set_data (i32.const {key}) (call $hash_sha256 (i32.const {data})))"
        ))
        .build();

    let outcome = run(&wasm).unwrap();
    assert_eq!(outcome.printed, vec!["hello from env.memory".to_string()]);
    assert_eq!(
        hex::encode(outcome.sandbox.ledger().get(DEFAULT_CALLEE, b"digest").unwrap()),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[test]
fn test_prints_and_events_are_reported() {
    let mut fixture = GuestFixture::new()
        .import("print", "i32", "")
        .import("generate_event", "i32", "");
    let line = fixture.string("héllo 🦀");
    let event = fixture.string("TRANSFER:1");
    let wasm = fixture
        .start(&format!(
            "(call $print (i32.const {line}))
             (call $generate_event (i32.const {event}))"
        ))
        .build();

    let outcome = run(&wasm).unwrap();
    assert_eq!(outcome.printed, vec!["héllo 🦀".to_string()]);
    assert_eq!(
        outcome.events,
        vec![GeneratedEvent { emitter: DEFAULT_CALLEE.into(), data: "TRANSFER:1".into() }]
    );
}

#[test]
fn test_env_runtime_imports() {
    let mut fixture = GuestFixture::new()
        .env_import("seed", "", "f64")
        .env_import("trace", "i32 i32 f64 f64 f64 f64 f64", "");
    let message = fixture.string("checkpoint");
    let wasm = fixture
        .start(&format!(
            "(drop (call $seed))
             (call $trace (i32.const {message}) (i32.const 2)
               (f64.const 1) (f64.const 2) (f64.const 0) (f64.const 0) (f64.const 0))"
        ))
        .build();
    run(&wasm).unwrap();
}

#[test]
fn test_missing_entry() {
    let wasm = GuestFixture::new().build();
    assert!(matches!(run(&wasm), Err(SandboxError::Instantiate(msg)) if msg.contains("_start")));
}

#[test]
fn test_invalid_binary() {
    assert!(matches!(run(b"not a module"), Err(SandboxError::Instantiate(_))));
}

#[test]
fn test_unknown_import_fails_to_link() {
    let wasm = GuestFixture::new().import("no_such_import", "", "").start("").build();
    let err = run(&wasm).unwrap_err();
    assert!(matches!(err, SandboxError::Instantiate(_)));
    assert_eq!(err.kind(), "load");
}

use std::fmt::Write as _;

use crate::constants::{
    imports::{DEFAULT_MODULE, DEFAULT_PREFIX, ENV_MODULE},
    memory::HEADER_OFFSET,
};

/// Start of the static data area of a [`GuestFixture`].
const STATIC_BASE: u32 = 1024;
/// Start of the region handed out by the fixture's `__new`.
const HEAP_BASE: u32 = 32 * 1024;

/// Builder for hand-written guest modules laid out the way the AssemblyScript runtime lays out
/// its heap.
///
/// The module always carries an `env.abort` import and a bump allocator exported as `__new`.
/// Static strings and buffers are placed in data segments with their length header, so their
/// pointers can be passed straight to sandbox imports.
#[derive(Debug, Clone)]
pub struct GuestFixture {
    imports: Vec<String>,
    data: Vec<String>,
    funcs: Vec<String>,
    next_static: u32,
    import_memory: bool,
    allocator: Option<String>,
}

impl Default for GuestFixture {
    fn default() -> Self {
        Self {
            imports: Vec::new(),
            data: Vec::new(),
            funcs: Vec::new(),
            next_static: STATIC_BASE,
            import_memory: false,
            allocator: None,
        }
    }
}

impl GuestFixture {
    /// Creates a fixture exporting its own memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the host-provided `env.memory` instead of exporting a memory.
    pub fn importing_memory(mut self) -> Self {
        self.import_memory = true;
        self
    }

    /// Replaces the body of the exported `__new(size, id)` with `body`.
    pub fn allocator(mut self, body: &str) -> Self {
        self.allocator = Some(body.to_string());
        self
    }

    /// Imports the sandbox function `name` as `$name`.
    ///
    /// `params` and `result` are space-separated wasm value types, empty for none.
    pub fn import(mut self, name: &str, params: &str, result: &str) -> Self {
        let mut import = format!(
            r#"(import "{DEFAULT_MODULE}" "{DEFAULT_PREFIX}{name}" (func ${name}"#
        );
        push_signature(&mut import, params, result);
        import.push_str("))");
        self.imports.push(import);
        self
    }

    /// Imports the guest runtime function `name` from `env` as `$name`.
    pub fn env_import(mut self, name: &str, params: &str, result: &str) -> Self {
        let mut import = format!(r#"(import "{ENV_MODULE}" "{name}" (func ${name}"#);
        push_signature(&mut import, params, result);
        import.push_str("))");
        self.imports.push(import);
        self
    }

    /// Places a static string and returns its pointer.
    pub fn string(&mut self, value: &str) -> u32 {
        let payload: Vec<u8> = value.encode_utf16().flat_map(u16::to_le_bytes).collect();
        self.object(&payload)
    }

    /// Places a static buffer and returns its pointer.
    pub fn bytes(&mut self, value: &[u8]) -> u32 {
        self.object(value)
    }

    /// Adds a function definition, written in the text format.
    pub fn func(mut self, func: &str) -> Self {
        self.funcs.push(func.to_string());
        self
    }

    /// Adds an exported `_start` with the given body.
    pub fn start(self, body: &str) -> Self {
        self.func(&format!(r#"(func (export "_start") {body})"#))
    }

    /// The module in the text format.
    pub fn to_wat(&self) -> String {
        let mut wat = String::from("(module\n");
        wat.push_str(r#"  (import "env" "abort" (func $abort (param i32 i32 i32 i32)))"#);
        wat.push('\n');
        for import in &self.imports {
            let _ = writeln!(wat, "  {import}");
        }
        if self.import_memory {
            wat.push_str(r#"  (import "env" "memory" (memory 1))"#);
        } else {
            wat.push_str(r#"  (memory (export "memory") 1)"#);
        }
        wat.push('\n');
        let _ = writeln!(wat, "  (global $heap (mut i32) (i32.const {HEAP_BASE}))");
        wat.push_str(r#"  (func $__new (export "__new") (param $size i32) (param $id i32) (result i32)"#);
        match &self.allocator {
            Some(body) => {
                let _ = writeln!(wat, " {body})");
            }
            None => wat.push_str(
                r#"
    (local $ptr i32)
    (local.set $ptr
      (i32.and (i32.add (global.get $heap) (i32.const 19)) (i32.const -16)))
    (global.set $heap (i32.add (local.get $ptr) (local.get $size)))
    (local.get $ptr))
"#,
            ),
        }
        for data in &self.data {
            let _ = writeln!(wat, "  {data}");
        }
        for func in &self.funcs {
            let _ = writeln!(wat, "  {func}");
        }
        wat.push(')');
        wat
    }

    /// The module in the binary format.
    pub fn build(&self) -> Vec<u8> {
        wat::parse_str(self.to_wat()).unwrap()
    }

    fn object(&mut self, payload: &[u8]) -> u32 {
        let start = self.next_static;
        let ptr = start + HEADER_OFFSET;
        let mut segment = format!("(data (i32.const {start}) \"");
        let len = payload.len() as u32;
        for byte in len.to_le_bytes().iter().chain(payload) {
            let _ = write!(segment, "\\{byte:02x}");
        }
        segment.push_str("\")");
        self.data.push(segment);
        self.next_static = (ptr + len + 15) & !15;
        ptr
    }
}

fn push_signature(out: &mut String, params: &str, result: &str) {
    if !params.is_empty() {
        let _ = write!(out, " (param {params})");
    }
    if !result.is_empty() {
        let _ = write!(out, " (result {result})");
    }
}

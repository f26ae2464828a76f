use std::fmt::Write;

/// Static regions live below this address, the bump allocator hands out memory above it.
const HEAP_START: u32 = 65_536;
const STATIC_START: u32 = 1_024;
const MEMORY_PAGES: u32 = 32;

const IMPORTS: &str = r#"
  (import "env" "db_read" (func $db_read (param i32) (result i32)))
  (import "env" "db_write" (func $db_write (param i32 i32)))
  (import "env" "db_remove" (func $db_remove (param i32)))
  (import "env" "db_scan" (func $db_scan (param i32 i32 i32) (result i32)))
  (import "env" "db_next" (func $db_next (param i32) (result i32)))
  (import "env" "addr_humanize" (func $addr_humanize (param i32 i32) (result i32)))
  (import "env" "addr_canonicalize" (func $addr_canonicalize (param i32 i32) (result i32)))
  (import "env" "addr_validate" (func $addr_validate (param i32) (result i32)))
  (import "env" "secp256k1_verify" (func $secp256k1_verify (param i32 i32 i32) (result i32)))
  (import "env" "secp256k1_recover_pubkey" (func $secp256k1_recover_pubkey (param i32 i32 i32) (result i64)))
  (import "env" "ed25519_verify" (func $ed25519_verify (param i32 i32 i32) (result i32)))
  (import "env" "ed25519_batch_verify" (func $ed25519_batch_verify (param i32 i32 i32) (result i32)))
  (import "env" "debug" (func $debug (param i32)))
  (import "env" "query_chain" (func $query_chain (param i32) (result i32)))
  (import "env" "abort" (func $abort (param i32)))
"#;

// Region descriptors are 12 bytes: offset, capacity, length. Data follows the descriptor.
const ALLOCATOR: &str = r#"
  (global $heap (mut i32) (i32.const HEAP_START))

  (func $allocate (export "allocate") (param $size i32) (result i32)
    (local $region i32)
    (local.set $region (global.get $heap))
    (i32.store (local.get $region) (i32.add (local.get $region) (i32.const 12)))
    (i32.store offset=4 (local.get $region) (local.get $size))
    (i32.store offset=8 (local.get $region) (i32.const 0))
    (global.set $heap (i32.add (i32.add (local.get $region) (i32.const 12)) (local.get $size)))
    (local.get $region))
"#;

const DEALLOCATOR: &str = r#"
  (func (export "deallocate") (param $region i32))
"#;

const HELPERS: &str = r#"
  ;; region holding a little endian u32
  (func $u32_region (param $value i32) (result i32)
    (local $region i32)
    (local.set $region (call $allocate (i32.const 4)))
    (i32.store (i32.load (local.get $region)) (local.get $value))
    (i32.store offset=8 (local.get $region) (i32.const 4))
    (local.get $region))

  ;; region of $len zero bytes, allocated from fresh memory
  (func $zeroed_region (param $len i32) (result i32)
    (local $region i32)
    (local.set $region (call $allocate (local.get $len)))
    (i32.store offset=8 (local.get $region) (local.get $len))
    (local.get $region))
"#;

/// GuestBuilder assembles a contract module in WAT: the full import table, a bump allocator, static
/// regions and the entry points under test.
pub struct GuestBuilder {
    statics: Vec<(u32, Vec<u8>)>,
    next_static: u32,
    functions: Vec<String>,
    with_deallocate: bool,
}

impl GuestBuilder {
    pub fn new() -> Self {
        Self {
            statics: Vec::new(),
            next_static: STATIC_START,
            functions: Vec::new(),
            with_deallocate: true,
        }
    }

    /// Places `data` in a static region and returns the region pointer.
    pub fn region(&mut self, data: &[u8]) -> u32 {
        self.region_with_capacity(data, data.len() as u32)
    }

    /// An empty static region with room for `capacity` bytes.
    pub fn empty_region(&mut self, capacity: u32) -> u32 {
        self.region_with_capacity(&[], capacity)
    }

    fn region_with_capacity(&mut self, data: &[u8], capacity: u32) -> u32 {
        let ptr = self.next_static;
        let offset = ptr + 12;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&offset.to_le_bytes());
        bytes.extend_from_slice(&capacity.to_le_bytes());
        bytes.extend_from_slice(&(data.len() as u32).to_le_bytes());
        bytes.extend_from_slice(data);
        self.statics.push((ptr, bytes));
        // keep descriptors 4-byte aligned
        self.next_static = (offset + capacity + 3) & !3;
        assert!(self.next_static < HEAP_START, "static regions overflow into the heap");
        ptr
    }

    /// Adds a function, usually an exported entry point.
    pub fn function(mut self, wat: impl Into<String>) -> Self {
        self.functions.push(wat.into());
        self
    }

    pub fn without_deallocate(mut self) -> Self {
        self.with_deallocate = false;
        self
    }

    pub fn wat(&self) -> String {
        let mut wat = String::from("(module\n");
        wat.push_str(IMPORTS);
        writeln!(wat, "  (memory (export \"memory\") {MEMORY_PAGES})").unwrap();
        wat.push_str(&ALLOCATOR.replace("HEAP_START", &HEAP_START.to_string()));
        if self.with_deallocate {
            wat.push_str(DEALLOCATOR);
        }
        wat.push_str(HELPERS);
        for (ptr, bytes) in &self.statics {
            writeln!(wat, "  (data (i32.const {ptr}) \"{}\")", escape(bytes)).unwrap();
        }
        for function in &self.functions {
            wat.push_str(function);
            wat.push('\n');
        }
        wat.push(')');
        wat
    }

    pub fn build(&self) -> Vec<u8> {
        wat::parse_str(self.wat()).unwrap()
    }
}

fn escape(bytes: &[u8]) -> String {
    bytes.iter().fold(String::new(), |mut out, b| {
        write!(out, "\\{b:02x}").unwrap();
        out
    })
}

/// `execute` entry point returning the value of `body`, an i32 expression.
pub fn execute_returning(body: &str) -> String {
    format!(
        r#"  (func (export "execute") (param $env i32) (param $info i32) (param $msg i32) (result i32)
    {body})"#
    )
}

/// `query` entry point returning the value of `body`, an i32 expression.
pub fn query_returning(body: &str) -> String {
    format!(
        r#"  (func (export "query") (param $env i32) (param $msg i32) (result i32)
    {body})"#
    )
}

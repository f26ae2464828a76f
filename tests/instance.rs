use contract_vm::{
    backend::Storage,
    testing::{mock_backend, MockApi, MockQuerier, MockStorage},
    Backend, BackendError, Env, MessageInfo, Region, VmConfig, VmError, VmInstance, VmState,
};
use serde_json::json;

use crate::common::{
    execute_returning, init_logger, instance, instance_with, mock_env, mock_info, query_returning, GuestBuilder,
};

mod common;

/// A module exporting every entry point, each returning one of its arguments.
fn echo_guest() -> Vec<u8> {
    GuestBuilder::new()
        .function(
            r#"  (func (export "instantiate") (param $env i32) (param $info i32) (param $msg i32) (result i32)
    (local.get $info))"#,
        )
        .function(execute_returning("(local.get $env)"))
        .function(query_returning("(local.get $msg)"))
        .function(
            r#"  (func (export "migrate") (param $env i32) (param $msg i32) (result i32)
    (local.get $msg))"#,
        )
        .function(
            r#"  (func (export "reply") (param $env i32) (param $msg i32) (result i32)
    (local.get $env))"#,
        )
        .build()
}

#[test]
fn test_entry_point_arguments_are_json() {
    let mut vm = instance(&echo_guest());
    assert_eq!(vm.state(), VmState::Ready);

    let info = vm.instantiate(&mock_env(), &mock_info(), &json!({"count": 1})).unwrap();
    assert_eq!(vm.read_json::<MessageInfo>(&info).unwrap(), mock_info());

    let env = vm.execute(&mock_env(), &mock_info(), &json!({})).unwrap();
    assert_eq!(vm.read_json::<Env>(&env).unwrap(), mock_env());

    let msg = vm.query(&mock_env(), &json!({"balance": {"address": "cosmos1x"}})).unwrap();
    assert_eq!(
        vm.read_str(&msg).unwrap(),
        r#"{"balance":{"address":"cosmos1x"}}"#
    );

    let msg = vm.migrate(&mock_env(), &json!({"version": 2})).unwrap();
    assert_eq!(vm.read_json::<serde_json::Value>(&msg).unwrap(), json!({"version": 2}));

    let env = vm.reply(&mock_env(), &json!({"id": 7})).unwrap();
    assert_eq!(vm.read_json::<Env>(&env).unwrap(), mock_env());
}

#[test]
fn test_every_argument_gets_a_fresh_region() {
    let mut vm = instance(&echo_guest());
    let first = vm.query(&mock_env(), &json!("a")).unwrap();
    let second = vm.query(&mock_env(), &json!("a")).unwrap();
    assert_ne!(first.ptr, second.ptr);
    assert_eq!(vm.read_bytes(&first).unwrap(), vm.read_bytes(&second).unwrap());
}

#[test]
fn test_debug_messages() {
    let mut guest = GuestBuilder::new();
    let hello = guest.region(b"hello");
    let world = guest.region(b"world");
    let wasm = guest
        .function(format!(
            r#"  (func (export "instantiate") (param $env i32) (param $info i32) (param $msg i32) (result i32)
    (call $debug (i32.const {hello}))
    (call $debug (i32.const {world}))
    (i32.const 0))"#
        ))
        .build();

    let mut vm = instance(&wasm);
    let result = vm.instantiate(&mock_env(), &mock_info(), &json!({})).unwrap();
    assert_eq!(result, Region::null());
    assert_eq!(vm.debug_messages(), vec!["hello".to_string(), "world".to_string()]);

    vm.instantiate(&mock_env(), &mock_info(), &json!({})).unwrap();
    assert_eq!(vm.debug_messages().len(), 4);
    vm.clear_debug_messages();
    assert!(vm.debug_messages().is_empty());
}

#[test]
fn test_abort() {
    let mut guest = GuestBuilder::new();
    let message = guest.region(b"panicked at 'overflow'");
    let wasm = guest
        .function(query_returning(&format!(
            "(call $abort (i32.const {message})) (i32.const 0)"
        )))
        .function(execute_returning("(i32.const 0)"))
        .build();

    let mut vm = instance(&wasm);
    let result = vm.query(&mock_env(), &json!({}));
    match result {
        Err(VmError::GuestAbort(msg)) => assert_eq!(msg, "panicked at 'overflow'"),
        other => panic!("unexpected result {other:?}"),
    }

    // the instance survives the aborted call
    assert!(vm.execute(&mock_env(), &mock_info(), &json!({})).unwrap().is_null());
}

fn query_chain_guest() -> Vec<u8> {
    GuestBuilder::new()
        .function(
            r#"  (func (export "migrate") (param $env i32) (param $msg i32) (result i32)
    (call $query_chain (local.get $msg)))"#,
        )
        .build()
}

#[test]
fn test_query_chain() {
    let mut vm = instance(&query_chain_guest());
    let response = vm.migrate(&mock_env(), &json!({"bank": "supply"})).unwrap();
    assert_eq!(
        vm.read_json::<serde_json::Value>(&response).unwrap(),
        json!({"bank": "supply"})
    );

    let querier = MockQuerier::new(|request| Ok(format!("{} bytes", request.len()).into_bytes()));
    let backend = Backend::new(MockStorage::new(), MockApi::default(), querier);
    let mut vm = instance_with(&query_chain_guest(), backend, VmConfig::default());
    let response = vm.migrate(&mock_env(), &json!(1)).unwrap();
    assert_eq!(vm.read_str(&response).unwrap(), "1 bytes");

    let querier = MockQuerier::new(|_| Err(BackendError::unknown("chain unavailable")));
    let backend = Backend::new(MockStorage::new(), MockApi::default(), querier);
    let mut vm = instance_with(&query_chain_guest(), backend, VmConfig::default());
    assert!(matches!(
        vm.migrate(&mock_env(), &json!(1)),
        Err(VmError::Backend(BackendError::Unknown { .. }))
    ));
}

#[test]
fn test_state_machine() {
    init_logger();
    let mut vm = VmInstance::new(mock_backend(), VmConfig::default());
    assert_eq!(vm.state(), VmState::Uninitialized);
    assert!(matches!(
        vm.execute(&mock_env(), &mock_info(), &json!({})),
        Err(VmError::NotReady)
    ));

    vm.build(&echo_guest()).unwrap();
    assert_eq!(vm.state(), VmState::Ready);
    assert!(matches!(vm.build(&echo_guest()), Err(VmError::AlreadyBuilt)));
}

#[test]
fn test_missing_exports() {
    init_logger();
    let mut vm = VmInstance::new(mock_backend(), VmConfig::default());
    let without_deallocate = GuestBuilder::new()
        .without_deallocate()
        .function(execute_returning("(i32.const 0)"))
        .build();
    match vm.build(&without_deallocate) {
        Err(VmError::MissingExport(name)) => assert_eq!(name, "deallocate"),
        other => panic!("unexpected result {other:?}"),
    }
    assert_eq!(vm.state(), VmState::Built);
    assert!(matches!(vm.build(&echo_guest()), Err(VmError::AlreadyBuilt)));
    assert!(matches!(vm.query(&mock_env(), &json!({})), Err(VmError::NotReady)));

    // entry points are resolved on call
    let mut vm = instance(&GuestBuilder::new().function(execute_returning("(i32.const 0)")).build());
    assert!(vm.execute(&mock_env(), &mock_info(), &json!({})).is_ok());
    match vm.query(&mock_env(), &json!({})) {
        Err(VmError::MissingExport(name)) => assert_eq!(name, "query"),
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn test_invalid_bytecode() {
    init_logger();
    let mut vm = VmInstance::new(mock_backend(), VmConfig::default());
    assert!(matches!(vm.build(&[0x00, 0x61, 0x73, 0x6d, 0xff]), Err(VmError::Compile(_))));
    assert_eq!(vm.state(), VmState::Uninitialized);
}

#[test]
fn test_gas_exhaustion() {
    let wasm = GuestBuilder::new()
        .function(execute_returning("(loop $forever (br $forever)) (i32.const 0)"))
        .function(query_returning("(i32.const 0)"))
        .build();
    let mut vm = instance_with(&wasm, mock_backend(), VmConfig::default().with_gas_limit(100_000));
    assert_eq!(vm.remaining_gas(), Some(100_000));

    assert!(matches!(
        vm.execute(&mock_env(), &mock_info(), &json!({})),
        Err(VmError::GasExhausted)
    ));
    assert_eq!(vm.remaining_gas(), Some(0));

    vm.set_remaining_gas(50_000).unwrap();
    assert!(vm.query(&mock_env(), &json!({})).unwrap().is_null());
    let remaining = vm.remaining_gas().unwrap();
    assert!(remaining > 0 && remaining < 50_000);
}

#[test]
fn test_guest_trap() {
    let wasm = GuestBuilder::new()
        .function(execute_returning("(unreachable)"))
        .build();
    let mut vm = instance(&wasm);
    assert!(matches!(
        vm.execute(&mock_env(), &mock_info(), &json!({})),
        Err(VmError::Runtime(_))
    ));
}

#[test]
fn test_result_pointer_to_invalid_descriptor() {
    let mut guest = GuestBuilder::new();
    let key = guest.region(b"k");
    let value = guest.region(b"v");
    // 16 lies below every static region, its descriptor is all zeros
    let wasm = guest
        .function(execute_returning(&format!(
            "(call $db_write (i32.const {key}) (i32.const {value})) (i32.const 16)"
        )))
        .build();
    let mut vm = instance(&wasm);

    // the call completes and hands back the pointer, decoding it is what fails
    let result = vm.execute(&mock_env(), &mock_info(), &json!({})).unwrap();
    assert_eq!(result.ptr, 16);
    assert!(matches!(vm.read_bytes(&result), Err(VmError::Memory(_))));
    assert!(matches!(vm.read_json::<Env>(&result), Err(VmError::Memory(_))));
    assert_eq!(vm.backend().storage.get(b"k").unwrap(), Some(b"v".to_vec()));
}

#[test]
fn test_memory_helpers() {
    let vm = instance(&echo_guest());

    let text = vm.allocate_str("contract").unwrap();
    assert_eq!(text.capacity, 8);
    assert_eq!(vm.read_str(&text).unwrap(), "contract");
    assert_eq!(vm.region(text.ptr).unwrap(), text);

    let json = vm.allocate_json(&mock_info()).unwrap();
    assert_eq!(vm.read_json::<MessageInfo>(&json).unwrap(), mock_info());

    let mut region = vm.allocate(4).unwrap();
    assert_eq!(region.length, 0);
    assert!(matches!(vm.write_bytes(&mut region, b"too long"), Err(VmError::Memory(_))));
    vm.write_bytes(&mut region, b"four").unwrap();
    assert_eq!(vm.region(region.ptr).unwrap().length, 4);
    assert_eq!(vm.read_bytes(&region).unwrap(), b"four".to_vec());
    vm.deallocate(region).unwrap();

    let decoded = vm.allocate_b64("aGVsbG8gd29ybGQ=").unwrap();
    assert_eq!(decoded.capacity, 11);
    assert_eq!(vm.read_bytes(&decoded).unwrap(), b"hello world".to_vec());
    assert!(matches!(vm.allocate_b64("not base64!"), Err(VmError::Serialization(_))));

    assert!(vm.region(0).unwrap().is_null());
    assert!(matches!(
        vm.read_json::<MessageInfo>(&vm.allocate_str("not json").unwrap()),
        Err(VmError::Serialization(_))
    ));
}

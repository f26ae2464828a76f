#![allow(dead_code)]

pub mod guest;
pub use guest::*;

use contract_vm::{
    testing::{mock_backend, MockApi, MockQuerier, MockStorage},
    Backend, BlockInfo, Coin, ContractInfo, Env, MessageInfo, Region, Timestamp, TransactionInfo, VmConfig,
    VmInstance,
};

pub type MockInstance = VmInstance<MockStorage, MockApi, MockQuerier>;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn mock_env() -> Env {
    Env {
        block: BlockInfo {
            height: 12_345,
            time: Timestamp::from_nanos(1_571_797_419_879_305_533),
            chain_id: "cosmos-testnet-14002".to_string(),
        },
        transaction: Some(TransactionInfo { index: 3 }),
        contract: ContractInfo {
            address: MockApi::default().addr_make(b"contract").unwrap(),
        },
    }
}

pub fn mock_info() -> MessageInfo {
    MessageInfo {
        sender: MockApi::default().addr_make(b"creator").unwrap(),
        funds: vec![Coin::new(1_000, "uatom")],
    }
}

/// A Ready instance running `bytecode` against the mock backend.
pub fn instance(bytecode: &[u8]) -> MockInstance {
    instance_with(bytecode, mock_backend(), VmConfig::default())
}

pub fn instance_with(
    bytecode: &[u8],
    backend: Backend<MockStorage, MockApi, MockQuerier>,
    config: VmConfig,
) -> MockInstance {
    init_logger();
    let mut instance = VmInstance::new(backend, config);
    instance.build(bytecode).unwrap();
    instance
}

/// Calls `execute` with an empty message and returns the result region.
pub fn execute(instance: &mut MockInstance) -> Region {
    instance
        .execute(&mock_env(), &mock_info(), &serde_json::json!({}))
        .unwrap()
}

/// Reads a region produced by the `$u32_region` helper of the guest.
pub fn read_u32(instance: &MockInstance, region: &Region) -> u32 {
    let bytes = instance.read_bytes(region).unwrap();
    u32::from_le_bytes(bytes.try_into().unwrap())
}

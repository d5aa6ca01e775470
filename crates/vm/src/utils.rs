//! Constructors the test suites build VMs from.

use crate::{
    db::{Account, MemoryWorld, TestHost},
    environment::Environment,
    errors::{CallResult, VMError},
    fork::ChainRules,
    host::{CallKind, CallParams},
    operations::Operation,
    vm::{ExecMode, VM},
};
use bytes::Bytes;
use ethereum_types::{Address, U256};

pub const TEST_GAS_LIMIT: u64 = 30_000_000;

pub fn contract_address() -> Address {
    Address::from_low_u64_be(42)
}

pub fn sender_address() -> Address {
    Address::from_low_u64_be(100)
}

pub fn ops_to_bytecode(operations: &[Operation]) -> Result<Bytes, VMError> {
    let mut bytecode = Vec::new();
    for operation in operations {
        bytecode.extend_from_slice(&operation.to_bytecode()?);
    }
    Ok(bytecode.into())
}

/// A world with one contract and one funded sender, plus the recording host
/// around it. Each `call_*` constructs a fresh VM borrowing the shared
/// backends, so warmth does not leak between calls unless a test wants it
/// to (in which case it drives [`VM`] directly).
pub struct TestFixture {
    pub world: MemoryWorld,
    pub host: TestHost,
    pub env: Environment,
    pub rules: ChainRules,
    pub mode: ExecMode,
    pub calldata: Bytes,
    pub value: U256,
}

impl TestFixture {
    pub fn with_bytecode(bytecode: Bytes) -> Self {
        let world = MemoryWorld::new();
        world.add_account(
            contract_address(),
            Account {
                balance: U256::MAX,
                code: bytecode,
                ..Default::default()
            },
        );
        world.add_account(sender_address(), Account::with_balance(U256::MAX));
        let host = TestHost::new(world.clone());

        Self {
            world,
            host,
            env: Environment::default_from_address(sender_address()),
            rules: ChainRules::default(),
            mode: ExecMode::BlockValidated,
            calldata: Bytes::new(),
            value: U256::zero(),
        }
    }

    pub fn with_ops(operations: &[Operation]) -> Result<Self, VMError> {
        Ok(Self::with_bytecode(ops_to_bytecode(operations)?))
    }

    pub fn mode(mut self, mode: ExecMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn rules(mut self, rules: ChainRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn calldata(mut self, calldata: Bytes) -> Self {
        self.calldata = calldata;
        self
    }

    fn params(&self, kind: CallKind, gas: u64) -> CallParams {
        CallParams {
            kind,
            caller: sender_address(),
            to: contract_address(),
            code_address: contract_address(),
            value: self.value,
            input: self.calldata.clone(),
            gas,
            depth: 0,
            is_static: matches!(kind, CallKind::StaticCall),
            salt: None,
        }
    }

    pub fn call(&self) -> Result<CallResult, VMError> {
        self.call_with_gas(TEST_GAS_LIMIT)
    }

    pub fn call_with_gas(&self, gas: u64) -> Result<CallResult, VMError> {
        let mut vm = VM::new(
            self.env.clone(),
            self.rules,
            self.mode,
            &self.world,
            &self.host,
        );
        vm.call(self.params(CallKind::Call, gas))
    }

    pub fn call_static(&self) -> Result<CallResult, VMError> {
        let mut vm = VM::new(
            self.env.clone(),
            self.rules,
            self.mode,
            &self.world,
            &self.host,
        );
        vm.call(self.params(CallKind::StaticCall, TEST_GAS_LIMIT))
    }
}

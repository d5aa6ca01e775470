use crate::errors::CallResult;
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};

/// One LOG0..LOG4 record handed to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Bytes,
}

pub type SnapshotId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Call,
    StaticCall,
    DelegateCall,
    CallCode,
    Create,
    Create2,
}

/// Everything the entry shim needs to set up a frame, and everything a
/// system-call opcode forwards to the host for a nested frame.
///
/// For the create kinds, `input` carries the initcode and `to` the
/// pre-derived address of the new account (derivation, balance transfer and
/// nonce bumps are the host's side of the boundary).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallParams {
    pub kind: CallKind,
    pub caller: Address,
    /// Account whose storage/balance context the frame runs in.
    pub to: Address,
    /// Account whose code runs; differs from `to` for DELEGATECALL/CALLCODE.
    pub code_address: Address,
    pub value: U256,
    pub input: Bytes,
    pub gas: u64,
    pub depth: usize,
    pub is_static: bool,
    pub salt: Option<H256>,
}

impl CallParams {
    pub fn is_create(&self) -> bool {
        matches!(self.kind, CallKind::Create | CallKind::Create2)
    }
}

/// Effects that leave the current frame: logs, nested calls, account
/// destruction, and the journaling boundary.
///
/// Methods take `&self`; implementations are expected to use interior
/// mutability. That is what lets a nested call re-enter the engine while
/// the parent frame still holds its reference: no exclusive borrow is ever
/// held across a system-call opcode.
pub trait Host {
    fn emit_log(&self, log: Log);

    /// Run a nested message call to completion and return its result.
    fn call(&self, params: CallParams) -> CallResult;

    /// Run contract creation; also reports the created address on success.
    fn create(&self, params: CallParams) -> (CallResult, Option<Address>);

    fn selfdestruct(&self, address: Address, beneficiary: Address);

    fn create_snapshot(&self) -> SnapshotId;

    fn revert_to_snapshot(&self, id: SnapshotId);
}

/// Read/write access to accounts as the state opcodes see them. Same
/// `&self` contract as [`Host`].
pub trait WorldState {
    fn balance(&self, address: Address) -> U256;

    fn code(&self, address: Address) -> Bytes;

    fn code_hash(&self, address: Address) -> H256;

    fn storage(&self, address: Address, key: H256) -> U256;

    fn set_storage(&self, address: Address, key: H256, value: U256);

    /// Value the slot held at the start of the transaction; the SSTORE
    /// schedule prices against it.
    fn committed_storage(&self, address: Address, key: H256) -> U256;

    fn transient_storage(&self, address: Address, key: H256) -> U256;

    fn set_transient_storage(&self, address: Address, key: H256, value: U256);

    fn nonce(&self, address: Address) -> u64;

    fn account_exists(&self, address: Address) -> bool;

    /// Hash of a recent block, for BLOCKHASH. Outside the 256-block window
    /// the opcode pushes zero; implementations only need the window.
    fn block_hash(&self, number: u64) -> H256;
}

/// Precompiled contracts, dispatched by address before a frame is built.
/// The engine treats them as an opaque service.
pub trait PrecompileSet {
    fn contains(&self, address: Address) -> bool;

    /// Returns `(ok, gas_left, output)`.
    fn run(&self, address: Address, input: &[u8], gas: u64, is_static: bool)
        -> (bool, u64, Bytes);

    /// Addresses to pre-warm at call entry (they are never cold on
    /// mainnet-like chains).
    fn addresses(&self) -> Vec<Address> {
        Vec::new()
    }
}

/// The empty precompile set.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrecompiles;

impl PrecompileSet for NoPrecompiles {
    fn contains(&self, _address: Address) -> bool {
        false
    }

    fn run(
        &self,
        _address: Address,
        _input: &[u8],
        gas: u64,
        _is_static: bool,
    ) -> (bool, u64, Bytes) {
        (true, gas, Bytes::new())
    }
}

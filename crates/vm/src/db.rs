//! In-memory [`WorldState`] and [`Host`] backends. The engine only ever
//! sees them through the trait objects, so they double as the reference
//! implementations for embedders and as the backing store for the test
//! suite. Single-threaded by design: interior mutability is `RefCell`, and
//! cloning a [`MemoryWorld`] shares the underlying store.

use crate::{
    errors::{CallResult, ExecutionResult},
    host::{CallParams, Host, Log, SnapshotId, WorldState},
};
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use keccak_hash::keccak;
use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::Rc,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    pub balance: U256,
    pub code: Bytes,
    pub nonce: u64,
    pub storage: HashMap<H256, U256>,
}

impl Account {
    pub fn with_code(code: Bytes) -> Self {
        Self {
            code,
            ..Default::default()
        }
    }

    pub fn with_balance(balance: U256) -> Self {
        Self {
            balance,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
struct WorldInner {
    accounts: HashMap<Address, Account>,
    /// Slot values at the start of the transaction, captured on first write.
    committed: HashMap<(Address, H256), U256>,
    transient: HashMap<(Address, H256), U256>,
    block_hashes: HashMap<u64, H256>,
}

/// Shared in-memory world; clones alias the same store.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorld {
    inner: Rc<RefCell<WorldInner>>,
}

impl MemoryWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_account(&self, address: Address, account: Account) {
        self.inner.borrow_mut().accounts.insert(address, account);
    }

    pub fn set_block_hash(&self, number: u64, hash: H256) {
        self.inner.borrow_mut().block_hashes.insert(number, hash);
    }

    /// Seed a slot as pre-transaction state: unlike [`WorldState::set_storage`]
    /// this does not mark the old value as the committed one.
    pub fn seed_storage(&self, address: Address, key: H256, value: U256) {
        self.inner
            .borrow_mut()
            .accounts
            .entry(address)
            .or_default()
            .storage
            .insert(key, value);
    }

    pub fn stored_value(&self, address: Address, key: H256) -> U256 {
        self.inner
            .borrow()
            .accounts
            .get(&address)
            .and_then(|account| account.storage.get(&key))
            .copied()
            .unwrap_or_default()
    }

    fn dump(&self) -> WorldInner {
        self.inner.borrow().clone()
    }

    fn restore(&self, state: WorldInner) {
        *self.inner.borrow_mut() = state;
    }
}

impl WorldState for MemoryWorld {
    fn balance(&self, address: Address) -> U256 {
        self.inner
            .borrow()
            .accounts
            .get(&address)
            .map(|account| account.balance)
            .unwrap_or_default()
    }

    fn code(&self, address: Address) -> Bytes {
        self.inner
            .borrow()
            .accounts
            .get(&address)
            .map(|account| account.code.clone())
            .unwrap_or_default()
    }

    fn code_hash(&self, address: Address) -> H256 {
        keccak(self.code(address))
    }

    fn storage(&self, address: Address, key: H256) -> U256 {
        self.stored_value(address, key)
    }

    fn set_storage(&self, address: Address, key: H256, value: U256) {
        let current = self.stored_value(address, key);
        let mut inner = self.inner.borrow_mut();
        inner.committed.entry((address, key)).or_insert(current);
        inner
            .accounts
            .entry(address)
            .or_default()
            .storage
            .insert(key, value);
    }

    fn committed_storage(&self, address: Address, key: H256) -> U256 {
        let committed = self.inner.borrow().committed.get(&(address, key)).copied();
        committed.unwrap_or_else(|| self.stored_value(address, key))
    }

    fn transient_storage(&self, address: Address, key: H256) -> U256 {
        self.inner
            .borrow()
            .transient
            .get(&(address, key))
            .copied()
            .unwrap_or_default()
    }

    fn set_transient_storage(&self, address: Address, key: H256, value: U256) {
        self.inner
            .borrow_mut()
            .transient
            .insert((address, key), value);
    }

    fn nonce(&self, address: Address) -> u64 {
        self.inner
            .borrow()
            .accounts
            .get(&address)
            .map(|account| account.nonce)
            .unwrap_or_default()
    }

    fn account_exists(&self, address: Address) -> bool {
        self.inner.borrow().accounts.contains_key(&address)
    }

    fn block_hash(&self, number: u64) -> H256 {
        self.inner
            .borrow()
            .block_hashes
            .get(&number)
            .copied()
            .unwrap_or_default()
    }
}

/// Recording host over a [`MemoryWorld`]. Nested calls return canned
/// results (success with all gas unspent unless configured otherwise), and
/// snapshots copy the whole world, which is cheap at the store sizes the
/// suite uses.
#[derive(Debug, Default)]
pub struct TestHost {
    world: MemoryWorld,
    pub logs: RefCell<Vec<Log>>,
    pub calls: RefCell<Vec<CallParams>>,
    pub creates: RefCell<Vec<CallParams>>,
    pub selfdestructs: RefCell<Vec<(Address, Address)>>,
    call_results: RefCell<HashMap<Address, CallResult>>,
    create_result: RefCell<Option<(CallResult, Option<Address>)>>,
    snapshots: RefCell<Vec<(SnapshotId, WorldInner, usize)>>,
    next_snapshot: Cell<SnapshotId>,
}

impl TestHost {
    pub fn new(world: MemoryWorld) -> Self {
        Self {
            world,
            ..Default::default()
        }
    }

    /// Configure the result a nested call to `code_address` reports.
    pub fn set_call_result(&self, code_address: Address, result: CallResult) {
        self.call_results.borrow_mut().insert(code_address, result);
    }

    pub fn set_create_result(&self, result: CallResult, created: Option<Address>) {
        *self.create_result.borrow_mut() = Some((result, created));
    }

    pub fn log_count(&self) -> usize {
        self.logs.borrow().len()
    }
}

impl Host for TestHost {
    fn emit_log(&self, log: Log) {
        self.logs.borrow_mut().push(log);
    }

    fn call(&self, params: CallParams) -> CallResult {
        let canned = self.call_results.borrow().get(&params.code_address).cloned();
        let gas = params.gas;
        self.calls.borrow_mut().push(params);
        canned.unwrap_or(CallResult {
            result: ExecutionResult::Success,
            gas_left: gas,
            gas_refunded: 0,
            output: Bytes::new(),
        })
    }

    fn create(&self, params: CallParams) -> (CallResult, Option<Address>) {
        let canned = self.create_result.borrow().clone();
        let gas = params.gas;
        self.creates.borrow_mut().push(params);
        canned.unwrap_or((
            CallResult {
                result: ExecutionResult::Success,
                gas_left: gas,
                gas_refunded: 0,
                output: Bytes::new(),
            },
            Some(Address::from_low_u64_be(0xC0FFEE)),
        ))
    }

    fn selfdestruct(&self, address: Address, beneficiary: Address) {
        self.selfdestructs.borrow_mut().push((address, beneficiary));
    }

    fn create_snapshot(&self) -> SnapshotId {
        let id = self.next_snapshot.get();
        self.next_snapshot.set(id.wrapping_add(1));
        self.snapshots
            .borrow_mut()
            .push((id, self.world.dump(), self.logs.borrow().len()));
        id
    }

    fn revert_to_snapshot(&self, id: SnapshotId) {
        let mut snapshots = self.snapshots.borrow_mut();
        let Some(position) = snapshots.iter().position(|(snapshot, _, _)| *snapshot == id)
        else {
            return;
        };
        let (_, state, log_len) = snapshots.swap_remove(position);
        snapshots.truncate(position);
        drop(snapshots);
        self.world.restore(state);
        self.logs.borrow_mut().truncate(log_len);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn committed_storage_tracks_the_pre_write_value() {
        let world = MemoryWorld::new();
        let address = Address::from_low_u64_be(7);
        let key = H256::from_low_u64_be(1);

        assert_eq!(world.committed_storage(address, key), U256::zero());
        world.set_storage(address, key, U256::from(5));
        world.set_storage(address, key, U256::from(9));
        assert_eq!(world.committed_storage(address, key), U256::zero());
        assert_eq!(world.storage(address, key), U256::from(9));
    }

    #[test]
    fn snapshot_revert_restores_storage_and_logs() {
        let world = MemoryWorld::new();
        let host = TestHost::new(world.clone());
        let address = Address::from_low_u64_be(7);
        let key = H256::from_low_u64_be(1);

        world.set_storage(address, key, U256::from(1));
        let snapshot = host.create_snapshot();
        world.set_storage(address, key, U256::from(2));
        host.emit_log(Log {
            address,
            topics: vec![],
            data: Bytes::new(),
        });

        host.revert_to_snapshot(snapshot);
        assert_eq!(world.storage(address, key), U256::from(1));
        assert_eq!(host.log_count(), 0);
    }
}

use ethereum_types::{Address, H256, U256};

/// Transaction- and block-level context read by the environment opcodes.
/// Filled in by the embedder once per transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    pub origin: Address,
    pub gas_price: U256,
    pub coinbase: Address,
    pub block_number: U256,
    pub timestamp: U256,
    pub prevrandao: H256,
    pub chain_id: U256,
    pub base_fee_per_gas: U256,
    pub block_gas_limit: u64,
    pub blob_hashes: Vec<H256>,
    pub blob_base_fee: U256,
}

impl Environment {
    pub fn default_from_address(origin: Address) -> Self {
        Self {
            origin,
            block_gas_limit: 30_000_000,
            chain_id: U256::one(),
            ..Default::default()
        }
    }
}

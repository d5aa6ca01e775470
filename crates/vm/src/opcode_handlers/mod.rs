pub mod arithmetic;
pub mod bitwise_comparison;
pub mod block;
pub mod dup;
pub mod environment;
pub mod exchange;
pub mod keccak;
pub mod logging;
pub mod push;
pub mod stack_memory_storage_flow;
pub mod system;

use crate::errors::VMError;
use ethereum_types::U256;

/// Stack operands that address memory or code must fit a machine word.
pub(crate) fn to_usize(value: U256) -> Result<usize, VMError> {
    usize::try_from(value).map_err(|_| VMError::VeryLargeNumber)
}

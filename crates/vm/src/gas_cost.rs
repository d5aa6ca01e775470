/// Dynamic gas helpers. The constant portion of every opcode lives in the
/// opcode properties table; these compute the operand-dependent parts.
use crate::{constants::WORD_SIZE, errors::VMError, fork::ChainRules};
use ethereum_types::U256;

pub const KECCAK_WORD_COST: u64 = 6;
pub const COPY_WORD_COST: u64 = 3;
pub const LOG_DATA_BYTE_COST: u64 = 8;
pub const CALL_VALUE_COST: u64 = 9000;
pub const CALL_NEW_ACCOUNT_COST: u64 = 25000;
pub const INITCODE_WORD_COST: u64 = 2;

fn word_count(size: usize) -> Result<u64, VMError> {
    let size = u64::try_from(size).map_err(|_| VMError::VeryLargeNumber)?;
    let word = u64::try_from(WORD_SIZE).map_err(|_| VMError::VeryLargeNumber)?;
    Ok(size.div_ceil(word))
}

/// EXP: per-byte charge on the exponent's minimal big-endian width.
pub fn exp(exponent: U256, rules: &ChainRules) -> Result<u64, VMError> {
    let exponent_bytes = u64::try_from(exponent.bits().div_ceil(8)).map_err(|_| VMError::OutOfGas)?;
    rules
        .exp_byte_cost()
        .checked_mul(exponent_bytes)
        .ok_or(VMError::OutOfGas)
}

/// KECCAK256: 6 per word hashed.
pub fn keccak256_words(size: usize) -> Result<u64, VMError> {
    word_count(size)?
        .checked_mul(KECCAK_WORD_COST)
        .ok_or(VMError::OutOfGas)
}

/// CALLDATACOPY / CODECOPY / EXTCODECOPY / RETURNDATACOPY / MCOPY: 3 per
/// word moved.
pub fn copy_words(size: usize) -> Result<u64, VMError> {
    word_count(size)?
        .checked_mul(COPY_WORD_COST)
        .ok_or(VMError::OutOfGas)
}

/// LOGn data charge: 8 per byte (topic charges are constant per opcode).
pub fn log_data(size: usize) -> Result<u64, VMError> {
    let size = u64::try_from(size).map_err(|_| VMError::VeryLargeNumber)?;
    size.checked_mul(LOG_DATA_BYTE_COST).ok_or(VMError::OutOfGas)
}

/// EIP-3860 initcode word charge for CREATE/CREATE2.
pub fn initcode_words(size: usize) -> Result<u64, VMError> {
    word_count(size)?
        .checked_mul(INITCODE_WORD_COST)
        .ok_or(VMError::OutOfGas)
}

/// CREATE2 hashes the initcode: 6 per word.
pub fn create2_hash_words(size: usize) -> Result<u64, VMError> {
    word_count(size)?
        .checked_mul(KECCAK_WORD_COST)
        .ok_or(VMError::OutOfGas)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::fork::Fork;

    #[test]
    fn exp_charges_per_exponent_byte() {
        let rules = ChainRules::default();
        assert_eq!(exp(U256::zero(), &rules).unwrap(), 0);
        assert_eq!(exp(U256::from(0xFF), &rules).unwrap(), 50);
        assert_eq!(exp(U256::from(0x100), &rules).unwrap(), 100);
        assert_eq!(exp(U256::MAX, &rules).unwrap(), 32 * 50);

        let frontier = ChainRules::new(Fork::Frontier);
        assert_eq!(exp(U256::from(0xFF), &frontier).unwrap(), 10);
    }

    #[test]
    fn copy_rounds_up_to_words() {
        assert_eq!(copy_words(0).unwrap(), 0);
        assert_eq!(copy_words(1).unwrap(), 3);
        assert_eq!(copy_words(32).unwrap(), 3);
        assert_eq!(copy_words(33).unwrap(), 6);
    }

    #[test]
    fn keccak_rounds_up_to_words() {
        assert_eq!(keccak256_words(0).unwrap(), 0);
        assert_eq!(keccak256_words(31).unwrap(), 6);
        assert_eq!(keccak256_words(64).unwrap(), 12);
    }
}

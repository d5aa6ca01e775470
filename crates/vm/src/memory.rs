use crate::{
    constants::{MEMORY_EXPANSION_QUOTIENT, WORD_SIZE},
    errors::{InternalError, VMError},
};
use ethereum_types::U256;

/// Byte-addressed call memory. Grows lazily in 32-byte words; freshly
/// touched bytes read as zero. The expansion *cost* is charged by the
/// handler before the access, via [`Memory::expansion_cost`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn resize_to(&mut self, end: usize) -> Result<(), VMError> {
        let aligned = end
            .checked_next_multiple_of(WORD_SIZE)
            .ok_or(VMError::VeryLargeNumber)?;
        if aligned > self.data.len() {
            self.data.resize(aligned, 0);
        }
        Ok(())
    }

    pub fn load_word(&mut self, offset: usize) -> Result<U256, VMError> {
        let end = offset.checked_add(WORD_SIZE).ok_or(VMError::VeryLargeNumber)?;
        self.resize_to(end)?;
        let bytes = self
            .data
            .get(offset..end)
            .ok_or(InternalError::SliceOutOfRange)?;
        Ok(U256::from_big_endian(bytes))
    }

    pub fn store_word(&mut self, offset: usize, value: U256) -> Result<(), VMError> {
        let mut bytes = [0u8; WORD_SIZE];
        value.to_big_endian(&mut bytes);
        self.store_bytes(offset, &bytes)
    }

    pub fn store_byte(&mut self, offset: usize, value: u8) -> Result<(), VMError> {
        self.store_bytes(offset, &[value])
    }

    pub fn store_bytes(&mut self, offset: usize, value: &[u8]) -> Result<(), VMError> {
        if value.is_empty() {
            return Ok(());
        }
        let end = offset
            .checked_add(value.len())
            .ok_or(VMError::VeryLargeNumber)?;
        self.resize_to(end)?;
        let target = self
            .data
            .get_mut(offset..end)
            .ok_or(InternalError::SliceOutOfRange)?;
        target.copy_from_slice(value);
        Ok(())
    }

    pub fn load_range(&mut self, offset: usize, size: usize) -> Result<Vec<u8>, VMError> {
        if size == 0 {
            return Ok(Vec::new());
        }
        let end = offset.checked_add(size).ok_or(VMError::VeryLargeNumber)?;
        self.resize_to(end)?;
        self.data
            .get(offset..end)
            .map(<[u8]>::to_vec)
            .ok_or(InternalError::SliceOutOfRange.into())
    }

    /// MCOPY: overlapping ranges behave like `memmove`.
    pub fn copy_within(&mut self, src: usize, dest: usize, size: usize) -> Result<(), VMError> {
        if size == 0 {
            return Ok(());
        }
        let src_end = src.checked_add(size).ok_or(VMError::VeryLargeNumber)?;
        let dest_end = dest.checked_add(size).ok_or(VMError::VeryLargeNumber)?;
        self.resize_to(src_end.max(dest_end))?;
        if src_end > self.data.len() || dest_end > self.data.len() {
            return Err(InternalError::SliceOutOfRange.into());
        }
        self.data.copy_within(src..src_end, dest);
        Ok(())
    }

    /// Charge for growing memory to hold `size` bytes at `offset`. Free when
    /// the range already fits or is empty; otherwise the delta of
    /// `3·w + w²/512` over the current word count.
    pub fn expansion_cost(&self, offset: usize, size: usize) -> Result<u64, VMError> {
        if size == 0 {
            return Ok(0);
        }
        let end = offset.checked_add(size).ok_or(VMError::VeryLargeNumber)?;
        if end <= self.data.len() {
            return Ok(0);
        }
        let new_cost = words_cost(word_count(end)?)?;
        let current_cost = words_cost(word_count(self.data.len())?)?;
        Ok(new_cost.saturating_sub(current_cost))
    }
}

fn word_count(bytes: usize) -> Result<u64, VMError> {
    let bytes = u64::try_from(bytes).map_err(|_| VMError::VeryLargeNumber)?;
    let word = u64::try_from(WORD_SIZE).map_err(|_| VMError::Internal(InternalError::Overflow))?;
    Ok(bytes.div_ceil(word))
}

fn words_cost(words: u64) -> Result<u64, VMError> {
    let linear = words.checked_mul(3).ok_or(VMError::OutOfGas)?;
    let quadratic = words
        .checked_mul(words)
        .ok_or(VMError::OutOfGas)?
        .checked_div(MEMORY_EXPANSION_QUOTIENT)
        .ok_or(VMError::OutOfGas)?;
    linear.checked_add(quadratic).ok_or(VMError::OutOfGas)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn fresh_reads_are_zero_and_grow_word_aligned() {
        let mut memory = Memory::new();
        assert_eq!(memory.load_word(10).unwrap(), U256::zero());
        assert_eq!(memory.len(), 64);
    }

    #[test]
    fn store_then_load_round_trips() {
        let mut memory = Memory::new();
        let value = U256::from(0xDEADBEEFu64);
        memory.store_word(32, value).unwrap();
        assert_eq!(memory.load_word(32).unwrap(), value);
        assert_eq!(memory.len(), 64);
    }

    #[test]
    fn store_byte_writes_the_low_byte_only() {
        let mut memory = Memory::new();
        memory.store_byte(3, 0xAB).unwrap();
        assert_eq!(memory.len(), 32);
        let word = memory.load_word(0).unwrap();
        assert_eq!(word.byte(28), 0xAB);
    }

    #[test]
    fn copy_within_handles_overlap() {
        let mut memory = Memory::new();
        memory.store_bytes(0, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        memory.copy_within(0, 4, 8).unwrap();
        assert_eq!(
            memory.load_range(4, 8).unwrap(),
            vec![1, 2, 3, 4, 5, 6, 7, 8]
        );
    }

    #[test]
    fn expansion_cost_table() {
        let memory = Memory::new();
        assert_eq!(memory.expansion_cost(0, 0).unwrap(), 0);
        // One word: 3·1 + 1²/512 = 3.
        assert_eq!(memory.expansion_cost(0, 1).unwrap(), 3);
        // Two words: 3·2 + 2²/512 = 6.
        assert_eq!(memory.expansion_cost(0, 33).unwrap(), 6);
        // Quadratic term kicks in past 512 words.
        assert_eq!(memory.expansion_cost(0, 32 * 1024).unwrap(), 3 * 1024 + 2048);
    }

    #[test]
    fn expansion_cost_is_a_delta() {
        let mut memory = Memory::new();
        memory.store_word(0, U256::one()).unwrap();
        assert_eq!(memory.expansion_cost(0, 32).unwrap(), 0);
        assert_eq!(memory.expansion_cost(32, 1).unwrap(), 3);
    }

    #[test]
    fn zero_length_access_at_huge_offset_is_free() {
        let memory = Memory::new();
        assert_eq!(memory.expansion_cost(usize::MAX, 0).unwrap(), 0);
    }
}

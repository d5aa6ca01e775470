use crate::{
    call_frame::CallFrame,
    errors::{StepAction, VMError},
    gas_cost,
    opcode_handlers::to_usize,
    vm::VM,
};
use ethereum_types::U256;
use keccak_hash::keccak;

// KECCAK256 (1)

impl VM<'_> {
    // KECCAK256 operation
    pub fn op_keccak256(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let offset = to_usize(frame.stack.pop_unchecked()?)?;
        let size = to_usize(frame.stack.pop_unchecked()?)?;

        let expansion = frame.memory.expansion_cost(offset, size)?;
        let words = gas_cost::keccak256_words(size)?;
        frame
            .gas
            .charge(expansion.checked_add(words).ok_or(VMError::OutOfGas)?)?;

        let data = frame.memory.load_range(offset, size)?;
        let hash = keccak(&data);
        frame
            .stack
            .push_unchecked(U256::from_big_endian(hash.as_bytes()))?;
        Ok(StepAction::Advance)
    }
}

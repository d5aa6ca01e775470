use crate::{
    call_frame::CallFrame,
    errors::{StepAction, VMError},
    gas_cost,
    opcode_handlers::to_usize,
    program::Program,
    vm::{address_to_word, word_to_address, VM},
};
use ethereum_types::U256;

// Environmental Information (16)
// Opcodes: ADDRESS, BALANCE, ORIGIN, CALLER, CALLVALUE, CALLDATALOAD,
// CALLDATASIZE, CALLDATACOPY, CODESIZE, CODECOPY, GASPRICE, EXTCODESIZE,
// EXTCODECOPY, RETURNDATASIZE, RETURNDATACOPY, EXTCODEHASH

/// Copy `size` bytes of `source` starting at `source_offset` to memory,
/// zero-filling everything past the end of `source`.
fn copy_to_memory(
    frame: &mut CallFrame,
    dest: usize,
    source_offset: usize,
    size: usize,
    source: &[u8],
) -> Result<(), VMError> {
    if size == 0 {
        return Ok(());
    }
    let mut chunk = vec![0u8; size];
    let start = source_offset.min(source.len());
    let count = size.min(source.len().saturating_sub(start));
    if let (Some(target), Some(from)) = (
        chunk.get_mut(..count),
        source.get(start..start.saturating_add(count)),
    ) {
        target.copy_from_slice(from);
    }
    frame.memory.store_bytes(dest, &chunk)
}

impl VM<'_> {
    // ADDRESS operation
    pub fn op_address(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        frame.stack.push_unchecked(address_to_word(frame.to))?;
        Ok(StepAction::Advance)
    }

    // BALANCE operation
    pub fn op_balance(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let address = word_to_address(frame.stack.pop_unchecked()?);
        let cold = self.access_account(address);
        frame.gas.charge(self.rules.balance_cost(cold))?;
        frame.stack.push_unchecked(self.world.balance(address))?;
        Ok(StepAction::Advance)
    }

    // ORIGIN operation
    pub fn op_origin(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        frame
            .stack
            .push_unchecked(address_to_word(self.env.origin))?;
        Ok(StepAction::Advance)
    }

    // CALLER operation
    pub fn op_caller(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        frame
            .stack
            .push_unchecked(address_to_word(frame.msg_sender))?;
        Ok(StepAction::Advance)
    }

    // CALLVALUE operation
    pub fn op_callvalue(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        frame.stack.push_unchecked(frame.msg_value)?;
        Ok(StepAction::Advance)
    }

    // CALLDATALOAD operation
    pub fn op_calldataload(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let offset = frame.stack.pop_unchecked()?;
        // Past-the-end reads are all zeros, however large the offset.
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);

        let mut word = [0u8; 32];
        let start = offset.min(frame.calldata.len());
        let count = 32usize.min(frame.calldata.len().saturating_sub(start));
        if let (Some(target), Some(from)) = (
            word.get_mut(..count),
            frame.calldata.get(start..start.saturating_add(count)),
        ) {
            target.copy_from_slice(from);
        }

        frame.stack.push_unchecked(U256::from_big_endian(&word))?;
        Ok(StepAction::Advance)
    }

    // CALLDATASIZE operation
    pub fn op_calldatasize(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        frame
            .stack
            .push_unchecked(U256::from(frame.calldata.len()))?;
        Ok(StepAction::Advance)
    }

    // CALLDATACOPY operation
    pub fn op_calldatacopy(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let dest = to_usize(frame.stack.pop_unchecked()?)?;
        let source_offset = usize::try_from(frame.stack.pop_unchecked()?).unwrap_or(usize::MAX);
        let size = to_usize(frame.stack.pop_unchecked()?)?;

        let expansion = frame.memory.expansion_cost(dest, size)?;
        let words = gas_cost::copy_words(size)?;
        frame
            .gas
            .charge(expansion.checked_add(words).ok_or(VMError::OutOfGas)?)?;

        let calldata = frame.calldata.clone();
        copy_to_memory(frame, dest, source_offset, size, &calldata)?;
        Ok(StepAction::Advance)
    }

    // CODESIZE operation
    pub fn op_codesize(
        &mut self,
        frame: &mut CallFrame,
        program: &Program,
    ) -> Result<StepAction, VMError> {
        frame.stack.push_unchecked(U256::from(program.code.len()))?;
        Ok(StepAction::Advance)
    }

    // CODECOPY operation
    pub fn op_codecopy(
        &mut self,
        frame: &mut CallFrame,
        program: &Program,
    ) -> Result<StepAction, VMError> {
        let dest = to_usize(frame.stack.pop_unchecked()?)?;
        let source_offset = usize::try_from(frame.stack.pop_unchecked()?).unwrap_or(usize::MAX);
        let size = to_usize(frame.stack.pop_unchecked()?)?;

        let expansion = frame.memory.expansion_cost(dest, size)?;
        let words = gas_cost::copy_words(size)?;
        frame
            .gas
            .charge(expansion.checked_add(words).ok_or(VMError::OutOfGas)?)?;

        copy_to_memory(frame, dest, source_offset, size, &program.code)?;
        Ok(StepAction::Advance)
    }

    // GASPRICE operation
    pub fn op_gasprice(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        frame.stack.push_unchecked(self.env.gas_price)?;
        Ok(StepAction::Advance)
    }

    // EXTCODESIZE operation
    pub fn op_extcodesize(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let address = word_to_address(frame.stack.pop_unchecked()?);
        let cold = self.access_account(address);
        frame.gas.charge(self.rules.extcode_access_cost(cold))?;
        frame
            .stack
            .push_unchecked(U256::from(self.world.code(address).len()))?;
        Ok(StepAction::Advance)
    }

    // EXTCODECOPY operation
    pub fn op_extcodecopy(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let address = word_to_address(frame.stack.pop_unchecked()?);
        let dest = to_usize(frame.stack.pop_unchecked()?)?;
        let source_offset = usize::try_from(frame.stack.pop_unchecked()?).unwrap_or(usize::MAX);
        let size = to_usize(frame.stack.pop_unchecked()?)?;

        let cold = self.access_account(address);
        let expansion = frame.memory.expansion_cost(dest, size)?;
        let words = gas_cost::copy_words(size)?;
        let cost = self
            .rules
            .extcode_access_cost(cold)
            .checked_add(expansion)
            .and_then(|cost| cost.checked_add(words))
            .ok_or(VMError::OutOfGas)?;
        frame.gas.charge(cost)?;

        let code = self.world.code(address);
        copy_to_memory(frame, dest, source_offset, size, &code)?;
        Ok(StepAction::Advance)
    }

    // RETURNDATASIZE operation
    pub fn op_returndatasize(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        frame
            .stack
            .push_unchecked(U256::from(frame.sub_return_data.len()))?;
        Ok(StepAction::Advance)
    }

    // RETURNDATACOPY operation
    pub fn op_returndatacopy(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let dest = to_usize(frame.stack.pop_unchecked()?)?;
        let source_offset = frame.stack.pop_unchecked()?;
        let size = to_usize(frame.stack.pop_unchecked()?)?;

        let expansion = frame.memory.expansion_cost(dest, size)?;
        let words = gas_cost::copy_words(size)?;
        frame
            .gas
            .charge(expansion.checked_add(words).ok_or(VMError::OutOfGas)?)?;

        // Unlike the other copies, reading past the end of the return
        // buffer is a hard failure, not a zero-fill.
        let source_offset =
            usize::try_from(source_offset).map_err(|_| VMError::ReturnDataOutOfBounds)?;
        let end = source_offset
            .checked_add(size)
            .ok_or(VMError::ReturnDataOutOfBounds)?;
        if end > frame.sub_return_data.len() {
            return Err(VMError::ReturnDataOutOfBounds);
        }

        let return_data = frame.sub_return_data.clone();
        copy_to_memory(frame, dest, source_offset, size, &return_data)?;
        Ok(StepAction::Advance)
    }

    // EXTCODEHASH operation
    pub fn op_extcodehash(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let address = word_to_address(frame.stack.pop_unchecked()?);
        let cold = self.access_account(address);
        frame.gas.charge(self.rules.extcodehash_cost(cold))?;

        let hash = if self.world.account_exists(address) {
            U256::from_big_endian(self.world.code_hash(address).as_bytes())
        } else {
            U256::zero()
        };
        frame.stack.push_unchecked(hash)?;
        Ok(StepAction::Advance)
    }
}

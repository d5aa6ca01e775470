use crate::{
    call_frame::CallFrame,
    constants::CALL_STIPEND,
    errors::{StepAction, VMError},
    fork::Fork,
    gas_cost,
    opcode_handlers::to_usize,
    vm::VM,
};
use ethereum_types::{H256, U256};

// Stack, Memory, Storage and Flow Operations (15)
// Opcodes: POP, MLOAD, MSTORE, MSTORE8, SLOAD, SSTORE, JUMP, JUMPI, PC,
// MSIZE, GAS, JUMPDEST, TLOAD, TSTORE, MCOPY

fn word_to_key(word: U256) -> H256 {
    let mut bytes = [0u8; 32];
    word.to_big_endian(&mut bytes);
    H256::from(bytes)
}

impl VM<'_> {
    // POP operation
    pub fn op_pop(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        frame.stack.pop_unchecked()?;
        Ok(StepAction::Advance)
    }

    // MLOAD operation
    pub fn op_mload(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let offset = to_usize(frame.stack.pop_unchecked()?)?;
        frame.gas.charge(frame.memory.expansion_cost(offset, 32)?)?;
        let value = frame.memory.load_word(offset)?;
        frame.stack.push_unchecked(value)?;
        Ok(StepAction::Advance)
    }

    // MSTORE operation
    pub fn op_mstore(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let offset = to_usize(frame.stack.pop_unchecked()?)?;
        frame.gas.charge(frame.memory.expansion_cost(offset, 32)?)?;
        let value = frame.stack.pop_unchecked()?;
        frame.memory.store_word(offset, value)?;
        Ok(StepAction::Advance)
    }

    // MSTORE8 operation
    pub fn op_mstore8(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let offset = to_usize(frame.stack.pop_unchecked()?)?;
        frame.gas.charge(frame.memory.expansion_cost(offset, 1)?)?;
        let value = frame.stack.pop_unchecked()?;
        frame.memory.store_byte(offset, value.byte(0))?;
        Ok(StepAction::Advance)
    }

    // SLOAD operation
    pub fn op_sload(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let key = word_to_key(frame.stack.pop_unchecked()?);
        let cold = self.access_storage_slot(frame.to, key);
        frame.gas.charge(self.rules.sload_cost(cold))?;
        frame
            .stack
            .push_unchecked(self.world.storage(frame.to, key))?;
        Ok(StepAction::Advance)
    }

    // SSTORE operation
    pub fn op_sstore(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        if frame.is_static {
            return Err(VMError::StaticStateViolation);
        }

        // EIP-2200 sentry: refuse to run on the last drops of gas so a
        // re-entrant callee can't be starved into skipping the store.
        if self.rules.fork >= Fork::Istanbul && frame.gas.remaining() <= CALL_STIPEND {
            return Err(VMError::OutOfGas);
        }

        let key = word_to_key(frame.stack.pop_unchecked()?);
        let new_value = frame.stack.pop_unchecked()?;

        let cold = self.access_storage_slot(frame.to, key);
        let original = self.world.committed_storage(frame.to, key);
        let current = self.world.storage(frame.to, key);

        let schedule = self.rules.sstore_cost(original, current, new_value, cold);
        frame.gas.charge(schedule.cost)?;
        frame.gas.add_refund(schedule.refund);

        self.world.set_storage(frame.to, key, new_value);
        Ok(StepAction::Advance)
    }

    // MSIZE operation
    pub fn op_msize(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        frame.stack.push_unchecked(U256::from(frame.memory.len()))?;
        Ok(StepAction::Advance)
    }

    // GAS operation
    //
    // The block prelude already deducted the whole block's constant gas, so
    // the share belonging to the opcodes after this one is added back; the
    // reported value matches what a per-opcode schedule would show here.
    pub fn op_gas(&mut self, frame: &mut CallFrame, prefix_gas: u32) -> Result<StepAction, VMError> {
        let not_yet_executed = frame.block_gas_cost.saturating_sub(u64::from(prefix_gas));
        let visible = frame.gas.remaining().saturating_add(not_yet_executed);
        frame.stack.push_unchecked(U256::from(visible))?;
        Ok(StepAction::Advance)
    }

    // MCOPY operation
    pub fn op_mcopy(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let dest = to_usize(frame.stack.pop_unchecked()?)?;
        let src = to_usize(frame.stack.pop_unchecked()?)?;
        let size = to_usize(frame.stack.pop_unchecked()?)?;

        let expansion = frame
            .memory
            .expansion_cost(dest.max(src), size)?;
        let words = gas_cost::copy_words(size)?;
        frame
            .gas
            .charge(expansion.checked_add(words).ok_or(VMError::OutOfGas)?)?;

        frame.memory.copy_within(src, dest, size)?;
        Ok(StepAction::Advance)
    }

    // JUMP operation
    pub fn op_jump(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let destination = frame.stack.pop_unchecked()?;
        frame.pc = usize::try_from(destination).map_err(|_| VMError::InvalidJump)?;
        Ok(StepAction::Reenter)
    }

    // JUMPI operation
    pub fn op_jumpi(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let destination = frame.stack.pop_unchecked()?;
        let condition = frame.stack.pop_unchecked()?;
        if condition.is_zero() {
            return Ok(StepAction::Advance);
        }
        frame.pc = usize::try_from(destination).map_err(|_| VMError::InvalidJump)?;
        Ok(StepAction::Reenter)
    }

    // Fused PUSH+JUMP; the target was validated at translation time.
    pub fn op_jump_to(&mut self, frame: &mut CallFrame, target: u32) -> Result<StepAction, VMError> {
        frame.pc = usize::try_from(target).map_err(|_| VMError::InvalidJump)?;
        Ok(StepAction::Reenter)
    }

    // Fused PUSH+JUMPI.
    pub fn op_jump_if_to(
        &mut self,
        frame: &mut CallFrame,
        target: u32,
    ) -> Result<StepAction, VMError> {
        let condition = frame.stack.pop_unchecked()?;
        if condition.is_zero() {
            return Ok(StepAction::Advance);
        }
        frame.pc = usize::try_from(target).map_err(|_| VMError::InvalidJump)?;
        Ok(StepAction::Reenter)
    }

    // PC operation; the byte offset was recorded at translation time.
    pub fn op_pc(&mut self, frame: &mut CallFrame, offset: u32) -> Result<StepAction, VMError> {
        frame.stack.push_unchecked(U256::from(offset))?;
        Ok(StepAction::Advance)
    }

    // TLOAD operation
    pub fn op_tload(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let key = word_to_key(frame.stack.pop_unchecked()?);
        let value = self.world.transient_storage(frame.to, key);
        frame.stack.push_unchecked(value)?;
        Ok(StepAction::Advance)
    }

    // TSTORE operation
    pub fn op_tstore(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        if frame.is_static {
            return Err(VMError::StaticStateViolation);
        }
        let key = word_to_key(frame.stack.pop_unchecked()?);
        let value = frame.stack.pop_unchecked()?;
        self.world.set_transient_storage(frame.to, key, value);
        Ok(StepAction::Advance)
    }
}

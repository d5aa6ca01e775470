use crate::{
    call_frame::CallFrame,
    constants::WORD_SIZE,
    errors::{StepAction, VMError},
    opcode_handlers::arithmetic::is_negative,
    vm::VM,
};
use ethereum_types::U256;

// Comparison and Bitwise Logic Operations (14)
// Opcodes: LT, GT, SLT, SGT, EQ, ISZERO, AND, OR, XOR, NOT, BYTE, SHL, SHR, SAR

fn bool_to_word(condition: bool) -> U256 {
    if condition {
        U256::one()
    } else {
        U256::zero()
    }
}

impl VM<'_> {
    // LT operation
    pub fn op_lt(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let lho = frame.stack.pop_unchecked()?;
        let rho = frame.stack.pop_unchecked()?;
        frame.stack.push_unchecked(bool_to_word(lho < rho))?;
        Ok(StepAction::Advance)
    }

    // GT operation
    pub fn op_gt(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let lho = frame.stack.pop_unchecked()?;
        let rho = frame.stack.pop_unchecked()?;
        frame.stack.push_unchecked(bool_to_word(lho > rho))?;
        Ok(StepAction::Advance)
    }

    // SLT operation (signed less than)
    pub fn op_slt(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let lho = frame.stack.pop_unchecked()?;
        let rho = frame.stack.pop_unchecked()?;
        let result = if is_negative(lho) == is_negative(rho) {
            // Same sign: two's-complement order matches unsigned order.
            lho < rho
        } else {
            is_negative(lho)
        };
        frame.stack.push_unchecked(bool_to_word(result))?;
        Ok(StepAction::Advance)
    }

    // SGT operation (signed greater than)
    pub fn op_sgt(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let lho = frame.stack.pop_unchecked()?;
        let rho = frame.stack.pop_unchecked()?;
        let result = if is_negative(lho) == is_negative(rho) {
            lho > rho
        } else {
            is_negative(rho)
        };
        frame.stack.push_unchecked(bool_to_word(result))?;
        Ok(StepAction::Advance)
    }

    // EQ operation
    pub fn op_eq(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let lho = frame.stack.pop_unchecked()?;
        let rho = frame.stack.pop_unchecked()?;
        frame.stack.push_unchecked(bool_to_word(lho == rho))?;
        Ok(StepAction::Advance)
    }

    // ISZERO operation
    pub fn op_iszero(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let operand = frame.stack.pop_unchecked()?;
        frame.stack.push_unchecked(bool_to_word(operand.is_zero()))?;
        Ok(StepAction::Advance)
    }

    // AND operation
    pub fn op_and(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let a = frame.stack.pop_unchecked()?;
        let b = frame.stack.pop_unchecked()?;
        frame.stack.push_unchecked(a & b)?;
        Ok(StepAction::Advance)
    }

    // OR operation
    pub fn op_or(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let a = frame.stack.pop_unchecked()?;
        let b = frame.stack.pop_unchecked()?;
        frame.stack.push_unchecked(a | b)?;
        Ok(StepAction::Advance)
    }

    // XOR operation
    pub fn op_xor(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let a = frame.stack.pop_unchecked()?;
        let b = frame.stack.pop_unchecked()?;
        frame.stack.push_unchecked(a ^ b)?;
        Ok(StepAction::Advance)
    }

    // NOT operation
    pub fn op_not(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let a = frame.stack.pop_unchecked()?;
        frame.stack.push_unchecked(!a)?;
        Ok(StepAction::Advance)
    }

    // BYTE operation
    pub fn op_byte(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let index = frame.stack.pop_unchecked()?;
        let word = frame.stack.pop_unchecked()?;
        let index = usize::try_from(index).unwrap_or(usize::MAX);

        // Index 0 is the most significant byte; U256::byte counts from the
        // least significant end.
        let result = if index < WORD_SIZE {
            WORD_SIZE
                .checked_sub(index.saturating_add(1))
                .map(|little_endian| U256::from(word.byte(little_endian)))
                .unwrap_or_default()
        } else {
            U256::zero()
        };
        frame.stack.push_unchecked(result)?;
        Ok(StepAction::Advance)
    }

    // SHL operation (shift left)
    pub fn op_shl(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let shift = frame.stack.pop_unchecked()?;
        let value = frame.stack.pop_unchecked()?;
        let result = if shift < U256::from(256) {
            value << usize::try_from(shift.low_u64()).unwrap_or(usize::MAX)
        } else {
            U256::zero()
        };
        frame.stack.push_unchecked(result)?;
        Ok(StepAction::Advance)
    }

    // SHR operation (logical shift right)
    pub fn op_shr(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let shift = frame.stack.pop_unchecked()?;
        let value = frame.stack.pop_unchecked()?;
        let result = if shift < U256::from(256) {
            value >> usize::try_from(shift.low_u64()).unwrap_or(usize::MAX)
        } else {
            U256::zero()
        };
        frame.stack.push_unchecked(result)?;
        Ok(StepAction::Advance)
    }

    // SAR operation (arithmetic shift right)
    pub fn op_sar(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let shift = frame.stack.pop_unchecked()?;
        let value = frame.stack.pop_unchecked()?;
        let result = if shift < U256::from(256) {
            arithmetic_shift_right(value, usize::try_from(shift.low_u64()).unwrap_or(usize::MAX))
        } else if is_negative(value) {
            U256::MAX
        } else {
            U256::zero()
        };
        frame.stack.push_unchecked(result)?;
        Ok(StepAction::Advance)
    }
}

/// Shift right filling with the sign bit; `shift` must be below 256.
pub(crate) fn arithmetic_shift_right(value: U256, shift: usize) -> U256 {
    let shifted = value >> shift;
    if is_negative(value) && shift > 0 {
        let mask = U256::MAX << 256usize.saturating_sub(shift);
        shifted | mask
    } else {
        shifted
    }
}

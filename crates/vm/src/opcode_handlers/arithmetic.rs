use crate::{
    call_frame::CallFrame,
    errors::{InternalError, StepAction, VMError},
    gas_cost,
    vm::VM,
};
use ethereum_types::{U256, U512};

// Stop and Arithmetic Operations (11)
// Opcodes: ADD, SUB, MUL, DIV, SDIV, MOD, SMOD, ADDMOD, MULMOD, EXP, SIGNEXTEND

impl VM<'_> {
    // ADD operation
    pub fn op_add(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let augend = frame.stack.pop_unchecked()?;
        let addend = frame.stack.pop_unchecked()?;
        frame.stack.push_unchecked(augend.overflowing_add(addend).0)?;
        Ok(StepAction::Advance)
    }

    // SUB operation
    pub fn op_sub(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let minuend = frame.stack.pop_unchecked()?;
        let subtrahend = frame.stack.pop_unchecked()?;
        frame
            .stack
            .push_unchecked(minuend.overflowing_sub(subtrahend).0)?;
        Ok(StepAction::Advance)
    }

    // MUL operation
    pub fn op_mul(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let multiplicand = frame.stack.pop_unchecked()?;
        let multiplier = frame.stack.pop_unchecked()?;
        frame
            .stack
            .push_unchecked(multiplicand.overflowing_mul(multiplier).0)?;
        Ok(StepAction::Advance)
    }

    // DIV operation
    pub fn op_div(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let dividend = frame.stack.pop_unchecked()?;
        let divisor = frame.stack.pop_unchecked()?;
        let quotient = dividend.checked_div(divisor).unwrap_or_default();
        frame.stack.push_unchecked(quotient)?;
        Ok(StepAction::Advance)
    }

    // SDIV operation
    pub fn op_sdiv(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let dividend = frame.stack.pop_unchecked()?;
        let divisor = frame.stack.pop_unchecked()?;
        if divisor.is_zero() {
            frame.stack.push_unchecked(U256::zero())?;
            return Ok(StepAction::Advance);
        }

        // Two's-complement division through magnitudes. MIN / -1 folds back
        // to MIN on its own: |MIN| is MIN and the signs cancel.
        let quotient = abs(dividend).checked_div(abs(divisor)).unwrap_or_default();
        let negative_result = is_negative(dividend) != is_negative(divisor);
        let quotient = if negative_result {
            negate(quotient)
        } else {
            quotient
        };

        frame.stack.push_unchecked(quotient)?;
        Ok(StepAction::Advance)
    }

    // MOD operation
    pub fn op_mod(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let dividend = frame.stack.pop_unchecked()?;
        let divisor = frame.stack.pop_unchecked()?;
        let remainder = dividend.checked_rem(divisor).unwrap_or_default();
        frame.stack.push_unchecked(remainder)?;
        Ok(StepAction::Advance)
    }

    // SMOD operation
    pub fn op_smod(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let dividend = frame.stack.pop_unchecked()?;
        let divisor = frame.stack.pop_unchecked()?;
        if divisor.is_zero() {
            frame.stack.push_unchecked(U256::zero())?;
            return Ok(StepAction::Advance);
        }

        // The result takes the dividend's sign.
        let remainder = abs(dividend).checked_rem(abs(divisor)).unwrap_or_default();
        let remainder = if is_negative(dividend) {
            negate(remainder)
        } else {
            remainder
        };

        frame.stack.push_unchecked(remainder)?;
        Ok(StepAction::Advance)
    }

    // ADDMOD operation
    pub fn op_addmod(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let augend = frame.stack.pop_unchecked()?;
        let addend = frame.stack.pop_unchecked()?;
        let modulus = frame.stack.pop_unchecked()?;
        if modulus.is_zero() {
            frame.stack.push_unchecked(U256::zero())?;
            return Ok(StepAction::Advance);
        }

        // The sum is reduced in 512-bit precision: (MAX + 5) mod 10 is 4,
        // not (MAX mod 10 + 5 mod 10) mod 10.
        let sum = U512::from(augend)
            .checked_add(U512::from(addend))
            .ok_or(InternalError::Overflow)?;
        let reduced = sum
            .checked_rem(U512::from(modulus))
            .ok_or(InternalError::Overflow)?;
        let result = U256::try_from(reduced).map_err(|_| InternalError::Overflow)?;

        frame.stack.push_unchecked(result)?;
        Ok(StepAction::Advance)
    }

    // MULMOD operation
    pub fn op_mulmod(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let multiplicand = frame.stack.pop_unchecked()?;
        let multiplier = frame.stack.pop_unchecked()?;
        let modulus = frame.stack.pop_unchecked()?;
        if modulus.is_zero() {
            frame.stack.push_unchecked(U256::zero())?;
            return Ok(StepAction::Advance);
        }

        let product = multiplicand.full_mul(multiplier);
        let reduced = product
            .checked_rem(U512::from(modulus))
            .ok_or(InternalError::Overflow)?;
        let result = U256::try_from(reduced).map_err(|_| InternalError::Overflow)?;

        frame.stack.push_unchecked(result)?;
        Ok(StepAction::Advance)
    }

    // EXP operation
    pub fn op_exp(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let base = frame.stack.pop_unchecked()?;
        let exponent = frame.stack.pop_unchecked()?;

        frame.gas.charge(gas_cost::exp(exponent, &self.rules)?)?;

        let power = base.overflowing_pow(exponent).0;
        frame.stack.push_unchecked(power)?;
        Ok(StepAction::Advance)
    }

    // SIGNEXTEND operation
    pub fn op_signextend(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let byte_size = frame.stack.pop_unchecked()?;
        let value = frame.stack.pop_unchecked()?;

        // k of 31 and above already spans the full word.
        if byte_size >= U256::from(31) {
            frame.stack.push_unchecked(value)?;
            return Ok(StepAction::Advance);
        }

        let sign_bit = byte_size
            .low_u64()
            .saturating_mul(8)
            .saturating_add(7);
        let sign_bit_index = usize::try_from(sign_bit).map_err(|_| InternalError::Overflow)?;

        let mask = (U256::one() << sign_bit_index << 1usize).overflowing_sub(U256::one()).0;
        let result = if value.bit(sign_bit_index) {
            value | !mask
        } else {
            value & mask
        };

        frame.stack.push_unchecked(result)?;
        Ok(StepAction::Advance)
    }
}

/// The most significant bit doubles as the two's-complement sign.
pub(crate) fn is_negative(value: U256) -> bool {
    value.bit(255)
}

/// Two's-complement negation.
pub(crate) fn negate(value: U256) -> U256 {
    (!value).overflowing_add(U256::one()).0
}

pub(crate) fn abs(value: U256) -> U256 {
    if is_negative(value) {
        negate(value)
    } else {
        value
    }
}

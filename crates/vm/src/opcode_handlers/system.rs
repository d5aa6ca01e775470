use crate::{
    call_frame::CallFrame,
    constants::{CALL_DEPTH_LIMIT, CALL_STIPEND, GAS_CAP_DIVISOR, MAX_INITCODE_SIZE},
    errors::{ExecutionResult, ResultReason, StepAction, VMError},
    fork::Fork,
    gas_cost,
    host::{CallKind, CallParams},
    opcode_handlers::to_usize,
    vm::{word_to_address, VM},
};
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};

// System Operations (10)
// Opcodes: CREATE, CALL, CALLCODE, RETURN, DELEGATECALL, CREATE2,
// STATICCALL, REVERT, INVALID, SELFDESTRUCT

impl VM<'_> {
    // CALL operation
    pub fn op_call(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let gas_requested = frame.stack.pop_unchecked()?;
        let callee = word_to_address(frame.stack.pop_unchecked()?);
        let value = frame.stack.pop_unchecked()?;

        if frame.is_static && !value.is_zero() {
            return Err(VMError::StaticStateViolation);
        }

        let args_offset = to_usize(frame.stack.pop_unchecked()?)?;
        let args_size = to_usize(frame.stack.pop_unchecked()?)?;
        let ret_offset = to_usize(frame.stack.pop_unchecked()?)?;
        let ret_size = to_usize(frame.stack.pop_unchecked()?)?;

        let new_account = !value.is_zero() && !self.world.account_exists(callee);
        let msg_sender = frame.to;
        let is_static = frame.is_static;
        self.generic_call(
            frame,
            CallKind::Call,
            gas_requested,
            msg_sender,
            callee,
            callee,
            value,
            true,
            new_account,
            is_static,
            args_offset,
            args_size,
            ret_offset,
            ret_size,
        )
    }

    // CALLCODE operation
    pub fn op_callcode(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let gas_requested = frame.stack.pop_unchecked()?;
        let code_address = word_to_address(frame.stack.pop_unchecked()?);
        let value = frame.stack.pop_unchecked()?;
        let args_offset = to_usize(frame.stack.pop_unchecked()?)?;
        let args_size = to_usize(frame.stack.pop_unchecked()?)?;
        let ret_offset = to_usize(frame.stack.pop_unchecked()?)?;
        let ret_size = to_usize(frame.stack.pop_unchecked()?)?;

        // Runs foreign code against the caller's own account.
        let own_address = frame.to;
        let is_static = frame.is_static;
        self.generic_call(
            frame,
            CallKind::CallCode,
            gas_requested,
            own_address,
            own_address,
            code_address,
            value,
            true,
            false,
            is_static,
            args_offset,
            args_size,
            ret_offset,
            ret_size,
        )
    }

    // DELEGATECALL operation
    pub fn op_delegatecall(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let gas_requested = frame.stack.pop_unchecked()?;
        let code_address = word_to_address(frame.stack.pop_unchecked()?);
        let args_offset = to_usize(frame.stack.pop_unchecked()?)?;
        let args_size = to_usize(frame.stack.pop_unchecked()?)?;
        let ret_offset = to_usize(frame.stack.pop_unchecked()?)?;
        let ret_size = to_usize(frame.stack.pop_unchecked()?)?;

        // Keeps the parent's sender and value.
        let msg_sender = frame.msg_sender;
        let own_address = frame.to;
        let msg_value = frame.msg_value;
        let is_static = frame.is_static;
        self.generic_call(
            frame,
            CallKind::DelegateCall,
            gas_requested,
            msg_sender,
            own_address,
            code_address,
            msg_value,
            false,
            false,
            is_static,
            args_offset,
            args_size,
            ret_offset,
            ret_size,
        )
    }

    // STATICCALL operation
    pub fn op_staticcall(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let gas_requested = frame.stack.pop_unchecked()?;
        let callee = word_to_address(frame.stack.pop_unchecked()?);
        let args_offset = to_usize(frame.stack.pop_unchecked()?)?;
        let args_size = to_usize(frame.stack.pop_unchecked()?)?;
        let ret_offset = to_usize(frame.stack.pop_unchecked()?)?;
        let ret_size = to_usize(frame.stack.pop_unchecked()?)?;

        let msg_sender = frame.to;
        self.generic_call(
            frame,
            CallKind::StaticCall,
            gas_requested,
            msg_sender,
            callee,
            callee,
            U256::zero(),
            false,
            false,
            true,
            args_offset,
            args_size,
            ret_offset,
            ret_size,
        )
    }

    /// Shared tail of the CALL family: price the call, forward capped gas
    /// through the host, wire the child's return data back into memory and
    /// push the success flag.
    #[allow(clippy::too_many_arguments)]
    fn generic_call(
        &mut self,
        frame: &mut CallFrame,
        kind: CallKind,
        gas_requested: U256,
        msg_sender: Address,
        to: Address,
        code_address: Address,
        value: U256,
        transfers_value: bool,
        new_account: bool,
        is_static: bool,
        args_offset: usize,
        args_size: usize,
        ret_offset: usize,
        ret_size: usize,
    ) -> Result<StepAction, VMError> {
        let cold = self.access_account(code_address);

        let args_end = args_offset
            .checked_add(args_size)
            .ok_or(VMError::VeryLargeNumber)?;
        let ret_end = ret_offset
            .checked_add(ret_size)
            .ok_or(VMError::VeryLargeNumber)?;
        let args_needed = if args_size > 0 { args_end } else { 0 };
        let ret_needed = if ret_size > 0 { ret_end } else { 0 };
        let expansion = frame.memory.expansion_cost(0, args_needed.max(ret_needed))?;

        let mut cost = self
            .rules
            .call_access_cost(cold)
            .checked_add(expansion)
            .ok_or(VMError::OutOfGas)?;
        if transfers_value && !value.is_zero() {
            cost = cost
                .checked_add(gas_cost::CALL_VALUE_COST)
                .ok_or(VMError::OutOfGas)?;
        }
        if new_account {
            cost = cost
                .checked_add(gas_cost::CALL_NEW_ACCOUNT_COST)
                .ok_or(VMError::OutOfGas)?;
        }
        frame.gas.charge(cost)?;

        let input = Bytes::from(frame.memory.load_range(args_offset, args_size)?);
        // Pre-expand the return area; its cost is already in `expansion`.
        frame.memory.load_range(ret_offset, ret_size)?;

        if frame.depth.saturating_add(1) >= CALL_DEPTH_LIMIT {
            frame.sub_return_data = Bytes::new();
            frame.stack.push_unchecked(U256::zero())?;
            return Ok(StepAction::Advance);
        }

        let requested = u64::try_from(gas_requested).unwrap_or(u64::MAX);
        let forwarded = requested.min(all_but_one_64th(frame.gas.remaining()));
        frame.gas.charge(forwarded)?;

        let stipend = if transfers_value && !value.is_zero() {
            CALL_STIPEND
        } else {
            0
        };

        let result = self.host.call(CallParams {
            kind,
            caller: msg_sender,
            to,
            code_address,
            value,
            input,
            gas: forwarded.saturating_add(stipend),
            depth: frame.depth.saturating_add(1),
            is_static,
            salt: None,
        });

        frame.sub_return_data = result.output.clone();
        let copy_len = ret_size.min(result.output.len());
        if copy_len > 0 {
            let chunk = result
                .output
                .get(..copy_len)
                .ok_or(VMError::Internal(crate::errors::InternalError::SliceOutOfRange))?;
            frame.memory.store_bytes(ret_offset, chunk)?;
        }

        frame.gas.reclaim(result.gas_left);
        frame
            .gas
            .add_refund(i64::try_from(result.gas_refunded).unwrap_or(i64::MAX));

        let success = matches!(result.result, ExecutionResult::Success);
        frame
            .stack
            .push_unchecked(if success { U256::one() } else { U256::zero() })?;
        Ok(StepAction::Advance)
    }

    // CREATE / CREATE2 operation
    pub fn op_create(&mut self, frame: &mut CallFrame, salted: bool) -> Result<StepAction, VMError> {
        if frame.is_static {
            return Err(VMError::StaticStateViolation);
        }

        let value = frame.stack.pop_unchecked()?;
        let code_offset = to_usize(frame.stack.pop_unchecked()?)?;
        let code_size = to_usize(frame.stack.pop_unchecked()?)?;
        let salt = if salted {
            let word = frame.stack.pop_unchecked()?;
            let mut bytes = [0u8; 32];
            word.to_big_endian(&mut bytes);
            Some(H256::from(bytes))
        } else {
            None
        };

        if code_size > MAX_INITCODE_SIZE {
            return Err(VMError::CodeTooLarge);
        }

        let expansion = frame.memory.expansion_cost(code_offset, code_size)?;
        let mut cost = expansion;
        if self.rules.fork >= Fork::Shanghai {
            cost = cost
                .checked_add(gas_cost::initcode_words(code_size)?)
                .ok_or(VMError::OutOfGas)?;
        }
        if salted {
            cost = cost
                .checked_add(gas_cost::create2_hash_words(code_size)?)
                .ok_or(VMError::OutOfGas)?;
        }
        frame.gas.charge(cost)?;

        let initcode = Bytes::from(frame.memory.load_range(code_offset, code_size)?);

        if frame.depth.saturating_add(1) >= CALL_DEPTH_LIMIT {
            frame.sub_return_data = Bytes::new();
            frame.stack.push_unchecked(U256::zero())?;
            return Ok(StepAction::Advance);
        }

        let forwarded = all_but_one_64th(frame.gas.remaining());
        frame.gas.charge(forwarded)?;

        let kind = if salted {
            CallKind::Create2
        } else {
            CallKind::Create
        };
        let (result, created) = self.host.create(CallParams {
            kind,
            caller: frame.to,
            // The host derives the new account's address.
            to: Address::zero(),
            code_address: Address::zero(),
            value,
            input: initcode,
            gas: forwarded,
            depth: frame.depth.saturating_add(1),
            is_static: false,
            salt,
        });

        // Creation exposes return data only when the initcode reverted.
        frame.sub_return_data = match result.result {
            ExecutionResult::Revert => result.output.clone(),
            _ => Bytes::new(),
        };

        frame.gas.reclaim(result.gas_left);
        frame
            .gas
            .add_refund(i64::try_from(result.gas_refunded).unwrap_or(i64::MAX));

        let pushed = match (result.result.is_success(), created) {
            (true, Some(address)) => crate::vm::address_to_word(address),
            _ => U256::zero(),
        };
        frame.stack.push_unchecked(pushed)?;
        Ok(StepAction::Advance)
    }

    // RETURN operation
    pub fn op_return(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let offset = to_usize(frame.stack.pop_unchecked()?)?;
        let size = to_usize(frame.stack.pop_unchecked()?)?;
        frame.gas.charge(frame.memory.expansion_cost(offset, size)?)?;
        frame.output = Bytes::from(frame.memory.load_range(offset, size)?);
        Ok(StepAction::Halt(ResultReason::Return))
    }

    // REVERT operation
    pub fn op_revert(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let offset = to_usize(frame.stack.pop_unchecked()?)?;
        let size = to_usize(frame.stack.pop_unchecked()?)?;
        frame.gas.charge(frame.memory.expansion_cost(offset, size)?)?;
        frame.output = Bytes::from(frame.memory.load_range(offset, size)?);
        Err(VMError::RevertOpcode)
    }

    // SELFDESTRUCT operation
    pub fn op_selfdestruct(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        if frame.is_static {
            return Err(VMError::StaticStateViolation);
        }

        let beneficiary = word_to_address(frame.stack.pop_unchecked()?);
        let cold = self.access_account(beneficiary);
        let funds_lost = !self.world.account_exists(beneficiary)
            && !self.world.balance(frame.to).is_zero();
        frame
            .gas
            .charge(self.rules.selfdestruct_cost(cold, funds_lost))?;
        frame.gas.add_refund(self.rules.selfdestruct_refund());

        self.host.selfdestruct(frame.to, beneficiary);
        Ok(StepAction::Halt(ResultReason::SelfDestruct))
    }
}

/// EIP-150 cap on forwarded gas.
fn all_but_one_64th(remaining: u64) -> u64 {
    remaining.saturating_sub(remaining.checked_div(GAS_CAP_DIVISOR).unwrap_or(0))
}

use crate::{
    call_frame::CallFrame,
    constants::{
        CALL_DEPTH_LIMIT, DEBUG_STEP_CEILING, MAX_CODE_SIZE, MAX_INITCODE_SIZE, MAX_INPUT_SIZE,
        WORD_SIZE,
    },
    environment::Environment,
    errors::{CallResult, ExecutionResult, ResultReason, StepAction, VMError},
    fork::{ChainRules, Fork},
    host::{CallParams, Host, NoPrecompiles, PrecompileSet, WorldState},
    opcodes::Opcode,
    program::{Instruction, Program},
};
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// How the dispatch loop validates gas and stack bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecMode {
    /// Block preludes validate a whole basic block in one shot; handlers
    /// inside the block run on the unchecked primitives. Static jumps fuse.
    #[default]
    BlockValidated,
    /// Every instruction is checked and charged individually before its
    /// handler runs. Used for tracing/debugging; the preludes become inert.
    PerOpcode,
}

/// Addresses and storage slots touched so far; warm/cold pricing reads it.
/// Lives on the VM so warmth carries across the calls an embedder runs
/// through the same instance.
#[derive(Debug, Clone, Default)]
pub struct Substate {
    pub accessed_addresses: HashSet<Address>,
    pub accessed_storage_slots: HashMap<Address, HashSet<H256>>,
}

static NO_PRECOMPILES: NoPrecompiles = NoPrecompiles;

pub struct VM<'a> {
    pub env: Environment,
    pub rules: ChainRules,
    pub mode: ExecMode,
    pub world: &'a dyn WorldState,
    pub host: &'a dyn Host,
    pub precompiles: &'a dyn PrecompileSet,
    pub substate: Substate,
}

pub fn address_to_word(address: Address) -> U256 {
    let mut word = [0u8; WORD_SIZE];
    for (word_byte, address_byte) in word.iter_mut().skip(12).zip(address.as_bytes().iter()) {
        *word_byte = *address_byte;
    }
    U256::from_big_endian(&word)
}

pub fn word_to_address(word: U256) -> Address {
    let mut bytes = [0u8; WORD_SIZE];
    word.to_big_endian(&mut bytes);
    Address::from_slice(bytes.get(12..).unwrap_or(&[0u8; 20]))
}

impl<'a> VM<'a> {
    pub fn new(
        env: Environment,
        rules: ChainRules,
        mode: ExecMode,
        world: &'a dyn WorldState,
        host: &'a dyn Host,
    ) -> Self {
        Self {
            env,
            rules,
            mode,
            world,
            host,
            precompiles: &NO_PRECOMPILES,
            substate: Substate::default(),
        }
    }

    pub fn with_precompiles(mut self, precompiles: &'a dyn PrecompileSet) -> Self {
        self.precompiles = precompiles;
        self
    }

    /// Entry point for one message call or contract creation.
    ///
    /// Validates the resource limits, dispatches precompiles, translates the
    /// target code and runs the dispatch loop. The returned `Err` only
    /// carries interpreter bugs; every bytecode-level failure comes back as
    /// an unsuccessful [`CallResult`].
    pub fn call(&mut self, params: CallParams) -> Result<CallResult, VMError> {
        debug!(
            depth = params.depth,
            gas = params.gas,
            kind = ?params.kind,
            to = ?params.to,
            "call entry"
        );

        if params.gas == 0 {
            return Ok(CallResult::failure(VMError::OutOfGas));
        }
        if params.depth >= CALL_DEPTH_LIMIT {
            return Ok(CallResult::failure(VMError::DepthLimit));
        }
        if !params.is_create() && params.input.len() > MAX_INPUT_SIZE {
            return Ok(CallResult::failure(VMError::InputTooLarge));
        }

        let code = if params.is_create() {
            params.input.clone()
        } else {
            self.world.code(params.code_address)
        };
        let code_limit = if params.is_create() {
            MAX_INITCODE_SIZE
        } else {
            MAX_CODE_SIZE
        };
        if code.len() > code_limit {
            return Ok(CallResult::failure(VMError::CodeTooLarge));
        }

        let snapshot = self.host.create_snapshot();

        if !params.is_create() && self.precompiles.contains(params.code_address) {
            let (ok, gas_left, output) =
                self.precompiles
                    .run(params.code_address, &params.input, params.gas, params.is_static);
            if ok {
                return Ok(CallResult {
                    result: ExecutionResult::Success,
                    gas_left,
                    gas_refunded: 0,
                    output,
                });
            }
            self.host.revert_to_snapshot(snapshot);
            return Ok(CallResult::failure(VMError::PrecompileFailure));
        }

        self.prewarm(&params);

        let fuse = matches!(self.mode, ExecMode::BlockValidated);
        let program = Program::compile(code, &self.rules, fuse);

        let calldata = if params.is_create() {
            Bytes::new()
        } else {
            params.input.clone()
        };
        let mut frame = CallFrame::new(
            params.caller,
            params.to,
            params.code_address,
            params.value,
            calldata,
            params.is_static,
            params.gas,
            params.depth,
        );

        match self.execute(&mut frame, &program) {
            Ok(reason) => {
                trace!(?reason, gas_left = frame.gas.remaining(), "frame halted");
                Ok(CallResult {
                    result: ExecutionResult::Success,
                    gas_left: frame.gas.remaining(),
                    gas_refunded: frame.gas.refunded(),
                    output: frame.output,
                })
            }
            Err(error) if error.is_internal() => Err(error),
            Err(VMError::RevertOpcode) => {
                trace!(gas_left = frame.gas.remaining(), "frame reverted");
                self.host.revert_to_snapshot(snapshot);
                Ok(CallResult {
                    result: ExecutionResult::Revert,
                    gas_left: frame.gas.remaining(),
                    gas_refunded: 0,
                    output: frame.output,
                })
            }
            Err(error) => {
                trace!(?error, "frame failed");
                self.host.revert_to_snapshot(snapshot);
                Ok(CallResult::failure(error))
            }
        }
    }

    /// The dispatch loop: one match per instruction, jumps resolved through
    /// the pc→index map, halts mapped to a `ResultReason` or a `VMError`.
    fn execute(&mut self, frame: &mut CallFrame, program: &Program) -> Result<ResultReason, VMError> {
        let mut index = 0usize;
        let mut steps: u64 = 0;

        loop {
            steps = steps.saturating_add(1);
            debug_assert!(
                steps < DEBUG_STEP_CEILING,
                "dispatch loop ran {steps} steps at slot {index}; interpreter stuck"
            );

            // Running off the end of the stream is an implicit STOP.
            let Some(instruction) = program.instructions.get(index).copied() else {
                return Ok(ResultReason::Stop);
            };

            if self.mode == ExecMode::PerOpcode
                && !matches!(instruction, Instruction::BeginBlock(_))
            {
                self.check_and_charge(frame, program, index)?;
            }

            match self.step(frame, program, instruction)? {
                StepAction::Advance => {
                    index = index.saturating_add(1);
                }
                StepAction::Reenter => {
                    index = self.resolve_jump(frame, program)?;
                }
                StepAction::Halt(reason) => return Ok(reason),
            }
        }
    }

    /// Per-opcode mode: prove this instruction's arity and charge its
    /// constant gas before the handler runs, from the same properties table
    /// the analyzer used.
    fn check_and_charge(
        &self,
        frame: &mut CallFrame,
        program: &Program,
        index: usize,
    ) -> Result<(), VMError> {
        let Some(opcode) = program.opcodes.get(index).copied() else {
            return Ok(());
        };
        let props = opcode.properties();
        if frame.stack.len() < props.inputs {
            return Err(VMError::StackUnderflow);
        }
        let after = frame
            .stack
            .len()
            .saturating_sub(props.inputs)
            .saturating_add(props.outputs);
        if after > crate::constants::STACK_LIMIT {
            return Err(VMError::StackOverflow);
        }
        frame.gas.charge(props.gas)
    }

    /// Block prelude: one-shot validation of the whole block. After this
    /// succeeds, every opcode in the block runs without re-checking its
    /// arity or constant cost.
    fn op_begin_block(
        &mut self,
        frame: &mut CallFrame,
        program: &Program,
        block_index: u32,
    ) -> Result<StepAction, VMError> {
        if self.mode == ExecMode::PerOpcode {
            frame.block_gas_cost = 0;
            return Ok(StepAction::Advance);
        }

        let block = *program.block(block_index)?;
        frame.gas.charge(u64::from(block.gas_cost))?;

        let required = usize::try_from(block.stack_required.max(0)).unwrap_or(usize::MAX);
        if frame.stack.len() < required {
            return Err(VMError::StackUnderflow);
        }
        let growth = usize::try_from(block.stack_max_growth.max(0)).unwrap_or(usize::MAX);
        if frame.stack.len().saturating_add(growth) > crate::constants::STACK_LIMIT {
            return Err(VMError::StackOverflow);
        }

        frame.block_gas_cost = u64::from(block.gas_cost);
        Ok(StepAction::Advance)
    }

    /// A taken jump re-enters the stream through the pc→index map; landing
    /// anywhere but a JUMPDEST byte is fatal.
    fn resolve_jump(&self, frame: &CallFrame, program: &Program) -> Result<usize, VMError> {
        let dest = frame.pc;
        let jumpdest = u8::from(Opcode::JUMPDEST);
        if program.code.get(dest).copied() != Some(jumpdest) {
            trace!(dest, "invalid jump destination");
            return Err(VMError::InvalidJump);
        }
        program.index_of_pc(dest).ok_or(VMError::InvalidJump)
    }

    fn step(
        &mut self,
        frame: &mut CallFrame,
        program: &Program,
        instruction: Instruction,
    ) -> Result<StepAction, VMError> {
        use Instruction as I;

        match instruction {
            I::BeginBlock(block) => self.op_begin_block(frame, program, block),

            I::Stop => Ok(StepAction::Halt(ResultReason::Stop)),
            I::Add => self.op_add(frame),
            I::Mul => self.op_mul(frame),
            I::Sub => self.op_sub(frame),
            I::Div => self.op_div(frame),
            I::Sdiv => self.op_sdiv(frame),
            I::Mod => self.op_mod(frame),
            I::Smod => self.op_smod(frame),
            I::AddMod => self.op_addmod(frame),
            I::MulMod => self.op_mulmod(frame),
            I::Exp => self.op_exp(frame),
            I::SignExtend => self.op_signextend(frame),

            I::Lt => self.op_lt(frame),
            I::Gt => self.op_gt(frame),
            I::Slt => self.op_slt(frame),
            I::Sgt => self.op_sgt(frame),
            I::Eq => self.op_eq(frame),
            I::IsZero => self.op_iszero(frame),
            I::And => self.op_and(frame),
            I::Or => self.op_or(frame),
            I::Xor => self.op_xor(frame),
            I::Not => self.op_not(frame),
            I::Byte => self.op_byte(frame),
            I::Shl => self.op_shl(frame),
            I::Shr => self.op_shr(frame),
            I::Sar => self.op_sar(frame),

            I::Keccak256 => self.op_keccak256(frame),

            I::Address => self.op_address(frame),
            I::Balance => self.op_balance(frame),
            I::Origin => self.op_origin(frame),
            I::Caller => self.op_caller(frame),
            I::CallValue => self.op_callvalue(frame),
            I::CallDataLoad => self.op_calldataload(frame),
            I::CallDataSize => self.op_calldatasize(frame),
            I::CallDataCopy => self.op_calldatacopy(frame),
            I::CodeSize => self.op_codesize(frame, program),
            I::CodeCopy => self.op_codecopy(frame, program),
            I::GasPrice => self.op_gasprice(frame),
            I::ExtCodeSize => self.op_extcodesize(frame),
            I::ExtCodeCopy => self.op_extcodecopy(frame),
            I::ReturnDataSize => self.op_returndatasize(frame),
            I::ReturnDataCopy => self.op_returndatacopy(frame),
            I::ExtCodeHash => self.op_extcodehash(frame),

            I::BlockHash => self.op_blockhash(frame),
            I::Coinbase => self.op_coinbase(frame),
            I::Timestamp => self.op_timestamp(frame),
            I::Number => self.op_number(frame),
            I::PrevRandao => self.op_prevrandao(frame),
            I::GasLimit => self.op_gaslimit(frame),
            I::ChainId => self.op_chainid(frame),
            I::SelfBalance => self.op_selfbalance(frame),
            I::BaseFee => self.op_basefee(frame),
            I::BlobHash => self.op_blobhash(frame),
            I::BlobBaseFee => self.op_blobbasefee(frame),

            I::Pop => self.op_pop(frame),
            I::Mload => self.op_mload(frame),
            I::Mstore => self.op_mstore(frame),
            I::Mstore8 => self.op_mstore8(frame),
            I::Sload => self.op_sload(frame),
            I::Sstore => self.op_sstore(frame),
            I::Jump => self.op_jump(frame),
            I::Jumpi => self.op_jumpi(frame),
            I::Pc(offset) => self.op_pc(frame, offset),
            I::Msize => self.op_msize(frame),
            I::Gas(prefix) => self.op_gas(frame, prefix),
            I::Jumpdest => Ok(StepAction::Advance),
            I::Tload => self.op_tload(frame),
            I::Tstore => self.op_tstore(frame),
            I::Mcopy => self.op_mcopy(frame),

            I::Push(value) => self.op_push(frame, U256::from(value)),
            I::PushWide(index) => {
                let value = program.push_value(index)?;
                self.op_push(frame, value)
            }
            I::Dup(depth) => self.op_dup(frame, usize::from(depth)),
            I::Swap(depth) => self.op_swap(frame, usize::from(depth)),
            I::Log(topics) => self.op_log(frame, usize::from(topics)),

            I::Create => self.op_create(frame, false),
            I::Create2 => self.op_create(frame, true),
            I::Call => self.op_call(frame),
            I::CallCode => self.op_callcode(frame),
            I::DelegateCall => self.op_delegatecall(frame),
            I::StaticCall => self.op_staticcall(frame),
            I::Return => self.op_return(frame),
            I::Revert => self.op_revert(frame),
            I::Invalid => Err(VMError::InvalidOpcode),
            I::SelfDestruct => self.op_selfdestruct(frame),

            I::JumpTo(target) => self.op_jump_to(frame, target),
            I::JumpIfTo(target) => self.op_jump_if_to(frame, target),
        }
    }

    fn prewarm(&mut self, params: &CallParams) {
        self.substate.accessed_addresses.insert(self.env.origin);
        self.substate.accessed_addresses.insert(params.to);
        self.substate.accessed_addresses.insert(params.code_address);
        if self.rules.fork >= Fork::Shanghai {
            self.substate.accessed_addresses.insert(self.env.coinbase);
        }
        for address in self.precompiles.addresses() {
            self.substate.accessed_addresses.insert(address);
        }
    }

    /// Marks `address` as touched; true when it was cold.
    pub(crate) fn access_account(&mut self, address: Address) -> bool {
        self.substate.accessed_addresses.insert(address)
    }

    /// Marks a storage slot as touched; true when it was cold.
    pub(crate) fn access_storage_slot(&mut self, address: Address, key: H256) -> bool {
        self.substate
            .accessed_storage_slots
            .entry(address)
            .or_default()
            .insert(key)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn word_address_round_trip() {
        let address = Address::from_low_u64_be(0xDEAD_BEEF);
        assert_eq!(word_to_address(address_to_word(address)), address);
    }

    #[test]
    fn word_to_address_truncates_high_bytes() {
        let word = U256::MAX;
        let address = word_to_address(word);
        assert_eq!(address, Address::from_slice(&[0xFF; 20]));
    }
}

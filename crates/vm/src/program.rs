use crate::{
    analysis::{analyze, BlockInfo, CodeAnalysis},
    errors::{InternalError, VMError},
    fork::ChainRules,
    opcodes::Opcode,
};
use bytes::Bytes;
use ethereum_types::U256;

/// `pc_to_index` entry for offsets that are not an instruction start
/// (immediate bytes, and interior positions of fused pairs).
pub const PC_SENTINEL: u32 = u32::MAX;

/// One slot of the translated stream. A sum type instead of a raw handler
/// pointer: dispatch stays O(1) through the match in the execution loop, and
/// the record stays within 16 bytes (checked by a test below).
///
/// Payload-carrying variants:
/// - `BeginBlock`: block index, emitted at every basic-block start;
/// - `Push`: PUSH0..PUSH8 immediate inlined; `PushWide`: index into the
///   side table for PUSH9..PUSH32;
/// - `Pc`: the byte offset the PC opcode must report;
/// - `Gas`: constant gas of the enclosing block up to and including the GAS
///   opcode, so the handler can reconstruct the schedule-visible value;
/// - `Dup`/`Swap`/`Log`: the opcode's n;
/// - `JumpTo`/`JumpIfTo`: fused PUSH+JUMP(I) with a translation-validated
///   byte target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    BeginBlock(u32),

    Stop,
    Add,
    Mul,
    Sub,
    Div,
    Sdiv,
    Mod,
    Smod,
    AddMod,
    MulMod,
    Exp,
    SignExtend,

    Lt,
    Gt,
    Slt,
    Sgt,
    Eq,
    IsZero,
    And,
    Or,
    Xor,
    Not,
    Byte,
    Shl,
    Shr,
    Sar,

    Keccak256,

    Address,
    Balance,
    Origin,
    Caller,
    CallValue,
    CallDataLoad,
    CallDataSize,
    CallDataCopy,
    CodeSize,
    CodeCopy,
    GasPrice,
    ExtCodeSize,
    ExtCodeCopy,
    ReturnDataSize,
    ReturnDataCopy,
    ExtCodeHash,

    BlockHash,
    Coinbase,
    Timestamp,
    Number,
    PrevRandao,
    GasLimit,
    ChainId,
    SelfBalance,
    BaseFee,
    BlobHash,
    BlobBaseFee,

    Pop,
    Mload,
    Mstore,
    Mstore8,
    Sload,
    Sstore,
    Jump,
    Jumpi,
    Pc(u32),
    Msize,
    Gas(u32),
    Jumpdest,
    Tload,
    Tstore,
    Mcopy,

    Push(u64),
    PushWide(u32),
    Dup(u8),
    Swap(u8),
    Log(u8),

    Create,
    Call,
    CallCode,
    Return,
    DelegateCall,
    Create2,
    StaticCall,
    Revert,
    Invalid,
    SelfDestruct,

    JumpTo(u32),
    JumpIfTo(u32),
}

/// Bytecode translated for the dispatch loop, together with everything the
/// loop needs at run time: the pc→slot map for dynamic jumps, the wide-push
/// side table, the per-block requirements, and the original code (CODECOPY,
/// jump-target validation).
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub code: Bytes,
    pub instructions: Vec<Instruction>,
    /// Source opcode per slot; the per-opcode dispatch mode reads its arity
    /// and constant gas from here. Slots holding a block prelude are never
    /// consulted.
    pub opcodes: Vec<Opcode>,
    pub pc_to_index: Vec<u32>,
    pub push_values: Vec<U256>,
    pub blocks: Vec<BlockInfo>,
}

impl Program {
    /// Translate `code` under `rules`. `fuse_static_jumps` folds
    /// PUSH+JUMP / PUSH+JUMPI pairs with constant in-range JUMPDEST targets
    /// into single instructions; callers running the per-opcode checked mode
    /// pass `false` so the stream mirrors the bytecode one to one.
    pub fn compile(code: Bytes, rules: &ChainRules, fuse_static_jumps: bool) -> Program {
        let analysis = analyze(&code, rules);
        Translator {
            code: &code,
            rules,
            fuse_static_jumps,
            analysis: &analysis,
            instructions: Vec::new(),
            opcodes: Vec::new(),
            pc_to_index: vec![PC_SENTINEL; code.len()],
            push_values: Vec::new(),
            block_prefix_gas: 0,
        }
        .run(analysis.blocks.clone(), code.clone())
    }

    pub fn block(&self, index: u32) -> Result<&BlockInfo, VMError> {
        self.blocks
            .get(usize::try_from(index).map_err(|_| InternalError::MissingBlock)?)
            .ok_or(VMError::Internal(InternalError::MissingBlock))
    }

    pub fn push_value(&self, index: u32) -> Result<U256, VMError> {
        self.push_values
            .get(usize::try_from(index).map_err(|_| InternalError::MissingPushValue)?)
            .copied()
            .ok_or(VMError::Internal(InternalError::MissingPushValue))
    }

    /// Slot for a byte offset; `None` when the offset is no instruction
    /// start.
    pub fn index_of_pc(&self, pc: usize) -> Option<usize> {
        let index = self.pc_to_index.get(pc).copied()?;
        if index == PC_SENTINEL {
            return None;
        }
        usize::try_from(index).ok()
    }
}

struct Translator<'a> {
    code: &'a [u8],
    rules: &'a ChainRules,
    fuse_static_jumps: bool,
    analysis: &'a CodeAnalysis,
    instructions: Vec<Instruction>,
    opcodes: Vec<Opcode>,
    pc_to_index: Vec<u32>,
    push_values: Vec<U256>,
    block_prefix_gas: u64,
}

impl Translator<'_> {
    fn run(mut self, blocks: Vec<BlockInfo>, code: Bytes) -> Program {
        let mut pc = 0usize;
        while pc < self.code.len() {
            if self.analysis.block_starts.get(pc) {
                let block = self.analysis.pc_to_block.get(pc).copied().unwrap_or(0);
                self.map_pc(pc);
                self.emit(Instruction::BeginBlock(block), Opcode::STOP);
                self.block_prefix_gas = 0;
            } else {
                self.map_pc(pc);
            }

            let opcode = self
                .code
                .get(pc)
                .copied()
                .and_then(Opcode::from_byte)
                .filter(|op| self.rules.supports(*op));

            let Some(op) = opcode else {
                self.emit(Instruction::Invalid, Opcode::INVALID);
                pc = pc.saturating_add(1);
                continue;
            };

            self.block_prefix_gas = self.block_prefix_gas.saturating_add(op.properties().gas);

            if let Some(size) = op.push_size() {
                pc = self.translate_push(pc, size);
                continue;
            }

            let instruction = self.plain_instruction(op, pc);
            self.emit(instruction, op);
            pc = pc.saturating_add(1);
        }

        Program {
            code,
            instructions: self.instructions,
            opcodes: self.opcodes,
            pc_to_index: self.pc_to_index,
            push_values: self.push_values,
            blocks,
        }
    }

    /// PUSHn at `pc`: inline small immediates, side-table wide ones, and
    /// fuse a following JUMP/JUMPI when the constant target is a known-good
    /// JUMPDEST. Returns the next pc to translate.
    fn translate_push(&mut self, pc: usize, size: usize) -> usize {
        let imm_start = pc.saturating_add(1);
        let imm_end = imm_start.saturating_add(size).min(self.code.len());
        let immediate = self.code.get(imm_start..imm_end).unwrap_or(&[]);

        // A truncated PUSH reads as if the code were zero-extended, so the
        // immediate sits at the high end of its n-byte window and the
        // missing low bytes stay zero.
        let mut padded = [0u8; 32];
        let start = 32usize.saturating_sub(size);
        if let Some(target) = padded.get_mut(start..start.saturating_add(immediate.len())) {
            target.copy_from_slice(immediate);
        }
        let value = U256::from_big_endian(&padded);

        let next_pc = imm_start.saturating_add(size);

        if self.fuse_static_jumps {
            let following = self
                .code
                .get(next_pc)
                .copied()
                .and_then(Opcode::from_byte)
                .filter(|op| matches!(op, Opcode::JUMP | Opcode::JUMPI));
            if let Some(jump_op) = following {
                if let Some(target) = self.valid_static_target(value) {
                    self.block_prefix_gas = self
                        .block_prefix_gas
                        .saturating_add(jump_op.properties().gas);
                    let instruction = if jump_op == Opcode::JUMP {
                        Instruction::JumpTo(target)
                    } else {
                        Instruction::JumpIfTo(target)
                    };
                    self.emit(instruction, jump_op);
                    // The jump byte itself is interior to the fused pair.
                    return next_pc.saturating_add(1);
                }
            }
        }

        if size <= 8 {
            self.emit(Instruction::Push(value.low_u64()), self.push_opcode(size));
        } else {
            let index = u32::try_from(self.push_values.len()).unwrap_or(u32::MAX);
            self.push_values.push(value);
            self.emit(Instruction::PushWide(index), self.push_opcode(size));
        }
        next_pc
    }

    fn valid_static_target(&self, value: U256) -> Option<u32> {
        let target = usize::try_from(value).ok()?;
        if target < self.code.len() && self.analysis.jumpdests.get(target) {
            u32::try_from(target).ok()
        } else {
            None
        }
    }

    fn push_opcode(&self, size: usize) -> Opcode {
        u8::try_from(size)
            .ok()
            .and_then(|n| 0x5Fu8.checked_add(n))
            .and_then(Opcode::from_byte)
            .unwrap_or(Opcode::INVALID)
    }

    fn plain_instruction(&mut self, op: Opcode, pc: usize) -> Instruction {
        use Opcode::*;

        if let Some(depth) = op.dup_depth() {
            return Instruction::Dup(u8::try_from(depth).unwrap_or(u8::MAX));
        }
        if let Some(depth) = op.swap_depth() {
            return Instruction::Swap(u8::try_from(depth).unwrap_or(u8::MAX));
        }
        if let Some(topics) = op.log_topics() {
            return Instruction::Log(u8::try_from(topics).unwrap_or(u8::MAX));
        }

        match op {
            STOP => Instruction::Stop,
            ADD => Instruction::Add,
            MUL => Instruction::Mul,
            SUB => Instruction::Sub,
            DIV => Instruction::Div,
            SDIV => Instruction::Sdiv,
            MOD => Instruction::Mod,
            SMOD => Instruction::Smod,
            ADDMOD => Instruction::AddMod,
            MULMOD => Instruction::MulMod,
            EXP => Instruction::Exp,
            SIGNEXTEND => Instruction::SignExtend,
            LT => Instruction::Lt,
            GT => Instruction::Gt,
            SLT => Instruction::Slt,
            SGT => Instruction::Sgt,
            EQ => Instruction::Eq,
            ISZERO => Instruction::IsZero,
            AND => Instruction::And,
            OR => Instruction::Or,
            XOR => Instruction::Xor,
            NOT => Instruction::Not,
            BYTE => Instruction::Byte,
            SHL => Instruction::Shl,
            SHR => Instruction::Shr,
            SAR => Instruction::Sar,
            KECCAK256 => Instruction::Keccak256,
            ADDRESS => Instruction::Address,
            BALANCE => Instruction::Balance,
            ORIGIN => Instruction::Origin,
            CALLER => Instruction::Caller,
            CALLVALUE => Instruction::CallValue,
            CALLDATALOAD => Instruction::CallDataLoad,
            CALLDATASIZE => Instruction::CallDataSize,
            CALLDATACOPY => Instruction::CallDataCopy,
            CODESIZE => Instruction::CodeSize,
            CODECOPY => Instruction::CodeCopy,
            GASPRICE => Instruction::GasPrice,
            EXTCODESIZE => Instruction::ExtCodeSize,
            EXTCODECOPY => Instruction::ExtCodeCopy,
            RETURNDATASIZE => Instruction::ReturnDataSize,
            RETURNDATACOPY => Instruction::ReturnDataCopy,
            EXTCODEHASH => Instruction::ExtCodeHash,
            BLOCKHASH => Instruction::BlockHash,
            COINBASE => Instruction::Coinbase,
            TIMESTAMP => Instruction::Timestamp,
            NUMBER => Instruction::Number,
            PREVRANDAO => Instruction::PrevRandao,
            GASLIMIT => Instruction::GasLimit,
            CHAINID => Instruction::ChainId,
            SELFBALANCE => Instruction::SelfBalance,
            BASEFEE => Instruction::BaseFee,
            BLOBHASH => Instruction::BlobHash,
            BLOBBASEFEE => Instruction::BlobBaseFee,
            POP => Instruction::Pop,
            MLOAD => Instruction::Mload,
            MSTORE => Instruction::Mstore,
            MSTORE8 => Instruction::Mstore8,
            SLOAD => Instruction::Sload,
            SSTORE => Instruction::Sstore,
            JUMP => Instruction::Jump,
            JUMPI => Instruction::Jumpi,
            PC => Instruction::Pc(u32::try_from(pc).unwrap_or(u32::MAX)),
            MSIZE => Instruction::Msize,
            GAS => Instruction::Gas(u32::try_from(self.block_prefix_gas).unwrap_or(u32::MAX)),
            JUMPDEST => Instruction::Jumpdest,
            TLOAD => Instruction::Tload,
            TSTORE => Instruction::Tstore,
            MCOPY => Instruction::Mcopy,
            CREATE => Instruction::Create,
            CALL => Instruction::Call,
            CALLCODE => Instruction::CallCode,
            RETURN => Instruction::Return,
            DELEGATECALL => Instruction::DelegateCall,
            CREATE2 => Instruction::Create2,
            STATICCALL => Instruction::StaticCall,
            REVERT => Instruction::Revert,
            INVALID => Instruction::Invalid,
            SELFDESTRUCT => Instruction::SelfDestruct,
            // PUSH/DUP/SWAP/LOG are handled before this match.
            _ => Instruction::Invalid,
        }
    }

    fn emit(&mut self, instruction: Instruction, opcode: Opcode) {
        self.instructions.push(instruction);
        self.opcodes.push(opcode);
    }

    /// Point `pc` at the next slot to be emitted, unless it is already
    /// mapped (a JUMPDEST pc maps to its block prelude, emitted first).
    fn map_pc(&mut self, pc: usize) {
        if let Some(slot) = self.pc_to_index.get_mut(pc) {
            if *slot == PC_SENTINEL {
                *slot = u32::try_from(self.instructions.len()).unwrap_or(PC_SENTINEL);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    fn compile(code: &[u8]) -> Program {
        Program::compile(Bytes::copy_from_slice(code), &ChainRules::default(), false)
    }

    fn compile_fused(code: &[u8]) -> Program {
        Program::compile(Bytes::copy_from_slice(code), &ChainRules::default(), true)
    }

    #[test]
    fn instruction_record_stays_within_sixteen_bytes() {
        assert!(std::mem::size_of::<Instruction>() <= 16);
    }

    #[test]
    fn stream_starts_with_a_block_prelude() {
        // PUSH1 1 ; STOP
        let program = compile(&[0x60, 0x01, 0x00]);
        assert!(matches!(program.instructions[0], Instruction::BeginBlock(0)));
        assert_eq!(program.instructions[1], Instruction::Push(1));
        assert_eq!(program.instructions[2], Instruction::Stop);
    }

    #[test]
    fn pc_map_skips_immediates() {
        // PUSH2 0xAABB ; STOP
        let program = compile(&[0x61, 0xAA, 0xBB, 0x00]);
        assert_eq!(program.index_of_pc(0), Some(0));
        assert_eq!(program.index_of_pc(1), None);
        assert_eq!(program.index_of_pc(2), None);
        assert_eq!(program.index_of_pc(3), Some(2));
    }

    #[test]
    fn jumpdest_pc_maps_to_its_prelude() {
        // STOP ; JUMPDEST ; STOP
        let program = compile(&[0x00, 0x5B, 0x00]);
        let slot = program.index_of_pc(1).unwrap();
        assert!(matches!(program.instructions[slot], Instruction::BeginBlock(1)));
        assert_eq!(program.instructions[slot + 1], Instruction::Jumpdest);
    }

    #[test]
    fn small_pushes_inline_and_wide_pushes_use_the_side_table() {
        // PUSH8 <8 bytes> ; PUSH9 <9 bytes> ; STOP
        let mut code = vec![0x67];
        code.extend_from_slice(&[0x11; 8]);
        code.push(0x68);
        code.extend_from_slice(&[0x22; 9]);
        code.push(0x00);
        let program = compile(&code);
        assert_eq!(program.instructions[1], Instruction::Push(0x1111111111111111));
        assert_eq!(program.instructions[2], Instruction::PushWide(0));
        assert_eq!(
            program.push_values[0],
            U256::from_big_endian(&[0x22; 9])
        );
    }

    #[test]
    fn truncated_push_is_zero_extended() {
        // PUSH2 with a single immediate byte: value 0xAA00.
        let program = compile(&[0x61, 0xAA]);
        assert_eq!(program.instructions[1], Instruction::Push(0xAA00));
    }

    #[test]
    fn push0_before_shanghai_is_invalid() {
        let rules = ChainRules::new(crate::fork::Fork::London);
        let program = Program::compile(Bytes::from_static(&[0x5F, 0x00]), &rules, false);
        assert_eq!(program.instructions[1], Instruction::Invalid);
        assert_eq!(program.opcodes[1], Opcode::INVALID);
    }

    #[test]
    fn gas_payload_counts_the_block_prefix_through_itself() {
        // PUSH1 1 ; POP ; GAS ; STOP → 3 + 2 + 2
        let program = compile(&[0x60, 0x01, 0x50, 0x5A, 0x00]);
        assert_eq!(program.instructions[3], Instruction::Gas(7));
    }

    #[test]
    fn static_jump_to_a_jumpdest_fuses() {
        // PUSH1 3 ; JUMP ; JUMPDEST ; STOP
        let program = compile_fused(&[0x60, 0x03, 0x56, 0x5B, 0x00]);
        assert_eq!(program.instructions[1], Instruction::JumpTo(3));
        // The jump byte is interior to the fusion.
        assert_eq!(program.index_of_pc(2), None);
        // Unfused translation keeps the pair.
        let plain = compile(&[0x60, 0x03, 0x56, 0x5B, 0x00]);
        assert_eq!(plain.instructions[1], Instruction::Push(3));
        assert_eq!(plain.instructions[2], Instruction::Jump);
    }

    #[test]
    fn static_jump_to_a_bad_target_stays_unfused() {
        // PUSH1 4 ; JUMP ; STOP ; PUSH1 0xFF, where pc 4 is push data.
        let program = compile_fused(&[0x60, 0x04, 0x56, 0x00, 0x60, 0xFF]);
        assert_eq!(program.instructions[1], Instruction::Push(4));
        assert_eq!(program.instructions[2], Instruction::Jump);
    }

    #[test]
    fn conditional_static_jump_fuses_to_its_own_variant() {
        // PUSH1 4 ; JUMPI ; STOP ; JUMPDEST ; STOP
        let program = compile_fused(&[0x60, 0x04, 0x57, 0x00, 0x5B, 0x00]);
        assert_eq!(program.instructions[1], Instruction::JumpIfTo(4));
    }
}

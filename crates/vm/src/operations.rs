//! A tiny assembler used by the test suites to spell out bytecode as a list
//! of operations instead of raw hex.

use crate::{errors::VMError, opcodes::Opcode};
use bytes::Bytes;
use ethereum_types::U256;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Operation {
    Stop,
    Add,
    Mul,
    Sub,
    Div,
    Sdiv,
    Mod,
    SMod,
    Addmod,
    Mulmod,
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
    Callvalue,
    CallDataLoad,
    CallDataSize,
    CallDataCopy,
    Codesize,
    Codecopy,
    Gasprice,
    ExtcodeSize,
    ExtcodeCopy,
    ReturnDataSize,
    ReturnDataCopy,
    ExtcodeHash,
    BlockHash,
    Coinbase,
    Timestamp,
    Number,
    Prevrandao,
    Gaslimit,
    Chainid,
    SelfBalance,
    Basefee,
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
    PC,
    Msize,
    Gas,
    Jumpdest,
    Tload,
    Tstore,
    Mcopy,
    Push0,
    /// (n, value): PUSHn with `value` encoded in exactly n bytes.
    Push((u8, U256)),
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
}

impl Operation {
    pub fn to_bytecode(&self) -> Result<Bytes, VMError> {
        fn single(opcode: Opcode) -> Bytes {
            Bytes::copy_from_slice(&[u8::from(opcode)])
        }

        let bytecode = match self {
            Operation::Stop => single(Opcode::STOP),
            Operation::Add => single(Opcode::ADD),
            Operation::Mul => single(Opcode::MUL),
            Operation::Sub => single(Opcode::SUB),
            Operation::Div => single(Opcode::DIV),
            Operation::Sdiv => single(Opcode::SDIV),
            Operation::Mod => single(Opcode::MOD),
            Operation::SMod => single(Opcode::SMOD),
            Operation::Addmod => single(Opcode::ADDMOD),
            Operation::Mulmod => single(Opcode::MULMOD),
            Operation::Exp => single(Opcode::EXP),
            Operation::SignExtend => single(Opcode::SIGNEXTEND),
            Operation::Lt => single(Opcode::LT),
            Operation::Gt => single(Opcode::GT),
            Operation::Slt => single(Opcode::SLT),
            Operation::Sgt => single(Opcode::SGT),
            Operation::Eq => single(Opcode::EQ),
            Operation::IsZero => single(Opcode::ISZERO),
            Operation::And => single(Opcode::AND),
            Operation::Or => single(Opcode::OR),
            Operation::Xor => single(Opcode::XOR),
            Operation::Not => single(Opcode::NOT),
            Operation::Byte => single(Opcode::BYTE),
            Operation::Shl => single(Opcode::SHL),
            Operation::Shr => single(Opcode::SHR),
            Operation::Sar => single(Opcode::SAR),
            Operation::Keccak256 => single(Opcode::KECCAK256),
            Operation::Address => single(Opcode::ADDRESS),
            Operation::Balance => single(Opcode::BALANCE),
            Operation::Origin => single(Opcode::ORIGIN),
            Operation::Caller => single(Opcode::CALLER),
            Operation::Callvalue => single(Opcode::CALLVALUE),
            Operation::CallDataLoad => single(Opcode::CALLDATALOAD),
            Operation::CallDataSize => single(Opcode::CALLDATASIZE),
            Operation::CallDataCopy => single(Opcode::CALLDATACOPY),
            Operation::Codesize => single(Opcode::CODESIZE),
            Operation::Codecopy => single(Opcode::CODECOPY),
            Operation::Gasprice => single(Opcode::GASPRICE),
            Operation::ExtcodeSize => single(Opcode::EXTCODESIZE),
            Operation::ExtcodeCopy => single(Opcode::EXTCODECOPY),
            Operation::ReturnDataSize => single(Opcode::RETURNDATASIZE),
            Operation::ReturnDataCopy => single(Opcode::RETURNDATACOPY),
            Operation::ExtcodeHash => single(Opcode::EXTCODEHASH),
            Operation::BlockHash => single(Opcode::BLOCKHASH),
            Operation::Coinbase => single(Opcode::COINBASE),
            Operation::Timestamp => single(Opcode::TIMESTAMP),
            Operation::Number => single(Opcode::NUMBER),
            Operation::Prevrandao => single(Opcode::PREVRANDAO),
            Operation::Gaslimit => single(Opcode::GASLIMIT),
            Operation::Chainid => single(Opcode::CHAINID),
            Operation::SelfBalance => single(Opcode::SELFBALANCE),
            Operation::Basefee => single(Opcode::BASEFEE),
            Operation::BlobHash => single(Opcode::BLOBHASH),
            Operation::BlobBaseFee => single(Opcode::BLOBBASEFEE),
            Operation::Pop => single(Opcode::POP),
            Operation::Mload => single(Opcode::MLOAD),
            Operation::Mstore => single(Opcode::MSTORE),
            Operation::Mstore8 => single(Opcode::MSTORE8),
            Operation::Sload => single(Opcode::SLOAD),
            Operation::Sstore => single(Opcode::SSTORE),
            Operation::Jump => single(Opcode::JUMP),
            Operation::Jumpi => single(Opcode::JUMPI),
            Operation::PC => single(Opcode::PC),
            Operation::Msize => single(Opcode::MSIZE),
            Operation::Gas => single(Opcode::GAS),
            Operation::Jumpdest => single(Opcode::JUMPDEST),
            Operation::Tload => single(Opcode::TLOAD),
            Operation::Tstore => single(Opcode::TSTORE),
            Operation::Mcopy => single(Opcode::MCOPY),
            Operation::Push0 => single(Opcode::PUSH0),
            Operation::Push((n, value)) => {
                let size = usize::from(*n);
                if size == 0 || size > 32 {
                    return Err(VMError::VeryLargeNumber);
                }
                if value.bits().div_ceil(8) > size {
                    return Err(VMError::VeryLargeNumber);
                }
                let mut word = [0u8; 32];
                value.to_big_endian(&mut word);
                let immediate = word
                    .get(32usize.saturating_sub(size)..)
                    .ok_or(VMError::VeryLargeNumber)?;
                let opcode_byte = 0x5Fu8
                    .checked_add(*n)
                    .ok_or(VMError::VeryLargeNumber)?;
                let mut bytes = vec![opcode_byte];
                bytes.extend_from_slice(immediate);
                Bytes::from(bytes)
            }
            Operation::Dup(n) => {
                if *n == 0 || *n > 16 {
                    return Err(VMError::VeryLargeNumber);
                }
                let byte = 0x7Fu8.checked_add(*n).ok_or(VMError::VeryLargeNumber)?;
                Bytes::copy_from_slice(&[byte])
            }
            Operation::Swap(n) => {
                if *n == 0 || *n > 16 {
                    return Err(VMError::VeryLargeNumber);
                }
                let byte = 0x8Fu8.checked_add(*n).ok_or(VMError::VeryLargeNumber)?;
                Bytes::copy_from_slice(&[byte])
            }
            Operation::Log(n) => {
                if *n > 4 {
                    return Err(VMError::VeryLargeNumber);
                }
                let byte = 0xA0u8.checked_add(*n).ok_or(VMError::VeryLargeNumber)?;
                Bytes::copy_from_slice(&[byte])
            }
            Operation::Create => single(Opcode::CREATE),
            Operation::Call => single(Opcode::CALL),
            Operation::CallCode => single(Opcode::CALLCODE),
            Operation::Return => single(Opcode::RETURN),
            Operation::DelegateCall => single(Opcode::DELEGATECALL),
            Operation::Create2 => single(Opcode::CREATE2),
            Operation::StaticCall => single(Opcode::STATICCALL),
            Operation::Revert => single(Opcode::REVERT),
            Operation::Invalid => single(Opcode::INVALID),
            Operation::SelfDestruct => single(Opcode::SELFDESTRUCT),
        };
        Ok(bytecode)
    }
}

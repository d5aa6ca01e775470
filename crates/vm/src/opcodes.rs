use crate::fork::Fork;

/// Every opcode assigned up to Cancun. Bytes outside this set translate to
/// an unconditional invalid-opcode halt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Opcode {
    // Stop and Arithmetic Operations
    STOP = 0x00,
    ADD = 0x01,
    MUL = 0x02,
    SUB = 0x03,
    DIV = 0x04,
    SDIV = 0x05,
    MOD = 0x06,
    SMOD = 0x07,
    ADDMOD = 0x08,
    MULMOD = 0x09,
    EXP = 0x0A,
    SIGNEXTEND = 0x0B,

    // Comparison & Bitwise Logic Operations
    LT = 0x10,
    GT = 0x11,
    SLT = 0x12,
    SGT = 0x13,
    EQ = 0x14,
    ISZERO = 0x15,
    AND = 0x16,
    OR = 0x17,
    XOR = 0x18,
    NOT = 0x19,
    BYTE = 0x1A,
    SHL = 0x1B,
    SHR = 0x1C,
    SAR = 0x1D,

    KECCAK256 = 0x20,

    // Environmental Information
    ADDRESS = 0x30,
    BALANCE = 0x31,
    ORIGIN = 0x32,
    CALLER = 0x33,
    CALLVALUE = 0x34,
    CALLDATALOAD = 0x35,
    CALLDATASIZE = 0x36,
    CALLDATACOPY = 0x37,
    CODESIZE = 0x38,
    CODECOPY = 0x39,
    GASPRICE = 0x3A,
    EXTCODESIZE = 0x3B,
    EXTCODECOPY = 0x3C,
    RETURNDATASIZE = 0x3D,
    RETURNDATACOPY = 0x3E,
    EXTCODEHASH = 0x3F,

    // Block Information
    BLOCKHASH = 0x40,
    COINBASE = 0x41,
    TIMESTAMP = 0x42,
    NUMBER = 0x43,
    PREVRANDAO = 0x44,
    GASLIMIT = 0x45,
    CHAINID = 0x46,
    SELFBALANCE = 0x47,
    BASEFEE = 0x48,
    BLOBHASH = 0x49,
    BLOBBASEFEE = 0x4A,

    // Stack, Memory, Storage, and Flow Operations
    POP = 0x50,
    MLOAD = 0x51,
    MSTORE = 0x52,
    MSTORE8 = 0x53,
    SLOAD = 0x54,
    SSTORE = 0x55,
    JUMP = 0x56,
    JUMPI = 0x57,
    PC = 0x58,
    MSIZE = 0x59,
    GAS = 0x5A,
    JUMPDEST = 0x5B,
    TLOAD = 0x5C,
    TSTORE = 0x5D,
    MCOPY = 0x5E,

    // Push Operations
    PUSH0 = 0x5F,
    PUSH1 = 0x60,
    PUSH2 = 0x61,
    PUSH3 = 0x62,
    PUSH4 = 0x63,
    PUSH5 = 0x64,
    PUSH6 = 0x65,
    PUSH7 = 0x66,
    PUSH8 = 0x67,
    PUSH9 = 0x68,
    PUSH10 = 0x69,
    PUSH11 = 0x6A,
    PUSH12 = 0x6B,
    PUSH13 = 0x6C,
    PUSH14 = 0x6D,
    PUSH15 = 0x6E,
    PUSH16 = 0x6F,
    PUSH17 = 0x70,
    PUSH18 = 0x71,
    PUSH19 = 0x72,
    PUSH20 = 0x73,
    PUSH21 = 0x74,
    PUSH22 = 0x75,
    PUSH23 = 0x76,
    PUSH24 = 0x77,
    PUSH25 = 0x78,
    PUSH26 = 0x79,
    PUSH27 = 0x7A,
    PUSH28 = 0x7B,
    PUSH29 = 0x7C,
    PUSH30 = 0x7D,
    PUSH31 = 0x7E,
    PUSH32 = 0x7F,

    // Duplication Operations
    DUP1 = 0x80,
    DUP2 = 0x81,
    DUP3 = 0x82,
    DUP4 = 0x83,
    DUP5 = 0x84,
    DUP6 = 0x85,
    DUP7 = 0x86,
    DUP8 = 0x87,
    DUP9 = 0x88,
    DUP10 = 0x89,
    DUP11 = 0x8A,
    DUP12 = 0x8B,
    DUP13 = 0x8C,
    DUP14 = 0x8D,
    DUP15 = 0x8E,
    DUP16 = 0x8F,

    // Swap Operations
    SWAP1 = 0x90,
    SWAP2 = 0x91,
    SWAP3 = 0x92,
    SWAP4 = 0x93,
    SWAP5 = 0x94,
    SWAP6 = 0x95,
    SWAP7 = 0x96,
    SWAP8 = 0x97,
    SWAP9 = 0x98,
    SWAP10 = 0x99,
    SWAP11 = 0x9A,
    SWAP12 = 0x9B,
    SWAP13 = 0x9C,
    SWAP14 = 0x9D,
    SWAP15 = 0x9E,
    SWAP16 = 0x9F,

    // Logging Operations
    LOG0 = 0xA0,
    LOG1 = 0xA1,
    LOG2 = 0xA2,
    LOG3 = 0xA3,
    LOG4 = 0xA4,

    // System Operations
    CREATE = 0xF0,
    CALL = 0xF1,
    CALLCODE = 0xF2,
    RETURN = 0xF3,
    DELEGATECALL = 0xF4,
    CREATE2 = 0xF5,
    STATICCALL = 0xFA,
    REVERT = 0xFD,
    INVALID = 0xFE,
    SELFDESTRUCT = 0xFF,
}

/// Static per-opcode facts shared by the analyzer, the translator and the
/// per-opcode dispatch checks: stack arity and the constant gas portion.
/// Opcodes whose whole cost depends on runtime state (storage, account
/// access, calls) carry 0 here and are charged entirely by their handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeInfo {
    pub inputs: usize,
    pub outputs: usize,
    pub gas: u64,
}

const fn info(inputs: usize, outputs: usize, gas: u64) -> OpcodeInfo {
    OpcodeInfo {
        inputs,
        outputs,
        gas,
    }
}

#[allow(clippy::as_conversions)]
impl From<Opcode> for u8 {
    fn from(opcode: Opcode) -> u8 {
        opcode as u8
    }
}

impl Opcode {
    pub fn from_byte(byte: u8) -> Option<Opcode> {
        use Opcode::*;
        let opcode = match byte {
            0x00 => STOP,
            0x01 => ADD,
            0x02 => MUL,
            0x03 => SUB,
            0x04 => DIV,
            0x05 => SDIV,
            0x06 => MOD,
            0x07 => SMOD,
            0x08 => ADDMOD,
            0x09 => MULMOD,
            0x0A => EXP,
            0x0B => SIGNEXTEND,
            0x10 => LT,
            0x11 => GT,
            0x12 => SLT,
            0x13 => SGT,
            0x14 => EQ,
            0x15 => ISZERO,
            0x16 => AND,
            0x17 => OR,
            0x18 => XOR,
            0x19 => NOT,
            0x1A => BYTE,
            0x1B => SHL,
            0x1C => SHR,
            0x1D => SAR,
            0x20 => KECCAK256,
            0x30 => ADDRESS,
            0x31 => BALANCE,
            0x32 => ORIGIN,
            0x33 => CALLER,
            0x34 => CALLVALUE,
            0x35 => CALLDATALOAD,
            0x36 => CALLDATASIZE,
            0x37 => CALLDATACOPY,
            0x38 => CODESIZE,
            0x39 => CODECOPY,
            0x3A => GASPRICE,
            0x3B => EXTCODESIZE,
            0x3C => EXTCODECOPY,
            0x3D => RETURNDATASIZE,
            0x3E => RETURNDATACOPY,
            0x3F => EXTCODEHASH,
            0x40 => BLOCKHASH,
            0x41 => COINBASE,
            0x42 => TIMESTAMP,
            0x43 => NUMBER,
            0x44 => PREVRANDAO,
            0x45 => GASLIMIT,
            0x46 => CHAINID,
            0x47 => SELFBALANCE,
            0x48 => BASEFEE,
            0x49 => BLOBHASH,
            0x4A => BLOBBASEFEE,
            0x50 => POP,
            0x51 => MLOAD,
            0x52 => MSTORE,
            0x53 => MSTORE8,
            0x54 => SLOAD,
            0x55 => SSTORE,
            0x56 => JUMP,
            0x57 => JUMPI,
            0x58 => PC,
            0x59 => MSIZE,
            0x5A => GAS,
            0x5B => JUMPDEST,
            0x5C => TLOAD,
            0x5D => TSTORE,
            0x5E => MCOPY,
            0x5F => PUSH0,
            0x60 => PUSH1,
            0x61 => PUSH2,
            0x62 => PUSH3,
            0x63 => PUSH4,
            0x64 => PUSH5,
            0x65 => PUSH6,
            0x66 => PUSH7,
            0x67 => PUSH8,
            0x68 => PUSH9,
            0x69 => PUSH10,
            0x6A => PUSH11,
            0x6B => PUSH12,
            0x6C => PUSH13,
            0x6D => PUSH14,
            0x6E => PUSH15,
            0x6F => PUSH16,
            0x70 => PUSH17,
            0x71 => PUSH18,
            0x72 => PUSH19,
            0x73 => PUSH20,
            0x74 => PUSH21,
            0x75 => PUSH22,
            0x76 => PUSH23,
            0x77 => PUSH24,
            0x78 => PUSH25,
            0x79 => PUSH26,
            0x7A => PUSH27,
            0x7B => PUSH28,
            0x7C => PUSH29,
            0x7D => PUSH30,
            0x7E => PUSH31,
            0x7F => PUSH32,
            0x80 => DUP1,
            0x81 => DUP2,
            0x82 => DUP3,
            0x83 => DUP4,
            0x84 => DUP5,
            0x85 => DUP6,
            0x86 => DUP7,
            0x87 => DUP8,
            0x88 => DUP9,
            0x89 => DUP10,
            0x8A => DUP11,
            0x8B => DUP12,
            0x8C => DUP13,
            0x8D => DUP14,
            0x8E => DUP15,
            0x8F => DUP16,
            0x90 => SWAP1,
            0x91 => SWAP2,
            0x92 => SWAP3,
            0x93 => SWAP4,
            0x94 => SWAP5,
            0x95 => SWAP6,
            0x96 => SWAP7,
            0x97 => SWAP8,
            0x98 => SWAP9,
            0x99 => SWAP10,
            0x9A => SWAP11,
            0x9B => SWAP12,
            0x9C => SWAP13,
            0x9D => SWAP14,
            0x9E => SWAP15,
            0x9F => SWAP16,
            0xA0 => LOG0,
            0xA1 => LOG1,
            0xA2 => LOG2,
            0xA3 => LOG3,
            0xA4 => LOG4,
            0xF0 => CREATE,
            0xF1 => CALL,
            0xF2 => CALLCODE,
            0xF3 => RETURN,
            0xF4 => DELEGATECALL,
            0xF5 => CREATE2,
            0xFA => STATICCALL,
            0xFD => REVERT,
            0xFE => INVALID,
            0xFF => SELFDESTRUCT,
            _ => return None,
        };
        Some(opcode)
    }

    /// `Some(n)` for PUSHn (PUSH0 gives 0): the number of immediate bytes.
    pub fn push_size(self) -> Option<usize> {
        let byte = u8::from(self);
        if (0x5F..=0x7F).contains(&byte) {
            byte.checked_sub(0x5F).map(usize::from)
        } else {
            None
        }
    }

    /// `Some(n)` for DUPn, 1-based.
    pub fn dup_depth(self) -> Option<usize> {
        let byte = u8::from(self);
        if (0x80..=0x8F).contains(&byte) {
            byte.checked_sub(0x7F).map(usize::from)
        } else {
            None
        }
    }

    /// `Some(n)` for SWAPn, 1-based.
    pub fn swap_depth(self) -> Option<usize> {
        let byte = u8::from(self);
        if (0x90..=0x9F).contains(&byte) {
            byte.checked_sub(0x8F).map(usize::from)
        } else {
            None
        }
    }

    /// `Some(n)` for LOGn.
    pub fn log_topics(self) -> Option<usize> {
        let byte = u8::from(self);
        if (0xA0..=0xA4).contains(&byte) {
            byte.checked_sub(0xA0).map(usize::from)
        } else {
            None
        }
    }

    /// Whether the byte after this opcode starts a new basic block.
    pub fn ends_block(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            JUMP | JUMPI | STOP | RETURN | REVERT | INVALID | SELFDESTRUCT
        )
    }

    pub fn introduced_in(self) -> Fork {
        use Opcode::*;
        match self {
            DELEGATECALL => Fork::Homestead,
            RETURNDATASIZE | RETURNDATACOPY | STATICCALL | REVERT => Fork::Byzantium,
            SHL | SHR | SAR | CREATE2 | EXTCODEHASH => Fork::Constantinople,
            CHAINID | SELFBALANCE => Fork::Istanbul,
            BASEFEE => Fork::London,
            PUSH0 => Fork::Shanghai,
            TLOAD | TSTORE | MCOPY | BLOBHASH | BLOBBASEFEE => Fork::Cancun,
            _ => Fork::Frontier,
        }
    }

    pub fn properties(self) -> OpcodeInfo {
        use Opcode::*;

        if let Some(size) = self.push_size() {
            let gas = if size == 0 { 2 } else { 3 };
            return info(0, 1, gas);
        }
        if let Some(depth) = self.dup_depth() {
            return info(depth, depth.saturating_add(1), 3);
        }
        if let Some(depth) = self.swap_depth() {
            let touched = depth.saturating_add(1);
            return info(touched, touched, 3);
        }
        if let Some(topics) = self.log_topics() {
            let static_gas = 375u64.saturating_add(375u64.saturating_mul(topics_to_u64(topics)));
            return info(topics.saturating_add(2), 0, static_gas);
        }

        match self {
            STOP | INVALID => info(0, 0, 0),
            ADD | SUB => info(2, 1, 3),
            MUL | DIV | SDIV | MOD | SMOD | SIGNEXTEND => info(2, 1, 5),
            ADDMOD | MULMOD => info(3, 1, 8),
            EXP => info(2, 1, 10),
            LT | GT | SLT | SGT | EQ | AND | OR | XOR | BYTE | SHL | SHR | SAR => info(2, 1, 3),
            ISZERO | NOT => info(1, 1, 3),
            KECCAK256 => info(2, 1, 30),
            ADDRESS | ORIGIN | CALLER | CALLVALUE | CALLDATASIZE | CODESIZE | GASPRICE
            | RETURNDATASIZE | COINBASE | TIMESTAMP | NUMBER | PREVRANDAO | GASLIMIT | CHAINID
            | BASEFEE | BLOBBASEFEE | PC | MSIZE | GAS => info(0, 1, 2),
            SELFBALANCE => info(0, 1, 5),
            BALANCE | EXTCODESIZE | EXTCODEHASH | SLOAD => info(1, 1, 0),
            CALLDATALOAD => info(1, 1, 3),
            CALLDATACOPY | CODECOPY | RETURNDATACOPY => info(3, 0, 3),
            EXTCODECOPY => info(4, 0, 0),
            BLOCKHASH => info(1, 1, 20),
            BLOBHASH => info(1, 1, 3),
            POP => info(1, 0, 2),
            MLOAD => info(1, 1, 3),
            MSTORE | MSTORE8 => info(2, 0, 3),
            SSTORE => info(2, 0, 0),
            JUMP => info(1, 0, 8),
            JUMPI => info(2, 0, 10),
            JUMPDEST => info(0, 0, 1),
            TLOAD => info(1, 1, 100),
            TSTORE => info(2, 0, 100),
            MCOPY => info(3, 0, 3),
            CREATE => info(3, 1, 32000),
            CREATE2 => info(4, 1, 32000),
            CALL | CALLCODE => info(7, 1, 0),
            DELEGATECALL | STATICCALL => info(6, 1, 0),
            RETURN | REVERT => info(2, 0, 0),
            SELFDESTRUCT => info(1, 0, 0),
            // Covered by the push/dup/swap/log short-circuits above.
            _ => info(0, 0, 0),
        }
    }
}

fn topics_to_u64(topics: usize) -> u64 {
    u64::try_from(topics).unwrap_or(0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn push_sizes() {
        assert_eq!(Opcode::PUSH0.push_size(), Some(0));
        assert_eq!(Opcode::PUSH1.push_size(), Some(1));
        assert_eq!(Opcode::PUSH32.push_size(), Some(32));
        assert_eq!(Opcode::ADD.push_size(), None);
    }

    #[test]
    fn dup_swap_log_indices() {
        assert_eq!(Opcode::DUP1.dup_depth(), Some(1));
        assert_eq!(Opcode::DUP16.dup_depth(), Some(16));
        assert_eq!(Opcode::SWAP1.swap_depth(), Some(1));
        assert_eq!(Opcode::SWAP16.swap_depth(), Some(16));
        assert_eq!(Opcode::LOG0.log_topics(), Some(0));
        assert_eq!(Opcode::LOG4.log_topics(), Some(4));
    }

    #[test]
    fn every_assigned_byte_round_trips() {
        for byte in 0u8..=0xFF {
            if let Some(opcode) = Opcode::from_byte(byte) {
                assert_eq!(u8::from(opcode), byte);
            }
        }
    }

    #[test]
    fn unassigned_bytes_are_unknown() {
        for byte in [0x0Cu8, 0x1E, 0x21, 0x4B, 0xA5, 0xEF, 0xF6, 0xFB] {
            assert!(Opcode::from_byte(byte).is_none());
        }
    }

    #[test]
    fn arity_spot_checks() {
        assert_eq!(Opcode::ADD.properties().inputs, 2);
        assert_eq!(Opcode::ADDMOD.properties().inputs, 3);
        assert_eq!(Opcode::DUP3.properties().outputs, 4);
        assert_eq!(Opcode::SWAP2.properties().inputs, 3);
        assert_eq!(Opcode::LOG2.properties().inputs, 4);
        assert_eq!(Opcode::LOG2.properties().gas, 375 + 750);
        assert_eq!(Opcode::CALL.properties().inputs, 7);
        assert_eq!(Opcode::PUSH0.properties().gas, 2);
        assert_eq!(Opcode::PUSH7.properties().gas, 3);
    }
}

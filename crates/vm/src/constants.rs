pub const WORD_SIZE: usize = 32;

pub const STACK_LIMIT: usize = 1024;

pub const CALL_DEPTH_LIMIT: usize = 1024;

/// EIP-170 runtime code ceiling.
pub const MAX_CODE_SIZE: usize = 0x6000;
/// EIP-3860 initcode ceiling.
pub const MAX_INITCODE_SIZE: usize = 2 * MAX_CODE_SIZE;

pub const MAX_INPUT_SIZE: usize = 128 * 1024;

pub const MEMORY_EXPANSION_QUOTIENT: u64 = 512;

/// Gas handed to the callee on top of the forwarded amount when a CALL
/// transfers value.
pub const CALL_STIPEND: u64 = 2300;

/// EIP-150: a frame may forward at most 63/64 of its remaining gas.
pub const GAS_CAP_DIVISOR: u64 = 64;

/// BLOCKHASH serves only the most recent 256 blocks.
pub const BLOCKHASH_WINDOW: u64 = 256;

/// Iteration ceiling for the dispatch loop in debug builds. A single frame
/// that spins past this many instructions points at an interpreter bug, not
/// slow bytecode.
pub const DEBUG_STEP_CEILING: u64 = 10_000_000;

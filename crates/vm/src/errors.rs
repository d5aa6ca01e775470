use bytes::Bytes;

/// Errors that halt the current frame.
///
/// Everything except [`VMError::RevertOpcode`] consumes the frame's
/// remaining gas. `Internal` means the interpreter itself is broken and is
/// propagated out of `VM::call` instead of being folded into a result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, thiserror::Error)]
pub enum VMError {
    #[error("stack underflow")]
    StackUnderflow,
    #[error("stack overflow")]
    StackOverflow,
    #[error("out of gas")]
    OutOfGas,
    #[error("jump to an invalid destination")]
    InvalidJump,
    #[error("invalid or unassigned opcode")]
    InvalidOpcode,
    #[error("state mutation inside a static call")]
    StaticStateViolation,
    #[error("revert opcode executed")]
    RevertOpcode,
    #[error("call depth limit reached")]
    DepthLimit,
    #[error("code size above limit")]
    CodeTooLarge,
    #[error("input size above limit")]
    InputTooLarge,
    #[error("operand does not fit in a machine word")]
    VeryLargeNumber,
    #[error("return data slice out of bounds")]
    ReturnDataOutOfBounds,
    #[error("precompiled contract failed")]
    PrecompileFailure,
    #[error("internal error: {0}")]
    Internal(#[from] InternalError),
}

/// Interpreter bugs. These are never a property of the executed bytecode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, thiserror::Error)]
pub enum InternalError {
    #[error("stack accessed past a proven bound")]
    StackBoundProven,
    #[error("arithmetic overflow in interpreter bookkeeping")]
    Overflow,
    #[error("instruction references a missing block")]
    MissingBlock,
    #[error("instruction references a missing push value")]
    MissingPushValue,
    #[error("slice bounds already validated were out of range")]
    SliceOutOfRange,
}

impl VMError {
    pub fn is_internal(&self) -> bool {
        matches!(self, VMError::Internal(_))
    }

    /// Whether this failure burns the frame's remaining gas.
    pub fn consumes_all_gas(&self) -> bool {
        !matches!(self, VMError::RevertOpcode)
    }
}

/// What a handler tells the dispatch loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    /// Execute the next slot in the instruction stream.
    Advance,
    /// The handler stored a byte offset in `frame.pc`; resolve it through
    /// the pc-to-index map and continue there.
    Reenter,
    /// Leave the loop successfully.
    Halt(ResultReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultReason {
    Stop,
    Return,
    SelfDestruct,
}

/// Outcome of one call as seen by the embedder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    Success,
    /// REVERT: remaining gas and the revert buffer are preserved.
    Revert,
    /// Any other halt: all gas consumed, no output.
    Failure(VMError),
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallResult {
    pub result: ExecutionResult,
    pub gas_left: u64,
    pub gas_refunded: u64,
    pub output: Bytes,
}

impl CallResult {
    pub fn failure(error: VMError) -> Self {
        Self {
            result: ExecutionResult::Failure(error),
            gas_left: 0,
            gas_refunded: 0,
            output: Bytes::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }
}

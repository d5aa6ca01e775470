use crate::{
    call_frame::CallFrame,
    errors::{StepAction, VMError},
    vm::VM,
};

// Exchange Operations (16)
// Opcodes: SWAP1 .. SWAP16

impl VM<'_> {
    // SWAPn operation
    pub fn op_swap(&mut self, frame: &mut CallFrame, depth: usize) -> Result<StepAction, VMError> {
        frame.stack.swap_unchecked(depth)?;
        Ok(StepAction::Advance)
    }
}

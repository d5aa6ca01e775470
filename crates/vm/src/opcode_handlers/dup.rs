use crate::{
    call_frame::CallFrame,
    errors::{StepAction, VMError},
    vm::VM,
};

// Duplication Operations (16)
// Opcodes: DUP1 .. DUP16

impl VM<'_> {
    // DUPn operation
    pub fn op_dup(&mut self, frame: &mut CallFrame, depth: usize) -> Result<StepAction, VMError> {
        frame.stack.dup_unchecked(depth)?;
        Ok(StepAction::Advance)
    }
}

use crate::{
    call_frame::CallFrame,
    errors::{StepAction, VMError},
    vm::VM,
};
use ethereum_types::U256;

// Push Operations (33)
// Opcodes: PUSH0, PUSH1 .. PUSH32

impl VM<'_> {
    // PUSHn operation; the translator already materialized the immediate.
    pub fn op_push(&mut self, frame: &mut CallFrame, value: U256) -> Result<StepAction, VMError> {
        frame.stack.push_unchecked(value)?;
        Ok(StepAction::Advance)
    }
}

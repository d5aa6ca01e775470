use crate::{
    call_frame::CallFrame,
    errors::{StepAction, VMError},
    gas_cost,
    host::Log,
    opcode_handlers::to_usize,
    vm::VM,
};
use bytes::Bytes;
use ethereum_types::H256;

// Logging Operations (5)
// Opcodes: LOG0 .. LOG4

impl VM<'_> {
    // LOGn operation
    pub fn op_log(&mut self, frame: &mut CallFrame, topics: usize) -> Result<StepAction, VMError> {
        if frame.is_static {
            return Err(VMError::StaticStateViolation);
        }

        let offset = to_usize(frame.stack.pop_unchecked()?)?;
        let size = to_usize(frame.stack.pop_unchecked()?)?;

        let mut topic_words = Vec::with_capacity(topics);
        for _ in 0..topics {
            let word = frame.stack.pop_unchecked()?;
            let mut bytes = [0u8; 32];
            word.to_big_endian(&mut bytes);
            topic_words.push(H256::from(bytes));
        }

        let expansion = frame.memory.expansion_cost(offset, size)?;
        let data_cost = gas_cost::log_data(size)?;
        frame
            .gas
            .charge(expansion.checked_add(data_cost).ok_or(VMError::OutOfGas)?)?;

        let data = frame.memory.load_range(offset, size)?;
        self.host.emit_log(Log {
            address: frame.to,
            topics: topic_words,
            data: Bytes::from(data),
        });
        Ok(StepAction::Advance)
    }
}

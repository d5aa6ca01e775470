use crate::{
    call_frame::CallFrame,
    constants::BLOCKHASH_WINDOW,
    errors::{StepAction, VMError},
    vm::{address_to_word, VM},
};
use ethereum_types::U256;

// Block Information (11)
// Opcodes: BLOCKHASH, COINBASE, TIMESTAMP, NUMBER, PREVRANDAO, GASLIMIT,
// CHAINID, SELFBALANCE, BASEFEE, BLOBHASH, BLOBBASEFEE

impl VM<'_> {
    // BLOCKHASH operation
    pub fn op_blockhash(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let requested = frame.stack.pop_unchecked()?;
        let current = self.env.block_number;

        let in_window = requested < current
            && current.saturating_sub(requested) <= U256::from(BLOCKHASH_WINDOW);
        let hash = if in_window {
            let number = requested.low_u64();
            U256::from_big_endian(self.world.block_hash(number).as_bytes())
        } else {
            U256::zero()
        };

        frame.stack.push_unchecked(hash)?;
        Ok(StepAction::Advance)
    }

    // COINBASE operation
    pub fn op_coinbase(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        frame
            .stack
            .push_unchecked(address_to_word(self.env.coinbase))?;
        Ok(StepAction::Advance)
    }

    // TIMESTAMP operation
    pub fn op_timestamp(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        frame.stack.push_unchecked(self.env.timestamp)?;
        Ok(StepAction::Advance)
    }

    // NUMBER operation
    pub fn op_number(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        frame.stack.push_unchecked(self.env.block_number)?;
        Ok(StepAction::Advance)
    }

    // PREVRANDAO operation
    pub fn op_prevrandao(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        frame
            .stack
            .push_unchecked(U256::from_big_endian(self.env.prevrandao.as_bytes()))?;
        Ok(StepAction::Advance)
    }

    // GASLIMIT operation
    pub fn op_gaslimit(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        frame
            .stack
            .push_unchecked(U256::from(self.env.block_gas_limit))?;
        Ok(StepAction::Advance)
    }

    // CHAINID operation
    pub fn op_chainid(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        frame.stack.push_unchecked(self.env.chain_id)?;
        Ok(StepAction::Advance)
    }

    // SELFBALANCE operation
    pub fn op_selfbalance(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        frame.stack.push_unchecked(self.world.balance(frame.to))?;
        Ok(StepAction::Advance)
    }

    // BASEFEE operation
    pub fn op_basefee(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        frame.stack.push_unchecked(self.env.base_fee_per_gas)?;
        Ok(StepAction::Advance)
    }

    // BLOBHASH operation
    pub fn op_blobhash(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        let index = frame.stack.pop_unchecked()?;
        let hash = usize::try_from(index)
            .ok()
            .and_then(|i| self.env.blob_hashes.get(i))
            .map(|hash| U256::from_big_endian(hash.as_bytes()))
            .unwrap_or_default();
        frame.stack.push_unchecked(hash)?;
        Ok(StepAction::Advance)
    }

    // BLOBBASEFEE operation
    pub fn op_blobbasefee(&mut self, frame: &mut CallFrame) -> Result<StepAction, VMError> {
        frame.stack.push_unchecked(self.env.blob_base_fee)?;
        Ok(StepAction::Advance)
    }
}

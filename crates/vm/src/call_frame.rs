use crate::{gas::GasMeter, memory::Memory, stack::Stack};
use bytes::Bytes;
use ethereum_types::{Address, U256};

/// Per-call execution state: the context the engine is currently running
/// in. Created at call entry, consumed when the frame halts; the buffers
/// move into the returned `CallResult`.
#[derive(Debug, Clone, Default)]
pub struct CallFrame {
    pub gas: GasMeter,
    /// Byte offset used to communicate jump targets to the dispatch loop;
    /// only jump handlers write it.
    pub pc: usize,
    /// Address of the account that sent the message.
    pub msg_sender: Address,
    /// Account whose storage/balance context this frame runs in.
    pub to: Address,
    /// Account whose code is executing. Differs from `to` under
    /// DELEGATECALL/CALLCODE.
    pub code_address: Address,
    /// Value sent along with the message.
    pub msg_value: U256,
    pub stack: Stack,
    pub memory: Memory,
    pub calldata: Bytes,
    /// RETURN/REVERT buffer of this frame.
    pub output: Bytes,
    /// Return data of the most recent nested call.
    pub sub_return_data: Bytes,
    /// Static frames refuse every state mutation.
    pub is_static: bool,
    pub depth: usize,
    /// Constant gas the current block's prelude deducted; the GAS opcode
    /// adds the not-yet-executed share back to report the schedule-visible
    /// value.
    pub block_gas_cost: u64,
}

impl CallFrame {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        msg_sender: Address,
        to: Address,
        code_address: Address,
        msg_value: U256,
        calldata: Bytes,
        is_static: bool,
        gas_limit: u64,
        depth: usize,
    ) -> Self {
        Self {
            gas: GasMeter::new(gas_limit),
            msg_sender,
            to,
            code_address,
            msg_value,
            calldata,
            is_static,
            depth,
            ..Default::default()
        }
    }
}

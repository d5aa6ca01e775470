use crate::{fork::ChainRules, opcodes::Opcode};

/// One bit per byte of code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bitmap {
    bits: Vec<u64>,
    len: usize,
}

impl Bitmap {
    pub fn new(len: usize) -> Self {
        Self {
            bits: vec![0; len.div_ceil(64)],
            len,
        }
    }

    pub fn set(&mut self, index: usize) {
        if index >= self.len {
            return;
        }
        if let Some(word) = self.bits.get_mut(index / 64) {
            *word |= 1u64 << (index % 64);
        }
    }

    pub fn get(&self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        self.bits
            .get(index / 64)
            .map(|word| word & (1u64 << (index % 64)) != 0)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Pre-computed requirements of one basic block, validated in a single shot
/// by the block prelude instruction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockInfo {
    /// Sum of the constant gas of every opcode in the block.
    pub gas_cost: u32,
    /// Stack items that must exist on entry for every opcode to meet its
    /// arity.
    pub stack_required: i16,
    /// Highest net stack growth reached inside the block; entry height plus
    /// this must stay within the 1024 limit.
    pub stack_max_growth: i16,
}

#[derive(Debug, Clone, Default)]
pub struct CodeAnalysis {
    pub jumpdests: Bitmap,
    pub block_starts: Bitmap,
    pub blocks: Vec<BlockInfo>,
    /// Block index for every code offset (immediate bytes inherit their
    /// opcode's block). Used by the translator and by debugging lookups.
    pub pc_to_block: Vec<u32>,
}

/// A byte is an opcode iff it is not inside a PUSH immediate; the scan must
/// skip immediates before classifying anything.
fn opcode_at(code: &[u8], pc: usize) -> Option<Opcode> {
    code.get(pc).copied().and_then(Opcode::from_byte)
}

/// Single linear pass over `code`: JUMPDEST bitmap, block boundaries, and
/// per-block gas and stack bounds.
///
/// Blocks start at offset 0, at every JUMPDEST, and right after
/// JUMP/JUMPI/STOP/RETURN/REVERT/INVALID/SELFDESTRUCT. Bytes that are not
/// assigned in the active fork behave like INVALID: zero constant gas and a
/// block boundary after them. Dynamic jumps are never rejected here; bad
/// targets fail at execution time.
pub fn analyze(code: &[u8], rules: &ChainRules) -> CodeAnalysis {
    let mut jumpdests = Bitmap::new(code.len());
    let mut block_starts = Bitmap::new(code.len());
    let mut blocks: Vec<BlockInfo> = Vec::new();
    let mut pc_to_block = vec![0u32; code.len()];

    // First sweep: mark jumpdests and block starts, skipping push data.
    let mut pc = 0usize;
    let mut boundary_pending = true;
    while pc < code.len() {
        let opcode = opcode_at(code, pc);
        if boundary_pending || opcode == Some(Opcode::JUMPDEST) {
            block_starts.set(pc);
            boundary_pending = false;
        }
        match opcode {
            Some(Opcode::JUMPDEST) => {
                jumpdests.set(pc);
                pc = pc.saturating_add(1);
            }
            Some(op) if rules.supports(op) => {
                let immediates = op.push_size().unwrap_or(0);
                if op.ends_block() {
                    boundary_pending = true;
                }
                pc = pc.saturating_add(1).saturating_add(immediates);
            }
            // Unassigned or not-yet-active byte: halts unconditionally.
            _ => {
                boundary_pending = true;
                pc = pc.saturating_add(1);
            }
        }
    }

    // Second sweep: accumulate each block's constant gas and stack bounds.
    let mut pc = 0usize;
    let mut gas: u64 = 0;
    let mut delta: i32 = 0;
    let mut delta_min: i32 = 0;
    let mut delta_max: i32 = 0;

    let mut flush = |blocks: &mut Vec<BlockInfo>,
                     gas: &mut u64,
                     delta: &mut i32,
                     delta_min: &mut i32,
                     delta_max: &mut i32| {
        if let Some(block) = blocks.last_mut() {
            block.gas_cost = u32::try_from(*gas).unwrap_or(u32::MAX);
            block.stack_required =
                i16::try_from(delta_min.checked_neg().unwrap_or(i32::MAX)).unwrap_or(i16::MAX);
            block.stack_max_growth = i16::try_from((*delta_max).max(0)).unwrap_or(i16::MAX);
        }
        *gas = 0;
        *delta = 0;
        *delta_min = 0;
        *delta_max = 0;
    };

    while pc < code.len() {
        if block_starts.get(pc) {
            flush(&mut blocks, &mut gas, &mut delta, &mut delta_min, &mut delta_max);
            blocks.push(BlockInfo::default());
        }
        let block_index = u32::try_from(blocks.len().saturating_sub(1)).unwrap_or(u32::MAX);

        let opcode = opcode_at(code, pc).filter(|op| rules.supports(*op));
        let (inputs, outputs, constant_gas, immediates) = match opcode {
            Some(op) => {
                let props = op.properties();
                (props.inputs, props.outputs, props.gas, op.push_size().unwrap_or(0))
            }
            None => (0, 0, 0, 0),
        };

        let span_end = pc.saturating_add(1).saturating_add(immediates).min(code.len());
        for offset in pc..span_end {
            if let Some(slot) = pc_to_block.get_mut(offset) {
                *slot = block_index;
            }
        }

        gas = gas.saturating_add(constant_gas);
        let inputs = i32::try_from(inputs).unwrap_or(i32::MAX);
        let outputs = i32::try_from(outputs).unwrap_or(i32::MAX);
        delta_min = delta_min.min(delta.saturating_sub(inputs));
        delta = delta.saturating_sub(inputs).saturating_add(outputs);
        delta_max = delta_max.max(delta);

        pc = span_end;
    }
    flush(&mut blocks, &mut gas, &mut delta, &mut delta_min, &mut delta_max);

    CodeAnalysis {
        jumpdests,
        block_starts,
        blocks,
        pc_to_block,
    }
}

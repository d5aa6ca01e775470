//! An EVM bytecode interpreter built around basic-block pre-validation.
//!
//! Code is analyzed once into basic blocks with pre-computed gas and stack
//! bounds, then translated into a linear instruction stream the dispatch
//! loop executes. A synthetic prelude instruction at each block start
//! validates the whole block's requirements in one shot, so the handlers
//! inside the block run without per-opcode checks; a per-opcode checked
//! mode exists for tracing and as the differential-test oracle. Persistent
//! state, nested-call orchestration and precompile bodies live behind the
//! [`host::WorldState`], [`host::Host`] and [`host::PrecompileSet`] traits.

pub mod analysis;
pub mod call_frame;
pub mod constants;
pub mod db;
pub mod environment;
pub mod errors;
pub mod fork;
pub mod gas;
pub mod gas_cost;
pub mod host;
pub mod memory;
pub mod opcode_handlers;
pub mod opcodes;
pub mod operations;
pub mod program;
pub mod stack;
pub mod utils;
pub mod vm;

pub use environment::Environment;
pub use errors::{CallResult, ExecutionResult, VMError};
pub use fork::{ChainRules, Fork};
pub use host::{CallKind, CallParams, Host, PrecompileSet, WorldState};
pub use vm::{ExecMode, VM};

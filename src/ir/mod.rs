//! The SSA IR: graph, block, instruction data model, construction API,
//! and the read-only textual dump.

pub mod block;
pub mod builder;
pub mod dump;
pub mod graph;
pub mod instruction;
pub mod types;

pub use block::BasicBlock;
pub use builder::Builder;
pub use dump::dump_graph;
pub use graph::Graph;
pub use instruction::{BinaryOp, Instruction, InstructionData, Opcode};
pub use types::{ConstValue, Type};

//! A compiler middle-end toolkit: an SSA-form control-flow graph, the
//! dominator, natural-loop and linear-scan liveness analyses built on
//! top of it, a small fixed-point local optimizer, and a structural
//! verifier.
//!
//! The pieces are independent: `dominator_tree` and `loop_analysis`
//! are pure functions of a `Graph` snapshot, `liveness` additionally
//! stamps each instruction's `life_pos`, and `optimizer` mutates the
//! graph in place. None of them depend on a particular target or
//! calling convention; this crate stops at the IR and its analyses.

pub mod dominator_tree;
pub mod entity;
pub mod ir;
pub mod liveness;
pub mod loop_analysis;
pub mod optimizer;
pub mod result;
pub mod verifier;

pub use dominator_tree::DominatorTree;
pub use entity::{BlockId, EntityRef, InstId, PrimaryMap, SecondaryMap};
pub use ir::{dump_graph, BasicBlock, Builder, ConstValue, Graph, Instruction, InstructionData, Type};
pub use liveness::{LiveInterval, LiveRange, Liveness};
pub use loop_analysis::{Loop, LoopForest, LoopId};
pub use result::{AnyEntity, CodegenError, CodegenResult, VerifierError, VerifierErrors};

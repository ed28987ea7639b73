//! Read-only textual dump, for diagnostics only. The exact bytes are
//! not a stable interface; only the structure described in the format
//! below is.
//!
//! ```text
//! BB<id>
//!   ; preds: BB<id> BB<id>  ; succs: BB<id> BB<id>
//!   v<id>.<ty> = <op> <operands>
//! ```

use std::fmt::Write;

use crate::ir::graph::Graph;
use crate::ir::instruction::{Instruction, InstructionData};

pub fn dump_graph(graph: &Graph) -> String {
    let mut out = String::new();
    for block in graph.blocks() {
        let bb = graph.block(block);
        writeln!(out, "{}", block).unwrap();
        write!(out, "  ; preds:").unwrap();
        for p in &bb.preds {
            write!(out, " {}", p).unwrap();
        }
        write!(out, "  ; succs:").unwrap();
        for s in &bb.succs {
            write!(out, " {}", s).unwrap();
        }
        writeln!(out).unwrap();
        for id in graph.block_insts(block) {
            writeln!(out, "  {}", dump_inst(graph.inst(id))).unwrap();
        }
    }
    out
}

fn dump_inst(inst: &Instruction) -> String {
    let operands = dump_operands(&inst.data);
    if operands.is_empty() {
        format!("{}{} = {}", inst.id, inst.ty, inst.opcode().name())
    } else {
        format!("{}{} = {} {}", inst.id, inst.ty, inst.opcode().name(), operands)
    }
}

fn dump_operands(data: &InstructionData) -> String {
    match data {
        InstructionData::Param => String::new(),
        InstructionData::Const(value) => format!("{}", value),
        InstructionData::Binary { lhs, rhs, .. } => format!("{}, {}", lhs, rhs),
        InstructionData::Jump { target } => format!("{}", target),
        InstructionData::If {
            cond,
            then_block,
            else_block,
        } => format!("{}, {}, {}", cond, then_block, else_block),
        InstructionData::Phi { preds, values } => preds
            .iter()
            .zip(values.iter())
            .map(|(p, v)| format!("[ {}, {} ]", p, v))
            .collect::<Vec<_>>()
            .join(", "),
        InstructionData::Ret { value } => match value {
            Some(v) => format!("{}", v),
            None => String::new(),
        },
    }
}

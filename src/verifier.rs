//! Structural verification: checks the invariants the IR's data model
//! promises, without mutating anything. Not wired into the builder or
//! optimizer automatically; callers run it explicitly.

use crate::dominator_tree::DominatorTree;
use crate::ir::{Graph, InstructionData};
use crate::result::{CodegenResult, VerifierErrors};

/// Checks predecessor/successor symmetry, phi-before-non-phi ordering,
/// terminator placement and shape, phi arity, and (if `doms` is
/// supplied) that every reachable non-entry block's immediate
/// dominator strictly dominates it.
pub fn verify_graph(graph: &Graph, doms: Option<&DominatorTree>) -> CodegenResult<()> {
    let mut errors = VerifierErrors::new();

    for block in graph.blocks() {
        let bb = graph.block(block);

        for &succ in &bb.succs {
            if !graph.block(succ).preds.contains(&block) {
                errors.push(block, format!("successor {} does not list this block as a predecessor", succ));
            }
        }
        for &pred in &bb.preds {
            if !graph.block(pred).succs.contains(&block) {
                errors.push(block, format!("predecessor {} does not list this block as a successor", pred));
            }
        }

        let insts = graph.block_insts(block);
        let mut seen_non_phi = false;
        for &id in &insts {
            let is_phi = graph.inst(id).is_phi();
            if is_phi && seen_non_phi {
                errors.push(id, "phi instruction follows a non-phi instruction in its block");
            }
            if !is_phi {
                seen_non_phi = true;
            }
        }

        if let Some(&tail) = insts.last() {
            let tail_inst = graph.inst(tail);
            if !tail_inst.is_terminator() {
                errors.push(tail, "last instruction in block is not a terminator");
            }
            match &tail_inst.data {
                InstructionData::Jump { target } => {
                    if bb.succs != [*target] {
                        errors.push(tail, "Jump's successor list does not match its target");
                    }
                }
                InstructionData::If { then_block, else_block, .. } => {
                    if bb.succs != [*then_block, *else_block] {
                        errors.push(tail, "If's successor list does not match its then/else targets");
                    }
                }
                InstructionData::Ret { .. } => {
                    if !bb.succs.is_empty() {
                        errors.push(tail, "Ret block has successors");
                    }
                }
                _ => {}
            }
        } else if !bb.preds.is_empty() || !bb.succs.is_empty() {
            errors.push(block, "block with edges has no instructions at all");
        }

        for &id in &insts {
            if let InstructionData::Phi { preds, values } = &graph.inst(id).data {
                if preds.len() != values.len() {
                    errors.push(id, "phi's predecessor and value lists differ in length");
                }
                if preds.len() == bb.preds.len() {
                    for p in preds {
                        if !bb.preds.contains(p) {
                            errors.push(id, format!("phi operand names {} which is not a predecessor of its block", p));
                        }
                    }
                } else {
                    errors.push(
                        id,
                        format!("phi has {} operand(s) but its block has {} predecessor(s)", preds.len(), bb.preds.len()),
                    );
                }
            }
        }
    }

    if let Some(doms) = doms {
        for block in graph.blocks() {
            if Some(block) == doms.entry() || !doms.is_reachable(block) {
                continue;
            }
            match doms.idom(block) {
                Some(idom) if idom == block => {
                    errors.push(block, "block is recorded as its own immediate dominator");
                }
                Some(idom) if !doms.dominates(idom, block) => {
                    errors.push(block, format!("immediate dominator {} does not dominate this block", idom));
                }
                None => {
                    errors.push(block, "reachable non-entry block has no immediate dominator");
                }
                _ => {}
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::Type;
    use crate::ir::Builder;

    #[test]
    fn well_formed_diamond_verifies_clean() {
        let mut g = Graph::new();
        let a = g.create_block();
        let b = g.create_block();
        let c = g.create_block();
        let d = g.create_block();
        {
            let mut bld = Builder::new(&mut g);
            bld.set_insert_point(a);
            let cond = bld.create_parameter(Type::Int32);
            bld.create_if(cond, b, c);
            bld.set_insert_point(b);
            bld.create_jump(d);
            bld.set_insert_point(c);
            bld.create_jump(d);
            bld.set_insert_point(d);
            bld.create_return(None);
        }
        let doms = DominatorTree::compute(&g);
        assert!(verify_graph(&g, Some(&doms)).is_ok());
    }

    #[test]
    fn phi_arity_mismatch_is_reported() {
        let mut g = Graph::new();
        let a = g.create_block();
        let b = g.create_block();
        let c = g.create_block();
        let d = g.create_block();
        let phi;
        {
            let mut bld = Builder::new(&mut g);
            bld.set_insert_point(a);
            let cond = bld.create_parameter(Type::Int32);
            bld.create_if(cond, b, c);
            bld.set_insert_point(b);
            bld.create_jump(d);
            bld.set_insert_point(c);
            bld.create_jump(d);
            bld.set_insert_point(d);
            phi = bld.create_phi(Type::Int32);
            let one = bld.create_constant(crate::ir::ConstValue::Int32(1));
            bld.add_phi_input(phi, b, one);
            bld.create_return(Some(phi));
        }
        let result = verify_graph(&g, None);
        let err = result.unwrap_err();
        match err {
            crate::result::CodegenError::Verifier(errs) => {
                assert!(errs.0.iter().any(|e| e.message.contains("operand")));
            }
        }
    }

    #[test]
    fn jump_successor_mismatch_is_reported() {
        let mut g = Graph::new();
        let a = g.create_block();
        let b = g.create_block();
        let stray = g.create_block();
        {
            let mut bld = Builder::new(&mut g);
            bld.set_insert_point(a);
            bld.create_jump(b);
            bld.set_insert_point(b);
            bld.create_return(None);
            bld.set_insert_point(stray);
            bld.create_return(None);
        }
        g.block_mut(a).succs.push(stray);
        assert!(verify_graph(&g, None).is_err());
    }
}

//! Natural-loop analysis: back-edge discovery via a 3-color DFS
//! (using dominance, not mere gray-revisit, to tell a true back edge
//! from an irreducible cross edge), natural-loop body population by a
//! reverse-CFG walk, and loop-nest tree construction.

use std::collections::BTreeSet;

use log::{debug, trace};

use crate::dominator_tree::DominatorTree;
use crate::entity::{BlockId, SecondaryMap};
use crate::ir::Graph;

#[derive(Copy, Clone, PartialEq, Eq, Debug, PartialOrd, Ord)]
pub struct LoopId(usize);

/// One natural loop, or (when `header` is `None`) the synthetic root
/// that contains every top-level loop.
pub struct Loop {
    pub header: Option<BlockId>,
    pub latches: Vec<BlockId>,
    pub blocks: BTreeSet<BlockId>,
    pub parent: Option<LoopId>,
    pub children: Vec<LoopId>,
}

impl Loop {
    fn new_root() -> Self {
        Loop {
            header: None,
            latches: Vec::new(),
            blocks: BTreeSet::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    fn new(header: BlockId) -> Self {
        let mut blocks = BTreeSet::new();
        blocks.insert(header);
        Loop {
            header: Some(header),
            latches: Vec::new(),
            blocks,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn contains(&self, bb: BlockId) -> bool {
        self.blocks.contains(&bb)
    }
}

/// All natural loops of a graph, organized into a tree rooted at a
/// synthetic node with no header.
pub struct LoopForest {
    loops: Vec<Loop>,
}

const ROOT: LoopId = LoopId(0);

#[derive(Copy, Clone, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

impl LoopForest {
    pub fn root(&self) -> LoopId {
        ROOT
    }

    pub fn get(&self, id: LoopId) -> &Loop {
        &self.loops[id.0]
    }

    /// All real loops (excludes the synthetic root), in discovery
    /// order.
    pub fn loops(&self) -> impl Iterator<Item = LoopId> + '_ {
        (1..self.loops.len()).map(LoopId)
    }

    pub fn len(&self) -> usize {
        self.loops.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.loops.len() <= 1
    }

    /// Recomputes the loop forest from scratch. Idempotent: re-running
    /// discards all prior state.
    pub fn compute(graph: &Graph, doms: &DominatorTree) -> LoopForest {
        let mut loops = vec![Loop::new_root()];

        if let Some(entry) = graph.entry() {
            discover_back_edges(graph, doms, entry, &mut loops);
        }

        for i in 1..loops.len() {
            populate_loop(graph, &mut loops, i);
        }

        build_tree(&mut loops);

        debug!("loop_analysis: found {} natural loop(s)", loops.len() - 1);
        LoopForest { loops }
    }
}

fn find_or_create_loop(loops: &mut Vec<Loop>, header: BlockId) -> LoopId {
    if let Some(pos) = loops.iter().position(|l| l.header == Some(header)) {
        return LoopId(pos);
    }
    loops.push(Loop::new(header));
    LoopId(loops.len() - 1)
}

struct Frame {
    block: BlockId,
    succ_idx: usize,
}

fn discover_back_edges(graph: &Graph, doms: &DominatorTree, entry: BlockId, loops: &mut Vec<Loop>) {
    let mut color: SecondaryMap<BlockId, Color> = SecondaryMap::with_default(Color::White);
    color.set(entry, Color::Gray);
    let mut stack = vec![Frame { block: entry, succ_idx: 0 }];

    while let Some(frame) = stack.last_mut() {
        let u = frame.block;
        let succs = graph.block(u).succs.clone();
        if frame.succ_idx < succs.len() {
            let v = succs[frame.succ_idx];
            frame.succ_idx += 1;
            match *color.get(v) {
                Color::Gray => {
                    if doms.dominates(v, u) {
                        trace!("loop_analysis: back edge {} -> {}", u, v);
                        let header = find_or_create_loop(loops, v);
                        loops[header.0].latches.push(u);
                    }
                }
                Color::White => {
                    color.set(v, Color::Gray);
                    stack.push(Frame { block: v, succ_idx: 0 });
                }
                Color::Black => {}
            }
        } else {
            color.set(u, Color::Black);
            stack.pop();
        }
    }
}

fn populate_loop(graph: &Graph, loops: &mut Vec<Loop>, index: usize) {
    let header = loops[index].header.unwrap();
    let latches = loops[index].latches.clone();
    let mut worklist = Vec::new();
    for latch in latches {
        if latch != header && loops[index].blocks.insert(latch) {
            worklist.push(latch);
        }
    }
    while let Some(cur) = worklist.pop() {
        let preds = graph.block(cur).preds.clone();
        for pred in preds {
            if loops[index].blocks.insert(pred) {
                worklist.push(pred);
            }
        }
    }
}

fn build_tree(loops: &mut Vec<Loop>) {
    let mut order: Vec<usize> = (1..loops.len()).collect();
    order.sort_by_key(|&i| loops[i].blocks.len());

    for &idx in &order {
        let header = loops[idx].header.unwrap();
        let mut parent: Option<usize> = None;
        for &cand in &order {
            if cand == idx {
                continue;
            }
            if loops[cand].blocks.contains(&header) {
                let smaller = match parent {
                    Some(p) => loops[cand].blocks.len() < loops[p].blocks.len(),
                    None => true,
                };
                if smaller {
                    parent = Some(cand);
                }
            }
        }
        let parent = parent.unwrap_or(0);
        loops[idx].parent = Some(LoopId(parent));
        loops[parent].children.push(LoopId(idx));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::Type;
    use crate::ir::Builder;

    #[test]
    fn self_loop_header_equals_latch() {
        let mut g = Graph::new();
        let entry = g.create_block();
        let header = g.create_block();
        let exit = g.create_block();
        {
            let mut b = Builder::new(&mut g);
            b.set_insert_point(entry);
            b.create_jump(header);
            b.set_insert_point(header);
            let c = b.create_parameter(Type::Int32);
            b.create_if(c, header, exit);
            b.set_insert_point(exit);
            b.create_return(None);
        }
        let doms = DominatorTree::compute(&g);
        let forest = LoopForest::compute(&g, &doms);
        assert_eq!(forest.len(), 1);
        let l = forest.get(LoopId(1));
        assert_eq!(l.header, Some(header));
        assert_eq!(l.latches, vec![header]);
        assert!(l.blocks.contains(&header));
        assert_eq!(l.blocks.len(), 1);
    }

    #[test]
    fn acyclic_graph_has_no_loops() {
        let mut g = Graph::new();
        let a = g.create_block();
        let b = g.create_block();
        {
            let mut bld = Builder::new(&mut g);
            bld.set_insert_point(a);
            bld.create_jump(b);
            bld.set_insert_point(b);
            bld.create_return(None);
        }
        let doms = DominatorTree::compute(&g);
        let forest = LoopForest::compute(&g, &doms);
        assert!(forest.is_empty());
    }

    #[test]
    fn factorial_cfg_loop_body() {
        // entry -> header; header -> {body, exit}; body -> header.
        let mut g = Graph::new();
        let entry = g.create_block();
        let header = g.create_block();
        let body = g.create_block();
        let exit = g.create_block();
        {
            let mut b = Builder::new(&mut g);
            b.set_insert_point(entry);
            b.create_jump(header);
            b.set_insert_point(header);
            let c = b.create_parameter(Type::Int32);
            b.create_if(c, body, exit);
            b.set_insert_point(body);
            b.create_jump(header);
            b.set_insert_point(exit);
            b.create_return(None);
        }
        let doms = DominatorTree::compute(&g);
        let forest = LoopForest::compute(&g, &doms);
        assert_eq!(forest.len(), 1);
        let l = forest.get(LoopId(1));
        assert_eq!(l.header, Some(header));
        assert_eq!(l.latches, vec![body]);
        assert_eq!(l.blocks, [header, body].iter().cloned().collect());
    }
}

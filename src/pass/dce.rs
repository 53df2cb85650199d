// Copyright (c) 2017-2020 Fabian Schuiki

//! Dead Code Elimination

use crate::ir::prelude::*;
use crate::table::TableKey;
use hibitset::BitSet;

/// Remove dead instructions and unreachable blocks from a function.
///
/// Prunes instructions whose value is never used, then deletes all blocks
/// which cannot be reached from the entry block. Returns `true` if the
/// function was modified.
pub fn run_on_function(func: &mut Function) -> bool {
    info!("DCE [{}]", func.name);
    let mut modified = false;

    // Gather a list of instructions to inspect. Terminators keep the control
    // flow intact and are only removed together with their block.
    let mut insts = vec![];
    for bb in func.layout.blocks() {
        let term = func.layout.terminator(bb);
        for inst in func.layout.insts(bb) {
            if inst != term {
                insts.push(inst);
            }
        }
    }

    // Prune instructions and unreachable blocks.
    let mut builder = FunctionBuilder::new(func);
    for inst in insts {
        modified |= builder.prune_if_unused(inst);
    }
    modified |= prune_unreachable(&mut builder) > 0;

    modified
}

/// Eliminate blocks which cannot be reached from the entry block.
///
/// Returns the number of blocks that were removed.
pub fn prune_unreachable(builder: &mut FunctionBuilder) -> usize {
    // Find all blocks reachable from the entry point.
    let mut reachable = BitSet::with_capacity(builder.func.layout.blocks().count() as u32);
    let mut todo = vec![builder.func.layout.entry()];
    while let Some(bb) = todo.pop() {
        if reachable.add(bb.index() as u32) {
            continue;
        }
        let term = builder.func.layout.terminator(bb);
        for &to_bb in builder.func.dfg[term].blocks() {
            if !reachable.contains(to_bb.index() as u32) {
                todo.push(to_bb);
            }
        }
    }

    // Remove all unreachable blocks.
    let unreachable: Vec<Block> = builder
        .func
        .layout
        .blocks()
        .filter(|bb| !reachable.contains(bb.index() as u32))
        .collect();
    let num = unreachable.len();
    for bb in unreachable {
        debug!("Prune unreachable block {}", bb.dump(&builder.func.cfg));
        builder.remove_block(bb);
    }
    num
}

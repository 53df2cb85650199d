// Copyright (c) 2017-2020 Fabian Schuiki

//! Emitting control flow graphs in GraphViz DOT format.

use crate::ir::prelude::*;
use std::io::{Result, Write};

/// Emit the control flow graph of a function in DOT format.
///
/// Produces one record-shaped node per basic block, labeled with the block
/// name and its instructions, and one edge per terminator successor.
pub fn write_function_dot(sink: &mut impl Write, func: &Function) -> Result<()> {
    write!(sink, "digraph \"CFG for '{}' function\" {{\n", func.name)?;
    for bb in func.layout.blocks() {
        write!(
            sink,
            "    {} [shape=record, label=\"{{{}:\\l\\l",
            bb,
            bb.dump(&func.cfg)
        )?;
        for inst in func.layout.insts(bb) {
            write!(sink, "{}\\l", inst.dump(&func.dfg, Some(&func.cfg)))?;
        }
        write!(sink, "}}\"];\n")?;
    }
    for bb in func.layout.blocks() {
        let term = func.layout.terminator(bb);
        for &to_bb in func.dfg[term].blocks() {
            write!(sink, "    {} -> {};\n", bb, to_bb)?;
        }
    }
    write!(sink, "}}\n")?;
    Ok(())
}

/// Emit the control flow graphs of all functions in a module.
pub fn write_module_dot(sink: &mut impl Write, module: &Module) -> Result<()> {
    let mut separate = false;
    for func in module.functions() {
        if separate {
            write!(sink, "\n")?;
        }
        separate = true;
        write_function_dot(sink, func)?;
    }
    Ok(())
}

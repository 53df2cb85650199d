// Copyright (c) 2017-2020 Fabian Schuiki

//! Representation of functions.

use crate::{
    ir::{
        Arg, Block, ControlFlowGraph, DataFlowGraph, ExtUnit, FunctionInsertPos, FunctionLayout,
        Inst, InstBuilder, InstData, Signature, UnitName, Value,
    },
    ty::Type,
    verifier::Verifier,
};
use serde::{Deserialize, Serialize};

/// A function.
///
/// This is the only unit of code in the IR: a signature together with a body
/// of basic blocks in SSA form. The first block in the layout is the entry
/// block; control enters there and leaves through `ret` instructions.
#[derive(Serialize, Deserialize)]
pub struct Function {
    /// The name of the function.
    pub name: UnitName,
    /// The signature of the function.
    pub sig: Signature,
    /// The data flow graph of the function.
    pub dfg: DataFlowGraph,
    /// The control flow graph of the function.
    pub cfg: ControlFlowGraph,
    /// The order of blocks and instructions in the function.
    pub layout: FunctionLayout,
}

impl Function {
    /// Create a new function.
    pub fn new(name: UnitName, sig: Signature) -> Self {
        let mut func = Self {
            name,
            sig,
            dfg: DataFlowGraph::new(),
            cfg: ControlFlowGraph::new(),
            layout: FunctionLayout::new(),
        };
        func.dfg.make_args_for_signature(&func.sig);
        func
    }

    /// Get the value of one of the function's input arguments.
    pub fn arg_value(&self, arg: Arg) -> Value {
        self.dfg.arg_value(arg)
    }

    /// Dump the function in human-readable form.
    pub fn dump(&self) -> FunctionDumper {
        FunctionDumper(self)
    }

    /// Panic if the function is not well-formed.
    pub fn verify(&self) {
        let mut verifier = Verifier::new();
        verifier.verify_function(self);
        match verifier.finish() {
            Ok(()) => (),
            Err(errs) => {
                eprintln!("");
                eprintln!("Verified function:");
                eprintln!("{}", self.dump());
                eprintln!("");
                eprintln!("Verification errors:");
                eprintln!("{}", errs);
                panic!("verification failed");
            }
        }
    }
}

/// Temporary object to dump a `Function` in human-readable form for debugging.
pub struct FunctionDumper<'a>(&'a Function);

impl std::fmt::Display for FunctionDumper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let func = self.0;
        write!(f, "func {} {} {{\n", func.name, func.sig)?;
        for bb in func.layout.blocks() {
            write!(f, "{}:\n", bb.dump(&func.cfg))?;
            for inst in func.layout.insts(bb) {
                write!(f, "    {}\n", inst.dump(&func.dfg, Some(&func.cfg)))?;
            }
        }
        write!(f, "}}")?;
        Ok(())
    }
}

/// Temporary object used to build a single `Function`.
pub struct FunctionBuilder<'u> {
    /// The function currently being built.
    pub func: &'u mut Function,
    /// The position where new instructions are inserted.
    pos: FunctionInsertPos,
}

impl<'u> FunctionBuilder<'u> {
    /// Create a new function builder.
    pub fn new(func: &'u mut Function) -> Self {
        Self {
            func,
            pos: FunctionInsertPos::None,
        }
    }

    /// Add a new instruction using an `InstBuilder`.
    pub fn ins(&mut self) -> InstBuilder<'u, '_> {
        InstBuilder::new(self)
    }

    /// Add a new instruction at the current insertion position.
    pub fn build_inst(&mut self, data: InstData, ty: Type) -> Inst {
        let inst = self.func.dfg.add_inst(data, ty);
        self.pos.add_inst(inst, &mut self.func.layout);
        inst
    }

    /// Remove an instruction.
    ///
    /// The instruction must not produce a value that is still used.
    pub fn remove_inst(&mut self, inst: Inst) {
        self.func.dfg.remove_inst(inst);
        self.pos.remove_inst(inst, &self.func.layout);
        self.func.layout.remove_inst(inst);
    }

    /// Create a new basic block and append it to the function body.
    pub fn block(&mut self) -> Block {
        let bb = self.func.cfg.add_block();
        self.func.layout.append_block(bb);
        bb
    }

    /// Create a new named basic block and append it to the function body.
    pub fn named_block(&mut self, name: impl Into<String>) -> Block {
        let bb = self.block();
        self.func.cfg.set_block_name(bb, name.into());
        bb
    }

    /// Remove a basic block, together with the instructions it contains.
    ///
    /// Uses of the removed instructions' values are invalidated, and phi
    /// edges coming from the removed block are dropped.
    pub fn remove_block(&mut self, bb: Block) {
        let insts: Vec<_> = self.func.layout.insts(bb).collect();
        self.func.dfg.remove_block_use(bb);
        self.func.layout.remove_block(bb);
        self.func.cfg.remove_block(bb);
        for inst in insts {
            if self.func.dfg.has_result(inst) {
                let value = self.func.dfg.inst_result(inst);
                self.func.dfg.replace_use(value, Value::invalid());
            }
            self.func.dfg.remove_inst(inst);
        }
    }

    /// Append all following instructions to the end of `bb`.
    pub fn append_to(&mut self, bb: Block) {
        self.pos = FunctionInsertPos::Append(bb);
    }

    /// Prepend all following instructions to the beginning of `bb`.
    pub fn prepend_to(&mut self, bb: Block) {
        self.pos = FunctionInsertPos::Prepend(bb);
    }

    /// Insert all following instructions after `inst`.
    pub fn insert_after(&mut self, inst: Inst) {
        self.pos = FunctionInsertPos::After(inst);
    }

    /// Insert all following instructions before `inst`.
    pub fn insert_before(&mut self, inst: Inst) {
        self.pos = FunctionInsertPos::Before(inst);
    }

    /// Declare an external function for use in `call` instructions.
    pub fn add_extern(&mut self, name: UnitName, sig: Signature) -> ExtUnit {
        self.func.dfg.add_extern(name, sig)
    }

    /// Get the signature of a declared external function.
    pub fn extern_sig(&self, ext: ExtUnit) -> &Signature {
        &self.func.dfg[ext].sig
    }

    /// Replace all uses of a value with another value.
    ///
    /// Returns the number of uses replaced.
    pub fn replace_use(&mut self, from: Value, to: Value) -> usize {
        self.func.dfg.replace_use(from, to)
    }

    /// Remove an instruction if its value is unused, recursively.
    ///
    /// Removes `inst` if it produces a value without any uses, then visits
    /// the instructions that computed its arguments and prunes those that
    /// have become unused in turn. Instructions with side effects and
    /// instructions that have already been removed are left alone. Returns
    /// `true` if any instruction was removed.
    pub fn prune_if_unused(&mut self, inst: Inst) -> bool {
        if !self.func.dfg.has_inst(inst) {
            return false;
        }
        if self.func.dfg[inst].opcode().has_side_effects() {
            return false;
        }
        if self.func.dfg.has_result(inst) && !self.func.dfg.has_uses(self.func.dfg.inst_result(inst))
        {
            let inst_args: Vec<_> = self.func.dfg[inst]
                .args()
                .iter()
                .cloned()
                .flat_map(|arg| self.func.dfg.get_value_inst(arg))
                .collect();
            self.remove_inst(inst);
            for inst in inst_args {
                self.prune_if_unused(inst);
            }
            true
        } else {
            false
        }
    }
}

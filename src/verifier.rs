// Copyright (c) 2017-2020 Fabian Schuiki

//! Verification of IR integrity.
//!
//! This module implements verification of the intermediate representation. It
//! checks that functions are well-formed, basic blocks have terminators, and
//! types line up.

use crate::{
    analysis::PredecessorTable,
    ir::{prelude::*, InstData, ValueData},
    ty::{int_ty, void_ty, Type},
};
use std::{
    fmt::Display,
    ops::{Deref, DerefMut},
};

/// An IR verifier.
///
/// The `Verifier` acts as a context to call the various IR checking functions
/// on. It keeps track of errors.
#[derive(Default)]
pub struct Verifier {
    errors: VerifierErrors,
    unit_name: Option<String>,
    return_type: Option<Type>,
}

impl Verifier {
    /// Create a new verifier.
    pub fn new() -> Self {
        Default::default()
    }

    /// Verify the integrity of a `Module`.
    pub fn verify_module(&mut self, module: &Module) {
        for func in module.functions() {
            self.verify_function(func);
        }
    }

    /// Verify the integrity of a `Function`.
    pub fn verify_function(&mut self, func: &Function) {
        self.unit_name = Some(format!("func {}", func.name));
        self.return_type = Some(func.sig.return_type());

        if func.layout.first_block().is_none() {
            self.errors.push(VerifierError {
                unit: self.unit_name.clone(),
                object: None,
                message: format!("layout has no entry block"),
            });
        }
        let pt = PredecessorTable::new(func);
        for bb in func.layout.blocks() {
            // Check that the block has at least one instruction.
            if func.layout.first_inst(bb).is_none() {
                self.errors.push(VerifierError {
                    unit: self.unit_name.clone(),
                    object: Some(bb.to_string()),
                    message: format!("block is empty"),
                })
            }

            for inst in func.layout.insts(bb) {
                // Check that there are no terminator instructions in the middle
                // of the block.
                if func.dfg[inst].opcode().is_terminator()
                    && Some(inst) != func.layout.last_inst(bb)
                {
                    self.errors.push(VerifierError {
                        unit: self.unit_name.clone(),
                        object: Some(inst.dump(&func.dfg, Some(&func.cfg)).to_string()),
                        message: format!("terminator must be at the end of block {}", bb),
                    });
                }

                // Check that the last instruction in the block is a terminator.
                if Some(inst) == func.layout.last_inst(bb)
                    && !func.dfg[inst].opcode().is_terminator()
                {
                    self.errors.push(VerifierError {
                        unit: self.unit_name.clone(),
                        object: Some(bb.to_string()),
                        message: format!(
                            "last instruction `{}` must be a terminator",
                            inst.dump(&func.dfg, Some(&func.cfg))
                        ),
                    })
                }

                // Check that phi nodes have exactly one entry per predecessor.
                if func.dfg[inst].opcode().is_phi() {
                    self.verify_phi_preds(func, bb, inst, &pt);
                }

                // Check the instruction itself.
                self.verify_inst(inst, func);
            }
        }

        self.unit_name = None;
        self.return_type = None;
    }

    /// Verify that a phi node's incoming blocks agree with the predecessors
    /// of its block.
    fn verify_phi_preds(&mut self, func: &Function, bb: Block, inst: Inst, pt: &PredecessorTable) {
        let blocks = func.dfg[inst].blocks();
        for pred in pt.pred(bb) {
            if !blocks.contains(&pred) {
                self.errors.push(VerifierError {
                    unit: self.unit_name.clone(),
                    object: Some(inst.dump(&func.dfg, Some(&func.cfg)).to_string()),
                    message: format!("phi has no entry for predecessor {}", pred),
                });
            }
        }
        for &block in blocks {
            if !pt.pred_set(bb).contains(&block) {
                self.errors.push(VerifierError {
                    unit: self.unit_name.clone(),
                    object: Some(inst.dump(&func.dfg, Some(&func.cfg)).to_string()),
                    message: format!("phi has entry for {} which is not a predecessor", block),
                });
            }
        }
    }

    /// Finish verification and return the result.
    ///
    /// Consumes the verifier.
    pub fn finish(self) -> Result<(), VerifierErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    /// Finish verification and panic if errors occurred.
    ///
    /// Consumes the verifier.
    pub fn finish_panic(self) {
        match self.finish() {
            Ok(()) => (),
            Err(errs) => panic!("Verification failed:\n{}", errs),
        }
    }

    /// Verify the integrity of a single instruction.
    pub fn verify_inst(&mut self, inst: Inst, func: &Function) {
        InstVerifier {
            verifier: self,
            func,
        }
        .verify_inst(inst);
    }
}

/// An instruction verifier.
struct InstVerifier<'a> {
    verifier: &'a mut Verifier,
    func: &'a Function,
}

impl<'a> Deref for InstVerifier<'a> {
    type Target = Verifier;
    fn deref(&self) -> &Verifier {
        self.verifier
    }
}

impl<'a> DerefMut for InstVerifier<'a> {
    fn deref_mut(&mut self) -> &mut Verifier {
        self.verifier
    }
}

impl<'a> InstVerifier<'a> {
    fn dump_inst(&self, inst: Inst) -> String {
        inst.dump(&self.func.dfg, Some(&self.func.cfg)).to_string()
    }

    fn is_value_defined(&self, value: Value) -> bool {
        match self.func.dfg[value] {
            ValueData::Inst { inst, .. } => self.func.layout.is_inst_inserted(inst),
            ValueData::Arg { .. } => true,
        }
    }

    fn is_block_defined(&self, block: Block) -> bool {
        self.func.layout.is_block_inserted(block)
    }

    /// Verify the integrity of a single instruction.
    pub fn verify_inst(&mut self, inst: Inst) {
        let func = self.func;

        // Check that none of the arguments are invalid, and all have a
        // definition.
        let mut args_invalid = false;
        for &value in func.dfg[inst].args() {
            if value.is_invalid() {
                args_invalid = true;
                let err = VerifierError {
                    unit: self.verifier.unit_name.clone(),
                    object: Some(self.dump_inst(inst)),
                    message: format!("{} uses invalid value", func.dfg[inst].opcode()),
                };
                self.verifier.errors.push(err);
                continue;
            }
            if !self.is_value_defined(value) {
                let err = VerifierError {
                    unit: self.verifier.unit_name.clone(),
                    object: Some(self.dump_inst(inst)),
                    message: format!("value {} has no definition", value.dump(&func.dfg)),
                };
                self.verifier.errors.push(err);
            }
        }
        for &block in func.dfg[inst].blocks() {
            if block.is_invalid() {
                args_invalid = true;
                let err = VerifierError {
                    unit: self.verifier.unit_name.clone(),
                    object: Some(self.dump_inst(inst)),
                    message: format!("{} uses invalid block", func.dfg[inst].opcode()),
                };
                self.verifier.errors.push(err);
                continue;
            }
            if !self.is_block_defined(block) {
                let err = VerifierError {
                    unit: self.verifier.unit_name.clone(),
                    object: Some(self.dump_inst(inst)),
                    message: format!("block {} has no definition", block),
                };
                self.verifier.errors.push(err);
            }
        }
        if args_invalid {
            return;
        }

        // Check for instruction-specific invariants. This match block acts as
        // the source of truth for all restrictions imposed by instructions.
        match func.dfg[inst].opcode() {
            Opcode::ConstInt => {
                self.verify_const_int_ty(inst);
            }
            Opcode::Not | Opcode::Neg => {
                self.assert_inst_unary(inst);
                self.verify_int_ty(inst);
                self.verify_args_match_inst_ty(inst);
            }
            Opcode::Add
            | Opcode::Sub
            | Opcode::Smul
            | Opcode::Sdiv
            | Opcode::Smod
            | Opcode::Umul
            | Opcode::Udiv
            | Opcode::Umod => {
                self.assert_inst_binary(inst);
                self.verify_int_ty(inst);
                self.verify_args_match_inst_ty(inst);
            }
            Opcode::And | Opcode::Or | Opcode::Xor => {
                self.assert_inst_binary(inst);
                self.verify_int_ty(inst);
                self.verify_args_match_inst_ty(inst);
            }
            Opcode::Eq
            | Opcode::Neq
            | Opcode::Slt
            | Opcode::Sgt
            | Opcode::Sle
            | Opcode::Sge
            | Opcode::Ult
            | Opcode::Ugt
            | Opcode::Ule
            | Opcode::Uge => {
                self.assert_inst_binary(inst);
                self.verify_bool_ty(inst);
                self.verify_arg_tys_match(inst);
            }
            Opcode::Call => {
                self.verify_call_inst(inst);
            }
            Opcode::Var => {
                self.assert_inst_unary(inst);
                self.verify_var_inst(inst);
            }
            Opcode::Ld => {
                self.assert_inst_unary(inst);
                self.verify_ld_inst(inst);
            }
            Opcode::St => {
                self.assert_inst_binary(inst);
                self.verify_st_inst(inst);
            }
            Opcode::Ret => {
                self.assert_inst_nullary(inst);
                self.verify_return_type(inst, &void_ty());
            }
            Opcode::RetValue => {
                self.assert_inst_unary(inst);
                self.verify_return_type(inst, &func.dfg.value_type(func.dfg[inst].args()[0]));
            }
            Opcode::Phi => {
                self.assert_inst_phi(inst);
                self.verify_args_match_inst_ty(inst);
            }
            Opcode::Br => {
                self.assert_inst_jump(inst);
            }
            Opcode::BrCond => {
                self.assert_inst_branch(inst);
                self.verify_args_match_ty(inst, &int_ty(1));
            }
        }
    }

    /// Assert that an instruction has nullary format.
    fn assert_inst_nullary(&mut self, inst: Inst) {
        match &self.func.dfg[inst] {
            InstData::Nullary { .. } => (),
            fmt => panic!(
                "{0:?} ({0}) should have nullary format, but has {1:?}",
                fmt.opcode(),
                fmt
            ),
        }
    }

    /// Assert that an instruction has unary format.
    fn assert_inst_unary(&mut self, inst: Inst) {
        match &self.func.dfg[inst] {
            InstData::Unary { .. } => (),
            fmt => panic!(
                "{0:?} ({0}) should have unary format, but has {1:?}",
                fmt.opcode(),
                fmt
            ),
        }
    }

    /// Assert that an instruction has binary format.
    fn assert_inst_binary(&mut self, inst: Inst) {
        match &self.func.dfg[inst] {
            InstData::Binary { .. } => (),
            fmt => panic!(
                "{0:?} ({0}) should have binary format, but has {1:?}",
                fmt.opcode(),
                fmt
            ),
        }
    }

    /// Assert that an instruction has jump format.
    fn assert_inst_jump(&mut self, inst: Inst) {
        match &self.func.dfg[inst] {
            InstData::Jump { .. } => (),
            fmt => panic!(
                "{0:?} ({0}) should have jump format, but has {1:?}",
                fmt.opcode(),
                fmt
            ),
        }
    }

    /// Assert that an instruction has phi format.
    fn assert_inst_phi(&mut self, inst: Inst) {
        match &self.func.dfg[inst] {
            InstData::Phi { .. } => (),
            fmt => panic!(
                "{0:?} ({0}) should have phi format, but has {1:?}",
                fmt.opcode(),
                fmt
            ),
        }
    }

    /// Assert that an instruction has branch format.
    fn assert_inst_branch(&mut self, inst: Inst) {
        match &self.func.dfg[inst] {
            InstData::Branch { .. } => (),
            fmt => panic!(
                "{0:?} ({0}) should have branch format, but has {1:?}",
                fmt.opcode(),
                fmt
            ),
        }
    }

    /// Get the type of an instruction's result.
    fn inst_type(&self, inst: Inst) -> Type {
        self.func.dfg.value_type(self.func.dfg.inst_result(inst))
    }

    /// Verify that a constant's type matches the width of its immediate.
    fn verify_const_int_ty(&mut self, inst: Inst) {
        let func = self.func;
        let imm = func.dfg[inst].get_const_int().unwrap();
        let ty = self.inst_type(inst);
        if ty != int_ty(imm.width) {
            let err = VerifierError {
                unit: self.verifier.unit_name.clone(),
                object: Some(self.dump_inst(inst)),
                message: format!(
                    "return type {} must match immediate width i{}",
                    ty, imm.width
                ),
            };
            self.verifier.errors.push(err);
        }
    }

    /// Verify that the types of an instruction's arguments agree.
    fn verify_arg_tys_match(&mut self, inst: Inst) {
        let func = self.func;
        let ty = match func.dfg[inst].args().get(0) {
            Some(&arg) => func.dfg.value_type(arg),
            None => return,
        };
        let mut mismatch = false;
        for &arg in &func.dfg[inst].args()[1..] {
            let arg_ty = func.dfg.value_type(arg);
            if arg_ty != ty {
                mismatch = true;
            }
        }
        if mismatch {
            let tys: Vec<_> = func.dfg[inst]
                .args()
                .into_iter()
                .map(|&arg| func.dfg.value_type(arg).to_string())
                .collect();
            let tys: String = tys.join(", ");
            let err = VerifierError {
                unit: self.verifier.unit_name.clone(),
                object: Some(self.dump_inst(inst)),
                message: format!("argument types must match (but are {})", tys),
            };
            self.verifier.errors.push(err);
        }
    }

    /// Verify that the types of an instruction's arguments match the return
    /// type of the instruction itself.
    fn verify_args_match_inst_ty(&mut self, inst: Inst) {
        let ty = self.inst_type(inst);
        self.verify_args_match_ty(inst, &ty);
    }

    /// Verify that the types of an instruction's arguments match a given type.
    fn verify_args_match_ty(&mut self, inst: Inst, ty: &Type) {
        for &arg in self.func.dfg[inst].args() {
            self.verify_arg_matches_ty(inst, arg, ty);
        }
    }

    /// Verify that the type of an instruction's argument matches a given type.
    fn verify_arg_matches_ty(&mut self, inst: Inst, arg: Value, ty: &Type) {
        let arg_ty = self.func.dfg.value_type(arg);
        if arg_ty != *ty {
            let err = VerifierError {
                unit: self.verifier.unit_name.clone(),
                object: Some(self.dump_inst(inst)),
                message: format!(
                    "argument {} must be of type {} (but is {})",
                    arg.dump(&self.func.dfg),
                    ty,
                    arg_ty,
                ),
            };
            self.verifier.errors.push(err);
        }
    }

    /// Verify that an instruction's return type is `i1`.
    fn verify_bool_ty(&mut self, inst: Inst) {
        let ty = self.inst_type(inst);
        if ty.is_int() && ty.unwrap_int() == 1 {
            return;
        }
        let err = VerifierError {
            unit: self.verifier.unit_name.clone(),
            object: Some(self.dump_inst(inst)),
            message: format!("return type must be i1 (but is {})", ty),
        };
        self.verifier.errors.push(err);
    }

    /// Verify that an instruction's return type is an integer.
    fn verify_int_ty(&mut self, inst: Inst) {
        let ty = self.inst_type(inst);
        if ty.is_int() {
            return;
        }
        let err = VerifierError {
            unit: self.verifier.unit_name.clone(),
            object: Some(self.dump_inst(inst)),
            message: format!("return type must be iN (but is {})", ty),
        };
        self.verifier.errors.push(err);
    }

    /// Verify that a call instruction agrees with the signature of the called
    /// unit.
    fn verify_call_inst(&mut self, inst: Inst) {
        let func = self.func;
        let ext = func.dfg[inst].get_ext_unit().unwrap();
        let sig = &func.dfg[ext].sig;
        let num_args = sig.args().count();
        if func.dfg[inst].args().len() != num_args {
            let err = VerifierError {
                unit: self.verifier.unit_name.clone(),
                object: Some(self.dump_inst(inst)),
                message: format!(
                    "call to {} requires {} arguments (but has {})",
                    func.dfg[ext].name,
                    num_args,
                    func.dfg[inst].args().len()
                ),
            };
            self.verifier.errors.push(err);
            return;
        }
        for (arg, &value) in sig.args().zip(func.dfg[inst].args().iter()) {
            self.verify_arg_matches_ty(inst, value, &sig.arg_type(arg));
        }
        if sig.has_return_type() {
            if func.dfg.has_result(inst) {
                let ty = self.inst_type(inst);
                if ty != sig.return_type() {
                    let err = VerifierError {
                        unit: self.verifier.unit_name.clone(),
                        object: Some(self.dump_inst(inst)),
                        message: format!(
                            "return type must be {} (but is {})",
                            sig.return_type(),
                            ty
                        ),
                    };
                    self.verifier.errors.push(err);
                }
            } else {
                let err = VerifierError {
                    unit: self.verifier.unit_name.clone(),
                    object: Some(self.dump_inst(inst)),
                    message: format!("call to {} must have a result", func.dfg[ext].name),
                };
                self.verifier.errors.push(err);
            }
        } else if func.dfg.has_result(inst) {
            let err = VerifierError {
                unit: self.verifier.unit_name.clone(),
                object: Some(self.dump_inst(inst)),
                message: format!(
                    "call to void function {} must not have a result",
                    func.dfg[ext].name
                ),
            };
            self.verifier.errors.push(err);
        }
    }

    /// Verify that the types of a var instruction line up.
    fn verify_var_inst(&mut self, inst: Inst) {
        let ty = self.inst_type(inst);
        if !ty.is_pointer() {
            let err = VerifierError {
                unit: self.verifier.unit_name.clone(),
                object: Some(self.dump_inst(inst)),
                message: format!("type {} must be a pointer", ty),
            };
            self.verifier.errors.push(err);
            return;
        }
        self.verify_args_match_ty(inst, ty.unwrap_pointer());
    }

    /// Verify that the types of a ld instruction line up.
    fn verify_ld_inst(&mut self, inst: Inst) {
        let func = self.func;
        let ty = self.inst_type(inst);
        let arg_ty = func.dfg.value_type(func.dfg[inst].args()[0]);
        if !arg_ty.is_pointer() {
            let err = VerifierError {
                unit: self.verifier.unit_name.clone(),
                object: Some(self.dump_inst(inst)),
                message: format!("type {} must be a pointer", arg_ty),
            };
            self.verifier.errors.push(err);
            return;
        }
        if ty != *arg_ty.unwrap_pointer() {
            let err = VerifierError {
                unit: self.verifier.unit_name.clone(),
                object: Some(self.dump_inst(inst)),
                message: format!("type {} must be pointer of return type {}", arg_ty, ty),
            };
            self.verifier.errors.push(err);
        }
    }

    /// Verify that the types of a st instruction line up.
    fn verify_st_inst(&mut self, inst: Inst) {
        let func = self.func;
        let ty = func.dfg.value_type(func.dfg[inst].args()[1]);
        let arg_ty = func.dfg.value_type(func.dfg[inst].args()[0]);
        if !arg_ty.is_pointer() {
            let err = VerifierError {
                unit: self.verifier.unit_name.clone(),
                object: Some(self.dump_inst(inst)),
                message: format!("type {} must be a pointer", arg_ty),
            };
            self.verifier.errors.push(err);
            return;
        }
        if ty != *arg_ty.unwrap_pointer() {
            let err = VerifierError {
                unit: self.verifier.unit_name.clone(),
                object: Some(self.dump_inst(inst)),
                message: format!(
                    "store target type {} must be pointer of stored value type {}",
                    arg_ty, ty
                ),
            };
            self.verifier.errors.push(err);
        }
    }

    /// Verify that the return type of the enclosing function is compatible with
    /// a ret instruction.
    fn verify_return_type(&mut self, inst: Inst, ty: &Type) {
        let func_ty = self.return_type.clone().unwrap_or_else(void_ty);
        if func_ty != *ty {
            let err = VerifierError {
                unit: self.verifier.unit_name.clone(),
                object: Some(self.dump_inst(inst)),
                message: format!(
                    "requires function to have return type {} (but has {})",
                    ty, func_ty
                ),
            };
            self.verifier.errors.push(err);
        }
    }
}

/// A verification error.
#[derive(Debug)]
pub struct VerifierError {
    /// The unit within which caused the error.
    pub unit: Option<String>,
    /// The object which caused the error.
    pub object: Option<String>,
    /// The error message.
    pub message: String,
}

impl Display for VerifierError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if let Some(ref unit) = self.unit {
            write!(f, "{}: ", unit)?;
        }
        if let Some(ref object) = self.object {
            write!(f, "{}: ", object)?;
        }
        write!(f, "{}", self.message)?;
        Ok(())
    }
}

/// A list of verification errors.
#[derive(Debug, Default)]
pub struct VerifierErrors(pub Vec<VerifierError>);

impl Deref for VerifierErrors {
    type Target = Vec<VerifierError>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for VerifierErrors {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Display for VerifierErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for err in self.iter() {
            writeln!(f, "- {}", err)?;
        }
        Ok(())
    }
}

// Copyright (c) 2017-2020 Fabian Schuiki

//! Emitting IR assembly.

use crate::ir::prelude::*;
use crate::ir::ModUnitData;
use std::{
    collections::{HashMap, HashSet},
    io::{Result, Write},
    rc::Rc,
};

/// Temporary object to emit IR assembly.
pub struct Writer<T> {
    sink: T,
}

impl<T: Write> Writer<T> {
    /// Create a new assembly writer.
    pub fn new(sink: T) -> Self {
        Self { sink }
    }

    /// Emit assembly for a module.
    pub fn write_module(&mut self, module: &Module) -> Result<()> {
        let mut separate = false;
        for unit in module.units() {
            if separate {
                write!(self.sink, "\n")?;
            }
            separate = true;
            match &module[unit] {
                ModUnitData::Function(func) => self.write_function(func)?,
                ModUnitData::Declare { sig, name } => self.write_declaration(name, sig)?,
            }
        }
        Ok(())
    }

    /// Emit assembly for a function.
    pub fn write_function(&mut self, func: &Function) -> Result<()> {
        let mut fw = FunctionWriter::new(self, func);
        write!(fw.writer.sink, "func {} (", func.name)?;
        let mut comma = false;
        for arg in func.sig.args() {
            if comma {
                write!(fw.writer.sink, ", ")?;
            }
            comma = true;
            write!(fw.writer.sink, "{} ", func.sig.arg_type(arg))?;
            fw.write_value_name(func.arg_value(arg))?;
        }
        write!(fw.writer.sink, ") {} {{\n", func.sig.return_type())?;
        for block in func.layout.blocks() {
            fw.write_block_name(block)?;
            write!(fw.writer.sink, ":\n")?;
            for inst in func.layout.insts(block) {
                write!(fw.writer.sink, "    ")?;
                fw.write_inst(inst)?;
                write!(fw.writer.sink, "\n")?;
            }
        }
        write!(fw.writer.sink, "}}\n")?;
        Ok(())
    }

    /// Emit assembly for a declaration.
    pub fn write_declaration(&mut self, name: &UnitName, sig: &Signature) -> Result<()> {
        write!(self.sink, "declare {} {}\n", name, sig)?;
        Ok(())
    }
}

pub struct FunctionWriter<'a, T> {
    writer: &'a mut Writer<T>,
    func: &'a Function,
    value_names: HashMap<Value, Rc<String>>,
    block_names: HashMap<Block, Rc<String>>,
    name_indices: HashMap<Rc<String>, usize>,
    names: HashSet<Rc<String>>,
    tmp_index: usize,
}

impl<'a, T: Write> FunctionWriter<'a, T> {
    /// Create a new writer for a function.
    pub fn new(writer: &'a mut Writer<T>, func: &'a Function) -> Self {
        Self {
            writer,
            func,
            value_names: Default::default(),
            block_names: Default::default(),
            name_indices: Default::default(),
            names: Default::default(),
            tmp_index: 0,
        }
    }

    /// Emit the name of a value.
    pub fn write_value_name(&mut self, value: Value) -> Result<()> {
        // If we have already picked a name for the value, use that.
        if let Some(name) = self.value_names.get(&value) {
            return write!(self.writer.sink, "%{}", name);
        }

        // Check if the value has an explicit name set, or if we should just
        // generate a temporary name.
        let name = self.uniquify_name(self.func.dfg.get_name(value));

        // Emit the name and associate it with the value for later reuse.
        write!(self.writer.sink, "%{}", name)?;
        self.value_names.insert(value, name);
        Ok(())
    }

    /// Emit the name of a BB.
    pub fn write_block_name(&mut self, block: Block) -> Result<()> {
        // If we have already picked a name for the block, use that.
        if let Some(name) = self.block_names.get(&block) {
            return write!(self.writer.sink, "{}", name);
        }

        // Check if the block has an explicit name set, or if we should just
        // generate a temporary name.
        let name = self.uniquify_name(self.func.cfg.get_block_name(block));

        // Emit the name and associate it with the block for later reuse.
        write!(self.writer.sink, "{}", name)?;
        self.block_names.insert(block, name);
        Ok(())
    }

    /// Emit the name of a BB to be used as label in an instruction.
    pub fn write_block_value(&mut self, block: Block) -> Result<()> {
        write!(self.writer.sink, "%")?;
        self.write_block_name(block)
    }

    /// Uniquify a value or block name.
    fn uniquify_name(&mut self, name: Option<&str>) -> Rc<String> {
        if let Some(requested_name) = name {
            let requested_name = escape_name(requested_name);
            let idx = self.name_indices.entry(requested_name.clone()).or_insert(0);
            loop {
                let name = if *idx == 0 {
                    requested_name.clone()
                } else {
                    Rc::new(format!("{}{}", requested_name, idx))
                };
                *idx += 1;
                if self.names.insert(name.clone()) {
                    break name;
                }
            }
        } else {
            loop {
                let name = Rc::new(format!("{}", self.tmp_index));
                self.tmp_index += 1;
                if self.names.insert(name.clone()) {
                    break name;
                }
            }
        }
    }

    /// Emit the use of a value.
    pub fn write_value_use(&mut self, value: Value, with_type: bool) -> Result<()> {
        if with_type {
            write!(self.writer.sink, "{} ", self.func.dfg.value_type(value))?;
        }
        self.write_value_name(value)
    }

    /// Emit an instruction.
    pub fn write_inst(&mut self, inst: Inst) -> Result<()> {
        let dfg = &self.func.dfg;
        if dfg.has_result(inst) {
            self.write_value_name(dfg.inst_result(inst))?;
            write!(self.writer.sink, " = ")?;
        }
        let data = &dfg[inst];
        match data.opcode() {
            Opcode::ConstInt => write!(
                self.writer.sink,
                "{} {}",
                data.opcode(),
                data.get_const_int().unwrap()
            )?,
            Opcode::Not
            | Opcode::Neg
            | Opcode::Add
            | Opcode::Sub
            | Opcode::And
            | Opcode::Or
            | Opcode::Xor
            | Opcode::Smul
            | Opcode::Sdiv
            | Opcode::Smod
            | Opcode::Umul
            | Opcode::Udiv
            | Opcode::Umod
            | Opcode::Eq
            | Opcode::Neq
            | Opcode::Slt
            | Opcode::Sgt
            | Opcode::Sle
            | Opcode::Sge
            | Opcode::Ult
            | Opcode::Ugt
            | Opcode::Ule
            | Opcode::Uge
            | Opcode::Var
            | Opcode::Ld
            | Opcode::St
            | Opcode::RetValue => {
                write!(self.writer.sink, "{} ", data.opcode())?;
                let mut first = true;
                for &arg in data.args() {
                    if !first {
                        write!(self.writer.sink, ", ")?;
                    }
                    self.write_value_use(arg, first)?;
                    first = false;
                }
            }
            Opcode::Call => {
                write!(
                    self.writer.sink,
                    "{} {} {} (",
                    data.opcode(),
                    if dfg.has_result(inst) {
                        dfg.value_type(dfg.inst_result(inst))
                    } else {
                        crate::void_ty()
                    },
                    dfg[data.get_ext_unit().unwrap()].name,
                )?;
                let mut comma = false;
                for &arg in data.args() {
                    if comma {
                        write!(self.writer.sink, ", ")?;
                    }
                    comma = true;
                    self.write_value_use(arg, true)?;
                }
                write!(self.writer.sink, ")")?;
            }
            Opcode::Ret => write!(self.writer.sink, "{}", data.opcode())?,
            Opcode::Phi => {
                write!(
                    self.writer.sink,
                    "{} {} ",
                    data.opcode(),
                    dfg.value_type(dfg.inst_result(inst))
                )?;
                let mut comma = false;
                for (&arg, &block) in data.args().iter().zip(data.blocks().iter()) {
                    if comma {
                        write!(self.writer.sink, ", ")?;
                    }
                    comma = true;
                    write!(self.writer.sink, "[")?;
                    self.write_value_use(arg, false)?;
                    write!(self.writer.sink, ", ")?;
                    self.write_block_value(block)?;
                    write!(self.writer.sink, "]")?;
                }
            }
            Opcode::Br => {
                write!(self.writer.sink, "{} ", data.opcode())?;
                self.write_block_value(data.blocks()[0])?;
            }
            Opcode::BrCond => {
                write!(self.writer.sink, "{} ", data.opcode())?;
                self.write_value_use(data.args()[0], false)?;
                write!(self.writer.sink, ", ")?;
                self.write_block_value(data.blocks()[0])?;
                write!(self.writer.sink, ", ")?;
                self.write_block_value(data.blocks()[1])?;
            }
        }
        Ok(())
    }
}

/// Check if a character can be emitted in a name without escaping.
fn is_acceptable_name_char(c: char) -> bool {
    c >= 'a' && c <= 'z' || c >= 'A' && c <= 'Z' || c >= '0' && c <= '9' || c == '_' || c == '.'
}

/// Escape the special characters in a name.
fn escape_name(input: &str) -> Rc<String> {
    let mut s = String::with_capacity(input.len());
    for c in input.chars() {
        if is_acceptable_name_char(c) {
            s.push(c);
        } else {
            s.push_str(&format!("\\{:x}", c as u32));
        }
    }
    Rc::new(s)
}

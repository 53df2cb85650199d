// Copyright (c) 2017-2020 Fabian Schuiki

//! Representation of linked functions.
//!
//! This module implements the `Module`, a collection of `Function` definitions
//! and external declarations linked together. A module acts as the root node
//! of an intermediate representation, and is the unit of information passes
//! operate on.

use crate::{
    impl_table_indexing, impl_table_key,
    ir::{Function, Signature, UnitName},
    table::PrimaryTable,
    verifier::Verifier,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A module.
///
/// This is the root node of an intermediate representation. Contains
/// `Function` definitions and declarations of external functions.
#[derive(Serialize, Deserialize)]
pub struct Module {
    /// The units in this module.
    units: PrimaryTable<ModUnit, ModUnitData>,
    /// The order of units in the module.
    unit_order: BTreeSet<ModUnit>,
}

impl_table_indexing!(Module, units, ModUnit, ModUnitData);

impl Module {
    /// Create a new empty module.
    pub fn new() -> Self {
        Self {
            units: PrimaryTable::new(),
            unit_order: BTreeSet::new(),
        }
    }

    /// Dump the module in human-readable form.
    pub fn dump(&self) -> ModuleDumper {
        ModuleDumper(self)
    }

    /// Add a function to the module.
    pub fn add_function(&mut self, func: Function) -> ModUnit {
        self.add_unit(ModUnitData::Function(func))
    }

    /// Declare an external function.
    pub fn declare(&mut self, name: UnitName, sig: Signature) -> ModUnit {
        self.add_unit(ModUnitData::Declare { sig, name })
    }

    /// Add a unit to the module.
    fn add_unit(&mut self, data: ModUnitData) -> ModUnit {
        let unit = self.units.add(data);
        self.unit_order.insert(unit);
        unit
    }

    /// Remove a unit from the module.
    pub fn remove_unit(&mut self, unit: ModUnit) {
        self.units.remove(unit);
        self.unit_order.remove(&unit);
    }

    /// Return an iterator over the units in this module.
    pub fn units<'a>(&'a self) -> impl Iterator<Item = ModUnit> + 'a {
        self.unit_order.iter().cloned()
    }

    /// Return an iterator over the functions in this module.
    pub fn functions<'a>(&'a self) -> impl Iterator<Item = &'a Function> + 'a {
        self.units().flat_map(move |unit| self[unit].get_function())
    }

    /// Return an iterator over the functions in this module, with mutation.
    ///
    /// The functions are yielded in no particular order.
    pub fn functions_mut<'a>(&'a mut self) -> impl Iterator<Item = &'a mut Function> + 'a {
        self.units
            .storage
            .values_mut()
            .flat_map(|unit| unit.get_function_mut())
    }

    /// Return a parallel iterator over the functions in this module, with
    /// mutation.
    pub fn par_functions_mut<'a>(&'a mut self) -> impl ParallelIterator<Item = &'a mut Function> {
        self.units
            .storage
            .par_iter_mut()
            .flat_map(|(_, unit)| unit.get_function_mut())
    }

    /// Return an iterator over the external declarations in this module.
    pub fn declarations<'a>(&'a self) -> impl Iterator<Item = (&'a UnitName, &'a Signature)> + 'a {
        self.units()
            .flat_map(move |unit| self[unit].get_declaration())
    }

    /// Check whether a unit is a function.
    pub fn is_function(&self, unit: ModUnit) -> bool {
        self[unit].is_function()
    }

    /// Check whether a unit is externally declared.
    pub fn is_declaration(&self, unit: ModUnit) -> bool {
        self[unit].is_declaration()
    }

    /// Get the name of a unit.
    pub fn unit_name(&self, unit: ModUnit) -> &UnitName {
        self[unit].name()
    }

    /// Get the signature of a unit.
    pub fn unit_sig(&self, unit: ModUnit) -> &Signature {
        self[unit].sig()
    }

    /// Return a function in the module, or `None` if the unit is not a
    /// function.
    pub fn get_function(&self, unit: ModUnit) -> Option<&Function> {
        self[unit].get_function()
    }

    /// Return a mutable function in the module, or `None` if the unit is not a
    /// function.
    pub fn get_function_mut(&mut self, unit: ModUnit) -> Option<&mut Function> {
        self[unit].get_function_mut()
    }

    /// Return a function in the module. Panic if the unit is not a function.
    pub fn function(&self, unit: ModUnit) -> &Function {
        self[unit].get_function().expect("unit is not a function")
    }

    /// Return a mutable function in the module. Panic if the unit is not a
    /// function.
    pub fn function_mut(&mut self, unit: ModUnit) -> &mut Function {
        self[unit]
            .get_function_mut()
            .expect("unit is not a function")
    }

    /// Return an iterator over the symbols in the module.
    pub fn symbols<'a>(&'a self) -> impl Iterator<Item = (&'a UnitName, ModUnit)> + 'a {
        self.units().map(move |unit| (self[unit].name(), unit))
    }

    /// Locate a unit by name.
    pub fn find_unit(&self, name: &UnitName) -> Option<ModUnit> {
        self.symbols()
            .find(|&(n, _)| n == name)
            .map(|(_, unit)| unit)
    }

    /// Panic if the module is not well-formed.
    pub fn verify(&self) {
        let mut verifier = Verifier::new();
        verifier.verify_module(self);
        match verifier.finish() {
            Ok(()) => (),
            Err(errs) => {
                eprintln!("");
                eprintln!("Verified module:");
                eprintln!("{}", self.dump());
                eprintln!("");
                eprintln!("Verification errors:");
                eprintln!("{}", errs);
                panic!("verification failed");
            }
        }
    }
}

impl Default for Module {
    fn default() -> Self {
        Self::new()
    }
}

/// Temporary object to dump a `Module` in human-readable form for debugging.
pub struct ModuleDumper<'a>(&'a Module);

impl std::fmt::Display for ModuleDumper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut newline = false;
        for unit in self.0.units() {
            if newline {
                writeln!(f, "")?;
            }
            newline = true;
            write!(f, "%{} = ", unit)?;
            match &self.0[unit] {
                ModUnitData::Function(unit) => writeln!(f, "{}", unit.dump())?,
                ModUnitData::Declare { sig, name } => writeln!(f, "declare {} {}", name, sig)?,
            }
        }
        Ok(())
    }
}

impl_table_key! {
    /// A unit definition or declaration in a module.
    struct ModUnit(u32) as "u";
}

/// Internal table storage for units in a module.
#[derive(Serialize, Deserialize)]
pub enum ModUnitData {
    /// The unit is a function.
    Function(Function),
    /// The unit is a declaration of an external function.
    Declare {
        /// The signature of the external function.
        sig: Signature,
        /// The name of the external function.
        name: UnitName,
    },
}

impl ModUnitData {
    /// If this unit is a function, return it. Otherwise return `None`.
    pub fn get_function(&self) -> Option<&Function> {
        match self {
            ModUnitData::Function(unit) => Some(unit),
            _ => None,
        }
    }

    /// If this unit is a function, return it. Otherwise return `None`.
    pub fn get_function_mut(&mut self) -> Option<&mut Function> {
        match self {
            ModUnitData::Function(unit) => Some(unit),
            _ => None,
        }
    }

    /// If this unit is an external declaration, return it. Otherwise return
    /// `None`.
    pub fn get_declaration(&self) -> Option<(&UnitName, &Signature)> {
        match self {
            ModUnitData::Declare { sig, name } => Some((name, sig)),
            _ => None,
        }
    }

    /// Check whether this is a function.
    pub fn is_function(&self) -> bool {
        match self {
            ModUnitData::Function(..) => true,
            _ => false,
        }
    }

    /// Check whether this is a declaration of an external unit.
    pub fn is_declaration(&self) -> bool {
        match self {
            ModUnitData::Declare { .. } => true,
            _ => false,
        }
    }

    /// Return the signature of the unit.
    pub fn sig(&self) -> &Signature {
        match self {
            ModUnitData::Function(unit) => &unit.sig,
            ModUnitData::Declare { sig, .. } => sig,
        }
    }

    /// Return the name of the unit.
    pub fn name(&self) -> &UnitName {
        match self {
            ModUnitData::Function(unit) => &unit.name,
            ModUnitData::Declare { name, .. } => name,
        }
    }
}

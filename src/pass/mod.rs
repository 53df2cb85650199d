// Copyright (c) 2017-2020 Fabian Schuiki

//! Optimization passes on the IR.
//!
//! This module implements the passes that mutate an intermediate
//! representation. Each pass is a plain function over a function body; the
//! caller decides when and how often to invoke it.

pub mod dce;
pub mod rbe;

pub use rbe::ElimStats;

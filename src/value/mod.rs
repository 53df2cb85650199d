// Copyright (c) 2017-2020 Fabian Schuiki

//! Value computation
//!
//! This module implements representations for constant values.

mod int;

pub use int::*;

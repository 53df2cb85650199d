// Copyright (c) 2017-2020 Fabian Schuiki

//! Facilities to emit the IR in human-readable form.

pub mod dot;
pub mod printer;

pub use self::dot::{write_function_dot, write_module_dot};
pub use self::printer::Writer;

// Copyright (C) 2024 Ethan Uppal and Utku Melemetci. All rights reserved.

#![forbid(unsafe_code)]

pub mod arch;
pub mod coding;
pub mod error;
pub mod loader;
pub mod op;
pub mod vm;

use std::{io::Write, path::Path};

use error::RunError;
use vm::Machine;

/// Resets `machine`, loads the program stored at `path` and runs it, sending
/// `PRINT` output to `out`.
pub fn run_file<W: Write>(
    machine: &mut Machine,
    path: &Path,
    out: &mut W,
) -> Result<(), RunError> {
    let source = loader::open(path)?;
    machine.reset();
    machine.load(source)?;
    machine.run(out)?;
    Ok(())
}

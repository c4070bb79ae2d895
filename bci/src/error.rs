// Copyright (C) 2024 Ethan Uppal and Utku Melemetci. All rights reserved.

use std::{fmt, io, path::PathBuf};

use thiserror::Error;

use crate::{
    arch::{InstructionAddress, JumpTarget},
    op::{Op, RawOpCode},
};

/// What went wrong when an instruction could not execute.
#[derive(Debug, Error)]
pub enum FaultKind {
    #[error("stack overflow: all {capacity} slots are in use")]
    StackOverflow { capacity: usize },
    #[error(
        "stack underflow: needed {required} value(s) but the stack holds {available}"
    )]
    StackUnderflow { required: usize, available: usize },
    #[error(
        "invalid jump target {target:#06x}: instruction memory ends at {limit:#06x}"
    )]
    InvalidJumpTarget { target: JumpTarget, limit: usize },
    #[error("division by zero")]
    DivisionByZero,
    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(RawOpCode),
    #[error(
        "truncated program: needed {needed} byte(s) but {available} remain in instruction memory"
    )]
    TruncatedProgram { needed: usize, available: usize },
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

/// A fatal runtime fault together with where it happened.
#[derive(Debug)]
pub struct Fault {
    pub kind: FaultKind,
    /// The byte at `ip`, or `None` when `ip` is past the end of instruction
    /// memory.
    pub opcode: Option<RawOpCode>,
    /// Offset of the opcode byte of the faulting instruction.
    pub ip: InstructionAddress,
    pub sp: usize,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(mnemonic) = self.opcode.and_then(Op::mnemonic_of_tag) {
            write!(f, " in {}", mnemonic)?;
        }
        write!(f, " at ip {:#06x} (sp {})", self.ip, self.sp)
    }
}

impl std::error::Error for Fault {}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("program does not fit in {capacity} bytes of instruction memory")]
    ProgramTooLarge { capacity: usize },
    #[error("failed to open {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("failed to read program: {0}")]
    Io(#[from] io::Error),
}

/// Anything that stops a program file from running to a `STOP`.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Fault(#[from] Fault),
}

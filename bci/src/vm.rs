// Copyright (C) 2024 Ethan Uppal and Utku Melemetci. All rights reserved.

use std::io::{Read, Write};

use paste::paste;
use tracing::{debug, info, trace, warn};

use crate::{
    arch::{
        InstructionAddress, JumpTarget, RegisterIndex, Word,
        INSTRUCTION_CAPACITY, REGISTER_COUNT, STACK_CAPACITY,
    },
    coding::{decode_le, OperandWidth},
    error::{Fault, FaultKind, LoadError},
    loader,
    op::{Op, RawOpCode},
};

/// Where the machine is in its run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Running,
    /// Reached a `STOP`.
    Halted,
    Faulted,
}

type OpResult<T = ()> = Result<T, FaultKind>;

/// Generates a handler `do_<name>` for each binary operation. Each one takes
/// `lhs` from second-from-top and `rhs` from the top of the stack and
/// replaces both with the result.
macro_rules! binary_ops {
    ($($name:ident => |$lhs:ident, $rhs:ident| $body:expr),* $(,)?) => {
        paste! {
            $(
                fn [<do_ $name>](&mut self) -> OpResult {
                    self.require(2)?;
                    let $rhs = self.stack[self.sp - 1];
                    let $lhs = self.stack[self.sp - 2];
                    let result: OpResult<Word> = $body;
                    let result = result?;
                    self.sp -= 2;
                    debug!(op = stringify!($name), lhs = $lhs, rhs = $rhs, result, "computed");
                    self.push(result)
                }
            )*
        }
    };
}

/// A stack machine with `STACK_SIZE` operand slots and `CODE_SIZE` bytes of
/// instruction memory.
pub struct Machine<
    const STACK_SIZE: usize = STACK_CAPACITY,
    const CODE_SIZE: usize = INSTRUCTION_CAPACITY,
> {
    stack: [Word; STACK_SIZE],
    /// Number of occupied stack slots; the top is `stack[sp - 1]`.
    sp: usize,
    registers: [Word; REGISTER_COUNT],
    code: Box<[u8]>,
    code_length: usize,
    ip: InstructionAddress,
    status: Status,
}

impl Machine {
    /// Creates a machine with the default capacities.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<const STACK_SIZE: usize, const CODE_SIZE: usize> Default
    for Machine<STACK_SIZE, CODE_SIZE>
{
    fn default() -> Self {
        Self {
            stack: [0; STACK_SIZE],
            sp: 0,
            registers: [0; REGISTER_COUNT],
            code: vec![0; CODE_SIZE].into_boxed_slice(),
            code_length: 0,
            ip: 0,
            status: Status::Running,
        }
    }
}

impl<const STACK_SIZE: usize, const CODE_SIZE: usize>
    Machine<STACK_SIZE, CODE_SIZE>
{
    /// Zeroes the stack, registers and instruction memory and rewinds both
    /// cursors.
    pub fn reset(&mut self) {
        self.stack.fill(0);
        self.sp = 0;
        self.registers.fill(0);
        self.code.fill(0);
        self.code_length = 0;
        self.ip = 0;
        self.status = Status::Running;
    }

    /// Fills instruction memory from `source`, returning the program length.
    pub fn load<R: Read>(&mut self, source: R) -> Result<usize, LoadError> {
        let length = loader::load_into(&mut self.code, source)?;
        self.code_length = length;
        info!(bytes = length, "program loaded");
        Ok(length)
    }

    /// Runs from the start of instruction memory with an empty stack until a
    /// `STOP` or a fault. `PRINT` writes to `out`.
    pub fn run<W: Write>(&mut self, out: &mut W) -> Result<(), Fault> {
        self.ip = 0;
        self.sp = 0;
        self.status = Status::Running;

        while self.step(out)? == Status::Running {}

        info!(ip = self.ip, sp = self.sp, "machine halted");
        Ok(())
    }

    /// Executes a single instruction. Once the machine has halted or faulted
    /// this does nothing and returns the terminal status.
    pub fn step<W: Write>(&mut self, out: &mut W) -> Result<Status, Fault> {
        if self.status != Status::Running {
            return Ok(self.status);
        }

        let start = self.ip;
        let opcode = self.code.get(start).copied();

        let result = self.decode_op().and_then(|op| {
            trace!(ip = start, ?op, sp = self.sp, "execute");
            self.execute(op, out)
        });

        match result {
            Ok(status) => {
                self.status = status;
                Ok(status)
            }
            Err(kind) => {
                self.status = Status::Faulted;
                let fault = Fault {
                    kind,
                    opcode,
                    ip: start,
                    sp: self.sp,
                };
                warn!(%fault, "program faulted");
                Err(fault)
            }
        }
    }

    /// Reads a little-endian immediate of `width` bytes at `ip` and moves
    /// `ip` past it. Fails without moving `ip` if the immediate would run
    /// past the end of instruction memory.
    pub fn read_immediate(&mut self, width: OperandWidth) -> OpResult<Word> {
        let needed = width.bytes();
        let bytes = self.code.get(self.ip..self.ip + needed).ok_or(
            FaultKind::TruncatedProgram {
                needed,
                available: self.code.len().saturating_sub(self.ip),
            },
        )?;
        let value = decode_le(bytes);
        self.ip += needed;
        Ok(value)
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn ip(&self) -> InstructionAddress {
        self.ip
    }

    pub fn sp(&self) -> usize {
        self.sp
    }

    /// The occupied part of the stack, bottom first.
    pub fn stack(&self) -> &[Word] {
        &self.stack[..self.sp]
    }

    pub fn registers(&self) -> &[Word; REGISTER_COUNT] {
        &self.registers
    }

    pub fn register(&self, index: RegisterIndex) -> Word {
        self.registers[index as usize]
    }

    pub fn set_register(&mut self, index: RegisterIndex, value: Word) {
        self.registers[index as usize] = value;
    }

    /// Number of bytes the last `load` put into instruction memory.
    pub fn program_len(&self) -> usize {
        self.code_length
    }

    pub fn instruction_memory(&self) -> &[u8] {
        &self.code
    }

    fn decode_op(&mut self) -> OpResult<Op> {
        let opcode = self.fetch_opcode()?;
        let immediate = match Op::operand_width(opcode) {
            Some(width) => self.read_immediate(width)?,
            None => 0,
        };
        Op::from_parts(opcode, immediate)
            .ok_or(FaultKind::UnknownOpcode(opcode))
    }

    fn fetch_opcode(&mut self) -> OpResult<RawOpCode> {
        let opcode = *self.code.get(self.ip).ok_or(
            FaultKind::TruncatedProgram {
                needed: 1,
                available: 0,
            },
        )?;
        self.ip += 1;
        Ok(opcode)
    }

    fn execute<W: Write>(&mut self, op: Op, out: &mut W) -> OpResult<Status> {
        match op {
            Op::Nop => {}
            Op::Push(value) => {
                self.push(value)?;
                debug!(value, "pushed to stack");
            }
            Op::Pop => {
                let value = self.pop()?;
                debug!(value, "popped");
            }
            Op::Load(register) => self.do_load(register)?,
            Op::Store(register) => self.do_store(register)?,
            Op::Jmp(target) => {
                self.ip = self.checked_target(target)?;
                debug!(target, "jumped");
            }
            Op::Jz(target) => self.branch(target, |value| value == 0)?,
            Op::Jnz(target) => self.branch(target, |value| value != 0)?,
            Op::Add => self.do_add()?,
            Op::Sub => self.do_sub()?,
            Op::Mul => self.do_mul()?,
            Op::Div => self.do_div()?,
            Op::Print => self.do_print(out)?,
            Op::Stop => return Ok(Status::Halted),
        }
        Ok(Status::Running)
    }

    binary_ops! {
        add => |lhs, rhs| Ok(lhs.wrapping_add(rhs)),
        sub => |lhs, rhs| Ok(lhs.wrapping_sub(rhs)),
        mul => |lhs, rhs| Ok(lhs.wrapping_mul(rhs)),
        div => |lhs, rhs| if rhs == 0 {
            Err(FaultKind::DivisionByZero)
        } else {
            Ok(lhs.wrapping_div(rhs))
        },
    }

    fn do_load(&mut self, register: RegisterIndex) -> OpResult {
        let value = self.register(register);
        self.push(value)?;
        debug!(register, value, "loaded to stack");
        Ok(())
    }

    fn do_store(&mut self, register: RegisterIndex) -> OpResult {
        let value = self.pop()?;
        self.set_register(register, value);
        debug!(register, value, "stored");
        Ok(())
    }

    fn do_print<W: Write>(&mut self, out: &mut W) -> OpResult {
        let value = self.top()?;
        writeln!(out, "{}", value)?;
        self.sp -= 1;
        Ok(())
    }

    /// Pops the top of the stack and jumps to `target` when `taken` holds
    /// for the popped value. The target is only checked when the jump is
    /// taken.
    fn branch(
        &mut self,
        target: JumpTarget,
        taken: impl FnOnce(Word) -> bool,
    ) -> OpResult {
        let value = self.top()?;
        let destination = if taken(value) {
            Some(self.checked_target(target)?)
        } else {
            None
        };

        self.sp -= 1;
        if let Some(destination) = destination {
            self.ip = destination;
            debug!(value, target, "branch taken");
        } else {
            debug!(value, target, "branch not taken");
        }
        Ok(())
    }

    fn checked_target(
        &self,
        target: JumpTarget,
    ) -> OpResult<InstructionAddress> {
        let destination = target as InstructionAddress;
        if destination > CODE_SIZE {
            Err(FaultKind::InvalidJumpTarget {
                target,
                limit: CODE_SIZE,
            })
        } else {
            Ok(destination)
        }
    }

    fn push(&mut self, value: Word) -> OpResult {
        let slot = self
            .stack
            .get_mut(self.sp)
            .ok_or(FaultKind::StackOverflow {
                capacity: STACK_SIZE,
            })?;
        *slot = value;
        self.sp += 1;
        Ok(())
    }

    fn pop(&mut self) -> OpResult<Word> {
        let value = self.top()?;
        self.sp -= 1;
        Ok(value)
    }

    fn top(&self) -> OpResult<Word> {
        self.require(1)?;
        Ok(self.stack[self.sp - 1])
    }

    fn require(&self, depth: usize) -> OpResult {
        if self.sp < depth {
            Err(FaultKind::StackUnderflow {
                required: depth,
                available: self.sp,
            })
        } else {
            Ok(())
        }
    }
}
